//! Matter interaction model client core
//!
//! This library implements the client side of the Matter interaction model on top of
//! asynchronous Rust and Tokio. Transport, session establishment and commissioning live
//! outside; anything that can carry interaction messages plugs in through one trait.
//! Following are main parts of api:
//! - [tlv](tlv) - Matter tlv encoder and decoder. [TlvWriter](tlv::TlvWriter) builds payloads
//!                with explicit container bracketing and minimal-width integers,
//!                [TlvReader](tlv::TlvReader) walks them with a forward-only cursor.
//!                [TlvEncode](tlv::TlvEncode)/[TlvDecode](tlv::TlvDecode) connect Rust types
//!                to the wire format.
//! - [path](path) - Logical addressing: [AttributePath](path::AttributePath),
//!                [EventPath](path::EventPath) and [CommandPath](path::CommandPath) tuples
//!                of endpoint, cluster and element id.
//! - [interaction](interaction) - Read/write/invoke requests and responses with per-path
//!                success/failure partitioning and interaction [Status](interaction::Status) codes.
//! - [subscription](subscription) - [SubscriptionEngine](subscription::SubscriptionEngine)
//!                drives long-lived report channels through the
//!                Requested/Established/Updating/Terminated state machine;
//!                [Subscription](subscription::Subscription) is the consumer handle.
//! - [controller](controller) - [MatterController](controller::MatterController), the trait
//!                a transport implementation provides.
//! - [clusters](clusters) - Typed attribute and command access plus generated-style wrappers
//!                for the On/Off, Timer and Microwave Oven Mode clusters.
//!
//! Example encoding command parameters and decoding them back:
//! ```
//! # use matim::tlv::{Tag, TlvWriter, TlvReader};
//! # use anyhow::Result;
//! # fn main() -> Result<()> {
//! let mut w = TlvWriter::new();
//! w.start_structure(Tag::Anonymous)?;
//! w.put_u8(Tag::Context(0), 50)?;      // level
//! w.put_u16(Tag::Context(1), 1000)?;   // transition time
//! w.end_structure()?;
//! let payload = w.into_encoded()?;
//!
//! let mut r = TlvReader::new(&payload);
//! r.enter_structure(Tag::Anonymous)?;
//! assert_eq!(r.get_u8(Tag::Context(0))?, 50);
//! assert_eq!(r.get_u16(Tag::Context(1))?, 1000);
//! r.exit_container()?;
//! # Ok(())
//! # }
//! ```

pub mod clusters;
pub mod controller;
pub mod error;
pub mod interaction;
pub mod path;
pub mod subscription;
pub mod tlv;
