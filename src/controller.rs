//! Controller seam between the typed cluster layer and a transport.
//!
//! The cluster wrappers only ever talk to [MatterController]; anything that
//! can carry interaction-model messages to a node (a live CASE session, a
//! bridge, a test double) implements it. Subscriptions are expected to be
//! driven through a [SubscriptionEngine](crate::subscription::SubscriptionEngine)
//! owned by the implementation.

use async_trait::async_trait;

use crate::error::Result;
use crate::interaction::{InvokeRequest, InvokeResponse, ReadRequest, ReadResponse, WriteRequest, WriteResponse};
use crate::subscription::{SubscribeRequest, Subscription};

#[async_trait]
pub trait MatterController: Send + Sync {
    /// Read the requested paths. Every requested path must land in the
    /// response, as a success or a per-path failure.
    async fn read(&self, request: ReadRequest) -> Result<ReadResponse>;

    /// Write one encoded attribute value, honoring the timed-request window
    /// when set.
    async fn write(&self, request: WriteRequest) -> Result<WriteResponse>;

    /// Invoke one command. A command-level failure status is an `Err`, not a
    /// response.
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse>;

    /// Open a subscription and return the consumer handle. The first event
    /// on the handle is always `Established`.
    async fn subscribe(&self, request: SubscribeRequest) -> Result<Subscription>;
}
