//! Microwave Oven Mode cluster (0x005e).
//!
//! The supported-modes attribute carries nested structures with an optional
//! manufacturer code, the shape the hand-written [TlvDecode] impls below
//! exist for.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::clusters::{Attribute, AttributeSubscription};
use crate::controller::MatterController;
use crate::error::Result;
use crate::tlv::{FormatError, Tag, TlvDecode, TlvEncode, TlvReader, TlvWriter};

pub const CLUSTER_ID: u32 = 0x005e;

const ATTR_SUPPORTED_MODES: Attribute<Vec<ModeOptionStruct>> = Attribute::new(CLUSTER_ID, 0x0000);
const ATTR_CURRENT_MODE: Attribute<u8> = Attribute::new(CLUSTER_ID, 0x0001);

/// Semantic tag of a mode. `mfg_code` is absent for standard tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeTagStruct {
    pub mfg_code: Option<u16>,
    pub value: u16,
}

impl TlvEncode for ModeTagStruct {
    fn encode_tlv(&self, writer: &mut TlvWriter, tag: Tag) -> std::result::Result<(), FormatError> {
        writer.start_structure(tag)?;
        if let Some(mfg_code) = self.mfg_code {
            writer.put_u16(Tag::Context(0), mfg_code)?;
        }
        writer.put_u16(Tag::Context(1), self.value)?;
        writer.end_structure()
    }
}

impl TlvDecode for ModeTagStruct {
    fn decode_tlv(reader: &mut TlvReader<'_>, tag: Tag) -> std::result::Result<Self, FormatError> {
        reader.enter_structure(tag)?;
        let mfg_code = if reader.is_next_tag(Tag::Context(0)) {
            Some(reader.get_u16(Tag::Context(0))?)
        } else {
            None
        };
        let value = reader.get_u16(Tag::Context(1))?;
        reader.exit_container()?;
        Ok(Self { mfg_code, value })
    }
}

/// One selectable mode: label, mode number, and its semantic tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeOptionStruct {
    pub label: String,
    pub mode: u8,
    pub mode_tags: Vec<ModeTagStruct>,
}

impl TlvEncode for ModeOptionStruct {
    fn encode_tlv(&self, writer: &mut TlvWriter, tag: Tag) -> std::result::Result<(), FormatError> {
        writer.start_structure(tag)?;
        writer.put_string(Tag::Context(0), &self.label)?;
        writer.put_u8(Tag::Context(1), self.mode)?;
        self.mode_tags.encode_tlv(writer, Tag::Context(2))?;
        writer.end_structure()
    }
}

impl TlvDecode for ModeOptionStruct {
    fn decode_tlv(reader: &mut TlvReader<'_>, tag: Tag) -> std::result::Result<Self, FormatError> {
        reader.enter_structure(tag)?;
        let label = reader.get_string(Tag::Context(0))?;
        let mode = reader.get_u8(Tag::Context(1))?;
        let mode_tags = Vec::decode_tlv(reader, Tag::Context(2))?;
        reader.exit_container()?;
        Ok(Self {
            label,
            mode,
            mode_tags,
        })
    }
}

pub struct MicrowaveOvenModeCluster {
    controller: Arc<dyn MatterController>,
    endpoint_id: u16,
}

impl MicrowaveOvenModeCluster {
    pub fn new(controller: Arc<dyn MatterController>, endpoint_id: u16) -> Self {
        Self {
            controller,
            endpoint_id,
        }
    }

    pub async fn read_supported_modes(&self) -> Result<Vec<ModeOptionStruct>> {
        ATTR_SUPPORTED_MODES
            .read(self.controller.as_ref(), self.endpoint_id)
            .await
    }

    pub async fn read_current_mode(&self) -> Result<u8> {
        ATTR_CURRENT_MODE
            .read(self.controller.as_ref(), self.endpoint_id)
            .await
    }

    pub async fn subscribe_current_mode(
        &self,
        min_interval: Duration,
        max_interval: Duration,
    ) -> Result<AttributeSubscription<u8>> {
        ATTR_CURRENT_MODE
            .subscribe(
                self.controller.as_ref(),
                self.endpoint_id,
                min_interval,
                max_interval,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tlv::{decode_anonymous, encode_anonymous};

    #[test]
    fn test_mode_option_roundtrip() {
        let modes = vec![
            ModeOptionStruct {
                label: "Normal".to_string(),
                mode: 0,
                mode_tags: vec![ModeTagStruct {
                    mfg_code: None,
                    value: 0x4000,
                }],
            },
            ModeOptionStruct {
                label: "Defrost".to_string(),
                mode: 1,
                mode_tags: vec![ModeTagStruct {
                    mfg_code: Some(0x1234),
                    value: 0x8001,
                }],
            },
        ];
        let encoded = encode_anonymous(&modes).unwrap();
        let decoded: Vec<ModeOptionStruct> = decode_anonymous(&encoded).unwrap();
        assert_eq!(decoded, modes);
    }

    #[test]
    fn test_mode_tag_optional_field_omitted_on_wire() {
        let tag = ModeTagStruct {
            mfg_code: None,
            value: 7,
        };
        let encoded = encode_anonymous(&tag).unwrap();
        // structure, ctx(1)=7, end: no trace of ctx(0)
        assert_eq!(encoded, vec![0x15, 0x24, 0x01, 0x07, 0x18]);
    }
}
