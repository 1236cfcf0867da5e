//! On/Off cluster (0x0006).

use std::sync::Arc;
use std::time::Duration;

use crate::clusters::{Attribute, AttributeSubscription, Command};
use crate::controller::MatterController;
use crate::error::Result;
use crate::tlv::{Tag, TlvWriter};

pub const CLUSTER_ID: u32 = 0x0006;

const CMD_OFF: Command = Command::new(CLUSTER_ID, 0x00);
const CMD_ON: Command = Command::new(CLUSTER_ID, 0x01);
const CMD_TOGGLE: Command = Command::new(CLUSTER_ID, 0x02);

const ATTR_ON_OFF: Attribute<bool> = Attribute::new(CLUSTER_ID, 0x0000);
const ATTR_ON_TIME: Attribute<u16> = Attribute::new(CLUSTER_ID, 0x4001);

/// Empty command payload, still framed as an anonymous structure.
fn no_fields() -> Result<Vec<u8>> {
    let mut writer = TlvWriter::new();
    writer.start_structure(Tag::Anonymous)?;
    writer.end_structure()?;
    Ok(writer.into_encoded()?)
}

pub struct OnOffCluster {
    controller: Arc<dyn MatterController>,
    endpoint_id: u16,
}

impl OnOffCluster {
    pub fn new(controller: Arc<dyn MatterController>, endpoint_id: u16) -> Self {
        Self {
            controller,
            endpoint_id,
        }
    }

    pub async fn off(&self) -> Result<()> {
        CMD_OFF
            .invoke(self.controller.as_ref(), self.endpoint_id, no_fields()?, None)
            .await?;
        Ok(())
    }

    pub async fn on(&self) -> Result<()> {
        CMD_ON
            .invoke(self.controller.as_ref(), self.endpoint_id, no_fields()?, None)
            .await?;
        Ok(())
    }

    pub async fn toggle(&self) -> Result<()> {
        CMD_TOGGLE
            .invoke(self.controller.as_ref(), self.endpoint_id, no_fields()?, None)
            .await?;
        Ok(())
    }

    pub async fn read_on_off(&self) -> Result<bool> {
        ATTR_ON_OFF
            .read(self.controller.as_ref(), self.endpoint_id)
            .await
    }

    pub async fn subscribe_on_off(
        &self,
        min_interval: Duration,
        max_interval: Duration,
    ) -> Result<AttributeSubscription<bool>> {
        ATTR_ON_OFF
            .subscribe(
                self.controller.as_ref(),
                self.endpoint_id,
                min_interval,
                max_interval,
            )
            .await
    }

    pub async fn read_on_time(&self) -> Result<u16> {
        ATTR_ON_TIME
            .read(self.controller.as_ref(), self.endpoint_id)
            .await
    }

    pub async fn write_on_time(&self, value: u16, timed: Option<Duration>) -> Result<()> {
        ATTR_ON_TIME
            .write(self.controller.as_ref(), self.endpoint_id, &value, timed)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fields_payload() {
        // anonymous structure, immediately closed
        assert_eq!(no_fields().unwrap(), vec![0x15, 0x18]);
    }
}
