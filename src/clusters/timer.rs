//! Timer cluster (0x0047).

use std::sync::Arc;
use std::time::Duration;

use crate::clusters::{Attribute, AttributeSubscription, Command};
use crate::controller::MatterController;
use crate::error::Result;
use crate::tlv::{Tag, TlvWriter};

pub const CLUSTER_ID: u32 = 0x0047;

const CMD_SET_TIMER: Command = Command::new(CLUSTER_ID, 0x00);
const CMD_RESET_TIMER: Command = Command::new(CLUSTER_ID, 0x01);
const CMD_ADD_TIME: Command = Command::new(CLUSTER_ID, 0x02);
const CMD_REDUCE_TIME: Command = Command::new(CLUSTER_ID, 0x03);

const ATTR_SET_TIME: Attribute<u32> = Attribute::new(CLUSTER_ID, 0x0000);
const ATTR_TIME_REMAINING: Attribute<u32> = Attribute::new(CLUSTER_ID, 0x0001);
const ATTR_TIMER_STATE: Attribute<u8> = Attribute::new(CLUSTER_ID, 0x0002);

/// Single seconds field under context tag 0, the payload shape shared by
/// set, add and reduce.
fn seconds_field(seconds: u32) -> Result<Vec<u8>> {
    let mut writer = TlvWriter::new();
    writer.start_structure(Tag::Anonymous)?;
    writer.put_u32(Tag::Context(0), seconds)?;
    writer.end_structure()?;
    Ok(writer.into_encoded()?)
}

fn no_fields() -> Result<Vec<u8>> {
    let mut writer = TlvWriter::new();
    writer.start_structure(Tag::Anonymous)?;
    writer.end_structure()?;
    Ok(writer.into_encoded()?)
}

pub struct TimerCluster {
    controller: Arc<dyn MatterController>,
    endpoint_id: u16,
}

impl TimerCluster {
    pub fn new(controller: Arc<dyn MatterController>, endpoint_id: u16) -> Self {
        Self {
            controller,
            endpoint_id,
        }
    }

    pub async fn set_timer(&self, new_time_seconds: u32, timed: Option<Duration>) -> Result<()> {
        CMD_SET_TIMER
            .invoke(
                self.controller.as_ref(),
                self.endpoint_id,
                seconds_field(new_time_seconds)?,
                timed,
            )
            .await?;
        Ok(())
    }

    pub async fn reset_timer(&self, timed: Option<Duration>) -> Result<()> {
        CMD_RESET_TIMER
            .invoke(self.controller.as_ref(), self.endpoint_id, no_fields()?, timed)
            .await?;
        Ok(())
    }

    pub async fn add_time(&self, additional_seconds: u32, timed: Option<Duration>) -> Result<()> {
        CMD_ADD_TIME
            .invoke(
                self.controller.as_ref(),
                self.endpoint_id,
                seconds_field(additional_seconds)?,
                timed,
            )
            .await?;
        Ok(())
    }

    pub async fn reduce_time(&self, reduction_seconds: u32, timed: Option<Duration>) -> Result<()> {
        CMD_REDUCE_TIME
            .invoke(
                self.controller.as_ref(),
                self.endpoint_id,
                seconds_field(reduction_seconds)?,
                timed,
            )
            .await?;
        Ok(())
    }

    pub async fn read_set_time(&self) -> Result<u32> {
        ATTR_SET_TIME
            .read(self.controller.as_ref(), self.endpoint_id)
            .await
    }

    pub async fn read_time_remaining(&self) -> Result<u32> {
        ATTR_TIME_REMAINING
            .read(self.controller.as_ref(), self.endpoint_id)
            .await
    }

    pub async fn read_timer_state(&self) -> Result<u8> {
        ATTR_TIMER_STATE
            .read(self.controller.as_ref(), self.endpoint_id)
            .await
    }

    pub async fn subscribe_time_remaining(
        &self,
        min_interval: Duration,
        max_interval: Duration,
    ) -> Result<AttributeSubscription<u32>> {
        ATTR_TIME_REMAINING
            .subscribe(
                self.controller.as_ref(),
                self.endpoint_id,
                min_interval,
                max_interval,
            )
            .await
    }
}
