use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Builder;

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    Active,
    Standby,
}

/// Body of a generated test event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SyntheticPayload {
    pub message_id: u64,
    pub timestamp: String,
    pub device_id: String,
    pub temperature: f64,
    pub status: DeviceStatus,
}

impl SyntheticPayload {
    /// Generates the payload for the 1-based `message_id`.
    pub fn generate<R: Rng + ?Sized>(message_id: u64, rng: &mut R) -> Self {
        let device = Builder::from_random_bytes(rng.gen()).into_uuid();
        let status = if message_id % 2 == 0 {
            DeviceStatus::Active
        } else {
            DeviceStatus::Standby
        };

        Self {
            message_id,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            device_id: format!("DEV-{}", &device.simple().to_string()[..8]),
            temperature: rng.gen_range(0.0..100.0),
            status,
        }
    }

    pub fn to_json_bytes(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}
