//! The `M5-Details` upload record.
//!
//! Non-finite readings (a NaN humidity from a sensor glitch, say) are encoded
//! as JSON `null`, so the header always stays valid JSON and the receiver can
//! tell a missing value from a zero.

use serde::Serialize;

use crate::snapshot::DeviceSnapshot;

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord<'a> {
    pub vcnl_details: VcnlDetails,
    pub sht_details: ShtDetails,
    pub m5_details: M5Details,
    pub other_details: OtherDetails<'a>,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct VcnlDetails {
    pub prox: u16,
    pub al: u16,
    pub rwl: u16,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct ShtDetails {
    pub temp: f64,
    #[serde(rename = "rHum")]
    pub r_hum: f64,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct M5Details {
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OtherDetails<'a> {
    /// Epoch milliseconds
    pub capture_time: u64,
    pub user_id: &'a str,
}

impl<'a> UploadRecord<'a> {
    pub fn new(snapshot: &DeviceSnapshot, user_id: &'a str, capture_epoch_secs: u64) -> Self {
        Self {
            vcnl_details: VcnlDetails {
                prox: snapshot.proximity,
                al: snapshot.ambient_light,
                rwl: snapshot.white_light,
            },
            sht_details: ShtDetails {
                temp: snapshot.temperature_c,
                r_hum: snapshot.relative_humidity,
            },
            m5_details: M5Details {
                ax: snapshot.accel_x,
                ay: snapshot.accel_y,
                az: snapshot.accel_z,
            },
            other_details: OtherDetails {
                capture_time: capture_epoch_secs.saturating_mul(1000),
                user_id,
            },
        }
    }

    /// Compact JSON, suitable for a single header value
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            log::warn!("record encoding failed, sending an empty header: {}", e);
            String::new()
        })
    }
}

/// Builds the header value for one snapshot
pub fn encode(snapshot: &DeviceSnapshot, user_id: &str, capture_epoch_secs: u64) -> String {
    UploadRecord::new(snapshot, user_id, capture_epoch_secs).to_json()
}
