use chrono::{DateTime, FixedOffset};
use log::{info, warn};
use serde::Deserialize;

use crate::console::Screen;
use crate::error::{Result, StationError};
use crate::http::{HttpTransport, HTTP_OK};

// Schema of the latest-record endpoint. Extra groups are ignored, missing or
// mistyped fields fail the decode.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LatestRecord {
    sht_details: LatestSht,
    other_details: LatestOther,
}

#[derive(Deserialize, Debug)]
struct LatestSht {
    temp: f64,
    #[serde(rename = "rHum")]
    r_hum: f64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct LatestOther {
    capture_time: u64,
    cloud_upload_time: u64,
}

/// What the latest data screen ends up showing
#[derive(Clone, Debug, PartialEq)]
pub enum LatestView {
    Reading {
        temperature: f64,
        humidity: f64,
        captured: String,
        uploaded: String,
    },
    ParseError,
    HttpError(u16),
    /// No status at all, the request never completed
    TransportError,
}

/// `hh:mm:ssAM` wall-clock time of an epoch-millisecond timestamp
pub fn format_timestamp(epoch_ms: u64, offset: &FixedOffset) -> Result<String> {
    let secs = i64::try_from(epoch_ms / 1000).map_err(|_| StationError::TimestampOutOfRange(epoch_ms))?;
    let utc = DateTime::from_timestamp(secs, 0).ok_or(StationError::TimestampOutOfRange(epoch_ms))?;
    Ok(utc.with_timezone(offset).format("%I:%M:%S%p").to_string())
}

/// Decodes a latest-record body into the view it renders as
pub fn decode_latest(body: &str, offset: &FixedOffset) -> Result<LatestView> {
    let record: LatestRecord = serde_json::from_str(body)?;
    Ok(LatestView::Reading {
        temperature: record.sht_details.temp,
        humidity: record.sht_details.r_hum,
        captured: format_timestamp(record.other_details.capture_time, offset)?,
        uploaded: format_timestamp(record.other_details.cloud_upload_time, offset)?,
    })
}

/// One blocking fetch of the latest record, no retry
pub fn fetch_latest<T: HttpTransport>(transport: &mut T, url: &str, offset: &FixedOffset) -> LatestView {
    match transport.get_body(url) {
        Ok((HTTP_OK, body)) => {
            info!("Latest Data Payload: {}", body);
            decode_latest(&body, offset).unwrap_or_else(|e| {
                warn!("Error parsing JSON: {}", e);
                LatestView::ParseError
            })
        }
        Ok((status, _)) => {
            warn!("HTTP error: {}", status);
            LatestView::HttpError(status)
        }
        Err(e) => {
            warn!("HTTP error: {}", e);
            LatestView::TransportError
        }
    }
}

impl LatestView {
    /// Draws the view. Errors are appended below the "Fetching" banner, a
    /// reading replaces the whole screen.
    pub fn render<S: Screen + ?Sized>(&self, screen: &mut S) {
        match self {
            LatestView::Reading {
                temperature,
                humidity,
                captured,
                uploaded,
            } => {
                screen.clear();
                screen.print_line("Latest Sensor Data:");
                screen.print_line("");
                screen.print_line(&format!("Temp: {:.2} C", temperature));
                screen.print_line(&format!("Hum: {:.2} %", humidity));
                screen.print_line("Captured:");
                screen.print_line(captured);
                screen.print_line("Uploaded:");
                screen.print_line(uploaded);
            }
            LatestView::ParseError => screen.print_line("JSON parse error!"),
            LatestView::HttpError(status) => screen.print_line(&format!("HTTP error: {}", status)),
            LatestView::TransportError => screen.print_line("HTTP error: no response"),
        }
    }
}
