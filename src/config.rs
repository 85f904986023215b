use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;

use crate::error::Result;

const DEFAULT_TICK_DELAY_MS: u32 = 2000;
const DEFAULT_BUTTON_POLL_MS: u32 = 100;
// Matches the ESP-IDF HTTP client's own default
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
const DEFAULT_UTC_OFFSET_SECS: i32 = -7 * 3600;
const DEFAULT_USER_ID: &str = "m5core2";

/// Everything the station needs that used to be baked into globals
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct StationConfig {
    pub upload_url: String,
    pub latest_url: String,
    /// Target for archived file uploads, `None` disables the archive path
    #[serde(default)]
    pub file_upload_url: Option<String>,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default = "default_tick_delay_ms")]
    pub tick_delay_ms: u32,
    #[serde(default = "default_button_poll_ms")]
    pub button_poll_ms: u32,
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,
    /// Offset applied when rendering timestamps on the display
    #[serde(default = "default_utc_offset_secs")]
    pub utc_offset_secs: i32,
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

fn default_tick_delay_ms() -> u32 {
    DEFAULT_TICK_DELAY_MS
}

fn default_button_poll_ms() -> u32 {
    DEFAULT_BUTTON_POLL_MS
}

fn default_http_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

fn default_utc_offset_secs() -> i32 {
    DEFAULT_UTC_OFFSET_SECS
}

impl StationConfig {
    pub fn new(upload_url: impl Into<String>, latest_url: impl Into<String>) -> Self {
        Self {
            upload_url: upload_url.into(),
            latest_url: latest_url.into(),
            file_upload_url: None,
            user_id: default_user_id(),
            tick_delay_ms: DEFAULT_TICK_DELAY_MS,
            button_poll_ms: DEFAULT_BUTTON_POLL_MS,
            http_timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            utc_offset_secs: DEFAULT_UTC_OFFSET_SECS,
        }
    }

    /// Parses a JSON document, typically one baked in with `include_str!`
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_file_upload_url(mut self, url: impl Into<String>) -> Self {
        self.file_upload_url = Some(url.into());
        self
    }

    /// Change the pause between two upload ticks
    pub fn with_tick_delay_ms(mut self, tick_delay_ms: u32) -> Self {
        self.tick_delay_ms = tick_delay_ms;
        self
    }

    pub fn with_button_poll_ms(mut self, button_poll_ms: u32) -> Self {
        self.button_poll_ms = button_poll_ms;
        self
    }

    pub fn with_http_timeout_ms(mut self, http_timeout_ms: u64) -> Self {
        self.http_timeout_ms = http_timeout_ms;
        self
    }

    pub fn with_utc_offset_secs(mut self, utc_offset_secs: i32) -> Self {
        self.utc_offset_secs = utc_offset_secs;
        self
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Display offset, falling back to UTC if the configured value is out of range
    pub fn display_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_secs).unwrap_or_else(|| {
            log::warn!("UTC offset {}s is out of range, using UTC", self.utc_offset_secs);
            Utc.fix()
        })
    }
}
