use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of wall-clock time, NTP-synchronised on the board
pub trait Clock {
    fn epoch_seconds(&mut self) -> u64;
}

/// Reads the system clock, which SNTP keeps in sync once it has completed
#[derive(Default, Clone, Copy, Debug)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn epoch_seconds(&mut self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs()
    }
}
