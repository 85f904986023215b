//! Sensor sampling and upload cycle for an M5Core2-class board.
//!
//! Every tick a [`DeviceSnapshot`](snapshot::DeviceSnapshot) is taken from the
//! VCNL4040, SHT4x and IMU, encoded as the `M5-Details` JSON record and sent
//! with a single GET. Button A interrupts the loop to fetch and show the most
//! recently uploaded record; button B returns to the upload loop.

pub mod clock;
pub mod config;
pub mod console;
pub mod error;
pub mod http;
pub mod record;
pub mod sensor;
pub mod snapshot;
pub mod station;
pub mod storage;
pub mod units;
pub mod upload;
pub mod viewer;

pub mod prelude {
    pub use super::{
        clock::{Clock, SystemClock},
        config::StationConfig,
        console::{Button, Buttons, Screen},
        error::{Result, StationError},
        http::{ConnectionTransport, HttpTransport},
        record::{encode, UploadRecord},
        sensor::{Accelerometer, Mpu6886, Sht4x, Vcnl4040},
        snapshot::{init_sensors, DeviceSnapshot, Sensors, SnapshotSource},
        station::{Station, TickReport},
        storage::{Archive, DirStorage, FileArchive, FileCounter},
        viewer::LatestView,
    };
}
