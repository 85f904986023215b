use thiserror::Error;

pub type Result<T> = core::result::Result<T, StationError>;

#[derive(Error, Debug)]
pub enum StationError {
    #[error("Read I2C Error")]
    ReadI2CError,
    #[error("Write Read I2C Error")]
    WriteReadI2CError,
    #[error("Write I2C Error")]
    WriteI2CError,
    #[error("Humidity bytes [{bytes_start:#x}, {bytes_end:#x}] expected {expected_checksum:#x} but got the checksum {calculated_checksum:#x}")]
    InvalidHumidityChecksumError {
        bytes_start: u8,
        bytes_end: u8,
        expected_checksum: u8,
        calculated_checksum: u8,
    },
    #[error("Temperature bytes [{bytes_start:#x}, {bytes_end:#x}] expected {expected_checksum:#x} but got the checksum {calculated_checksum:#x}")]
    InvalidTemperatureChecksumError {
        bytes_start: u8,
        bytes_end: u8,
        expected_checksum: u8,
        calculated_checksum: u8,
    },
    #[error("Serial number bytes [{bytes_start:#x}, {bytes_end:#x}] expected {expected_checksum:#x} but got the checksum {calculated_checksum:#x}")]
    InvalidSerialChecksumError {
        bytes_start: u8,
        bytes_end: u8,
        expected_checksum: u8,
        calculated_checksum: u8,
    },
    #[error("Device id {found:#06x} does not match the expected {expected:#06x}")]
    UnexpectedDeviceIdError { expected: u16, found: u16 },
    #[error("Couldn't initialize {sensor}: {reason}")]
    SensorInit {
        sensor: &'static str,
        reason: Box<StationError>,
    },
    #[error("HTTP transport failure: {0}")]
    Transport(String),
    #[error("Response body is not a valid record: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Timestamp {0} ms can't be represented as a date")]
    TimestampOutOfRange(u64),
    #[error("Failed to open {path} for writing")]
    StorageOpen { path: String },
    #[error("Failed to read {path}")]
    StorageRead { path: String },
    #[error("Failed to persist the file counter: {0}")]
    Counter(#[source] std::io::Error),
}

impl StationError {
    /// Wraps a driver error so startup can report which sensor is missing
    pub fn sensor_init(sensor: &'static str, reason: StationError) -> Self {
        StationError::SensorInit {
            sensor,
            reason: Box::new(reason),
        }
    }
}
