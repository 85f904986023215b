use crate::error::Result;

mod mpu6886;
pub use mpu6886::{AccelRange, Mpu6886};
mod sht4x;
pub use sht4x::{DeviceAddr, Precision, Reading, Sht4x, TemperatureUnit};
mod vcnl4040;
pub use vcnl4040::{IntegrationTime, Vcnl4040};

/// Proximity and light channels sampled together
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LightReading {
    pub proximity: u16,
    /// Lux, truncated
    pub ambient_light: u16,
    pub white_light: u16,
}

#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct ClimateReading {
    pub temperature_c: f64,
    pub relative_humidity: f64,
}

pub trait LightSensor {
    fn read_light(&mut self) -> Result<LightReading>;
}

pub trait ClimateSensor {
    /// Temperature is always reported in Celsius here regardless of the driver's unit
    fn read_climate(&mut self) -> Result<ClimateReading>;
}

pub trait Accelerometer {
    /// Acceleration per axis in g
    fn read_g(&mut self) -> Result<(f32, f32, f32)>;
}
