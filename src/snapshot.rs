use embedded_hal::blocking::{delay::DelayMs, i2c};
use log::{error, info};

use crate::error::{Result, StationError};
use crate::sensor::{Accelerometer, ClimateSensor, LightSensor, Sht4x, Vcnl4040};

/// Multiplier taking the IMU's g-units to m/s²
pub const GRAVITY: f64 = 9.8;

/// Latest reading from every sensor, all taken in one pass
#[derive(Default, Clone, Copy, Debug, PartialEq)]
pub struct DeviceSnapshot {
    pub proximity: u16,
    pub ambient_light: u16,
    pub white_light: u16,
    /// Percent relative humidity
    pub relative_humidity: f64,
    pub temperature_c: f64,
    /// m/s²
    pub accel_x: f64,
    pub accel_y: f64,
    pub accel_z: f64,
}

pub trait SnapshotSource {
    fn snapshot(&mut self) -> Result<DeviceSnapshot>;
}

/// Aggregates the board's three sensors into snapshots
pub struct Sensors<Light, Climate, Accel> {
    light: Light,
    climate: Climate,
    accel: Accel,
}

impl<Light, Climate, Accel> Sensors<Light, Climate, Accel>
where
    Light: LightSensor,
    Climate: ClimateSensor,
    Accel: Accelerometer,
{
    pub fn new(light: Light, climate: Climate, accel: Accel) -> Self {
        Self {
            light,
            climate,
            accel,
        }
    }
}

impl<Light, Climate, Accel> SnapshotSource for Sensors<Light, Climate, Accel>
where
    Light: LightSensor,
    Climate: ClimateSensor,
    Accel: Accelerometer,
{
    fn snapshot(&mut self) -> Result<DeviceSnapshot> {
        let light = self.light.read_light()?;
        let climate = self.climate.read_climate()?;
        let (x, y, z) = self.accel.read_g()?;

        Ok(DeviceSnapshot {
            proximity: light.proximity,
            ambient_light: light.ambient_light,
            white_light: light.white_light,
            relative_humidity: climate.relative_humidity,
            temperature_c: climate.temperature_c,
            accel_x: x as f64 * GRAVITY,
            accel_y: y as f64 * GRAVITY,
            accel_z: z as f64 * GRAVITY,
        })
    }
}

/// Brings up the light and climate sensors. A failure here is fatal for the
/// board, the caller is expected to halt rather than start ticking.
pub fn init_sensors<LightBus, ClimateBus, D>(
    light: &mut Vcnl4040<LightBus>,
    climate: &mut Sht4x<ClimateBus, D>,
) -> Result<()>
where
    LightBus: i2c::WriteRead + i2c::Write,
    ClimateBus: i2c::Write + i2c::Read,
    D: DelayMs<u32>,
{
    if let Err(e) = light.init() {
        error!("Couldn't find VCNL4040 chip: {}", e);
        return Err(StationError::sensor_init("VCNL4040", e));
    }
    info!("Found VCNL4040 chip");

    match climate.init() {
        Ok(serial) => info!("Found SHT4x sensor, serial {:#010x}", serial),
        Err(e) => {
            error!("Couldn't find SHT4x: {}", e);
            return Err(StationError::sensor_init("SHT4x", e));
        }
    }

    Ok(())
}
