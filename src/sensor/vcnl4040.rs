use embedded_hal::blocking::i2c;
use log::debug;

use crate::error::{Result, StationError};
use crate::sensor::{LightReading, LightSensor};

const DEFAULT_ADDRESS: u8 = 0x60;
const DEVICE_ID: u16 = 0x0186;

const ALS_CONF: u8 = 0x00;
const PS_CONF1_2: u8 = 0x03;
const PS_CONF3_MS: u8 = 0x04;
const PS_DATA: u8 = 0x08;
const ALS_DATA: u8 = 0x09;
const WHITE_DATA: u8 = 0x0A;
const DEVICE_ID_REG: u8 = 0x0C;

// PS_HD lives in the high byte of PS_CONF1_2
const PS_HIGH_RESOLUTION: u16 = 1 << 11;

/// Ambient light integration time, longer means finer lux resolution
#[allow(dead_code)]
#[derive(Default, Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub enum IntegrationTime {
    #[default]
    Ms80 = 0,
    Ms160 = 1,
    Ms320 = 2,
    Ms640 = 3,
}

impl IntegrationTime {
    /// Lux per count, 0.1 at 80 ms halving with every step
    fn lux_per_count(self) -> f32 {
        0.1f32 / (1u16 << self as u16) as f32
    }
}

/// The VCNL4040 proximity and ambient light sensor
#[derive(Copy, Clone, Debug)]
pub struct Vcnl4040<I2C> {
    i2c: I2C,
    address: u8,
    integration: IntegrationTime,
}

impl<I2C> Vcnl4040<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
            integration: IntegrationTime::default(),
        }
    }

    pub fn with_integration_time(mut self, integration: IntegrationTime) -> Self {
        self.integration = integration;
        self
    }

    /// Checks the device id then powers up all three channels
    pub fn init(&mut self) -> Result<()> {
        let found = self.read_register(DEVICE_ID_REG)?;
        if found != DEVICE_ID {
            return Err(StationError::UnexpectedDeviceIdError {
                expected: DEVICE_ID,
                found,
            });
        }

        // Clearing the shutdown bits enables each channel
        self.write_register(ALS_CONF, (self.integration as u16) << 6)?;
        self.write_register(PS_CONF1_2, PS_HIGH_RESOLUTION)?;
        self.write_register(PS_CONF3_MS, 0x0000)?;
        debug!("VCNL4040 enabled at {:#x}", self.address);
        Ok(())
    }

    pub fn proximity(&mut self) -> Result<u16> {
        self.read_register(PS_DATA)
    }

    pub fn ambient_light(&mut self) -> Result<u16> {
        self.read_register(ALS_DATA)
    }

    pub fn white_light(&mut self) -> Result<u16> {
        self.read_register(WHITE_DATA)
    }

    pub fn lux(&mut self) -> Result<f32> {
        Ok(self.ambient_light()? as f32 * self.integration.lux_per_count())
    }

    fn read_register(&mut self, register: u8) -> Result<u16> {
        let mut buffer = [0; 2];
        match self.i2c.write_read(self.address, &[register], &mut buffer) {
            Ok(_) => Ok(u16::from_le_bytes(buffer)),
            Err(_) => Err(StationError::WriteReadI2CError),
        }
    }

    fn write_register(&mut self, register: u8, value: u16) -> Result<()> {
        let [low, high] = value.to_le_bytes();
        match self.i2c.write(self.address, &[register, low, high]) {
            Ok(res) => Ok(res),
            Err(_) => Err(StationError::WriteI2CError),
        }
    }
}

impl<I2C> LightSensor for Vcnl4040<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    fn read_light(&mut self) -> Result<LightReading> {
        Ok(LightReading {
            proximity: self.proximity()?,
            ambient_light: self.lux()? as u16,
            white_light: self.white_light()?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn init_enables_channels() {
        let expectations = [
            I2cTransaction::write_read(0x60, vec![DEVICE_ID_REG], vec![0x86, 0x01]),
            I2cTransaction::write(0x60, vec![ALS_CONF, 0x00, 0x00]),
            I2cTransaction::write(0x60, vec![PS_CONF1_2, 0x00, 0x08]),
            I2cTransaction::write(0x60, vec![PS_CONF3_MS, 0x00, 0x00]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Vcnl4040::new(i2c.clone());

        sensor.init().unwrap();
        i2c.done();
    }

    #[test]
    fn init_rejects_foreign_device() {
        let expectations = [I2cTransaction::write_read(
            0x60,
            vec![DEVICE_ID_REG],
            vec![0x58, 0x00],
        )];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Vcnl4040::new(i2c.clone());

        assert_eq!(
            sensor.init().err().unwrap().to_string(),
            StationError::UnexpectedDeviceIdError {
                expected: 0x0186,
                found: 0x0058
            }
            .to_string()
        );
        i2c.done();
    }

    #[test]
    fn reads_all_channels() {
        let expectations = [
            I2cTransaction::write_read(0x60, vec![PS_DATA], vec![0x0A, 0x00]),
            I2cTransaction::write_read(0x60, vec![ALS_DATA], vec![0xD0, 0x07]),
            I2cTransaction::write_read(0x60, vec![WHITE_DATA], vec![0x32, 0x01]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Vcnl4040::new(i2c.clone());

        let reading = sensor.read_light().unwrap();
        assert_eq!(reading.proximity, 10);
        // 2000 counts at 0.1 lux
        assert_eq!(reading.ambient_light, 200);
        assert_eq!(reading.white_light, 0x0132);
        i2c.done();
    }

    #[test]
    fn longer_integration_scales_lux() {
        let expectations = [I2cTransaction::write_read(
            0x60,
            vec![ALS_DATA],
            vec![0xD0, 0x07],
        )];
        let mut i2c = I2cMock::new(&expectations);
        let mut sensor = Vcnl4040::new(i2c.clone()).with_integration_time(IntegrationTime::Ms320);

        assert!((sensor.lux().unwrap() - 50.0).abs() < 1e-3);
        i2c.done();
    }
}
