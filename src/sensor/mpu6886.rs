use embedded_hal::blocking::i2c;
use log::debug;

use crate::error::{Result, StationError};
use crate::sensor::Accelerometer;

const DEFAULT_ADDRESS: u8 = 0x68;
const WHO_AM_I_VALUE: u8 = 0x19;

const ACCEL_CONFIG: u8 = 0x1C;
const ACCEL_XOUT_H: u8 = 0x3B;
const PWR_MGMT_1: u8 = 0x6B;
const WHO_AM_I: u8 = 0x75;

// CLKSEL = 1 picks the gyro PLL when it's ready
const CLOCK_AUTO: u8 = 0x01;

/// Full scale of the accelerometer, written to ACCEL_CONFIG bits 4:3
#[allow(dead_code)]
#[derive(Default, Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub enum AccelRange {
    G2 = 0,
    G4 = 1,
    #[default]
    G8 = 2,
    G16 = 3,
}

impl AccelRange {
    fn g_per_count(self) -> f32 {
        (2u16 << self as u16) as f32 / 32768.0
    }
}

/// The MPU6886 IMU on the M5Core2's internal bus, accelerometer only
#[derive(Copy, Clone, Debug)]
pub struct Mpu6886<I2C> {
    i2c: I2C,
    address: u8,
    range: AccelRange,
}

impl<I2C> Mpu6886<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            address: DEFAULT_ADDRESS,
            range: AccelRange::default(),
        }
    }

    pub fn with_range(mut self, range: AccelRange) -> Self {
        self.range = range;
        self
    }

    /// Checks WHO_AM_I, wakes the chip and sets the accelerometer range
    pub fn init(&mut self) -> Result<()> {
        let mut id = [0];
        self.i2c
            .write_read(self.address, &[WHO_AM_I], &mut id)
            .map_err(|_| StationError::WriteReadI2CError)?;
        if id[0] != WHO_AM_I_VALUE {
            return Err(StationError::UnexpectedDeviceIdError {
                expected: WHO_AM_I_VALUE as u16,
                found: id[0] as u16,
            });
        }

        self.write_register(PWR_MGMT_1, 0x00)?;
        self.write_register(PWR_MGMT_1, CLOCK_AUTO)?;
        self.write_register(ACCEL_CONFIG, (self.range as u8) << 3)?;
        debug!("MPU6886 awake, range {:?}", self.range);
        Ok(())
    }

    /// Raw signed counts for x, y and z
    pub fn raw_acceleration(&mut self) -> Result<[i16; 3]> {
        let mut buffer = [0; 6];
        self.i2c
            .write_read(self.address, &[ACCEL_XOUT_H], &mut buffer)
            .map_err(|_| StationError::WriteReadI2CError)?;

        Ok([
            i16::from_be_bytes([buffer[0], buffer[1]]),
            i16::from_be_bytes([buffer[2], buffer[3]]),
            i16::from_be_bytes([buffer[4], buffer[5]]),
        ])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<()> {
        match self.i2c.write(self.address, &[register, value]) {
            Ok(res) => Ok(res),
            Err(_) => Err(StationError::WriteI2CError),
        }
    }
}

impl<I2C> Accelerometer for Mpu6886<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    fn read_g(&mut self) -> Result<(f32, f32, f32)> {
        let [x, y, z] = self.raw_acceleration()?;
        let scale = self.range.g_per_count();
        Ok((x as f32 * scale, y as f32 * scale, z as f32 * scale))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use embedded_hal_mock::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    #[test]
    fn init_wakes_and_selects_8g() {
        let expectations = [
            I2cTransaction::write_read(0x68, vec![WHO_AM_I], vec![0x19]),
            I2cTransaction::write(0x68, vec![PWR_MGMT_1, 0x00]),
            I2cTransaction::write(0x68, vec![PWR_MGMT_1, 0x01]),
            I2cTransaction::write(0x68, vec![ACCEL_CONFIG, 0x10]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut imu = Mpu6886::new(i2c.clone());

        imu.init().unwrap();
        i2c.done();
    }

    #[test]
    fn init_rejects_foreign_device() {
        let expectations = [I2cTransaction::write_read(0x68, vec![WHO_AM_I], vec![0x68])];
        let mut i2c = I2cMock::new(&expectations);
        let mut imu = Mpu6886::new(i2c.clone());

        assert!(matches!(
            imu.init(),
            Err(StationError::UnexpectedDeviceIdError {
                expected: 0x19,
                found: 0x68
            })
        ));
        i2c.done();
    }

    #[test]
    fn reads_big_endian_axes_in_g() {
        let expectations = [I2cTransaction::write_read(
            0x68,
            vec![ACCEL_XOUT_H],
            vec![0x10, 0x00, 0xF0, 0x00, 0x08, 0x00],
        )];
        let mut i2c = I2cMock::new(&expectations);
        let mut imu = Mpu6886::new(i2c.clone());

        // 4096 counts per g at ±8 g
        assert_eq!(imu.read_g().unwrap(), (1.0, -1.0, 0.5));
        i2c.done();
    }

    #[test]
    fn narrower_range_scales_counts() {
        let expectations = [I2cTransaction::write_read(
            0x68,
            vec![ACCEL_XOUT_H],
            vec![0x40, 0x00, 0x00, 0x00, 0xC0, 0x00],
        )];
        let mut i2c = I2cMock::new(&expectations);
        let mut imu = Mpu6886::new(i2c.clone()).with_range(AccelRange::G2);

        assert_eq!(imu.read_g().unwrap(), (1.0, 0.0, -1.0));
        i2c.done();
    }
}
