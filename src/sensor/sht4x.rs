use crc::{Algorithm, Crc};
use embedded_hal::blocking::{delay::DelayMs, i2c};

use crate::error::{Result, StationError};
use crate::sensor::{ClimateReading, ClimateSensor};
use crate::units::{celsius_to_fahrenheit, fahrenheit_to_celsius};

const CRC_ALGORITHM: Algorithm<u8> = Algorithm {
    width: 8,
    poly: 0x31,
    init: 0xFF,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0x00,
    residue: 0x00,
};

// 2**16 - 1
const CONVERSION_DENOM: f32 = 65535f32;

// (offset, span) pairs from the datasheet conversion formulas
const CELSIUS_PAIR: (f32, f32) = (45f32, 175f32);
const HUMIDITY_PAIR: (f32, f32) = (6f32, 125f32);

const SOFT_RESET: u8 = 0x94;
const READ_SERIAL: u8 = 0x89;
const COMMAND_DELAY_MS: u32 = 1;

/// The SHT4x temperature and humidity sensor
#[derive(Copy, Clone, Debug)]
pub struct Sht4x<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    precision: Precision,
    unit: TemperatureUnit,
}

/// Represents the reading gotten from the sensor, temperature in the configured unit
#[derive(Default, Clone, Copy, Debug)]
pub struct Reading {
    pub temperature: f32,
    pub humidity: f32,
}

/// The three I2C addresses the part is sold with
#[allow(dead_code)]
#[derive(Default, Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub enum DeviceAddr {
    #[default]
    A = 0x44,
    B = 0x45,
    C = 0x46,
}

#[allow(dead_code)]
#[derive(Default, Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

/// Measurement repeatability, higher precision takes longer to sample
#[allow(dead_code)]
#[derive(Default, Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq)]
pub enum Precision {
    #[default]
    High,
    Medium,
    Low,
}

impl Precision {
    fn command(self) -> u8 {
        match self {
            Precision::High => 0xFD,
            Precision::Medium => 0xF6,
            Precision::Low => 0xE0,
        }
    }

    /// Worst case measurement duration rounded up to whole milliseconds
    fn wait_ms(self) -> u32 {
        match self {
            Precision::High => 10,
            Precision::Medium => 5,
            Precision::Low => 2,
        }
    }
}

fn merge_bytes(a: u8, b: u8) -> u16 {
    ((a as u16) << 8) | b as u16
}

fn checksum(bytes: [u8; 2]) -> u8 {
    let crc = Crc::<u8>::new(&CRC_ALGORITHM);
    let mut digest = crc.digest();
    digest.update(&bytes);
    digest.finalize()
}

fn verify_data(buffer: [u8; 6]) -> Result<()> {
    let temp_result = checksum([buffer[0], buffer[1]]);
    if temp_result != buffer[2] {
        return Err(StationError::InvalidTemperatureChecksumError {
            bytes_start: buffer[0],
            bytes_end: buffer[1],
            expected_checksum: buffer[2],
            calculated_checksum: temp_result,
        });
    }

    let humidity_result = checksum([buffer[3], buffer[4]]);
    if humidity_result != buffer[5] {
        return Err(StationError::InvalidHumidityChecksumError {
            bytes_start: buffer[3],
            bytes_end: buffer[4],
            expected_checksum: buffer[5],
            calculated_checksum: humidity_result,
        });
    }

    Ok(())
}

fn verify_serial(buffer: [u8; 6]) -> Result<u32> {
    for word in [&buffer[0..3], &buffer[3..6]] {
        let calculated = checksum([word[0], word[1]]);
        if calculated != word[2] {
            return Err(StationError::InvalidSerialChecksumError {
                bytes_start: word[0],
                bytes_end: word[1],
                expected_checksum: word[2],
                calculated_checksum: calculated,
            });
        }
    }

    Ok(((merge_bytes(buffer[0], buffer[1]) as u32) << 16) | merge_bytes(buffer[3], buffer[4]) as u32)
}

impl<I2C, D> Sht4x<I2C, D>
where
    I2C: i2c::Write + i2c::Read,
    D: DelayMs<u32>,
{
    /// Create a new sensor on the default address, high precision and Celsius output
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: DeviceAddr::default() as u8,
            precision: Precision::default(),
            unit: TemperatureUnit::default(),
        }
    }

    /// Change the sensor's temperature unit
    pub fn set_unit(&mut self, unit: TemperatureUnit) {
        self.unit = unit;
    }

    /// Change the sensor's temperature unit
    pub fn with_unit(mut self, unit: TemperatureUnit) -> Self {
        self.unit = unit;
        self
    }

    /// Change the sensor's precision which also influences how long it takes to read
    pub fn set_precision(&mut self, precision: Precision) {
        self.precision = precision;
    }

    /// Change the sensor's precision which also influences how long it takes to read
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Change the sensor's I2C address
    pub fn with_address(mut self, address: DeviceAddr) -> Self {
        self.address = address as u8;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    /// Soft resets the part and reads its serial number, which proves it answers
    pub fn init(&mut self) -> Result<u32> {
        self.i2c_write(&[SOFT_RESET])?;
        self.delay.delay_ms(COMMAND_DELAY_MS);
        self.i2c_write(&[READ_SERIAL])?;
        self.delay.delay_ms(COMMAND_DELAY_MS);

        let mut buffer = [0; 6];
        self.i2c_read(&mut buffer)?;
        verify_serial(buffer)
    }

    /// Starts a measurement and blocks until it is done
    pub fn read(&mut self) -> Result<Reading> {
        self.i2c_write(&[self.precision.command()])?;
        self.delay.delay_ms(self.precision.wait_ms());

        let mut buffer = [0; 6];
        self.i2c_read(&mut buffer)?;
        self.process_data(buffer)
    }

    fn i2c_write(&mut self, bytes: &[u8]) -> Result<()> {
        match self.i2c.write(self.address, bytes) {
            Ok(res) => Ok(res),
            Err(_) => Err(StationError::WriteI2CError),
        }
    }

    fn i2c_read(&mut self, buffer: &mut [u8]) -> Result<()> {
        match self.i2c.read(self.address, buffer) {
            Ok(res) => Ok(res),
            Err(_) => Err(StationError::ReadI2CError),
        }
    }

    fn process_data(&self, buffer: [u8; 6]) -> Result<Reading> {
        verify_data(buffer)?;

        let raw_temp = merge_bytes(buffer[0], buffer[1]) as f32;
        let (sub, mul) = CELSIUS_PAIR;
        let celsius = mul * (raw_temp / CONVERSION_DENOM) - sub;

        let temperature = match self.unit {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => celsius_to_fahrenheit(celsius as f64) as f32,
        };

        let raw_humidity = merge_bytes(buffer[3], buffer[4]) as f32;
        let (sub, mul) = HUMIDITY_PAIR;
        let humidity = (mul * raw_humidity / CONVERSION_DENOM - sub).clamp(0f32, 100f32);

        Ok(Reading {
            temperature,
            humidity,
        })
    }
}

impl<I2C, D> ClimateSensor for Sht4x<I2C, D>
where
    I2C: i2c::Write + i2c::Read,
    D: DelayMs<u32>,
{
    fn read_climate(&mut self) -> Result<ClimateReading> {
        let reading = self.read()?;
        let temperature_c = match self.unit {
            TemperatureUnit::Celsius => reading.temperature as f64,
            TemperatureUnit::Fahrenheit => fahrenheit_to_celsius(reading.temperature as f64),
        };

        Ok(ClimateReading {
            temperature_c,
            relative_humidity: reading.humidity as f64,
        })
    }
}
