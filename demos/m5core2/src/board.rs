//! M5Core2 parts that live on the internal I2C bus next to the IMU

use embedded_hal::blocking::i2c;
use log::{debug, info};
use m5_uploader::prelude::*;

const AXP192_ADDRESS: u8 = 0x34;
const AXP_EXTEN_DCDC2: u8 = 0x10;
const AXP_POWER_OUTPUT: u8 = 0x12;
const EXTEN_ENABLE: u8 = 0x04;
const POWER_OUTPUT_EXTEN: u8 = 0x40;

const FT6336U_ADDRESS: u8 = 0x38;
const TD_STATUS: u8 = 0x02;

// The touch panel runs 40 px past the bottom of the display, the three
// button circles are drawn there
const BUTTON_ROW_Y: u16 = 240;
const BUTTON_WIDTH: u16 = 109;

/// Power management chip, only what the sensor port needs
pub struct Axp192<I2C> {
    i2c: I2C,
}

impl<I2C> Axp192<I2C>
where
    I2C: i2c::WriteRead + i2c::Write,
{
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Turns on the 5 V boost that feeds Port A
    pub fn enable_port_a(&mut self) -> Result<()> {
        self.set_bits(AXP_EXTEN_DCDC2, EXTEN_ENABLE)?;
        self.set_bits(AXP_POWER_OUTPUT, POWER_OUTPUT_EXTEN)
    }

    fn set_bits(&mut self, register: u8, bits: u8) -> Result<()> {
        let mut value = [0];
        self.i2c
            .write_read(AXP192_ADDRESS, &[register], &mut value)
            .map_err(|_| StationError::WriteReadI2CError)?;
        self.i2c
            .write(AXP192_ADDRESS, &[register, value[0] | bits])
            .map_err(|_| StationError::WriteI2CError)
    }
}

/// Touch buttons from the FT6336U controller, text lines go to the serial log
pub struct TouchConsole<I2C> {
    i2c: I2C,
    held: Option<Button>,
    pressed: Option<Button>,
}

impl<I2C> TouchConsole<I2C>
where
    I2C: i2c::WriteRead,
{
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            held: None,
            pressed: None,
        }
    }

    fn touched(&mut self) -> Result<Option<Button>> {
        // TD_STATUS followed by the first point's XH, XL, YH, YL
        let mut data = [0; 5];
        self.i2c
            .write_read(FT6336U_ADDRESS, &[TD_STATUS], &mut data)
            .map_err(|_| StationError::WriteReadI2CError)?;
        if data[0] & 0x0F == 0 {
            return Ok(None);
        }

        let x = u16::from_be_bytes([data[1] & 0x0F, data[2]]);
        let y = u16::from_be_bytes([data[3] & 0x0F, data[4]]);
        Ok(button_at(x, y))
    }
}

fn button_at(x: u16, y: u16) -> Option<Button> {
    if y < BUTTON_ROW_Y {
        return None;
    }
    match x / BUTTON_WIDTH {
        0 => Some(Button::A),
        1 => Some(Button::B),
        _ => None,
    }
}

impl<I2C> Buttons for TouchConsole<I2C>
where
    I2C: i2c::WriteRead,
{
    fn update(&mut self) {
        let now = self.touched().unwrap_or_else(|e| {
            debug!("Touch read failed: {}", e);
            None
        });
        self.pressed = if now != self.held { now } else { None };
        self.held = now;
    }

    fn was_pressed(&self, button: Button) -> bool {
        self.pressed == Some(button)
    }
}

impl<I2C> Screen for TouchConsole<I2C> {
    fn clear(&mut self) {
        info!("--------");
    }

    fn print_line(&mut self, line: &str) {
        info!("{}", line);
    }
}
