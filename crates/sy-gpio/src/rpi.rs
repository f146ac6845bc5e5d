//! Raspberry Pi GPIO pins via `rppal`.
//!
//! Claiming a pin can fail (no `/dev/gpiomem`, pin already exported, not
//! running on a Pi); level I/O after a successful claim is memory-mapped
//! register access and always succeeds here. The fallible trait
//! signatures exist for the hardware-fault path and for the mocks.

use rppal::gpio::Gpio;

use crate::error::{GpioError, GpioResult};
use crate::interface::{InputPin, Level, OutputPin};

fn to_rppal(level: Level) -> rppal::gpio::Level {
    match level {
        Level::Low => rppal::gpio::Level::Low,
        Level::High => rppal::gpio::Level::High,
    }
}

fn from_rppal(level: rppal::gpio::Level) -> Level {
    match level {
        rppal::gpio::Level::Low => Level::Low,
        rppal::gpio::Level::High => Level::High,
    }
}

/// Output pin on the Pi's BCM GPIO header (relay, status LED).
pub struct RpiOutputPin {
    pin: rppal::gpio::OutputPin,
    number: u8,
}

impl RpiOutputPin {
    /// Claim a BCM pin for output, driven low initially.
    pub fn claim(number: u8) -> GpioResult<Self> {
        let gpio = Gpio::new().map_err(|e| GpioError::Init(e.to_string()))?;
        let pin = gpio
            .get(number)
            .map_err(|e| GpioError::Init(format!("pin {number}: {e}")))?
            .into_output_low();
        tracing::debug!(pin = number, "claimed output pin");
        Ok(Self { pin, number })
    }
}

impl OutputPin for RpiOutputPin {
    fn write(&mut self, level: Level) -> GpioResult<()> {
        self.pin.write(to_rppal(level));
        Ok(())
    }

    fn pin(&self) -> u8 {
        self.number
    }
}

/// Input pin with the internal pull-up enabled (push-button, active-low).
pub struct RpiInputPin {
    pin: rppal::gpio::InputPin,
    number: u8,
}

impl RpiInputPin {
    /// Claim a BCM pin for input with the internal pull-up enabled.
    pub fn claim_pullup(number: u8) -> GpioResult<Self> {
        let gpio = Gpio::new().map_err(|e| GpioError::Init(e.to_string()))?;
        let pin = gpio
            .get(number)
            .map_err(|e| GpioError::Init(format!("pin {number}: {e}")))?
            .into_input_pullup();
        tracing::debug!(pin = number, "claimed input pin (pull-up)");
        Ok(Self { pin, number })
    }
}

impl InputPin for RpiInputPin {
    fn read(&self) -> GpioResult<Level> {
        Ok(from_rppal(self.pin.read()))
    }

    fn pin(&self) -> u8 {
        self.number
    }
}
