//! Raspberry Pi hardware backends.
//!
//! Wires the sensor and actuator traits to real peripherals: flame and PIR
//! inputs on GPIO, an analog smoke sensor behind a PCF8591 ADC on I2C, a
//! DS18B20 probe on the one-wire sysfs interface, and buzzer/relay outputs
//! on GPIO. Only compiled on Linux.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use rppal::gpio::{Gpio, InputPin, OutputPin};
use rppal::i2c::I2c;
use tracing::debug;
use vigil_types::{Actuator, SensorFault, SensorResult};

use crate::config::{PinConfig, SmokeBusConfig};
use crate::error::{ActuatorFault, Error, Result};
use crate::traits::{ActuatorPort, SensorHub};

/// PCF8591 control byte selecting analog input N is `0x40 | N`.
const PCF8591_ANALOG_INPUT_BASE: u8 = 0x40;

/// Default one-wire device tree exposed by the `w1-gpio` kernel module.
const W1_DEVICES_PATH: &str = "/sys/bus/w1/devices";

/// DS18B20 devices register under the `28-` family prefix.
const DS18B20_PREFIX: &str = "28-";

/// Sensor hub reading the real peripherals.
pub struct RpiSensorHub {
    flame: InputPin,
    motion: InputPin,
    smoke_bus: tokio::sync::Mutex<I2c>,
    smoke_channel: u8,
    w1_root: PathBuf,
}

impl RpiSensorHub {
    /// Opens the GPIO inputs and the ADC bus.
    ///
    /// Fails when the GPIO character device or the I2C bus is missing,
    /// which usually means the interfaces are disabled in `config.txt`.
    pub fn new(pins: &PinConfig, smoke: &SmokeBusConfig) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| Error::setup(format!("GPIO init failed: {e}")))?;
        let flame = gpio
            .get(pins.flame)
            .map_err(|e| Error::setup(format!("flame pin {}: {e}", pins.flame)))?
            .into_input();
        let motion = gpio
            .get(pins.motion)
            .map_err(|e| Error::setup(format!("motion pin {}: {e}", pins.motion)))?
            .into_input();

        let mut bus = I2c::with_bus(smoke.i2c_bus)
            .map_err(|e| Error::setup(format!("I2C bus {}: {e}", smoke.i2c_bus)))?;
        bus.set_slave_address(u16::from(smoke.address))
            .map_err(|e| Error::setup(format!("ADC address {:#04x}: {e}", smoke.address)))?;

        debug!(
            flame = pins.flame,
            motion = pins.motion,
            i2c_bus = smoke.i2c_bus,
            adc_channel = smoke.channel,
            "hardware sensor hub ready"
        );
        Ok(Self {
            flame,
            motion,
            smoke_bus: tokio::sync::Mutex::new(bus),
            smoke_channel: smoke.channel,
            w1_root: PathBuf::from(W1_DEVICES_PATH),
        })
    }
}

#[async_trait]
impl SensorHub for RpiSensorHub {
    async fn read_flame(&self) -> bool {
        self.flame.is_high()
    }

    async fn read_motion(&self) -> bool {
        self.motion.is_high()
    }

    async fn read_smoke(&self) -> SensorResult<u8> {
        let mut bus = self.smoke_bus.lock().await;
        bus.write(&[PCF8591_ANALOG_INPUT_BASE | self.smoke_channel])
            .map_err(|e| SensorFault::BusWrite {
                channel: self.smoke_channel,
                reason: e.to_string(),
            })?;

        let mut byte = [0u8; 1];
        // The first byte is the previous conversion; read twice and keep
        // the second.
        for _ in 0..2 {
            bus.read(&mut byte).map_err(|e| SensorFault::BusRead {
                channel: self.smoke_channel,
                reason: e.to_string(),
            })?;
        }
        Ok(byte[0])
    }

    async fn read_temperature(&self) -> SensorResult<f32> {
        // A DS18B20 conversion blocks the sysfs read for ~750ms.
        let root = self.w1_root.clone();
        tokio::task::spawn_blocking(move || read_ds18b20(&root))
            .await
            .map_err(|e| SensorFault::Malformed {
                detail: format!("temperature read task failed: {e}"),
            })?
    }
}

/// Scans the one-wire bus for the first DS18B20 probe and reads it.
fn read_ds18b20(root: &Path) -> SensorResult<f32> {
    let entries = std::fs::read_dir(root).map_err(|e| SensorFault::NoDevice {
        kind: format!("one-wire bus unavailable: {e}"),
    })?;
    let probe = entries
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_name().to_string_lossy().starts_with(DS18B20_PREFIX))
        .ok_or_else(|| SensorFault::NoDevice {
            kind: "no DS18B20 probe on the one-wire bus".to_string(),
        })?;
    let raw = std::fs::read_to_string(probe.path().join("w1_slave")).map_err(|e| {
        SensorFault::NoDevice {
            kind: format!("DS18B20 probe went away: {e}"),
        }
    })?;
    parse_w1_slave(&raw)
}

/// Parses the kernel's `w1_slave` report into degrees Celsius.
///
/// The first line ends in `YES` when the CRC matched; the second carries
/// the reading in millidegrees after `t=`.
fn parse_w1_slave(raw: &str) -> SensorResult<f32> {
    let mut lines = raw.lines();
    let crc_line = lines.next().unwrap_or_default();
    if !crc_line.trim_end().ends_with("YES") {
        return Err(SensorFault::Malformed {
            detail: "CRC check failed".to_string(),
        });
    }
    let data_line = lines.next().unwrap_or_default();
    let millidegrees = data_line
        .split("t=")
        .nth(1)
        .and_then(|value| value.trim().parse::<i32>().ok())
        .ok_or_else(|| SensorFault::Malformed {
            detail: "missing t= field".to_string(),
        })?;
    Ok(millidegrees as f32 / 1000.0)
}

struct Outputs {
    buzzer: OutputPin,
    pump: OutputPin,
    motor: OutputPin,
}

/// Actuator port driving the buzzer and relay pins.
pub struct RpiActuatorPort {
    outputs: Mutex<Outputs>,
}

impl RpiActuatorPort {
    /// Claims the output pins, all driven low initially.
    pub fn new(pins: &PinConfig) -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| Error::setup(format!("GPIO init failed: {e}")))?;
        let claim = |pin: u8, name: &str| -> Result<OutputPin> {
            Ok(gpio
                .get(pin)
                .map_err(|e| Error::setup(format!("{name} pin {pin}: {e}")))?
                .into_output_low())
        };
        Ok(Self {
            outputs: Mutex::new(Outputs {
                buzzer: claim(pins.buzzer, "buzzer")?,
                pump: claim(pins.pump, "pump")?,
                motor: claim(pins.motor, "motor")?,
            }),
        })
    }
}

impl ActuatorPort for RpiActuatorPort {
    fn write(&self, actuator: Actuator, on: bool) -> std::result::Result<(), ActuatorFault> {
        let mut outputs = self
            .outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let pin = match actuator {
            Actuator::Buzzer => &mut outputs.buzzer,
            Actuator::Pump => &mut outputs.pump,
            Actuator::Motor => &mut outputs.motor,
        };
        // rppal pin writes cannot fail once the pin is claimed.
        if on {
            pin.set_high();
        } else {
            pin.set_low();
        }
        Ok(())
    }
}
