use crate::frame::{self, Command, FrameError, MAX_READ_SIZE};
use crate::values::{
    decode_data_ready, decode_u32, encode_u32, identity_read_len, DeviceIdentity, DeviceInfo,
    DeviceStatus, FirmwareVersion, Measurement, MeasurementFormat, OutputFormat,
};
use crate::Error;
use core::convert::TryFrom;
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::i2c::{Read, Write};
use log::{debug, trace, warn};

/// I2C address of the SPS30
pub const DEFAULT_ADDRESS: u8 = 0x69;

/// An SPS30 on the I2C bus `I2C`
///
/// The driver does not track which state (sleep, idle or measuring) the sensor is in, nor which
/// output format the running measurement uses. Issuing commands in an order the sensor accepts
/// is up to the caller.
///
/// ```text
///   Sleep ──wake_up──► Idle ──start_measurement──► Measuring
///     ▲                 │ ▲                            │
///     └─────sleep───────┘ └─────stop_measurement───────┘
/// ```
pub struct Sps30<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<E, I2C, D> Sps30<I2C, D>
where
    I2C: Read<Error = E> + Write<Error = E>,
    D: DelayMs<u16>,
{
    pub fn new(i2c: I2C, delay: D, address: u8) -> Self {
        Sps30 {
            i2c,
            delay,
            address,
        }
    }

    /// Create a driver for a sensor at [`DEFAULT_ADDRESS`]
    pub fn new_default(i2c: I2C, delay: D) -> Self {
        Self::new(i2c, delay, DEFAULT_ADDRESS)
    }

    /// Release the I2C bus and delay
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Error<E>> {
        self.i2c.write(self.address, bytes).map_err(Error::I2c)
    }

    fn settle(&mut self, command: Command) {
        let wait = command.execution_time_ms();
        if wait > 0 {
            self.delay.delay_ms(wait);
        }
    }

    fn send_command(&mut self, command: Command) -> Result<(), Error<E>> {
        debug!("sps30: {:?}", command);
        self.write(&frame::encode_pointer(command))?;
        self.settle(command);
        Ok(())
    }

    fn send_with_data(&mut self, command: Command, data: &[[u8; 2]]) -> Result<(), Error<E>> {
        debug!("sps30: {:?} with {} words", command, data.len());
        let frame = frame::encode_write(command, data).ok_or(Error::InvalidArgument)?;
        self.write(&frame)?;
        self.settle(command);
        Ok(())
    }

    /// Set the pointer to `command` and read `buf.len()` bytes back
    fn read_frame(&mut self, command: Command, buf: &mut [u8]) -> Result<(), Error<E>> {
        debug!("sps30: {:?}, reading {} bytes", command, buf.len());
        self.write(&frame::encode_pointer(command))?;
        self.i2c.read(self.address, buf).map_err(Error::I2c)?;
        trace!("sps30: received {:02x?}", buf);
        Ok(())
    }

    fn checked<T>(command: Command, decoded: Result<T, FrameError>) -> Result<T, Error<E>> {
        decoded.map_err(|e| {
            match e {
                FrameError::Crc(e) => warn!(
                    "sps30: {:?} word {} checksum mismatch, got {:#04x} expected {:#04x}",
                    command, e.word, e.received, e.computed
                ),
                FrameError::Length(len) => {
                    warn!("sps30: {:?} frame of {} bytes is not whole words", command, len)
                }
            }
            Error::from(e)
        })
    }

    /// Reset the sensor, it will be in idle mode afterwards
    ///
    /// Blocks for 100ms while the sensor restarts.
    pub fn reset(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::Reset)
    }

    /// Put the sensor into sleep mode
    ///
    /// Only valid from idle mode. The I2C interface of the sensor is switched off until
    /// [`wake_up`](Self::wake_up) is called.
    pub fn sleep(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::Sleep)
    }

    /// Bring the sensor from sleep mode back to idle mode
    ///
    /// The pointer is written twice: the first write re-enables the sensor's I2C interface, the
    /// second one performs the wake-up.
    pub fn wake_up(&mut self) -> Result<(), Error<E>> {
        let pointer = frame::encode_pointer(Command::WakeUp);
        debug!("sps30: {:?}", Command::WakeUp);
        self.write(&pointer)?;
        self.settle(Command::WakeUp);
        self.write(&pointer)
    }

    /// Start measuring, values will be reported in `format`
    pub fn start_measurement(&mut self, format: OutputFormat) -> Result<(), Error<E>> {
        self.send_with_data(Command::StartMeasurement, &[[format as u8, 0x00]])
    }

    /// Start measuring in the format that `F` decodes
    ///
    /// Pairs with [`read_measurement::<F>`](Self::read_measurement) so the two cannot disagree.
    pub fn start_measurement_as<F: MeasurementFormat>(&mut self) -> Result<(), Error<E>> {
        self.start_measurement(F::FORMAT)
    }

    /// Start measuring with a format given as its wire byte (`0x03` float, `0x05` integer)
    pub fn start_measurement_raw(&mut self, format: u8) -> Result<(), Error<E>> {
        let format = OutputFormat::try_from(format)?;
        self.start_measurement(format)
    }

    /// Stop measuring and return to idle mode
    pub fn stop_measurement(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::StopMeasurement)
    }

    /// Run the fan at full speed to blow out dust
    ///
    /// Only valid while measuring. Blocks for the 10 seconds the cleaning takes.
    pub fn start_fan_cleaning(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::StartFanCleaning)
    }

    /// Check whether a new set of values is available
    pub fn read_data_ready(&mut self) -> Result<bool, Error<E>> {
        let mut buf = [0u8; 3];
        self.read_frame(Command::ReadDataReady, &mut buf)?;
        Self::checked(Command::ReadDataReady, decode_data_ready(&buf))
    }

    /// Read the latest values, decoded as `F`
    ///
    /// `F` has to match the format the measurement was started with, the sensor gives no
    /// indication of which format it sends.
    ///
    /// ```no_run
    /// # use linux_embedded_hal::{Delay, I2cdev};
    /// # use sps30_bh1750::{Float, OutputFormat, Sps30};
    /// # let i2c = I2cdev::new("/dev/i2c-1").unwrap();
    /// let mut sensor = Sps30::new_default(i2c, Delay);
    /// sensor.start_measurement(OutputFormat::Float).unwrap();
    /// let values = sensor.read_measurement::<Float>().unwrap();
    /// println!("PM2.5: {} µg/m³", values.pm2_5);
    /// ```
    pub fn read_measurement<F: MeasurementFormat>(
        &mut self,
    ) -> Result<Measurement<F::Value>, Error<E>> {
        let mut buf = [0u8; MAX_READ_SIZE];
        let buf = &mut buf[..F::FRAME_LEN];
        self.read_frame(Command::ReadMeasuredValues, buf)?;
        Self::checked(Command::ReadMeasuredValues, F::decode(buf))
    }

    /// Read the latest values once the sensor reports new data
    pub fn read_measurement_nb<F: MeasurementFormat>(
        &mut self,
    ) -> nb::Result<Measurement<F::Value>, Error<E>> {
        if !self.read_data_ready()? {
            return Err(nb::Error::WouldBlock);
        }
        Ok(self.read_measurement::<F>()?)
    }

    /// Read the automatic fan cleaning interval, in seconds
    pub fn read_auto_cleaning_interval(&mut self) -> Result<u32, Error<E>> {
        let mut buf = [0u8; 6];
        self.read_frame(Command::AutoCleaningInterval, &mut buf)?;
        Self::checked(Command::AutoCleaningInterval, decode_u32(&buf))
    }

    /// Set the automatic fan cleaning interval, in seconds; 0 disables automatic cleaning
    pub fn write_auto_cleaning_interval(&mut self, seconds: u32) -> Result<(), Error<E>> {
        self.send_with_data(Command::AutoCleaningInterval, &encode_u32(seconds))
    }

    /// Read an identity string into at most `capacity - 1` characters
    ///
    /// A capacity of 1 leaves no room for characters and returns an empty string without
    /// touching the bus.
    pub fn read_device_info(
        &mut self,
        info: DeviceInfo,
        capacity: usize,
    ) -> Result<DeviceIdentity, Error<E>> {
        if capacity == 0 {
            return Err(Error::InvalidArgument);
        }
        if capacity == 1 {
            return Ok(DeviceIdentity::default());
        }
        let command = match info {
            DeviceInfo::ProductType => Command::ReadProductType,
            DeviceInfo::SerialNumber => Command::ReadSerialNumber,
        };
        let mut buf = [0u8; MAX_READ_SIZE];
        let buf = &mut buf[..identity_read_len(capacity)];
        self.read_frame(command, buf)?;
        Self::checked(command, DeviceIdentity::decode(buf, capacity))
    }

    /// Read the product type, "00080000" for the SPS30
    pub fn read_product_type(&mut self) -> Result<DeviceIdentity, Error<E>> {
        let info = DeviceInfo::ProductType;
        self.read_device_info(info, info.capacity())
    }

    pub fn read_serial_number(&mut self) -> Result<DeviceIdentity, Error<E>> {
        let info = DeviceInfo::SerialNumber;
        self.read_device_info(info, info.capacity())
    }

    pub fn read_version(&mut self) -> Result<FirmwareVersion, Error<E>> {
        let mut buf = [0u8; 3];
        self.read_frame(Command::ReadVersion, &mut buf)?;
        Self::checked(Command::ReadVersion, FirmwareVersion::decode(&buf))
    }

    pub fn read_device_status(&mut self) -> Result<DeviceStatus, Error<E>> {
        let mut buf = [0u8; 6];
        self.read_frame(Command::ReadDeviceStatus, &mut buf)?;
        Self::checked(Command::ReadDeviceStatus, DeviceStatus::decode(&buf))
    }

    /// Clear the device status register
    pub fn clear_device_status(&mut self) -> Result<(), Error<E>> {
        self.send_command(Command::ClearDeviceStatus)
    }
}
