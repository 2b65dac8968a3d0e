use linux_embedded_hal::{Delay, I2cdev};
use nb::block;
use sps30_bh1750::bh1750::Mode;
use sps30_bh1750::{Bh1750, Float, OutputFormat, Sps30};
use std::env::args;

fn main() {
    let bus = args().nth(1).unwrap_or_else(|| "/dev/i2c-1".into());

    let mut sps = Sps30::new_default(I2cdev::new(&bus).unwrap(), Delay);
    println!("product type: {:?}", sps.read_product_type().unwrap().as_str());
    println!("serial: {:?}", sps.read_serial_number().unwrap().as_str());
    println!("firmware: {:?}", sps.read_version().unwrap());

    sps.start_measurement(OutputFormat::Float).unwrap();
    dbg!(block!(sps.read_measurement_nb::<Float>()).unwrap());
    sps.stop_measurement().unwrap();

    let mut light = Bh1750::new_default(I2cdev::new(&bus).unwrap(), Delay);
    println!("{} lx", light.read_lux(Mode::ContinuousHigh).unwrap());
}
