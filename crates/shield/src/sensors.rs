//! Local Sensor Inputs

use frame_protocol::GpioSignal;

/// GPIO input port pin of each signal
pub const PIN_MAP: [(GpioSignal, u8); 5] = [
    (GpioSignal::LeftTurn, 0),
    (GpioSignal::RightTurn, 1),
    (GpioSignal::FrontBrake, 2),
    (GpioSignal::RearBrake, 3),
    (GpioSignal::ParkingLight, 4),
];

/// Inputs sampled once per cycle, after the ECU frame
pub trait Sensors {
    /// Raw level of the GPIO input port
    fn gpio_pins(&mut self) -> u8;

    /// Air temperature ADC reading
    fn air_temp(&mut self) -> u16;
}

/// Sensors that always read the same values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedSensors {
    pub pins: u8,
    pub air_temp: u16,
}

impl Sensors for FixedSensors {
    fn gpio_pins(&mut self) -> u8 {
        self.pins
    }

    fn air_temp(&mut self) -> u16 {
        self.air_temp
    }
}
