use super::{
	Control,
	ControlRead,
};

/// Register file of the two-wire controller.
pub trait Hardware {
	fn write_control(&mut self, control: Control);
	fn read_control(&mut self) -> ControlRead;

	/// raw status register, including the prescaler bits
	fn read_status(&mut self) -> u8;
	/// only the prescaler bits are writable
	fn write_prescaler(&mut self, prescaler: u8);

	fn write_bit_rate(&mut self, divider: u8);

	fn write_data(&mut self, data: u8);
	fn read_data(&mut self) -> u8;

	// called once per poll iteration while waiting for a phase to complete
	fn spin(&mut self) {
	}
}

impl<'a, H: Hardware + ?Sized> Hardware for &'a mut H {
	fn write_control(&mut self, control: Control) {
		H::write_control(*self, control)
	}
	fn read_control(&mut self) -> ControlRead {
		H::read_control(*self)
	}
	fn read_status(&mut self) -> u8 {
		H::read_status(*self)
	}
	fn write_prescaler(&mut self, prescaler: u8) {
		H::write_prescaler(*self, prescaler)
	}
	fn write_bit_rate(&mut self, divider: u8) {
		H::write_bit_rate(*self, divider)
	}
	fn write_data(&mut self, data: u8) {
		H::write_data(*self, data)
	}
	fn read_data(&mut self) -> u8 {
		H::read_data(*self)
	}
	fn spin(&mut self) {
		H::spin(*self)
	}
}
