use std::ptr;

use super::{
	Control,
	ControlRead,
	Hardware,
};

// register offsets relative to TWBR
const TWBR: usize = 0;
const TWSR: usize = 1;
const TWDR: usize = 3;
const TWCR: usize = 4;

const TWSR_PRESCALER_MASK: u8 = 0x03;

/// Data space address of TWBR on the ATmega48/88/168/328 family.
pub const ATMEGA328P_TWBR: usize = 0xb8;

/// Memory mapped controller registers.
#[derive(Debug)]
pub struct Mmio {
	base: ptr::NonNull<u8>,
}

impl Mmio {
	/// `base` must point to TWBR, followed by TWSR, TWAR, TWDR and TWCR,
	/// valid for volatile access as long as the returned value lives.
	pub unsafe fn new(base: *mut u8) -> Option<Self> {
		ptr::NonNull::new(base).map(|base| Mmio { base })
	}

	pub unsafe fn atmega328p() -> Self {
		Mmio {
			base: ptr::NonNull::new_unchecked(ATMEGA328P_TWBR as *mut u8),
		}
	}

	fn read(&self, offset: usize) -> u8 {
		unsafe { ptr::read_volatile(self.base.as_ptr().add(offset)) }
	}

	fn write(&mut self, offset: usize, data: u8) {
		unsafe { ptr::write_volatile(self.base.as_ptr().add(offset), data) }
	}
}

impl Hardware for Mmio {
	fn write_control(&mut self, control: Control) {
		self.write(TWCR, control.0);
	}

	fn read_control(&mut self) -> ControlRead {
		ControlRead(self.read(TWCR))
	}

	fn read_status(&mut self) -> u8 {
		self.read(TWSR)
	}

	fn write_prescaler(&mut self, prescaler: u8) {
		self.write(TWSR, prescaler & TWSR_PRESCALER_MASK);
	}

	fn write_bit_rate(&mut self, divider: u8) {
		self.write(TWBR, divider);
	}

	fn write_data(&mut self, data: u8) {
		self.write(TWDR, data);
	}

	fn read_data(&mut self) -> u8 {
		self.read(TWDR)
	}
}
