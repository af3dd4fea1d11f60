/// Master mode driver for the AVR "two-wire interface" (I²C compatible).
///
/// Every phase (start, select byte, data byte, stop) is started by writing
/// the control register with the phase-complete flag set; the controller
/// clears the flag, drives the bus and sets the flag again once the phase
/// completed, at which point the status register tells how it went.
///
/// There are no interrupts: completion is busy-polled with an explicit bound
/// on the number of polls, so a missing or stuck device can't hang us.

mod control;
mod hardware;
mod low_level;
mod mmio;
mod status;

pub use self::control::{
	Control,
	ControlRead,
};

pub use self::hardware::Hardware;

pub use self::low_level::{
	LowLevel,
	PollTimeout,
	Transaction,
};

pub use self::mmio::{
	ATMEGA328P_TWBR,
	Mmio,
};

pub use self::status::Status;

use crate::diag::Console;

/// target bus clock
pub const BUS_HZ: u32 = 100_000;

// below this system clock the formula for 100 kHz underflows
const LOW_SPEED_CPU_HZ: u32 = 3_600_000;
const LOW_SPEED_DIVIDER: u8 = 10;

/// TWBR value for ~100 kHz with prescaler 1: SCL = CPU / (16 + 2 * TWBR)
pub fn bit_rate_divider(cpu_hz: u32) -> u8 {
	if cpu_hz < LOW_SPEED_CPU_HZ {
		return LOW_SPEED_DIVIDER;
	}
	let divider = (cpu_hz / BUS_HZ - 16) / 2;
	if divider > 0xff {
		0xff
	} else {
		divider as u8
	}
}

/// bus clock resulting from `divider` (prescaler 1)
pub fn bus_frequency(cpu_hz: u32, divider: u8) -> u32 {
	cpu_hz / (16 + 2 * divider as u32)
}

/// Configure the bus clock and enable the controller.
///
/// Stays configured for the lifetime of the boot stage. The newline on the
/// console only tells someone watching that we got this far.
pub fn init_bus<H, C>(hardware: &mut H, console: &mut C, cpu_hz: u32)
where
	H: Hardware + ?Sized,
	C: Console + ?Sized,
{
	let divider = bit_rate_divider(cpu_hz);
	debug!("bus clock divider {} ({} Hz at {} Hz system clock)", divider, bus_frequency(cpu_hz, divider), cpu_hz);

	hardware.write_prescaler(0);
	hardware.write_bit_rate(divider);
	hardware.write_control(Control::enable());

	console.putch(b'\n');
}
