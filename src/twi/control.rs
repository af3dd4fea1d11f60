use std::fmt;

// TWCR flags
const TWINT: u8 = 0x80; // phase complete; write 1 to clear and start the next phase
const TWEA:  u8 = 0x40; // acknowledge received bytes
const TWSTA: u8 = 0x20; // (repeated) start condition
const TWSTO: u8 = 0x10; // stop condition
const TWWC:  u8 = 0x08; // write collision (read only)
const TWEN:  u8 = 0x04; // controller enable
const TWIE:  u8 = 0x01; // interrupt enable (never used: everything is polled)

const SAFE_WRITE_FLAGS: u8 = 0
	| TWINT
	| TWEA
	| TWSTA
	| TWSTO
	| TWEN
;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControlRead(pub u8);

impl ControlRead {
	// flags that are safe to write back; TWINT is dropped as writing it
	// would start the next phase
	pub fn into_write(&self) -> Control {
		Control(self.0 & SAFE_WRITE_FLAGS & !TWINT)
	}

	pub fn is_complete(&self) -> bool {
		0 != self.0 & TWINT
	}
	pub fn is_enable_ack(&self) -> bool {
		0 != self.0 & TWEA
	}
	pub fn is_start(&self) -> bool {
		0 != self.0 & TWSTA
	}
	pub fn is_stop(&self) -> bool {
		0 != self.0 & TWSTO
	}
	pub fn is_write_collision(&self) -> bool {
		0 != self.0 & TWWC
	}
	pub fn is_enabled(&self) -> bool {
		0 != self.0 & TWEN
	}
	pub fn is_interrupt_enabled(&self) -> bool {
		0 != self.0 & TWIE
	}
}

impl fmt::Display for ControlRead {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl fmt::Debug for ControlRead {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x} (", self.0)?;
		if self.is_complete() { write!(f, " [INT]")?; }
		if self.is_enable_ack() { write!(f, " [EA]")?; }
		if self.is_start() { write!(f, " [STA]")?; }
		if self.is_stop() { write!(f, " [STO]")?; }
		if self.is_write_collision() { write!(f, " [WC]")?; }
		if self.is_enabled() { write!(f, " [EN]")?; }
		if self.is_interrupt_enabled() { write!(f, " [IE]")?; }
		write!(f, " )")
	}
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Control(pub u8);

impl Control {
	pub fn off() -> Self {
		Control(0)
	}

	/// controller on, idle, not acknowledging
	pub fn enable() -> Self {
		*Control(0).set_enable()
	}

	pub fn start() -> Self {
		*Control(0)
			.set_start()
			.set_clear_complete()
			.set_enable()
	}

	/// transmit the byte in the data register
	pub fn transmit() -> Self {
		*Control(0)
			.set_clear_complete()
			.set_enable()
	}

	/// clock in one byte; `ack` tells the device whether more bytes are wanted
	pub fn receive(ack: bool) -> Self {
		let mut control = Control::transmit();
		if ack {
			control.set_enable_ack();
		}
		control
	}

	pub fn stop() -> Self {
		*Control(0)
			.set_stop()
			.set_clear_complete()
			.set_enable()
	}

	pub fn is_clear_complete(&self) -> bool {
		0 != self.0 & TWINT
	}
	pub fn set_clear_complete(&mut self) -> &mut Self {
		self.0 |= TWINT;
		self
	}

	pub fn is_enable_ack(&self) -> bool {
		0 != self.0 & TWEA
	}
	pub fn set_enable_ack(&mut self) -> &mut Self {
		self.0 |= TWEA;
		self
	}
	pub fn clear_enable_ack(&mut self) -> &mut Self {
		self.0 &= !TWEA;
		self
	}

	pub fn is_start(&self) -> bool {
		0 != self.0 & TWSTA
	}
	pub fn set_start(&mut self) -> &mut Self {
		self.0 |= TWSTA;
		self
	}

	pub fn is_stop(&self) -> bool {
		0 != self.0 & TWSTO
	}
	pub fn set_stop(&mut self) -> &mut Self {
		self.0 |= TWSTO;
		self
	}

	pub fn is_enable(&self) -> bool {
		0 != self.0 & TWEN
	}
	pub fn set_enable(&mut self) -> &mut Self {
		self.0 |= TWEN;
		self
	}
}

impl fmt::Display for Control {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x}", self.0)
	}
}

impl fmt::Debug for Control {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:02x} (", self.0)?;
		if self.is_clear_complete() { write!(f, " [INT]")?; }
		if self.is_enable_ack() { write!(f, " [EA]")?; }
		if self.is_start() { write!(f, " [STA]")?; }
		if self.is_stop() { write!(f, " [STO]")?; }
		if self.is_enable() { write!(f, " [EN]")?; }
		write!(f, " )")
	}
}
