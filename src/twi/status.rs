use std::fmt;

// only the upper five bits of TWSR are status; the low bits are the prescaler
const STATUS_MASK: u8 = 0xf8;

/// Status register contents, cached right after a phase completed.
///
/// The controller only guarantees the register while the phase-complete flag
/// is set, so it is read exactly once per phase.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Status(pub u8);

impl Status {
	pub const BUS_ERROR: Status = Status(0x00);
	pub const START: Status = Status(0x08);
	pub const REP_START: Status = Status(0x10);
	// master transmitter
	pub const MT_SLA_ACK: Status = Status(0x18);
	pub const MT_SLA_NACK: Status = Status(0x20);
	pub const MT_DATA_ACK: Status = Status(0x28);
	pub const MT_DATA_NACK: Status = Status(0x30);
	// same code in transmitter and receiver mode
	pub const ARB_LOST: Status = Status(0x38);
	// master receiver
	pub const MR_SLA_ACK: Status = Status(0x40);
	pub const MR_SLA_NACK: Status = Status(0x48);
	pub const MR_DATA_ACK: Status = Status(0x50);
	pub const MR_DATA_NACK: Status = Status(0x58);
	pub const NO_INFO: Status = Status(0xf8);

	pub fn from_register(twsr: u8) -> Self {
		Status(twsr & STATUS_MASK)
	}

	/// start or repeated start; both are fine whenever a start was requested
	pub fn is_start(&self) -> bool {
		*self == Status::START || *self == Status::REP_START
	}

	pub fn name(&self) -> Option<&'static str> {
		Some(match *self {
			Status::BUS_ERROR => "BUS_ERROR",
			Status::START => "START",
			Status::REP_START => "REP_START",
			Status::MT_SLA_ACK => "MT_SLA_ACK",
			Status::MT_SLA_NACK => "MT_SLA_NACK",
			Status::MT_DATA_ACK => "MT_DATA_ACK",
			Status::MT_DATA_NACK => "MT_DATA_NACK",
			Status::ARB_LOST => "ARB_LOST",
			Status::MR_SLA_ACK => "MR_SLA_ACK",
			Status::MR_SLA_NACK => "MR_SLA_NACK",
			Status::MR_DATA_ACK => "MR_DATA_ACK",
			Status::MR_DATA_NACK => "MR_DATA_NACK",
			Status::NO_INFO => "NO_INFO",
			_ => return None,
		})
	}
}

impl fmt::Display for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self.name() {
			Some(name) => write!(f, "0x{:02x} ({})", self.0, name),
			None => write!(f, "0x{:02x}", self.0),
		}
	}
}

impl fmt::Debug for Status {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		fmt::Display::fmt(self, f)
	}
}
