use std::fmt;

use crate::config::{
	AddressWidth,
	Config,
};
use crate::twi::Status;

use super::TransferError;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Operation {
	Read,
	Invalidate,
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Operation::Read => write!(f, "read"),
			Operation::Invalidate => write!(f, "invalidate"),
		}
	}
}

/// Bus phase the engine is currently driving.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Phase {
	Start,
	SelectWrite,
	AddressHigh,
	AddressLow,
	RepeatedStart,
	SelectRead,
	Receive,
	/// index of the fill byte within the page
	Fill(u16),
}

impl Phase {
	/// phase following a successful `self`; `None` when the operation is complete
	pub fn next(self, op: Operation, config: &Config) -> Option<Phase> {
		Some(match (self, op) {
			(Phase::Start, _) => Phase::SelectWrite,
			(Phase::SelectWrite, _) => match config.address_width {
				AddressWidth::Wide => Phase::AddressHigh,
				AddressWidth::Folded => Phase::AddressLow,
			},
			(Phase::AddressHigh, _) => Phase::AddressLow,
			(Phase::AddressLow, Operation::Read) => Phase::RepeatedStart,
			(Phase::AddressLow, Operation::Invalidate) => Phase::Fill(0),
			(Phase::RepeatedStart, _) => Phase::SelectRead,
			(Phase::SelectRead, _) => Phase::Receive,
			(Phase::Receive, _) => return None,
			(Phase::Fill(n), _) => {
				if (n as usize) + 1 >= config.page_size {
					return None;
				}
				Phase::Fill(n + 1)
			},
		})
	}
}

impl fmt::Display for Phase {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Phase::Start => write!(f, "start"),
			Phase::SelectWrite => write!(f, "select (write)"),
			Phase::AddressHigh => write!(f, "address high"),
			Phase::AddressLow => write!(f, "address low"),
			Phase::RepeatedStart => write!(f, "repeated start"),
			Phase::SelectRead => write!(f, "select (read)"),
			Phase::Receive => write!(f, "receive"),
			Phase::Fill(n) => write!(f, "fill byte {}", n),
		}
	}
}

/// How to continue after a phase completed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flow {
	Next,
	/// device NACKed its selection: still busy writing, select again
	Busy,
	/// another master won the bus: start over without counting an attempt
	Rearbitrate,
	/// device ended the transfer early; release the bus
	Done,
}

/// Map the cached status of a completed phase to the next step.
pub fn classify(op: Operation, phase: Phase, status: Status) -> Result<Flow, TransferError> {
	let flow = match (phase, status) {
		(Phase::Start, s) | (Phase::RepeatedStart, s) if s.is_start() => Flow::Next,

		(Phase::SelectWrite, Status::MT_SLA_ACK) => Flow::Next,
		(Phase::SelectWrite, Status::MT_SLA_NACK) => Flow::Busy,

		(Phase::AddressHigh, Status::MT_DATA_ACK) => Flow::Next,
		(Phase::AddressLow, Status::MT_DATA_ACK) => Flow::Next,
		(Phase::AddressHigh, Status::MT_DATA_NACK) => Flow::Done,
		(Phase::AddressLow, Status::MT_DATA_NACK) => Flow::Done,

		(Phase::SelectRead, Status::MR_SLA_ACK) => Flow::Next,
		(Phase::SelectRead, Status::MR_SLA_NACK) => Flow::Done,

		(Phase::Receive, Status::MR_DATA_ACK) => Flow::Next,
		(Phase::Receive, Status::MR_DATA_NACK) => Flow::Next,

		(Phase::Fill(_), Status::MT_DATA_ACK) => Flow::Next,
		// write protected
		(Phase::Fill(_), Status::MT_DATA_NACK) => return Err(TransferError::Rejected { op, phase }),

		(Phase::Receive, _) => return Err(TransferError::Unexpected { op, phase, status }),
		(_, Status::ARB_LOST) => Flow::Rearbitrate,

		_ => return Err(TransferError::Unexpected { op, phase, status }),
	};
	Ok(flow)
}

/// Bounded retry bookkeeping for one operation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Attempts {
	op: Operation,
	selections: u16,
	max_selections: u16,
	restarts: u16,
	max_restarts: u16,
}

impl Attempts {
	pub fn new(op: Operation, config: &Config) -> Self {
		Attempts {
			op,
			selections: 1,
			max_selections: config.max_iter,
			restarts: 0,
			max_restarts: config.max_arbitration,
		}
	}

	pub fn selections(&self) -> u16 {
		self.selections
	}

	pub fn restarts(&self) -> u16 {
		self.restarts
	}

	/// account for another selection attempt after a busy NACK
	pub fn retry(&mut self) -> Result<(), TransferError> {
		if self.selections >= self.max_selections {
			return Err(TransferError::DeviceNotReady { op: self.op, attempts: self.selections });
		}
		self.selections += 1;
		Ok(())
	}

	/// restarts after lost arbitration don't count as selection attempts
	pub fn rearbitrate(&mut self) -> Result<(), TransferError> {
		if self.restarts >= self.max_restarts {
			return Err(TransferError::ArbitrationLost { op: self.op, restarts: self.restarts });
		}
		self.restarts += 1;
		Ok(())
	}
}
