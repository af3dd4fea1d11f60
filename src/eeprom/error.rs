use crate::config::AddressWidth;
use crate::diag;
use crate::twi::Status;

use super::{
	Operation,
	Phase,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
pub enum TransferError {
	#[fail(display = "{}: bus controller timed out in {} phase", op, phase)]
	Timeout { op: Operation, phase: Phase },

	#[fail(display = "{}: device didn't respond to {} selection attempts", op, attempts)]
	DeviceNotReady { op: Operation, attempts: u16 },

	#[fail(display = "{}: gave up after losing arbitration {} times", op, restarts)]
	ArbitrationLost { op: Operation, restarts: u16 },

	#[fail(display = "{}: device rejected data in {} phase", op, phase)]
	Rejected { op: Operation, phase: Phase },

	#[fail(display = "{}: device ended the transfer in {} phase", op, phase)]
	NoData { op: Operation, phase: Phase },

	#[fail(display = "{}: unexpected status {} in {} phase", op, status, phase)]
	Unexpected { op: Operation, phase: Phase, status: Status },

	#[fail(display = "offset 0x{:04x} not reachable with {:?} addressing", offset, width)]
	OutOfRange { offset: u16, width: AddressWidth },
}

impl TransferError {
	pub fn operation(&self) -> Option<Operation> {
		match *self {
			TransferError::Timeout { op, .. } => Some(op),
			TransferError::DeviceNotReady { op, .. } => Some(op),
			TransferError::ArbitrationLost { op, .. } => Some(op),
			TransferError::Rejected { op, .. } => Some(op),
			TransferError::NoData { op, .. } => Some(op),
			TransferError::Unexpected { op, .. } => Some(op),
			TransferError::OutOfRange { .. } => None,
		}
	}

	/// early termination by the device, not a malfunction
	pub fn is_benign(&self) -> bool {
		match self {
			TransferError::NoData { .. } => true,
			_ => false,
		}
	}

	/// character for the console, if this error has one
	pub fn diagnostic_code(&self) -> Option<u8> {
		match *self {
			TransferError::Timeout { op, phase } => Some(diag::timeout_code(op, phase)),
			TransferError::Unexpected { phase: Phase::Start, .. } => Some(diag::START_REFUSED_CODE),
			_ => None,
		}
	}
}
