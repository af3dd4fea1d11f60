/// Single-character diagnostic output.
///
/// The boot stage has nothing but a serial line to report problems on, so
/// each failure is reduced to one character (see `code`).
use std::io;

use crate::eeprom::{
	Operation,
	Phase,
};

pub trait Console {
	fn putch(&mut self, c: u8);
}

impl<'a, C: Console + ?Sized> Console for &'a mut C {
	fn putch(&mut self, c: u8) {
		C::putch(*self, c)
	}
}

impl Console for Vec<u8> {
	fn putch(&mut self, c: u8) {
		self.push(c);
	}
}

/// Drops everything
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct NullConsole;

impl Console for NullConsole {
	fn putch(&mut self, _c: u8) {
	}
}

/// Forwards characters to any writer (stderr in the CLI)
pub struct IoConsole<W: io::Write>(pub W);

impl<W: io::Write> Console for IoConsole<W> {
	fn putch(&mut self, c: u8) {
		if let Err(e) = self.0.write_all(&[c]).and_then(|()| self.0.flush()) {
			warn!("console output failed: {}", e);
		}
	}
}

/// character emitted when `phase` of `op` timed out
pub fn timeout_code(op: Operation, phase: Phase) -> u8 {
	match (op, phase) {
		(Operation::Read, Phase::Start) => b'1',
		(Operation::Read, Phase::SelectWrite) => b'2',
		(Operation::Read, Phase::AddressHigh) => b'3',
		(Operation::Read, Phase::AddressLow) => b'4',
		(Operation::Read, Phase::RepeatedStart) => b'5',
		(Operation::Read, Phase::SelectRead) => b'6',
		(Operation::Read, Phase::Receive) => b'7',
		(Operation::Invalidate, Phase::Start) => b'A',
		(Operation::Invalidate, Phase::SelectWrite) => b'B',
		(Operation::Invalidate, Phase::AddressHigh) => b'C',
		(Operation::Invalidate, Phase::AddressLow) => b'D',
		(Operation::Invalidate, _) => b'E',
		(Operation::Read, _) => b'7',
	}
}

/// character emitted when the very first start condition was not confirmed
pub const START_REFUSED_CODE: u8 = b'M';
