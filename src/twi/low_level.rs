use super::{
	Control,
	Hardware,
	Status,
};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "bus controller didn't complete the phase within {} polls", polls)]
pub struct PollTimeout {
	pub polls: u16,
}

trait InternalLowLevel: Hardware {
	// busy-wait for the phase-complete flag, then cache the status
	fn _wait_complete(&mut self, max_polls: u16) -> Result<Status, PollTimeout> {
		for _ in 0..max_polls {
			if self.read_control().is_complete() {
				let status = Status::from_register(self.read_status());
				trace!("TWSR: {}", status);
				return Ok(status);
			}
			self.spin();
		}
		Err(PollTimeout { polls: max_polls })
	}

	fn _execute(&mut self, control: Control, max_polls: u16) -> Result<Status, PollTimeout> {
		trace!("TWCR write: {:?}", control);
		self.write_control(control);
		self._wait_complete(max_polls)
	}
}

impl<H: Hardware + ?Sized> InternalLowLevel for H {
}

pub trait LowLevel: Hardware {
	fn send_start(&mut self, max_polls: u16) -> Result<Status, PollTimeout> {
		self._execute(Control::start(), max_polls)
	}

	fn send_byte(&mut self, data: u8, max_polls: u16) -> Result<Status, PollTimeout> {
		self.write_data(data);
		self._execute(Control::transmit(), max_polls)
	}

	// the data register is only meaningful for the MR_DATA_* status codes
	fn receive_byte(&mut self, ack: bool, max_polls: u16) -> Result<(Status, u8), PollTimeout> {
		let status = self._execute(Control::receive(ack), max_polls)?;
		Ok((status, self.read_data()))
	}

	// the controller doesn't flag completion of a stop condition
	fn send_stop(&mut self) {
		trace!("TWCR write: {:?}", Control::stop());
		self.write_control(Control::stop());
	}

	fn begin_transaction(&mut self, max_polls: u16) -> Transaction<Self> {
		Transaction {
			hardware: self,
			max_polls,
			stop_owed: false,
		}
	}
}

impl<H: Hardware + ?Sized> LowLevel for H {
}

/// Exclusive use of the bus for one operation.
///
/// Once a start condition has been confirmed the bus has to be released
/// with a stop condition; this happens exactly once, when the transaction
/// is dropped. If no start was ever confirmed there is nothing to undo.
pub struct Transaction<'a, H: ?Sized + LowLevel + 'a> {
	hardware: &'a mut H,
	max_polls: u16,
	stop_owed: bool,
}

impl<'a, H: ?Sized + LowLevel> Transaction<'a, H> {
	/// start condition; repeated start if the bus is already held
	pub fn start(&mut self) -> Result<Status, PollTimeout> {
		let status = self.hardware.send_start(self.max_polls)?;
		if status.is_start() {
			self.stop_owed = true;
		}
		Ok(status)
	}

	pub fn send(&mut self, data: u8) -> Result<Status, PollTimeout> {
		self.hardware.send_byte(data, self.max_polls)
	}

	pub fn receive(&mut self, ack: bool) -> Result<(Status, u8), PollTimeout> {
		self.hardware.receive_byte(ack, self.max_polls)
	}

	pub fn is_started(&self) -> bool {
		self.stop_owed
	}
}

impl<'a, H: ?Sized + LowLevel> Drop for Transaction<'a, H> {
	fn drop(&mut self) {
		if self.stop_owed {
			self.hardware.send_stop();
		}
	}
}
