/// Byte reads and region invalidation on a 24Cxx-class EEPROM.
///
/// A read is "write the word address, then read one byte":
/// - start, select byte + W, [address high], address low
/// - repeated start, select byte + R, receive one byte without ACK
/// - stop
///
/// Invalidation writes one page of 0xff at offset 0:
/// - start, select byte + W, [address high], address low
/// - `page_size` times 0xff
/// - stop
///
/// While the device is still busy with a previous write it doesn't ACK its
/// selection; the selection is then repeated, up to `Config::max_iter`
/// attempts per operation.

use crate::config::Config;
use crate::diag::Console;
use crate::twi::{
	self,
	Hardware,
	LowLevel,
	Transaction,
};

mod error;
mod phase;

pub use self::error::TransferError;

pub use self::phase::{
	Attempts,
	Flow,
	Operation,
	Phase,
	classify,
};

/// returned by `read_byte` if the transaction failed; also a valid byte value
pub const READ_FAILED: u8 = 0xff;

/// written over the whole page by `invalidate`
pub const FILL_BYTE: u8 = 0xff;

// direction bit of the select byte
const TW_WRITE: u8 = 0x00;
const TW_READ: u8 = 0x01;

pub struct Eeprom<H: Hardware, C: Console> {
	hardware: H,
	console: C,
	config: Config,
}

impl<H: Hardware, C: Console> Eeprom<H, C> {
	/// expects the bus to be initialized already (see `open_eeprom`)
	pub fn new(hardware: H, console: C, config: Config) -> crate::AResult<Self> {
		config.check()?;
		Ok(Eeprom {
			hardware,
			console,
			config,
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn hardware(&self) -> &H {
		&self.hardware
	}

	pub fn hardware_mut(&mut self) -> &mut H {
		&mut self.hardware
	}

	pub fn console(&self) -> &C {
		&self.console
	}

	pub fn into_parts(self) -> (H, C, Config) {
		(self.hardware, self.console, self.config)
	}

	/// Read one byte; `READ_FAILED` if the transaction didn't complete.
	pub fn read_byte(&mut self, offset: u16) -> u8 {
		self.try_read_byte(offset).unwrap_or(READ_FAILED)
	}

	pub fn try_read_byte(&mut self, offset: u16) -> Result<u8, TransferError> {
		self.check_offset(offset)?;
		let result = self.run(Operation::Read, offset)
			.and_then(|data| data.ok_or(TransferError::NoData { op: Operation::Read, phase: Phase::Receive }));
		self.finish(result)
	}

	/// Overwrite the first page with `FILL_BYTE`.
	///
	/// Failures are only visible in the log and on the diagnostic console.
	pub fn invalidate(&mut self) {
		let _ = self.try_invalidate();
	}

	pub fn try_invalidate(&mut self) -> Result<(), TransferError> {
		let result = self.run(Operation::Invalidate, 0).map(|_| ());
		self.finish(result)
	}

	pub fn reader(&mut self, offset: u16) -> Reader<H, C> {
		let end = self.config.address_width.limit();
		Reader {
			eeprom: self,
			offset: offset as u32,
			end,
		}
	}

	pub fn read(&mut self, offset: u16, target: &mut [u8]) -> Result<(), TransferError> {
		let mut reader = self.reader(offset);
		for t in target.iter_mut() {
			*t = match reader.next() {
				Some(r) => r?,
				None => return Err(TransferError::OutOfRange {
					offset: reader.offset as u16,
					width: reader.eeprom.config.address_width,
				}),
			};
		}
		Ok(())
	}

	fn check_offset(&self, offset: u16) -> Result<(), TransferError> {
		let width = self.config.address_width;
		if offset as u32 >= width.limit() {
			return Err(TransferError::OutOfRange { offset, width });
		}
		Ok(())
	}

	// the transaction (and with it the stop condition) is gone before we report
	fn run(&mut self, op: Operation, offset: u16) -> Result<Option<u8>, TransferError> {
		let mut tx = self.hardware.begin_transaction(self.config.max_timeout);
		let result = run_phases(&mut tx, &self.config, op, offset);
		if tx.is_started() {
			trace!("{}: releasing bus", op);
		}
		result
	}

	fn finish<T>(&mut self, result: Result<T, TransferError>) -> Result<T, TransferError> {
		if let Err(ref e) = result {
			if e.is_benign() {
				debug!("{}", e);
			} else {
				warn!("{}", e);
			}
			if self.config.diagnostics {
				if let Some(code) = e.diagnostic_code() {
					self.console.putch(code);
				}
			}
		}
		result
	}
}

/// Drive the phases of `op` until it completes, fails or the device ends it.
///
/// Returns the received byte for reads and `None` for a completed
/// invalidation.
fn run_phases<H>(tx: &mut Transaction<H>, config: &Config, op: Operation, offset: u16) -> Result<Option<u8>, TransferError>
where
	H: LowLevel + ?Sized,
{
	let select = config.select_address(offset);
	let mut attempts = Attempts::new(op, config);
	let mut phase = Phase::Start;
	let mut received = None;

	loop {
		let status = match phase {
			Phase::Start | Phase::RepeatedStart => tx.start(),
			Phase::SelectWrite => tx.send(select | TW_WRITE),
			Phase::AddressHigh => tx.send((offset >> 8) as u8),
			Phase::AddressLow => tx.send(offset as u8),
			Phase::SelectRead => tx.send(select | TW_READ),
			// single byte: NACK it so the device releases the data line
			Phase::Receive => tx.receive(false).map(|(status, data)| {
				received = Some(data);
				status
			}),
			Phase::Fill(_) => tx.send(FILL_BYTE),
		}.map_err(|_| TransferError::Timeout { op, phase })?;

		phase = match classify(op, phase, status)? {
			Flow::Next => match phase.next(op, config) {
				Some(next) => next,
				None => return Ok(received),
			},
			Flow::Busy => {
				attempts.retry()?;
				trace!("{}: device busy, selection attempt {}", op, attempts.selections());
				Phase::Start
			},
			Flow::Rearbitrate => {
				attempts.rearbitrate()?;
				debug!("{}: lost arbitration in {} phase, restart {}", op, phase, attempts.restarts());
				Phase::Start
			},
			Flow::Done => return Err(TransferError::NoData { op, phase }),
		};
	}
}

/// Consecutive single-byte reads, one transaction each.
pub struct Reader<'a, H: Hardware + 'a, C: Console + 'a> {
	eeprom: &'a mut Eeprom<H, C>,
	offset: u32,
	end: u32,
}

impl<'a, H: Hardware, C: Console> Reader<'a, H, C> {
	pub fn offset(&self) -> u32 {
		self.offset
	}
}

impl<'a, H: Hardware, C: Console> Iterator for Reader<'a, H, C> {
	type Item = Result<u8, TransferError>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.offset >= self.end {
			return None;
		}
		let result = self.eeprom.try_read_byte(self.offset as u16);
		self.offset += 1;
		Some(result)
	}
}

/// Initialize the bus and wrap it for EEPROM access.
pub fn open_eeprom<H: Hardware, C: Console>(mut hardware: H, mut console: C, config: Config) -> crate::AResult<Eeprom<H, C>> {
	config.check()?;
	twi::init_bus(&mut hardware, &mut console, config.cpu_hz);
	Eeprom::new(hardware, console, config)
}

#[cfg(test)]
mod tests;
