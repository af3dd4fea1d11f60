/// Simulated two-wire controller with a 24Cxx EEPROM attached.
///
/// Behaves like the real controller as far as the engine can tell: every
/// command clears the phase-complete flag and the (simulated) bus sets it
/// again right away, with the status code the hardware would report.
/// Faults can be injected to exercise the retry and error paths, and
/// everything happening on the bus is recorded.

use std::fmt;

use crate::config::AddressWidth;
use crate::twi::{
	Control,
	ControlRead,
	Hardware,
	Status,
};

const TWINT: u8 = 0x80;

/// Electrical state of the bus as seen by the device.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum BusPhase {
	Idle,
	StartPending,
	DeviceSelected,
	AddressHighSent,
	AddressLowSent,
	RepeatedStartPending,
	ReadSelected,
	ByteReceived,
	WriteAckReceived,
	Stopped,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum BusEvent {
	Start,
	RepeatedStart,
	ArbitrationLost,
	Sent(u8),
	Received(u8),
	Stop,
}

impl fmt::Display for BusEvent {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			BusEvent::Start => write!(f, "S"),
			BusEvent::RepeatedStart => write!(f, "Sr"),
			BusEvent::ArbitrationLost => write!(f, "ARB"),
			BusEvent::Sent(b) => write!(f, ">{:02x}", b),
			BusEvent::Received(b) => write!(f, "<{:02x}", b),
			BusEvent::Stop => write!(f, "P"),
		}
	}
}

/// Faults to inject; counters are consumed as the faults happen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Faults {
	/// NACK this many write selections (device busy writing)
	pub busy_selects: u32,
	/// lose arbitration on this many start conditions
	pub arbitration_losses: u32,
	/// NACK the n-th data byte after the word address (write protected)
	pub reject_data_at: Option<usize>,
	/// NACK word address bytes
	pub nack_address: bool,
	/// NACK read selections
	pub nack_read_select: bool,
	/// controller stops completing phases after this many commands
	pub stall_after: Option<usize>,
	/// status reported instead of a successful start
	pub start_status: Option<Status>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Mode {
	// no start condition on the bus
	Free,
	// start sent, next byte is a select byte
	Select,
	// selected for writing, `n` bytes received so far
	Write(usize),
	Read,
	// select NACKed; the device ignores everything until the next start
	Ignored,
}

pub struct SimulatedBus {
	memory: Vec<u8>,
	address_width: AddressWidth,
	device_address: u8,
	page_size: usize,
	pointer: u16,
	pending: Vec<(u16, u8)>,

	control: u8,
	status: Status,
	prescaler: u8,
	bit_rate: u8,
	data: u8,
	complete: bool,

	mode: Mode,
	phase: BusPhase,
	pub faults: Faults,

	events: Vec<BusEvent>,
	written: Vec<u16>,
	commands: usize,
	polls: usize,
}

impl SimulatedBus {
	/// blank (all 0xff) device: 4 KiB 24C32 for 16-bit addressing, 2 KiB 24C16 otherwise
	pub fn new(address_width: AddressWidth) -> Self {
		let size = match address_width {
			AddressWidth::Folded => 0x800,
			AddressWidth::Wide => 0x1000,
		};
		SimulatedBus::with_memory(address_width, vec![0xff; size])
	}

	pub fn with_memory(address_width: AddressWidth, memory: Vec<u8>) -> Self {
		assert!(!memory.is_empty());
		let page_size = match address_width {
			AddressWidth::Folded => 16,
			AddressWidth::Wide => 32,
		};
		SimulatedBus {
			memory,
			address_width,
			device_address: crate::config::EEPROM_ADDR,
			page_size,
			pointer: 0,
			pending: Vec::new(),
			control: 0,
			status: Status::NO_INFO,
			prescaler: 0,
			bit_rate: 0,
			data: 0,
			complete: false,
			mode: Mode::Free,
			phase: BusPhase::Idle,
			faults: Faults::default(),
			events: Vec::new(),
			written: Vec::new(),
			commands: 0,
			polls: 0,
		}
	}

	pub fn with_faults(mut self, faults: Faults) -> Self {
		self.faults = faults;
		self
	}

	pub fn memory(&self) -> &[u8] {
		&self.memory
	}

	pub fn phase(&self) -> BusPhase {
		self.phase
	}

	pub fn events(&self) -> &[BusEvent] {
		&self.events
	}

	/// offsets committed to memory by completed writes, in order
	pub fn written(&self) -> &[u16] {
		&self.written
	}

	pub fn bit_rate(&self) -> u8 {
		self.bit_rate
	}

	pub fn is_enabled(&self) -> bool {
		0 != self.control & Control::enable().0
	}

	pub fn commands(&self) -> usize {
		self.commands
	}

	pub fn polls(&self) -> usize {
		self.polls
	}

	pub fn count(&self, event: BusEvent) -> usize {
		self.events.iter().filter(|&&e| e == event).count()
	}

	/// start and repeated start conditions
	pub fn starts(&self) -> usize {
		self.count(BusEvent::Start) + self.count(BusEvent::RepeatedStart)
	}

	pub fn stops(&self) -> usize {
		self.count(BusEvent::Stop)
	}

	/// select bytes sent with the write direction bit
	pub fn write_selects(&self) -> usize {
		let mut count = 0;
		let mut after_start = false;
		for e in &self.events {
			match *e {
				BusEvent::Start | BusEvent::RepeatedStart => after_start = true,
				BusEvent::Sent(b) => {
					if after_start && b & 0x01 == 0 {
						count += 1;
					}
					after_start = false;
				},
				_ => after_start = false,
			}
		}
		count
	}

	fn selects_device(&self, select: u8) -> bool {
		match self.address_width {
			AddressWidth::Folded => select & 0xf0 == self.device_address & 0xf0,
			AddressWidth::Wide => select & 0xfe == self.device_address,
		}
	}

	// pointer increments wrap within the current page
	fn advance_write_pointer(&mut self) {
		let page_mask = (self.page_size - 1) as u16;
		self.pointer = (self.pointer & !page_mask) | (self.pointer.wrapping_add(1) & page_mask);
	}

	fn advance_read_pointer(&mut self) {
		self.pointer = ((self.pointer as usize + 1) % self.memory.len()) as u16;
	}

	fn commit(&mut self) {
		let len = self.memory.len();
		for (offset, data) in self.pending.drain(..) {
			self.memory[offset as usize % len] = data;
			self.written.push(offset);
		}
	}

	fn finish_phase(&mut self, status: Status) {
		self.status = status;
		self.complete = true;
	}

	fn on_stop(&mut self) {
		self.events.push(BusEvent::Stop);
		self.commit();
		self.mode = Mode::Free;
		self.phase = BusPhase::Stopped;
		self.status = Status::NO_INFO;
	}

	fn on_start(&mut self) {
		if self.faults.arbitration_losses > 0 {
			self.faults.arbitration_losses -= 1;
			self.events.push(BusEvent::ArbitrationLost);
			self.pending.clear();
			self.mode = Mode::Free;
			self.finish_phase(Status::ARB_LOST);
			return;
		}
		if let Some(status) = self.faults.start_status {
			self.finish_phase(status);
			return;
		}

		// a write transfer only ends with a stop condition
		self.pending.clear();
		if self.mode == Mode::Free {
			self.events.push(BusEvent::Start);
			self.phase = BusPhase::StartPending;
			self.mode = Mode::Select;
			self.finish_phase(Status::START);
		} else {
			self.events.push(BusEvent::RepeatedStart);
			self.phase = BusPhase::RepeatedStartPending;
			self.mode = Mode::Select;
			self.finish_phase(Status::REP_START);
		}
	}

	fn on_select(&mut self, select: u8) {
		let read = 0 != select & 0x01;
		if !self.selects_device(select) {
			self.mode = Mode::Ignored;
			self.finish_phase(if read { Status::MR_SLA_NACK } else { Status::MT_SLA_NACK });
			return;
		}

		if read {
			if self.faults.nack_read_select {
				self.mode = Mode::Ignored;
				self.finish_phase(Status::MR_SLA_NACK);
				return;
			}
			self.mode = Mode::Read;
			self.phase = BusPhase::ReadSelected;
			self.finish_phase(Status::MR_SLA_ACK);
		} else {
			if self.faults.busy_selects > 0 {
				self.faults.busy_selects -= 1;
				self.mode = Mode::Ignored;
				self.finish_phase(Status::MT_SLA_NACK);
				return;
			}
			if self.address_width == AddressWidth::Folded {
				self.pointer = ((select >> 1) & 0x07) as u16 * 0x100;
			}
			self.mode = Mode::Write(0);
			self.phase = BusPhase::DeviceSelected;
			self.finish_phase(Status::MT_SLA_ACK);
		}
	}

	fn on_write(&mut self, received: usize, data: u8) {
		let address_bytes = match self.address_width {
			AddressWidth::Folded => 1,
			AddressWidth::Wide => 2,
		};

		if received < address_bytes {
			if self.faults.nack_address {
				self.mode = Mode::Ignored;
				self.finish_phase(Status::MT_DATA_NACK);
				return;
			}
			if received + 1 < address_bytes {
				self.pointer = (data as u16) << 8;
				self.phase = BusPhase::AddressHighSent;
			} else {
				self.pointer = (self.pointer & 0xff00) | data as u16;
				self.phase = BusPhase::AddressLowSent;
			}
		} else {
			if self.faults.reject_data_at == Some(received - address_bytes) {
				// write protected: nothing of this page gets written
				self.pending.clear();
				self.mode = Mode::Ignored;
				self.finish_phase(Status::MT_DATA_NACK);
				return;
			}
			self.pending.push((self.pointer, data));
			self.advance_write_pointer();
			self.phase = BusPhase::WriteAckReceived;
		}
		self.mode = Mode::Write(received + 1);
		self.finish_phase(Status::MT_DATA_ACK);
	}

	fn on_read(&mut self, ack: bool) {
		let data = self.memory[self.pointer as usize % self.memory.len()];
		self.advance_read_pointer();
		self.data = data;
		self.events.push(BusEvent::Received(data));
		self.phase = BusPhase::ByteReceived;
		self.finish_phase(if ack { Status::MR_DATA_ACK } else { Status::MR_DATA_NACK });
	}
}

impl Hardware for SimulatedBus {
	fn write_control(&mut self, control: Control) {
		self.control = control.0 & !TWINT;
		if !control.is_enable() || !control.is_clear_complete() {
			return;
		}

		self.complete = false;
		// a stop condition never flags completion, stalled or not
		if control.is_stop() {
			self.on_stop();
			return;
		}

		self.commands += 1;
		if let Some(limit) = self.faults.stall_after {
			if self.commands > limit {
				return;
			}
		}

		if control.is_start() {
			self.on_start();
		} else {
			match self.mode {
				Mode::Free => self.finish_phase(Status::BUS_ERROR),
				Mode::Select => {
					let select = self.data;
					self.events.push(BusEvent::Sent(select));
					self.on_select(select);
				},
				Mode::Write(received) => {
					let data = self.data;
					self.events.push(BusEvent::Sent(data));
					self.on_write(received, data);
				},
				Mode::Read => self.on_read(control.is_enable_ack()),
				Mode::Ignored => {
					let data = self.data;
					self.events.push(BusEvent::Sent(data));
					self.finish_phase(Status::MT_DATA_NACK);
				},
			}
		}
	}

	fn read_control(&mut self) -> ControlRead {
		self.polls += 1;
		ControlRead(self.control | if self.complete { TWINT } else { 0 })
	}

	fn read_status(&mut self) -> u8 {
		self.status.0 | self.prescaler
	}

	fn write_prescaler(&mut self, prescaler: u8) {
		self.prescaler = prescaler & 0x03;
	}

	fn write_bit_rate(&mut self, divider: u8) {
		self.bit_rate = divider;
	}

	fn write_data(&mut self, data: u8) {
		self.data = data;
	}

	fn read_data(&mut self) -> u8 {
		self.data
	}
}
