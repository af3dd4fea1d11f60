use super::*;

use crate::config::AddressWidth;
use crate::sim::{
	BusEvent,
	BusPhase,
	Faults,
	SimulatedBus,
};
use crate::twi::Status;

fn patterned(address_width: AddressWidth) -> Vec<u8> {
	let size = match address_width {
		AddressWidth::Folded => 0x800,
		AddressWidth::Wide => 0x1000,
	};
	(0..size).map(|i| (i as u8) ^ ((i >> 8) as u8)).collect()
}

fn open(bus: SimulatedBus, config: Config) -> Eeprom<SimulatedBus, Vec<u8>> {
	let config = Config {
		diagnostics: true,
		..config
	};
	Eeprom::new(bus, Vec::new(), config).unwrap()
}

fn wide(faults: Faults) -> Eeprom<SimulatedBus, Vec<u8>> {
	let mut memory = patterned(AddressWidth::Wide);
	memory[0x0123] = 0x42;
	let bus = SimulatedBus::with_memory(AddressWidth::Wide, memory).with_faults(faults);
	open(bus, Config::with_address_width(AddressWidth::Wide))
}

fn sent_fill_bytes(bus: &SimulatedBus) -> usize {
	// skip start, select and both address bytes
	bus.events().iter().skip(4).filter(|&&e| e == BusEvent::Sent(FILL_BYTE)).count()
}

#[test]
fn read_returns_stored_byte() {
	let mut ee = wide(Faults::default());
	assert_eq!(ee.read_byte(0x0123), 0x42);

	let bus = ee.hardware();
	assert_eq!(
		bus.events(),
		&[
			BusEvent::Start,
			BusEvent::Sent(0xa0),
			BusEvent::Sent(0x01),
			BusEvent::Sent(0x23),
			BusEvent::RepeatedStart,
			BusEvent::Sent(0xa1),
			BusEvent::Received(0x42),
			BusEvent::Stop,
		]
	);
	assert_eq!(bus.phase(), BusPhase::Stopped);
	assert!(ee.console().is_empty());
}

#[test]
fn read_in_folded_mode_puts_high_bits_into_select() {
	let memory = patterned(AddressWidth::Folded);
	let expected = memory[0x234];
	let bus = SimulatedBus::with_memory(AddressWidth::Folded, memory);
	let mut ee = open(bus, Config::with_address_width(AddressWidth::Folded));

	assert_eq!(ee.try_read_byte(0x234).unwrap(), expected);
	assert_eq!(
		ee.hardware().events(),
		&[
			BusEvent::Start,
			BusEvent::Sent(0xa4),
			BusEvent::Sent(0x34),
			BusEvent::RepeatedStart,
			BusEvent::Sent(0xa5),
			BusEvent::Received(expected),
			BusEvent::Stop,
		]
	);
}

#[test]
fn folded_offset_out_of_range_touches_nothing() {
	let bus = SimulatedBus::new(AddressWidth::Folded);
	let mut ee = open(bus, Config::with_address_width(AddressWidth::Folded));

	assert_eq!(
		ee.try_read_byte(0x800),
		Err(TransferError::OutOfRange { offset: 0x800, width: AddressWidth::Folded })
	);
	assert_eq!(ee.read_byte(0x800), READ_FAILED);
	assert!(ee.hardware().events().is_empty());
}

#[test]
fn busy_device_beyond_retry_ceiling() {
	let mut ee = wide(Faults {
		busy_selects: MAX_ITER_U32,
		..Faults::default()
	});
	assert_eq!(
		ee.try_read_byte(0x0123),
		Err(TransferError::DeviceNotReady { op: Operation::Read, attempts: 200 })
	);

	let bus = ee.hardware();
	assert_eq!(bus.write_selects(), 200);
	assert_eq!(bus.stops(), 1);
	assert_eq!(bus.events().last(), Some(&BusEvent::Stop));
	assert_eq!(bus.phase(), BusPhase::Stopped);
}

const MAX_ITER_U32: u32 = crate::config::MAX_ITER as u32;

#[test]
fn busy_device_sentinel() {
	let mut ee = wide(Faults {
		busy_selects: 1000,
		..Faults::default()
	});
	assert_eq!(ee.read_byte(0x0123), READ_FAILED);
	assert_eq!(ee.hardware().write_selects(), 200);
	assert_eq!(ee.hardware().stops(), 1);
}

#[test]
fn busy_device_on_last_allowed_attempt() {
	let mut ee = wide(Faults {
		busy_selects: MAX_ITER_U32 - 1,
		..Faults::default()
	});
	assert_eq!(ee.read_byte(0x0123), 0x42);
	assert_eq!(ee.hardware().write_selects(), 200);
	assert_eq!(ee.hardware().stops(), 1);
}

#[test]
fn busy_device_recovers_after_two_attempts() {
	let mut ee = wide(Faults {
		busy_selects: 2,
		..Faults::default()
	});
	assert_eq!(ee.try_read_byte(0x0123), Ok(0x42));

	let bus = ee.hardware();
	assert_eq!(bus.write_selects(), 3);
	// selection is retried with a repeated start, the bus stays ours
	assert_eq!(
		&bus.events()[..6],
		&[
			BusEvent::Start,
			BusEvent::Sent(0xa0),
			BusEvent::RepeatedStart,
			BusEvent::Sent(0xa0),
			BusEvent::RepeatedStart,
			BusEvent::Sent(0xa0),
		]
	);
	assert_eq!(bus.stops(), 1);
}

#[test]
fn small_retry_ceiling() {
	let bus = SimulatedBus::new(AddressWidth::Wide).with_faults(Faults {
		busy_selects: 3,
		..Faults::default()
	});
	let mut ee = open(bus, Config {
		max_iter: 3,
		..Config::default()
	});
	assert_eq!(
		ee.try_invalidate(),
		Err(TransferError::DeviceNotReady { op: Operation::Invalidate, attempts: 3 })
	);
	assert_eq!(ee.hardware().write_selects(), 3);
	assert_eq!(ee.hardware().stops(), 1);
	assert!(ee.hardware().written().is_empty());
}

#[test]
fn arbitration_loss_on_first_start_restarts_in_place() {
	let mut ee = wide(Faults {
		arbitration_losses: 1,
		busy_selects: MAX_ITER_U32 - 1,
		..Faults::default()
	});
	// the restart didn't use up a selection attempt
	assert_eq!(ee.try_read_byte(0x0123), Ok(0x42));

	let bus = ee.hardware();
	assert_eq!(&bus.events()[..2], &[BusEvent::ArbitrationLost, BusEvent::Start]);
	assert_eq!(bus.stops(), 1);
	assert_eq!(bus.events().last(), Some(&BusEvent::Stop));
	assert_eq!(bus.write_selects(), 200);
}

#[test]
fn endless_arbitration_loss_gives_up() {
	let mut ee = wide(Faults {
		arbitration_losses: 10_000,
		..Faults::default()
	});
	assert_eq!(
		ee.try_read_byte(0x0123),
		Err(TransferError::ArbitrationLost { op: Operation::Read, restarts: 200 })
	);
	let bus = ee.hardware();
	assert_eq!(bus.count(BusEvent::ArbitrationLost), 201);
	// never got the bus, nothing to release
	assert_eq!(bus.stops(), 0);
}

#[test]
fn controller_never_completes_start() {
	let mut ee = wide(Faults {
		stall_after: Some(0),
		..Faults::default()
	});
	assert_eq!(ee.read_byte(0x0123), READ_FAILED);

	let bus = ee.hardware();
	assert_eq!(bus.polls(), crate::config::MAX_TIMEOUT as usize);
	assert_eq!(bus.stops(), 0);
	assert_eq!(ee.console(), b"1");
}

#[test]
fn every_read_phase_is_bounded() {
	// commands: start, select, high, low, repeated start, select, receive
	for (stall_after, code) in b"1234567".iter().enumerate() {
		let mut ee = wide(Faults {
			stall_after: Some(stall_after),
			..Faults::default()
		});
		assert_eq!(ee.read_byte(0x0123), READ_FAILED);
		let bus = ee.hardware();
		assert_eq!(bus.polls(), stall_after + crate::config::MAX_TIMEOUT as usize);
		assert_eq!(bus.stops(), if stall_after == 0 { 0 } else { 1 });
		assert_eq!(ee.console(), &[*code]);
	}
}

#[test]
fn stall_in_fill_phase() {
	let mut ee = wide(Faults {
		stall_after: Some(6),
		..Faults::default()
	});
	assert_eq!(
		ee.try_invalidate(),
		Err(TransferError::Timeout { op: Operation::Invalidate, phase: Phase::Fill(2) })
	);
	assert_eq!(ee.hardware().stops(), 1);
	assert_eq!(ee.console(), b"E");
}

#[test]
fn diagnostics_can_be_disabled() {
	let bus = SimulatedBus::new(AddressWidth::Wide).with_faults(Faults {
		stall_after: Some(0),
		..Faults::default()
	});
	let mut ee = Eeprom::new(bus, Vec::new(), Config {
		diagnostics: false,
		..Config::default()
	}).unwrap();
	ee.invalidate();
	assert!(ee.console().is_empty());
}

#[test]
fn refused_start_condition_is_not_stopped() {
	let mut ee = wide(Faults {
		start_status: Some(Status::BUS_ERROR),
		..Faults::default()
	});
	assert_eq!(
		ee.try_read_byte(0x0123),
		Err(TransferError::Unexpected { op: Operation::Read, phase: Phase::Start, status: Status::BUS_ERROR })
	);
	assert_eq!(ee.hardware().stops(), 0);
	assert_eq!(ee.console(), b"M");
}

#[test]
fn address_nack_ends_read_early() {
	let mut ee = wide(Faults {
		nack_address: true,
		..Faults::default()
	});
	let result = ee.try_read_byte(0x0123);
	assert_eq!(result, Err(TransferError::NoData { op: Operation::Read, phase: Phase::AddressHigh }));
	assert!(result.unwrap_err().is_benign());
	assert_eq!(ee.hardware().stops(), 1);
	assert_eq!(ee.hardware().count(BusEvent::RepeatedStart), 0);
	assert!(ee.console().is_empty());
}

#[test]
fn read_select_nack_ends_read_early() {
	let mut ee = wide(Faults {
		nack_read_select: true,
		..Faults::default()
	});
	assert_eq!(ee.read_byte(0x0123), READ_FAILED);
	assert_eq!(ee.hardware().count(BusEvent::RepeatedStart), 1);
	assert_eq!(ee.hardware().count(BusEvent::Received(0x42)), 0);
	assert_eq!(ee.hardware().stops(), 1);
}

#[test]
fn invalidate_fills_first_page() {
	let bus = SimulatedBus::with_memory(AddressWidth::Wide, vec![0u8; 0x1000]);
	let mut ee = open(bus, Config::default());
	assert_eq!(ee.try_invalidate(), Ok(()));

	let bus = ee.hardware();
	let mut expected = vec![
		BusEvent::Start,
		BusEvent::Sent(0xa0),
		BusEvent::Sent(0x00),
		BusEvent::Sent(0x00),
	];
	expected.extend(std::iter::repeat(BusEvent::Sent(0xff)).take(8));
	expected.push(BusEvent::Stop);
	assert_eq!(bus.events(), &expected[..]);

	assert_eq!(bus.written(), &[0, 1, 2, 3, 4, 5, 6, 7]);
	assert!(bus.memory()[..8].iter().all(|&b| b == 0xff));
	assert!(bus.memory()[8..].iter().all(|&b| b == 0x00));
	assert_eq!(bus.starts(), 1);
	assert_eq!(bus.stops(), 1);
}

#[test]
fn invalidate_in_folded_mode_sends_one_address_byte() {
	let bus = SimulatedBus::with_memory(AddressWidth::Folded, vec![0u8; 0x800]);
	let mut ee = open(bus, Config::with_address_width(AddressWidth::Folded));
	ee.invalidate();

	let bus = ee.hardware();
	assert_eq!(&bus.events()[..3], &[BusEvent::Start, BusEvent::Sent(0xa0), BusEvent::Sent(0x00)]);
	assert_eq!(bus.count(BusEvent::Sent(0xff)), 8);
	assert_eq!(bus.written(), &[0, 1, 2, 3, 4, 5, 6, 7]);
}

#[test]
fn write_protected_fill_aborts() {
	let bus = SimulatedBus::with_memory(AddressWidth::Wide, vec![0u8; 0x1000]).with_faults(Faults {
		reject_data_at: Some(4),
		..Faults::default()
	});
	let mut ee = open(bus, Config::default());
	assert_eq!(
		ee.try_invalidate(),
		Err(TransferError::Rejected { op: Operation::Invalidate, phase: Phase::Fill(4) })
	);

	let bus = ee.hardware();
	// fifth fill byte was NACKed, nothing sent after it
	assert_eq!(sent_fill_bytes(bus), 5);
	assert_eq!(bus.stops(), 1);
	assert_eq!(bus.events().last(), Some(&BusEvent::Stop));
	assert!(bus.written().is_empty());
}

#[test]
fn invalidate_failure_is_silent() {
	let bus = SimulatedBus::new(AddressWidth::Wide).with_faults(Faults {
		reject_data_at: Some(0),
		..Faults::default()
	});
	let mut ee = open(bus, Config::default());
	ee.invalidate();
	assert_eq!(ee.hardware().stops(), 1);
}

#[test]
fn classify_by_phase() {
	let op = Operation::Read;
	assert_eq!(classify(op, Phase::Start, Status::REP_START), Ok(Flow::Next));
	assert_eq!(classify(op, Phase::RepeatedStart, Status::START), Ok(Flow::Next));
	assert_eq!(classify(op, Phase::Start, Status::ARB_LOST), Ok(Flow::Rearbitrate));
	assert_eq!(classify(op, Phase::SelectWrite, Status::MT_SLA_NACK), Ok(Flow::Busy));
	assert_eq!(classify(op, Phase::AddressLow, Status::MT_DATA_NACK), Ok(Flow::Done));
	assert_eq!(classify(op, Phase::SelectRead, Status::MR_SLA_NACK), Ok(Flow::Done));
	assert_eq!(classify(op, Phase::SelectRead, Status::ARB_LOST), Ok(Flow::Rearbitrate));
	assert_eq!(classify(op, Phase::Receive, Status::MR_DATA_ACK), Ok(Flow::Next));
	assert_eq!(classify(Operation::Invalidate, Phase::Fill(3), Status::ARB_LOST), Ok(Flow::Rearbitrate));
	assert_eq!(
		classify(Operation::Invalidate, Phase::Fill(3), Status::MT_DATA_NACK),
		Err(TransferError::Rejected { op: Operation::Invalidate, phase: Phase::Fill(3) })
	);
	assert_eq!(
		classify(op, Phase::Receive, Status::ARB_LOST),
		Err(TransferError::Unexpected { op, phase: Phase::Receive, status: Status::ARB_LOST })
	);
	assert_eq!(
		classify(op, Phase::SelectWrite, Status::MR_SLA_ACK),
		Err(TransferError::Unexpected { op, phase: Phase::SelectWrite, status: Status::MR_SLA_ACK })
	);
}

#[test]
fn phase_sequences() {
	let config = Config::with_address_width(AddressWidth::Wide);
	let mut phase = Phase::Start;
	let mut read = vec![phase];
	while let Some(next) = phase.next(Operation::Read, &config) {
		read.push(next);
		phase = next;
	}
	assert_eq!(read, vec![
		Phase::Start,
		Phase::SelectWrite,
		Phase::AddressHigh,
		Phase::AddressLow,
		Phase::RepeatedStart,
		Phase::SelectRead,
		Phase::Receive,
	]);

	let config = Config::with_address_width(AddressWidth::Folded);
	let mut phase = Phase::Start;
	let mut count = 1;
	while let Some(next) = phase.next(Operation::Invalidate, &config) {
		assert_ne!(next, Phase::AddressHigh);
		count += 1;
		phase = next;
	}
	assert_eq!(phase, Phase::Fill(7));
	assert_eq!(count, 3 + 8);
}

#[test]
fn read_consecutive_bytes() {
	let mut ee = wide(Faults::default());
	let mut buf = [0u8; 4];
	ee.read(0x0122, &mut buf).unwrap();
	let expected: Vec<u8> = (0x0122..0x0126).map(|i: u16| if i == 0x0123 { 0x42 } else { (i as u8) ^ 0x01 }).collect();
	assert_eq!(&buf[..], &expected[..]);
	// one transaction per byte
	assert_eq!(ee.hardware().stops(), 4);
}

#[test]
fn reader_ends_at_address_limit() {
	let bus = SimulatedBus::new(AddressWidth::Folded);
	let mut ee = open(bus, Config::with_address_width(AddressWidth::Folded));
	let read: Vec<_> = ee.reader(0x7fe).collect();
	assert_eq!(read, vec![Ok(0xff), Ok(0xff)]);

	let mut buf = [0u8; 3];
	assert_eq!(
		ee.read(0x7fe, &mut buf),
		Err(TransferError::OutOfRange { offset: 0x800, width: AddressWidth::Folded })
	);
}

#[test]
fn open_initializes_bus() {
	let bus = SimulatedBus::new(AddressWidth::Wide);
	let ee = open_eeprom(bus, Vec::new(), Config::default()).unwrap();
	let (bus, console, _) = ee.into_parts();
	assert_eq!(bus.bit_rate(), 72);
	assert!(bus.is_enabled());
	assert!(bus.events().is_empty());
	assert_eq!(console, b"\n");
}

#[test]
fn open_rejects_bad_page_size() {
	let bus = SimulatedBus::new(AddressWidth::Wide);
	let config = Config {
		page_size: 6,
		..Config::default()
	};
	assert!(open_eeprom(bus, Vec::new(), config).is_err());
}

#[test]
fn errors_display_phase() {
	let e = TransferError::Timeout { op: Operation::Invalidate, phase: Phase::Fill(3) };
	assert_eq!(e.to_string(), "invalidate: bus controller timed out in fill byte 3 phase");
	assert_eq!(e.diagnostic_code(), Some(b'E'));
	assert_eq!(e.operation(), Some(Operation::Invalidate));
}
