use std::fmt;
use std::str;

/// Maximal number of selection attempts while waiting for the device.
///
/// Large enough to let a pending write complete, low enough to abort in
/// case the device is broken or not present at all. With a 100 kHz bus
/// clock the start condition plus select byte take about 10 µs, and a write
/// cycle is not supposed to exceed ~10 ms, so normal operation should not
/// need more than 100 attempts.
pub const MAX_ITER: u16 = 200;

/// Maximal number of polls while waiting for the controller to finish one phase.
pub const MAX_TIMEOUT: u16 = 250;

/// Smallest write granularity all 24Cxx vendors agree on; must be a power of two.
pub const PAGE_SIZE: usize = 8;

/// Device class select address (8-bit form, direction bit cleared).
pub const EEPROM_ADDR: u8 = 0xa0;

/// System clock the bus divider is derived from.
pub const CPU_HZ: u32 = 16_000_000;

/// Larger devices (from 24C32 on) take a 16-bit word address.
pub const ADDRESS_WIDTH: AddressWidth = AddressWidth::Wide;

/// Width of the word address sent after the select byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AddressWidth {
	/// one address byte; address bits 8..10 are folded into the select byte
	Folded,
	/// two address bytes, high byte first
	Wide,
}

impl AddressWidth {
	/// highest offset reachable with this width
	pub fn limit(self) -> u32 {
		match self {
			AddressWidth::Folded => 0x800,
			AddressWidth::Wide => 0x1_0000,
		}
	}
}

impl str::FromStr for AddressWidth {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"8" | "folded" => Ok(AddressWidth::Folded),
			"16" | "wide" => Ok(AddressWidth::Wide),
			_ => bail!("unknown address width {:?} (expected 8 or 16)", s),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
	pub device_address: u8,
	pub address_width: AddressWidth,
	pub max_iter: u16,
	pub max_arbitration: u16,
	pub max_timeout: u16,
	pub page_size: usize,
	pub cpu_hz: u32,
	pub diagnostics: bool,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			device_address: EEPROM_ADDR,
			address_width: ADDRESS_WIDTH,
			max_iter: MAX_ITER,
			max_arbitration: MAX_ITER,
			max_timeout: MAX_TIMEOUT,
			page_size: PAGE_SIZE,
			cpu_hz: CPU_HZ,
			diagnostics: cfg!(feature = "diagnostics"),
		}
	}
}

impl Config {
	pub fn with_address_width(address_width: AddressWidth) -> Self {
		Config {
			address_width,
			..Config::default()
		}
	}

	pub fn check(&self) -> crate::AResult<()> {
		ensure!(self.page_size.is_power_of_two(), "page size {} is not a power of two", self.page_size);
		ensure!(self.page_size <= 0x100, "page size {} too large", self.page_size);
		ensure!(self.max_iter > 0, "need at least one selection attempt");
		ensure!(self.max_timeout > 0, "need at least one poll per phase");
		ensure!(self.device_address & 0x01 == 0, "device address 0x{:02x} has the direction bit set", self.device_address);
		if self.address_width == AddressWidth::Folded {
			ensure!(self.device_address & 0x0e == 0,
				"device address 0x{:02x} overlaps the folded address bits", self.device_address
			);
		}
		Ok(())
	}

	/// select byte (direction bit cleared) for a transaction at `offset`
	pub fn select_address(&self, offset: u16) -> u8 {
		match self.address_width {
			AddressWidth::Folded => self.device_address | ((((offset >> 8) & 0x07) as u8) << 1),
			AddressWidth::Wide => self.device_address,
		}
	}
}

/// Memory offset as given on the command line (decimal or `0x` hex)
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Offset(pub u16);

impl fmt::Display for Offset {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "0x{:04x}", self.0)
	}
}

impl str::FromStr for Offset {
	type Err = ::failure::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let value = with_context!(("invalid offset: {}", s), {
			if s.starts_with("0x") || s.starts_with("0X") {
				u16::from_str_radix(&s[2..], 16).map_err(|e| e.into())
			} else {
				s.parse::<u16>().map_err(|e| e.into())
			}
		})?;
		Ok(Offset(value))
	}
}
