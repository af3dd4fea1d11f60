#[macro_use]
extern crate clap;
#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

extern crate twi_eeprom_boot;
use twi_eeprom_boot::*;

use std::fs;
use std::io;
use std::process::exit;

use twi_eeprom_boot::config::Offset;
use twi_eeprom_boot::diag::IoConsole;
use twi_eeprom_boot::sim::{
	Faults,
	SimulatedBus,
};

type SimEeprom = Eeprom<SimulatedBus, IoConsole<io::Stderr>>;

fn get_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<T>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	let param = match matches.value_of(name) {
		Some(p) => p,
		None => bail!("missing parameter {}", name),
	};
	param.parse::<T>().map_err(|e| {
		let e = failure::Error::from(e);
		let msg = format!("invalid paramater {}: {}", name, e);
		e.context(msg).into()
	})
}

fn get_opt_param<T>(matches: &clap::ArgMatches, name: &str) -> AResult<Option<T>>
where
	T: std::str::FromStr,
	failure::Error: From<<T as std::str::FromStr>::Err>,
{
	if matches.is_present(name) {
		get_param(matches, name).map(Some)
	} else {
		Ok(None)
	}
}

fn open_simulated(matches: &clap::ArgMatches) -> AResult<SimEeprom> {
	let address_width: AddressWidth = get_opt_param(matches, "width")?.unwrap_or(config::ADDRESS_WIDTH);

	let mut bus = match matches.value_of("image") {
		Some(path) => {
			let image = fs::read(path).map_err(|e| {
				let msg = format!("couldn't read image {}: {}", path, e);
				failure::Error::from(e).context(msg)
			})?;
			ensure!(!image.is_empty(), "image {} is empty", path);
			ensure!(image.len() as u32 <= address_width.limit(),
				"image {} too large for {:?} addressing ({} bytes)", path, address_width, image.len()
			);
			SimulatedBus::with_memory(address_width, image)
		},
		None => SimulatedBus::new(address_width),
	};

	bus.faults = Faults {
		busy_selects: get_opt_param(matches, "busy")?.unwrap_or(0),
		arbitration_losses: get_opt_param(matches, "arbitration")?.unwrap_or(0),
		reject_data_at: if matches.is_present("protect") { Some(0) } else { None },
		stall_after: get_opt_param(matches, "stall")?,
		..Faults::default()
	};

	let config = Config {
		diagnostics: matches.is_present("diagnostics") || Config::default().diagnostics,
		..Config::with_address_width(address_width)
	};

	open_eeprom(bus, IoConsole(io::stderr()), config)
}

fn print_events(matches: &clap::ArgMatches, ee: &SimEeprom) {
	if !matches.is_present("events") {
		return;
	}
	let events: Vec<String> = ee.hardware().events().iter().map(|e| e.to_string()).collect();
	println!("bus: {}", events.join(" "));
}

fn hexdump(start: u32, data: &[u8]) {
	for (i, chunk) in data.chunks(16).enumerate() {
		print!("{:04x} ", start as usize + i * 16);
		for (j, b) in chunk.iter().enumerate() {
			if j == 8 {
				print!(" ");
			}
			print!(" {:02x}", b);
		}
		println!();
	}
}

fn read(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let offset: Offset = get_param(sub_m, "OFFSET")?;
	let count: usize = get_opt_param(sub_m, "COUNT")?.unwrap_or(1);
	let mut ee = open_simulated(matches)?;

	let mut failed = false;
	for (i, result) in ee.reader(offset.0).take(count).enumerate() {
		let address = offset.0 as usize + i;
		match result {
			Ok(data) => println!("@{:04x}: {:02x}", address, data),
			Err(e) => {
				println!("@{:04x}: -- ({})", address, e);
				failed = true;
			},
		}
	}
	print_events(matches, &ee);

	if failed {
		exit(1);
	}
	Ok(())
}

fn dump(matches: &clap::ArgMatches, sub_m: &clap::ArgMatches) -> AResult<()> {
	let mut ee = open_simulated(matches)?;
	let length = match get_opt_param(sub_m, "LENGTH")? {
		Some(length) => length,
		None => ee.hardware().memory().len(),
	};

	let mut data = Vec::new();
	for result in ee.reader(0).take(length) {
		// same as the boot stage would see it
		data.push(result.unwrap_or(eeprom::READ_FAILED));
	}
	hexdump(0, &data);

	Ok(())
}

fn invalidate(matches: &clap::ArgMatches) -> AResult<()> {
	let mut ee = open_simulated(matches)?;
	let page_size = ee.config().page_size;

	if let Err(e) = ee.try_invalidate() {
		error!("{}", e);
		print_events(matches, &ee);
		exit(1);
	}
	print_events(matches, &ee);

	let mut page = vec![0u8; page_size];
	ee.read(0, &mut page)?;
	hexdump(0, &page);

	Ok(())
}

fn main_app() -> AResult<()> {
	let matches = clap_app!(@app (app_from_crate!())
		(@setting SubcommandRequiredElseHelp)
		(global_setting: clap::AppSettings::VersionlessSubcommands)
		(@arg width: -w --width +takes_value "word address width of the device (8 or 16)")
		(@arg image: -i --image +takes_value "initial EEPROM contents")
		(@arg busy: --busy +takes_value "NACK this many selections (device busy writing)")
		(@arg arbitration: --arbitration +takes_value "lose arbitration on this many start conditions")
		(@arg stall: --stall +takes_value "controller stops responding after this many phases")
		(@arg protect: --protect "device is write protected")
		(@arg diagnostics: -d --diagnostics "print single-character error codes on stderr")
		(@arg events: -e --events "show what happened on the bus")
		(@subcommand read =>
			(about: "read bytes, one transaction each")
			(@arg OFFSET: +required "offset to read from (decimal or 0x hex)")
			(@arg COUNT: "number of bytes to read")
		)
		(@subcommand dump =>
			(about: "dump EEPROM contents")
			(@arg LENGTH: "number of bytes to dump (default: device size)")
		)
		(@subcommand invalidate =>
			(about: "overwrite the first page with 0xff")
		)
	).get_matches();

	match matches.subcommand() {
		("read", Some(sub_m)) => {
			read(&matches, sub_m)
		},
		("dump", Some(sub_m)) => {
			dump(&matches, sub_m)
		},
		("invalidate", _) => {
			invalidate(&matches)
		},
		("", _) => bail!("no subcommand"),
		(cmd, _) => bail!("not implemented subcommand {:?}", cmd),
	}
}

fn main() {
	env_logger::from_env(env_logger::Env::default().default_filter_or("info")).init();

	if let Err(e) = main_app() {
		error!("Error: {}", e);
		exit(1);
	}
}
