use std::{process::ExitCode, time::Duration};

use clap::{Parser, Subcommand};
use clap_num::number_range;

use clf::{DEFAULT_TIMEOUT, NusbHost, UsbTransport, find};
use error::CliError;
use list::*;
use read::*;
use write::*;

mod error;
mod list;
mod read;
mod write;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// list USB devices
    List {
        /// device locator (ex: "usb", "usb:04e6", "usb:001:004")
        #[clap(env = "RCLF_DEVICE", default_value = "usb")]
        path: String,
    },
    /// read frames from a reader
    Read {
        /// device locator (ex: "usb:04e6:5591")
        #[clap(env = "RCLF_DEVICE", default_value = "usb")]
        path: String,
        /// timeout in milliseconds, 0 waits forever
        #[clap(short, long, value_parser=timeout_ms,
               default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
        timeout: u64,
        /// number of frames to read
        #[clap(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
    /// write a frame to a reader
    Write {
        /// frame in hex (ex: "0000ff02fed4022a00" or "00:00:ff:02")
        #[clap(value_parser=parse_frame)]
        frame: Frame,
        /// device locator (ex: "usb:04e6:5591")
        #[clap(env = "RCLF_DEVICE", default_value = "usb")]
        path: String,
        /// timeout in milliseconds, 0 waits forever
        #[clap(short, long, value_parser=timeout_ms,
               default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
        timeout: u64,
        /// read one response frame
        #[clap(short, long)]
        response: bool,
    },
}

impl Default for Commands {
    fn default() -> Self {
        Commands::List {
            path: "usb".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Frame(Vec<u8>);

fn timeout_ms(s: &str) -> Result<u64, String> {
    number_range(s, 0, 600_000)
}

fn parse_frame(s: &str) -> Result<Frame, String> {
    let digits: String = s
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':')
        .collect();
    if digits.is_empty() {
        return Err("empty frame".into());
    }
    hex::decode(digits).map(Frame).map_err(|err| err.to_string())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::init();

    if let Err(err) = match &cli.command.unwrap_or_default() {
        Commands::List { path } => list_devices(path),
        Commands::Read {
            path,
            timeout,
            count,
        } => open_transport(path).and_then(|mut transport| {
            read_frames(&mut transport, *count, Duration::from_millis(*timeout))
        }),
        Commands::Write {
            frame,
            path,
            timeout,
            response,
        } => open_transport(path).and_then(|mut transport| {
            write_frame(
                &mut transport,
                &frame.0,
                Duration::from_millis(*timeout),
                *response,
            )
        }),
    } {
        eprintln!("Error: {err}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn open_transport(path: &str) -> Result<UsbTransport<NusbHost>, CliError> {
    let host = NusbHost::new();
    let devices = find(&host, path)
        .ok_or_else(|| CliError::NotUsbLocator(path.to_string()))?;
    let device = match devices.as_slice() {
        [] => return Err(CliError::NoDevice),
        [device] => *device,
        _ => return Err(CliError::ManyDevices(devices.len())),
    };

    let transport = UsbTransport::connect(host, device.bus, device.address)?;
    println!(
        "{device} {} {}",
        transport.manufacturer_name().unwrap_or_default(),
        transport.product_name().unwrap_or_default(),
    );
    Ok(transport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame() {
        assert_eq!(
            parse_frame("0000ff02fed4022a00"),
            Ok(Frame(vec![
                0x00, 0x00, 0xff, 0x02, 0xfe, 0xd4, 0x02, 0x2a, 0x00
            ]))
        );
        assert_eq!(
            parse_frame("00:00:FF 02"),
            Ok(Frame(vec![0x00, 0x00, 0xff, 0x02]))
        );
        assert!(parse_frame("").is_err());
        assert!(parse_frame(" : ").is_err());
        assert_eq!(
            parse_frame("0"),
            Err(hex::FromHexError::OddLength.to_string())
        );
        assert_eq!(
            parse_frame("0g"),
            Err(hex::FromHexError::InvalidHexCharacter { c: 'g', index: 1 }
                .to_string())
        );
        assert!(parse_frame("+1").is_err());
    }

    #[test]
    fn test_timeout_ms() {
        assert_eq!(timeout_ms("0"), Ok(0));
        assert_eq!(timeout_ms("2500"), Ok(2500));
        assert!(timeout_ms("-1").is_err());
        assert!(timeout_ms("600001").is_err());
    }
}
