use std::time::Duration;

use clf::{NusbHost, UsbTransport};

use crate::CliError;

pub(crate) fn read_frames(
    transport: &mut UsbTransport<NusbHost>,
    count: u32,
    timeout: Duration,
) -> Result<(), CliError> {
    for _ in 0..count {
        match transport.read(timeout)? {
            Some(frame) => println!("<<< {}", hex::encode(&frame)),
            None => break,
        }
    }
    Ok(())
}
