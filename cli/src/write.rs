use std::time::Duration;

use clf::{NusbHost, UsbTransport};

use crate::{CliError, read::read_frames};

pub(crate) fn write_frame(
    transport: &mut UsbTransport<NusbHost>,
    frame: &[u8],
    timeout: Duration,
    response: bool,
) -> Result<(), CliError> {
    println!(">>> {}", hex::encode(frame));
    transport.write(frame, timeout)?;
    if response {
        read_frames(transport, 1, timeout)?;
    }
    Ok(())
}
