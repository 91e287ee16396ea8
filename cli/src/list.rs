use clf::{DeviceIdentity, find_devices};

use crate::CliError;

pub(crate) fn list_devices(path: &str) -> Result<(), CliError> {
    let devices = find_devices(path)
        .ok_or_else(|| CliError::NotUsbLocator(path.to_string()))?;
    if devices.is_empty() {
        println!("No USB device found");
    } else {
        print_devices(&devices);
    }
    Ok(())
}

fn print_devices(devices: &[DeviceIdentity]) {
    for device in devices {
        println!("{device}");
    }
}
