use std::fmt::Display;

use clf::UsbError;

pub enum CliError {
    Usb(UsbError),
    NotUsbLocator(String),
    NoDevice,
    ManyDevices(usize),
}

impl From<UsbError> for CliError {
    fn from(value: UsbError) -> Self {
        CliError::Usb(value)
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usb(err) => write!(f, "USB error: {err}"),
            CliError::NotUsbLocator(path) => {
                write!(f, "{path:?} is not a USB device locator")
            }
            CliError::NoDevice => write!(f, "No USB device"),
            CliError::ManyDevices(count) => write!(
                f,
                "{count} USB devices match, use usb:BUS:ADDRESS to pick one"
            ),
        }
    }
}
