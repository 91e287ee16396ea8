use std::io;

/// Failure of a transport operation on a recognized USB device
///
/// The native diagnostic behind each kind is logged where the failure is
/// mapped and not carried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbError {
    DriverUnavailable,
    DeviceNotFound,
    AccessDenied,
    DeviceBusy,
    Timeout,
    IoFailure,
}

impl std::error::Error for UsbError {}

impl std::fmt::Display for UsbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UsbError::DriverUnavailable => {
                write!(f, "USB support is not available")
            }
            UsbError::DeviceNotFound => write!(f, "No such device"),
            UsbError::AccessDenied => write!(f, "Permission denied"),
            UsbError::DeviceBusy => write!(f, "Device or resource busy"),
            UsbError::Timeout => write!(f, "Timeout"),
            UsbError::IoFailure => write!(f, "Input/output error"),
        }
    }
}

impl From<UsbError> for io::ErrorKind {
    fn from(err: UsbError) -> Self {
        match err {
            UsbError::DriverUnavailable => io::ErrorKind::Unsupported,
            UsbError::DeviceNotFound => io::ErrorKind::NotFound,
            UsbError::AccessDenied => io::ErrorKind::PermissionDenied,
            UsbError::DeviceBusy => io::ErrorKind::ResourceBusy,
            UsbError::Timeout => io::ErrorKind::TimedOut,
            UsbError::IoFailure => io::ErrorKind::Other,
        }
    }
}

impl From<UsbError> for io::Error {
    fn from(err: UsbError) -> Self {
        io::Error::new(io::ErrorKind::from(err), err)
    }
}
