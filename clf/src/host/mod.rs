//! Native USB capability consumed by the resolver and the transport
//!
//! [`native::NusbHost`] is the production implementation.

use std::{fmt, time::Duration};

use crate::{DeviceIdentity, InterfaceSetting, descriptor::EndpointDescriptor};

#[cfg(test)]
pub(crate) mod fake;
pub mod native;

/// Error reported by the native USB stack
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NativeError {
    /// No USB support on this host
    Unavailable,
    /// Device disconnected or gone
    NoDevice,
    Access,
    Busy,
    Timeout,
    /// Transfer failed (stall, fault, ...)
    Io(String),
    Other(String),
}

impl std::error::Error for NativeError {}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeError::Unavailable => write!(f, "USB not supported"),
            NativeError::NoDevice => write!(f, "no device"),
            NativeError::Access => write!(f, "access denied"),
            NativeError::Busy => write!(f, "resource busy"),
            NativeError::Timeout => write!(f, "timed out"),
            NativeError::Io(msg) => write!(f, "I/O error: {msg}"),
            NativeError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

/// Enumeration side of the USB stack
pub trait UsbHost {
    type Device: UsbDevice;

    /// `false` when the host has no usable USB support at all
    fn is_available(&self) -> bool;

    /// Currently attached devices, in native enumeration order
    fn devices(&self) -> Result<Vec<Self::Device>, NativeError>;
}

/// One enumerated, not yet opened device
pub trait UsbDevice {
    type Handle: UsbHandle;

    fn identity(&self) -> Result<DeviceIdentity, NativeError>;

    /// Interface alternate settings of all configurations, in descriptor order
    fn interface_settings(&self) -> Result<Vec<InterfaceSetting>, NativeError>;

    /// Manufacturer and product strings
    fn strings(&self) -> Result<(Option<String>, Option<String>), NativeError>;

    fn open(&self) -> Result<Self::Handle, NativeError>;
}

/// Opened device, released on drop
///
/// A zero `timeout` waits until the transfer completes.
pub trait UsbHandle {
    fn claim_interface(&mut self, number: u8) -> Result<(), NativeError>;

    fn bulk_read(
        &mut self,
        endpoint: &EndpointDescriptor,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, NativeError>;

    /// Returns the number of bytes transferred
    fn bulk_write(
        &mut self,
        endpoint: &EndpointDescriptor,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, NativeError>;
}

pub(crate) type HandleOf<H> = <<H as UsbHost>::Device as UsbDevice>::Handle;
