//! USB bulk transport for contactless card readers based on [`nusb`]
//!
//! Resolves a device locator such as `usb:04e6:5591` or `usb:001:004` into
//! the attached devices it designates, and exchanges raw frames with one of
//! them over its bulk endpoints. Reader command/response framing is left to
//! the caller.
//!
//! Locator grammar:
//! - `usb` matches every device
//! - `usb:VVVV[:PPPP]` filters on hexadecimal vendor (and product) ID
//! - `usb:BBB[:DDD]` filters on decimal bus number (and device address)
//!
//! # Example
//!
//! The following example lists the devices matching a locator:
//! ```
//! use clf::find_devices;
//!
//! match find_devices("usb:054c") {
//!     Some(devices) => {
//!         if devices.is_empty() {
//!             println!("No Sony reader found");
//!         } else {
//!             for device in &devices {
//!                 println!("Found {device}");
//!             }
//!         }
//!     }
//!     None => println!("USB is not available"),
//! }
//! ```
//!
//! [`nusb`]: https://docs.rs/nusb

/// Timeout used by callers that do not specify one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000u64);

/// Largest frame a single bulk IN transfer returns.
pub const MAX_FRAME_LEN: usize = 300;

/// Interface claimed on every reader.
pub const READER_INTERFACE: u8 = 0;

mod connection;
mod descriptor;
mod device;
mod error;
pub mod host;
mod locator;

use std::time::Duration;

// Re-exports
pub use connection::UsbTransport;
pub use descriptor::{
    Direction, EndpointDescriptor, InterfaceSetting, TransferType,
};
pub use device::{DeviceIdentity, find, find_devices};
pub use error::UsbError;
pub use host::native::NusbHost;
pub use locator::DeviceLocator;
