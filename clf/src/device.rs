use std::fmt;

use log::{debug, warn};

use crate::{
    DeviceLocator, NusbHost,
    host::{NativeError, UsbDevice, UsbHost},
};

/// Snapshot of one enumerated device
///
/// Valid only at the time of the enumeration that produced it: a replugged
/// device usually comes back with a different address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus: u8,
    pub address: u8,
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bus {:03} Device {:03}: ID {:04x}:{:04x}",
            self.bus, self.address, self.vendor_id, self.product_id
        )
    }
}

/// Find the devices designated by the locator `path`
///
/// Returns `None` when `path` is not a USB locator or the host has no USB
/// support, so that callers can move on to another kind of transport.
/// `Some` with an empty list means no attached device matches.
pub fn find<H: UsbHost>(host: &H, path: &str) -> Option<Vec<DeviceIdentity>> {
    if !path.starts_with("usb") || !host.is_available() {
        return None;
    }
    let Some(locator) = DeviceLocator::parse(path) else {
        debug!("{path:?} is not a valid USB locator");
        return None;
    };
    debug!("{path:?} parsed as {locator:?}");

    let devices = match host.devices() {
        Ok(devices) => devices,
        Err(NativeError::Unavailable) => return None,
        Err(err) => {
            warn!("USB enumeration failed: {err}");
            return Some(Vec::new());
        }
    };

    Some(
        enumerate(&devices)
            .filter(|(_, identity)| locator.matches(identity))
            .map(|(_, identity)| identity)
            .collect(),
    )
}

/// [find] on the native USB host
pub fn find_devices(path: &str) -> Option<Vec<DeviceIdentity>> {
    if !path.starts_with("usb") {
        return None;
    }
    find(&NusbHost::new(), path)
}

/// Pairs each device with its identity, skipping devices that fail to
/// report one.
pub(crate) fn enumerate<D: UsbDevice>(
    devices: &[D],
) -> impl Iterator<Item = (&D, DeviceIdentity)> {
    devices
        .iter()
        .filter_map(|device| match device.identity() {
            Ok(identity) => Some((device, identity)),
            Err(err) => {
                debug!("skipping device: {err}");
                None
            }
        })
}
