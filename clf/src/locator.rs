use std::fmt;

use crate::DeviceIdentity;

const SCHEME: &str = "usb";

/// Device filter parsed from a locator string
///
/// Forms are tried in a fixed order: `usb:VVVV[:PPPP]` (hexadecimal vendor
/// and product ID), then `usb:BBB[:DDD]` (decimal bus number and device
/// address), then a bare `usb`. The hexadecimal form requires exactly four
/// digits per field, which keeps `usb:001` a bus number. Bus and address
/// fields take any three digits; values above 255 match no device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeviceLocator {
    Any,
    VidPid {
        vendor_id: u16,
        product_id: Option<u16>,
    },
    BusAddress {
        bus: Option<u16>,
        address: Option<u16>,
    },
}

impl DeviceLocator {
    /// Parse a locator string
    ///
    /// Returns `None` for anything that is not a well-formed USB locator,
    /// including malformed strings that start with `usb`.
    pub fn parse(path: &str) -> Option<Self> {
        let rest = path.strip_prefix(SCHEME)?;
        if rest.is_empty() {
            return Some(DeviceLocator::Any);
        }

        let (first, second) = split_fields(rest)?;
        if let Some(locator) = parse_vid_pid(first, second) {
            return Some(locator);
        }
        parse_bus_address(first, second)
    }

    /// Whether `device` passes every filter of this locator
    pub fn matches(&self, device: &DeviceIdentity) -> bool {
        match *self {
            DeviceLocator::Any => true,
            DeviceLocator::VidPid {
                vendor_id,
                product_id,
            } => {
                device.vendor_id == vendor_id
                    && product_id.is_none_or(|id| device.product_id == id)
            }
            DeviceLocator::BusAddress { bus, address } => {
                bus.is_none_or(|bus| u16::from(device.bus) == bus)
                    && address.is_none_or(|address| {
                        u16::from(device.address) == address
                    })
            }
        }
    }
}

impl fmt::Display for DeviceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}")?;
        match *self {
            DeviceLocator::Any => Ok(()),
            DeviceLocator::VidPid {
                vendor_id,
                product_id,
            } => {
                write!(f, ":{vendor_id:04x}")?;
                match product_id {
                    Some(id) => write!(f, ":{id:04x}"),
                    None => Ok(()),
                }
            }
            DeviceLocator::BusAddress { bus, address } => {
                if let Some(bus) = bus {
                    write!(f, ":{bus:03}")?;
                }
                match address {
                    Some(address) => write!(f, ":{address:03}"),
                    None => Ok(()),
                }
            }
        }
    }
}

/// Split `:first[:second]`, rejecting a missing leading colon and any
/// third field.
fn split_fields(rest: &str) -> Option<(&str, Option<&str>)> {
    let fields = rest.strip_prefix(':')?;
    match fields.split_once(':') {
        Some((_, second)) if second.contains(':') => None,
        Some((first, second)) => Some((first, Some(second))),
        None => Some((fields, None)),
    }
}

fn parse_vid_pid(first: &str, second: Option<&str>) -> Option<DeviceLocator> {
    let vendor_id = hex_field(first)?;
    let product_id = match second {
        Some(field) => Some(hex_field(field)?),
        None => None,
    };
    Some(DeviceLocator::VidPid {
        vendor_id,
        product_id,
    })
}

fn parse_bus_address(
    first: &str,
    second: Option<&str>,
) -> Option<DeviceLocator> {
    let bus = decimal_field(first)?;
    let address = match second {
        Some(field) => Some(decimal_field(field)?),
        None => None,
    };
    Some(DeviceLocator::BusAddress {
        bus: Some(bus),
        address,
    })
}

fn hex_field(field: &str) -> Option<u16> {
    if field.len() != 4 || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u16::from_str_radix(field, 16).ok()
}

fn decimal_field(field: &str) -> Option<u16> {
    if !(1..=3).contains(&field.len())
        || !field.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    field.parse().ok()
}
