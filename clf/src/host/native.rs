//! USB host backed by [`nusb`](https://docs.rs/nusb)

use std::{cell::OnceCell, time::Duration};

use log::{debug, warn};
use nusb::{
    MaybeFuture,
    transfer::{Buffer, Bulk, In, Out, TransferError},
};

use super::{NativeError, UsbDevice, UsbHandle, UsbHost};
use crate::{
    DeviceIdentity, EndpointDescriptor, InterfaceSetting, TransferType,
};

/// Poll period while waiting for a transfer without timeout
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Time given to a cancelled transfer to complete
const CANCEL_TIMEOUT: Duration = Duration::from_millis(100);

/// The host's native USB stack
#[derive(Clone, Debug)]
pub struct NusbHost {
    available: bool,
}

impl NusbHost {
    /// Probe the native USB stack once
    pub fn new() -> Self {
        let available = match nusb::list_devices().wait() {
            Ok(_) => true,
            Err(err) => {
                debug!("USB enumeration failed: {err}");
                !matches!(NativeError::from(err), NativeError::Unavailable)
            }
        };
        NusbHost { available }
    }
}

impl Default for NusbHost {
    fn default() -> Self {
        Self::new()
    }
}

impl UsbHost for NusbHost {
    type Device = NusbDevice;

    fn is_available(&self) -> bool {
        self.available
    }

    fn devices(&self) -> Result<Vec<NusbDevice>, NativeError> {
        Ok(nusb::list_devices()
            .wait()?
            .map(|info| NusbDevice {
                info,
                device: OnceCell::new(),
            })
            .collect())
    }
}

/// Enumerated device; opened at most once, on first use
pub struct NusbDevice {
    info: nusb::DeviceInfo,
    device: OnceCell<nusb::Device>,
}

impl NusbDevice {
    fn device(&self) -> Result<nusb::Device, NativeError> {
        if let Some(device) = self.device.get() {
            return Ok(device.clone());
        }
        let device = self.info.open().wait()?;
        Ok(self.device.get_or_init(|| device).clone())
    }
}

impl UsbDevice for NusbDevice {
    type Handle = NusbHandle;

    fn identity(&self) -> Result<DeviceIdentity, NativeError> {
        Ok(DeviceIdentity {
            vendor_id: self.info.vendor_id(),
            product_id: self.info.product_id(),
            bus: bus_number(&self.info)?,
            address: self.info.device_address(),
        })
    }

    fn interface_settings(
        &self,
    ) -> Result<Vec<InterfaceSetting>, NativeError> {
        let device = self.device()?;
        let mut settings = Vec::new();
        for configuration in device.configurations() {
            for alt_setting in configuration.interface_alt_settings() {
                let endpoints = alt_setting
                    .endpoints()
                    .map(|ep| {
                        EndpointDescriptor::new(
                            ep.address(),
                            transfer_type(ep.transfer_type()),
                            ep.max_packet_size(),
                        )
                    })
                    .collect();
                settings.push(InterfaceSetting::new(
                    alt_setting.interface_number(),
                    alt_setting.alternate_setting(),
                    endpoints,
                ));
            }
        }
        Ok(settings)
    }

    fn strings(
        &self,
    ) -> Result<(Option<String>, Option<String>), NativeError> {
        Ok((
            self.info.manufacturer_string().map(String::from),
            self.info.product_string().map(String::from),
        ))
    }

    fn open(&self) -> Result<NusbHandle, NativeError> {
        Ok(NusbHandle {
            device: self.device()?,
            interface: None,
        })
    }
}

pub struct NusbHandle {
    device: nusb::Device,
    interface: Option<nusb::Interface>,
}

impl NusbHandle {
    fn interface(&self) -> Result<&nusb::Interface, NativeError> {
        self.interface
            .as_ref()
            .ok_or_else(|| NativeError::Other("no interface claimed".into()))
    }
}

impl UsbHandle for NusbHandle {
    fn claim_interface(&mut self, number: u8) -> Result<(), NativeError> {
        self.interface = Some(self.device.claim_interface(number).wait()?);
        Ok(())
    }

    fn bulk_read(
        &mut self,
        endpoint: &EndpointDescriptor,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, NativeError> {
        let mut ep =
            self.interface()?.endpoint::<Bulk, In>(endpoint.address())?;

        // IN requests must span whole packets
        let packet_size = ep.max_packet_size().max(1);
        let requested_len = max_len.div_ceil(packet_size) * packet_size;
        let mut buffer = Buffer::new(requested_len);
        buffer.set_requested_len(requested_len);
        ep.submit(buffer);

        let completion = if timeout.is_zero() {
            loop {
                if let Some(completion) =
                    ep.wait_next_complete(POLL_INTERVAL)
                {
                    break completion;
                }
            }
        } else {
            match ep.wait_next_complete(timeout) {
                Some(completion) => completion,
                None => {
                    ep.cancel_all();
                    let _ = ep.wait_next_complete(CANCEL_TIMEOUT);
                    return Err(NativeError::Timeout);
                }
            }
        };
        completion.status?;

        let len = completion.actual_len.min(max_len);
        Ok(completion.buffer[..len].to_vec())
    }

    fn bulk_write(
        &mut self,
        endpoint: &EndpointDescriptor,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, NativeError> {
        let mut ep =
            self.interface()?.endpoint::<Bulk, Out>(endpoint.address())?;
        ep.submit(Buffer::from(data.to_vec()));

        let completion = if timeout.is_zero() {
            loop {
                if let Some(completion) =
                    ep.wait_next_complete(POLL_INTERVAL)
                {
                    break completion;
                }
            }
        } else {
            match ep.wait_next_complete(timeout) {
                Some(completion) => completion,
                None => {
                    ep.cancel_all();
                    let _ = ep.wait_next_complete(CANCEL_TIMEOUT);
                    return Err(NativeError::Timeout);
                }
            }
        };
        completion.status?;
        Ok(completion.actual_len)
    }
}

#[cfg(target_os = "linux")]
fn bus_number(info: &nusb::DeviceInfo) -> Result<u8, NativeError> {
    Ok(info.busnum())
}

#[cfg(not(target_os = "linux"))]
fn bus_number(info: &nusb::DeviceInfo) -> Result<u8, NativeError> {
    info.bus_id().parse().map_err(|_| {
        NativeError::Other(format!("bus {:?} has no number", info.bus_id()))
    })
}

fn transfer_type(
    transfer_type: nusb::descriptors::TransferType,
) -> TransferType {
    match transfer_type {
        nusb::descriptors::TransferType::Bulk => TransferType::Bulk,
        nusb::descriptors::TransferType::Interrupt => TransferType::Interrupt,
        nusb::descriptors::TransferType::Isochronous => {
            TransferType::Isochronous
        }
        nusb::descriptors::TransferType::Control => TransferType::Control,
    }
}

impl From<nusb::Error> for NativeError {
    fn from(err: nusb::Error) -> Self {
        match err.kind() {
            nusb::ErrorKind::Disconnected | nusb::ErrorKind::NotFound => {
                NativeError::NoDevice
            }
            nusb::ErrorKind::PermissionDenied => NativeError::Access,
            nusb::ErrorKind::Busy => NativeError::Busy,
            nusb::ErrorKind::Unsupported => NativeError::Unavailable,
            _ => NativeError::Other(err.to_string()),
        }
    }
}

impl From<TransferError> for NativeError {
    fn from(err: TransferError) -> Self {
        match err {
            // only timed out transfers are cancelled
            TransferError::Cancelled => NativeError::Timeout,
            TransferError::Disconnected => NativeError::NoDevice,
            _ => {
                warn!("bulk transfer failed: {err}");
                NativeError::Io(err.to_string())
            }
        }
    }
}
