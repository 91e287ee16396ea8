use std::time::Duration;

use log::{debug, error, trace, warn};

use crate::{
    EndpointDescriptor, MAX_FRAME_LEN, READER_INTERFACE, UsbError,
    device::enumerate,
    host::{HandleOf, NativeError, UsbDevice, UsbHandle, UsbHost},
};

/// Bulk transport to one reader
///
/// Created closed with [UsbTransport::new] or opened right away with
/// [UsbTransport::connect]. The device is released on [UsbTransport::close]
/// and when the transport is dropped.
pub struct UsbTransport<H: UsbHost> {
    host: H,
    session: Option<Session<HandleOf<H>>>,
}

/// Opened device with interface claimed and both endpoints bound
struct Session<D> {
    handle: D,
    endpoint_in: EndpointDescriptor,
    endpoint_out: EndpointDescriptor,
    manufacturer_name: Option<String>,
    product_name: Option<String>,
}

impl<H: UsbHost> UsbTransport<H> {
    pub fn new(host: H) -> Self {
        UsbTransport {
            host,
            session: None,
        }
    }

    /// Open the device at `bus` / `address`
    pub fn connect(host: H, bus: u8, address: u8) -> Result<Self, UsbError> {
        let mut transport = Self::new(host);
        transport.open(bus, address)?;
        Ok(transport)
    }

    /// Open the device at `bus` / `address` and claim its reader interface
    ///
    /// A device found earlier may have been unplugged or renumbered since:
    /// the device list is read again and `DeviceNotFound` is returned if
    /// nothing sits at `bus` / `address` anymore. Any session already open
    /// is closed first.
    pub fn open(&mut self, bus: u8, address: u8) -> Result<(), UsbError> {
        self.close();

        if !self.host.is_available() {
            return Err(UsbError::DeviceNotFound);
        }
        let devices = self.host.devices().map_err(|err| {
            warn!("USB enumeration failed: {err}");
            UsbError::DeviceNotFound
        })?;
        let Some((device, identity)) =
            enumerate(&devices).find(|(_, identity)| {
                identity.bus == bus && identity.address == address
            })
        else {
            error!("no device {address} on bus {bus}");
            return Err(UsbError::DeviceNotFound);
        };

        let settings = device.interface_settings().map_err(open_error)?;
        let Some(setting) = settings.first() else {
            error!("no usb configuration settings, please replug device");
            return Err(UsbError::DeviceNotFound);
        };
        let (Some(endpoint_in), Some(endpoint_out)) = setting.bulk_endpoints()
        else {
            error!("no bulk endpoints for read and write");
            return Err(UsbError::DeviceNotFound);
        };

        // some readers answer string requests with garbage
        let (manufacturer_name, product_name) = match device.strings() {
            Ok(strings) => strings,
            Err(err) => {
                debug!("cannot read device strings: {err}");
                (None, None)
            }
        };

        let mut handle = device.open().map_err(open_error)?;
        handle
            .claim_interface(READER_INTERFACE)
            .map_err(open_error)?;

        debug!(
            "opened {identity} ({}, {}) IN=0x{:02x} OUT=0x{:02x}",
            manufacturer_name.as_deref().unwrap_or("?"),
            product_name.as_deref().unwrap_or("?"),
            endpoint_in.address(),
            endpoint_out.address(),
        );

        self.session = Some(Session {
            handle,
            endpoint_in,
            endpoint_out,
            manufacturer_name,
            product_name,
        });
        Ok(())
    }

    /// Release the device, if open
    pub fn close(&mut self) {
        if self.session.take().is_some() {
            debug!("closed USB transport");
        }
    }

    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    /// Read one frame of at most [MAX_FRAME_LEN] bytes
    ///
    /// Returns `Ok(None)` when the transport is not open. A zero `timeout`
    /// waits indefinitely.
    pub fn read(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Vec<u8>>, UsbError> {
        if !self.host.is_available() {
            return Err(UsbError::DriverUnavailable);
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };

        let frame = session
            .handle
            .bulk_read(&session.endpoint_in, MAX_FRAME_LEN, timeout)
            .map_err(transfer_error)?;
        if frame.is_empty() {
            error!("bulk read returned zero data");
            return Err(UsbError::IoFailure);
        }

        trace!("<<< {}", hex::encode(&frame));
        Ok(Some(frame))
    }

    /// Write one frame
    ///
    /// A frame filling its last packet exactly is followed by a zero-length
    /// packet so the device sees where it ends. Does nothing when the
    /// transport is not open. A zero `timeout` waits indefinitely.
    pub fn write(
        &mut self,
        frame: &[u8],
        timeout: Duration,
    ) -> Result<(), UsbError> {
        if !self.host.is_available() {
            return Err(UsbError::DriverUnavailable);
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        trace!(">>> {}", hex::encode(frame));
        let endpoint = session.endpoint_out;
        let written = session
            .handle
            .bulk_write(&endpoint, frame, timeout)
            .map_err(transfer_error)?;
        if written != frame.len() {
            warn!("short bulk write: {written} of {} bytes", frame.len());
        }

        if frame.len().checked_rem(endpoint.max_packet_size()) == Some(0) {
            session
                .handle
                .bulk_write(&endpoint, &[], timeout)
                .map_err(transfer_error)?;
        }
        Ok(())
    }

    /// Manufacturer string of the open device, if it reported one
    pub fn manufacturer_name(&self) -> Option<&str> {
        self.session.as_ref()?.manufacturer_name.as_deref()
    }

    /// Product string of the open device, if it reported one
    pub fn product_name(&self) -> Option<&str> {
        self.session.as_ref()?.product_name.as_deref()
    }

    pub fn endpoint_in(&self) -> Option<&EndpointDescriptor> {
        self.session.as_ref().map(|session| &session.endpoint_in)
    }

    pub fn endpoint_out(&self) -> Option<&EndpointDescriptor> {
        self.session.as_ref().map(|session| &session.endpoint_out)
    }
}

impl<H: UsbHost> Drop for UsbTransport<H> {
    fn drop(&mut self) {
        self.close();
    }
}

fn open_error(err: NativeError) -> UsbError {
    error!("cannot open device: {err}");
    match err {
        NativeError::Access => UsbError::AccessDenied,
        NativeError::Busy => UsbError::DeviceBusy,
        NativeError::NoDevice | NativeError::Unavailable => {
            UsbError::DeviceNotFound
        }
        _ => UsbError::IoFailure,
    }
}

fn transfer_error(err: NativeError) -> UsbError {
    match err {
        NativeError::Timeout => UsbError::Timeout,
        NativeError::NoDevice => {
            error!("device removed during transfer");
            UsbError::DeviceNotFound
        }
        NativeError::Unavailable => UsbError::DriverUnavailable,
        err => {
            error!("bulk transfer failed: {err}");
            UsbError::IoFailure
        }
    }
}
