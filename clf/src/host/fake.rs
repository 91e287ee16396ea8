//! In-memory USB host for unit tests

use std::{cell::RefCell, collections::VecDeque, rc::Rc, time::Duration};

use super::{NativeError, UsbDevice, UsbHandle, UsbHost};
use crate::{
    DeviceIdentity, EndpointDescriptor, InterfaceSetting, TransferType,
};

type Strings = (Option<String>, Option<String>);

/// Shared bus state; clones observe the same devices and transfers
#[derive(Clone)]
pub(crate) struct FakeBus {
    state: Rc<RefCell<BusState>>,
}

struct BusState {
    available: bool,
    enumeration_error: Option<NativeError>,
    devices: Vec<FakeDevice>,
    reads: VecDeque<Result<Vec<u8>, NativeError>>,
    read_requests: Vec<(u8, usize, Duration)>,
    write_error: Option<NativeError>,
    empty_write_error: Option<NativeError>,
    writes: Vec<(u8, Vec<u8>)>,
    open_handles: usize,
    claimed: Vec<u8>,
}

#[derive(Clone)]
pub(crate) struct FakeDevice {
    identity: Result<DeviceIdentity, NativeError>,
    settings: Result<Vec<InterfaceSetting>, NativeError>,
    strings: Result<Strings, NativeError>,
    open_error: Option<NativeError>,
    claim_error: Option<NativeError>,
}

pub(crate) struct FakeDeviceEntry {
    device: FakeDevice,
    bus: FakeBus,
}

pub(crate) struct FakeHandle {
    bus: FakeBus,
    claim_error: Option<NativeError>,
}

impl FakeBus {
    pub fn new() -> Self {
        FakeBus {
            state: Rc::new(RefCell::new(BusState {
                available: true,
                enumeration_error: None,
                devices: Vec::new(),
                reads: VecDeque::new(),
                read_requests: Vec::new(),
                write_error: None,
                empty_write_error: None,
                writes: Vec::new(),
                open_handles: 0,
                claimed: Vec::new(),
            })),
        }
    }

    pub fn host(&self) -> FakeBus {
        self.clone()
    }

    pub fn attach(&self, device: FakeDevice) {
        self.state.borrow_mut().devices.push(device);
    }

    /// Remove every device reporting `identity`
    pub fn detach(&self, identity: DeviceIdentity) {
        self.state
            .borrow_mut()
            .devices
            .retain(|device| device.identity.as_ref() != Ok(&identity));
    }

    pub fn set_available(&self, available: bool) {
        self.state.borrow_mut().available = available;
    }

    pub fn fail_enumeration(&self, err: NativeError) {
        self.state.borrow_mut().enumeration_error = Some(err);
    }

    /// Queue the result of the next bulk read
    pub fn push_read(&self, result: Result<Vec<u8>, NativeError>) {
        self.state.borrow_mut().reads.push_back(result);
    }

    pub fn fail_writes(&self, err: NativeError) {
        self.state.borrow_mut().write_error = Some(err);
    }

    /// Fail only zero-length bulk writes
    pub fn fail_empty_writes(&self, err: NativeError) {
        self.state.borrow_mut().empty_write_error = Some(err);
    }

    /// Endpoint address and payload of every successful bulk write
    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.state.borrow().writes.clone()
    }

    /// Endpoint address, length and timeout of every bulk read
    pub fn read_requests(&self) -> Vec<(u8, usize, Duration)> {
        self.state.borrow().read_requests.clone()
    }

    pub fn open_handles(&self) -> usize {
        self.state.borrow().open_handles
    }

    pub fn claimed(&self) -> Vec<u8> {
        self.state.borrow().claimed.clone()
    }
}

impl UsbHost for FakeBus {
    type Device = FakeDeviceEntry;

    fn is_available(&self) -> bool {
        self.state.borrow().available
    }

    fn devices(&self) -> Result<Vec<FakeDeviceEntry>, NativeError> {
        let state = self.state.borrow();
        if !state.available {
            return Err(NativeError::Unavailable);
        }
        if let Some(err) = &state.enumeration_error {
            return Err(err.clone());
        }
        Ok(state
            .devices
            .iter()
            .map(|device| FakeDeviceEntry {
                device: device.clone(),
                bus: self.clone(),
            })
            .collect())
    }
}

impl FakeDevice {
    /// Reader with interrupt IN 0x83, bulk OUT 0x02 and bulk IN 0x81
    /// (64 byte packets) on interface 0
    pub fn reader(identity: DeviceIdentity) -> Self {
        FakeDevice {
            identity: Ok(identity),
            settings: Ok(vec![InterfaceSetting::new(
                0,
                0,
                vec![
                    EndpointDescriptor::new(0x83, TransferType::Interrupt, 8),
                    EndpointDescriptor::new(0x02, TransferType::Bulk, 64),
                    EndpointDescriptor::new(0x81, TransferType::Bulk, 64),
                ],
            )]),
            strings: Ok((
                Some("SCM Micro".into()),
                Some("SCL3711-NFC&RW".into()),
            )),
            open_error: None,
            claim_error: None,
        }
    }

    /// Device whose descriptors cannot be read
    pub fn broken() -> Self {
        FakeDevice {
            identity: Err(NativeError::Io("descriptor read failed".into())),
            settings: Err(NativeError::Io("descriptor read failed".into())),
            strings: Err(NativeError::Io("descriptor read failed".into())),
            open_error: Some(NativeError::Io("descriptor read failed".into())),
            claim_error: None,
        }
    }

    pub fn with_settings(mut self, settings: Vec<InterfaceSetting>) -> Self {
        self.settings = Ok(settings);
        self
    }

    pub fn with_settings_error(mut self, err: NativeError) -> Self {
        self.settings = Err(err);
        self
    }

    pub fn with_strings(
        mut self,
        strings: Result<Strings, NativeError>,
    ) -> Self {
        self.strings = strings;
        self
    }

    pub fn with_open_error(mut self, err: NativeError) -> Self {
        self.open_error = Some(err);
        self
    }

    pub fn with_claim_error(mut self, err: NativeError) -> Self {
        self.claim_error = Some(err);
        self
    }
}

impl UsbDevice for FakeDeviceEntry {
    type Handle = FakeHandle;

    fn identity(&self) -> Result<DeviceIdentity, NativeError> {
        self.device.identity.clone()
    }

    fn interface_settings(
        &self,
    ) -> Result<Vec<InterfaceSetting>, NativeError> {
        self.device.settings.clone()
    }

    fn strings(&self) -> Result<Strings, NativeError> {
        self.device.strings.clone()
    }

    fn open(&self) -> Result<FakeHandle, NativeError> {
        if let Some(err) = &self.device.open_error {
            return Err(err.clone());
        }
        self.bus.state.borrow_mut().open_handles += 1;
        Ok(FakeHandle {
            bus: self.bus.clone(),
            claim_error: self.device.claim_error.clone(),
        })
    }
}

impl UsbHandle for FakeHandle {
    fn claim_interface(&mut self, number: u8) -> Result<(), NativeError> {
        if let Some(err) = &self.claim_error {
            return Err(err.clone());
        }
        self.bus.state.borrow_mut().claimed.push(number);
        Ok(())
    }

    fn bulk_read(
        &mut self,
        endpoint: &EndpointDescriptor,
        max_len: usize,
        timeout: Duration,
    ) -> Result<Vec<u8>, NativeError> {
        let mut state = self.bus.state.borrow_mut();
        state
            .read_requests
            .push((endpoint.address(), max_len, timeout));
        let mut data =
            state.reads.pop_front().unwrap_or(Err(NativeError::Timeout))?;
        data.truncate(max_len);
        Ok(data)
    }

    fn bulk_write(
        &mut self,
        endpoint: &EndpointDescriptor,
        data: &[u8],
        _timeout: Duration,
    ) -> Result<usize, NativeError> {
        let mut state = self.bus.state.borrow_mut();
        if let Some(err) = &state.write_error {
            return Err(err.clone());
        }
        if data.is_empty() {
            if let Some(err) = &state.empty_write_error {
                return Err(err.clone());
            }
        }
        state.writes.push((endpoint.address(), data.to_vec()));
        Ok(data.len())
    }
}

impl Drop for FakeHandle {
    fn drop(&mut self) {
        let mut state = self.bus.state.borrow_mut();
        state.open_handles -= 1;
        state.claimed.clear();
    }
}
