const ENDPOINT_DIR_MASK: u8 = 0x80;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

/// Endpoint of an interface setting
///
/// The direction follows bit 7 of the endpoint address (`bEndpointAddress`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndpointDescriptor {
    address: u8,
    transfer_type: TransferType,
    max_packet_size: usize,
}

impl EndpointDescriptor {
    pub fn new(
        address: u8,
        transfer_type: TransferType,
        max_packet_size: usize,
    ) -> Self {
        Self {
            address,
            transfer_type,
            max_packet_size,
        }
    }

    /// Endpoint address including the direction bit (`bEndpointAddress`)
    #[doc(alias = "bEndpointAddress")]
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn direction(&self) -> Direction {
        if self.address & ENDPOINT_DIR_MASK != 0 {
            Direction::In
        } else {
            Direction::Out
        }
    }

    pub fn transfer_type(&self) -> TransferType {
        self.transfer_type
    }

    /// Maximum packet size (`wMaxPacketSize`)
    #[doc(alias = "wMaxPacketSize")]
    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    fn is_bulk(&self) -> bool {
        self.transfer_type == TransferType::Bulk
    }
}

/// Alternate setting of an interface together with its endpoints
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceSetting {
    interface_number: u8,
    alternate_setting: u8,
    endpoints: Vec<EndpointDescriptor>,
}

impl InterfaceSetting {
    pub fn new(
        interface_number: u8,
        alternate_setting: u8,
        endpoints: Vec<EndpointDescriptor>,
    ) -> Self {
        Self {
            interface_number,
            alternate_setting,
            endpoints,
        }
    }

    pub fn interface_number(&self) -> u8 {
        self.interface_number
    }

    pub fn alternate_setting(&self) -> u8 {
        self.alternate_setting
    }

    pub fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    /// First bulk IN and first bulk OUT endpoint, in descriptor order
    ///
    /// Endpoints of any other transfer type are ignored, as are further bulk
    /// endpoints of an already bound direction.
    pub fn bulk_endpoints(
        &self,
    ) -> (Option<EndpointDescriptor>, Option<EndpointDescriptor>) {
        self.endpoints.iter().filter(|ep| ep.is_bulk()).fold(
            (None, None),
            |(ep_in, ep_out), ep| match ep.direction() {
                Direction::In => (ep_in.or(Some(*ep)), ep_out),
                Direction::Out => (ep_in, ep_out.or(Some(*ep))),
            },
        )
    }
}
