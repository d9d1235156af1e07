use serde::{Deserialize, Serialize};

// Identifier constants
pub const INVALID_INTERFACE_ID: i8 = -1;
pub const TIMER_EVENT_START_BOOTSTRAP: u8 = 1;
pub const APPL_EVENT_CONNECT: u8 = 0;

// Type aliases for dispatcher identifiers
pub type HandlerId = i8;
pub type InterfaceId = i8;
pub type EventId = u8;

/// Event types understood by the dispatcher. The numeric values follow the
/// stack's library event numbering, with the application range starting at
/// 0x80.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// Delivered once to a handler right after it has been registered
    TaskletInit,
    /// New information about network connectivity, `data` carries an
    /// [`InterfaceStatus`] code
    NwkInterface,
    /// A one-shot timer requested through the dispatcher expired
    SystemTimer,
    /// Application defined event, `event_id` tells them apart
    Application,
    Other(u8),
}

impl EventType {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => EventType::TaskletInit,
            1 => EventType::NwkInterface,
            2 => EventType::SystemTimer,
            0x80 => EventType::Application,
            other => EventType::Other(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            EventType::TaskletInit => 0,
            EventType::NwkInterface => 1,
            EventType::SystemTimer => 2,
            EventType::Application => 0x80,
            EventType::Other(code) => *code,
        }
    }
}

/// A single event delivered by the dispatcher to a registered handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub receiver: HandlerId,
    pub sender: HandlerId,
    pub event_type: EventType,
    pub event_id: EventId,
    /// Opaque payload, interpretation depends on `event_type`
    pub data: u32,
}

impl Event {
    pub fn new(receiver: HandlerId, event_type: EventType, event_id: EventId) -> Self {
        Self {
            receiver,
            sender: 0,
            event_type,
            event_id,
            data: 0,
        }
    }

    /// Network interface event carrying `status` for `receiver`
    pub fn interface(receiver: HandlerId, status: InterfaceStatus) -> Self {
        Self {
            data: status.code() as u32,
            ..Self::new(receiver, EventType::NwkInterface, 0)
        }
    }

    /// Interpret the payload as an interface status code
    pub fn interface_status(&self) -> InterfaceStatus {
        InterfaceStatus::from_code(self.data as u8)
    }

    #[cfg(feature = "std")]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{:?}", self))
    }
}

/// Status codes reported by the network stack for an interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceStatus {
    /// Interface is up and has an address
    BootstrapReady,
    RplInstanceFloodingReady,
    SetDownComplete,
    /// Link layer active scan failed, stack is idle
    NwkScanFail,
    /// No router answered on the link, stack is idle
    IpAddressAllocationFail,
    DuplicateAddressDetected,
    AuthenticationStartFail,
    AuthenticationFail,
    /// Connection to the access point was lost
    ConnectionDown,
    ParentPollFail,
    PhyConnectionDown,
    Unknown(u8),
}

impl InterfaceStatus {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => InterfaceStatus::BootstrapReady,
            1 => InterfaceStatus::RplInstanceFloodingReady,
            2 => InterfaceStatus::SetDownComplete,
            3 => InterfaceStatus::NwkScanFail,
            4 => InterfaceStatus::IpAddressAllocationFail,
            5 => InterfaceStatus::DuplicateAddressDetected,
            6 => InterfaceStatus::AuthenticationStartFail,
            7 => InterfaceStatus::AuthenticationFail,
            8 => InterfaceStatus::ConnectionDown,
            9 => InterfaceStatus::ParentPollFail,
            10 => InterfaceStatus::PhyConnectionDown,
            other => InterfaceStatus::Unknown(other),
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            InterfaceStatus::BootstrapReady => 0,
            InterfaceStatus::RplInstanceFloodingReady => 1,
            InterfaceStatus::SetDownComplete => 2,
            InterfaceStatus::NwkScanFail => 3,
            InterfaceStatus::IpAddressAllocationFail => 4,
            InterfaceStatus::DuplicateAddressDetected => 5,
            InterfaceStatus::AuthenticationStartFail => 6,
            InterfaceStatus::AuthenticationFail => 7,
            InterfaceStatus::ConnectionDown => 8,
            InterfaceStatus::ParentPollFail => 9,
            InterfaceStatus::PhyConnectionDown => 10,
            InterfaceStatus::Unknown(code) => *code,
        }
    }
}

/// Connectivity reported to the application callback
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
}

/// How an interface acquires its IPv6 address
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Ipv6BootstrapMode {
    /// Stateless address autoconfiguration from router advertisements
    #[default]
    Autonomous,
    Static,
}

/// Address classes that can be queried from an interface
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressType {
    LinkLocal,
    /// Global (non link-local) IPv6 address
    Ipv6Global,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_status_codes() {
        for code in 0..=12u8 {
            assert_eq!(InterfaceStatus::from_code(code).code(), code);
        }
        assert_eq!(InterfaceStatus::from_code(4), InterfaceStatus::IpAddressAllocationFail);
        assert_eq!(InterfaceStatus::from_code(42), InterfaceStatus::Unknown(42));
    }

    #[test]
    fn test_interface_event_payload() {
        let event = Event::interface(3, InterfaceStatus::ConnectionDown);
        assert_eq!(event.event_type, EventType::NwkInterface);
        assert_eq!(event.receiver, 3);
        assert_eq!(event.data, 8);
        assert_eq!(event.interface_status(), InterfaceStatus::ConnectionDown);
    }

    #[test]
    fn test_event_json() {
        let event = Event::new(2, EventType::SystemTimer, TIMER_EVENT_START_BOOTSTRAP);
        let json = event.to_json();
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
