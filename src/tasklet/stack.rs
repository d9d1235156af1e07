use common::{AddressType, InterfaceId, Ipv6BootstrapMode};

/// The IPv6 network stack driving the Ethernet interface.
///
/// Status returns follow the stack convention: 0 on success, negative on
/// failure. Bring up and bring down only start the operation, the outcome is
/// reported to the owning tasklet as a network interface event.
pub trait NetworkStack: Send + Sync + 'static {
    /// Opaque handle to a link-layer driver instance
    type Mac: Send + 'static;

    fn interface_up(&self, interface_id: InterfaceId) -> i8;

    fn interface_down(&self, interface_id: InterfaceId) -> i8;

    /// Current address of the given class, `None` while unassigned
    fn address_get(&self, interface_id: InterfaceId, address_type: AddressType)
        -> Option<[u8; 16]>;

    fn ethernet_mac_create(&self, device_id: i8) -> Option<Self::Mac>;

    /// Create an interface over `mac`. Returns the interface id or a negative
    /// error code.
    fn interface_ethernet_init(&self, mac: &Self::Mac, name: &str) -> InterfaceId;

    fn configure_ipv6_bootstrap(&self, interface_id: InterfaceId, mode: Ipv6BootstrapMode) -> i8;
}
