//! Simulated Ethernet IPv6 stack
//!
//! Stands in for the real stack on a development host. Bring-up requests are
//! answered with interface events posted back through the event loop: either
//! `BootstrapReady` with a SLAAC address built from the configured prefix and
//! the EUI-64 of the interface MAC, or `IpAddressAllocationFail` while the
//! configured number of failing attempts is not used up yet.

use std::{
    net::Ipv6Addr,
    sync::{Mutex, MutexGuard},
};

use common::{AddressType, Event, InterfaceId, InterfaceStatus, Ipv6BootstrapMode};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{config::SimConfig, event_loop::EventLoop, tasklet::NetworkStack};

const FALLBACK_PREFIX: Ipv6Addr = Ipv6Addr::new(0x2001, 0x0db8, 0, 0, 0, 0, 0, 0);

/// Link-layer driver handle of the simulated stack
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimMac {
    pub device_id: i8,
    pub address: [u8; 6],
}

impl SimMac {
    /// Modified EUI-64 interface identifier
    pub fn interface_identifier(&self) -> [u8; 8] {
        let mac = self.address;
        [mac[0] ^ 0x02, mac[1], mac[2], 0xff, 0xfe, mac[3], mac[4], mac[5]]
    }
}

struct SimInterface {
    name: String,
    mac: SimMac,
    mode: Option<Ipv6BootstrapMode>,
    /// Handler that receives the interface events
    owner: i8,
    address: Option<Ipv6Addr>,
}

struct SimState {
    interfaces: Vec<SimInterface>,
    attempts: u32,
    rng: StdRng,
}

pub struct SimulatedStack {
    event_loop: EventLoop,
    prefix: Ipv6Addr,
    failed_attempts: u32,
    failure_rate: f64,
    state: Mutex<SimState>,
}

impl SimulatedStack {
    pub fn new(event_loop: EventLoop, config: &SimConfig) -> Self {
        Self::with_rng(event_loop, config, StdRng::from_entropy())
    }

    /// Deterministic variant for tests
    pub fn with_seed(event_loop: EventLoop, config: &SimConfig, seed: u64) -> Self {
        Self::with_rng(event_loop, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(event_loop: EventLoop, config: &SimConfig, rng: StdRng) -> Self {
        let prefix = config.prefix.parse().unwrap_or_else(|e| {
            warn!("sim: bad prefix {:?} ({}), using {}", config.prefix, e, FALLBACK_PREFIX);
            FALLBACK_PREFIX
        });

        Self {
            event_loop,
            prefix,
            failed_attempts: config.failed_attempts,
            failure_rate: config.failure_rate.clamp(0.0, 1.0),
            state: Mutex::new(SimState {
                interfaces: Vec::new(),
                attempts: 0,
                rng,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Pretend the link went away: drop the address and report the loss
    pub fn drop_link(&self, interface_id: InterfaceId) -> i8 {
        let mut state = self.lock();
        let Some(interface) = interface_mut(&mut state.interfaces, interface_id) else {
            return -1;
        };
        if interface.address.take().is_none() {
            return -1;
        }

        info!("sim: {} lost its link", interface.name);
        self.event_loop
            .post(Event::interface(interface.owner, InterfaceStatus::ConnectionDown));
        0
    }

    pub fn attempts(&self) -> u32 {
        self.lock().attempts
    }

    fn global_address(&self, mac: &SimMac) -> Ipv6Addr {
        let mut octets = self.prefix.octets();
        octets[8..].copy_from_slice(&mac.interface_identifier());
        Ipv6Addr::from(octets)
    }
}

fn interface_mut(
    interfaces: &mut [SimInterface],
    interface_id: InterfaceId,
) -> Option<&mut SimInterface> {
    usize::try_from(interface_id)
        .ok()
        .and_then(|index| interfaces.get_mut(index))
}

impl NetworkStack for SimulatedStack {
    type Mac = SimMac;

    fn interface_up(&self, interface_id: InterfaceId) -> i8 {
        let owner = self.event_loop.active_tasklet();

        let mut state = self.lock();
        state.attempts += 1;
        let attempt = state.attempts;
        let roll = state.rng.gen_bool(self.failure_rate);

        let Some(interface) = interface_mut(&mut state.interfaces, interface_id) else {
            return -1;
        };
        if interface.mode.is_none() {
            warn!("sim: {} has no bootstrap mode configured", interface.name);
            return -1;
        }
        if interface.address.is_some() {
            // Already up
            return -4;
        }
        if let Some(owner) = owner {
            interface.owner = owner;
        }

        let status = if attempt <= self.failed_attempts || roll {
            debug!("sim: {} bootstrap attempt {} fails", interface.name, attempt);
            InterfaceStatus::IpAddressAllocationFail
        } else {
            let mac = interface.mac;
            let address = self.global_address(&mac);
            info!("sim: {} got {}", interface.name, address);
            interface.address = Some(address);
            InterfaceStatus::BootstrapReady
        };

        self.event_loop.post(Event::interface(interface.owner, status));
        0
    }

    fn interface_down(&self, interface_id: InterfaceId) -> i8 {
        let mut state = self.lock();
        let Some(interface) = interface_mut(&mut state.interfaces, interface_id) else {
            return -1;
        };
        debug!("sim: {} down", interface.name);
        interface.address = None;
        0
    }

    fn address_get(
        &self,
        interface_id: InterfaceId,
        address_type: AddressType,
    ) -> Option<[u8; 16]> {
        let mut state = self.lock();
        let interface = interface_mut(&mut state.interfaces, interface_id)?;
        match address_type {
            AddressType::Ipv6Global => interface.address.map(|address| address.octets()),
            AddressType::LinkLocal => {
                let mut octets = [0u8; 16];
                octets[..2].copy_from_slice(&[0xfe, 0x80]);
                octets[8..].copy_from_slice(&interface.mac.interface_identifier());
                Some(octets)
            }
        }
    }

    fn ethernet_mac_create(&self, device_id: i8) -> Option<Self::Mac> {
        if device_id < 0 {
            return None;
        }

        let mut address: [u8; 6] = self.lock().rng.gen();
        // Locally administered, unicast
        address[0] = (address[0] | 0x02) & !0x01;
        Some(SimMac { device_id, address })
    }

    fn interface_ethernet_init(&self, mac: &Self::Mac, name: &str) -> InterfaceId {
        let mut state = self.lock();
        if state.interfaces.iter().any(|interface| interface.name == name) {
            return -1;
        }
        if state.interfaces.len() > InterfaceId::MAX as usize {
            return -2;
        }

        state.interfaces.push(SimInterface {
            name: name.to_string(),
            mac: *mac,
            mode: None,
            owner: 0,
            address: None,
        });
        (state.interfaces.len() - 1) as InterfaceId
    }

    fn configure_ipv6_bootstrap(&self, interface_id: InterfaceId, mode: Ipv6BootstrapMode) -> i8 {
        let mut state = self.lock();
        match interface_mut(&mut state.interfaces, interface_id) {
            Some(interface) => {
                interface.mode = Some(mode);
                0
            }
            None => -1,
        }
    }
}
