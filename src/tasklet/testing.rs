//! Recording dispatcher and stack doubles for tasklet tests

use std::{
    net::Ipv6Addr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard,
    },
    time::Duration,
};

use common::{AddressType, Event, EventId, EventType, HandlerId, InterfaceId, Ipv6BootstrapMode};

use super::{EventDispatcher, EventHandler, NetworkStack};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Clone, Debug, PartialEq)]
pub enum DispatcherCall {
    HandlerCreate {
        name: String,
        init_event_type: EventType,
    },
    TimerRequest {
        event_id: EventId,
        event_type: EventType,
        receiver: HandlerId,
        delay: Duration,
    },
    TimerCancel {
        event_id: EventId,
        receiver: HandlerId,
    },
    SendConnect {
        receiver: HandlerId,
    },
}

struct MockHandler {
    id: HandlerId,
    /// Taken out while it runs
    handler: Option<EventHandler>,
}

/// Dispatcher that records every request. Events only reach a handler
/// through [`MockDispatcher::deliver`].
pub struct MockDispatcher {
    calls: Mutex<Vec<DispatcherCall>>,
    next_handler_id: Mutex<HandlerId>,
    handlers: Mutex<Vec<MockHandler>>,
    /// Run the init event before `handler_create` returns, the way a loop
    /// running on another thread can
    init_on_create: AtomicBool,
    capacity: usize,
}

impl MockDispatcher {
    pub fn new(capacity: usize) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_handler_id: Mutex::new(0),
            handlers: Mutex::new(Vec::new()),
            init_on_create: AtomicBool::new(false),
            capacity,
        }
    }

    pub fn deliver_init_on_create(&self, enabled: bool) {
        self.init_on_create.store(enabled, Ordering::SeqCst);
    }

    /// Run the handler registered as `event.receiver`. Returns false if there
    /// is none.
    pub fn deliver(&self, event: &Event) -> bool {
        let handler = lock(&self.handlers)
            .iter_mut()
            .find(|slot| slot.id == event.receiver)
            .and_then(|slot| slot.handler.take());
        let Some(mut handler) = handler else {
            return false;
        };

        handler(event);

        if let Some(slot) = lock(&self.handlers)
            .iter_mut()
            .find(|slot| slot.id == event.receiver)
        {
            slot.handler = Some(handler);
        }
        true
    }

    pub fn set_next_handler_id(&self, id: HandlerId) {
        *lock(&self.next_handler_id) = id;
    }

    /// Make the next registrations return `code`
    pub fn fail_handler_create(&self, code: HandlerId) {
        self.set_next_handler_id(code);
    }

    pub fn calls(&self) -> Vec<DispatcherCall> {
        lock(&self.calls).clone()
    }

    pub fn clear(&self) {
        lock(&self.calls).clear();
    }

    pub fn timer_requests(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, DispatcherCall::TimerRequest { .. }))
            .count()
    }
}

impl EventDispatcher for MockDispatcher {
    fn handler_create(
        &self,
        name: &str,
        handler: EventHandler,
        init_event_type: EventType,
    ) -> HandlerId {
        lock(&self.calls).push(DispatcherCall::HandlerCreate {
            name: name.to_string(),
            init_event_type,
        });

        let id = {
            let mut handlers = lock(&self.handlers);
            if handlers.len() >= self.capacity {
                return -2;
            }

            let mut next = lock(&self.next_handler_id);
            let id = *next;
            if id < 0 {
                return id;
            }
            handlers.push(MockHandler {
                id,
                handler: Some(handler),
            });
            *next += 1;
            id
        };

        if self.init_on_create.load(Ordering::SeqCst) {
            self.deliver(&Event::new(id, init_event_type, 0));
        }
        id
    }

    fn timer_request(
        &self,
        event_id: EventId,
        event_type: EventType,
        receiver: HandlerId,
        delay: Duration,
    ) -> i8 {
        lock(&self.calls).push(DispatcherCall::TimerRequest {
            event_id,
            event_type,
            receiver,
            delay,
        });
        0
    }

    fn timer_cancel(&self, event_id: EventId, receiver: HandlerId) -> i8 {
        lock(&self.calls).push(DispatcherCall::TimerCancel { event_id, receiver });
        0
    }

    fn send_connect_event(&self, receiver: HandlerId) {
        lock(&self.calls).push(DispatcherCall::SendConnect { receiver });
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum StackCall {
    Up(InterfaceId),
    Down(InterfaceId),
    AddressGet(InterfaceId),
    MacCreate(i8),
    EthernetInit(String),
    ConfigureBootstrap(InterfaceId, Ipv6BootstrapMode),
}

/// Stack that records every call and answers from canned values
pub struct MockStack {
    calls: Mutex<Vec<StackCall>>,
    address: Mutex<Option<Ipv6Addr>>,
    next_interface_id: Mutex<InterfaceId>,
    down_status: Mutex<i8>,
    mac_available: Mutex<bool>,
}

impl MockStack {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            address: Mutex::new(None),
            next_interface_id: Mutex::new(0),
            down_status: Mutex::new(0),
            mac_available: Mutex::new(true),
        }
    }

    pub fn calls(&self) -> Vec<StackCall> {
        lock(&self.calls).clone()
    }

    pub fn set_address(&self, address: Ipv6Addr) {
        *lock(&self.address) = Some(address);
    }

    pub fn set_next_interface_id(&self, id: InterfaceId) {
        *lock(&self.next_interface_id) = id;
    }

    pub fn set_down_status(&self, status: i8) {
        *lock(&self.down_status) = status;
    }

    pub fn fail_mac_create(&self) {
        *lock(&self.mac_available) = false;
    }
}

impl NetworkStack for MockStack {
    type Mac = i8;

    fn interface_up(&self, interface_id: InterfaceId) -> i8 {
        lock(&self.calls).push(StackCall::Up(interface_id));
        0
    }

    fn interface_down(&self, interface_id: InterfaceId) -> i8 {
        lock(&self.calls).push(StackCall::Down(interface_id));
        *lock(&self.down_status)
    }

    fn address_get(
        &self,
        interface_id: InterfaceId,
        _address_type: AddressType,
    ) -> Option<[u8; 16]> {
        lock(&self.calls).push(StackCall::AddressGet(interface_id));
        lock(&self.address).map(|address| address.octets())
    }

    fn ethernet_mac_create(&self, device_id: i8) -> Option<Self::Mac> {
        lock(&self.calls).push(StackCall::MacCreate(device_id));
        lock(&self.mac_available).then_some(device_id)
    }

    fn interface_ethernet_init(&self, _mac: &Self::Mac, name: &str) -> InterfaceId {
        lock(&self.calls).push(StackCall::EthernetInit(name.to_string()));
        *lock(&self.next_interface_id)
    }

    fn configure_ipv6_bootstrap(&self, interface_id: InterfaceId, mode: Ipv6BootstrapMode) -> i8 {
        lock(&self.calls).push(StackCall::ConfigureBootstrap(interface_id, mode));
        0
    }
}
