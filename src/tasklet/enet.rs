use std::{
    net::Ipv6Addr,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use common::{
    AddressType, ConnectionStatus, Event, EventType, HandlerId, InterfaceId, InterfaceStatus,
    Ipv6BootstrapMode, APPL_EVENT_CONNECT, INVALID_INTERFACE_ID, TIMER_EVENT_START_BOOTSTRAP,
};

use super::{
    EventDispatcher, NetworkStack, StatusCallback, TaskletData, TaskletState,
    MIN_ADDRESS_BUFFER_LEN, TASKLET_NAME,
};
use crate::{config::Config, error::TaskletError};

/// MAC driver handle, created once and reused by every `network_init`
struct EthMac<M> {
    device_id: i8,
    handle: M,
}

struct Inner<D: EventDispatcher, S: NetworkStack> {
    dispatcher: Arc<D>,
    stack: Arc<S>,
    interface_name: String,
    retry_delay: Duration,
    data: Mutex<Option<TaskletData>>,
    eth_mac: Mutex<Option<EthMac<S::Mac>>>,
}

/// Context handle for the Ethernet bootstrap tasklet.
///
/// Cloning the handle shares the same state record. One tasklet per network
/// stack is expected; nothing stops a caller from creating more, but they will
/// compete for the same interface.
pub struct EnetTasklet<D: EventDispatcher, S: NetworkStack> {
    inner: Arc<Inner<D, S>>,
}

impl<D: EventDispatcher, S: NetworkStack> Clone for EnetTasklet<D, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: EventDispatcher, S: NetworkStack> EnetTasklet<D, S> {
    pub fn new(dispatcher: Arc<D>, stack: Arc<S>, config: &Config) -> Self {
        Self {
            inner: Arc::new(Inner {
                dispatcher,
                stack,
                interface_name: config.interface_name.clone(),
                retry_delay: config.bootstrap_retry(),
                data: Mutex::new(None),
                eth_mac: Mutex::new(None),
            }),
        }
    }

    /// Allocate the state record. Calling it again keeps the existing record.
    pub fn initialize(&self) {
        let mut data = self.inner.lock();
        if data.is_none() {
            *data = Some(TaskletData::new());
        }
    }

    /// Configure the tasklet for `callback` and `interface_id`.
    ///
    /// The first call registers the event handler with the dispatcher, whose
    /// init event then starts the bring-up. Later calls reuse the registered
    /// handler and ask for a new bring-up directly. A registration failure is
    /// returned as is and leaves the tasklet ready for another first connect.
    pub fn connect<F>(&self, callback: F, interface_id: InterfaceId) -> Result<(), TaskletError>
    where
        F: Fn(ConnectionStatus) + Send + Sync + 'static,
    {
        let callback: StatusCallback = Arc::new(callback);

        let (re_connecting, tasklet_id) = {
            let mut guard = self.inner.lock();
            let data = guard.as_mut().ok_or(TaskletError::NotInitialized)?;
            let re_connecting = data.state != TaskletState::Created;

            *data = TaskletData {
                callback: Some(callback),
                state: TaskletState::Initialized,
                node_main_tasklet_id: if re_connecting {
                    data.node_main_tasklet_id
                } else {
                    0
                },
                interface_id,
                tasklet_id: if re_connecting { data.tasklet_id } else { 0 },
            };
            (re_connecting, data.tasklet_id)
        };

        if re_connecting {
            debug!("tasklet: reconnecting with handler {}", tasklet_id);
            self.inner.dispatcher.send_connect_event(tasklet_id);
            return Ok(());
        }

        let weak = Arc::downgrade(&self.inner);
        let tasklet_id = self.inner.dispatcher.handler_create(
            TASKLET_NAME,
            Box::new(move |event: &Event| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_event(event);
                }
            }),
            EventType::TaskletInit,
        );

        let mut guard = self.inner.lock();
        let data = guard.as_mut().ok_or(TaskletError::NotInitialized)?;
        data.tasklet_id = tasklet_id;
        if tasklet_id < 0 {
            // -1 handler already used by other tasklet
            // -2 memory allocation failure
            warn!("tasklet: handler registration failed ({})", tasklet_id);
            data.state = TaskletState::Created;
            return Err(TaskletError::Registration(tasklet_id));
        }

        debug!("tasklet: registered handler {}", tasklet_id);
        Ok(())
    }

    /// Bring the active interface down and drop the callback.
    ///
    /// With `notify` set the callback hears `Disconnected` once before it is
    /// dropped. Requests already in flight in the stack are not cancelled;
    /// their events are ignored once the interface id is gone.
    pub fn disconnect(&self, notify: bool) -> Result<(), TaskletError> {
        let (interface_id, callback) = {
            let mut guard = self.inner.lock();
            let data = guard.as_mut().ok_or(TaskletError::NotInitialized)?;
            let interface_id = data.interface_id;
            let callback = data.callback.take();
            data.interface_id = INVALID_INTERFACE_ID;
            (interface_id, callback)
        };

        if interface_id == INVALID_INTERFACE_ID {
            return Err(TaskletError::NoActiveInterface);
        }

        let status = self.inner.stack.interface_down(interface_id);
        if notify {
            if let Some(callback) = callback {
                callback(ConnectionStatus::Disconnected);
            }
        }

        match status {
            0 => Ok(()),
            code => Err(TaskletError::Stack(code)),
        }
    }

    /// Write the global IPv6 address of the active interface into `buffer` as
    /// NUL terminated text and return the text length.
    pub fn get_ip_address(&self, buffer: &mut [u8]) -> Result<usize, TaskletError> {
        if buffer.len() < MIN_ADDRESS_BUFFER_LEN {
            return Err(TaskletError::BufferTooSmall { len: buffer.len() });
        }

        let address = self
            .ip_address()
            .ok_or(TaskletError::AddressUnavailable)?
            .to_string();
        let len = address.len();
        buffer[..len].copy_from_slice(address.as_bytes());
        buffer[len] = 0;
        Ok(len)
    }

    pub fn ip_address(&self) -> Option<Ipv6Addr> {
        let interface_id = self.interface_id();
        self.inner
            .stack
            .address_get(interface_id, AddressType::Ipv6Global)
            .map(Ipv6Addr::from)
    }

    /// Create the Ethernet interface and configure autonomous address
    /// bootstrap. Returns the active interface if there already is one.
    pub fn network_init(&self, device_id: i8) -> Result<InterfaceId, TaskletError> {
        // Held until the interface id is stored, concurrent callers wait and
        // then see the active interface
        let mut eth_mac = self
            .inner
            .eth_mac
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        let current = self
            .inner
            .lock()
            .as_ref()
            .ok_or(TaskletError::NotInitialized)?
            .interface_id;
        if current != INVALID_INTERFACE_ID {
            debug!("tasklet: Interface already at active state");
            return Ok(current);
        }

        let stack = &self.inner.stack;
        let mac = match eth_mac.take() {
            Some(mac) => {
                if mac.device_id != device_id {
                    warn!(
                        "tasklet: MAC driver already created for device {}, ignoring device {}",
                        mac.device_id, device_id
                    );
                }
                mac
            }
            None => EthMac {
                device_id,
                handle: stack
                    .ethernet_mac_create(device_id)
                    .ok_or(TaskletError::MacUnavailable)?,
            },
        };

        let interface_id = stack.interface_ethernet_init(&mac.handle, &self.inner.interface_name);
        *eth_mac = Some(mac);
        debug!("tasklet: interface ID: {}", interface_id);
        if interface_id < 0 {
            return Err(TaskletError::Stack(interface_id));
        }

        if let Some(data) = self.inner.lock().as_mut() {
            data.interface_id = interface_id;
        }

        let status = stack.configure_ipv6_bootstrap(interface_id, Ipv6BootstrapMode::Autonomous);
        if status != 0 {
            warn!(
                "tasklet: configuring IPv6 bootstrap on {} failed ({})",
                interface_id, status
            );
        }

        Ok(interface_id)
    }

    /// `None` until `initialize` has run
    pub fn state(&self) -> Option<TaskletState> {
        self.inner.lock().as_ref().map(|data| data.state)
    }

    pub fn interface_id(&self) -> InterfaceId {
        self.inner
            .lock()
            .as_ref()
            .map(|data| data.interface_id)
            .unwrap_or(INVALID_INTERFACE_ID)
    }

    pub fn tasklet_id(&self) -> Option<HandlerId> {
        self.inner.lock().as_ref().map(|data| data.tasklet_id)
    }
}

impl<D: EventDispatcher, S: NetworkStack> Inner<D, S> {
    fn lock(&self) -> MutexGuard<'_, Option<TaskletData>> {
        self.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    // Interrupts from the hardware may land while this runs; the stack and
    // the dispatcher serialize the events themselves.
    fn handle_event(&self, event: &Event) {
        match event.event_type {
            EventType::NwkInterface => {
                // Delivered each time there is new information about network
                // connectivity
                self.parse_network_event(event);
            }
            EventType::TaskletInit => {
                // Delivered once after the handler has been registered. A
                // running loop can deliver it before handler_create returns,
                // so the id comes from the event, not from the record.
                match self.lock().as_mut() {
                    Some(data) => {
                        data.node_main_tasklet_id = event.receiver;
                        data.tasklet_id = event.receiver;
                    }
                    None => return,
                }
                self.dispatcher.send_connect_event(event.receiver);
            }
            EventType::SystemTimer => {
                let owner = match self.lock().as_ref() {
                    Some(data) => data.node_main_tasklet_id,
                    None => return,
                };
                self.dispatcher.timer_cancel(event.event_id, owner);

                if event.event_id == TIMER_EVENT_START_BOOTSTRAP {
                    debug!("tasklet: Restart bootstrap");
                    self.configure_and_connect_to_network();
                }
            }
            EventType::Application => {
                if event.event_id == APPL_EVENT_CONNECT {
                    self.configure_and_connect_to_network();
                }
            }
            EventType::Other(_) => {}
        }
    }

    fn parse_network_event(&self, event: &Event) {
        let status = event.interface_status();
        debug!("tasklet: app_parse_network_event() {:?}", status);

        let (notify, retry_owner) = {
            let mut guard = self.lock();
            let Some(data) = guard.as_mut() else {
                warn!("tasklet: network event {:?} before initialization", status);
                return;
            };

            let mut notify = None;
            match status {
                InterfaceStatus::BootstrapReady => {
                    // Network is ready and node is connected to the access point
                    if data.state != TaskletState::BootstrapReady {
                        info!("tasklet: IPv6 bootstrap ready");
                        data.state = TaskletState::BootstrapReady;
                        notify = data.callback.clone();
                    }
                }
                InterfaceStatus::IpAddressAllocationFail => {
                    // No router on the link, stack is idle
                    info!("tasklet: Bootstrap fail");
                    data.state = TaskletState::BootstrapFailed;
                }
                InterfaceStatus::ConnectionDown => {
                    info!("tasklet: Connection lost");
                    data.state = TaskletState::BootstrapFailed;
                }
                other => {
                    warn!("tasklet: Unknown event {:?}", other);
                }
            }

            let retry_owner = (data.state != TaskletState::BootstrapReady)
                .then_some(data.node_main_tasklet_id);
            (notify, retry_owner)
        };

        if let Some(callback) = notify {
            callback(ConnectionStatus::Connected);
        }

        if let Some(owner) = retry_owner {
            self.dispatcher.timer_request(
                TIMER_EVENT_START_BOOTSTRAP,
                EventType::SystemTimer,
                owner,
                self.retry_delay,
            );
        }
    }

    fn configure_and_connect_to_network(&self) {
        let interface_id = match self.lock().as_ref() {
            Some(data) if data.has_interface() => data.interface_id,
            _ => {
                debug!("tasklet: no interface to bring up");
                return;
            }
        };

        let status = self.stack.interface_up(interface_id);
        if status != 0 {
            debug!("tasklet: interface {} up request returned {}", interface_id, status);
        }
    }
}
