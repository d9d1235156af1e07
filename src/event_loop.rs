//! In-process cooperative event dispatcher
//!
//! Handlers are registered under a unique name and receive every event whose
//! receiver matches their id. Events are queued on a channel and delivered one
//! at a time by [`EventLoop::run`], so a handler never runs concurrently with
//! itself or with another handler. Timers are tokio tasks that post a
//! `SystemTimer` event when they expire.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use common::{Event, EventId, EventType, HandlerId, APPL_EVENT_CONNECT};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::tasklet::{EventDispatcher, EventHandler};

struct HandlerSlot {
    name: String,
    /// Taken out while the handler runs
    handler: Option<EventHandler>,
}

struct LoopInner {
    tx: mpsc::UnboundedSender<Event>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Event>>,
    handlers: Mutex<Vec<HandlerSlot>>,
    timers: Mutex<HashMap<(EventId, HandlerId), JoinHandle<()>>>,
    /// Handler currently being run by `dispatch`
    active: Mutex<Option<HandlerId>>,
    max_handlers: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Clone)]
pub struct EventLoop {
    inner: Arc<LoopInner>,
}

/// Cheap handle for posting events into a loop from outside of it
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSender {
    pub fn post(&self, event: Event) {
        if self.tx.send(event).is_err() {
            debug!("event_loop: dropping {:?}, loop is gone", event.event_type);
        }
    }
}

impl EventLoop {
    pub fn new(max_handlers: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            inner: Arc::new(LoopInner {
                tx,
                rx: tokio::sync::Mutex::new(rx),
                handlers: Mutex::new(Vec::new()),
                timers: Mutex::new(HashMap::new()),
                active: Mutex::new(None),
                // Handler ids are i8, keep them positive
                max_handlers: max_handlers.min(HandlerId::MAX as usize + 1),
            }),
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.inner.tx.clone(),
        }
    }

    pub fn post(&self, event: Event) {
        self.sender().post(event);
    }

    /// Id of the handler whose event is being delivered right now
    pub fn active_tasklet(&self) -> Option<HandlerId> {
        *lock(&self.inner.active)
    }

    pub fn handler_count(&self) -> usize {
        lock(&self.inner.handlers).len()
    }

    /// Deliver events until the loop is dropped. Only one `run` can be active
    /// at a time, a second caller waits for the first to finish.
    pub async fn run(&self) {
        let mut rx = self.inner.rx.lock().await;
        while let Some(event) = rx.recv().await {
            self.dispatch(event);
        }
    }

    /// Deliver whatever is queued right now without waiting for more.
    /// Returns the number of events delivered.
    pub fn run_pending(&self) -> usize {
        let Ok(mut rx) = self.inner.rx.try_lock() else {
            return 0;
        };
        let mut delivered = 0;
        while let Ok(event) = rx.try_recv() {
            self.dispatch(event);
            delivered += 1;
        }
        delivered
    }

    fn dispatch(&self, event: Event) {
        trace!("event_loop: dispatch {}", event.to_json());

        let Ok(index) = usize::try_from(event.receiver) else {
            debug!("event_loop: no receiver {} for {:?}", event.receiver, event.event_type);
            return;
        };

        let handler = lock(&self.inner.handlers)
            .get_mut(index)
            .and_then(|slot| slot.handler.take());
        let Some(mut handler) = handler else {
            debug!("event_loop: no handler {} for {:?}", event.receiver, event.event_type);
            return;
        };

        *lock(&self.inner.active) = Some(event.receiver);
        handler(&event);
        *lock(&self.inner.active) = None;

        if let Some(slot) = lock(&self.inner.handlers).get_mut(index) {
            slot.handler = Some(handler);
        }
    }
}

impl EventDispatcher for EventLoop {
    fn handler_create(
        &self,
        name: &str,
        handler: EventHandler,
        init_event_type: EventType,
    ) -> HandlerId {
        let mut handlers = lock(&self.inner.handlers);
        if handlers.iter().any(|slot| slot.name == name) {
            warn!("event_loop: handler name {} already in use", name);
            return -1;
        }
        if handlers.len() >= self.inner.max_handlers {
            warn!("event_loop: no room for handler {}", name);
            return -2;
        }

        handlers.push(HandlerSlot {
            name: name.to_string(),
            handler: Some(handler),
        });
        let id = (handlers.len() - 1) as HandlerId;
        drop(handlers);

        debug!("event_loop: registered {} as {}", name, id);
        self.post(Event {
            sender: id,
            ..Event::new(id, init_event_type, 0)
        });
        id
    }

    fn timer_request(
        &self,
        event_id: EventId,
        event_type: EventType,
        receiver: HandlerId,
        delay: Duration,
    ) -> i8 {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("event_loop: timer {} requested outside of a runtime", event_id);
            return -1;
        };

        let tx = self.inner.tx.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Event {
                sender: receiver,
                ..Event::new(receiver, event_type, event_id)
            });
        });

        if let Some(previous) = lock(&self.inner.timers).insert((event_id, receiver), task) {
            previous.abort();
        }
        0
    }

    fn timer_cancel(&self, event_id: EventId, receiver: HandlerId) -> i8 {
        match lock(&self.inner.timers).remove(&(event_id, receiver)) {
            Some(task) => {
                task.abort();
                0
            }
            None => -1,
        }
    }

    fn send_connect_event(&self, receiver: HandlerId) {
        self.post(Event::new(receiver, EventType::Application, APPL_EVENT_CONNECT));
    }
}
