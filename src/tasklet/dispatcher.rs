use std::{sync::Arc, time::Duration};

use common::{Event, EventId, EventType, HandlerId};

/// Callback the dispatcher invokes for every event addressed to a handler
pub type EventHandler = Box<dyn FnMut(&Event) + Send>;

/// The cooperative event loop the tasklet runs inside of.
///
/// All calls are requests: their outcome is delivered later as events, never
/// synchronously from within the call.
pub trait EventDispatcher: Send + Sync + 'static {
    /// Register `handler` under `name` and queue an `init_event_type` event
    /// for it. Returns the new handler id, -1 if the name is already taken or
    /// -2 if no handler slot is left.
    fn handler_create(&self, name: &str, handler: EventHandler, init_event_type: EventType)
        -> HandlerId;

    /// Arm a one-shot timer that delivers `event_type` / `event_id` to
    /// `receiver` after `delay`. Replaces a timer with the same id and
    /// receiver.
    fn timer_request(
        &self,
        event_id: EventId,
        event_type: EventType,
        receiver: HandlerId,
        delay: Duration,
    ) -> i8;

    /// Cancel a timer. Returns -1 if no such timer exists.
    fn timer_cancel(&self, event_id: EventId, receiver: HandlerId) -> i8;

    /// Queue the application connect event for `receiver`
    fn send_connect_event(&self, receiver: HandlerId);
}

impl<T: EventDispatcher> EventDispatcher for Arc<T> {
    fn handler_create(
        &self,
        name: &str,
        handler: EventHandler,
        init_event_type: EventType,
    ) -> HandlerId {
        (**self).handler_create(name, handler, init_event_type)
    }

    fn timer_request(
        &self,
        event_id: EventId,
        event_type: EventType,
        receiver: HandlerId,
        delay: Duration,
    ) -> i8 {
        (**self).timer_request(event_id, event_type, receiver, delay)
    }

    fn timer_cancel(&self, event_id: EventId, receiver: HandlerId) -> i8 {
        (**self).timer_cancel(event_id, receiver)
    }

    fn send_connect_event(&self, receiver: HandlerId) {
        (**self).send_connect_event(receiver)
    }
}
