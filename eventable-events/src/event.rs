//! Event values and dispatch inputs

use crate::hub::EventHub;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use uuid::Uuid;

/// Arbitrary payload fields carried by an event.
pub type Payload = serde_json::Map<String, Value>;

/// Lower-level event an [`Event`] was raised from (a UI or platform event).
///
/// When any listener returns [`Flow::Stop`](crate::Flow::Stop), the hub calls
/// [`stop_propagation`](SourceEvent::stop_propagation) on the attached source.
pub trait SourceEvent {
    /// Halt further propagation of the source event.
    fn stop_propagation(&self);
}

/// Inputs of a single dispatch.
///
/// # Examples
///
/// ```rust,ignore
/// hub.dispatch_with(
///     "moved",
///     EventInit::new().field("x", 10).field("y", 20),
/// );
/// ```
#[derive(Clone, Default)]
pub struct EventInit {
    pub(crate) payload: Payload,
    pub(crate) source: Option<Rc<dyn SourceEvent>>,
    pub(crate) propagate: Option<bool>,
}

impl EventInit {
    /// Create an empty init
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a single payload field
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Merge a payload map; later keys win
    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload.extend(payload);
        self
    }

    /// Attach the lower-level event this dispatch originates from
    pub fn source(mut self, source: Rc<dyn SourceEvent>) -> Self {
        self.source = Some(source);
        self
    }

    /// Override the hub's propagation setting for this dispatch
    pub fn propagate(mut self, propagate: bool) -> Self {
        self.propagate = Some(propagate);
        self
    }
}

impl From<Payload> for EventInit {
    fn from(payload: Payload) -> Self {
        Self::new().payload(payload)
    }
}

impl fmt::Debug for EventInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventInit")
            .field("payload", &self.payload)
            .field("source", &self.source.is_some())
            .field("propagate", &self.propagate)
            .finish()
    }
}

/// An event delivered to listeners.
///
/// One `Event` is built per dispatch and shared read-only by every listener
/// of that dispatch. It is dropped when the dispatch returns.
pub struct Event {
    id: Uuid,
    timestamp: DateTime<Utc>,
    event_type: String,
    target: EventHub,
    payload: Payload,
    layer: Option<EventHub>,
    propagated_from: Option<EventHub>,
    source: Option<Rc<dyn SourceEvent>>,
}

impl Event {
    pub(crate) fn new(
        event_type: &str,
        target: EventHub,
        init: &EventInit,
        from: Option<&EventHub>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            target,
            payload: init.payload.clone(),
            layer: from.cloned(),
            propagated_from: from.cloned(),
            source: init.source.clone(),
        }
    }

    /// Unique id of this dispatch
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the event was built
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Normalized (lower-cased) event type
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Hub the event is being dispatched on
    pub fn target(&self) -> &EventHub {
        &self.target
    }

    /// All payload fields
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Single payload field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// Immediate child hub the event was propagated from, if any.
    ///
    /// Always equal to [`propagated_from`](Self::propagated_from); kept as a
    /// separate accessor for callers that think of hubs as layers.
    pub fn layer(&self) -> Option<&EventHub> {
        self.layer.as_ref()
    }

    /// Immediate child hub the event was propagated from, if any.
    ///
    /// For an event that bubbled through several levels this is the hub one
    /// level below the target, not the hub the dispatch started on.
    pub fn propagated_from(&self) -> Option<&EventHub> {
        self.propagated_from.as_ref()
    }

    /// `true` when this event reached the target through a child hub
    pub fn is_propagated(&self) -> bool {
        self.propagated_from.is_some()
    }

    /// Attached lower-level event, if any
    pub fn source(&self) -> Option<&Rc<dyn SourceEvent>> {
        self.source.as_ref()
    }

    pub(crate) fn stop_source(&self) {
        if let Some(source) = &self.source {
            source.stop_propagation();
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("event_type", &self.event_type)
            .field("target", &self.target.id())
            .field("payload", &self.payload)
            .field("propagated_from", &self.propagated_from.as_ref().map(EventHub::id))
            .finish_non_exhaustive()
    }
}
