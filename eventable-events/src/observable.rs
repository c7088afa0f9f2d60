//! Make any type observable by embedding an [`EventHub`]

use crate::event::EventInit;
use crate::handler::{Context, EventMap, Handler};
use crate::hub::EventHub;

/// Observable capability, implemented by delegation to an embedded hub.
///
/// Only [`event_hub`](Observable::event_hub) is required; every other method
/// forwards to it and returns `self` for chaining.
///
/// # Examples
///
/// ```rust,ignore
/// struct Marker {
///     events: EventHub,
///     position: (f64, f64),
/// }
///
/// impl Observable for Marker {
///     fn event_hub(&self) -> &EventHub {
///         &self.events
///     }
/// }
///
/// marker.on("moved", &redraw).dispatch("moved");
/// ```
pub trait Observable {
    fn event_hub(&self) -> &EventHub;

    fn on(&self, types: &str, handler: &Handler) -> &Self {
        self.event_hub().on(types, handler);
        self
    }

    fn on_with(&self, types: &str, handler: &Handler, context: &Context) -> &Self {
        self.event_hub().on_with(types, handler, context);
        self
    }

    fn on_map(&self, map: &EventMap, context: Option<&Context>) -> &Self {
        self.event_hub().on_map(map, context);
        self
    }

    fn add_event_listener(&self, types: &str, handler: &Handler) -> &Self {
        self.event_hub().add_event_listener(types, handler);
        self
    }

    fn once(&self, types: &str, handler: &Handler) -> &Self {
        self.event_hub().once(types, handler);
        self
    }

    fn once_with(&self, types: &str, handler: &Handler, context: &Context) -> &Self {
        self.event_hub().once_with(types, handler, context);
        self
    }

    fn once_map(&self, map: &EventMap, context: Option<&Context>) -> &Self {
        self.event_hub().once_map(map, context);
        self
    }

    fn un(&self, types: &str, handler: &Handler) -> &Self {
        self.event_hub().un(types, handler);
        self
    }

    fn un_with(&self, types: &str, handler: &Handler, context: &Context) -> &Self {
        self.event_hub().un_with(types, handler, context);
        self
    }

    fn un_map(&self, map: &EventMap, context: Option<&Context>) -> &Self {
        self.event_hub().un_map(map, context);
        self
    }

    fn off(&self, types: &str, handler: &Handler) -> &Self {
        self.event_hub().off(types, handler);
        self
    }

    fn remove_event_listener(&self, types: &str, handler: &Handler) -> &Self {
        self.event_hub().remove_event_listener(types, handler);
        self
    }

    fn un_type(&self, types: &str) -> &Self {
        self.event_hub().un_type(types);
        self
    }

    fn un_type_map(&self, map: &EventMap) -> &Self {
        self.event_hub().un_type_map(map);
        self
    }

    fn un_all(&self) -> &Self {
        self.event_hub().un_all();
        self
    }

    fn dispatch(&self, event_type: &str) -> &Self {
        self.event_hub().dispatch(event_type);
        self
    }

    fn dispatch_with(&self, event_type: &str, init: EventInit) -> &Self {
        self.event_hub().dispatch_with(event_type, init);
        self
    }

    fn dispatch_deferred(&self, event_type: &str, init: EventInit) -> &Self {
        self.event_hub().dispatch_deferred(event_type, init);
        self
    }

    fn listens(&self, event_type: &str) -> usize {
        self.event_hub().listens(event_type)
    }

    fn listens_to(&self, event_type: &str, handler: &Handler) -> bool {
        self.event_hub().listens_to(event_type, handler)
    }

    fn listens_to_with(&self, event_type: &str, handler: &Handler, context: &Context) -> bool {
        self.event_hub().listens_to_with(event_type, handler, context)
    }

    fn listens_propagated(&self, event_type: &str) -> bool {
        self.event_hub().listens_propagated(event_type)
    }

    /// Register every listener of `source` here as well
    fn copy_event_listeners<S: Observable + ?Sized>(&self, source: &S) -> &Self {
        self.event_hub().copy_event_listeners(source.event_hub());
        self
    }

    /// Forward this object's events to `parent` as well
    fn add_event_parent<P: Observable + ?Sized>(&self, parent: &P) -> &Self {
        self.event_hub().add_event_parent(parent.event_hub());
        self
    }

    fn remove_event_parent<P: Observable + ?Sized>(&self, parent: &P) -> &Self {
        self.event_hub().remove_event_parent(parent.event_hub());
        self
    }
}

impl Observable for EventHub {
    fn event_hub(&self) -> &EventHub {
        self
    }
}
