//! Event hub implementation

use crate::event::{Event, EventInit, Payload};
use crate::handler::{
    Binding, Context, EventMap, Flow, Handler, Receiver, normalize_type, same_context, split_types,
};
use crate::options::Options;
use crate::scheduler::{LocalSpawner, Scheduler};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Stable identity of a hub, used to key event parents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HubId(Uuid);

impl HubId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for HubId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Hub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Forward dispatched events to event parents
    pub propagate: bool,

    /// Enable event logging
    pub enable_logging: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            propagate: true,
            enable_logging: true,
        }
    }
}

struct Registration {
    handler: Handler,
    context: Option<Context>,
    once: bool,
    fired: Cell<bool>,
    active: Cell<bool>,
}

impl Registration {
    fn new(handler: Handler, context: Option<Context>, once: bool) -> Self {
        Self {
            handler,
            context,
            once,
            fired: Cell::new(false),
            active: Cell::new(true),
        }
    }

    fn matches(&self, handler: &Handler, context: Option<&Context>) -> bool {
        self.handler.ptr_eq(handler) && same_context(self.context.as_ref(), context)
    }
}

/// Shared so a dispatch can iterate a snapshot while the live list changes
type Listeners = Rc<Vec<Rc<Registration>>>;

struct HubInner {
    id: HubId,
    listeners: RefCell<HashMap<String, Listeners>>,
    parents: RefCell<Vec<(HubId, WeakEventHub)>>,
    /// Nesting depth of dispatch passes currently running on this hub
    firing: Cell<usize>,
    config: HubConfig,
    options: RefCell<Rc<Options>>,
    scheduler: Rc<dyn Scheduler>,
}

/// An observable object: registers listeners by event type and dispatches
/// events to them.
///
/// `EventHub` is a cheap handle; clones share the same listeners. It is
/// single-threaded (`!Send`), and listeners may freely dispatch, register or
/// unregister on the hub while being invoked.
///
/// # Examples
///
/// ```rust,ignore
/// let hub = EventHub::new();
/// let clicked = Handler::new(|_, event| println!("{}", event.event_type()));
///
/// hub.on("click dblclick", &clicked)
///     .dispatch("click")
///     .un("click", &clicked);
/// ```
#[derive(Clone)]
pub struct EventHub {
    inner: Rc<HubInner>,
}

/// Non-owning handle to an [`EventHub`]
#[derive(Clone, Default)]
pub struct WeakEventHub {
    inner: Weak<HubInner>,
}

impl WeakEventHub {
    pub fn upgrade(&self) -> Option<EventHub> {
        self.inner.upgrade().map(|inner| EventHub { inner })
    }

    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for WeakEventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEventHub")
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Decrements the firing depth even if a listener panics
struct FiringGuard<'a>(&'a Cell<usize>);

impl<'a> FiringGuard<'a> {
    fn enter(depth: &'a Cell<usize>) -> Self {
        depth.set(depth.get() + 1);
        Self(depth)
    }
}

impl Drop for FiringGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl EventHub {
    /// Create a hub with default configuration
    pub fn new() -> Self {
        EventHubBuilder::new().build()
    }

    /// Create a hub with an initial option bag
    pub fn with_options(options: Payload) -> Self {
        EventHubBuilder::new().options(options).build()
    }

    /// Create a hub with custom config
    pub fn with_config(config: HubConfig) -> Self {
        EventHubBuilder::new().config(config).build()
    }

    pub fn builder() -> EventHubBuilder {
        EventHubBuilder::new()
    }

    pub fn id(&self) -> HubId {
        self.inner.id
    }

    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakEventHub {
        WeakEventHub {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// This hub as a handler context.
    ///
    /// Registering with the hub's own context is the same as registering
    /// without one.
    pub fn as_context(&self) -> Context {
        Context::from_dyn(self.inner.clone() as Rc<dyn Any>)
    }

    pub(crate) fn from_context(value: &Rc<dyn Any>) -> Option<EventHub> {
        Rc::clone(value)
            .downcast::<HubInner>()
            .ok()
            .map(|inner| EventHub { inner })
    }

    fn is_own_context(&self, context: &Context) -> bool {
        context.addr() == Rc::as_ptr(&self.inner) as *const ()
    }

    fn log_enabled(&self) -> bool {
        self.inner.config.enable_logging
    }

    // ------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------

    /// Current option bag
    pub fn options(&self) -> Rc<Options> {
        self.inner.options.borrow().clone()
    }

    /// Layer `options` over the current option bag.
    ///
    /// `Options` previously returned by [`options`](Self::options) are left
    /// untouched.
    pub fn set_options(&self, options: Payload) -> &Self {
        let mut current = self.inner.options.borrow_mut();
        let layered = Options::layered(&current, options);
        *current = Rc::new(layered);
        self
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Register `handler` for each space-separated type in `types`
    pub fn on(&self, types: &str, handler: &Handler) -> &Self {
        self.bind(
            Binding::Single {
                types,
                handler,
                context: None,
            },
            false,
        )
    }

    /// Register `handler` bound to `context`
    pub fn on_with(&self, types: &str, handler: &Handler, context: &Context) -> &Self {
        self.bind(
            Binding::Single {
                types,
                handler,
                context: Some(context),
            },
            false,
        )
    }

    /// Register every handler of `map`, all bound to `context`
    pub fn on_map(&self, map: &EventMap, context: Option<&Context>) -> &Self {
        self.bind(Binding::Batch { map, context }, false)
    }

    /// Alias of [`on`](Self::on)
    pub fn add_event_listener(&self, types: &str, handler: &Handler) -> &Self {
        self.on(types, handler)
    }

    /// Register `handler` to run on the next matching dispatch only
    pub fn once(&self, types: &str, handler: &Handler) -> &Self {
        self.bind(
            Binding::Single {
                types,
                handler,
                context: None,
            },
            true,
        )
    }

    pub fn once_with(&self, types: &str, handler: &Handler, context: &Context) -> &Self {
        self.bind(
            Binding::Single {
                types,
                handler,
                context: Some(context),
            },
            true,
        )
    }

    pub fn once_map(&self, map: &EventMap, context: Option<&Context>) -> &Self {
        self.bind(Binding::Batch { map, context }, true)
    }

    fn bind(&self, binding: Binding<'_>, once: bool) -> &Self {
        let (pairs, context) = binding.resolve();
        for (event_type, handler) in pairs {
            self.register(event_type, handler, context.cloned(), once);
        }
        self
    }

    fn register(&self, event_type: String, handler: &Handler, context: Option<Context>, once: bool) {
        let context = context.filter(|c| !self.is_own_context(c));

        let mut listeners = self.inner.listeners.borrow_mut();
        let list = listeners.entry(event_type).or_default();
        if list.iter().any(|r| r.matches(handler, context.as_ref())) {
            return;
        }

        if self.inner.firing.get() > 0 {
            // a dispatch pass may be iterating this list
            *list = Rc::new((**list).clone());
        }
        Rc::make_mut(list).push(Rc::new(Registration::new(handler.clone(), context, once)));

        if self.log_enabled() {
            debug!(
                "Registered {} listener on hub {} ({} total)",
                if once { "once" } else { "persistent" },
                self.inner.id,
                list.len()
            );
        }
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Remove every listener for every type
    pub fn un_all(&self) -> &Self {
        let removed = std::mem::take(&mut *self.inner.listeners.borrow_mut());
        for registration in removed.values().flat_map(|list| list.iter()) {
            registration.active.set(false);
        }
        if self.log_enabled() {
            debug!("Cleared all listeners on hub {}", self.inner.id);
        }
        self
    }

    /// Remove every listener for each space-separated type in `types`
    pub fn un_type(&self, types: &str) -> &Self {
        for event_type in split_types(types) {
            self.clear_type(&event_type);
        }
        self
    }

    /// Remove every listener for each type named by `map`'s keys.
    ///
    /// The handlers in `map` are ignored.
    pub fn un_type_map(&self, map: &EventMap) -> &Self {
        for event_type in map.iter().filter_map(|(t, _)| normalize_type(t)) {
            self.clear_type(&event_type);
        }
        self
    }

    fn clear_type(&self, event_type: &str) {
        let removed = self.inner.listeners.borrow_mut().remove(event_type);
        if let Some(list) = removed {
            for registration in list.iter() {
                registration.active.set(false);
            }
            if self.log_enabled() {
                debug!("Cleared listeners for '{}' on hub {}", event_type, self.inner.id);
            }
        }
    }

    /// Remove `handler` (registered without a context) from each type
    pub fn un(&self, types: &str, handler: &Handler) -> &Self {
        self.unbind(Binding::Single {
            types,
            handler,
            context: None,
        })
    }

    /// Remove `handler` bound to `context` from each type
    pub fn un_with(&self, types: &str, handler: &Handler, context: &Context) -> &Self {
        self.unbind(Binding::Single {
            types,
            handler,
            context: Some(context),
        })
    }

    /// Remove every handler of `map` bound to `context`
    pub fn un_map(&self, map: &EventMap, context: Option<&Context>) -> &Self {
        self.unbind(Binding::Batch { map, context })
    }

    /// Alias of [`un`](Self::un)
    pub fn off(&self, types: &str, handler: &Handler) -> &Self {
        self.un(types, handler)
    }

    /// Alias of [`un`](Self::un)
    pub fn remove_event_listener(&self, types: &str, handler: &Handler) -> &Self {
        self.un(types, handler)
    }

    fn unbind(&self, binding: Binding<'_>) -> &Self {
        let (pairs, context) = binding.resolve();
        let context = context.filter(|c| !self.is_own_context(c));
        for (event_type, handler) in pairs {
            self.remove_where(&event_type, |r| r.matches(handler, context));
        }
        self
    }

    /// Remove the first registration of `event_type` matching `pred`.
    ///
    /// The removed registration is deactivated so an in-flight snapshot
    /// skips it.
    fn remove_where(&self, event_type: &str, pred: impl Fn(&Registration) -> bool) -> bool {
        let mut listeners = self.inner.listeners.borrow_mut();
        let Some(list) = listeners.get_mut(event_type) else {
            return false;
        };
        let Some(index) = list.iter().position(|r| pred(&**r)) else {
            return false;
        };

        if self.inner.firing.get() > 0 {
            // copy before splicing so the running pass keeps its own list
            *list = Rc::new((**list).clone());
        }
        let removed = Rc::make_mut(list).remove(index);
        removed.active.set(false);

        if list.is_empty() {
            listeners.remove(event_type);
        }
        if self.log_enabled() {
            debug!("Removed listener for '{}' on hub {}", event_type, self.inner.id);
        }
        true
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Dispatch an event with no payload
    pub fn dispatch(&self, event_type: &str) -> &Self {
        self.dispatch_with(event_type, EventInit::new())
    }

    /// Dispatch an event synchronously.
    ///
    /// Local listeners run in registration order, then, when propagation is
    /// on, every live event parent receives its own dispatch of the event.
    pub fn dispatch_with(&self, event_type: &str, init: EventInit) -> &Self {
        if let Some(event_type) = normalize_type(event_type) {
            let mut path = Vec::new();
            self.fire(&event_type, &init, None, &mut path);
        }
        self
    }

    /// Dispatch on a later tick of the hub's scheduler.
    ///
    /// Deferred dispatches run in the order they were requested. If the
    /// scheduler refuses the task the event is dropped.
    pub fn dispatch_deferred(&self, event_type: &str, init: EventInit) -> &Self {
        let hub = self.clone();
        let deferred_type = event_type.to_string();
        let task = Box::new(move || {
            hub.dispatch_with(&deferred_type, init);
        });

        if let Err(e) = self.inner.scheduler.schedule(task) {
            if self.log_enabled() {
                warn!("Dropped deferred '{}' on hub {}: {}", event_type, self.inner.id, e);
            }
        }
        self
    }

    fn fire(&self, event_type: &str, init: &EventInit, from: Option<&EventHub>, path: &mut Vec<HubId>) {
        let propagate = init.propagate.unwrap_or(self.inner.config.propagate);

        path.push(self.inner.id);
        let mut seen = path.clone();
        if !self.has_listeners(event_type, propagate, &mut seen) {
            path.pop();
            return;
        }

        let snapshot = self.inner.listeners.borrow().get(event_type).cloned();
        if let Some(listeners) = snapshot {
            let event = Event::new(event_type, self.clone(), init, from);
            if self.log_enabled() {
                trace!(
                    "Dispatching '{}' on hub {} to {} listener(s)",
                    event_type,
                    self.inner.id,
                    listeners.len()
                );
            }

            let _guard = FiringGuard::enter(&self.inner.firing);
            for registration in listeners.iter() {
                self.invoke(event_type, registration, &event);
            }
        }

        if propagate {
            self.propagate(event_type, init, path);
        }
        path.pop();
    }

    fn invoke(&self, event_type: &str, registration: &Rc<Registration>, event: &Event) {
        if !registration.active.get() {
            return;
        }
        if registration.once && registration.fired.replace(true) {
            return;
        }

        let receiver = match &registration.context {
            Some(context) => Receiver::Context(context),
            None => Receiver::Hub(self),
        };
        let flow = registration.handler.call(&receiver, event);

        if registration.once {
            self.remove_where(event_type, |r| std::ptr::eq(r, Rc::as_ptr(registration)));
        }
        if flow == Flow::Stop {
            event.stop_source();
        }
    }

    fn propagate(&self, event_type: &str, init: &EventInit, path: &mut Vec<HubId>) {
        let parent_init = init.clone().propagate(true);
        for parent in self.parents() {
            if path.contains(&parent.id()) {
                continue;
            }
            parent.fire(event_type, &parent_init, Some(self), path);
        }
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Number of listeners registered for `event_type`
    pub fn listens(&self, event_type: &str) -> usize {
        normalize_type(event_type).map_or(0, |t| self.count(&t))
    }

    /// Whether `handler` is registered for `event_type` without a context
    pub fn listens_to(&self, event_type: &str, handler: &Handler) -> bool {
        self.find(event_type, handler, None)
    }

    /// Whether `handler` is registered for `event_type` bound to `context`
    pub fn listens_to_with(&self, event_type: &str, handler: &Handler, context: &Context) -> bool {
        self.find(event_type, handler, Some(context))
    }

    /// Whether this hub or any of its event ancestors would fire for
    /// `event_type`
    pub fn listens_propagated(&self, event_type: &str) -> bool {
        match normalize_type(event_type) {
            Some(t) => self.has_listeners(&t, true, &mut vec![self.inner.id]),
            None => false,
        }
    }

    /// Registered event types, sorted
    pub fn event_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.inner.listeners.borrow().keys().cloned().collect();
        types.sort();
        types
    }

    /// `true` while a dispatch pass is running on this hub
    pub fn is_dispatching(&self) -> bool {
        self.inner.firing.get() > 0
    }

    /// Nesting depth of running dispatch passes
    pub fn dispatch_depth(&self) -> usize {
        self.inner.firing.get()
    }

    fn count(&self, event_type: &str) -> usize {
        self.inner
            .listeners
            .borrow()
            .get(event_type)
            .map_or(0, |list| list.len())
    }

    fn find(&self, event_type: &str, handler: &Handler, context: Option<&Context>) -> bool {
        let Some(event_type) = normalize_type(event_type) else {
            return false;
        };
        let context = context.filter(|c| !self.is_own_context(c));
        self.inner
            .listeners
            .borrow()
            .get(&event_type)
            .is_some_and(|list| list.iter().any(|r| r.matches(handler, context)))
    }

    fn has_listeners(&self, event_type: &str, propagate: bool, seen: &mut Vec<HubId>) -> bool {
        if self.count(event_type) > 0 {
            return true;
        }
        if !propagate {
            return false;
        }
        for parent in self.parents() {
            if seen.contains(&parent.id()) {
                continue;
            }
            seen.push(parent.id());
            if parent.has_listeners(event_type, true, seen) {
                return true;
            }
        }
        false
    }

    // ------------------------------------------------------------------
    // Parents
    // ------------------------------------------------------------------

    /// Forward events dispatched here to `parent` as well
    pub fn add_event_parent(&self, parent: &EventHub) -> &Self {
        let id = parent.id();
        if id == self.inner.id {
            return self;
        }

        let mut parents = self.inner.parents.borrow_mut();
        if parents.iter().any(|(existing, _)| *existing == id) {
            return self;
        }
        parents.push((id, parent.downgrade()));

        if self.log_enabled() {
            debug!("Added event parent {} to hub {}", id, self.inner.id);
        }
        self
    }

    pub fn remove_event_parent(&self, parent: &EventHub) -> &Self {
        let id = parent.id();
        let mut parents = self.inner.parents.borrow_mut();
        let before = parents.len();
        parents.retain(|(existing, _)| *existing != id);

        if parents.len() != before && self.log_enabled() {
            debug!("Removed event parent {} from hub {}", id, self.inner.id);
        }
        self
    }

    /// Live event parents, in the order they were added
    pub fn parents(&self) -> Vec<EventHub> {
        let mut parents = self.inner.parents.borrow_mut();
        parents.retain(|(_, parent)| parent.is_alive());
        parents.iter().filter_map(|(_, parent)| parent.upgrade()).collect()
    }

    // ------------------------------------------------------------------
    // Copying
    // ------------------------------------------------------------------

    /// Register every listener of `source` on this hub as well.
    ///
    /// Handler and context identity are kept, so duplicates are skipped.
    /// Listeners `source` invokes against itself are invoked against this
    /// hub after the copy.
    pub fn copy_event_listeners(&self, source: &EventHub) -> &Self {
        let copied: Vec<(String, Vec<Rc<Registration>>)> = source
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(event_type, list)| (event_type.clone(), list.to_vec()))
            .collect();

        for (event_type, list) in copied {
            for registration in list.iter().filter(|r| r.active.get()) {
                self.register(
                    event_type.clone(),
                    &registration.handler,
                    registration.context.clone(),
                    registration.once,
                );
            }
        }

        if self.log_enabled() {
            debug!("Copied listeners from hub {} to hub {}", source.inner.id, self.inner.id);
        }
        self
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for EventHub {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for EventHub {}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("id", &self.inner.id)
            .field("event_types", &self.event_types())
            .field("parents", &self.inner.parents.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Event hub builder
pub struct EventHubBuilder {
    config: HubConfig,
    options: Payload,
    scheduler: Option<Rc<dyn Scheduler>>,
}

impl EventHubBuilder {
    /// Create new event hub builder
    pub fn new() -> Self {
        Self {
            config: HubConfig::default(),
            options: Payload::new(),
            scheduler: None,
        }
    }

    pub fn config(mut self, config: HubConfig) -> Self {
        self.config = config;
        self
    }

    /// Enable/disable propagation to event parents
    pub fn propagate(mut self, enabled: bool) -> Self {
        self.config.propagate = enabled;
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Initial option bag
    pub fn options(mut self, options: Payload) -> Self {
        self.options = options;
        self
    }

    /// Scheduler used by deferred dispatch; defaults to [`LocalSpawner::current`]
    pub fn scheduler(mut self, scheduler: Rc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Build the event hub
    pub fn build(self) -> EventHub {
        EventHub {
            inner: Rc::new(HubInner {
                id: HubId::new(),
                listeners: RefCell::new(HashMap::new()),
                parents: RefCell::new(Vec::new()),
                firing: Cell::new(0),
                config: self.config,
                options: RefCell::new(Rc::new(Options::new(self.options))),
                scheduler: self.scheduler.unwrap_or_else(|| Rc::new(LocalSpawner::current())),
            }),
        }
    }
}

impl Default for EventHubBuilder {
    fn default() -> Self {
        Self::new()
    }
}
