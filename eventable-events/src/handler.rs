//! Listener callables and the receivers they are invoked against

use crate::event::Event;
use crate::hub::EventHub;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// What a listener asks the hub to do after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    /// Keep going
    #[default]
    Continue,
    /// Stop propagation of the attached [`SourceEvent`](crate::SourceEvent)
    Stop,
}

impl From<()> for Flow {
    fn from(_: ()) -> Self {
        Flow::Continue
    }
}

impl From<bool> for Flow {
    /// `false` maps to [`Flow::Stop`].
    fn from(keep_going: bool) -> Self {
        if keep_going { Flow::Continue } else { Flow::Stop }
    }
}

type HandlerFn = dyn Fn(&Receiver<'_>, &Event) -> Flow;

/// A registered callable.
///
/// Handlers are compared by identity: clones of one `Handler` are the same
/// listener, two `Handler`s built from equal closures are not.
///
/// # Examples
///
/// ```rust,ignore
/// let clicked = Handler::new(|_, event| {
///     println!("clicked at {:?}", event.get("x"));
/// });
///
/// // returning `false` stops the attached source event
/// let swallow = Handler::new(|_, _| false);
/// ```
#[derive(Clone)]
pub struct Handler {
    func: Rc<HandlerFn>,
}

impl Handler {
    /// Wrap a closure. It may return `()`, `bool` or [`Flow`].
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&Receiver<'_>, &Event) -> R + 'static,
        R: Into<Flow>,
    {
        Self::from_fn(move |receiver, event| f(receiver, event).into())
    }

    fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&Receiver<'_>, &Event) -> Flow + 'static,
    {
        Self { func: Rc::new(f) }
    }

    /// `true` if both handles point at the same listener
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.func), Rc::as_ptr(&other.func))
    }

    pub(crate) fn call(&self, receiver: &Receiver<'_>, event: &Event) -> Flow {
        (self.func)(receiver, event)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Rc::as_ptr(&self.func) as *const ())
    }
}

/// The object a handler is bound to, compared by identity.
#[derive(Clone)]
pub struct Context {
    value: Rc<dyn Any>,
}

impl Context {
    /// Bind to a new value
    pub fn new<T: Any>(value: T) -> Self {
        Self {
            value: Rc::new(value),
        }
    }

    /// Bind to an existing shared value, keeping its identity
    pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
        Self {
            value: value as Rc<dyn Any>,
        }
    }

    pub(crate) fn from_dyn(value: Rc<dyn Any>) -> Self {
        Self { value }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// The hub this context stands for, if it was made with
    /// [`EventHub::as_context`].
    pub fn as_hub(&self) -> Option<EventHub> {
        EventHub::from_context(&self.value)
    }

    /// `true` if both contexts are the same object
    pub fn ptr_eq(&self, other: &Context) -> bool {
        self.addr() == other.addr()
    }

    pub(crate) fn addr(&self) -> *const () {
        Rc::as_ptr(&self.value) as *const ()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Context({:p})", self.addr())
    }
}

pub(crate) fn same_context(a: Option<&Context>, b: Option<&Context>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.ptr_eq(b),
        _ => false,
    }
}

/// What a handler is invoked against: its bound context, or the hub itself
/// when it was registered without one.
#[derive(Debug, Clone, Copy)]
pub enum Receiver<'a> {
    Hub(&'a EventHub),
    Context(&'a Context),
}

impl<'a> Receiver<'a> {
    /// The receiving hub, whether it was the default receiver or bound
    /// explicitly through [`EventHub::as_context`].
    pub fn as_hub(&self) -> Option<EventHub> {
        match *self {
            Receiver::Hub(hub) => Some(hub.clone()),
            Receiver::Context(context) => context.as_hub(),
        }
    }

    pub fn context(&self) -> Option<&'a Context> {
        match *self {
            Receiver::Hub(_) => None,
            Receiver::Context(context) => Some(context),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        match *self {
            Receiver::Hub(hub) => (hub as &dyn Any).downcast_ref::<T>(),
            Receiver::Context(context) => context.downcast_ref::<T>(),
        }
    }
}

/// Batch form of a registration: event type name to handler, in insertion
/// order. Keys are single type names and are not split on whitespace.
#[derive(Debug, Clone, Default)]
pub struct EventMap {
    entries: Vec<(String, Handler)>,
}

impl EventMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry, builder style
    pub fn with(mut self, event_type: impl Into<String>, handler: Handler) -> Self {
        self.insert(event_type, handler);
        self
    }

    /// Add an entry; a later entry for the same type replaces the earlier one
    pub fn insert(&mut self, event_type: impl Into<String>, handler: Handler) {
        let event_type = event_type.into();
        match self.entries.iter_mut().find(|(t, _)| *t == event_type) {
            Some(entry) => entry.1 = handler,
            None => self.entries.push((event_type, handler)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Handler)> {
        self.entries.iter().map(|(t, h)| (t.as_str(), h))
    }
}

/// One registration request, resolved from the public API shapes before it
/// reaches the hub's single registration routine.
pub(crate) enum Binding<'a> {
    Single {
        types: &'a str,
        handler: &'a Handler,
        context: Option<&'a Context>,
    },
    Batch {
        map: &'a EventMap,
        context: Option<&'a Context>,
    },
}

impl<'a> Binding<'a> {
    /// Flatten into normalized `(type, handler)` pairs plus the shared context
    pub(crate) fn resolve(self) -> (Vec<(String, &'a Handler)>, Option<&'a Context>) {
        match self {
            Binding::Single {
                types,
                handler,
                context,
            } => (
                split_types(types).map(|t| (t, handler)).collect(),
                context,
            ),
            Binding::Batch { map, context } => (
                map.entries
                    .iter()
                    .filter_map(|(t, h)| normalize_type(t).map(|t| (t, h)))
                    .collect(),
                context,
            ),
        }
    }
}

/// Lower-case a single type name; `None` when blank
pub(crate) fn normalize_type(event_type: &str) -> Option<String> {
    let trimmed = event_type.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

/// Split a space-separated list of type names
pub(crate) fn split_types(types: &str) -> impl Iterator<Item = String> + '_ {
    types.split_whitespace().map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flow_conversions() {
        assert_eq!(Flow::from(()), Flow::Continue);
        assert_eq!(Flow::from(true), Flow::Continue);
        assert_eq!(Flow::from(false), Flow::Stop);
    }

    #[test]
    fn test_handler_identity() {
        let a = Handler::new(|_, _| {});
        let b = Handler::new(|_, _| {});

        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn test_context_identity() {
        let shared = Rc::new(String::from("owner"));
        let a = Context::from_rc(shared.clone());
        let b = Context::from_rc(shared);
        let c = Context::new(String::from("owner"));

        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a.downcast_ref::<String>().map(String::as_str), Some("owner"));
        assert!(a.downcast_ref::<u32>().is_none());
        assert!(a.as_hub().is_none());
    }

    #[test]
    fn test_same_context() {
        let ctx = Context::new(1u8);

        assert!(same_context(None, None));
        assert!(same_context(Some(&ctx), Some(&ctx.clone())));
        assert!(!same_context(Some(&ctx), None));
        assert!(!same_context(None, Some(&ctx)));
    }

    #[test]
    fn test_receiver_downcast() {
        let hub = EventHub::new();
        let ctx = Context::new(42u32);

        assert!(Receiver::Hub(&hub).downcast_ref::<EventHub>().is_some());
        assert_eq!(Receiver::Hub(&hub).as_hub(), Some(hub.clone()));
        assert_eq!(Receiver::Context(&ctx).downcast_ref::<u32>(), Some(&42));
        assert!(Receiver::Context(&ctx).as_hub().is_none());
        assert!(Receiver::Hub(&hub).context().is_none());
    }

    #[test]
    fn test_split_types() {
        let types: Vec<String> = split_types("  Click  dblclick\tMOVE ").collect();
        assert_eq!(types, vec!["click", "dblclick", "move"]);
        assert_eq!(split_types("   ").count(), 0);
    }

    #[test]
    fn test_normalize_type() {
        assert_eq!(normalize_type(" Click "), Some("click".to_string()));
        assert_eq!(normalize_type(""), None);
    }

    #[test]
    fn test_event_map_insert_replaces() {
        let first = Handler::new(|_, _| {});
        let second = Handler::new(|_, _| {});
        let map = EventMap::new()
            .with("click", first)
            .with("move", Handler::new(|_, _| {}))
            .with("click", second.clone());

        assert_eq!(map.len(), 2);
        let (name, handler) = map.iter().next().unwrap();
        assert_eq!(name, "click");
        assert!(handler.ptr_eq(&second));
    }

    #[test]
    fn test_binding_resolve_batch_skips_blank_keys() {
        let map = EventMap::new()
            .with("Click", Handler::new(|_, _| {}))
            .with("  ", Handler::new(|_, _| {}));

        let (pairs, context) = Binding::Batch { map: &map, context: None }.resolve();

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "click");
        assert!(context.is_none());
    }
}
