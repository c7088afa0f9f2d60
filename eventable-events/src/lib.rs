//! Observable event hubs for Eventable
//!
//! This crate provides a single-threaded observer/event-emitter: register
//! listeners by event type, dispatch events to them, and forward events to
//! parent hubs.
//!
//! ## Features
//!
//! - **Event Hub** - Register, remove and dispatch listeners by event type
//! - **Once Listeners** - Listeners that remove themselves after one call
//! - **Propagation** - Fan events out to any number of parent hubs
//! - **Deferred Dispatch** - Deliver an event on the next scheduler tick
//! - **Reentrant** - Listeners may dispatch, register and unregister freely
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eventable_events::*;
//!
//! let hub = EventHub::new();
//!
//! let on_click = Handler::new(|_, event| {
//!     println!("clicked at {:?}", event.get("x"));
//! });
//!
//! hub.on("click dblclick", &on_click)
//!     .dispatch_with("click", EventInit::new().field("x", 10));
//! ```
//!
//! ## Contexts
//!
//! A handler is invoked against a [`Receiver`]: the context it was bound to,
//! or the hub itself.
//!
//! ```rust,ignore
//! let owner = Rc::new(Layer::new());
//! let ctx = Context::from_rc(owner.clone());
//!
//! hub.on_with("moved", &redraw, &ctx);
//! // removal must name the same handler and context
//! hub.un_with("moved", &redraw, &ctx);
//! ```
//!
//! ## Parents
//!
//! ```rust,ignore
//! let map = EventHub::new();
//! let marker = EventHub::new();
//!
//! marker.add_event_parent(&map);
//! map.on("click", &Handler::new(|_, event| {
//!     assert_eq!(event.propagated_from().map(EventHub::id), Some(marker_id));
//! }));
//!
//! // runs marker's listeners, then map's
//! marker.dispatch("click");
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! let queue = Rc::new(TickQueue::new());
//! let hub = EventHubBuilder::new()
//!     .propagate(false)          // Keep events local unless asked per dispatch
//!     .enable_logging(true)      // Log registrations and dispatches
//!     .scheduler(queue.clone())  // Drive deferred dispatch manually
//!     .build();
//!
//! hub.dispatch_deferred("ready", EventInit::new());
//! queue.run_pending();
//! ```
//!
//! Without an explicit scheduler, deferred dispatches are queued on the
//! thread's [`LocalSpawner`] and run while it is driven:
//!
//! ```rust,ignore
//! let hub = EventHub::new();
//! hub.dispatch_deferred("ready", EventInit::new());
//!
//! // "ready" is delivered while the spawner yields
//! LocalSpawner::current().run_until(tokio::task::yield_now()).await;
//! ```

pub mod error;
pub mod event;
pub mod handler;
pub mod hub;
pub mod observable;
pub mod options;
pub mod scheduler;

pub use error::{OptionsError, ScheduleError};
pub use event::{Event, EventInit, Payload, SourceEvent};
pub use handler::{Context, EventMap, Flow, Handler, Receiver};
pub use hub::{EventHub, EventHubBuilder, HubConfig, HubId, WeakEventHub};
pub use observable::Observable;
pub use options::Options;
pub use scheduler::{LocalSpawner, Scheduler, Task, TickQueue};
