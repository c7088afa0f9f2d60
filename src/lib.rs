// Eventable - observable objects for Rust
//
// This library re-exports the event hub crates under one name and offers a
// prelude for the common imports.

// Re-export the event hub
pub use eventable_events::*;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Context,
        Event,
        EventHub,
        EventHubBuilder,
        EventInit,
        EventMap,
        Flow,
        Handler,
        HubConfig,
        LocalSpawner,
        Observable,
        Receiver,
        TickQueue,
    };
}
