//! # Event Bus Module
//!
//! Publish/subscribe channel for controller events.
//!
//! - The controller task publishes typed events without knowing who listens
//! - Async consumers read a `broadcast::Receiver`
//! - Sync consumers register a filtered callback
//!
//! ## Usage
//!
//! ```rust,ignore
//! use grbllink_core::event_bus::{ControllerEvent, EventCategory, EventFilter};
//!
//! let subscription = handle.events().subscribe(
//!     EventFilter::Categories(vec![EventCategory::Fault]),
//!     |event| tracing::warn!("{}", event.description()),
//! );
//!
//! handle.events().unsubscribe(subscription);
//! ```

mod bus;
mod events;

pub use bus::*;
pub use events::*;
