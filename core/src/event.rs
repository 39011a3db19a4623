//! Domain event trait.
//!
//! Domain events are immutable facts about state transitions that already
//! happened (an item was completed, a list was deleted). Command handlers
//! create them immediately after a successful save and hand them to the
//! notification dispatcher, which routes each event to every handler
//! registered for its concrete type.
//!
//! # Example
//!
//! ```
//! use tidy_core::event::DomainEvent;
//!
//! #[derive(Clone, Debug)]
//! struct OrderShipped {
//!     order_id: u64,
//! }
//!
//! impl DomainEvent for OrderShipped {
//!     fn event_name(&self) -> &'static str {
//!         "OrderShipped"
//!     }
//! }
//!
//! let event = OrderShipped { order_id: 7 };
//! assert_eq!(event.event_name(), "OrderShipped");
//! ```

use std::any::Any;
use std::fmt;

/// An immutable record of a domain state transition.
///
/// The concrete type is the routing key: the dispatcher looks handlers up
/// by the event's [`TypeId`](std::any::TypeId), so two distinct event types
/// never share handlers even when they carry the same fields.
///
/// # Thread Safety
///
/// Events must be `Send + Sync + 'static` so a reference to them can be held
/// across handler awaits inside a request task.
pub trait DomainEvent: Any + Send + Sync + fmt::Debug {
    /// Stable, human-readable name of the event, used in logs and errors.
    fn event_name(&self) -> &'static str;
}
