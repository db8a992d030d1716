use chrono::{DateTime, Utc};

/// A domain-agnostic notification about something that already happened.
///
/// Events are:
/// - **immutable** facts
/// - **versioned** (schema evolution)
/// - published **after** the state change they describe has been committed
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name/type identifier (e.g. "inventory.stock.changed").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// Key of the record the event is about (e.g. `"stock/A/L1"`).
    ///
    /// Subscribers use it to route or partition notifications.
    fn subject(&self) -> String;
}
