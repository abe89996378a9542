//! Event types for the BreedVision event system
//!
//! Provides the shared event definitions and the EventBus used by the auth,
//! analysis and locale state machines.

mod analysis_types;
mod auth_types;

pub use analysis_types::{AnalysisErrorKind, JobStatus};
pub use auth_types::{AuthDialogMode, AuthErrorKind, AuthStatus};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// BreedVision event types
///
/// All three state machines publish on one bus, so every subscriber sees
/// transitions across machines in the order they happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BreedVisionEvent {
    /// Auth session status changed
    ///
    /// Triggers:
    /// - UI gate: recompute upload permission and gate message
    /// - Header: show or hide the signed-in user
    AuthStatusChanged {
        /// Status before change
        old_status: AuthStatus,
        /// Status after change
        new_status: AuthStatus,
        /// Signed-in user, present only when `new_status` is `SignedIn`
        user_id: Option<String>,
        /// Rejection reason, present only when `new_status` is `AuthError`
        error: Option<AuthErrorKind>,
        /// When status changed
        timestamp: DateTime<Utc>,
    },

    /// Authentication dialog opened, switched mode, or closed (`mode: None`)
    AuthDialogChanged {
        mode: Option<AuthDialogMode>,
        timestamp: DateTime<Utc>,
    },

    /// Analysis job status changed
    ///
    /// `old_status` is `None` when the job was just created from `Idle`.
    JobStatusChanged {
        job_id: Uuid,
        image_handle_id: Uuid,
        old_status: Option<JobStatus>,
        new_status: JobStatus,
        /// Failure or cancellation reason, present for `Failed` and `Cancelled`
        error: Option<AnalysisErrorKind>,
        timestamp: DateTime<Utc>,
    },

    /// Terminal job released, orchestrator back to `Idle`
    JobReleased {
        job_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Active locale changed (or was re-selected)
    LocaleChanged {
        old_code: String,
        new_code: String,
        timestamp: DateTime<Utc>,
    },
}

impl BreedVisionEvent {
    /// Get event type as string for filtering
    pub fn event_type(&self) -> &str {
        match self {
            BreedVisionEvent::AuthStatusChanged { .. } => "AuthStatusChanged",
            BreedVisionEvent::AuthDialogChanged { .. } => "AuthDialogChanged",
            BreedVisionEvent::JobStatusChanged { .. } => "JobStatusChanged",
            BreedVisionEvent::JobReleased { .. } => "JobReleased",
            BreedVisionEvent::LocaleChanged { .. } => "LocaleChanged",
        }
    }
}

/// Central event distribution bus
///
/// The EventBus uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged message detection for slow subscribers
///
/// A subscriber that falls more than `capacity` events behind receives
/// `RecvError::Lagged`; size the capacity so that never happens in practice.
///
/// # Examples
///
/// ```
/// use breedvision_common::events::{BreedVisionEvent, EventBus};
///
/// let event_bus = EventBus::new(16);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(BreedVisionEvent::LocaleChanged {
///     old_code: "en".to_string(),
///     new_code: "hi".to_string(),
///     timestamp: chrono::Utc::now(),
/// });
///
/// let event = rx.try_recv().unwrap();
/// assert_eq!(event.event_type(), "LocaleChanged");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<BreedVisionEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<BreedVisionEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: BreedVisionEvent,
    ) -> Result<usize, broadcast::error::SendError<BreedVisionEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// State machines always publish this way: having no observer is not an
    /// error for the publisher.
    pub fn emit_lossy(&self, event: BreedVisionEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.tx.receiver_count())
            .finish()
    }
}
