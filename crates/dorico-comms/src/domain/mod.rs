//! Domain layer: pure bookkeeping, no I/O.

pub mod queue;
pub mod reply;
pub mod state;
pub mod status;

pub use queue::{Attribution, CorrelationQueue, PendingHandle, QueueStats};
pub use reply::{AbortReason, Reply};
pub use state::ConnectionState;
pub use status::StatusCache;
