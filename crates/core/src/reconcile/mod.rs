pub mod live;
pub mod reconciler;

pub use live::{LiveMatch, LiveMatchHandle, MatchSnapshot};
pub use reconciler::{ApplyOutcome, IgnoreReason, ReconcileError, Reconciler};
