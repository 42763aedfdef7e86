//! Match event core: time segmentation of match events and an in-memory
//! event cache kept in sync with the `match_events` change feed.

pub mod analytics;
pub mod events;
pub mod model;
pub mod reconcile;
pub mod store;

pub use analytics::{aggregate_segments, segment_events_by_time, MatchStatistics, Segment, SegmentStats};
pub use events::{ChangeFeed, ChangeNotification};
pub use model::{EventType, MatchEvent, Team};
pub use reconcile::{LiveMatch, LiveMatchHandle, MatchSnapshot, Reconciler};
pub use store::{EventStore, MemoryEventStore, PgEventStore, SharedStore};
