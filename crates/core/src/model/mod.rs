pub mod event;
pub mod record;

pub use event::{Coordinates, EventType, MatchEvent, Team};
pub use record::EventRecord;
