pub mod bus;
pub mod listener;
pub mod types;

pub use bus::{ChangeFeed, FeedEvent, Subscription};
pub use listener::{FeedError, PgChangeListener};
pub use types::{ChangeNotification, ChangePayload};
