pub mod session;

pub use session::{SharedSession, StreamingSession, SubscriptionId};
