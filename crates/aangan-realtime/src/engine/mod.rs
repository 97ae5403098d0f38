//! Publish/subscribe engine combining channel history and subscriber fan-out.

mod dispatch;
pub mod pubsub;
pub mod subscription;

pub use pubsub::{PubSubEngine, PublishReport, SubscribeOptions};
pub use subscription::Subscription;
