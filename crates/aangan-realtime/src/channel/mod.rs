//! Channel primitives: history storage, subscriber registry, naming.

pub mod history;
pub mod registry;
pub mod store;
pub mod subscription;
pub mod types;

pub use registry::{FanOutReport, SubscriptionRegistry};
pub use store::ChannelStore;
pub use subscription::{Callback, DeliveryError, SubscriptionHandle, SubscriptionId};
pub use types::{ChannelType, GLOBAL_FEED_CHANNEL, zone_channel};
