pub mod broadcast;
pub mod message;
pub mod registry;
pub mod topic;

pub use broadcast::{Broadcaster, Delivery};
pub use registry::{Subscribed, TopicRegistry, TopicStatus};
