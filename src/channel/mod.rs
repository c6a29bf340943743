//! Delivery primitives shared by the result channels

pub mod demand;
pub mod eventual;
pub mod fanout;

pub use demand::Demand;
pub use eventual::{eventual, Eventual, Resolver};
pub use fanout::{channel, channel_with_token, Fanout, Publisher, SendError, Subscription};
