//! Federation seam
//!
//! Handles:
//! - Capability traits the federation substrate calls (actors, keys,
//!   collections, follow effects, KV)
//! - Outbound delivery hand-off
//! - Mention and link rendering for outgoing posts

mod capability;
mod delivery;
mod directory;
mod mention;

pub use capability::{ActorLookup, FollowWrite, FollowerPage, KeyPairLookup, KvStore, PostPage};
pub use delivery::{
    ActivityDelivery, DeliveryJob, DeliveryRequest, DeliverySink, InProcessQueue, LogSink,
    Recipients, resolve_job, run_delivery_worker,
};
pub use directory::Directory;
pub use mention::{RenderedText, render_mentions};
