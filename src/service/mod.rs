//! Service layer
//!
//! Contains the directory's business logic, separated from HTTP handlers
//! and from the federation substrate. Services share one injected
//! `Database`.

mod actor;
mod follower;
mod kv;
mod pager;
mod post;
mod publisher;

pub use actor::ActorService;
pub use follower::{FollowOutcome, FollowerDirectory, UnfollowOutcome};
pub use kv::KvCache;
pub use pager::{Page, PageCursor, clamp_limit};
pub use post::ActivityStore;
pub use publisher::{PublishReceipt, Publisher};
