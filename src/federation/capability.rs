//! Capabilities the federation substrate calls into
//!
//! The substrate (signature checks, Accept replies, JSON-LD shaping) owns
//! the wire protocol. It reaches the directory only through these traits,
//! so it can be swapped or faked without touching storage.

use async_trait::async_trait;

use crate::data::{FollowerRecord, KeyPair, LocalActor, NewFollower, Post};
use crate::error::AppError;
use crate::service::{FollowOutcome, Page, UnfollowOutcome};

/// Actor dispatcher
#[async_trait]
pub trait ActorLookup: Send + Sync {
    /// `None` for unknown handles
    async fn actor(&self, handle: &str) -> Result<Option<LocalActor>, AppError>;
}

/// Key pairs dispatcher
#[async_trait]
pub trait KeyPairLookup: Send + Sync {
    async fn key_pair(&self, handle: &str) -> Result<Option<KeyPair>, AppError>;
}

/// Outbox collection and individual notes
#[async_trait]
pub trait PostPage: Send + Sync {
    async fn outbox_page(&self, handle: &str, cursor: Option<&str>) -> Result<Page<Post>, AppError>;

    async fn post_count(&self, handle: &str) -> Result<u64, AppError>;

    /// A single post, only if `handle` authored it
    async fn note(&self, handle: &str, id: &str) -> Result<Option<Post>, AppError>;
}

/// Followers collection
#[async_trait]
pub trait FollowerPage: Send + Sync {
    async fn followers_page(
        &self,
        handle: &str,
        cursor: Option<&str>,
    ) -> Result<Page<FollowerRecord>, AppError>;

    async fn follower_count(&self, handle: &str) -> Result<u64, AppError>;
}

/// Inbox Follow / Undo(Follow) effects
#[async_trait]
pub trait FollowWrite: Send + Sync {
    /// Called for a verified Follow; the substrate sends Accept afterwards
    /// whether or not the record is new.
    async fn follow(&self, handle: &str, follower: NewFollower) -> Result<FollowOutcome, AppError>;

    async fn unfollow(
        &self,
        handle: &str,
        remote_actor_id: &str,
    ) -> Result<UnfollowOutcome, AppError>;
}

/// Substrate bookkeeping storage
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, AppError>;

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}
