//! The directory as seen by the federation substrate
//!
//! One value implementing every capability trait over the services.

use std::sync::Arc;

use async_trait::async_trait;

use super::capability::{ActorLookup, FollowWrite, FollowerPage, KeyPairLookup, KvStore, PostPage};
use crate::data::{FollowerRecord, KeyPair, LocalActor, NewFollower, Post};
use crate::error::AppError;
use crate::service::{
    ActivityStore, ActorService, FollowOutcome, FollowerDirectory, KvCache, Page, UnfollowOutcome,
};

/// Relationship & feed directory
#[derive(Clone)]
pub struct Directory {
    actors: Arc<ActorService>,
    followers: Arc<FollowerDirectory>,
    posts: Arc<ActivityStore>,
    kv: Arc<KvCache>,
    /// Collection window size for substrate requests
    page_size: u32,
}

impl Directory {
    pub fn new(
        actors: Arc<ActorService>,
        followers: Arc<FollowerDirectory>,
        posts: Arc<ActivityStore>,
        kv: Arc<KvCache>,
        page_size: u32,
    ) -> Self {
        Self {
            actors,
            followers,
            posts,
            kv,
            page_size,
        }
    }
}

#[async_trait]
impl ActorLookup for Directory {
    async fn actor(&self, handle: &str) -> Result<Option<LocalActor>, AppError> {
        self.actors.find(handle).await
    }
}

#[async_trait]
impl KeyPairLookup for Directory {
    async fn key_pair(&self, handle: &str) -> Result<Option<KeyPair>, AppError> {
        self.actors.key_pair(handle).await
    }
}

#[async_trait]
impl PostPage for Directory {
    async fn outbox_page(&self, handle: &str, cursor: Option<&str>) -> Result<Page<Post>, AppError> {
        let actor = self.actors.require(handle).await?;
        self.posts.list_by_actor(&actor.id, cursor, self.page_size).await
    }

    async fn post_count(&self, handle: &str) -> Result<u64, AppError> {
        let actor = self.actors.require(handle).await?;
        self.posts.count_by_actor(&actor.id).await
    }

    async fn note(&self, handle: &str, id: &str) -> Result<Option<Post>, AppError> {
        match self.posts.get_for_actor(handle, id).await {
            Ok(post) => Ok(Some(post)),
            Err(AppError::NotFound) => Ok(None),
            Err(error) => Err(error),
        }
    }
}

#[async_trait]
impl FollowerPage for Directory {
    async fn followers_page(
        &self,
        handle: &str,
        cursor: Option<&str>,
    ) -> Result<Page<FollowerRecord>, AppError> {
        self.followers.list_followers(handle, cursor, self.page_size).await
    }

    async fn follower_count(&self, handle: &str) -> Result<u64, AppError> {
        self.followers.count_followers(handle).await
    }
}

#[async_trait]
impl FollowWrite for Directory {
    async fn follow(&self, handle: &str, follower: NewFollower) -> Result<FollowOutcome, AppError> {
        self.followers.add_follower(handle, follower).await
    }

    async fn unfollow(
        &self,
        handle: &str,
        remote_actor_id: &str,
    ) -> Result<UnfollowOutcome, AppError> {
        self.followers.remove_follower(handle, remote_actor_id).await
    }
}

#[async_trait]
impl KvStore for Directory {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>, AppError> {
        self.kv.get(key).await
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<(), AppError> {
        self.kv.set(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.kv.delete(key).await
    }
}
