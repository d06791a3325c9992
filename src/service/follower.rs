//! Follower directory
//!
//! Tracks remote actors following a local actor. Follow and unfollow are
//! idempotent: the storage UNIQUE constraint on
//! (local actor, remote actor) decides whether a record is new.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use super::pager::{Page, PageCursor, clamp_limit, page_from_rows};
use crate::data::{Database, FollowerRecord, NewFollower};
use crate::error::AppError;
use crate::metrics;

/// Result of a follow notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FollowOutcome {
    /// `false` when the remote actor already followed
    pub created: bool,
}

/// Result of an unfollow notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnfollowOutcome {
    /// `false` when no record existed
    pub removed: bool,
}

/// Follower directory service
pub struct FollowerDirectory {
    db: Arc<Database>,
    max_page_size: u32,
}

impl FollowerDirectory {
    /// Create new follower directory
    ///
    /// # Arguments
    /// * `max_page_size` - Upper bound for `list_followers` limits
    pub fn new(db: Arc<Database>, max_page_size: u32) -> Self {
        Self { db, max_page_size }
    }

    async fn local_actor_id(&self, handle: &str) -> Result<String, AppError> {
        self.db
            .get_actor_by_handle(handle)
            .await?
            .map(|actor| actor.id)
            .ok_or(AppError::NotFound)
    }

    /// Record that `remote` follows the local actor `handle`.
    ///
    /// A second notification for the same remote actor is a no-op, even
    /// when its inbox or display name differ.
    pub async fn add_follower(
        &self,
        handle: &str,
        remote: NewFollower,
    ) -> Result<FollowOutcome, AppError> {
        remote.validate().map_err(AppError::Validation)?;
        let local_actor_id = self.local_actor_id(handle).await?;

        let created = self
            .db
            .insert_follower_if_absent(&local_actor_id, &remote, Utc::now())
            .await?;

        if created {
            metrics::observe_follow_event("created");
            tracing::info!(
                handle = %handle,
                follower = %remote.remote_actor_id,
                follow_activity = %remote.follow_activity_id,
                "Follower added"
            );
        } else {
            metrics::observe_follow_event("duplicate");
            tracing::debug!(
                handle = %handle,
                follower = %remote.remote_actor_id,
                "Duplicate follow ignored"
            );
        }

        Ok(FollowOutcome { created })
    }

    /// Remove `remote_actor_id` from the followers of `handle`
    pub async fn remove_follower(
        &self,
        handle: &str,
        remote_actor_id: &str,
    ) -> Result<UnfollowOutcome, AppError> {
        let local_actor_id = self.local_actor_id(handle).await?;
        let removed = self
            .db
            .delete_follower(&local_actor_id, remote_actor_id)
            .await?;

        if removed {
            metrics::observe_follow_event("removed");
            tracing::info!(handle = %handle, follower = %remote_actor_id, "Follower removed");
        } else {
            metrics::observe_follow_event("absent");
            tracing::debug!(
                handle = %handle,
                follower = %remote_actor_id,
                "Unfollow for unknown follower ignored"
            );
        }

        Ok(UnfollowOutcome { removed })
    }

    /// One page of followers in follow order
    ///
    /// # Arguments
    /// * `cursor` - `next_cursor` of the previous page, `None` for the first
    /// * `limit` - Requested page size, clamped to `1..=max_page_size`
    pub async fn list_followers(
        &self,
        handle: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<FollowerRecord>, AppError> {
        let after_seq = cursor.map(PageCursor::decode_follower).transpose()?;
        let local_actor_id = self.local_actor_id(handle).await?;
        let limit = clamp_limit(limit, self.max_page_size);

        let rows = self
            .db
            .list_followers_after(&local_actor_id, after_seq, limit as i64 + 1)
            .await?;

        Ok(page_from_rows(rows, limit, |follower| {
            PageCursor::Follower(follower.seq)
        }))
    }

    /// Number of followers of `handle`
    pub async fn count_followers(&self, handle: &str) -> Result<u64, AppError> {
        let local_actor_id = self.local_actor_id(handle).await?;
        let count = self.db.count_followers(&local_actor_id).await?;
        Ok(count.max(0) as u64)
    }

    /// Distinct inboxes to deliver to, in order of first follow.
    ///
    /// # Arguments
    /// * `prefer_shared` - Use a follower's shared inbox when it has one
    /// * `exclude` - Inboxes never returned (e.g. our own)
    pub async fn delivery_inboxes(
        &self,
        local_actor_id: &str,
        prefer_shared: bool,
        exclude: &[String],
    ) -> Result<Vec<String>, AppError> {
        let inboxes = self.db.get_follower_inboxes(local_actor_id).await?;
        Ok(unique_inbox_targets(
            inboxes
                .into_iter()
                .map(|(inbox, shared_inbox)| match shared_inbox {
                    Some(shared_inbox) if prefer_shared => shared_inbox,
                    _ => inbox,
                }),
            exclude,
        ))
    }
}

/// Deduplicate inbox URLs while keeping distinct personal inboxes.
fn unique_inbox_targets(inboxes: impl IntoIterator<Item = String>, exclude: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = exclude.iter().cloned().collect();
    let mut targets = Vec::new();

    for inbox in inboxes {
        if seen.insert(inbox.clone()) {
            targets.push(inbox);
        }
    }

    targets
}
