//! Activity store
//!
//! The local actor's own posts. `publish` is the only write path; posts
//! are never edited or deleted.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::pager::{Page, PageCursor, clamp_limit, page_from_rows};
use crate::data::{Database, Post, PostKind, Visibility};
use crate::error::AppError;
use crate::federation::render_mentions;

/// Activity store service
pub struct ActivityStore {
    db: Arc<Database>,
    /// Monotonic within the process so ids sort in publish order
    ids: Mutex<ulid::Generator>,
    max_post_chars: usize,
    max_page_size: u32,
}

impl ActivityStore {
    /// Create new activity store
    pub fn new(db: Arc<Database>, max_post_chars: usize, max_page_size: u32) -> Self {
        Self {
            db,
            ids: Mutex::new(ulid::Generator::new()),
            max_post_chars,
            max_page_size,
        }
    }

    fn next_id(&self) -> Result<String, AppError> {
        let mut generator = self
            .ids
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("post id generator poisoned")))?;
        let id = generator
            .generate()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("post id generation failed: {e:?}")))?;
        Ok(id.to_string())
    }

    /// Render and store a new post
    ///
    /// # Arguments
    /// * `local_actor_id` - Author
    /// * `raw_text` - Plain text; mentions and URLs become links
    /// * `kind` - Object type carried in the activity
    ///
    /// # Errors
    /// `Validation` for empty or oversized text, `NotFound` for an unknown author
    pub async fn publish(
        &self,
        local_actor_id: &str,
        raw_text: &str,
        kind: PostKind,
    ) -> Result<Post, AppError> {
        if raw_text.trim().is_empty() {
            return Err(AppError::Validation("post text cannot be empty".to_string()));
        }
        let chars = raw_text.chars().count();
        if chars > self.max_post_chars {
            return Err(AppError::Validation(format!(
                "post text is {chars} characters, limit is {}",
                self.max_post_chars
            )));
        }

        if self.db.get_actor(local_actor_id).await?.is_none() {
            return Err(AppError::NotFound);
        }

        let rendered = render_mentions(raw_text);
        let post = Post {
            id: self.next_id()?,
            local_actor_id: local_actor_id.to_string(),
            kind,
            raw_text: raw_text.to_string(),
            rendered_html: rendered.html,
            mentions: rendered.mentions,
            visibility: Visibility::Public,
            created_at: Utc::now(),
        };

        self.db.insert_post(&post).await?;
        crate::metrics::POSTS_PUBLISHED_TOTAL.inc();
        tracing::info!(
            post_id = %post.id,
            kind = post.kind.as_str(),
            mentions = post.mentions.len(),
            "Post stored"
        );

        Ok(post)
    }

    /// Get post by ID
    pub async fn get(&self, id: &str) -> Result<Post, AppError> {
        self.db.get_post(id).await?.ok_or(AppError::NotFound)
    }

    /// Get a post only if it belongs to the actor `handle`
    pub async fn get_for_actor(&self, handle: &str, id: &str) -> Result<Post, AppError> {
        let actor = self
            .db
            .get_actor_by_handle(handle)
            .await?
            .ok_or(AppError::NotFound)?;
        let post = self.get(id).await?;
        if post.local_actor_id != actor.id {
            return Err(AppError::NotFound);
        }
        Ok(post)
    }

    /// One page of an actor's posts, oldest first
    pub async fn list_by_actor(
        &self,
        local_actor_id: &str,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<Page<Post>, AppError> {
        let after_id = cursor.map(PageCursor::decode_post).transpose()?;
        let limit = clamp_limit(limit, self.max_page_size);

        let rows = self
            .db
            .list_posts_after(local_actor_id, after_id.as_deref(), limit as i64 + 1)
            .await?;

        Ok(page_from_rows(rows, limit, |post| PageCursor::Post(post.id.clone())))
    }

    pub async fn count_by_actor(&self, local_actor_id: &str) -> Result<u64, AppError> {
        let count = self.db.count_posts(local_actor_id).await?;
        Ok(count.max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ActorType, EntityId, LocalActor};
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use tempfile::TempDir;

    async fn setup(max_post_chars: usize) -> (ActivityStore, String, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();

        let actor = LocalActor {
            id: EntityId::new().0,
            handle: "fresh7at7".to_string(),
            display_name: "Podcast Performance".to_string(),
            actor_type: ActorType::Person,
            summary: None,
            icon: None,
            image: None,
            attachments: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        db.insert_actor_if_absent(&actor, None).await.unwrap();

        (
            ActivityStore::new(Arc::new(db), max_post_chars, 100),
            actor.id,
            temp_dir,
        )
    }

    #[tokio::test]
    async fn publish_then_fetch() {
        let (store, actor_id, _temp_dir) = setup(5000).await;

        let post = store
            .publish(&actor_id, "hello @alice@example.com", PostKind::Note)
            .await
            .unwrap();
        let fetched = store.get(&post.id).await.unwrap();

        assert_eq!(fetched.raw_text, "hello @alice@example.com");
        assert_eq!(fetched.rendered_html, post.rendered_html);
        assert_eq!(fetched.mentions.len(), 1);
        assert_eq!(fetched.mentions[0].handle(), "alice@example.com");
        assert_eq!(store.count_by_actor(&actor_id).await.unwrap(), 1);

        let first_page = store.list_by_actor(&actor_id, None, 10).await.unwrap();
        assert_eq!(first_page.items[0].id, post.id);
    }

    #[tokio::test]
    async fn ids_increase_in_publish_order() {
        let (store, actor_id, _temp_dir) = setup(5000).await;

        let mut ids = Vec::new();
        for i in 0..5 {
            let post = store
                .publish(&actor_id, &format!("episode {i}"), PostKind::Article)
                .await
                .unwrap();
            ids.push(post.id);
        }

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);

        let page = store.list_by_actor(&actor_id, None, 10).await.unwrap();
        let listed: Vec<_> = page.items.iter().map(|p| p.id.clone()).collect();
        assert_eq!(listed, ids);
        assert!(page.items.iter().all(|p| p.kind == PostKind::Article));
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_text() {
        let (store, actor_id, _temp_dir) = setup(10).await;

        assert!(matches!(
            store.publish(&actor_id, "   \n", PostKind::Note).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            store.publish(&actor_id, "eleven char", PostKind::Note).await,
            Err(AppError::Validation(_))
        ));
        // Limit counts characters, not bytes
        assert!(store.publish(&actor_id, "ポッドキャスト", PostKind::Note).await.is_ok());
        assert_eq!(store.count_by_actor(&actor_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let (store, actor_id, _temp_dir) = setup(5000).await;
        let post = store.publish(&actor_id, "hi", PostKind::Note).await.unwrap();

        assert!(matches!(store.get("missing").await, Err(AppError::NotFound)));
        assert!(matches!(
            store.publish("missing", "hi", PostKind::Note).await,
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            store.get_for_actor("nobody", &post.id).await,
            Err(AppError::NotFound)
        ));
        assert_eq!(store.get_for_actor("fresh7at7", &post.id).await.unwrap().id, post.id);
    }

    #[tokio::test]
    async fn paging_posts_reaches_last_page() {
        let (store, actor_id, _temp_dir) = setup(5000).await;
        for i in 0..25 {
            store
                .publish(&actor_id, &format!("post {i}"), PostKind::Note)
                .await
                .unwrap();
        }

        let mut sizes = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = store
                .list_by_actor(&actor_id, cursor.as_deref(), 10)
                .await
                .unwrap();
            sizes.push(page.items.len());
            if page.is_last {
                break;
            }
            cursor = page.next_cursor;
        }
        assert_eq!(sizes, vec![10, 10, 5]);
    }

    #[tokio::test]
    async fn follower_cursor_is_rejected_for_posts() {
        let (store, actor_id, _temp_dir) = setup(5000).await;
        let token = PageCursor::Follower(1).encode();

        assert!(matches!(
            store.list_by_actor(&actor_id, Some(&token), 10).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn lowercase_post_cursor_continues_paging() {
        let (store, actor_id, _temp_dir) = setup(5000).await;
        let mut ids = Vec::new();
        for i in 0..3 {
            let post = store
                .publish(&actor_id, &format!("post {i}"), PostKind::Note)
                .await
                .unwrap();
            ids.push(post.id);
        }

        let token = URL_SAFE_NO_PAD.encode(format!("post:{}", ids[0].to_lowercase()));
        let page = store.list_by_actor(&actor_id, Some(&token), 10).await.unwrap();

        let listed: Vec<_> = page.items.iter().map(|p| p.id.clone()).collect();
        assert_eq!(listed, ids[1..].to_vec());
        assert!(page.is_last);
    }
}
