//! SQLite database operations
//!
//! All storage access goes through this module. The `Database` value is
//! constructed by the process bootstrap and injected into each service.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;

use super::models::*;
use crate::error::AppError;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

// Rows are decoded into flat structs first; JSON and enum columns are
// converted afterwards so malformed rows surface as errors instead of panics.

#[derive(sqlx::FromRow)]
struct ActorRow {
    id: String,
    handle: String,
    display_name: String,
    actor_type: String,
    summary: Option<String>,
    icon_media_type: Option<String>,
    icon_url: Option<String>,
    image_media_type: Option<String>,
    image_url: Option<String>,
    attachments: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ActorRow {
    fn into_actor(self) -> Result<Option<LocalActor>, AppError> {
        let Some(actor_type) = ActorType::parse(&self.actor_type) else {
            tracing::error!(
                handle = %self.handle,
                actor_type = %self.actor_type,
                "Unknown actor type, treating actor as absent"
            );
            return Ok(None);
        };

        let attachments = decode_json::<Vec<ProfileField>>("actors.attachments", &self.attachments)?;

        Ok(Some(LocalActor {
            id: self.id,
            handle: self.handle,
            display_name: self.display_name,
            actor_type,
            summary: self.summary,
            icon: media_ref(self.icon_media_type, self.icon_url),
            image: media_ref(self.image_media_type, self.image_url),
            attachments,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }))
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: String,
    local_actor_id: String,
    kind: String,
    raw_text: String,
    rendered_html: String,
    mentions: String,
    visibility: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<PostRow> for Post {
    type Error = AppError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let kind = PostKind::parse(&row.kind).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("unknown post kind {:?}", row.kind))
        })?;
        let visibility = Visibility::parse(&row.visibility).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("unknown visibility {:?}", row.visibility))
        })?;

        Ok(Post {
            mentions: decode_json("posts.mentions", &row.mentions)?,
            id: row.id,
            local_actor_id: row.local_actor_id,
            kind,
            raw_text: row.raw_text,
            rendered_html: row.rendered_html,
            visibility,
            created_at: row.created_at,
        })
    }
}

fn media_ref(media_type: Option<String>, url: Option<String>) -> Option<MediaRef> {
    match (media_type, url) {
        (Some(media_type), Some(url)) => Some(MediaRef { media_type, url }),
        _ => None,
    }
}

fn decode_json<T: serde::de::DeserializeOwned>(column: &str, raw: &str) -> Result<T, AppError> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to decode {column}: {e}")))
}

fn encode_json<T: serde::Serialize>(column: &str, value: &T) -> Result<String, AppError> {
    serde_json::to_string(value)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to encode {column}: {e}")))
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Close every pooled connection.
    ///
    /// Further queries fail with `AppError::Database`.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Database connection closed");
    }

    // =========================================================================
    // Actors
    // =========================================================================

    /// Insert a local actor unless the handle is already taken.
    ///
    /// # Returns
    /// `true` if inserted
    pub async fn insert_actor_if_absent(
        &self,
        actor: &LocalActor,
        key_pair: Option<&KeyPair>,
    ) -> Result<bool, AppError> {
        let attachments = encode_json("actors.attachments", &actor.attachments)?;

        let result = sqlx::query(
            r#"
            INSERT INTO actors (
                id, handle, display_name, actor_type, summary,
                icon_media_type, icon_url, image_media_type, image_url,
                attachments, private_key, public_key, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(handle) DO NOTHING
            "#,
        )
        .bind(&actor.id)
        .bind(&actor.handle)
        .bind(&actor.display_name)
        .bind(actor.actor_type.as_str())
        .bind(&actor.summary)
        .bind(actor.icon.as_ref().map(|icon| icon.media_type.as_str()))
        .bind(actor.icon.as_ref().map(|icon| icon.url.as_str()))
        .bind(actor.image.as_ref().map(|image| image.media_type.as_str()))
        .bind(actor.image.as_ref().map(|image| image.url.as_str()))
        .bind(attachments)
        .bind(key_pair.map(|keys| keys.private_key.as_str()))
        .bind(key_pair.map(|keys| keys.public_key.as_str()))
        .bind(actor.created_at)
        .bind(actor.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Get local actor by handle
    pub async fn get_actor_by_handle(&self, handle: &str) -> Result<Option<LocalActor>, AppError> {
        let row = sqlx::query_as::<_, ActorRow>(
            r#"
            SELECT id, handle, display_name, actor_type, summary,
                   icon_media_type, icon_url, image_media_type, image_url,
                   attachments, created_at, updated_at
            FROM actors WHERE handle = ?
            "#,
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_actor(),
            None => Ok(None),
        }
    }

    /// Get local actor by ID
    pub async fn get_actor(&self, id: &str) -> Result<Option<LocalActor>, AppError> {
        let row = sqlx::query_as::<_, ActorRow>(
            r#"
            SELECT id, handle, display_name, actor_type, summary,
                   icon_media_type, icon_url, image_media_type, image_url,
                   attachments, created_at, updated_at
            FROM actors WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => row.into_actor(),
            None => Ok(None),
        }
    }

    /// Get stored key material for a handle
    ///
    /// Returns `None` when the actor is unknown or has no keys yet.
    pub async fn get_key_pair(&self, handle: &str) -> Result<Option<KeyPair>, AppError> {
        let row = sqlx::query_as::<_, (Option<String>, Option<String>)>(
            "SELECT private_key, public_key FROM actors WHERE handle = ?",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;

        Ok(match row {
            Some((Some(private_key), Some(public_key))) => Some(KeyPair {
                private_key,
                public_key,
            }),
            _ => None,
        })
    }

    /// Replace the editable profile fields of an actor
    ///
    /// # Returns
    /// `true` if the actor exists
    pub async fn update_actor_profile(
        &self,
        id: &str,
        profile: &ActorProfile,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let attachments = encode_json("actors.attachments", &profile.attachments)?;

        let result = sqlx::query(
            r#"
            UPDATE actors SET
                display_name = ?, summary = ?,
                icon_media_type = ?, icon_url = ?,
                image_media_type = ?, image_url = ?,
                attachments = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&profile.display_name)
        .bind(&profile.summary)
        .bind(profile.icon.as_ref().map(|icon| icon.media_type.as_str()))
        .bind(profile.icon.as_ref().map(|icon| icon.url.as_str()))
        .bind(profile.image.as_ref().map(|image| image.media_type.as_str()))
        .bind(profile.image.as_ref().map(|image| image.url.as_str()))
        .bind(attachments)
        .bind(updated_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Count local actors
    pub async fn count_actors(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM actors")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Followers
    // =========================================================================

    /// Insert follower unless the remote actor already follows.
    ///
    /// The UNIQUE (local_actor_id, remote_actor_id) constraint makes this
    /// atomic across concurrent callers.
    ///
    /// # Returns
    /// `true` if a new record was created
    pub async fn insert_follower_if_absent(
        &self,
        local_actor_id: &str,
        follower: &NewFollower,
        created_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO followers (
                local_actor_id, remote_actor_id, remote_inbox_url, remote_shared_inbox_url,
                remote_handle, remote_display_name, remote_actor_type, remote_url,
                follow_activity_id, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(local_actor_id, remote_actor_id) DO NOTHING
            "#,
        )
        .bind(local_actor_id)
        .bind(&follower.remote_actor_id)
        .bind(&follower.inbox_url)
        .bind(&follower.shared_inbox_url)
        .bind(&follower.handle)
        .bind(&follower.display_name)
        .bind(&follower.actor_type)
        .bind(&follower.url)
        .bind(&follower.follow_activity_id)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete follower
    ///
    /// # Returns
    /// `true` if a record was removed
    pub async fn delete_follower(
        &self,
        local_actor_id: &str,
        remote_actor_id: &str,
    ) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM followers WHERE local_actor_id = ? AND remote_actor_id = ?")
                .bind(local_actor_id)
                .bind(remote_actor_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count followers of a local actor
    pub async fn count_followers(&self, local_actor_id: &str) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM followers WHERE local_actor_id = ?")
                .bind(local_actor_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Get followers in `seq` order
    ///
    /// # Arguments
    /// * `after_seq` - Return followers with a greater `seq` (exclusive)
    /// * `limit` - Maximum number of rows
    pub async fn list_followers_after(
        &self,
        local_actor_id: &str,
        after_seq: Option<i64>,
        limit: i64,
    ) -> Result<Vec<FollowerRecord>, AppError> {
        let followers = sqlx::query_as::<_, FollowerRecord>(
            r#"
            SELECT * FROM followers
            WHERE local_actor_id = ? AND seq > ?
            ORDER BY seq ASC
            LIMIT ?
            "#,
        )
        .bind(local_actor_id)
        .bind(after_seq.unwrap_or(0))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(followers)
    }

    /// Get (inbox, shared inbox) pairs of every follower, oldest first
    pub async fn get_follower_inboxes(
        &self,
        local_actor_id: &str,
    ) -> Result<Vec<(String, Option<String>)>, AppError> {
        let inboxes = sqlx::query_as::<_, (String, Option<String>)>(
            r#"
            SELECT remote_inbox_url, remote_shared_inbox_url FROM followers
            WHERE local_actor_id = ?
            ORDER BY seq ASC
            "#,
        )
        .bind(local_actor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(inboxes)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a new post
    pub async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        let mentions = encode_json("posts.mentions", &post.mentions)?;

        sqlx::query(
            r#"
            INSERT INTO posts (
                id, local_actor_id, kind, raw_text, rendered_html,
                mentions, visibility, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&post.id)
        .bind(&post.local_actor_id)
        .bind(post.kind.as_str())
        .bind(&post.raw_text)
        .bind(&post.rendered_html)
        .bind(mentions)
        .bind(post.visibility.as_str())
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get post by ID
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let row = sqlx::query_as::<_, PostRow>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Post::try_from).transpose()
    }

    /// Get an actor's posts in ascending ID order
    ///
    /// # Arguments
    /// * `after_id` - Return posts with a greater ID (exclusive)
    /// * `limit` - Maximum number of rows
    pub async fn list_posts_after(
        &self,
        local_actor_id: &str,
        after_id: Option<&str>,
        limit: i64,
    ) -> Result<Vec<Post>, AppError> {
        let rows = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT * FROM posts
            WHERE local_actor_id = ? AND id > ?
            ORDER BY id ASC
            LIMIT ?
            "#,
        )
        .bind(local_actor_id)
        .bind(after_id.unwrap_or(""))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Post::try_from).collect()
    }

    /// Count an actor's posts
    pub async fn count_posts(&self, local_actor_id: &str) -> Result<i64, AppError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE local_actor_id = ?")
                .bind(local_actor_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Count every local post
    pub async fn count_all_posts(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Key-value store
    // =========================================================================

    /// Get KV value
    pub async fn kv_get(&self, key: &str) -> Result<Option<serde_json::Value>, AppError> {
        let raw = sqlx::query_scalar::<_, String>("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        raw.map(|raw| decode_json("kv.value", &raw)).transpose()
    }

    /// Set KV value (upsert)
    pub async fn kv_set(&self, key: &str, value: &serde_json::Value) -> Result<(), AppError> {
        let raw = encode_json("kv.value", value)?;

        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(raw)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Delete KV value
    pub async fn kv_delete(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM kv WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
