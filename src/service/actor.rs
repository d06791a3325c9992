//! Actor service
//!
//! Lookup and provisioning of the local actors this server speaks for.

use std::sync::Arc;

use chrono::Utc;

use crate::data::{ActorProfile, Database, EntityId, KeyPair, LocalActor, NewLocalActor};
use crate::error::AppError;

/// Actor service
pub struct ActorService {
    db: Arc<Database>,
}

impl ActorService {
    /// Create new actor service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Look up a local actor by handle
    pub async fn find(&self, handle: &str) -> Result<Option<LocalActor>, AppError> {
        self.db.get_actor_by_handle(handle).await
    }

    /// Look up a local actor by handle, failing with `NotFound`
    pub async fn require(&self, handle: &str) -> Result<LocalActor, AppError> {
        self.find(handle).await?.ok_or(AppError::NotFound)
    }

    /// Stored key material for a handle
    pub async fn key_pair(&self, handle: &str) -> Result<Option<KeyPair>, AppError> {
        self.db.get_key_pair(handle).await
    }

    /// Create the actor unless the handle already exists.
    ///
    /// An existing actor is returned untouched; provisioning never
    /// overwrites profile edits or keys.
    ///
    /// # Returns
    /// The stored actor and whether it was created by this call
    pub async fn provision(&self, new_actor: NewLocalActor) -> Result<(LocalActor, bool), AppError> {
        let handle = new_actor.handle.trim();
        if handle.is_empty() {
            return Err(AppError::Validation("actor handle cannot be empty".to_string()));
        }
        if !handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(AppError::Validation(format!(
                "actor handle {handle:?} may only contain letters, digits and underscores"
            )));
        }

        let now = Utc::now();
        let profile = new_actor.profile;
        let actor = LocalActor {
            id: EntityId::new().0,
            handle: handle.to_string(),
            display_name: profile.display_name,
            actor_type: new_actor.actor_type,
            summary: profile.summary,
            icon: profile.icon,
            image: profile.image,
            attachments: profile.attachments,
            created_at: now,
            updated_at: now,
        };

        let created = self
            .db
            .insert_actor_if_absent(&actor, new_actor.key_pair.as_ref())
            .await?;

        let stored = self.require(handle).await?;
        if created {
            tracing::info!(
                handle = %stored.handle,
                actor_type = stored.actor_type.as_str(),
                "Local actor provisioned"
            );
        }

        Ok((stored, created))
    }

    /// Replace the editable profile of a local actor
    pub async fn update_profile(
        &self,
        handle: &str,
        profile: ActorProfile,
    ) -> Result<LocalActor, AppError> {
        if profile.display_name.trim().is_empty() {
            return Err(AppError::Validation("display name cannot be empty".to_string()));
        }

        let actor = self.require(handle).await?;
        if !self
            .db
            .update_actor_profile(&actor.id, &profile, Utc::now())
            .await?
        {
            return Err(AppError::NotFound);
        }

        tracing::info!(handle = %handle, "Actor profile updated");
        self.require(handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ActorType, ProfileField};
    use tempfile::TempDir;

    async fn setup() -> (ActorService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::connect(&temp_dir.path().join("test.db"))
            .await
            .unwrap();
        (ActorService::new(Arc::new(db)), temp_dir)
    }

    fn new_actor(handle: &str) -> NewLocalActor {
        NewLocalActor {
            handle: handle.to_string(),
            actor_type: ActorType::Group,
            profile: ActorProfile {
                display_name: "Podcast Performance".to_string(),
                ..Default::default()
            },
            key_pair: Some(KeyPair {
                private_key: "private".to_string(),
                public_key: "public".to_string(),
            }),
        }
    }

    #[tokio::test]
    async fn provision_is_idempotent() {
        let (service, _temp_dir) = setup().await;

        let (first, created) = service.provision(new_actor("fresh7at7")).await.unwrap();
        assert!(created);
        assert_eq!(first.summary_or_default(), "This is a group!");

        let mut again = new_actor("fresh7at7");
        again.profile.display_name = "Changed".to_string();
        let (second, created) = service.provision(again).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.display_name, "Podcast Performance");
    }

    #[tokio::test]
    async fn provision_rejects_bad_handles() {
        let (service, _temp_dir) = setup().await;

        assert!(matches!(
            service.provision(new_actor("  ")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.provision(new_actor("a/b")).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn require_unknown_handle_is_not_found() {
        let (service, _temp_dir) = setup().await;

        assert!(service.find("nobody").await.unwrap().is_none());
        assert!(matches!(
            service.require("nobody").await,
            Err(AppError::NotFound)
        ));
        assert!(service.key_pair("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_profile_replaces_fields() {
        let (service, _temp_dir) = setup().await;
        service.provision(new_actor("fresh7at7")).await.unwrap();

        let updated = service
            .update_profile(
                "fresh7at7",
                ActorProfile {
                    display_name: "Live Tonight".to_string(),
                    summary: Some("Weekly show".to_string()),
                    attachments: vec![ProfileField {
                        name: "Website".to_string(),
                        value: "https://podcastperformance.com/".to_string(),
                    }],
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.display_name, "Live Tonight");
        assert_eq!(updated.summary_or_default(), "Weekly show");
        assert_eq!(updated.attachments.len(), 1);

        assert!(matches!(
            service
                .update_profile("nobody", ActorProfile {
                    display_name: "x".to_string(),
                    ..Default::default()
                })
                .await,
            Err(AppError::NotFound)
        ));
    }
}
