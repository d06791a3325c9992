//! Publisher
//!
//! Stores a new post for a local actor and hands the resulting `Create`
//! activity to the delivery seam, addressed to the actor's followers.

use std::sync::Arc;

use serde::Serialize;

use super::{ActivityStore, ActorService};
use crate::data::{Post, PostKind};
use crate::error::AppError;
use crate::federation::{ActivityDelivery, DeliveryRequest, Recipients};
use crate::metrics;

/// What a successful publish produced
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishReceipt {
    pub activity_id: String,
    pub object_id: String,
    pub post: Post,
}

/// Publisher service
pub struct Publisher {
    actors: Arc<ActorService>,
    posts: Arc<ActivityStore>,
    delivery: Arc<dyn ActivityDelivery>,
    base_url: String,
}

impl Publisher {
    /// Create new publisher
    pub fn new(
        actors: Arc<ActorService>,
        posts: Arc<ActivityStore>,
        delivery: Arc<dyn ActivityDelivery>,
        base_url: String,
    ) -> Self {
        Self {
            actors,
            posts,
            delivery,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Publish `text` as `handle`
    ///
    /// # Side Effects
    /// - Inserts the post
    /// - Enqueues a delivery to every follower, skipping our own inbox
    ///
    /// # Errors
    /// `NotFound` for an unknown handle. `Delivery` when the queue refuses
    /// the request; the post is already stored at that point.
    pub async fn publish(
        &self,
        handle: &str,
        text: &str,
        kind: PostKind,
    ) -> Result<PublishReceipt, AppError> {
        let actor = self.actors.require(handle).await?;
        let post = self.posts.publish(&actor.id, text, kind).await?;

        let activity_id = format!("{}/posts/{}#activity", self.base_url, post.id);
        let object_id = format!("{}/users/{}/notes/{}", self.base_url, actor.handle, post.id);
        let request = DeliveryRequest {
            sender_handle: actor.handle.clone(),
            sender_actor_id: actor.id.clone(),
            activity_id: activity_id.clone(),
            object_id: object_id.clone(),
            followers_uri: format!("{}/users/{}/followers", self.base_url, actor.handle),
            post: post.clone(),
            recipients: Recipients::Followers,
            exclude_inboxes: vec![format!("{}/inbox", self.base_url)],
            prefer_shared_inbox: true,
            immediate: true,
        };

        if let Err(error) = self.delivery.enqueue(request).await {
            metrics::observe_delivery("failed");
            tracing::error!(
                activity = %activity_id,
                sender = %actor.handle,
                %error,
                "Failed to enqueue outbound activity"
            );
            return Err(error);
        }

        metrics::observe_delivery("enqueued");
        tracing::info!(activity = %activity_id, sender = %actor.handle, "Post published");

        Ok(PublishReceipt {
            activity_id,
            object_id,
            post,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ActorProfile, ActorType, Database, NewLocalActor};
    use crate::federation::InProcessQueue;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records requests instead of delivering them
    #[derive(Default)]
    struct RecordingDelivery {
        requests: Mutex<Vec<DeliveryRequest>>,
    }

    #[async_trait]
    impl ActivityDelivery for RecordingDelivery {
        async fn enqueue(&self, request: DeliveryRequest) -> Result<(), AppError> {
            self.requests.lock().unwrap().push(request);
            Ok(())
        }
    }

    async fn setup(
        delivery: Arc<dyn ActivityDelivery>,
    ) -> (Publisher, Arc<ActivityStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db = Arc::new(
            Database::connect(&temp_dir.path().join("test.db"))
                .await
                .unwrap(),
        );
        let actors = Arc::new(ActorService::new(db.clone()));
        actors
            .provision(NewLocalActor {
                handle: "fresh7at7".to_string(),
                actor_type: ActorType::Person,
                profile: ActorProfile {
                    display_name: "Podcast Performance".to_string(),
                    ..Default::default()
                },
                key_pair: None,
            })
            .await
            .unwrap();
        let posts = Arc::new(ActivityStore::new(db, 5000, 100));
        let publisher = Publisher::new(
            actors,
            posts.clone(),
            delivery,
            "https://pod.example/".to_string(),
        );
        (publisher, posts, temp_dir)
    }

    #[tokio::test]
    async fn publish_enqueues_followers_delivery() {
        let delivery = Arc::new(RecordingDelivery::default());
        let (publisher, posts, _temp_dir) = setup(delivery.clone()).await;

        let receipt = publisher
            .publish("fresh7at7", "new episode with @host@radio.example", PostKind::Note)
            .await
            .unwrap();

        assert_eq!(
            receipt.activity_id,
            format!("https://pod.example/posts/{}#activity", receipt.post.id)
        );
        assert_eq!(
            receipt.object_id,
            format!("https://pod.example/users/fresh7at7/notes/{}", receipt.post.id)
        );
        assert_eq!(posts.get(&receipt.post.id).await.unwrap().mentions.len(), 1);

        let requests = delivery.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.recipients, Recipients::Followers);
        assert_eq!(request.exclude_inboxes, vec!["https://pod.example/inbox".to_string()]);
        assert_eq!(request.followers_uri, "https://pod.example/users/fresh7at7/followers");
        assert!(request.prefer_shared_inbox);
        assert!(request.immediate);
    }

    #[tokio::test]
    async fn unknown_sender_is_not_found() {
        let delivery = Arc::new(RecordingDelivery::default());
        let (publisher, _posts, _temp_dir) = setup(delivery.clone()).await;

        assert!(matches!(
            publisher.publish("nobody", "hi", PostKind::Note).await,
            Err(AppError::NotFound)
        ));
        assert!(delivery.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn enqueue_failure_keeps_post() {
        let (queue, receiver) = InProcessQueue::new(1);
        drop(receiver);
        let (publisher, posts, _temp_dir) = setup(Arc::new(queue)).await;

        let error = publisher
            .publish("fresh7at7", "still stored", PostKind::Note)
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Delivery(_)));

        let page = posts
            .list_by_actor(&publisher.actors.require("fresh7at7").await.unwrap().id, None, 10)
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].raw_text, "still stored");
    }
}
