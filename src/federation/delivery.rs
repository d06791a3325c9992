//! Activity delivery hand-off
//!
//! The directory never talks to remote servers itself. Publishing builds a
//! [`DeliveryRequest`] and hands it to an [`ActivityDelivery`]
//! implementation. The bundled [`InProcessQueue`] is a bounded channel
//! drained by [`run_delivery_worker`], which resolves follower inboxes and
//! passes each job to the signing/sending substrate's [`DeliverySink`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::data::Post;
use crate::error::AppError;
use crate::metrics;
use crate::service::FollowerDirectory;

/// Audience of a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Recipients {
    /// Every follower of the sender
    Followers,
}

/// A `Create` activity waiting to be sent
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    pub sender_handle: String,
    /// Local actor ID, used to resolve follower inboxes
    pub sender_actor_id: String,
    pub activity_id: String,
    pub object_id: String,
    pub followers_uri: String,
    pub post: Post,
    pub recipients: Recipients,
    /// Inboxes that must not receive the activity (our own)
    pub exclude_inboxes: Vec<String>,
    pub prefer_shared_inbox: bool,
    /// Skip any batching delay in the substrate
    pub immediate: bool,
}

/// Outbound seam to the federation substrate
#[async_trait]
pub trait ActivityDelivery: Send + Sync {
    /// Accept a request for asynchronous delivery.
    ///
    /// Returning `Ok` means the request was queued, not that any remote
    /// server received it.
    async fn enqueue(&self, request: DeliveryRequest) -> Result<(), AppError>;
}

/// Bounded in-process delivery queue
#[derive(Clone)]
pub struct InProcessQueue {
    sender: mpsc::Sender<DeliveryRequest>,
}

impl InProcessQueue {
    /// Create a queue holding at most `capacity` pending requests.
    ///
    /// The receiver is handed to [`run_delivery_worker`] (or any other
    /// consumer); dropping it closes the queue.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<DeliveryRequest>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl ActivityDelivery for InProcessQueue {
    async fn enqueue(&self, request: DeliveryRequest) -> Result<(), AppError> {
        use mpsc::error::TrySendError;

        match self.sender.try_send(request) {
            Ok(()) => {
                metrics::DELIVERY_QUEUE_DEPTH.inc();
                Ok(())
            }
            Err(TrySendError::Full(request)) => Err(AppError::Delivery(format!(
                "delivery queue is full, dropped {}",
                request.activity_id
            ))),
            Err(TrySendError::Closed(request)) => Err(AppError::Delivery(format!(
                "delivery queue is closed, dropped {}",
                request.activity_id
            ))),
        }
    }
}

/// A request together with the inboxes it resolves to
#[derive(Debug, Clone)]
pub struct DeliveryJob {
    pub request: DeliveryRequest,
    pub inboxes: Vec<String>,
}

/// Resolve the target inboxes of a request
pub async fn resolve_job(
    followers: &FollowerDirectory,
    request: DeliveryRequest,
) -> Result<DeliveryJob, AppError> {
    let inboxes = match request.recipients {
        Recipients::Followers => {
            followers
                .delivery_inboxes(
                    &request.sender_actor_id,
                    request.prefer_shared_inbox,
                    &request.exclude_inboxes,
                )
                .await?
        }
    };
    Ok(DeliveryJob { request, inboxes })
}

/// Consumer of resolved delivery jobs
///
/// Implemented by the signing/sending substrate. The worker calls it once
/// per job, in queue order.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, job: DeliveryJob) -> Result<(), AppError>;
}

/// Sink used when no substrate is attached: records each job in the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl DeliverySink for LogSink {
    async fn deliver(&self, job: DeliveryJob) -> Result<(), AppError> {
        tracing::info!(
            activity = %job.request.activity_id,
            sender = %job.request.sender_handle,
            inboxes = job.inboxes.len(),
            immediate = job.request.immediate,
            "Delivery job ready"
        );
        for inbox in &job.inboxes {
            tracing::debug!(activity = %job.request.activity_id, inbox = %inbox, "Delivery target");
        }
        Ok(())
    }
}

/// Drain the queue into `sink` until every sender is dropped.
pub async fn run_delivery_worker(
    mut receiver: mpsc::Receiver<DeliveryRequest>,
    followers: Arc<FollowerDirectory>,
    sink: Arc<dyn DeliverySink>,
) {
    tracing::info!("Delivery worker started");

    while let Some(request) = receiver.recv().await {
        metrics::DELIVERY_QUEUE_DEPTH.dec();
        let activity_id = request.activity_id.clone();

        let job = match resolve_job(&followers, request).await {
            Ok(job) => job,
            Err(error) => {
                metrics::observe_delivery("failed");
                tracing::error!(activity = %activity_id, %error, "Failed to resolve delivery targets");
                continue;
            }
        };

        if let Err(error) = sink.deliver(job).await {
            metrics::observe_delivery("failed");
            tracing::error!(activity = %activity_id, %error, "Failed to deliver activity");
        }
    }

    tracing::info!("Delivery queue closed, worker stopping");
}
