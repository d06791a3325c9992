//! Data models
//!
//! Rust structs representing directory entities.
//! Actors and posts use ULID ids, followers a storage-assigned sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Local actor
// =============================================================================

/// ActivityStreams actor type of a local account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ActorType {
    #[default]
    Person,
    Group,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "Person",
            Self::Group => "Group",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Person" => Some(Self::Person),
            "Group" => Some(Self::Group),
            _ => None,
        }
    }

    /// Summary used when the profile does not set one
    pub fn default_summary(&self) -> &'static str {
        match self {
            Self::Person => "This is me!",
            Self::Group => "This is a group!",
        }
    }
}

/// Icon or header image reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    pub media_type: String,
    pub url: String,
}

/// Profile metadata field (`PropertyValue`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileField {
    pub name: String,
    pub value: String,
}

/// An account this server federates on behalf of
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalActor {
    pub id: String,
    /// Unique, stable handle (e.g. "fresh7at7")
    pub handle: String,
    pub display_name: String,
    pub actor_type: ActorType,
    pub summary: Option<String>,
    pub icon: Option<MediaRef>,
    pub image: Option<MediaRef>,
    /// Ordered profile fields
    pub attachments: Vec<ProfileField>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LocalActor {
    /// Summary to publish, falling back to the type default
    pub fn summary_or_default(&self) -> &str {
        self.summary
            .as_deref()
            .unwrap_or_else(|| self.actor_type.default_summary())
    }
}

/// Editable profile fields of a local actor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorProfile {
    pub display_name: String,
    pub summary: Option<String>,
    pub icon: Option<MediaRef>,
    pub image: Option<MediaRef>,
    pub attachments: Vec<ProfileField>,
}

/// Opaque key material owned by the key-management collaborator
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub private_key: String,
    pub public_key: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("private_key", &"<redacted>")
            .field("public_key", &self.public_key)
            .finish()
    }
}

/// Input for provisioning a local actor
#[derive(Debug, Clone)]
pub struct NewLocalActor {
    pub handle: String,
    pub actor_type: ActorType,
    pub profile: ActorProfile,
    pub key_pair: Option<KeyPair>,
}

// =============================================================================
// Followers
// =============================================================================

/// A remote actor following a local actor
///
/// At most one record exists per (`local_actor_id`, `remote_actor_id`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FollowerRecord {
    /// Storage-assigned ordering key
    pub seq: i64,
    pub local_actor_id: String,
    /// Remote actor URI (globally unique, the dedup key)
    pub remote_actor_id: String,
    pub remote_inbox_url: String,
    pub remote_shared_inbox_url: Option<String>,
    /// Remote handle (e.g. "@alice@example.com")
    pub remote_handle: String,
    pub remote_display_name: Option<String>,
    pub remote_actor_type: String,
    /// Profile page URL
    pub remote_url: Option<String>,
    /// ActivityPub Follow activity URI
    pub follow_activity_id: String,
    pub created_at: DateTime<Utc>,
}

/// Follow notification data handed over by the federation substrate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFollower {
    pub remote_actor_id: String,
    pub inbox_url: String,
    pub shared_inbox_url: Option<String>,
    pub handle: String,
    pub display_name: Option<String>,
    pub actor_type: String,
    pub url: Option<String>,
    pub follow_activity_id: String,
}

impl NewFollower {
    /// Reject notifications lacking the fields delivery depends on
    pub fn validate(&self) -> Result<(), String> {
        require_http_url("remote actor id", &self.remote_actor_id)?;
        require_http_url("inbox url", &self.inbox_url)?;
        if let Some(shared_inbox) = &self.shared_inbox_url {
            require_http_url("shared inbox url", shared_inbox)?;
        }
        if self.follow_activity_id.trim().is_empty() {
            return Err("follow activity id is required".to_string());
        }
        if self.handle.trim().is_empty() {
            return Err("remote handle is required".to_string());
        }
        Ok(())
    }
}

fn require_http_url(field: &str, value: &str) -> Result<(), String> {
    let parsed = url::Url::parse(value).map_err(|e| format!("invalid {field}: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!("invalid {field}: unsupported scheme {scheme}")),
    }
}

// =============================================================================
// Posts
// =============================================================================

/// Object type of a local post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PostKind {
    #[default]
    Note,
    Article,
}

impl PostKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Article => "Article",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Note" => Some(Self::Note),
            "Article" => Some(Self::Article),
            _ => None,
        }
    }
}

/// Audience of a post
///
/// Only `Public` exists: addressed to the public collection, followers in cc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            _ => None,
        }
    }
}

/// A mention extracted from post text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MentionTarget {
    /// Profile URL, `https://{domain}/@{user}`
    pub href: String,
    /// `@user@domain`
    pub display_name: String,
}

impl MentionTarget {
    /// `user@domain`
    pub fn handle(&self) -> &str {
        self.display_name.trim_start_matches('@')
    }
}

/// A locally authored post
///
/// `id` ordering is the chronological and pagination order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub local_actor_id: String,
    pub kind: PostKind,
    pub raw_text: String,
    pub rendered_html: String,
    pub mentions: Vec<MentionTarget>,
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
}
