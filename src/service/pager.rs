//! Forward-only keyset pagination
//!
//! Cursors wrap the ordering key of the last item returned: a post ULID or
//! a follower `seq`. They are URL-safe base64 so callers treat them as
//! opaque tokens.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Serialize;

use crate::error::AppError;

const POST_PREFIX: &str = "post:";
const FOLLOWER_PREFIX: &str = "follower:";

/// One page of a collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// `None` when no further page exists
    pub next_cursor: Option<String>,
    pub is_last: bool,
}

/// Decoded pagination cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Last seen post ID
    Post(String),
    /// Last seen follower sequence number
    Follower(i64),
}

impl PageCursor {
    /// Encode as an opaque token
    pub fn encode(&self) -> String {
        let raw = match self {
            Self::Post(id) => format!("{POST_PREFIX}{id}"),
            Self::Follower(seq) => format!("{FOLLOWER_PREFIX}{seq}"),
        };
        URL_SAFE_NO_PAD.encode(raw)
    }

    /// Decode an opaque token
    ///
    /// # Errors
    /// `AppError::Validation` for anything not produced by [`PageCursor::encode`]
    pub fn decode(token: &str) -> Result<Self, AppError> {
        let invalid = || AppError::Validation("invalid page cursor".to_string());

        let bytes = URL_SAFE_NO_PAD.decode(token.trim()).map_err(|_| invalid())?;
        let raw = String::from_utf8(bytes).map_err(|_| invalid())?;

        if let Some(id) = raw.strip_prefix(POST_PREFIX) {
            // Stored IDs are canonical uppercase Crockford base32
            let id = ulid::Ulid::from_string(id).map_err(|_| invalid())?;
            return Ok(Self::Post(id.to_string()));
        }
        if let Some(seq) = raw.strip_prefix(FOLLOWER_PREFIX) {
            let seq = seq.parse::<i64>().map_err(|_| invalid())?;
            if seq < 1 {
                return Err(invalid());
            }
            return Ok(Self::Follower(seq));
        }

        Err(invalid())
    }

    /// Decode a cursor that must point into the outbox
    pub fn decode_post(token: &str) -> Result<String, AppError> {
        match Self::decode(token)? {
            Self::Post(id) => Ok(id),
            Self::Follower(_) => Err(AppError::Validation(
                "cursor does not belong to the posts collection".to_string(),
            )),
        }
    }

    /// Decode a cursor that must point into the followers collection
    pub fn decode_follower(token: &str) -> Result<i64, AppError> {
        match Self::decode(token)? {
            Self::Follower(seq) => Ok(seq),
            Self::Post(_) => Err(AppError::Validation(
                "cursor does not belong to the followers collection".to_string(),
            )),
        }
    }
}

/// Clamp a requested page size to `1..=max`
pub fn clamp_limit(limit: u32, max: u32) -> usize {
    limit.clamp(1, max.max(1)) as usize
}

/// Build a page from a query that fetched up to `limit + 1` rows.
///
/// The extra row only signals that another page exists; it is dropped.
pub(crate) fn page_from_rows<T>(
    mut rows: Vec<T>,
    limit: usize,
    cursor_of: impl Fn(&T) -> PageCursor,
) -> Page<T> {
    let has_more = rows.len() > limit;
    rows.truncate(limit);

    let next_cursor = if has_more {
        rows.last().map(|row| cursor_of(row).encode())
    } else {
        None
    };

    Page {
        is_last: next_cursor.is_none(),
        items: rows,
        next_cursor,
    }
}
