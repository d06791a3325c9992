//! API layer
//!
//! HTTP handlers for:
//! - Publishing (`POST /send`)
//! - NodeInfo discovery
//! - Metrics (Prometheus)
//!
//! ActivityPub collections, inbox and signatures are served by the
//! federation substrate through `crate::federation`'s capability traits.

mod dto;
pub mod metrics;
mod nodeinfo;
mod publish;

pub use dto::*;

pub use metrics::metrics_router;
pub use nodeinfo::nodeinfo_router;
pub use publish::publish_router;
