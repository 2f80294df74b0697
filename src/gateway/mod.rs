//! Gateway operations
//!
//! One method per public query or mutation. Each takes the explicit
//! [`RequestContext`] and talks to the backends only through the capability
//! traits in [`crate::services`], so tests can swap any of them out.

pub mod envelope;
mod posts;
mod users;

use std::sync::Arc;

use crate::model::Identity;
use crate::services::{ContentService, IdentityService, ProvenanceService};
use crate::session::RequestContext;
use crate::types::{GatewayError, Result};

pub use envelope::ResponseEnvelope;
pub use users::FollowDirection;

pub struct Gateway {
    identity: Arc<dyn IdentityService>,
    content: Arc<dyn ContentService>,
    provenance: Arc<dyn ProvenanceService>,
}

impl Gateway {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        content: Arc<dyn ContentService>,
        provenance: Arc<dyn ProvenanceService>,
    ) -> Self {
        Self {
            identity,
            content,
            provenance,
        }
    }

    /// Caller identity for protected operations
    fn require_identity(ctx: &RequestContext) -> Result<Identity> {
        ctx.current_identity()
            .ok_or_else(|| GatewayError::Unauthenticated("no user signed in".to_string()))
    }
}
