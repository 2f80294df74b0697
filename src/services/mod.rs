//! Backend service adapters
//!
//! One capability trait per backend so each can be replaced by a test double
//! on its own:
//!
//! - **IdentityService**: accounts, credential checks, follow edges
//! - **ContentService**: links and posts
//! - **ProvenanceService**: source determination for URLs
//!
//! The RPC implementations share [`rpc::RpcChannel`] and register with the
//! boot lifecycle through [`crate::boot::Component`].

pub mod content;
pub mod identity;
pub mod provenance;
pub mod rpc;
pub mod wire;

use async_trait::async_trait;

use crate::model::Identity;
use crate::session::RequestContext;
use crate::types::Result;

pub use content::ContentClient;
pub use identity::IdentityClient;
pub use provenance::ProvenanceClient;
pub use rpc::RpcChannel;
pub use wire::{
    CreateIdentity, FollowEdge, FollowKind, LinkRecord, NewPost, PostRecord, SourceNode,
    UserRecord, ValidateBy, ValidateCredentials,
};

/// Accounts and the social graph
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn create_identity(&self, ctx: &RequestContext, input: CreateIdentity) -> Result<UserRecord>;

    /// `Ok(None)` when no such identity exists
    async fn get_identity(&self, ctx: &RequestContext, id: &Identity) -> Result<Option<UserRecord>>;

    async fn validate_credentials(
        &self,
        ctx: &RequestContext,
        input: ValidateCredentials,
    ) -> Result<UserRecord>;

    /// Idempotent: following twice is not an error
    async fn follow(&self, ctx: &RequestContext, edge: FollowEdge) -> Result<()>;

    async fn unfollow(&self, ctx: &RequestContext, edge: FollowEdge) -> Result<()>;
}

/// Links and posts
#[async_trait]
pub trait ContentService: Send + Sync {
    /// `Ok(None)` when the URL has no link yet
    async fn get_link(&self, ctx: &RequestContext, url: &str) -> Result<Option<LinkRecord>>;

    async fn create_link(
        &self,
        ctx: &RequestContext,
        url: &str,
        source_head_uuids: Vec<Vec<u8>>,
    ) -> Result<LinkRecord>;

    async fn create_post(&self, ctx: &RequestContext, post: NewPost) -> Result<PostRecord>;

    /// Posts authored by `author`, each paired with its link, in backend order
    async fn list_user_posts(
        &self,
        ctx: &RequestContext,
        author: &Identity,
    ) -> Result<Vec<(PostRecord, LinkRecord)>>;
}

/// Where content comes from
#[async_trait]
pub trait ProvenanceService: Send + Sync {
    /// Fails when the URL cannot be classified
    async fn determine_source(&self, ctx: &RequestContext, url: &str) -> Result<Vec<SourceNode>>;
}
