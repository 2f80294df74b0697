//! Post operations and the create-post saga
//!
//! Creating a post resolves the URL's link first, then creates the post:
//!
//! 1. look the link up by URL (absence is the normal "new URL" branch)
//! 2. if absent, ask provenance for the URL's primary sources
//! 3. if absent, create the link with those sources
//! 4. create the post against the resolved link
//!
//! Steps 1-3 are a non-transactional get-or-create across two services.
//! Two concurrent requests for a new URL can both reach step 3. Uniqueness
//! is the content service's job: a create that loses the race comes back as
//! a conflict, and the link is read again once and the winner's used.

use tracing::{debug, info, warn};

use crate::gateway::envelope::{post_to_partial, posts_to_partial, ResponseEnvelope};
use crate::gateway::Gateway;
use crate::model::{
    CreatePostRequest, DeletePostRequest, FieldError, Identity, PartialPost, PostsRequest,
    UpdatePostRequest,
};
use crate::services::{LinkRecord, NewPost};
use crate::session::RequestContext;
use crate::types::{GatewayError, Result, UpstreamKind};

impl Gateway {
    pub async fn create_post(
        &self,
        ctx: &RequestContext,
        input: CreatePostRequest,
    ) -> Result<ResponseEnvelope<PartialPost>> {
        let author = Self::require_identity(ctx)?;

        let link = match self.resolve_link(ctx, &input.url).await {
            Ok(link) => link,
            Err(GatewayError::Cancelled) => return Err(GatewayError::Cancelled),
            Err(e) => {
                warn!(request_id = %ctx.request_id, url = %input.url, error = %e, "Create post aborted");
                return Ok(ResponseEnvelope::from_error(FieldError::unclassified(
                    e.to_string(),
                )));
            }
        };

        debug!(request_id = %ctx.request_id, url = %input.url, step = "create_post", "Creating post");
        let outcome = self
            .content
            .create_post(
                ctx,
                NewPost {
                    author,
                    link_uuid: link.uuid.clone(),
                    title: input.title,
                    comment: input.comment,
                },
            )
            .await;

        if outcome.is_ok() {
            info!(request_id = %ctx.request_id, url = %input.url, author = %author, "Post created");
        }
        ResponseEnvelope::from_result(outcome.map(Some), |post| post_to_partial(post, &link))
    }

    /// Steps 1-3 of the saga
    async fn resolve_link(&self, ctx: &RequestContext, url: &str) -> Result<LinkRecord> {
        match self.content.get_link(ctx, url).await {
            Ok(Some(link)) => {
                debug!(request_id = %ctx.request_id, url, step = "get_link", "Link exists");
                return Ok(link);
            }
            Ok(None) => {
                debug!(request_id = %ctx.request_id, url, step = "get_link", "No link yet");
            }
            Err(GatewayError::Cancelled) => return Err(GatewayError::Cancelled),
            Err(e) => {
                warn!(request_id = %ctx.request_id, url, step = "get_link", error = %e, "Link lookup failed, treating as new");
            }
        }

        let sources = self.provenance.determine_source(ctx, url).await?;
        debug!(
            request_id = %ctx.request_id,
            url,
            step = "determine_source",
            sources = sources.len(),
            "Sources determined"
        );

        let source_ids = sources.into_iter().map(|s| s.uuid).collect();
        match self.content.create_link(ctx, url, source_ids).await {
            Ok(link) => {
                info!(request_id = %ctx.request_id, url, step = "create_link", "Link created");
                Ok(link)
            }
            Err(conflict) if conflict.upstream_kind() == Some(UpstreamKind::Conflict) => {
                info!(request_id = %ctx.request_id, url, step = "create_link", "Link created concurrently, re-reading");
                match self.content.get_link(ctx, url).await {
                    Ok(Some(link)) => Ok(link),
                    Ok(None) => Err(conflict),
                    Err(GatewayError::Cancelled) => Err(GatewayError::Cancelled),
                    Err(e) => {
                        warn!(request_id = %ctx.request_id, url, error = %e, "Re-read after conflict failed");
                        Err(conflict)
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Posts by the user named in the request
    pub async fn posts(
        &self,
        ctx: &RequestContext,
        input: PostsRequest,
    ) -> Result<ResponseEnvelope<Vec<PartialPost>>> {
        let author = match Identity::parse_str(&input.user_id) {
            Ok(author) => author,
            Err(e) => {
                return Ok(ResponseEnvelope::from_error(FieldError::new(
                    "userID",
                    e.to_string(),
                )))
            }
        };
        self.list_posts(ctx, &author).await
    }

    pub async fn current_users_posts(
        &self,
        ctx: &RequestContext,
    ) -> Result<ResponseEnvelope<Vec<PartialPost>>> {
        let author = Self::require_identity(ctx)?;
        self.list_posts(ctx, &author).await
    }

    pub async fn update_post(
        &self,
        _ctx: &RequestContext,
        _input: UpdatePostRequest,
    ) -> Result<ResponseEnvelope<PartialPost>> {
        Err(GatewayError::NotImplemented("updatePost"))
    }

    pub async fn delete_post(
        &self,
        _ctx: &RequestContext,
        _input: DeletePostRequest,
    ) -> Result<ResponseEnvelope<PartialPost>> {
        Err(GatewayError::NotImplemented("deletePost"))
    }

    async fn list_posts(
        &self,
        ctx: &RequestContext,
        author: &Identity,
    ) -> Result<ResponseEnvelope<Vec<PartialPost>>> {
        let outcome = self.content.list_user_posts(ctx, author).await;
        ResponseEnvelope::from_result(outcome.map(Some), posts_to_partial)
    }
}
