//! RPC client for the content service (links and posts)

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::boot::{Component, Disposer};
use crate::model::Identity;
use crate::services::rpc::RpcChannel;
use crate::services::wire::{b64, b64_list, LinkRecord, NewPost, PostRecord};
use crate::services::ContentService;
use crate::session::RequestContext;
use crate::types::{GatewayError, Result, UpstreamKind};

pub const SERVICE: &str = "content";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetLinkBody<'a> {
    url: &'a str,
    get_by: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateLinkBody<'a> {
    url: &'a str,
    #[serde(with = "b64_list")]
    source_head_uuids: Vec<Vec<u8>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatePostBody {
    #[serde(with = "b64")]
    user_uuid: Vec<u8>,
    #[serde(with = "b64")]
    link_uuid: Vec<u8>,
    title: String,
    comment: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListUsersPostsBody {
    #[serde(with = "b64")]
    user_uuid: Vec<u8>,
}

#[derive(Deserialize)]
struct LinkReply {
    link: Option<LinkRecord>,
}

#[derive(Deserialize)]
struct PostReply {
    post: Option<PostRecord>,
}

/// Posts and links arrive as parallel lists
#[derive(Deserialize)]
struct PostsReply {
    #[serde(default)]
    posts: Vec<PostRecord>,
    #[serde(default)]
    links: Vec<LinkRecord>,
}

pub struct ContentClient {
    channel: RpcChannel,
}

impl ContentClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            channel: RpcChannel::new(SERVICE, base_url, timeout),
        }
    }

    pub fn channel(&self) -> &RpcChannel {
        &self.channel
    }
}

#[async_trait]
impl ContentService for ContentClient {
    async fn get_link(&self, ctx: &RequestContext, url: &str) -> Result<Option<LinkRecord>> {
        let body = GetLinkBody { url, get_by: "URL" };
        let reply: Option<LinkReply> = self.channel.call_optional(ctx, "GetLink", &body).await?;
        Ok(reply.and_then(|r| r.link))
    }

    async fn create_link(
        &self,
        ctx: &RequestContext,
        url: &str,
        source_head_uuids: Vec<Vec<u8>>,
    ) -> Result<LinkRecord> {
        let body = CreateLinkBody {
            url,
            source_head_uuids,
        };
        let reply: LinkReply = self.channel.call(ctx, "CreateLink", &body).await?;
        reply.link.ok_or_else(|| {
            GatewayError::upstream(SERVICE, "CreateLink", UpstreamKind::Decode, "reply carried no link")
        })
    }

    async fn create_post(&self, ctx: &RequestContext, post: NewPost) -> Result<PostRecord> {
        let body = CreatePostBody {
            user_uuid: post.author.to_vec(),
            link_uuid: post.link_uuid,
            title: post.title,
            comment: post.comment,
        };
        let reply: PostReply = self.channel.call(ctx, "CreatePost", &body).await?;
        reply.post.ok_or_else(|| {
            GatewayError::upstream(SERVICE, "CreatePost", UpstreamKind::Decode, "reply carried no post")
        })
    }

    async fn list_user_posts(
        &self,
        ctx: &RequestContext,
        author: &Identity,
    ) -> Result<Vec<(PostRecord, LinkRecord)>> {
        let body = ListUsersPostsBody {
            user_uuid: author.to_vec(),
        };
        let reply: PostsReply = self.channel.call(ctx, "ListUsersPosts", &body).await?;

        if reply.posts.len() != reply.links.len() {
            return Err(GatewayError::upstream(
                SERVICE,
                "ListUsersPosts",
                UpstreamKind::Decode,
                format!(
                    "{} posts but {} links",
                    reply.posts.len(),
                    reply.links.len()
                ),
            ));
        }
        Ok(reply.posts.into_iter().zip(reply.links).collect())
    }
}

#[async_trait]
impl Component for ContentClient {
    fn name(&self) -> &str {
        "content client"
    }

    async fn connect(self: Arc<Self>) -> Result<Disposer> {
        self.channel.connect().await?;
        Ok(Box::new(move || {
            Box::pin(async move { self.channel.close().await })
        }))
    }
}
