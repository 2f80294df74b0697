//! RPC client for the identity service

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::boot::{Component, Disposer};
use crate::model::Identity;
use crate::services::rpc::RpcChannel;
use crate::services::wire::{
    b64, CreateIdentity, FollowEdge, FollowEdgeWire, UserRecord, ValidateCredentials,
};
use crate::services::IdentityService;
use crate::session::RequestContext;
use crate::types::{GatewayError, Result, UpstreamKind};

pub const SERVICE: &str = "identity";

#[derive(Deserialize)]
struct UserReply {
    user: Option<UserRecord>,
}

#[derive(Serialize)]
struct GetUserBody {
    #[serde(with = "b64")]
    uuid: Vec<u8>,
}

pub struct IdentityClient {
    channel: RpcChannel,
}

impl IdentityClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            channel: RpcChannel::new(SERVICE, base_url, timeout),
        }
    }

    pub fn channel(&self) -> &RpcChannel {
        &self.channel
    }

    /// A success reply must carry the user
    fn require_user(operation: &'static str, reply: UserReply) -> Result<UserRecord> {
        reply.user.ok_or_else(|| {
            GatewayError::upstream(SERVICE, operation, UpstreamKind::Decode, "reply carried no user")
        })
    }
}

#[async_trait]
impl IdentityService for IdentityClient {
    async fn create_identity(&self, ctx: &RequestContext, input: CreateIdentity) -> Result<UserRecord> {
        let reply: UserReply = self.channel.call(ctx, "CreateUser", &input).await?;
        Self::require_user("CreateUser", reply)
    }

    async fn get_identity(&self, ctx: &RequestContext, id: &Identity) -> Result<Option<UserRecord>> {
        let body = GetUserBody { uuid: id.to_vec() };
        let reply: Option<UserReply> = self.channel.call_optional(ctx, "GetUser", &body).await?;
        Ok(reply.and_then(|r| r.user))
    }

    async fn validate_credentials(
        &self,
        ctx: &RequestContext,
        input: ValidateCredentials,
    ) -> Result<UserRecord> {
        let reply: UserReply = self
            .channel
            .call(ctx, "ValidateUserCredentials", &input)
            .await?;
        Self::require_user("ValidateUserCredentials", reply)
    }

    async fn follow(&self, ctx: &RequestContext, edge: FollowEdge) -> Result<()> {
        let _: IgnoredAny = self
            .channel
            .call(ctx, "Follow", &FollowEdgeWire::from(&edge))
            .await?;
        Ok(())
    }

    async fn unfollow(&self, ctx: &RequestContext, edge: FollowEdge) -> Result<()> {
        let _: IgnoredAny = self
            .channel
            .call(ctx, "UnFollow", &FollowEdgeWire::from(&edge))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Component for IdentityClient {
    fn name(&self) -> &str {
        "identity client"
    }

    async fn connect(self: Arc<Self>) -> Result<Disposer> {
        self.channel.connect().await?;
        Ok(Box::new(move || {
            Box::pin(async move { self.channel.close().await })
        }))
    }
}
