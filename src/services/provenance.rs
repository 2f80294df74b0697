//! RPC client for the provenance service

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::boot::{Component, Disposer};
use crate::services::rpc::RpcChannel;
use crate::services::wire::SourceNode;
use crate::services::ProvenanceService;
use crate::session::RequestContext;
use crate::types::Result;

pub const SERVICE: &str = "provenance";

#[derive(Serialize)]
struct DetermineBody<'a> {
    url: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetermineReply {
    #[serde(default)]
    primary_source_nodes: Vec<SourceNode>,
}

pub struct ProvenanceClient {
    channel: RpcChannel,
}

impl ProvenanceClient {
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
impl ProvenanceService for ProvenanceClient {
    async fn determine_source(&self, ctx: &RequestContext, url: &str) -> Result<Vec<SourceNode>> {
        let reply: DetermineReply = self
            .channel
            .call(ctx, "DetermineLinkSource", &DetermineBody { url })
            .await?;
        Ok(reply.primary_source_nodes)
    }
}

#[async_trait]
impl Component for ProvenanceClient {
    fn name(&self) -> &str {
        "provenance client"
    }

    async fn connect(self: Arc<Self>) -> Result<Disposer> {
        self.channel.connect().await?;
        Ok(Box::new(move || {
            Box::pin(async move { self.channel.close().await })
        }))
    }
}
