//! Process wiring: build the adapters and the gateway, then bring them up
//! and down in a fixed order
//!
//! Components are kept in an ordered list. They connect in registration
//! order and close in reverse, so shutdown ordering never depends on map
//! iteration.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::gateway::Gateway;
use crate::services::{ContentClient, IdentityClient, ProvenanceClient};
use crate::types::{GatewayError, Result};

/// Releases whatever `Component::connect` acquired
pub type Disposer = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

/// Something with a connection lifecycle
#[async_trait]
pub trait Component: Send + Sync {
    fn name(&self) -> &str;

    /// Acquire resources and hand back the matching disposer
    async fn connect(self: Arc<Self>) -> Result<Disposer>;
}

/// Ordered set of lifecycle components
#[derive(Default)]
pub struct Lifecycle {
    components: Vec<Arc<dyn Component>>,
    /// Disposers of connected components, in connection order
    connected: Vec<(String, Disposer)>,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, component: Arc<dyn Component>) {
        self.components.push(component);
    }

    pub fn names(&self) -> Vec<String> {
        self.components.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn is_connected(&self) -> bool {
        !self.components.is_empty() && self.connected.len() == self.components.len()
    }

    /// Connect every component in registration order.
    ///
    /// On the first failure the components already connected are closed
    /// again in reverse order and the failure is returned.
    pub async fn connect_all(&mut self) -> Result<()> {
        let components = self.components.clone();
        for component in components {
            let name = component.name().to_string();
            match component.connect().await {
                Ok(disposer) => {
                    info!(component = %name, "Connected");
                    self.connected.push((name, disposer));
                }
                Err(e) => {
                    error!(component = %name, error = %e, "Connect failed, rolling back");
                    for rollback_error in self.shutdown().await {
                        warn!(error = %rollback_error, "Rollback close failed");
                    }
                    return Err(e.in_component(name));
                }
            }
        }
        Ok(())
    }

    /// Close connected components in reverse order.
    ///
    /// Every disposer runs even if an earlier one fails; all failures are
    /// returned.
    pub async fn shutdown(&mut self) -> Vec<GatewayError> {
        let mut failures = Vec::new();
        while let Some((name, disposer)) = self.connected.pop() {
            match disposer().await {
                Ok(()) => info!(component = %name, "Closed"),
                Err(e) => {
                    warn!(component = %name, error = %e, "Close failed");
                    failures.push(e.in_component(name));
                }
            }
        }
        failures
    }
}

/// Reports whether every backend channel is up
#[derive(Clone)]
pub struct HealthProbe {
    identity: Arc<IdentityClient>,
    content: Arc<ContentClient>,
    provenance: Arc<ProvenanceClient>,
}

impl HealthProbe {
    pub async fn connected(&self) -> bool {
        self.identity.channel().is_connected().await
            && self.content.channel().is_connected().await
            && self.provenance.channel().is_connected().await
    }
}

/// Everything `main` needs to run the gateway
pub struct Strap {
    pub gateway: Arc<Gateway>,
    pub lifecycle: Lifecycle,
    probe: HealthProbe,
}

impl Strap {
    /// Build the adapters and register them identity, provenance, content
    pub fn new(args: &Args) -> Self {
        let services = args.services();
        let timeout = args.rpc_timeout();

        let identity = Arc::new(IdentityClient::new(services.identity, timeout));
        let provenance = Arc::new(ProvenanceClient::new(services.provenance, timeout));
        let content = Arc::new(ContentClient::new(services.content, timeout));

        let mut lifecycle = Lifecycle::new();
        lifecycle.register(identity.clone());
        lifecycle.register(provenance.clone());
        lifecycle.register(content.clone());

        let gateway = Arc::new(Gateway::new(
            identity.clone(),
            content.clone(),
            provenance.clone(),
        ));

        Self {
            gateway,
            lifecycle,
            probe: HealthProbe {
                identity,
                content,
                provenance,
            },
        }
    }

    pub fn health_probe(&self) -> HealthProbe {
        self.probe.clone()
    }

    pub async fn connect(&mut self) -> Result<()> {
        self.lifecycle.connect_all().await
    }

    pub async fn shutdown(&mut self) -> Vec<GatewayError> {
        self.lifecycle.shutdown().await
    }
}
