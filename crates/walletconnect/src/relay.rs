//! Websocket connection to a WalletConnect relay server.

use crate::auth::ClientIdentity;
use crate::error::{Error, Result};
use crate::transport::{InboundMessage, InboundReceiver, Transport};
use async_trait::async_trait;
use relay_client::ConnectionOptions;
use relay_client::websocket::{Client, ConnectionHandler, PublishedMessage};
use relay_rpc::domain::Topic;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info};
use url::Url;

pub const DEFAULT_RELAY_URL: &str = "wss://relay.walletconnect.org";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub relay_url: String,
    pub project_id: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl RelayConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            relay_url: DEFAULT_RELAY_URL.to_string(),
            project_id: project_id.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
        }
    }
}

/// Validates the relay URL and signs a fresh auth token for it.
pub fn connection_options(
    cfg: &RelayConfig,
    identity: &ClientIdentity,
) -> Result<ConnectionOptions> {
    let url = Url::parse(&cfg.relay_url)?;
    if url.scheme() != "ws" && url.scheme() != "wss" {
        return Err(Error::Relay(format!(
            "relay URL must use ws:// or wss:// scheme, got: {}",
            url.scheme()
        )));
    }
    let auth = identity.relay_token(&cfg.relay_url)?;
    Ok(ConnectionOptions {
        address: cfg.relay_url.clone(),
        ..ConnectionOptions::new(cfg.project_id.clone(), auth)
    })
}

/// Hands relay deliveries to the sign client's router.
struct Forwarder {
    inbound: mpsc::UnboundedSender<InboundMessage>,
}

impl Forwarder {
    fn forward(&self, topic: Topic, message: &str, tag: u32) {
        let msg = InboundMessage {
            topic,
            message: message.to_string(),
            tag,
        };
        if self.inbound.send(msg).is_err() {
            debug!(tag, "sign client gone; dropping relay message");
        }
    }
}

impl ConnectionHandler for Forwarder {
    fn connected(&mut self) {
        debug!("relay connection open");
    }

    fn message_received(&mut self, message: PublishedMessage) {
        self.forward(message.topic, &message.message, message.tag);
    }
}

pub struct RelayTransport {
    client: Client,
    request_timeout: Duration,
}

impl RelayTransport {
    pub async fn connect(
        cfg: &RelayConfig,
        identity: &ClientIdentity,
    ) -> Result<(Self, InboundReceiver)> {
        let opts = connection_options(cfg, identity)?;
        let (inbound, inbound_rx) = mpsc::unbounded_channel();
        let client = Client::new(Forwarder { inbound });
        timeout(cfg.connect_timeout, client.connect(&opts))
            .await
            .map_err(|_| {
                Error::Timeout(format!("relay connection timeout after {:?}", cfg.connect_timeout))
            })?
            .map_err(|e| Error::WebSocket(e.to_string()))?;
        info!(relay = %cfg.relay_url, "relay connected");

        Ok((
            Self {
                client,
                request_timeout: cfg.request_timeout,
            },
            inbound_rx,
        ))
    }

    async fn call<T, E: Display>(
        &self,
        what: &str,
        fut: impl Future<Output = std::result::Result<T, E>>,
    ) -> Result<T> {
        timeout(self.request_timeout, fut)
            .await
            .map_err(|_| Error::Timeout(format!("relay {what} timed out")))?
            .map_err(|e| Error::Relay(format!("{what} failed: {e}")))
    }
}

#[async_trait]
impl Transport for RelayTransport {
    async fn publish(
        &self,
        topic: &Topic,
        message: &str,
        tag: u32,
        ttl_secs: u64,
        prompt: bool,
    ) -> Result<()> {
        let publish = self.client.publish(
            topic.clone(),
            message,
            tag,
            Duration::from_secs(ttl_secs),
            prompt,
        );
        self.call("publish", publish).await
    }

    async fn subscribe(&self, topic: &Topic) -> Result<()> {
        let id = self.call("subscribe", self.client.subscribe(topic.clone())).await?;
        debug!(%topic, subscription = %id, "subscribed");
        Ok(())
    }

    async fn unsubscribe(&self, topic: &Topic) -> Result<()> {
        self.call("unsubscribe", self.client.unsubscribe(topic.clone()))
            .await
    }
}
