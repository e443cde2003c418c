//! Message transport underneath the sign client.

use crate::error::{Error, Result};
use async_trait::async_trait;
use relay_rpc::domain::Topic;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};

/// An encrypted envelope delivered on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: Topic,
    pub message: String,
    pub tag: u32,
}

pub type InboundReceiver = mpsc::UnboundedReceiver<InboundMessage>;

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn publish(
        &self,
        topic: &Topic,
        message: &str,
        tag: u32,
        ttl_secs: u64,
        prompt: bool,
    ) -> Result<()>;

    async fn subscribe(&self, topic: &Topic) -> Result<()>;

    async fn unsubscribe(&self, topic: &Topic) -> Result<()>;
}

struct Stored {
    from: usize,
    message: InboundMessage,
}

#[derive(Default)]
struct RelayState {
    next_peer: usize,
    peers: HashMap<usize, mpsc::UnboundedSender<InboundMessage>>,
    subscriptions: HashMap<Topic, Vec<usize>>,
    mailbox: HashMap<Topic, Vec<Stored>>,
}

/// In-process relay: stores every message per topic and replays it to late subscribers,
/// never echoing a message back to its publisher.
#[derive(Clone, Default)]
pub struct MemoryRelay {
    state: Arc<Mutex<RelayState>>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn connect(&self) -> (MemoryTransport, InboundReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;
        let peer = state.next_peer;
        state.next_peer += 1;
        state.peers.insert(peer, tx);
        (
            MemoryTransport {
                relay: self.clone(),
                peer,
            },
            rx,
        )
    }
}

pub struct MemoryTransport {
    relay: MemoryRelay,
    peer: usize,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(
        &self,
        topic: &Topic,
        message: &str,
        tag: u32,
        _ttl_secs: u64,
        _prompt: bool,
    ) -> Result<()> {
        let mut state = self.relay.state.lock().await;
        let msg = InboundMessage {
            topic: topic.clone(),
            message: message.to_string(),
            tag,
        };
        let subscribers = state.subscriptions.get(topic).cloned().unwrap_or_default();
        for peer in subscribers.into_iter().filter(|p| *p != self.peer) {
            let delivered = state
                .peers
                .get(&peer)
                .is_some_and(|tx| tx.send(msg.clone()).is_ok());
            // A peer whose receiver is gone has disconnected.
            if !delivered {
                state.peers.remove(&peer);
                for subs in state.subscriptions.values_mut() {
                    subs.retain(|p| *p != peer);
                }
            }
        }
        state
            .mailbox
            .entry(topic.clone())
            .or_default()
            .push(Stored {
                from: self.peer,
                message: msg,
            });
        Ok(())
    }

    async fn subscribe(&self, topic: &Topic) -> Result<()> {
        let mut state = self.relay.state.lock().await;
        let subs = state.subscriptions.entry(topic.clone()).or_default();
        if subs.contains(&self.peer) {
            return Ok(());
        }
        subs.push(self.peer);

        let backlog: Vec<InboundMessage> = state
            .mailbox
            .get(topic)
            .map(|stored| {
                stored
                    .iter()
                    .filter(|s| s.from != self.peer)
                    .map(|s| s.message.clone())
                    .collect()
            })
            .unwrap_or_default();
        if let Some(tx) = state.peers.get(&self.peer) {
            for msg in backlog {
                tx.send(msg).map_err(|_| Error::ChannelClosed)?;
            }
        }
        Ok(())
    }

    async fn unsubscribe(&self, topic: &Topic) -> Result<()> {
        let mut state = self.relay.state.lock().await;
        if let Some(subs) = state.subscriptions.get_mut(topic) {
            subs.retain(|p| *p != self.peer);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn late_subscriber_receives_backlog_but_not_own_messages() {
        let relay = MemoryRelay::new();
        let (a, mut a_rx) = relay.connect().await;
        let (b, mut b_rx) = relay.connect().await;

        let t = Topic::generate();

        a.subscribe(&t).await.unwrap();
        a.publish(&t, "from-a", 1, 60, false).await.unwrap();
        b.subscribe(&t).await.unwrap();
        b.publish(&t, "from-b", 2, 60, false).await.unwrap();

        assert_eq!(b_rx.recv().await.unwrap().message, "from-a");
        assert_eq!(a_rx.recv().await.unwrap().message, "from-b");
        assert!(a_rx.try_recv().is_err());
        assert!(b_rx.try_recv().is_err());
    }
}
