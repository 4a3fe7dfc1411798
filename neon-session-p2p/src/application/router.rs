use crate::application::{ConnectionEvent, ConnectionRegistry};
use crate::infrastructure::Transport;
use neon_session_core::{MessageTag, PeerId, SyncMessage};
use std::collections::BTreeMap;

/// Handle returned by [`MessageRouter::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&PeerId, &SyncMessage)>;

/// What `poll` hands back to the session
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Message { from: PeerId, message: SyncMessage },
    PeerLeft(PeerId),
}

/// Single dispatch point between the transport and the session
pub struct MessageRouter<T: Transport> {
    transport: T,
    registry: ConnectionRegistry,
    subscribers: BTreeMap<MessageTag, Vec<(SubscriptionId, Handler)>>,
    next_subscription: u64,
    rejected: u64,
}

impl<T: Transport> MessageRouter<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            registry: ConnectionRegistry::new(),
            subscribers: BTreeMap::new(),
            next_subscription: 1,
            rejected: 0,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Payloads dropped by the decoder so far
    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn register_outbound(&mut self, peer: PeerId) {
        self.registry.register_outbound(peer);
    }

    // ===== Subscribers =====

    /// Register an observer for every accepted message with `tag`
    pub fn subscribe(
        &mut self,
        tag: MessageTag,
        handler: impl FnMut(&PeerId, &SyncMessage) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers
            .entry(tag)
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    /// Returns `false` if the subscription was unknown
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        for handlers in self.subscribers.values_mut() {
            if let Some(index) = handlers.iter().position(|(sid, _)| *sid == id) {
                drop(handlers.remove(index));
                return true;
            }
        }
        false
    }

    /// Invoke the subscribers of `message`'s tag in registration order
    pub fn notify(&mut self, from: &PeerId, message: &SyncMessage) {
        if let Some(handlers) = self.subscribers.get_mut(&message.tag()) {
            for (_, handler) in handlers.iter_mut() {
                handler(from, message);
            }
        }
    }

    // ===== Inbound =====

    /// Pull transport events, keep the registry current and decode payloads
    pub fn poll(&mut self) -> Vec<Inbound> {
        let mut inbound = Vec::new();

        for event in self.transport.poll_events() {
            match event {
                ConnectionEvent::PeerConnected(peer) => {
                    self.registry.register_inbound(peer);
                }
                ConnectionEvent::PeerDisconnected(peer) => {
                    if self.registry.remove(&peer).is_some() {
                        inbound.push(Inbound::PeerLeft(peer));
                    }
                }
                ConnectionEvent::MessageReceived { from, data } => {
                    self.registry.register_inbound(from.clone());
                    self.registry.touch(&from);

                    match SyncMessage::decode(&data) {
                        Ok(message) => {
                            tracing::debug!("📥 {} from {}", message.tag(), from);
                            inbound.push(Inbound::Message { from, message });
                        }
                        Err(e) => {
                            self.rejected += 1;
                            tracing::warn!("Rejected {} bytes from {}: {}", data.len(), from, e);
                        }
                    }
                }
            }
        }

        inbound
    }

    // ===== Outbound =====

    /// Send to exactly one open connection. Returns 1 if it was handed over.
    pub fn send_to(&mut self, peer: &PeerId, message: &SyncMessage) -> usize {
        if !self.registry.is_open(peer) {
            tracing::trace!("Dropping {} to {}: not connected", message.tag(), peer);
            return 0;
        }
        match encode(message) {
            Some(bytes) => self.send_bytes(peer, bytes),
            None => 0,
        }
    }

    /// Send to every open connection
    pub fn broadcast(&mut self, message: &SyncMessage) -> usize {
        self.fan_out(None, message)
    }

    /// Send to every open connection but `except`
    pub fn broadcast_except(&mut self, except: &PeerId, message: &SyncMessage) -> usize {
        self.fan_out(Some(except), message)
    }

    fn fan_out(&mut self, except: Option<&PeerId>, message: &SyncMessage) -> usize {
        let targets: Vec<PeerId> = self
            .registry
            .open_peers()
            .into_iter()
            .filter(|peer| Some(peer) != except)
            .collect();
        if targets.is_empty() {
            return 0;
        }

        let Some(bytes) = encode(message) else {
            return 0;
        };

        let sent: usize = targets
            .iter()
            .map(|peer| self.send_bytes(peer, bytes.clone()))
            .sum();
        tracing::trace!("📡 {} to {}/{} peers", message.tag(), sent, targets.len());
        sent
    }

    fn send_bytes(&mut self, peer: &PeerId, bytes: Vec<u8>) -> usize {
        match self.transport.send(peer, bytes) {
            Ok(()) => {
                self.registry.record_sent(peer);
                1
            }
            Err(e) => {
                tracing::debug!("Send to {} failed: {}", peer, e);
                0
            }
        }
    }

    /// Close the transport and forget every connection
    pub fn close_all(&mut self) {
        for peer in self.registry.open_peers() {
            self.transport.disconnect(&peer);
        }
        self.transport.close();
        self.registry.clear();
    }
}

fn encode(message: &SyncMessage) -> Option<Vec<u8>> {
    match message.encode() {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!("Could not encode {}: {}", message.tag(), e);
            None
        }
    }
}
