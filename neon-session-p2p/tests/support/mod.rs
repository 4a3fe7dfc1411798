#![allow(dead_code)]

use async_trait::async_trait;
use neon_session_core::{PeerId, Role, SyncMessage};
use neon_session_p2p::{ConnectionEvent, Result, SessionConfig, SessionError, Transport};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::rc::Rc;
use tokio::sync::Notify;

#[derive(Default)]
struct NetworkState {
    open: HashSet<PeerId>,
    links: BTreeSet<(PeerId, PeerId)>,
    queues: HashMap<PeerId, VecDeque<ConnectionEvent>>,
    refuse: HashSet<PeerId>,
    failing_opens: HashMap<PeerId, usize>,
}

fn link_key(a: &PeerId, b: &PeerId) -> (PeerId, PeerId) {
    if a <= b {
        (a.clone(), b.clone())
    } else {
        (b.clone(), a.clone())
    }
}

impl NetworkState {
    fn push(&mut self, to: &PeerId, event: ConnectionEvent) {
        if self.open.contains(to) {
            self.queues.entry(to.clone()).or_default().push_back(event);
        }
    }

    fn unlink(&mut self, a: &PeerId, b: &PeerId) -> bool {
        if self.links.remove(&link_key(a, b)) {
            self.push(a, ConnectionEvent::PeerDisconnected(b.clone()));
            self.push(b, ConnectionEvent::PeerDisconnected(a.clone()));
            true
        } else {
            false
        }
    }
}

/// In-process stand-in for the signalling server and WebRTC channels.
///
/// Every endpoint gets a fixed identity; channels are ordered and reliable.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    state: Rc<RefCell<NetworkState>>,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn endpoint(&self, id: &str) -> MemoryTransport {
        MemoryTransport {
            id: PeerId::from(id),
            network: self.clone(),
            open_gate: None,
            opened: false,
        }
    }

    /// Endpoint whose `open` waits until `gate` is notified
    pub fn gated_endpoint(&self, id: &str, gate: Rc<Notify>) -> MemoryTransport {
        MemoryTransport {
            open_gate: Some(gate),
            ..self.endpoint(id)
        }
    }

    /// Make the next `times` opens of `id` fail
    pub fn fail_opens(&self, id: &str, times: usize) {
        self.state
            .borrow_mut()
            .failing_opens
            .insert(PeerId::from(id), times);
    }

    /// Refuse channels to `id`
    pub fn refuse(&self, id: &str) {
        self.state.borrow_mut().refuse.insert(PeerId::from(id));
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.state.borrow().open.contains(&PeerId::from(id))
    }

    pub fn is_linked(&self, a: &str, b: &str) -> bool {
        self.state
            .borrow()
            .links
            .contains(&link_key(&PeerId::from(a), &PeerId::from(b)))
    }

    /// Deliver raw bytes to `to` as if `from` had sent them
    pub fn inject(&self, from: &str, to: &str, data: Vec<u8>) {
        self.state.borrow_mut().push(
            &PeerId::from(to),
            ConnectionEvent::MessageReceived {
                from: PeerId::from(from),
                data,
            },
        );
    }

    pub fn inject_message(&self, from: &str, to: &str, message: &SyncMessage) {
        self.inject(from, to, message.encode().unwrap());
    }

    /// Close the channel between two endpoints from the outside
    pub fn cut(&self, a: &str, b: &str) {
        self.state
            .borrow_mut()
            .unlink(&PeerId::from(a), &PeerId::from(b));
    }

    /// Link two already-open endpoints, as a full-mesh room would
    pub fn link(&self, a: &str, b: &str) {
        let (a, b) = (PeerId::from(a), PeerId::from(b));
        let mut state = self.state.borrow_mut();
        if state.links.insert(link_key(&a, &b)) {
            state.push(&a, ConnectionEvent::PeerConnected(b.clone()));
            state.push(&b, ConnectionEvent::PeerConnected(a));
        }
    }
}

pub struct MemoryTransport {
    id: PeerId,
    network: MemoryNetwork,
    open_gate: Option<Rc<Notify>>,
    opened: bool,
}

#[async_trait(?Send)]
impl Transport for MemoryTransport {
    async fn open(&mut self, _role: Role) -> Result<PeerId> {
        if let Some(gate) = self.open_gate.clone() {
            gate.notified().await;
        }

        let mut state = self.network.state.borrow_mut();
        if let Some(remaining) = state.failing_opens.get_mut(&self.id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(SessionError::TransportInit(
                    "signalling server unreachable".to_string(),
                ));
            }
        }

        state.open.insert(self.id.clone());
        self.opened = true;
        Ok(self.id.clone())
    }

    async fn connect(&mut self, remote: &PeerId) -> Result<()> {
        if !self.opened {
            return Err(SessionError::NotOpen);
        }
        {
            let state = self.network.state.borrow();
            if !state.open.contains(remote) || state.refuse.contains(remote) {
                return Err(SessionError::Connect {
                    peer: remote.clone(),
                    reason: "refused".to_string(),
                });
            }
        }
        self.network.link(self.id.as_str(), remote.as_str());
        Ok(())
    }

    fn local_peer_id(&self) -> Option<PeerId> {
        self.opened.then(|| self.id.clone())
    }

    fn send(&mut self, to: &PeerId, data: Vec<u8>) -> Result<()> {
        let mut state = self.network.state.borrow_mut();
        if !state.links.contains(&link_key(&self.id, to)) {
            return Err(SessionError::SendFailed(format!("no channel to {}", to)));
        }
        state.push(
            to,
            ConnectionEvent::MessageReceived {
                from: self.id.clone(),
                data,
            },
        );
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<ConnectionEvent> {
        self.network
            .state
            .borrow_mut()
            .queues
            .get_mut(&self.id)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    fn disconnect(&mut self, peer: &PeerId) {
        self.network.state.borrow_mut().unlink(&self.id, peer);
    }

    fn close(&mut self) {
        let mut state = self.network.state.borrow_mut();
        let peers: Vec<PeerId> = state
            .links
            .iter()
            .filter_map(|(a, b)| {
                if *a == self.id {
                    Some(b.clone())
                } else if *b == self.id {
                    Some(a.clone())
                } else {
                    None
                }
            })
            .collect();
        for peer in peers {
            state.unlink(&self.id, &peer);
        }
        state.open.remove(&self.id);
        state.queues.remove(&self.id);
        self.opened = false;
    }
}

/// Config with no start delay and the default 20 Hz tick
pub fn test_config() -> SessionConfig {
    SessionConfig::default().with_start_delay(instant::Duration::from_millis(0))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "neon_session_p2p=debug".into()),
        )
        .with_test_writer()
        .try_init();
}
