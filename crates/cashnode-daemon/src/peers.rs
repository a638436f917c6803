//! Connected peers: outbound queues, misbehavior scores and inventory
//! broadcast.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use cashnode_types::{Inventory, InventorySink, MisbehaviorSink, PeerId, PeerInfo};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::message::NetMessage;

/// Score at which a peer is disconnected.
pub const BAN_THRESHOLD: u32 = 100;

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("connection limit of {0} reached")]
    TooManyConnections(usize),
}

struct PeerState {
    info: PeerInfo,
    misbehavior: u32,
    outbox: mpsc::UnboundedSender<NetMessage>,
}

/// Registry of connected peers.
pub struct PeerRegistry {
    peers: RwLock<HashMap<PeerId, PeerState>>,
    next_id: AtomicI64,
    max_connections: usize,
}

impl PeerRegistry {
    pub fn new(max_connections: usize) -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            max_connections,
        }
    }

    /// Register a peer. Messages queued for it arrive on the returned
    /// receiver.
    pub fn connect(
        &self,
        relay_txes: bool,
    ) -> Result<(PeerId, mpsc::UnboundedReceiver<NetMessage>), PeerError> {
        let mut peers = self.peers.write();
        if peers.len() >= self.max_connections {
            return Err(PeerError::TooManyConnections(self.max_connections));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (outbox, inbox) = mpsc::unbounded_channel();
        peers.insert(
            id,
            PeerState {
                info: PeerInfo { id, relay_txes },
                misbehavior: 0,
                outbox,
            },
        );
        info!(peer = id, relay_txes, "peer connected");
        Ok((id, inbox))
    }

    pub fn disconnect(&self, id: PeerId) {
        if self.peers.write().remove(&id).is_some() {
            info!(peer = id, "peer disconnected");
        }
    }

    /// Queue `msg` for `id`. False if the peer is gone.
    pub fn send(&self, id: PeerId, msg: NetMessage) -> bool {
        let peers = self.peers.read();
        match peers.get(&id) {
            Some(peer) => peer.outbox.send(msg).is_ok(),
            None => false,
        }
    }

    pub fn misbehavior(&self, id: PeerId) -> Option<u32> {
        self.peers.read().get(&id).map(|peer| peer.misbehavior)
    }

    pub fn is_connected(&self, id: PeerId) -> bool {
        self.peers.read().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.peers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.read().is_empty()
    }
}

impl MisbehaviorSink for PeerRegistry {
    fn misbehaving(&self, peer: PeerId, points: u32, reason: &str) {
        let mut peers = self.peers.write();
        let Some(state) = peers.get_mut(&peer) else {
            return;
        };
        state.misbehavior = state.misbehavior.saturating_add(points);
        let score = state.misbehavior;
        debug!(peer, points, score, reason, "peer misbehaving");
        if score >= BAN_THRESHOLD {
            warn!(peer, score, reason, "banning misbehaving peer");
            peers.remove(&peer);
        }
    }
}

impl InventorySink for PeerRegistry {
    fn broadcast_inventory(&self, inv: Inventory, filter: &dyn Fn(&PeerInfo) -> bool) {
        let peers = self.peers.read();
        for peer in peers.values().filter(|peer| filter(&peer.info)) {
            let _ = peer.outbox.send(NetMessage::Inv(vec![inv]));
        }
    }
}
