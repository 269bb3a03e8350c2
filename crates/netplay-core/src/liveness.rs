//! Peer liveness monitoring.
//!
//! Tracks, per peer, when the last packet was acknowledged and moves the peer
//! through a small state machine:
//!
//! ```text
//!              packet received
//!        ┌─────────────────────────┐
//!        v                         │
//!   ┌───────────┐   gap > timeout  ┌──────────┐
//!   │ Connected │ ───────────────> │ TimedOut │
//!   └───────────┘                  └──────────┘
//!         │ explicit disconnect         │
//!         v                             v
//!   ┌──────────────────────────────────────────┐
//!   │          Disconnected (terminal)         │
//!   └──────────────────────────────────────────┘
//! ```
//!
//! The timeout is deliberately generous (30 s by default): a large folder
//! transfer can delay the next acknowledgement well past a round-trip time
//! without the link being dead.
//!
//! The peer table is a `DashMap`; every transition for a peer happens while
//! holding that peer's entry, so the receive path and the ticker never race.

use crate::clock::Clock;
use crate::config::LivenessConfig;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Stable identifier of a remote session participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u32);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

/// Liveness status of a peer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    /// Acknowledgements are arriving within the timeout
    Connected,

    /// No acknowledgement for longer than the timeout; revived by any packet
    TimedOut,

    /// Peer left the session; terminal
    Disconnected,
}

/// Snapshot of one peer's liveness record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerLiveness {
    /// Peer identifier
    pub peer_id: PeerId,
    /// Arrival time of the last acknowledged packet
    pub last_ack: Instant,
    /// Current status
    pub status: PeerStatus,
}

/// Notification delivered to the session layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessEvent {
    /// Peer went silent for longer than the timeout
    Lost {
        /// Peer identifier
        peer_id: PeerId,
        /// Gap since the last acknowledgement when the loss was detected
        silent_for: Duration,
    },

    /// A timed-out peer sent a packet again
    Restored {
        /// Peer identifier
        peer_id: PeerId,
    },

    /// Peer was explicitly disconnected
    Disconnected {
        /// Peer identifier
        peer_id: PeerId,
    },
}

impl LivenessEvent {
    /// Peer the event refers to
    pub fn peer_id(&self) -> PeerId {
        match self {
            Self::Lost { peer_id, .. }
            | Self::Restored { peer_id }
            | Self::Disconnected { peer_id } => *peer_id,
        }
    }
}

#[derive(Debug, Clone)]
struct PeerRecord {
    last_ack: Instant,
    status: PeerStatus,
}

impl PeerRecord {
    fn new(now: Instant) -> Self {
        Self {
            last_ack: now,
            status: PeerStatus::Connected,
        }
    }

    fn snapshot(&self, peer_id: PeerId) -> PeerLiveness {
        PeerLiveness {
            peer_id,
            last_ack: self.last_ack,
            status: self.status,
        }
    }

    /// Record an arrival; returns true if the peer came back from `TimedOut`
    fn record_packet(&mut self, now: Instant) -> bool {
        if now > self.last_ack {
            self.last_ack = now;
        }

        if self.status == PeerStatus::TimedOut {
            self.status = PeerStatus::Connected;
            return true;
        }
        false
    }

    /// Time out a connected peer whose gap exceeds `timeout`
    fn check_timeout(&mut self, now: Instant, timeout: Duration) -> Option<Duration> {
        if self.status != PeerStatus::Connected {
            return None;
        }

        let gap = now.saturating_duration_since(self.last_ack);
        if gap > timeout {
            self.status = PeerStatus::TimedOut;
            Some(gap)
        } else {
            None
        }
    }
}

/// Liveness monitor for all peers of a session
pub struct LivenessMonitor {
    /// Configuration
    config: LivenessConfig,

    /// Per-peer records
    peers: DashMap<PeerId, PeerRecord>,

    /// Optional event sink for the session layer
    events: Option<mpsc::UnboundedSender<LivenessEvent>>,
}

impl LivenessMonitor {
    /// Create a monitor that only reports events through return values
    pub fn new(config: LivenessConfig) -> Self {
        Self {
            config,
            peers: DashMap::new(),
            events: None,
        }
    }

    /// Create a monitor that also forwards every event to a channel
    pub fn with_events(config: LivenessConfig) -> (Self, mpsc::UnboundedReceiver<LivenessEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let monitor = Self {
            config,
            peers: DashMap::new(),
            events: Some(tx),
        };
        (monitor, rx)
    }

    /// Configured acknowledgement timeout
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Start tracking a peer as connected
    ///
    /// Returns false if the peer is already tracked (its record is left alone).
    pub fn add_peer(&self, peer_id: PeerId, now: Instant) -> bool {
        match self.peers.entry(peer_id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(PeerRecord::new(now));
                tracing::debug!("Tracking liveness of {}", peer_id);
                true
            }
        }
    }

    /// Stop tracking a peer, returning its last record
    pub fn remove_peer(&self, peer_id: PeerId) -> Option<PeerLiveness> {
        self.peers
            .remove(&peer_id)
            .map(|(id, record)| record.snapshot(id))
    }

    /// Record that a packet from `peer_id` arrived at `now`
    ///
    /// Unknown peers start being tracked as connected. Packets from a
    /// disconnected peer are ignored.
    pub fn on_packet_received(&self, peer_id: PeerId, now: Instant) -> Option<LivenessEvent> {
        let event = match self.peers.entry(peer_id) {
            Entry::Vacant(slot) => {
                slot.insert(PeerRecord::new(now));
                tracing::debug!("First packet from untracked {}", peer_id);
                None
            }
            Entry::Occupied(mut slot) => {
                let record = slot.get_mut();
                if record.status == PeerStatus::Disconnected {
                    tracing::debug!("Ignoring packet from disconnected {}", peer_id);
                    None
                } else if record.record_packet(now) {
                    Some(LivenessEvent::Restored { peer_id })
                } else {
                    None
                }
            }
        };

        if let Some(event) = &event {
            tracing::info!("{} is responsive again", peer_id);
            self.emit(event.clone());
        }
        event
    }

    /// Time out every connected peer silent for longer than the timeout
    pub fn tick(&self, now: Instant) -> Vec<LivenessEvent> {
        let timeout = self.config.timeout;
        let mut events = Vec::new();

        for mut entry in self.peers.iter_mut() {
            let peer_id = *entry.key();
            if let Some(silent_for) = entry.value_mut().check_timeout(now, timeout) {
                events.push(LivenessEvent::Lost {
                    peer_id,
                    silent_for,
                });
            }
        }

        for event in &events {
            if let LivenessEvent::Lost {
                peer_id,
                silent_for,
            } = event
            {
                tracing::warn!(
                    "{} timed out after {} ms without acknowledgement",
                    peer_id,
                    silent_for.as_millis()
                );
            }
            self.emit(event.clone());
        }

        events
    }

    /// Mark a peer as disconnected, from any state
    pub fn on_explicit_disconnect(&self, peer_id: PeerId) -> Option<LivenessEvent> {
        let mut record = self.peers.get_mut(&peer_id)?;
        if record.status == PeerStatus::Disconnected {
            return None;
        }
        record.status = PeerStatus::Disconnected;
        drop(record);

        tracing::info!("{} disconnected", peer_id);
        let event = LivenessEvent::Disconnected { peer_id };
        self.emit(event.clone());
        Some(event)
    }

    /// Current status of a peer
    pub fn status(&self, peer_id: PeerId) -> Option<PeerStatus> {
        self.peers.get(&peer_id).map(|r| r.status)
    }

    /// Current record of a peer
    pub fn snapshot(&self, peer_id: PeerId) -> Option<PeerLiveness> {
        self.peers.get(&peer_id).map(|r| r.snapshot(peer_id))
    }

    /// Records of all tracked peers, ordered by peer ID
    pub fn peers(&self) -> Vec<PeerLiveness> {
        let mut all: Vec<_> = self
            .peers
            .iter()
            .map(|entry| entry.value().snapshot(*entry.key()))
            .collect();
        all.sort_by_key(|p| p.peer_id);
        all
    }

    /// Number of tracked peers
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// True if no peers are tracked
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Run `tick` every `tick_interval` on a background task
    ///
    /// The task holds only a weak reference and exits once the monitor is
    /// dropped.
    pub fn spawn_ticker<C: Clock>(self: &Arc<Self>, clock: C) -> JoinHandle<()> {
        let monitor: Weak<Self> = Arc::downgrade(self);
        let period = self.config.tick_interval;

        tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            tracing::debug!("Liveness ticker started ({} ms)", period.as_millis());
            loop {
                timer.tick().await;
                let Some(monitor) = monitor.upgrade() else {
                    break;
                };
                monitor.tick(clock.now());
            }
            tracing::debug!("Liveness ticker stopped");
        })
    }

    fn emit(&self, event: LivenessEvent) {
        if let Some(tx) = &self.events {
            // Receiver gone means nobody is listening anymore
            let _ = tx.send(event);
        }
    }
}
