//! Matchmaker - pairs connections into matches at connect time

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GameSettings;
use crate::game::{GameMatch, MatchInput, MatchRegistry};
use crate::store::results::MatchResult;
use crate::ws::protocol::{ServerMsg, Side};

use super::queue::{WaitingQueue, WaitingTicket};

/// Everything a connection needs to participate in its match
pub struct MatchAssignment {
    pub match_id: Uuid,
    pub side: Side,
    /// Input entry point; the only way a connection mutates match state
    pub input_tx: mpsc::Sender<MatchInput>,
    /// Outbound match events for this connection to forward
    pub events: broadcast::Receiver<ServerMsg>,
}

/// Outcome of a pairing request
pub enum Pairing {
    /// An opponent was waiting; the match is running
    Matched(MatchAssignment),
    /// No opponent yet; the assignment arrives on this channel when one
    /// connects, or never if the player disconnects first
    Queued(oneshot::Receiver<MatchAssignment>),
}

/// Pairs waiting connections into new matches.
/// The queue holds at most one ticket at a time under this pairing rule,
/// but stays a proper FIFO so ordering survives future multi-queue rules.
pub struct Matchmaker {
    queue: Mutex<WaitingQueue>,
    registry: Arc<MatchRegistry>,
    results_tx: mpsc::Sender<MatchResult>,
    settings: GameSettings,
}

impl Matchmaker {
    pub fn new(
        registry: Arc<MatchRegistry>,
        results_tx: mpsc::Sender<MatchResult>,
        settings: GameSettings,
    ) -> Self {
        Self {
            queue: Mutex::new(WaitingQueue::new()),
            registry,
            results_tx,
            settings,
        }
    }

    /// Pair the caller with the oldest waiting player, or park it in the
    /// queue if nobody is waiting. The queued-first player is always
    /// player_1. Atomic with respect to concurrent connects and cancels.
    pub fn enqueue_or_pair(&self, player_id: Uuid) -> Pairing {
        let mut queue = self.queue.lock();

        if let Some(ticket) = queue.pop_live() {
            let waited = ticket.wait_time();
            let (for_waiter, for_caller) = self.create_match(ticket.player_id, player_id);
            let match_id = for_caller.match_id;

            info!(
                match_id = %match_id,
                player_1 = %ticket.player_id,
                player_2 = %player_id,
                waited_ms = waited.as_millis() as u64,
                "Paired players into match"
            );

            if let Err(assignment) = ticket.assign_tx.send(for_waiter) {
                // The waiter hung up between the liveness check and delivery;
                // its side forfeits immediately.
                warn!(
                    match_id = %match_id,
                    player_id = %ticket.player_id,
                    "Waiting player vanished during pairing, forfeiting their side"
                );
                let _ = assignment.input_tx.try_send(MatchInput::Disconnect {
                    side: Side::Player1,
                });
            }

            return Pairing::Matched(for_caller);
        }

        let (assign_tx, assign_rx) = oneshot::channel();
        queue.push(WaitingTicket::new(player_id, assign_tx));
        info!(player_id = %player_id, "Queued for matchmaking");
        Pairing::Queued(assign_rx)
    }

    /// Remove a player's waiting ticket. No-op if the player was already
    /// paired or never queued.
    pub fn cancel(&self, player_id: Uuid) {
        let mut queue = self.queue.lock();
        if queue.remove(player_id).is_some() {
            info!(player_id = %player_id, "Removed from matchmaking queue");
        }
    }

    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Create and start a match, returning one assignment per side
    fn create_match(&self, player_1: Uuid, player_2: Uuid) -> (MatchAssignment, MatchAssignment) {
        let match_id = Uuid::new_v4();
        let seed = rand::random::<u64>();

        let (game_match, handle) = GameMatch::new(
            match_id,
            [player_1, player_2],
            seed,
            self.settings,
            self.registry.clone(),
            self.results_tx.clone(),
        );

        // Register before the first tick so the loop sees itself registered
        self.registry.insert(handle.clone());
        tokio::spawn(game_match.run());

        let assignment = |side: Side| MatchAssignment {
            match_id,
            side,
            input_tx: handle.input_tx.clone(),
            events: handle.events_tx.subscribe(),
        };

        (assignment(Side::Player1), assignment(Side::Player2))
    }
}
