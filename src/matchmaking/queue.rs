//! Matchmaking queue implementation

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tokio::sync::oneshot;
use uuid::Uuid;

use super::service::MatchAssignment;

/// A queued, not-yet-paired player awaiting an opponent
pub struct WaitingTicket {
    pub player_id: Uuid,
    /// Delivers the pairing assignment once an opponent arrives
    pub assign_tx: oneshot::Sender<MatchAssignment>,
    pub queued_at: Instant,
}

impl WaitingTicket {
    pub fn new(player_id: Uuid, assign_tx: oneshot::Sender<MatchAssignment>) -> Self {
        Self {
            player_id,
            assign_tx,
            queued_at: Instant::now(),
        }
    }

    /// How long this player has been waiting
    pub fn wait_time(&self) -> Duration {
        self.queued_at.elapsed()
    }
}

/// FIFO queue of waiting tickets
#[derive(Default)]
pub struct WaitingQueue {
    queue: VecDeque<WaitingTicket>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Add a ticket to the back of the queue. A player reconnecting while
    /// still queued replaces their stale ticket.
    pub fn push(&mut self, ticket: WaitingTicket) {
        self.queue.retain(|t| t.player_id != ticket.player_id);
        self.queue.push_back(ticket);
    }

    /// Pop the oldest ticket whose waiter is still listening.
    /// Tickets whose connection hung up are discarded along the way.
    pub fn pop_live(&mut self) -> Option<WaitingTicket> {
        while let Some(ticket) = self.queue.pop_front() {
            if !ticket.assign_tx.is_closed() {
                return Some(ticket);
            }
        }
        None
    }

    /// Remove a player's ticket (disconnect while waiting)
    pub fn remove(&mut self, player_id: Uuid) -> Option<WaitingTicket> {
        let pos = self.queue.iter().position(|t| t.player_id == player_id)?;
        self.queue.remove(pos)
    }

    pub fn contains(&self, player_id: &Uuid) -> bool {
        self.queue.iter().any(|t| &t.player_id == player_id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticket(player_id: Uuid) -> (WaitingTicket, oneshot::Receiver<MatchAssignment>) {
        let (tx, rx) = oneshot::channel();
        (WaitingTicket::new(player_id, tx), rx)
    }

    #[test]
    fn pops_in_fifo_order() {
        let mut queue = WaitingQueue::new();
        let ids: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let _rxs: Vec<_> = ids
            .iter()
            .map(|id| {
                let (t, rx) = ticket(*id);
                queue.push(t);
                rx
            })
            .collect();

        assert_eq!(queue.pop_live().map(|t| t.player_id), Some(ids[0]));
        assert_eq!(queue.pop_live().map(|t| t.player_id), Some(ids[1]));
        assert_eq!(queue.pop_live().map(|t| t.player_id), Some(ids[2]));
        assert!(queue.pop_live().is_none());
    }

    #[test]
    fn pop_skips_tickets_whose_waiter_hung_up() {
        let mut queue = WaitingQueue::new();
        let dead = Uuid::new_v4();
        let live = Uuid::new_v4();

        let (t, rx) = ticket(dead);
        queue.push(t);
        drop(rx);
        let (t, _rx) = ticket(live);
        queue.push(t);

        assert_eq!(queue.pop_live().map(|t| t.player_id), Some(live));
        assert!(queue.is_empty());
    }

    #[test]
    fn remove_takes_out_a_queued_player() {
        let mut queue = WaitingQueue::new();
        let id = Uuid::new_v4();
        let (t, _rx) = ticket(id);
        queue.push(t);

        assert!(queue.contains(&id));
        assert!(queue.remove(id).is_some());
        assert!(!queue.contains(&id));
        assert!(queue.remove(id).is_none());
    }

    #[test]
    fn requeue_replaces_stale_ticket() {
        let mut queue = WaitingQueue::new();
        let id = Uuid::new_v4();
        let (t, _rx1) = ticket(id);
        queue.push(t);
        let (t, _rx2) = ticket(id);
        queue.push(t);

        assert_eq!(queue.len(), 1);
    }
}
