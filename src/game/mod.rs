//! Game simulation modules

pub mod r#match;
pub mod physics;

pub use r#match::{GameMatch, MatchHandle, MatchRegistry};

use crate::ws::protocol::Side;

/// Input delivered from a bound connection into its match.
/// The side is fixed at pairing time and carried explicitly, never derived
/// from the connection identity.
#[derive(Debug, Clone, Copy)]
pub enum MatchInput {
    /// Paddle position update for one side; the last write before a tick wins
    Move { side: Side, y_position: f32 },
    /// The side's transport closed
    Disconnect { side: Side },
}
