//! Match state and authoritative tick loop

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::GameSettings;
use crate::store::results::MatchResult;
use crate::ws::protocol::{BallSnapshot, PaddlePair, ScorePair, ServerMsg, Side, StateSnapshot};

use super::physics::{Ball, Physics, BALL_BASE_SPEED, COURT_CENTER, COURT_MAX, COURT_MIN};
use super::MatchInput;

/// Match lifecycle phase. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    /// Paired, tick loop not yet running
    Waiting,
    /// Simulation running
    InProgress,
    /// Terminal; no tick runs after this
    Finished,
}

/// Match state (owned by the match task)
pub struct MatchState {
    pub id: Uuid,
    /// Player ids by side ([0] = player_1, [1] = player_2), fixed at creation
    pub players: [Uuid; 2],
    pub phase: MatchPhase,
    pub tick: u64,
    pub ball: Ball,
    /// Scalar ball speed in court units per tick
    pub speed: f32,
    /// Paddle vertical positions by side, clamped to the court
    pub paddles: [f32; 2],
    pub score: [u32; 2],
    pub winner: Option<Side>,
    pub winning_score: u32,
    rng: ChaCha8Rng,
}

impl MatchState {
    pub fn new(id: Uuid, players: [Uuid; 2], seed: u64, winning_score: u32) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let ball = Physics::serve(&mut rng);
        Self {
            id,
            players,
            phase: MatchPhase::Waiting,
            tick: 0,
            ball,
            speed: BALL_BASE_SPEED,
            paddles: [COURT_CENTER, COURT_CENTER],
            score: [0, 0],
            winner: None,
            winning_score,
            rng,
        }
    }

    pub fn score_pair(&self) -> ScorePair {
        ScorePair {
            p1: self.score[0],
            p2: self.score[1],
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            ball: BallSnapshot {
                x: self.ball.x,
                y: self.ball.y,
                dx: self.ball.dx,
                dy: self.ball.dy,
                speed: self.speed,
            },
            paddles: PaddlePair {
                p1_y: self.paddles[0],
                p2_y: self.paddles[1],
            },
            score: self.score_pair(),
        }
    }
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    pub input_tx: mpsc::Sender<MatchInput>,
    pub events_tx: broadcast::Sender<ServerMsg>,
}

/// Registry of all active matches, used for input routing and lifecycle
/// cleanup. Removal is the authoritative cancellation signal for the
/// match's tick loop.
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.matches.contains_key(id)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    /// Every registered match holds exactly two bound players
    pub fn players_in_match(&self) -> usize {
        self.matches.len() * 2
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The authoritative game match
pub struct GameMatch {
    state: MatchState,
    input_rx: mpsc::Receiver<MatchInput>,
    events_tx: broadcast::Sender<ServerMsg>,
    registry: Arc<MatchRegistry>,
    results_tx: mpsc::Sender<MatchResult>,
    tick_interval: Duration,
}

impl GameMatch {
    /// Create a new match between two paired players
    pub fn new(
        id: Uuid,
        players: [Uuid; 2],
        seed: u64,
        settings: GameSettings,
        registry: Arc<MatchRegistry>,
        results_tx: mpsc::Sender<MatchResult>,
    ) -> (Self, MatchHandle) {
        let (input_tx, input_rx) = mpsc::channel(256);
        let (events_tx, _) = broadcast::channel(128);

        let handle = MatchHandle {
            id,
            input_tx,
            events_tx: events_tx.clone(),
        };

        let game_match = Self {
            state: MatchState::new(id, players, seed, settings.winning_score),
            input_rx,
            events_tx,
            registry,
            results_tx,
            tick_interval: Duration::from_micros(1_000_000 / settings.tick_hz as u64),
        };

        (game_match, handle)
    }

    /// Run the authoritative tick loop. Both players are live from creation,
    /// so the match enters InProgress immediately.
    pub async fn run(mut self) {
        self.state.phase = MatchPhase::InProgress;
        info!(
            match_id = %self.state.id,
            player_1 = %self.state.players[0],
            player_2 = %self.state.players[1],
            "Match started"
        );

        let mut ticker = interval(self.tick_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            // Registry removal cancels the loop even if the Finished
            // transition happened elsewhere (e.g. server shutdown sweep).
            if !self.registry.contains(&self.state.id) {
                if self.state.phase != MatchPhase::Finished {
                    warn!(match_id = %self.state.id, "Match unregistered externally, stopping loop");
                }
                break;
            }

            // Inputs received since the previous tick apply before physics
            self.process_inputs();
            if self.state.phase == MatchPhase::Finished {
                break;
            }

            self.run_tick();
            if self.state.phase == MatchPhase::Finished {
                break;
            }
        }

        info!(match_id = %self.state.id, ticks = self.state.tick, "Match task stopped");
    }

    /// Drain all pending inputs. Repeated moves for the same side
    /// overwrite each other; only the last position matters.
    fn process_inputs(&mut self) {
        while let Ok(input) = self.input_rx.try_recv() {
            match input {
                MatchInput::Move { side, y_position } => self.apply_move(side, y_position),
                MatchInput::Disconnect { side } => self.handle_disconnect(side),
            }
        }
    }

    /// Apply a paddle move for one side, clamped to the court
    fn apply_move(&mut self, side: Side, y_position: f32) {
        if self.state.phase != MatchPhase::InProgress {
            return;
        }
        self.state.paddles[side.index()] = y_position.clamp(COURT_MIN, COURT_MAX);
    }

    /// A side's transport dropped mid-match: the remaining side wins by
    /// forfeit and its score is forced to the winning threshold.
    fn handle_disconnect(&mut self, side: Side) {
        if self.state.phase != MatchPhase::InProgress {
            return;
        }
        let winner = side.opponent();
        info!(
            match_id = %self.state.id,
            disconnected = %self.state.players[side.index()],
            "Player disconnected, opponent wins by forfeit"
        );
        self.state.score[winner.index()] = self.state.winning_score;
        self.finish(winner, "Opponent disconnected");
    }

    /// Run a single simulation tick
    fn run_tick(&mut self) {
        self.state.tick += 1;

        Physics::advance(&mut self.state.ball, self.state.speed);
        Physics::reflect_walls(&mut self.state.ball);

        for side in [Side::Player1, Side::Player2] {
            let paddle_y = self.state.paddles[side.index()];
            if Physics::paddle_hit(&self.state.ball, paddle_y, side) {
                Physics::bounce(&mut self.state.ball, paddle_y, side);
                self.state.speed = Physics::grow_speed(self.state.speed);
            }
        }

        // Past a score line means the paddle was not there to intercept
        if self.state.ball.x <= COURT_MIN {
            self.award_point(Side::Player2);
        } else if self.state.ball.x >= COURT_MAX {
            self.award_point(Side::Player1);
        }

        if self.state.phase == MatchPhase::InProgress {
            let _ = self.events_tx.send(ServerMsg::StateUpdate {
                data: self.state.snapshot(),
            });
        }
    }

    /// Score a point for `side`, respawn the ball and check the win condition
    fn award_point(&mut self, side: Side) {
        self.state.score[side.index()] += 1;
        self.state.speed = BALL_BASE_SPEED;
        self.state.ball = Physics::serve(&mut self.state.rng);

        let _ = self.events_tx.send(ServerMsg::ScoreUpdate {
            score: self.state.score_pair(),
        });

        if self.state.score[side.index()] >= self.state.winning_score {
            self.finish(side, "Game over");
        }
    }

    /// Transition to Finished exactly once: record the result, broadcast the
    /// terminal event to both sides and unregister the match.
    fn finish(&mut self, winner: Side, message: &str) {
        if self.state.phase == MatchPhase::Finished {
            return;
        }
        self.state.phase = MatchPhase::Finished;
        self.state.winner = Some(winner);

        let winner_id = self.state.players[winner.index()];
        let result = MatchResult {
            match_id: self.state.id,
            player_1: self.state.players[0],
            player_2: self.state.players[1],
            player_1_score: self.state.score[0],
            player_2_score: self.state.score[1],
            winner: winner_id,
            completed_at: Utc::now(),
        };

        // Persistence never blocks match cleanup; a full recorder queue is
        // logged and the result dropped.
        if let Err(e) = self.results_tx.try_send(result) {
            warn!(match_id = %self.state.id, error = %e, "Failed to enqueue match result");
        }

        let _ = self.events_tx.send(ServerMsg::MatchEnd {
            message: message.to_string(),
            winner: Some(winner_id),
            final_score: Some(self.state.score_pair()),
        });

        self.registry.remove(&self.state.id);

        info!(
            match_id = %self.state.id,
            winner = %winner_id,
            p1_score = self.state.score[0],
            p2_score = self.state.score[1],
            "Match finished"
        );
    }
}
