//! Result recorder task
//!
//! Matches enqueue their terminal outcome and move on; this task owns the
//! slow path. Persistence failures are retried with capped backoff and
//! never affect in-memory match cleanup.

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::results::{MatchResult, ResultsClient};

const MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);

/// Drain results until every match-side sender is gone
pub async fn run(mut results_rx: mpsc::Receiver<MatchResult>, client: ResultsClient) {
    while let Some(result) = results_rx.recv().await {
        record_with_retry(&client, &result).await;
    }
    info!("Result recorder stopped");
}

async fn record_with_retry(client: &ResultsClient, result: &MatchResult) {
    let mut backoff = INITIAL_BACKOFF;

    for attempt in 1..=MAX_ATTEMPTS {
        match client.record(result).await {
            Ok(()) => {
                info!(
                    match_id = %result.match_id,
                    winner = %result.winner,
                    "Match result recorded"
                );
                return;
            }
            Err(e) if attempt < MAX_ATTEMPTS => {
                warn!(
                    match_id = %result.match_id,
                    attempt,
                    error = %e,
                    "Failed to record match result, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(e) => {
                error!(
                    match_id = %result.match_id,
                    error = %e,
                    "Giving up on recording match result"
                );
            }
        }
    }
}
