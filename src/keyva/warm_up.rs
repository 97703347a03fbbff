/*!
 * Engine Warm-Up
 *
 * Some hosts (Safari 14) leave engine requests hanging while the engine
 * starts. The only cure is to keep nudging it: issue a database listing
 * every 50ms until any one of them settles.
 */

use futures::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info};

use super::engine::Engine;
use crate::core::limits::KEYVA_WARM_UP_INTERVAL;

/// Check whether the host identified by `user_agent` needs warming up
///
/// Matches `Version/14.<digits><whitespace>Safari/`.
pub fn needs_warm_up(user_agent: &str) -> bool {
    const MARKER: &str = "Version/14.";

    user_agent.match_indices(MARKER).any(|(index, _)| {
        let rest = &user_agent[index + MARKER.len()..];
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit());
        let rest = rest.trim_start_matches(char::is_whitespace);
        rest.starts_with("Safari/")
    })
}

/// Poll `engine` until it answers, when its host needs it
///
/// Returns immediately for every other host. Completes when the first
/// listing settles, successfully or not.
pub async fn warm_up(engine: &dyn Engine) {
    match engine.user_agent() {
        Some(user_agent) if needs_warm_up(&user_agent) => {}
        _ => return,
    }

    info!("warming up storage engine");
    let mut interval = tokio::time::interval(KEYVA_WARM_UP_INTERVAL);
    let mut polls = FuturesUnordered::new();

    loop {
        tokio::select! {
            Some(_) = polls.next(), if !polls.is_empty() => break,
            _ = interval.tick() => polls.push(engine.databases()),
        }
    }
    debug!(pending = polls.len(), "storage engine awake");
}
