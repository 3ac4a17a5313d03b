//! The simulation scheduler: two independent cadences over the shared
//! world, never driven by player input.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::world::World;

/// Run forever, resolving one combat round per combat tick and one respawn
/// sweep per repop tick.
pub async fn run(world: Arc<World>, combat_tick_ms: u64, repop_tick_ms: u64) {
    info!(combat_tick_ms, repop_tick_ms, "ticker running");

    let mut combat = tokio::time::interval(Duration::from_millis(combat_tick_ms));
    let mut repop = tokio::time::interval(Duration::from_millis(repop_tick_ms));
    // Swallow the immediate first fire of each interval; the first real
    // tick lands one full period after startup.
    combat.tick().await;
    repop.tick().await;

    loop {
        tokio::select! {
            _ = combat.tick() => world.combat_tick().await,
            _ = repop.tick() => world.respawn_tick().await,
        }
    }
}
