//! Game simulation modules

pub mod collision;
pub mod combat;
pub mod round;
pub mod server;
pub mod snapshot;
pub mod spawner;
pub mod world;

pub use server::{Command, GameHandle, GameServer};
pub use world::World;

use std::time::Duration;

use uuid::Uuid;

use self::combat::CombatSystem;
use self::world::{PickupKind, PlayerId, Team, TeamScores};

/// What ended a player's life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeathCause {
    Projectile,
    Obstacle,
}

/// Notable outcomes of a tick, used for logging
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Hit {
        shooter_id: PlayerId,
        target_id: PlayerId,
        projectile_id: u64,
        remaining_hp: i32,
    },
    ContactDamage {
        player_id: PlayerId,
        remaining_hp: i32,
    },
    Death {
        victim_id: PlayerId,
        killer_id: Option<PlayerId>,
        cause: DeathCause,
    },
    PickupSpawned {
        pickup_id: u64,
        kind: PickupKind,
    },
    PickupCollected {
        player_id: PlayerId,
        pickup_id: u64,
        kind: PickupKind,
    },
    RoundWon {
        winner: Team,
        scores: TeamScores,
    },
    RoundReset,
}

/// Reasons an intent is dropped. Never reported to clients.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IntentError {
    #[error("Malformed field: {0}")]
    MalformedField(&'static str),

    #[error("Unknown player {0}")]
    UnknownPlayer(Uuid),

    #[error("Player {0} is not alive")]
    PlayerDead(Uuid),

    #[error("Beam weapon of player {0} is cooling down")]
    WeaponCooling(Uuid),
}

/// Advance the world by one simulation tick.
///
/// A due reset runs first. While the round is finished combat and respawn
/// are frozen; the pickup schedule keeps its cadence but places nothing.
pub fn run_tick(world: &mut World, now: Duration, dt: Duration) -> Vec<GameEvent> {
    let mut events = Vec::new();

    round::reset_due(world, now, &mut events);

    if world.round.in_progress() {
        CombatSystem::resolve(world, now, dt, &mut events);
        round::respawn_due(world, now);
    }
    events.extend(spawner::spawn_due(world, now));
    spawner::sweep_expired(world, now);

    events
}
