//! Player life-cycle (alive/dead/respawn) and round life-cycle (finish/reset)

use std::time::Duration;

use tracing::info;

use super::spawner;
use super::world::{ObstacleContact, PlayerId, Team, World};
use super::{DeathCause, GameEvent};

/// Team credited with a point when a player of `victim_team` dies
pub fn credited_team(victim_team: Team, cause: DeathCause) -> Team {
    match cause {
        DeathCause::Projectile => victim_team,
        DeathCause::Obstacle => victim_team.opponent(),
    }
}

/// Death transition: clear the position, schedule the respawn, credit the
/// score and finish the round if the credited team reached the goal.
///
/// Does nothing if the player is unknown or already dead.
pub fn kill(
    world: &mut World,
    victim_id: PlayerId,
    killer_id: Option<PlayerId>,
    cause: DeathCause,
    now: Duration,
    events: &mut Vec<GameEvent>,
) {
    let respawn_at = now + world.config.respawn_delay;
    let Some(victim) = world.players.get_mut(&victim_id) else {
        return;
    };
    if !victim.alive {
        return;
    }

    victim.alive = false;
    victim.position = None;
    victim.hp = victim.hp.max(0);
    victim.respawn_at = Some(respawn_at);
    victim.contact = ObstacleContact::default();
    let victim_team = victim.team;

    // The killer may have disconnected since firing
    let killer_id = killer_id.filter(|id| *id != victim_id && world.players.contains_key(id));
    if let Some(killer) = killer_id.and_then(|id| world.players.get_mut(&id)) {
        killer.kills += 1;
    }

    let credited = credited_team(victim_team, cause);
    let score = world.round.scores.credit(credited);
    world.dirty.players = true;
    world.dirty.round = true;

    events.push(GameEvent::Death {
        victim_id,
        killer_id,
        cause,
    });

    if score >= world.config.goal_score && world.round.winner.is_none() {
        finish(world, credited.opponent(), now, events);
    }
}

/// Declare the winner and schedule the reset. A pending reset is replaced.
pub fn finish(world: &mut World, winner: Team, now: Duration, events: &mut Vec<GameEvent>) {
    world.round.winner = Some(winner);
    world.round.reset_at = Some(now + world.config.reset_delay);
    world.dirty.round = true;

    info!(
        winner = ?winner,
        red = world.round.scores.red,
        blue = world.round.scores.blue,
        "Round finished"
    );
    events.push(GameEvent::RoundWon {
        winner,
        scores: world.round.scores,
    });
}

/// Revive every dead player whose deadline passed. Suppressed once a winner exists.
pub fn respawn_due(world: &mut World, now: Duration) -> usize {
    if !world.round.in_progress() {
        return 0;
    }

    let due: Vec<PlayerId> = world
        .players
        .values()
        .filter(|p| !p.alive && p.respawn_at.is_some_and(|at| now >= at))
        .map(|p| p.id)
        .collect();

    let max_hp = world.config.max_hp;
    for id in &due {
        let position = world.random_position();
        if let Some(player) = world.players.get_mut(id) {
            player.revive(position, max_hp);
        }
    }
    if !due.is_empty() {
        world.dirty.players = true;
    }
    due.len()
}

/// Run the scheduled reset if its deadline has passed
pub fn reset_due(world: &mut World, now: Duration, events: &mut Vec<GameEvent>) -> bool {
    match world.round.reset_at {
        Some(at) if now >= at => {
            reset(world);
            events.push(GameEvent::RoundReset);
            true
        }
        _ => false,
    }
}

/// Start a new round: zero scores, revive everyone, clear projectiles and
/// regenerate obstacles. Pickups, nicknames, teams and colours survive.
pub fn reset(world: &mut World) {
    world.round.scores = Default::default();
    world.round.winner = None;
    world.round.reset_at = None;

    let ids: Vec<PlayerId> = world.players.keys().copied().collect();
    let max_hp = world.config.max_hp;
    for id in ids {
        let position = world.random_position();
        if let Some(player) = world.players.get_mut(&id) {
            player.revive(position, max_hp);
            player.kills = 0;
        }
    }

    world.projectiles.clear();
    world.obstacles = spawner::generate_obstacles(&mut world.rng, &world.config);

    world.dirty.players = true;
    world.dirty.projectiles = true;
    world.dirty.round = true;
    world.dirty.obstacles = true;
    world.dirty.pickups = true;

    info!(players = world.players.len(), "Round reset");
}
