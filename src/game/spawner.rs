//! Obstacle layout generation and the periodic pickup spawner

use std::time::Duration;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::GameConfig;

use super::collision::{overlaps, Point, FIELD_HEIGHT, FIELD_WIDTH};
use super::world::{Obstacle, Pickup, PickupKind, World};
use super::GameEvent;

fn inset_position(rng: &mut ChaCha8Rng, inset: f32) -> Point {
    Point::new(
        rng.gen_range(inset..FIELD_WIDTH - inset),
        rng.gen_range(inset..FIELD_HEIGHT - inset),
    )
}

/// Place `obstacle_count` obstacles that keep `obstacle_margin` between edges.
///
/// Each obstacle gets `obstacle_retries` attempts; when they run out the last
/// candidate is accepted as-is.
pub fn generate_obstacles(rng: &mut ChaCha8Rng, config: &GameConfig) -> Vec<Obstacle> {
    let (min_r, max_r) = config.obstacle_radius;
    let mut placed: Vec<Obstacle> = Vec::with_capacity(config.obstacle_count);

    while placed.len() < config.obstacle_count {
        let mut attempts = 0;
        let accepted = loop {
            attempts += 1;
            let candidate = Obstacle {
                position: inset_position(rng, config.placement_inset),
                radius: rng.gen_range(min_r..max_r),
            };
            let clear = placed.iter().all(|o| {
                !overlaps(
                    o.position,
                    candidate.position,
                    o.radius + candidate.radius + config.obstacle_margin,
                )
            });
            if clear {
                break candidate;
            }
            if attempts >= config.obstacle_retries {
                debug!(attempts, "Obstacle placement exhausted, placing best-effort");
                break candidate;
            }
        };
        placed.push(accepted);
    }

    placed
}

/// Pick a pickup position clear of every obstacle, best-effort after retries
pub fn pickup_position(rng: &mut ChaCha8Rng, obstacles: &[Obstacle], config: &GameConfig) -> Point {
    let mut candidate = inset_position(rng, config.placement_inset);
    for _ in 0..config.pickup_retries {
        let blocked = obstacles.iter().any(|o| {
            overlaps(
                candidate,
                o.position,
                o.radius + config.pickup_obstacle_margin,
            )
        });
        if !blocked {
            break;
        }
        candidate = inset_position(rng, config.placement_inset);
    }
    candidate
}

/// Spawn a pickup if the spawn interval has elapsed and the round is running
pub fn spawn_due(world: &mut World, now: Duration) -> Option<GameEvent> {
    if now < world.schedule.next_pickup_at {
        return None;
    }
    world.schedule.next_pickup_at = now + world.config.pickup_interval;
    if !world.round.in_progress() {
        return None;
    }

    let kind = *PickupKind::ALL.choose(&mut world.rng)?;
    let position = pickup_position(&mut world.rng, &world.obstacles, &world.config);
    let id = world.next_id();
    world.pickups.push(Pickup {
        id,
        kind,
        position,
        created_at: now,
    });
    world.dirty.pickups = true;

    Some(GameEvent::PickupSpawned { pickup_id: id, kind })
}

/// Periodic sweep removing pickups older than their time-to-live.
/// Returns how many were removed.
pub fn sweep_expired(world: &mut World, now: Duration) -> usize {
    if now < world.schedule.next_sweep_at {
        return 0;
    }
    world.schedule.next_sweep_at = now + world.config.pickup_sweep_interval;

    let ttl = world.config.pickup_ttl;
    let before = world.pickups.len();
    world
        .pickups
        .retain(|item| now.saturating_sub(item.created_at) <= ttl);
    let removed = before - world.pickups.len();
    if removed > 0 {
        world.dirty.pickups = true;
    }
    removed
}
