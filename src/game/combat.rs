//! Combat and hazard resolution - projectiles, hits, obstacle contact,
//! pickups and status-effect expiry

use std::time::Duration;

use super::collision::{in_bounds, overlaps, sweep_overlaps, Point};
use super::round;
use super::world::{PickupKind, PlayerId, WeaponMode, World};
use super::{DeathCause, GameEvent};

/// Combat system running the ordered per-tick resolution
pub struct CombatSystem;

impl CombatSystem {
    /// Resolve one simulation tick in order:
    /// projectile travel, projectile/obstacle hits, obstacle contact,
    /// projectile/player hits, pickups, status expiry.
    ///
    /// Combat freezes as soon as a winner exists, including mid-tick.
    pub fn resolve(world: &mut World, now: Duration, dt: Duration, events: &mut Vec<GameEvent>) {
        if !world.round.in_progress() {
            return;
        }

        Self::advance_projectiles(world, dt);
        Self::collide_projectiles_with_obstacles(world);
        Self::apply_obstacle_contact(world, now, dt, events);
        if !world.round.in_progress() {
            return;
        }
        Self::collide_projectiles_with_players(world, now, events);
        if !world.round.in_progress() {
            return;
        }
        Self::collect_pickups(world, now, events);
        Self::refresh_status(world, now);
    }

    /// Step 1: move every projectile and drop the ones that left the field
    fn advance_projectiles(world: &mut World, dt: Duration) {
        if world.projectiles.is_empty() {
            return;
        }
        let step = world.config.projectile_speed * dt.as_secs_f32();
        for projectile in world.projectiles.iter_mut() {
            projectile.previous = projectile.position;
            projectile.position = projectile.position.offset(projectile.heading, step);
        }
        world.projectiles.retain(|b| in_bounds(b.position));
        world.dirty.projectiles = true;
    }

    /// Step 2: projectiles whose path this tick touched an obstacle are destroyed
    fn collide_projectiles_with_obstacles(world: &mut World) {
        let obstacles = &world.obstacles;
        let before = world.projectiles.len();
        world.projectiles.retain(|b| {
            !obstacles
                .iter()
                .any(|o| sweep_overlaps(b.previous, b.position, o.position, o.radius))
        });
        if world.projectiles.len() != before {
            world.dirty.projectiles = true;
        }
    }

    /// Step 3: sustained obstacle contact drains hit points
    fn apply_obstacle_contact(
        world: &mut World,
        now: Duration,
        dt: Duration,
        events: &mut Vec<GameEvent>,
    ) {
        let reach = world.config.player_radius;
        let grace = world.config.contact_grace;
        let interval = world.config.contact_interval;
        let ids: Vec<PlayerId> = world.players.keys().copied().collect();

        for id in ids {
            let touching = match world.players.get(&id) {
                Some(p) if p.alive => match p.position {
                    Some(pos) => Self::touches_obstacle(world, pos, reach),
                    None => continue,
                },
                _ => continue,
            };

            let Some(player) = world.players.get_mut(&id) else {
                continue;
            };
            if !touching {
                if player.contact.elapsed > Duration::ZERO {
                    player.contact = Default::default();
                    world.dirty.players = true;
                }
                continue;
            }

            player.contact.elapsed += dt;
            world.dirty.players = true;
            let due = player.contact.damage_due(grace, interval);
            let mut dead = false;
            while player.contact.damage_applied < due {
                player.contact.damage_applied += 1;
                player.hp -= 1;
                events.push(GameEvent::ContactDamage {
                    player_id: id,
                    remaining_hp: player.hp,
                });
                if player.hp <= 0 {
                    dead = true;
                    break;
                }
            }

            if dead {
                round::kill(world, id, None, DeathCause::Obstacle, now, events);
                if !world.round.in_progress() {
                    return;
                }
            }
        }
    }

    fn touches_obstacle(world: &World, position: Point, reach: f32) -> bool {
        world
            .obstacles
            .iter()
            .any(|o| overlaps(position, o.position, o.radius + reach))
    }

    /// Step 4: first enemy projectile whose path this tick crossed a vulnerable
    /// player hits
    fn collide_projectiles_with_players(world: &mut World, now: Duration, events: &mut Vec<GameEvent>) {
        if world.projectiles.is_empty() {
            return;
        }
        let radius = world.config.player_radius;
        let ids: Vec<PlayerId> = world.players.keys().copied().collect();

        for id in ids {
            let Some(player) = world.players.get(&id) else {
                continue;
            };
            if !player.alive || player.is_invulnerable(now) {
                continue;
            }
            let Some(pos) = player.position else {
                continue;
            };

            let Some(index) = world.projectiles.iter().position(|b| {
                b.owner_id != id && sweep_overlaps(b.previous, b.position, pos, radius)
            }) else {
                continue;
            };

            let projectile = world.projectiles.remove(index);
            world.dirty.projectiles = true;
            world.dirty.players = true;

            let Some(target) = world.players.get_mut(&id) else {
                continue;
            };
            target.hp -= 1;
            let remaining_hp = target.hp;
            events.push(GameEvent::Hit {
                shooter_id: projectile.owner_id,
                target_id: id,
                projectile_id: projectile.id,
                remaining_hp,
            });

            if remaining_hp <= 0 {
                round::kill(
                    world,
                    id,
                    Some(projectile.owner_id),
                    DeathCause::Projectile,
                    now,
                    events,
                );
                if !world.round.in_progress() {
                    return;
                }
            }
        }
    }

    /// Step 5: live players collect every pickup they touch
    fn collect_pickups(world: &mut World, now: Duration, events: &mut Vec<GameEvent>) {
        if world.pickups.is_empty() {
            return;
        }
        let reach = world.config.pickup_radius;
        let ids: Vec<PlayerId> = world.players.keys().copied().collect();

        for id in ids {
            let pos = match world.players.get(&id) {
                Some(p) if p.alive => match p.position {
                    Some(pos) => pos,
                    None => continue,
                },
                _ => continue,
            };

            let mut index = 0;
            while index < world.pickups.len() {
                if !overlaps(pos, world.pickups[index].position, reach) {
                    index += 1;
                    continue;
                }
                let pickup = world.pickups.remove(index);
                Self::apply_pickup(world, id, pickup.kind, now);
                world.dirty.pickups = true;
                world.dirty.players = true;
                events.push(GameEvent::PickupCollected {
                    player_id: id,
                    pickup_id: pickup.id,
                    kind: pickup.kind,
                });
            }
        }
    }

    fn apply_pickup(world: &mut World, id: PlayerId, kind: PickupKind, now: Duration) {
        let config = &world.config;
        let Some(player) = world.players.get_mut(&id) else {
            return;
        };
        match kind {
            PickupKind::Heal => {
                player.hp = (player.hp + config.heal_amount).min(config.max_hp);
            }
            PickupKind::Invulnerability => {
                player.invulnerable_until = Some(now + config.invulnerability_duration);
            }
            PickupKind::LaserWeapon => {
                player.weapon = WeaponMode::Laser;
                player.weapon_until = Some(now + config.laser_duration);
            }
        }
    }

    /// Step 6: recompute derived invulnerability and expire the laser
    fn refresh_status(world: &mut World, now: Duration) {
        let mut changed = false;
        for player in world.players.values_mut() {
            let invulnerable = player.is_invulnerable(now);
            if invulnerable != player.invulnerable {
                player.invulnerable = invulnerable;
                changed = true;
            }
            if player.weapon == WeaponMode::Laser && player.weapon_at(now) == WeaponMode::Default {
                player.weapon = WeaponMode::Default;
                player.weapon_until = None;
                changed = true;
            }
        }
        if changed {
            world.dirty.players = true;
        }
    }
}
