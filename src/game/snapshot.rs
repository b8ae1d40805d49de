//! Snapshot building - dirty-partition tracking and state messages

use std::collections::BTreeMap;
use std::time::Duration;

use crate::ws::protocol::{
    FieldInfo, ObstacleSnapshot, PickupSnapshot, PlayerSnapshot, ProjectileSnapshot, ServerMsg,
};

use super::collision::{FIELD_HEIGHT, FIELD_WIDTH};
use super::world::{Player, PlayerId, World};

/// Per-partition change markers, set by mutations and drained by broadcasts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFlags {
    pub players: bool,
    pub projectiles: bool,
    pub round: bool,
    pub obstacles: bool,
    pub pickups: bool,
}

impl DirtyFlags {
    pub fn all() -> Self {
        Self {
            players: true,
            projectiles: true,
            round: true,
            obstacles: true,
            pickups: true,
        }
    }

    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }

    /// Return the current flags and clear them
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

/// Builds partitioned state messages for network transmission
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    /// Broadcast ticks that emitted at least one partition
    pub broadcasts_sent: u64,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the world's dirty flags and build one message per dirty partition
    pub fn build(&mut self, world: &mut World, now: Duration) -> Vec<ServerMsg> {
        let dirty = world.dirty.take();
        if dirty.is_clean() {
            return Vec::new();
        }

        let mut messages = Vec::with_capacity(5);
        if dirty.players {
            messages.push(players_msg(world, now));
        }
        if dirty.projectiles {
            messages.push(projectiles_msg(world));
        }
        if dirty.round {
            messages.push(round_msg(world));
        }
        if dirty.obstacles {
            messages.push(ServerMsg::Obstacles {
                obstacles: obstacle_snapshots(world),
            });
        }
        if dirty.pickups {
            messages.push(ServerMsg::Pickups {
                pickups: pickup_snapshots(world, now),
            });
        }

        self.broadcasts_sent += 1;
        messages
    }
}

/// Direct reply to a join: the newcomer's identity plus static layout
pub fn welcome_msg(world: &World, player_id: PlayerId, now: Duration) -> Option<ServerMsg> {
    let player = world.players.get(&player_id)?;
    Some(ServerMsg::Welcome {
        player_id,
        team: player.team,
        field: FieldInfo {
            width: FIELD_WIDTH,
            height: FIELD_HEIGHT,
        },
        obstacles: obstacle_snapshots(world),
        pickups: pickup_snapshots(world, now),
    })
}

pub fn players_msg(world: &World, now: Duration) -> ServerMsg {
    let players: BTreeMap<_, _> = world
        .players
        .values()
        .map(|p| (p.id, player_snapshot(p, now)))
        .collect();
    ServerMsg::Players { players }
}

pub fn projectiles_msg(world: &World) -> ServerMsg {
    ServerMsg::Projectiles {
        projectiles: world
            .projectiles
            .iter()
            .map(|b| ProjectileSnapshot {
                id: b.id,
                x: b.position.x,
                y: b.position.y,
                angle: b.heading,
                owner: b.owner_id,
                kind: b.kind,
            })
            .collect(),
    }
}

pub fn round_msg(world: &World) -> ServerMsg {
    ServerMsg::Round {
        scores: world.round.scores,
        winner: world.round.winner,
    }
}

fn obstacle_snapshots(world: &World) -> Vec<ObstacleSnapshot> {
    world
        .obstacles
        .iter()
        .map(|o| ObstacleSnapshot {
            x: o.position.x,
            y: o.position.y,
            r: o.radius,
        })
        .collect()
}

fn pickup_snapshots(world: &World, now: Duration) -> Vec<PickupSnapshot> {
    world
        .pickups
        .iter()
        .map(|item| PickupSnapshot {
            id: item.id,
            kind: item.kind,
            x: item.position.x,
            y: item.position.y,
            age_ms: now.saturating_sub(item.created_at).as_millis() as u64,
        })
        .collect()
}

fn remaining_ms(deadline: Option<Duration>, now: Duration) -> Option<u64> {
    deadline
        .filter(|d| *d > now)
        .map(|d| (d - now).as_millis() as u64)
}

fn player_snapshot(p: &Player, now: Duration) -> PlayerSnapshot {
    PlayerSnapshot {
        nickname: p.nickname.clone(),
        color: p.color.clone(),
        team: p.team,
        x: p.position.map(|pos| pos.x),
        y: p.position.map(|pos| pos.y),
        hp: p.hp.max(0),
        alive: p.alive,
        kills: p.kills,
        respawn_in_ms: if p.alive {
            None
        } else {
            p.respawn_at.map(|at| at.saturating_sub(now).as_millis() as u64)
        },
        obstacle_contact_secs: p.contact.elapsed.as_secs_f32(),
        invulnerable: p.invulnerable,
        invulnerable_ms: remaining_ms(p.invulnerable_until, now),
        weapon: p.weapon,
        weapon_ms: remaining_ms(p.weapon_until, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::tests::{join, test_world};

    fn kinds(messages: &[ServerMsg]) -> Vec<&'static str> {
        messages
            .iter()
            .map(|m| match m {
                ServerMsg::Welcome { .. } => "welcome",
                ServerMsg::Players { .. } => "players",
                ServerMsg::Projectiles { .. } => "projectiles",
                ServerMsg::Round { .. } => "round",
                ServerMsg::Obstacles { .. } => "obstacles",
                ServerMsg::Pickups { .. } => "pickups",
            })
            .collect()
    }

    #[test]
    fn first_broadcast_sends_everything_then_nothing() {
        let mut world = test_world();
        let mut builder = SnapshotBuilder::new();

        let first = builder.build(&mut world, Duration::ZERO);
        assert_eq!(
            kinds(&first),
            vec!["players", "projectiles", "round", "obstacles", "pickups"]
        );

        let second = builder.build(&mut world, Duration::ZERO);
        assert!(second.is_empty());
        assert_eq!(builder.broadcasts_sent, 1);
    }

    #[test]
    fn only_dirty_partitions_are_emitted() {
        let mut world = test_world();
        let mut builder = SnapshotBuilder::new();
        builder.build(&mut world, Duration::ZERO);

        let id = join(&mut world, "solo");
        world.fire(id, 0.0, Duration::ZERO).unwrap();
        let msgs = builder.build(&mut world, Duration::ZERO);
        assert_eq!(kinds(&msgs), vec!["players", "projectiles", "round"]);
        assert!(world.dirty.is_clean());
    }

    #[test]
    fn dead_player_snapshot_has_no_position() {
        let mut world = test_world();
        let id = join(&mut world, "dead");
        {
            let p = world.players.get_mut(&id).unwrap();
            p.alive = false;
            p.position = None;
            p.hp = -1;
            p.respawn_at = Some(Duration::from_secs(12));
        }

        let ServerMsg::Players { players } = players_msg(&world, Duration::from_secs(2)) else {
            panic!("expected players message");
        };
        let snap = &players[&id];
        assert_eq!(snap.x, None);
        assert_eq!(snap.y, None);
        assert_eq!(snap.hp, 0);
        assert_eq!(snap.respawn_in_ms, Some(10_000));
    }

    #[test]
    fn welcome_includes_layout() {
        let mut world = test_world();
        let id = join(&mut world, "new");
        let Some(ServerMsg::Welcome { player_id, obstacles, field, .. }) =
            welcome_msg(&world, id, Duration::ZERO)
        else {
            panic!("expected welcome");
        };
        assert_eq!(player_id, id);
        assert_eq!(obstacles.len(), world.obstacles.len());
        assert_eq!(field.width, FIELD_WIDTH);
    }
}
