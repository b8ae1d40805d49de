//! World state store - the single owner of every entity and the round state

use std::collections::BTreeMap;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::GameConfig;

use super::collision::{clamp_to_field, Point, FIELD_HEIGHT, FIELD_WIDTH};
use super::snapshot::DirtyFlags;
use super::spawner;
use super::IntentError;

/// Connection id of the session that owns a player
pub type PlayerId = Uuid;

/// One of the two teams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn opponent(self) -> Self {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }
}

/// Active fire mode of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponMode {
    #[default]
    Default,
    Laser,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    Standard,
    Beam,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickupKind {
    Heal,
    Invulnerability,
    LaserWeapon,
}

impl PickupKind {
    pub const ALL: [PickupKind; 3] = [
        PickupKind::Heal,
        PickupKind::Invulnerability,
        PickupKind::LaserWeapon,
    ];
}

/// Sustained obstacle contact bookkeeping
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObstacleContact {
    /// Continuous contact time; zero when not touching
    pub elapsed: Duration,
    /// Contact damage points already applied during this contact
    pub damage_applied: u32,
}

impl ObstacleContact {
    /// Total damage points owed for the current contact
    pub fn damage_due(&self, grace: Duration, interval: Duration) -> u32 {
        if self.elapsed < grace {
            return 0;
        }
        let extra = self.elapsed - grace;
        let repeats = if interval.is_zero() {
            0
        } else {
            (extra.as_micros() / interval.as_micros()) as u32
        };
        1 + repeats
    }
}

/// Player state (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub nickname: String,
    pub color: String,
    pub team: Team,

    /// Absent exactly while dead
    pub position: Option<Point>,
    pub hp: i32,
    pub alive: bool,
    pub kills: u32,
    pub respawn_at: Option<Duration>,

    pub contact: ObstacleContact,

    pub invulnerable_until: Option<Duration>,
    /// Derived from `invulnerable_until` once per tick
    pub invulnerable: bool,

    pub weapon: WeaponMode,
    pub weapon_until: Option<Duration>,
    pub last_beam_at: Option<Duration>,
}

impl Player {
    fn new(id: PlayerId, nickname: String, color: String, team: Team, position: Point, hp: i32) -> Self {
        Self {
            id,
            nickname,
            color,
            team,
            position: Some(position),
            hp,
            alive: true,
            kills: 0,
            respawn_at: None,
            contact: ObstacleContact::default(),
            invulnerable_until: None,
            invulnerable: false,
            weapon: WeaponMode::Default,
            weapon_until: None,
            last_beam_at: None,
        }
    }

    pub fn is_invulnerable(&self, now: Duration) -> bool {
        self.invulnerable_until.is_some_and(|until| now < until)
    }

    /// Weapon mode in effect at `now`
    pub fn weapon_at(&self, now: Duration) -> WeaponMode {
        match (self.weapon, self.weapon_until) {
            (WeaponMode::Laser, Some(until)) if now <= until => WeaponMode::Laser,
            _ => WeaponMode::Default,
        }
    }

    /// Bring the player back to life at `position` with every timer cleared
    pub(crate) fn revive(&mut self, position: Point, hp: i32) {
        self.position = Some(position);
        self.hp = hp;
        self.alive = true;
        self.respawn_at = None;
        self.contact = ObstacleContact::default();
        self.invulnerable_until = None;
        self.invulnerable = false;
        self.weapon = WeaponMode::Default;
        self.weapon_until = None;
        self.last_beam_at = None;
    }
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub id: u64,
    pub position: Point,
    /// Position before the latest advance; hit tests sweep from here
    pub previous: Point,
    /// Radians
    pub heading: f32,
    pub owner_id: PlayerId,
    pub kind: ProjectileKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub position: Point,
    pub radius: f32,
}

#[derive(Debug, Clone)]
pub struct Pickup {
    pub id: u64,
    pub kind: PickupKind,
    pub position: Point,
    pub created_at: Duration,
}

/// Credited points per team
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamScores {
    pub red: u32,
    pub blue: u32,
}

impl TeamScores {
    /// Add one point and return the new total
    pub fn credit(&mut self, team: Team) -> u32 {
        let score = match team {
            Team::Red => &mut self.red,
            Team::Blue => &mut self.blue,
        };
        *score += 1;
        *score
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoundState {
    pub scores: TeamScores,
    /// Set exactly once per round
    pub winner: Option<Team>,
    /// Pending reset deadline
    pub reset_at: Option<Duration>,
}

impl RoundState {
    pub fn in_progress(&self) -> bool {
        self.winner.is_none()
    }
}

/// Next scheduled spawner activity
#[derive(Debug, Clone, Copy)]
pub struct SpawnSchedule {
    pub next_pickup_at: Duration,
    pub next_sweep_at: Duration,
}

/// Entity counts for monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorldCounts {
    pub players: usize,
    pub projectiles: usize,
    pub pickups: usize,
}

/// The single mutable source of game truth
pub struct World {
    pub config: GameConfig,
    pub players: BTreeMap<PlayerId, Player>,
    pub projectiles: Vec<Projectile>,
    pub obstacles: Vec<Obstacle>,
    pub pickups: Vec<Pickup>,
    pub round: RoundState,
    pub schedule: SpawnSchedule,
    pub dirty: DirtyFlags,
    pub(crate) rng: ChaCha8Rng,
    next_entity_id: u64,
}

impl World {
    /// Create a world with a fresh obstacle layout at simulation time `now`
    pub fn new(config: GameConfig, seed: u64, now: Duration) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let obstacles = spawner::generate_obstacles(&mut rng, &config);
        let schedule = SpawnSchedule {
            next_pickup_at: now + config.pickup_interval,
            next_sweep_at: now + config.pickup_sweep_interval,
        };

        Self {
            config,
            players: BTreeMap::new(),
            projectiles: Vec::new(),
            obstacles,
            pickups: Vec::new(),
            round: RoundState::default(),
            schedule,
            dirty: DirtyFlags::all(),
            rng,
            next_entity_id: 1,
        }
    }

    pub(crate) fn next_id(&mut self) -> u64 {
        let id = self.next_entity_id;
        self.next_entity_id = self.next_entity_id.wrapping_add(1);
        id
    }

    /// Uniformly random position anywhere on the field
    pub(crate) fn random_position(&mut self) -> Point {
        Point::new(
            self.rng.gen_range(0.0..FIELD_WIDTH),
            self.rng.gen_range(0.0..FIELD_HEIGHT),
        )
    }

    fn random_color(&mut self) -> String {
        format!("#{:06x}", self.rng.gen_range(0..0x100_0000u32))
    }

    /// Team with fewer members; red wins ties
    pub fn least_populated_team(&self) -> Team {
        let red = self.players.values().filter(|p| p.team == Team::Red).count();
        let blue = self.players.len() - red;
        if red <= blue {
            Team::Red
        } else {
            Team::Blue
        }
    }

    /// Admit a new player. Returns `None` when the id is already present.
    pub fn admit(&mut self, id: PlayerId, nickname: String) -> Option<&Player> {
        if self.players.contains_key(&id) {
            return None;
        }

        let team = self.least_populated_team();
        let position = self.random_position();
        let color = self.random_color();
        let player = Player::new(id, nickname, color, team, position, self.config.max_hp);

        self.dirty.players = true;
        self.dirty.round = true;
        Some(self.players.entry(id).or_insert(player))
    }

    /// Delete a player entirely
    pub fn remove(&mut self, id: PlayerId) -> Option<Player> {
        let removed = self.players.remove(&id);
        if removed.is_some() {
            self.dirty.players = true;
        }
        removed
    }

    /// Store a clamped move target for a live player
    pub fn move_player(&mut self, id: PlayerId, target: Point) -> Result<(), IntentError> {
        let player = self
            .players
            .get_mut(&id)
            .ok_or(IntentError::UnknownPlayer(id))?;
        if !player.alive {
            return Err(IntentError::PlayerDead(id));
        }

        player.position = Some(clamp_to_field(target));
        self.dirty.players = true;
        Ok(())
    }

    /// Spawn a projectile for `id` aimed along `heading`. Returns its id.
    pub fn fire(&mut self, id: PlayerId, heading: f32, now: Duration) -> Result<u64, IntentError> {
        let radius = self.config.player_radius;
        let beam_cooldown = self.config.beam_cooldown;

        let player = self
            .players
            .get_mut(&id)
            .ok_or(IntentError::UnknownPlayer(id))?;
        let origin = match (player.alive, player.position) {
            (true, Some(position)) => position,
            _ => return Err(IntentError::PlayerDead(id)),
        };

        let kind = match player.weapon_at(now) {
            WeaponMode::Laser => {
                if player
                    .last_beam_at
                    .is_some_and(|last| now < last + beam_cooldown)
                {
                    return Err(IntentError::WeaponCooling(id));
                }
                player.last_beam_at = Some(now);
                ProjectileKind::Beam
            }
            WeaponMode::Default => ProjectileKind::Standard,
        };

        let projectile_id = self.next_id();
        let muzzle = origin.offset(heading, radius);
        self.projectiles.push(Projectile {
            id: projectile_id,
            position: muzzle,
            previous: muzzle,
            heading,
            owner_id: id,
            kind,
        });
        self.dirty.projectiles = true;
        Ok(projectile_id)
    }

    pub fn counts(&self) -> WorldCounts {
        WorldCounts {
            players: self.players.len(),
            projectiles: self.projectiles.len(),
            pickups: self.pickups.len(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_world() -> World {
        World::new(GameConfig::default(), 7, Duration::ZERO)
    }

    /// World without obstacles so positions can be placed freely
    pub(crate) fn open_world() -> World {
        let mut world = test_world();
        world.obstacles.clear();
        world
    }

    pub(crate) fn join(world: &mut World, name: &str) -> PlayerId {
        let id = Uuid::new_v4();
        world.admit(id, name.to_string()).expect("fresh id");
        id
    }

    pub(crate) fn place(world: &mut World, id: PlayerId, x: f32, y: f32) {
        world.players.get_mut(&id).unwrap().position = Some(Point::new(x, y));
    }

    #[test]
    fn admission_balances_teams_red_first() {
        let mut world = test_world();
        let a = join(&mut world, "a");
        let b = join(&mut world, "b");
        let c = join(&mut world, "c");

        assert_eq!(world.players[&a].team, Team::Red);
        assert_eq!(world.players[&b].team, Team::Blue);
        assert_eq!(world.players[&c].team, Team::Red);

        world.remove(a);
        world.remove(c);
        let d = join(&mut world, "d");
        assert_eq!(world.players[&d].team, Team::Red);
    }

    #[test]
    fn admitted_player_starts_alive_on_field() {
        let mut world = test_world();
        let id = join(&mut world, "ace");
        let p = &world.players[&id];

        assert!(p.alive);
        assert_eq!(p.hp, 10);
        assert_eq!(p.kills, 0);
        let pos = p.position.expect("alive players have a position");
        assert!((0.0..=FIELD_WIDTH).contains(&pos.x));
        assert!((0.0..=FIELD_HEIGHT).contains(&pos.y));
        assert_eq!(p.color.len(), 7);
        assert!(p.color.starts_with('#'));
    }

    #[test]
    fn duplicate_admission_is_ignored() {
        let mut world = test_world();
        let id = join(&mut world, "one");
        assert!(world.admit(id, "two".to_string()).is_none());
        assert_eq!(world.players[&id].nickname, "one");
    }

    #[test]
    fn move_clamps_to_field() {
        let mut world = test_world();
        let id = join(&mut world, "m");
        world.move_player(id, Point::new(-10.0, 9000.0)).unwrap();
        assert_eq!(world.players[&id].position, Some(Point::new(0.0, FIELD_HEIGHT)));
    }

    #[test]
    fn move_rejected_for_unknown_or_dead() {
        let mut world = test_world();
        let stranger = Uuid::new_v4();
        assert!(matches!(
            world.move_player(stranger, Point::new(1.0, 1.0)),
            Err(IntentError::UnknownPlayer(_))
        ));

        let id = join(&mut world, "ghost");
        {
            let p = world.players.get_mut(&id).unwrap();
            p.alive = false;
            p.position = None;
        }
        assert!(world.move_player(id, Point::new(1.0, 1.0)).is_err());
        assert_eq!(world.players[&id].position, None);
    }

    #[test]
    fn fire_offsets_projectile_by_player_radius() {
        let mut world = test_world();
        let id = join(&mut world, "gun");
        place(&mut world, id, 100.0, 100.0);

        world.fire(id, 0.0, Duration::ZERO).unwrap();
        let shot = &world.projectiles[0];
        assert_eq!(shot.owner_id, id);
        assert_eq!(shot.kind, ProjectileKind::Standard);
        assert!((shot.position.x - 120.0).abs() < 1e-4);
        assert!((shot.position.y - 100.0).abs() < 1e-4);
    }

    #[test]
    fn fire_rejected_for_unknown_player() {
        let mut world = test_world();
        let err = world.fire(Uuid::new_v4(), 0.0, Duration::ZERO).unwrap_err();
        assert!(matches!(err, IntentError::UnknownPlayer(_)));
        assert!(world.projectiles.is_empty());
    }

    #[test]
    fn laser_mode_fires_beams_with_cooldown() {
        let mut world = test_world();
        let id = join(&mut world, "zap");
        {
            let p = world.players.get_mut(&id).unwrap();
            p.weapon = WeaponMode::Laser;
            p.weapon_until = Some(Duration::from_secs(10));
        }

        world.fire(id, 1.0, Duration::from_secs(1)).unwrap();
        assert_eq!(world.projectiles[0].kind, ProjectileKind::Beam);

        let err = world.fire(id, 1.0, Duration::from_millis(1200)).unwrap_err();
        assert!(matches!(err, IntentError::WeaponCooling(_)));

        world.fire(id, 1.0, Duration::from_millis(1500)).unwrap();
        assert_eq!(world.projectiles.len(), 2);

        // Expired laser falls back to standard rounds
        world.fire(id, 1.0, Duration::from_millis(10_001)).unwrap();
        assert_eq!(world.projectiles[2].kind, ProjectileKind::Standard);
    }

    #[test]
    fn contact_damage_schedule() {
        let grace = Duration::from_secs(3);
        let interval = Duration::from_secs(1);
        let at = |ms| ObstacleContact {
            elapsed: Duration::from_millis(ms),
            damage_applied: 0,
        };

        assert_eq!(at(2_999).damage_due(grace, interval), 0);
        assert_eq!(at(3_000).damage_due(grace, interval), 1);
        assert_eq!(at(3_999).damage_due(grace, interval), 1);
        assert_eq!(at(4_000).damage_due(grace, interval), 2);
        assert_eq!(at(6_500).damage_due(grace, interval), 4);
    }
}
