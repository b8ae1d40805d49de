//! Gameplay tunables

use std::time::Duration;

/// Data-driven gameplay configuration (radii, timings, limits).
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Player collision radius
    pub player_radius: f32,
    /// Hit points at spawn and the heal cap
    pub max_hp: i32,
    /// Projectile travel speed (units per second)
    pub projectile_speed: f32,
    /// Minimum time between two beam shots of one player
    pub beam_cooldown: Duration,

    /// Obstacles placed per round
    pub obstacle_count: usize,
    /// Obstacle radius range (min inclusive, max exclusive)
    pub obstacle_radius: (f32, f32),
    /// Extra gap required between two obstacles
    pub obstacle_margin: f32,
    /// Placement attempts per obstacle before best-effort placement
    pub obstacle_retries: u32,
    /// Continuous contact before the first contact damage
    pub contact_grace: Duration,
    /// Interval between repeated contact damage
    pub contact_interval: Duration,

    /// Distance kept from the field edges when placing obstacles/pickups
    pub placement_inset: f32,
    /// Pickup collection radius
    pub pickup_radius: f32,
    /// Extra gap between a pickup and any obstacle edge
    pub pickup_obstacle_margin: f32,
    /// Placement attempts per pickup before best-effort placement
    pub pickup_retries: u32,
    /// Time between pickup spawns
    pub pickup_interval: Duration,
    /// Time a pickup stays on the field uncollected
    pub pickup_ttl: Duration,
    /// Period of the expiry sweep
    pub pickup_sweep_interval: Duration,
    /// Hit points restored by a heal pickup
    pub heal_amount: i32,
    /// Immunity window granted by an invulnerability pickup
    pub invulnerability_duration: Duration,
    /// Laser weapon duration
    pub laser_duration: Duration,

    /// Delay between death and automatic respawn
    pub respawn_delay: Duration,
    /// Credited points that end a round
    pub goal_score: u32,
    /// Delay between a round finishing and the reset
    pub reset_delay: Duration,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_radius: 20.0,
            max_hp: 10,
            projectile_speed: 600.0,
            beam_cooldown: Duration::from_millis(500),

            obstacle_count: 3,
            obstacle_radius: (35.0, 55.0),
            obstacle_margin: 20.0,
            obstacle_retries: 100,
            contact_grace: Duration::from_secs(3),
            contact_interval: Duration::from_secs(1),

            placement_inset: 50.0,
            pickup_radius: 30.0,
            pickup_obstacle_margin: 30.0,
            pickup_retries: 30,
            pickup_interval: Duration::from_secs(10),
            pickup_ttl: Duration::from_secs(5),
            pickup_sweep_interval: Duration::from_secs(5),
            heal_amount: 4,
            invulnerability_duration: Duration::from_secs(3),
            laser_duration: Duration::from_secs(10),

            respawn_delay: Duration::from_secs(10),
            goal_score: 100,
            reset_delay: Duration::from_secs(3),
        }
    }
}
