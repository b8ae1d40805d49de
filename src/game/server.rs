//! Authoritative game server task - owns the world and runs both loops

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::util::time::Timer;
use crate::ws::protocol::ServerMsg;

use super::collision::Point;
use super::snapshot::{welcome_msg, SnapshotBuilder};
use super::world::{World, WorldCounts};
use super::{run_tick, GameEvent};

/// Commands routed from sessions to the owner task
#[derive(Debug)]
pub enum Command {
    Join {
        connection_id: Uuid,
        nickname: String,
        /// Per-session channel for the welcome reply
        reply: mpsc::Sender<ServerMsg>,
    },
    Move {
        connection_id: Uuid,
        target: Point,
    },
    Shoot {
        connection_id: Uuid,
        heading: f32,
    },
    Disconnect {
        connection_id: Uuid,
    },
}

/// Entity counts published after every tick for the health endpoint
#[derive(Debug, Default)]
pub struct SharedCounts {
    players: AtomicUsize,
    projectiles: AtomicUsize,
    pickups: AtomicUsize,
}

impl SharedCounts {
    fn store(&self, counts: WorldCounts) {
        self.players.store(counts.players, Ordering::Relaxed);
        self.projectiles.store(counts.projectiles, Ordering::Relaxed);
        self.pickups.store(counts.pickups, Ordering::Relaxed);
    }

    pub fn load(&self) -> WorldCounts {
        WorldCounts {
            players: self.players.load(Ordering::Relaxed),
            projectiles: self.projectiles.load(Ordering::Relaxed),
            pickups: self.pickups.load(Ordering::Relaxed),
        }
    }
}

/// Handle to the running game server
#[derive(Clone)]
pub struct GameHandle {
    pub command_tx: mpsc::Sender<Command>,
    pub broadcast_tx: broadcast::Sender<ServerMsg>,
    pub counts: Arc<SharedCounts>,
}

impl GameHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMsg> {
        self.broadcast_tx.subscribe()
    }

    /// Forward a command; fails only once the server task has stopped
    pub async fn send(&self, command: Command) -> Result<(), mpsc::error::SendError<Command>> {
        self.command_tx.send(command).await
    }

    pub fn counts(&self) -> WorldCounts {
        self.counts.load()
    }
}

/// The authoritative game server
pub struct GameServer {
    world: World,
    /// Simulation time since start
    now: Duration,
    tick_period: Duration,
    broadcast_period: Duration,
    command_rx: mpsc::Receiver<Command>,
    broadcast_tx: broadcast::Sender<ServerMsg>,
    snapshot_builder: SnapshotBuilder,
    counts: Arc<SharedCounts>,
}

impl GameServer {
    /// Create the server and the handle used to reach it
    pub fn new(
        config: GameConfig,
        seed: u64,
        simulation_tps: u32,
        broadcast_tps: u32,
    ) -> (Self, GameHandle) {
        let (command_tx, command_rx) = mpsc::channel(1024);
        let (broadcast_tx, _) = broadcast::channel(256);
        let counts = Arc::new(SharedCounts::default());

        let handle = GameHandle {
            command_tx,
            broadcast_tx: broadcast_tx.clone(),
            counts: counts.clone(),
        };

        let server = Self {
            world: World::new(config, seed, Duration::ZERO),
            now: Duration::ZERO,
            tick_period: Duration::from_micros(1_000_000 / simulation_tps.max(1) as u64),
            broadcast_period: Duration::from_micros(1_000_000 / broadcast_tps.max(1) as u64),
            command_rx,
            broadcast_tx,
            snapshot_builder: SnapshotBuilder::new(),
            counts,
        };

        (server, handle)
    }

    /// Run the simulation and broadcast loops until every handle is dropped
    pub async fn run(mut self) {
        info!(
            tick_ms = self.tick_period.as_secs_f32() * 1000.0,
            broadcast_ms = self.broadcast_period.as_secs_f32() * 1000.0,
            obstacles = self.world.obstacles.len(),
            "Game server started"
        );

        let mut tick_interval = interval(self.tick_period);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut broadcast_interval = interval(self.broadcast_period);
        broadcast_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick_interval.tick() => self.simulate(),
                _ = broadcast_interval.tick() => self.broadcast(),
                command = self.command_rx.recv() => match command {
                    Some(command) => self.apply(command),
                    None => break,
                },
            }
        }

        info!("Game server stopped");
    }

    /// One fixed simulation step
    fn simulate(&mut self) {
        let timer = Timer::new();
        self.now += self.tick_period;
        let events = run_tick(&mut self.world, self.now, self.tick_period);
        log_events(&events);
        self.counts.store(self.world.counts());

        let elapsed = timer.elapsed_micros();
        if elapsed > self.tick_period.as_micros() as u64 {
            warn!(elapsed_micros = elapsed, "Simulation tick overran its period");
        }
    }

    /// Emit the partitions changed since the previous broadcast
    fn broadcast(&mut self) {
        for msg in self.snapshot_builder.build(&mut self.world, self.now) {
            // No receivers just means nobody is connected
            let _ = self.broadcast_tx.send(msg);
        }
    }

    /// Apply a command immediately, between ticks
    fn apply(&mut self, command: Command) {
        let result = match command {
            Command::Join {
                connection_id,
                nickname,
                reply,
            } => {
                self.handle_join(connection_id, nickname, reply);
                Ok(())
            }
            Command::Move {
                connection_id,
                target,
            } => self.world.move_player(connection_id, target),
            Command::Shoot {
                connection_id,
                heading,
            } => self.world.fire(connection_id, heading, self.now).map(|_| ()),
            Command::Disconnect { connection_id } => {
                if let Some(player) = self.world.remove(connection_id) {
                    info!(
                        connection_id = %connection_id,
                        nickname = %player.nickname,
                        "Player left"
                    );
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            debug!(error = %e, "Intent rejected");
        }
        self.counts.store(self.world.counts());
    }

    fn handle_join(&mut self, connection_id: Uuid, nickname: String, reply: mpsc::Sender<ServerMsg>) {
        let Some(player) = self.world.admit(connection_id, nickname) else {
            debug!(connection_id = %connection_id, "Duplicate join ignored");
            return;
        };
        info!(
            connection_id = %connection_id,
            nickname = %player.nickname,
            team = ?player.team,
            "Player joined"
        );

        if let Some(welcome) = welcome_msg(&self.world, connection_id, self.now) {
            if reply.try_send(welcome).is_err() {
                warn!(connection_id = %connection_id, "Could not deliver welcome");
            }
        }
    }
}

fn log_events(events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::Death {
                victim_id,
                killer_id,
                cause,
            } => info!(victim_id = %victim_id, killer_id = ?killer_id, cause = ?cause, "Player died"),
            GameEvent::RoundWon { winner, scores } => {
                info!(winner = ?winner, red = scores.red, blue = scores.blue, "Round won")
            }
            GameEvent::PickupSpawned { pickup_id, kind } => {
                debug!(pickup_id, kind = ?kind, "Pickup spawned")
            }
            GameEvent::PickupCollected {
                player_id,
                pickup_id,
                kind,
            } => debug!(player_id = %player_id, pickup_id, kind = ?kind, "Pickup collected"),
            GameEvent::Hit {
                shooter_id,
                target_id,
                projectile_id,
                remaining_hp,
            } => debug!(
                shooter_id = %shooter_id,
                target_id = %target_id,
                projectile_id,
                remaining_hp,
                "Projectile hit"
            ),
            GameEvent::ContactDamage {
                player_id,
                remaining_hp,
            } => debug!(player_id = %player_id, remaining_hp, "Obstacle contact damage"),
            GameEvent::RoundReset => {}
        }
    }
}
