//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::game::world::{PickupKind, ProjectileKind, Team, TeamScores, WeaponMode};
use crate::game::IntentError;

/// Longest nickname kept, in characters
pub const MAX_NICKNAME_CHARS: usize = 10;
/// Nickname used when the client sends none
pub const DEFAULT_NICKNAME: &str = "Player";

/// Messages sent from client to server.
///
/// Fields are decoded loosely and validated by [`Intent::try_from`] so a
/// malformed field never rejects the whole frame at the serde layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Enter the arena
    Join {
        #[serde(default)]
        nickname: Value,
    },

    /// Desired position of the caller's player
    Move {
        #[serde(default)]
        x: Value,
        #[serde(default)]
        y: Value,
    },

    /// Fire along `angle` (radians). `x`, `y` and `kind` are advisory;
    /// the server uses its own position and weapon mode.
    Shoot {
        #[serde(default)]
        x: Value,
        #[serde(default)]
        y: Value,
        #[serde(default)]
        angle: Value,
        #[serde(default)]
        kind: Option<Value>,
    },
}

/// A validated client intent
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Join { nickname: String },
    Move { x: f32, y: f32 },
    Shoot { heading: f32 },
}

impl TryFrom<ClientMsg> for Intent {
    type Error = IntentError;

    fn try_from(msg: ClientMsg) -> Result<Self, Self::Error> {
        match msg {
            ClientMsg::Join { nickname } => Ok(Intent::Join {
                nickname: sanitize_nickname(&nickname),
            }),
            ClientMsg::Move { x, y } => Ok(Intent::Move {
                x: finite_number(&x, "x")?,
                y: finite_number(&y, "y")?,
            }),
            ClientMsg::Shoot { angle, .. } => Ok(Intent::Shoot {
                heading: finite_number(&angle, "angle")?,
            }),
        }
    }
}

/// Truncate to [`MAX_NICKNAME_CHARS`]; anything else becomes the default name
pub fn sanitize_nickname(raw: &Value) -> String {
    let nickname: String = raw
        .as_str()
        .map(|s| s.chars().take(MAX_NICKNAME_CHARS).collect())
        .unwrap_or_default();
    if nickname.is_empty() {
        DEFAULT_NICKNAME.to_string()
    } else {
        nickname
    }
}

fn finite_number(value: &Value, field: &'static str) -> Result<f32, IntentError> {
    value
        .as_f64()
        .map(|n| n as f32)
        .filter(|n| n.is_finite())
        .ok_or(IntentError::MalformedField(field))
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Direct reply to a join
    Welcome {
        player_id: Uuid,
        team: Team,
        field: FieldInfo,
        obstacles: Vec<ObstacleSnapshot>,
        pickups: Vec<PickupSnapshot>,
    },

    /// Every player keyed by connection id
    Players {
        players: BTreeMap<Uuid, PlayerSnapshot>,
    },

    Projectiles {
        projectiles: Vec<ProjectileSnapshot>,
    },

    /// Team scores and the winner, if the round is over
    Round {
        scores: TeamScores,
        winner: Option<Team>,
    },

    /// Obstacle layout (sent on generation only)
    Obstacles {
        obstacles: Vec<ObstacleSnapshot>,
    },

    Pickups {
        pickups: Vec<PickupSnapshot>,
    },
}

/// Play-field dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FieldInfo {
    pub width: f32,
    pub height: f32,
}

/// Player record as seen by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub nickname: String,
    pub color: String,
    pub team: Team,
    /// Absent while dead
    pub x: Option<f32>,
    pub y: Option<f32>,
    /// Never negative
    pub hp: i32,
    pub alive: bool,
    pub kills: u32,
    /// Milliseconds until respawn, while dead
    pub respawn_in_ms: Option<u64>,
    /// Seconds of continuous obstacle contact
    pub obstacle_contact_secs: f32,
    pub invulnerable: bool,
    pub invulnerable_ms: Option<u64>,
    pub weapon: WeaponMode,
    pub weapon_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub owner: Uuid,
    pub kind: ProjectileKind,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObstacleSnapshot {
    pub x: f32,
    pub y: f32,
    pub r: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickupSnapshot {
    pub id: u64,
    pub kind: PickupKind,
    pub x: f32,
    pub y: f32,
    /// Milliseconds since the pickup appeared
    pub age_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<Intent, IntentError> {
        let msg: ClientMsg = serde_json::from_value(value).expect("well-formed frame");
        Intent::try_from(msg)
    }

    #[test]
    fn move_requires_numbers() {
        assert_eq!(
            parse(json!({"type": "move", "x": 10, "y": 20.5})).unwrap(),
            Intent::Move { x: 10.0, y: 20.5 }
        );
        assert!(matches!(
            parse(json!({"type": "move", "x": "10", "y": 20})),
            Err(IntentError::MalformedField("x"))
        ));
        assert!(matches!(
            parse(json!({"type": "move", "x": 1})),
            Err(IntentError::MalformedField("y"))
        ));
    }

    #[test]
    fn shoot_uses_angle_only() {
        let intent = parse(json!({
            "type": "shoot", "x": "junk", "y": null, "angle": 1.5, "kind": "laser"
        }))
        .unwrap();
        assert_eq!(intent, Intent::Shoot { heading: 1.5 });

        assert!(parse(json!({"type": "shoot", "x": 1, "y": 2})).is_err());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let intent = parse(json!({"type": "move", "x": 1, "y": 2, "owner": "someone"})).unwrap();
        assert_eq!(intent, Intent::Move { x: 1.0, y: 2.0 });
    }

    #[test]
    fn nickname_is_truncated_or_defaulted() {
        assert_eq!(
            parse(json!({"type": "join", "nickname": "abcdefghijklmnop"})).unwrap(),
            Intent::Join { nickname: "abcdefghij".to_string() }
        );
        assert_eq!(
            parse(json!({"type": "join", "nickname": "가나다라마바사아자차카"})).unwrap(),
            Intent::Join { nickname: "가나다라마바사아자차".to_string() }
        );
        for raw in [json!({"type": "join"}), json!({"type": "join", "nickname": 42}), json!({"type": "join", "nickname": ""})] {
            assert_eq!(
                parse(raw).unwrap(),
                Intent::Join { nickname: DEFAULT_NICKNAME.to_string() }
            );
        }
    }

    #[test]
    fn server_messages_are_tagged() {
        let msg = ServerMsg::Round {
            scores: TeamScores { red: 3, blue: 1 },
            winner: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "round");
        assert_eq!(json["scores"]["red"], 3);
        assert!(json["winner"].is_null());
    }
}
