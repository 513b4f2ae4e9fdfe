//! JSON protocol for headless battle communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Battle state updates and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","tick":0}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner outputs state after each `tick` (or on `query`)
//! 4. When a base falls, outputs `{"type":"game_over",...}` once
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0}
//! -> {"cmd":"queue","unit":"soldier"}
//! <- {"type":"ack","cmd":"queue"}
//! -> {"cmd":"move","x":480.0}
//! <- {"type":"ack","cmd":"move"}
//! -> {"cmd":"tick","count":300}
//! <- {"type":"state","snapshot":{"tick":300,...},"hash":...}
//! -> {"cmd":"buy","item":"war_banner"}
//! <- {"type":"error","message":"Insufficient gold: need 110, have 40","cmd":"buy"}
//! ```
//!
//! Commands that address a side default to the left (player) side.

use lane_core::command::BattleCommand;
use lane_core::error::GameError;
use lane_core::items::Item;
use lane_core::side::{Side, SideStats};
use lane_core::simulation::BattleSimulation;
use lane_core::snapshot::BattleSnapshot;
use serde::{Deserialize, Serialize};

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance simulation by N ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Query current battle state without advancing time.
    Query,

    /// Walk a hero toward a lane position.
    Move {
        x: f64,
        #[serde(default = "player_side")]
        side: Side,
    },

    /// Buy a unit for the next wave.
    Queue {
        unit: String,
        #[serde(default = "player_side")]
        side: Side,
    },

    /// Buy a shop item for a hero.
    Buy {
        item: String,
        #[serde(default = "player_side")]
        side: Side,
    },

    /// List the item shop.
    Shop,

    /// Report the current state hash (for determinism verification).
    Hash,

    /// Quit the session.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

fn player_side() -> Side {
    Side::Left
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready { version: String, tick: u64 },

    /// Acknowledgment of a command.
    Ack { cmd: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Current battle state.
    State { snapshot: BattleSnapshot, hash: u64 },

    /// The item shop.
    Shop { items: Vec<ShopEntry> },

    /// A base has fallen.
    GameOver {
        winner: Side,
        ticks: u64,
        base_health: [i32; 2],
        stats: [SideStats; 2],
    },

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

/// One purchasable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopEntry {
    pub id: String,
    pub name: String,
    pub cost: u32,
    pub attack_bonus: i32,
    pub defense_bonus: i32,
}

impl From<&Item> for ShopEntry {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.to_string(),
            cost: item.cost,
            attack_bonus: item.attack_bonus,
            defense_bonus: item.defense_bonus,
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64) -> Self {
        Self::Ready {
            version: "1.0".to_string(),
            tick,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Full state of a battle.
    pub fn state<R: rand::Rng>(sim: &BattleSimulation<R>) -> Self {
        Self::State {
            snapshot: sim.snapshot(),
            hash: sim.state_hash(),
        }
    }

    /// End-of-battle report, or `None` while the battle is running.
    pub fn game_over<R: rand::Rng>(sim: &BattleSimulation<R>) -> Option<Self> {
        let outcome = sim.outcome()?;
        Some(Self::GameOver {
            winner: outcome.winner,
            ticks: outcome.tick,
            base_health: outcome.base_health,
            stats: [sim.side(Side::Left).stats, sim.side(Side::Right).stats],
        })
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Move { .. } => "move",
            Self::Queue { .. } => "queue",
            Self::Buy { .. } => "buy",
            Self::Shop => "shop",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }

    /// Translate into a simulation command, or `None` for session-level
    /// commands.
    ///
    /// # Errors
    ///
    /// Unknown unit names and positions that are not finite numbers.
    pub fn to_battle_command(&self) -> lane_core::error::Result<Option<BattleCommand>> {
        let command = match self {
            Self::Move { x, side } => {
                let position = lane_core::math::fixed_from_f64(*x).ok_or_else(|| {
                    GameError::InvalidDestination(format!("{x} is not a lane position"))
                })?;
                BattleCommand::SetHeroDestination {
                    side: *side,
                    position,
                }
            }
            Self::Queue { unit, side } => BattleCommand::QueueUnit {
                side: *side,
                unit: unit.parse()?,
            },
            Self::Buy { item, side } => BattleCommand::BuyItem {
                side: *side,
                item: item.clone(),
            },
            Self::Tick { .. } | Self::Query | Self::Shop | Self::Hash | Self::Quit => {
                return Ok(None)
            }
        };
        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;
    use lane_core::catalog::UnitKind;
    use lane_core::math::Fixed;

    #[test]
    fn test_parse_tick_command() {
        let json = r#"{"cmd":"tick","count":60}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(cmd, Command::Tick { count: 60 }));
    }

    #[test]
    fn test_default_tick_count() {
        let json = r#"{"cmd":"tick"}"#;
        let cmd = Command::from_json(json).unwrap();
        assert!(matches!(cmd, Command::Tick { count: 1 }));
    }

    #[test]
    fn test_side_defaults_to_player() {
        let cmd = Command::from_json(r#"{"cmd":"queue","unit":"archer"}"#).unwrap();
        assert_eq!(
            cmd.to_battle_command().unwrap(),
            Some(BattleCommand::QueueUnit {
                side: Side::Left,
                unit: UnitKind::Archer,
            })
        );

        let cmd = Command::from_json(r#"{"cmd":"buy","item":"war_banner","side":"right"}"#)
            .unwrap();
        assert_eq!(cmd.to_battle_command().unwrap().map(|c| c.side()), Some(Side::Right));
    }

    #[test]
    fn test_move_converts_to_fixed() {
        let cmd = Command::from_json(r#"{"cmd":"move","x":480.5}"#).unwrap();
        let Some(BattleCommand::SetHeroDestination { position, .. }) =
            cmd.to_battle_command().unwrap()
        else {
            panic!("expected a destination command");
        };
        assert_eq!(position, Fixed::from_num(480.5));
    }

    #[test]
    fn test_unknown_unit_is_an_error() {
        let cmd = Command::Queue {
            unit: "dragon".to_string(),
            side: Side::Left,
        };
        assert!(matches!(
            cmd.to_battle_command(),
            Err(GameError::UnknownUnitType(_))
        ));
    }

    #[test]
    fn test_non_finite_move_is_an_error() {
        let cmd = Command::Move {
            x: f64::NAN,
            side: Side::Left,
        };
        assert!(matches!(
            cmd.to_battle_command(),
            Err(GameError::InvalidDestination(_))
        ));
    }

    #[test]
    fn test_session_commands_have_no_battle_command() {
        assert_eq!(Command::Hash.to_battle_command().unwrap(), None);
        assert_eq!(Command::Tick { count: 3 }.to_battle_command().unwrap(), None);
    }

    #[test]
    fn test_serialize_state_response() {
        let sim = Scenario::default().build(5).unwrap();
        let json = Response::state(&sim).to_json_line();
        assert!(json.contains(r#""type":"state""#));
        assert!(json.contains(r#""tick":0"#));
        assert!(json.ends_with('\n'));
    }

    #[test]
    fn test_game_over_only_when_decided() {
        let sim = Scenario::default().build(5).unwrap();
        assert!(Response::game_over(&sim).is_none());
    }
}
