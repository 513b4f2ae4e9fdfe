//! Commands accepted by the simulation between ticks.

use serde::{Deserialize, Serialize};

use crate::catalog::UnitKind;
use crate::math::{fixed_serde, Fixed};
use crate::side::Side;

/// A request from a controller into the simulation.
///
/// Commands only record intent: a destination or a queued unit. Their
/// effect on the lane is observed on the next
/// [`advance`](crate::simulation::BattleSimulation::advance).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BattleCommand {
    /// Walk a hero toward a lane position, clamped to the lane.
    SetHeroDestination {
        /// Hero to move.
        side: Side,
        /// Requested lane position.
        #[serde(with = "fixed_serde")]
        position: Fixed,
    },
    /// Buy a unit for the next wave.
    QueueUnit {
        /// Buying side.
        side: Side,
        /// Archetype to queue.
        unit: UnitKind,
    },
    /// Buy a shop item for the side's hero.
    BuyItem {
        /// Buying side.
        side: Side,
        /// Item identifier or name.
        item: String,
    },
}

impl BattleCommand {
    /// Side the command addresses.
    #[must_use]
    pub fn side(&self) -> Side {
        match self {
            Self::SetHeroDestination { side, .. }
            | Self::QueueUnit { side, .. }
            | Self::BuyItem { side, .. } => *side,
        }
    }
}
