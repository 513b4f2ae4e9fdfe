//! Shop items that permanently boost a hero.
//!
//! Items carry only flat attack and defense bonuses. They are bought with
//! the hero's gold and applied once; there is no way to sell or unequip.

use serde::Serialize;

use crate::error::{GameError, Result};

/// A purchasable item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Item {
    /// Stable snake_case identifier.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Added to the hero's attack on application.
    pub attack_bonus: i32,
    /// Added to the hero's defense on application.
    pub defense_bonus: i32,
    /// Gold cost.
    pub cost: u32,
    /// Flavor text.
    pub description: &'static str,
}

static SHOP: [Item; 8] = [
    Item {
        id: "sharpened_arrows",
        name: "Sharpened Arrows",
        attack_bonus: 6,
        defense_bonus: 0,
        cost: 85,
        description: "Lightweight arrowheads that increase ranged damage.",
    },
    Item {
        id: "bulwark_shield",
        name: "Bulwark Shield",
        attack_bonus: 0,
        defense_bonus: 6,
        cost: 90,
        description: "Sturdy shield that absorbs blows.",
    },
    Item {
        id: "war_banner",
        name: "War Banner",
        attack_bonus: 4,
        defense_bonus: 3,
        cost: 110,
        description: "Rallying banner granting balanced power.",
    },
    Item {
        id: "arcane_tome",
        name: "Arcane Tome",
        attack_bonus: 9,
        defense_bonus: 0,
        cost: 140,
        description: "Magical tome that empowers offensive spells.",
    },
    Item {
        id: "guardian_armor",
        name: "Guardian Armor",
        attack_bonus: 0,
        defense_bonus: 9,
        cost: 150,
        description: "Heavy armor that keeps you standing longer.",
    },
    Item {
        id: "steel_helm",
        name: "Steel Helm",
        attack_bonus: 0,
        defense_bonus: 4,
        cost: 160,
        description: "Fortified helmet that hardens resolve.",
    },
    Item {
        id: "heroic_relic",
        name: "Heroic Relic",
        attack_bonus: 6,
        defense_bonus: 6,
        cost: 185,
        description: "Relic of old heroes granting all-around strength.",
    },
    Item {
        id: "knights_chestplate",
        name: "Knight's Chestplate",
        attack_bonus: 0,
        defense_bonus: 7,
        cost: 210,
        description: "Immovable armor that protects the torso.",
    },
];

/// The full shop inventory, cheapest first.
#[must_use]
pub fn shop() -> &'static [Item] {
    &SHOP
}

/// Find a shop item by identifier or display name.
pub fn find_item(name: &str) -> Result<&'static Item> {
    let wanted = name.trim();
    SHOP.iter()
        .find(|item| item.id == wanted || item.name.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| GameError::UnknownItem(name.to_string()))
}

/// Items purchasable with `gold`.
pub fn affordable_items(gold: u32) -> impl Iterator<Item = &'static Item> {
    SHOP.iter().filter(move |item| item.cost <= gold)
}
