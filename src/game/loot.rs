//! Loot lying on the map and loot carried by characters.

use serde::{Deserialize, Serialize};

use crate::params::Amount;

/// Loot accumulated on a map tile.
///
/// The block span is informative only, but it keeps the hash of the bounty
/// transaction that eventually pays the loot out unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootInfo {
    /// Amount on the tile.
    pub amount: Amount,
    /// First block that contributed to this loot.
    pub first_block: i32,
    /// Last block that contributed to this loot.
    pub last_block: i32,
}

impl Default for LootInfo {
    fn default() -> Self {
        Self {
            amount: 0,
            first_block: -1,
            last_block: -1,
        }
    }
}

impl LootInfo {
    /// Loot of the given amount dropped at one height.
    #[must_use]
    pub const fn new(amount: Amount, height: i32) -> Self {
        Self {
            amount,
            first_block: height,
            last_block: height,
        }
    }
}

/// Loot collected by a character but not banked yet.
///
/// A refund bounty is encoded in the same structure with
/// `collected_first_block == -1` and a positive amount; see
/// [`CollectedLootInfo::set_refund`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedLootInfo {
    /// Amount carried.
    pub amount: Amount,
    /// First block that contributed to the carried loot.
    pub first_block: i32,
    /// Last block that contributed to the carried loot.
    pub last_block: i32,
    /// First block at which the character picked loot up.
    pub collected_first_block: i32,
    /// Last block at which the character picked loot up.
    pub collected_last_block: i32,
}

impl Default for CollectedLootInfo {
    fn default() -> Self {
        Self {
            amount: 0,
            first_block: -1,
            last_block: -1,
            collected_first_block: -1,
            collected_last_block: -1,
        }
    }
}

impl CollectedLootInfo {
    /// Merge picked-up loot into the carried total.
    pub fn collect(&mut self, loot: &LootInfo, height: i32) {
        debug_assert!(!self.is_refund());
        if loot.amount <= 0 {
            return;
        }

        self.amount += loot.amount;

        if self.first_block < 0 || loot.first_block < self.first_block {
            self.first_block = loot.first_block;
        }
        if loot.last_block > self.last_block {
            self.last_block = loot.last_block;
        }

        if self.collected_first_block < 0 {
            self.collected_first_block = height;
        }
        self.collected_last_block = height;
    }

    /// Turn this into a player-refund record.
    ///
    /// Refunds give coins back to a player killed for staying in the spawn
    /// area; the height makes the resulting transaction unique.
    pub fn set_refund(&mut self, refund_amount: Amount, height: i32) {
        debug_assert_eq!(self.amount, 0);
        debug_assert_eq!(self.collected_first_block, -1);
        debug_assert_eq!(self.collected_last_block, -1);
        self.amount = refund_amount;
        self.collected_last_block = height;
    }

    /// Whether this record encodes a refund.
    #[must_use]
    pub fn is_refund(&self) -> bool {
        self.amount > 0 && self.collected_first_block == -1
    }

    /// Block height of a refund.
    #[must_use]
    pub fn refund_height(&self) -> i32 {
        debug_assert!(self.is_refund());
        self.collected_last_block
    }
}
