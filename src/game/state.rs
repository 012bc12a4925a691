//! Game state and the per-step bookkeeping around kills and bounties.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{EngineError, EngineResult};
use crate::game::character::{
    character_in_spectator_mode, character_is_protected, CharacterState, CHARACTER_MODE_LOGOUT,
    CHARACTER_MODE_NORMAL, MAX_STAY_IN_SPAWN_AREA,
};
use crate::game::coord::Coord;
use crate::game::loot::{CollectedLootInfo, LootInfo};
use crate::game::map;
use crate::game::player::{PlayerId, PlayerState};
use crate::game::random::{BlockHash, Hash256, RandomGenerator};
use crate::params::Amount;

/// Percentage of destruct-dropped coins paid to the miner.
pub const DEATH_TAX_PERCENT: Amount = 4;

/// Percentage of the step treasure paid to the crown holder.
pub const CROWN_BONUS_PERCENT: Amount = 10;

/// Number of harvest drops per step.
pub const LOOT_DROP_COUNT: usize = 4;

/// Number of banks kept on the map after the life-steal fork.
pub const BANK_COUNT: usize = 10;
/// Shortest bank lifetime in blocks.
pub const BANK_MIN_LIFE: u64 = 25;
/// Longest bank lifetime in blocks.
pub const BANK_MAX_LIFE: u64 = 75;

/// Minimum blocks between disasters (production schedule).
pub const DISASTER_MIN_GAP: i32 = 1440;
/// Minimum blocks between disasters under testing rules.
pub const DISASTER_MIN_GAP_TESTING: i32 = 50;
/// One-in-N disaster probability per eligible block (production).
pub const DISASTER_CHANCE: u64 = 10_000;
/// One-in-N disaster probability per eligible block (testing rules).
pub const DISASTER_CHANCE_TESTING: u64 = 100;

/// Shortest poison countdown.
pub const POISON_MIN_LIFE: u64 = 2;
/// Longest poison countdown before the life-steal fork.
pub const POISON_MAX_LIFE: u64 = 50;
/// Longest poison countdown after the life-steal fork.
pub const POISON_MAX_LIFE_LIFESTEAL: u64 = 10;

/// One-in-N chance per step to spawn a heart (before the less-hearts fork).
pub const HEART_SPAWN_CHANCE: u64 = 10;

/// A character, identified by owner name and character index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CharacterId {
    /// Owning player's name.
    pub player: PlayerId,
    /// Character index; 0 is the general.
    pub index: i32,
}

impl CharacterId {
    /// Create a new character id.
    #[must_use]
    pub fn new(player: impl Into<PlayerId>, index: i32) -> Self {
        Self {
            player: player.into(),
            index,
        }
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.index == 0 {
            write!(f, "{}", self.player)
        } else {
            write!(f, "{}.{}", self.player, self.index)
        }
    }
}

/// Why (or by whom) a player was killed.
///
/// The variant order is crucial: when a player dies for several reasons in
/// one block, the smallest entry decides how the kill transaction is built.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KilledByInfo {
    /// Killed by another character's destruct (possibly its own).
    Destruct(CharacterId),
    /// Killed for staying too long on the spawn strip.
    Spawn,
    /// Killed by poisoning after a disaster.
    Poison,
}

impl KilledByInfo {
    /// Whether this kill pays the miner tax on dropped coins.
    #[must_use]
    pub fn has_death_tax(&self) -> bool {
        matches!(self, KilledByInfo::Destruct(_))
    }

    /// Whether the victim's coins drop on the map (otherwise they go to the
    /// game fund or are refunded).
    #[must_use]
    pub fn drop_coins(&self) -> bool {
        matches!(self, KilledByInfo::Destruct(_))
    }

    /// Whether the victim's name lock is refunded. Poison deaths refund only
    /// once the life-steal fork is active.
    #[must_use]
    pub fn can_refund(&self, fork_lifesteal: bool) -> bool {
        match self {
            KilledByInfo::Destruct(_) => false,
            KilledByInfo::Spawn => true,
            KilledByInfo::Poison => fork_lifesteal,
        }
    }
}

/// A banked (or refunded) payout owed to a player.
///
/// The payment address is captured when the bounty is created so the
/// transaction can still be built if the player dies in the same block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedBounty {
    /// Character that banked the loot.
    pub character: CharacterId,
    /// The banked loot (or refund record).
    pub loot: CollectedLootInfo,
    /// Reward address; empty means pay to the name's own address.
    pub address: String,
}

impl CollectedBounty {
    /// Refresh the payment address from the state if the player still lives.
    pub fn update_address(&mut self, state: &GameState) {
        if let Some(player) = state.players.get(&self.character.player) {
            self.address = player.address.clone();
        }
    }
}

/// Everything a step produces besides the successor state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepResult {
    killed_players: BTreeSet<PlayerId>,
    killed_by: BTreeMap<PlayerId, BTreeSet<KilledByInfo>>,
    /// Bounty payouts the block must contain.
    pub bounties: Vec<CollectedBounty>,
    /// Miner tax collected from destruct drops.
    pub tax_amount: Amount,
}

impl StepResult {
    /// Record a killed player together with one kill reason.
    pub fn kill_player(&mut self, victim: PlayerId, info: KilledByInfo) {
        self.killed_by
            .entry(victim.clone())
            .or_default()
            .insert(info);
        self.killed_players.insert(victim);
    }

    /// Players killed this step.
    #[must_use]
    pub fn killed_players(&self) -> &BTreeSet<PlayerId> {
        &self.killed_players
    }

    /// Kill reasons, ordered destruct before spawn before poison.
    #[must_use]
    pub fn killed_by(&self) -> &BTreeMap<PlayerId, BTreeSet<KilledByInfo>> {
        &self.killed_by
    }

    /// Whether the given player is scheduled to die this step.
    #[must_use]
    pub fn is_killed(&self, player: &str) -> bool {
        self.killed_players.contains(player)
    }
}

/// Auxiliary state fields carried for forward compatibility.
///
/// Serialized as zeros / empty strings and preserved on read.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StateReserve {
    /// Reserved string slots.
    pub tags: [String; 8],
    /// Reserved coin amounts.
    pub amounts: [i64; 8],
    /// Reserved counters.
    pub counters: [i32; 8],
    /// Reserved checkpoint hashes.
    pub hashes: [Hash256; 2],
}

/// The full game state at one block height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// All live players, keyed by name.
    pub players: BTreeMap<PlayerId, PlayerState>,
    /// Last messages of players killed in the current block. Only colour,
    /// message and message block are meaningful; cleared at each step start.
    pub dead_players_chat: BTreeMap<PlayerId, PlayerState>,
    /// Loot lying on the map.
    pub loot: BTreeMap<Coord, LootInfo>,
    /// Heart tiles (pre-life-steal only).
    pub hearts: BTreeSet<Coord>,
    /// Banks with their remaining lifetime in blocks.
    pub banks: BTreeMap<Coord, u32>,
    /// Position of the crown.
    pub crown_pos: Coord,
    /// Character currently holding the crown.
    pub crown_holder: Option<CharacterId>,
    /// Coins forfeited to the game fund.
    pub game_fund: Amount,
    /// Number of steps since the game start: -1 before genesis, 0 right
    /// after the genesis block.
    pub n_height: i32,
    /// Height of the last disaster, -1 if none happened yet.
    pub n_disaster_height: i32,
    /// Hash of the block whose moves produced this state.
    pub hash_block: BlockHash,
    /// Opaque carried state.
    pub reserve: StateReserve,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// The pre-genesis state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            players: BTreeMap::new(),
            dead_players_chat: BTreeMap::new(),
            loot: BTreeMap::new(),
            hearts: BTreeSet::new(),
            banks: BTreeMap::new(),
            crown_pos: map::CROWN_START,
            crown_holder: None,
            game_fund: 0,
            n_height: -1,
            n_disaster_height: -1,
            hash_block: BlockHash::zero(),
            reserve: StateReserve::default(),
        }
    }

    /// Number of characters a newly spawned player starts with.
    #[must_use]
    pub fn num_initial_characters(fork_lifesteal: bool) -> u32 {
        if fork_lifesteal {
            1
        } else {
            3
        }
    }

    /// Whether a tile is a banking spot. Before the life-steal fork the
    /// spawn strip banks; afterwards the rotating bank tiles do.
    #[must_use]
    pub fn is_bank(&self, c: Coord, fork_lifesteal: bool) -> bool {
        if fork_lifesteal {
            self.banks.contains_key(&c)
        } else {
            map::is_spawn_area(c)
        }
    }

    /// Look up a character by id.
    #[must_use]
    pub fn find_character(&self, chid: &CharacterId) -> Option<&CharacterState> {
        self.players
            .get(&chid.player)
            .and_then(|p| p.characters.get(&chid.index))
    }

    /// Look up a character by id, mutably.
    pub fn find_character_mut(&mut self, chid: &CharacterId) -> Option<&mut CharacterState> {
        self.players
            .get_mut(&chid.player)
            .and_then(|p| p.characters.get_mut(&chid.index))
    }

    /// Add loot to a tile, merging with whatever lies there.
    pub fn add_loot(&mut self, coord: Coord, amount: Amount, height: i32) {
        if amount <= 0 {
            return;
        }
        match self.loot.get_mut(&coord) {
            Some(existing) => {
                existing.amount += amount;
                existing.last_block = height;
                if existing.first_block < 0 {
                    existing.first_block = height;
                }
            }
            None => {
                self.loot.insert(coord, LootInfo::new(amount, height));
            }
        }
    }

    /// Distribute the step treasure: crown bonus first, the rest onto
    /// harvest points chosen by the generator.
    pub fn divide_loot(&mut self, treasure: Amount, rng: &mut RandomGenerator, height: i32) {
        if treasure <= 0 {
            return;
        }

        let mut rest = treasure;
        if let Some(holder) = self.crown_holder.clone() {
            let bonus = treasure * CROWN_BONUS_PERCENT / 100;
            if bonus > 0 {
                if let Some(ch) = self.find_character_mut(&holder) {
                    ch.loot.collect(&LootInfo::new(bonus, height), height);
                    rest -= bonus;
                }
            }
        }

        let share = rest / LOOT_DROP_COUNT as Amount;
        let mut remainder = rest - share * LOOT_DROP_COUNT as Amount;
        for _ in 0..LOOT_DROP_COUNT {
            let idx = rng.next_range(map::HARVEST_POINTS.len() as u64) as usize;
            let amount = share + remainder;
            remainder = 0;
            self.add_loot(map::HARVEST_POINTS[idx], amount, height);
        }
    }

    /// Drop the crown if the given character holds it.
    ///
    /// With `respawn` the crown returns to its start tile instead of
    /// falling where the holder stood.
    pub(crate) fn crown_drop_if_holder(&mut self, chid: &CharacterId, at: Coord, respawn: bool) {
        if self.crown_holder.as_ref() == Some(chid) {
            self.crown_holder = None;
            self.crown_pos = if respawn { map::CROWN_START } else { at };
        }
    }

    /// Keep the crown on its holder's tile.
    pub fn update_crown_state(&mut self) {
        let Some(holder) = self.crown_holder.clone() else {
            return;
        };
        match self.find_character(&holder) {
            Some(ch) => self.crown_pos = ch.coord,
            // The holder vanished without going through a kill path; the
            // crown stays where it last was.
            None => self.crown_holder = None,
        }
    }

    /// Hand the crown to an eligible character standing on its tile.
    ///
    /// Ties between several candidates are broken by the step generator.
    pub fn collect_crown(
        &mut self,
        rng: &mut RandomGenerator,
        result: &StepResult,
        fork_timesave: bool,
    ) {
        if self.crown_holder.is_some() {
            return;
        }

        let mut candidates: Vec<CharacterId> = Vec::new();
        for (pid, player) in &self.players {
            if result.is_killed(pid) {
                continue;
            }
            for (idx, ch) in &player.characters {
                if ch.coord != self.crown_pos {
                    continue;
                }
                if fork_timesave
                    && (character_is_protected(ch.stay_in_spawn_area)
                        || character_in_spectator_mode(ch.stay_in_spawn_area))
                {
                    continue;
                }
                candidates.push(CharacterId::new(pid.clone(), *idx));
            }
        }

        if candidates.is_empty() {
            return;
        }
        let pick = if candidates.len() == 1 {
            0
        } else {
            rng.next_range(candidates.len() as u64) as usize
        };
        self.crown_holder = Some(candidates.swap_remove(pick));
    }

    /// Roll whether a disaster strikes at this height.
    pub fn check_for_disaster(
        &self,
        rng: &mut RandomGenerator,
        testing_rules: bool,
        height: i32,
    ) -> bool {
        let (gap, chance) = if testing_rules {
            (DISASTER_MIN_GAP_TESTING, DISASTER_CHANCE_TESTING)
        } else {
            (DISASTER_MIN_GAP, DISASTER_CHANCE)
        };
        let last = self.n_disaster_height.max(0);
        if height - last < gap {
            return false;
        }
        rng.next_range(chance) == 0
    }

    /// Poison every player that is not already poisoned.
    pub fn apply_disaster(
        &mut self,
        rng: &mut RandomGenerator,
        fork_lifesteal: bool,
        height: i32,
    ) {
        let max_life = if fork_lifesteal {
            POISON_MAX_LIFE_LIFESTEAL
        } else {
            POISON_MAX_LIFE
        };
        for player in self.players.values_mut() {
            if player.remaining_life < 0 {
                let life = POISON_MIN_LIFE + rng.next_range(max_life - POISON_MIN_LIFE + 1);
                player.remaining_life = life as i32;
            }
        }
        self.n_disaster_height = height;
    }

    /// Tick every poison countdown; players reaching zero are scheduled for
    /// a poison kill.
    pub fn decrement_life(&mut self, result: &mut StepResult) {
        for (pid, player) in &mut self.players {
            if player.remaining_life > 0 {
                player.remaining_life -= 1;
                if player.remaining_life == 0 {
                    result.kill_player(pid.clone(), KilledByInfo::Poison);
                }
            }
        }
    }

    /// Advance spawn-area timers and schedule spawn kills.
    ///
    /// Before the timesave fork `stay_in_spawn_area` is a plain counter
    /// that runs while the character stands on the strip. Afterwards it is a
    /// character mode: spawn protection below [`CHARACTER_MODE_NORMAL`],
    /// logout (and death with refund) at [`CHARACTER_MODE_LOGOUT`].
    pub fn kill_spawn_area(&mut self, result: &mut StepResult, fork_timesave: bool, height: i32) {
        let mut to_kill: Vec<CharacterId> = Vec::new();

        for (pid, player) in &mut self.players {
            for (idx, ch) in &mut player.characters {
                let s = ch.stay_in_spawn_area;
                if fork_timesave {
                    if character_in_spectator_mode(s) {
                        continue;
                    }
                    if s < CHARACTER_MODE_NORMAL {
                        ch.stay_in_spawn_area = s + 1;
                    } else if ch.is_in_spawn_area() {
                        ch.stay_in_spawn_area = (s + 1).min(CHARACTER_MODE_LOGOUT);
                        if ch.stay_in_spawn_area >= CHARACTER_MODE_LOGOUT {
                            to_kill.push(CharacterId::new(pid.clone(), *idx));
                        }
                    } else {
                        ch.stay_in_spawn_area = CHARACTER_MODE_NORMAL;
                    }
                } else if ch.is_in_spawn_area() {
                    ch.stay_in_spawn_area = s.saturating_add(1);
                    if ch.stay_in_spawn_area > MAX_STAY_IN_SPAWN_AREA {
                        to_kill.push(CharacterId::new(pid.clone(), *idx));
                    }
                }
            }
        }

        for chid in to_kill {
            if chid.index == 0 {
                result.kill_player(chid.player, KilledByInfo::Spawn);
            } else {
                self.remove_character_drop_loot(&chid, height);
            }
        }
    }

    /// Remove a non-general character, dropping its carried loot in place.
    pub(crate) fn remove_character_drop_loot(&mut self, chid: &CharacterId, height: i32) {
        let removed = self
            .players
            .get_mut(&chid.player)
            .and_then(|p| p.characters.remove(&chid.index));
        if let Some(ch) = removed {
            self.crown_drop_if_holder(chid, ch.coord, false);
            self.add_loot(ch.coord, ch.loot.amount, height);
        }
    }

    /// Dispose of one killed character's coins.
    ///
    /// Depending on the kill reason the coins drop on the tile (minus miner
    /// tax), are refunded through a bounty, or fall to the game fund.
    pub(crate) fn handle_killed_loot(
        &mut self,
        pid: &str,
        idx: i32,
        info: &KilledByInfo,
        result: &mut StepResult,
        fork_lifesteal: bool,
        height: i32,
    ) {
        let Some(player) = self.players.get(pid) else {
            return;
        };
        let Some(ch) = player.characters.get(&idx) else {
            return;
        };
        let coord = ch.coord;
        let carried = ch.loot.amount;
        let is_general = idx == 0;

        if is_general && info.can_refund(fork_lifesteal) {
            let refund = player.locked_coins;
            let excess = (player.value - refund).max(0);
            let address = player.address.clone();
            self.add_loot(coord, carried, height);
            self.game_fund += excess;
            if refund > 0 {
                let mut loot = CollectedLootInfo::default();
                loot.set_refund(refund, height);
                result.bounties.push(CollectedBounty {
                    character: CharacterId::new(pid.to_string(), idx),
                    loot,
                    address,
                });
            }
            return;
        }

        let mut amount = carried + if is_general { player.value.max(0) } else { 0 };
        if amount <= 0 {
            return;
        }
        if info.drop_coins() {
            if info.has_death_tax() {
                let tax = amount * DEATH_TAX_PERCENT / 100;
                result.tax_amount += tax;
                amount -= tax;
            }
            self.add_loot(coord, amount, height);
        } else {
            self.game_fund += amount;
        }
    }

    /// Kill every scheduled player: dispose of all their characters' coins,
    /// move their last words into `dead_players_chat` and remove them.
    pub fn finalise_kills(
        &mut self,
        result: &mut StepResult,
        fork_lifesteal: bool,
        height: i32,
    ) -> EngineResult<()> {
        let killed: Vec<PlayerId> = result.killed_players().iter().cloned().collect();
        for pid in killed {
            let info = result
                .killed_by()
                .get(&pid)
                .and_then(|reasons| reasons.iter().next())
                .cloned()
                .ok_or_else(|| EngineError::MissingKillReason(pid.clone()))?;

            let indices: Vec<i32> = self
                .players
                .get(&pid)
                .ok_or_else(|| EngineError::UnknownPlayerKilled(pid.clone()))?
                .characters
                .keys()
                .copied()
                .collect();
            for idx in &indices {
                self.handle_killed_loot(&pid, *idx, &info, result, fork_lifesteal, height);
            }

            if let Some(holder) = self.crown_holder.clone() {
                if holder.player == pid {
                    let at = self
                        .find_character(&holder)
                        .map_or(self.crown_pos, |c| c.coord);
                    let respawn = matches!(info, KilledByInfo::Spawn);
                    self.crown_drop_if_holder(&holder, at, respawn);
                }
            }

            if let Some(player) = self.players.remove(&pid) {
                if !player.message.is_empty() {
                    let mut ghost = PlayerState::new(player.color, 0);
                    ghost.message = player.message;
                    ghost.message_block = player.message_block;
                    self.dead_players_chat.insert(pid, ghost);
                }
            }
        }
        Ok(())
    }

    /// Fork cleanup at the life-steal activation height: all hearts vanish
    /// and every extra (hearted) character is removed, dropping its loot.
    pub fn remove_hearted_characters(&mut self, height: i32) {
        let extras: Vec<CharacterId> = self
            .players
            .iter()
            .flat_map(|(pid, player)| {
                player
                    .characters
                    .keys()
                    .filter(|idx| **idx != 0)
                    .map(|idx| CharacterId::new(pid.clone(), *idx))
                    .collect::<Vec<_>>()
            })
            .collect();
        for chid in extras {
            self.remove_character_drop_loot(&chid, height);
        }
        self.hearts.clear();
    }

    /// Age the banks and keep their number constant.
    ///
    /// On the first call (at the life-steal activation height) the bank set
    /// is empty and this seeds the initial banks.
    pub fn update_banks(&mut self, rng: &mut RandomGenerator) {
        let expired: Vec<Coord> = self
            .banks
            .iter_mut()
            .filter_map(|(coord, life)| {
                *life -= 1;
                if *life == 0 {
                    Some(*coord)
                } else {
                    None
                }
            })
            .collect();
        for coord in expired {
            self.banks.remove(&coord);
        }

        while self.banks.len() < BANK_COUNT {
            let idx = rng.next_range(map::BANK_CANDIDATES.len() as u64) as usize;
            let candidate = map::BANK_CANDIDATES[idx];
            if self.banks.contains_key(&candidate) {
                continue;
            }
            let life = BANK_MIN_LIFE + rng.next_range(BANK_MAX_LIFE - BANK_MIN_LIFE + 1);
            self.banks.insert(candidate, life as u32);
        }
    }

    /// Heart pickup and heart spawning (pre-life-steal rules).
    pub fn collect_hearts(
        &mut self,
        rng: &mut RandomGenerator,
        fork_lesshearts: bool,
        height: i32,
    ) {
        // Pickups in canonical order; one heart feeds one character.
        let mut taken: BTreeSet<Coord> = BTreeSet::new();
        let mut gains: Vec<PlayerId> = Vec::new();
        let mut pending: BTreeMap<PlayerId, usize> = BTreeMap::new();
        for (pid, player) in &self.players {
            for ch in player.characters.values() {
                if !self.hearts.contains(&ch.coord) || taken.contains(&ch.coord) {
                    continue;
                }
                let extra = pending.get(pid).copied().unwrap_or(0);
                if player.characters.len() + extra
                    >= crate::game::player::MAX_CHARACTERS_PER_PLAYER
                {
                    continue;
                }
                taken.insert(ch.coord);
                gains.push(pid.clone());
                *pending.entry(pid.clone()).or_insert(0) += 1;
            }
        }
        for coord in &taken {
            self.hearts.remove(coord);
        }
        for pid in gains {
            if let Some(player) = self.players.get_mut(&pid) {
                player.spawn_character(height, rng);
            }
        }

        if !fork_lesshearts && rng.next_range(HEART_SPAWN_CHANCE) == 0 {
            for _ in 0..10 {
                let x = 1 + rng.next_range(map::SPAWN_STRIP_LEN) as i32;
                let y = 1 + rng.next_range(map::SPAWN_STRIP_LEN) as i32;
                let c = Coord::new(x, y);
                if map::is_walkable(c) && !map::is_spawn_area(c) && !self.hearts.contains(&c) {
                    self.hearts.insert(c);
                    break;
                }
            }
        }
    }

    /// Total coins lying on the map or held by players (loot, carried loot
    /// and player values).
    #[must_use]
    pub fn coins_on_map(&self) -> Amount {
        let map_loot: Amount = self.loot.values().map(|l| l.amount).sum();
        let held: Amount = self
            .players
            .values()
            .map(|p| {
                p.value.max(0)
                    + p.characters
                        .values()
                        .map(|c| c.loot.amount)
                        .sum::<Amount>()
            })
            .sum();
        map_loot + held
    }

    /// Coins tracked by the game economy, including the fund.
    #[must_use]
    pub fn total_game_coins(&self) -> Amount {
        self.coins_on_map() + self.game_fund
    }

    /// JSON view of the state for the host's RPC layer.
    ///
    /// Players killed in this block appear with `"dead": true` and only
    /// their last words.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut players = serde_json::Map::new();
        for (pid, player) in &self.players {
            let mut characters = serde_json::Map::new();
            for (idx, ch) in &player.characters {
                let has_crown = self.crown_holder.as_ref().is_some_and(|h| {
                    h.player == *pid && h.index == *idx
                });
                characters.insert(
                    idx.to_string(),
                    json!({
                        "x": ch.coord.x,
                        "y": ch.coord.y,
                        "dir": ch.dir,
                        "wp_remaining": ch.waypoints.len(),
                        "carried": ch.loot.amount,
                        "has_crown": has_crown,
                    }),
                );
            }
            players.insert(
                pid.clone(),
                json!({
                    "color": player.color,
                    "value": player.value,
                    "locked": player.locked_coins,
                    "poisoned": player.remaining_life > 0,
                    "msg": player.message,
                    "msg_block": player.message_block,
                    "characters": characters,
                }),
            );
        }
        for (pid, ghost) in &self.dead_players_chat {
            players.insert(
                pid.clone(),
                json!({
                    "color": ghost.color,
                    "dead": true,
                    "msg": ghost.message,
                    "msg_block": ghost.message_block,
                }),
            );
        }

        json!({
            "height": self.n_height,
            "hash": self.hash_block.to_string(),
            "disaster_height": self.n_disaster_height,
            "game_fund": self.game_fund,
            "crown_pos": { "x": self.crown_pos.x, "y": self.crown_pos.y },
            "crown_holder": self.crown_holder.as_ref().map(ToString::to_string),
            "players": players,
            "loot_tiles": self.loot.len(),
            "banks": self.banks.len(),
            "hearts": self.hearts.len(),
        })
    }
}
