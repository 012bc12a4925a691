//! Attack resolution.
//!
//! Destructing a character attacks every enemy within melee range. Before
//! the life-steal fork the explosion kills the destructor and its targets
//! outright; afterwards each attack drains one name-coin unit from the
//! victim's locked coins, mutual attacks cancel, and the drained life is
//! redistributed among the surviving attackers.

use std::collections::{BTreeMap, BTreeSet};

use crate::game::character::{character_in_spectator_mode, character_is_protected};
use crate::game::coord::{dist_linf, Coord};
use crate::game::moves::Move;
use crate::game::random::RandomGenerator;
use crate::game::state::{CharacterId, GameState, KilledByInfo, StepResult};
use crate::params::Amount;

/// Chebyshev range of a destruct attack.
pub const MELEE_RANGE: u32 = 1;
/// Chebyshev range of the ranged wave (timesave fork), at half damage.
pub const RANGED_RANGE: u32 = 2;

/// A character on the map while attacks are being processed.
///
/// Tracks all attackers so the kill transaction can list them and so drained
/// life can be redistributed.
#[derive(Debug, Clone)]
pub struct AttackableCharacter {
    /// The character this entry represents.
    pub chid: CharacterId,
    /// Its team colour.
    pub color: u8,
    /// Coins already drained from this character's life, available for
    /// redistribution to its attackers.
    pub drawn_life: Amount,
    /// Melee attackers.
    pub attackers: BTreeSet<CharacterId>,
    /// Ranged attackers (half damage).
    pub ranged_attackers: BTreeSet<CharacterId>,
}

/// Tile-indexed view of all attackable characters.
///
/// Built lazily on the first destruct of a step and discarded with the step.
#[derive(Debug, Clone, Default)]
pub struct CharactersOnTiles {
    tiles: BTreeMap<Coord, Vec<AttackableCharacter>>,
    index: BTreeMap<CharacterId, Coord>,
    built: bool,
}

/// Fork flags and constants the attack passes need.
#[derive(Debug, Clone, Copy)]
pub struct AttackRules {
    /// Life-steal fork active.
    pub lifesteal: bool,
    /// Timesave fork active (modes and the ranged wave).
    pub timesave: bool,
    /// Damage unit: the minimum name-coin amount at this height.
    pub unit: Amount,
}

impl CharactersOnTiles {
    /// Empty, not yet built.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the index has been built (and attacks may have happened).
    #[must_use]
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Build the tile index from the state if not done yet.
    ///
    /// Post-timesave, protected and spectator characters are not attackable
    /// and stay out of the index.
    pub fn ensure_is_built(&mut self, state: &GameState, rules: &AttackRules) {
        if self.built {
            return;
        }
        for (pid, player) in &state.players {
            for (idx, ch) in &player.characters {
                if rules.timesave
                    && (character_is_protected(ch.stay_in_spawn_area)
                        || character_in_spectator_mode(ch.stay_in_spawn_area))
                {
                    continue;
                }
                let chid = CharacterId::new(pid.clone(), *idx);
                self.index.insert(chid.clone(), ch.coord);
                self.tiles.entry(ch.coord).or_default().push(AttackableCharacter {
                    chid,
                    color: player.color,
                    drawn_life: 0,
                    attackers: BTreeSet::new(),
                    ranged_attackers: BTreeSet::new(),
                });
            }
        }
        self.built = true;
    }

    /// Register `attacker` on every enemy entry within `range` of `from`.
    fn add_attacker_in_range(
        &mut self,
        from: Coord,
        color: u8,
        attacker: &CharacterId,
        range: u32,
        ranged: bool,
    ) {
        let r = range as i32;
        let window: Vec<Coord> = self
            .tiles
            .range(Coord::new(from.x - r, i32::MIN)..=Coord::new(from.x + r, i32::MAX))
            .map(|(c, _)| *c)
            .filter(|c| dist_linf(*c, from) <= range)
            .collect();
        for coord in window {
            if let Some(entries) = self.tiles.get_mut(&coord) {
                for entry in entries {
                    if entry.color == color || entry.chid == *attacker {
                        continue;
                    }
                    if ranged {
                        if dist_linf(coord, from) == range {
                            entry.ranged_attackers.insert(attacker.clone());
                        }
                    } else {
                        entry.attackers.insert(attacker.clone());
                    }
                }
            }
        }
    }

    /// Apply all destruct attacks contained in the step's moves.
    pub fn apply_attacks<'a>(
        &mut self,
        state: &mut GameState,
        moves: impl Iterator<Item = &'a Move>,
        rules: &AttackRules,
        result: &mut StepResult,
    ) {
        for mv in moves {
            if mv.destruct.is_empty() {
                continue;
            }
            for idx in &mv.destruct {
                let Some(player) = state.players.get(&mv.player) else {
                    continue;
                };
                let Some(ch) = player.characters.get(idx) else {
                    continue;
                };
                if rules.timesave
                    && (character_is_protected(ch.stay_in_spawn_area)
                        || character_in_spectator_mode(ch.stay_in_spawn_area))
                {
                    continue;
                }
                let color = player.color;
                let coord = ch.coord;
                let attacker = CharacterId::new(mv.player.clone(), *idx);

                self.ensure_is_built(state, rules);
                self.add_attacker_in_range(coord, color, &attacker, MELEE_RANGE, false);
                if rules.lifesteal && rules.timesave {
                    self.add_attacker_in_range(coord, color, &attacker, RANGED_RANGE, true);
                }
                self.attack_self(state, &attacker, rules, result);
            }
        }
    }

    /// Self-effect of a destruct.
    ///
    /// Pre-life-steal the destructor blows itself up. Afterwards the attack
    /// erodes one unit of its own lock; dropping below the minimum is lethal.
    fn attack_self(
        &mut self,
        state: &mut GameState,
        attacker: &CharacterId,
        rules: &AttackRules,
        result: &mut StepResult,
    ) {
        if !rules.lifesteal {
            if let Some(coord) = self.index.get(attacker) {
                if let Some(entries) = self.tiles.get_mut(coord) {
                    for entry in entries {
                        if entry.chid == *attacker {
                            entry.attackers.insert(attacker.clone());
                        }
                    }
                }
            }
            return;
        }

        let Some(player) = state.players.get_mut(&attacker.player) else {
            return;
        };
        player.locked_coins = (player.locked_coins - rules.unit).max(0);
        if player.locked_coins < rules.unit {
            result.kill_player(
                attacker.player.clone(),
                KilledByInfo::Destruct(attacker.clone()),
            );
        }
    }

    /// Cancel mutual melee attacks (life-steal rules): when two characters
    /// attack each other, neither draws life from the other.
    pub fn defend_mutual_attacks(&mut self) {
        let mut cancellations: Vec<(CharacterId, CharacterId)> = Vec::new();
        for entries in self.tiles.values() {
            for entry in entries {
                for att in &entry.attackers {
                    if *att <= entry.chid {
                        continue;
                    }
                    let mutual = self
                        .index
                        .get(att)
                        .and_then(|c| self.tiles.get(c))
                        .and_then(|v| v.iter().find(|e| e.chid == *att))
                        .is_some_and(|e| e.attackers.contains(&entry.chid));
                    if mutual {
                        cancellations.push((entry.chid.clone(), att.clone()));
                    }
                }
            }
        }

        for (a, b) in cancellations {
            self.remove_attacker(&a, &b);
            self.remove_attacker(&b, &a);
        }
    }

    fn remove_attacker(&mut self, victim: &CharacterId, attacker: &CharacterId) {
        if let Some(coord) = self.index.get(victim).copied() {
            if let Some(entries) = self.tiles.get_mut(&coord) {
                for entry in entries {
                    if entry.chid == *victim {
                        entry.attackers.remove(attacker);
                    }
                }
            }
        }
    }

    /// Deduct life from attacked characters and schedule kills.
    ///
    /// Pre-life-steal any attacker is lethal. Afterwards each melee attacker
    /// drains one unit (ranged attackers half a unit, after all melee) from
    /// the victim's locked coins; the victim dies once the lock falls below
    /// the minimum.
    pub fn draw_life(
        &mut self,
        state: &mut GameState,
        result: &mut StepResult,
        rules: &AttackRules,
        height: i32,
    ) {
        let mut removals: Vec<CharacterId> = Vec::new();

        for entries in self.tiles.values_mut() {
            for entry in entries.iter_mut() {
                if entry.attackers.is_empty() && entry.ranged_attackers.is_empty() {
                    continue;
                }

                if !rules.lifesteal {
                    if entry.chid.index == 0 {
                        for att in &entry.attackers {
                            result.kill_player(
                                entry.chid.player.clone(),
                                KilledByInfo::Destruct(att.clone()),
                            );
                        }
                    } else {
                        removals.push(entry.chid.clone());
                    }
                    continue;
                }

                if entry.chid.index != 0 {
                    // No lock backs an extra character; any hit removes it.
                    removals.push(entry.chid.clone());
                    continue;
                }

                let Some(player) = state.players.get_mut(&entry.chid.player) else {
                    continue;
                };
                for _att in &entry.attackers {
                    let draw = rules.unit.min(player.locked_coins);
                    player.locked_coins -= draw;
                    player.value -= draw.min(player.value);
                    entry.drawn_life += draw;
                }
                for _att in &entry.ranged_attackers {
                    let draw = (rules.unit / 2).min(player.locked_coins);
                    player.locked_coins -= draw;
                    player.value -= draw.min(player.value);
                    entry.drawn_life += draw;
                }

                if player.locked_coins < rules.unit {
                    for att in entry.attackers.iter().chain(&entry.ranged_attackers) {
                        result.kill_player(
                            entry.chid.player.clone(),
                            KilledByInfo::Destruct(att.clone()),
                        );
                    }
                }
            }
        }

        for chid in removals {
            state.remove_character_drop_loot(&chid, height);
        }
    }

    /// Give the drained life to the attackers.
    ///
    /// Full units are split evenly; the leftover units go one each to
    /// attackers picked by a deterministic shuffle, and the sub-unit
    /// remainder falls to the game fund.
    pub fn distribute_drawn_life(
        &self,
        rng: &mut RandomGenerator,
        state: &mut GameState,
        rules: &AttackRules,
    ) {
        for entries in self.tiles.values() {
            for entry in entries {
                if entry.drawn_life <= 0 {
                    continue;
                }

                let all: Vec<CharacterId> = entry
                    .attackers
                    .union(&entry.ranged_attackers)
                    .cloned()
                    .collect();
                if all.is_empty() {
                    state.game_fund += entry.drawn_life;
                    continue;
                }

                let units = entry.drawn_life / rules.unit;
                let remainder = entry.drawn_life % rules.unit;
                let n = all.len() as Amount;

                let per_attacker = units / n;
                if per_attacker > 0 {
                    for att in &all {
                        Self::credit(state, att, per_attacker * rules.unit);
                    }
                }

                let leftover_units = (units % n) as usize;
                if leftover_units > 0 {
                    let mut shuffled = all.clone();
                    rng.shuffle(&mut shuffled);
                    for att in shuffled.iter().take(leftover_units) {
                        Self::credit(state, att, rules.unit);
                    }
                }

                state.game_fund += remainder;
            }
        }
    }

    fn credit(state: &mut GameState, attacker: &CharacterId, amount: Amount) {
        match state.players.get_mut(&attacker.player) {
            Some(player) => player.value += amount,
            // Attacker vanished in the same step; nobody can claim this.
            None => state.game_fund += amount,
        }
    }
}
