//! Game-transaction construction.
//!
//! Each block carries up to two game-generated transactions, in this order:
//! the kill transaction (spending and thereby destroying the name locks of
//! killed players) and the bounty transaction (paying banked loot and
//! refunds). Their input scripts encode why they exist through the small
//! `GAMEOP_*` opcode table, which is a frozen wire contract.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::game::random::Hash256;
use crate::game::state::{KilledByInfo, StepResult};
use crate::params::Amount;

/// Player was killed by one or more other characters (no killers listed
/// means a spawn-area kill).
pub const GAMEOP_KILLED_BY: i64 = 1;
/// Dummy input describing the bounty output it corresponds to.
pub const GAMEOP_COLLECTED_BOUNTY: i64 = 2;
/// Player was killed by poisoning.
pub const GAMEOP_KILLED_POISON: i64 = 3;
/// Dummy input describing a refund output.
pub const GAMEOP_REFUND: i64 = 4;

/// Reference to a transaction output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutPoint {
    /// Transaction id.
    pub txid: Hash256,
    /// Output index.
    pub n: u32,
}

impl OutPoint {
    /// The null outpoint used by dummy inputs.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            txid: Hash256::zero(),
            n: u32::MAX,
        }
    }
}

/// A serialized output or signature script.
///
/// Only the push operations the game transactions need are implemented;
/// the host's script machinery interprets the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script(Vec<u8>);

impl Script {
    /// Empty script.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// The raw script bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Push a data element (single-byte length prefix; game payloads are
    /// always short).
    pub fn push_data(&mut self, data: &[u8]) {
        debug_assert!(data.len() < 0x4c);
        self.0.push(data.len() as u8);
        self.0.extend_from_slice(data);
    }

    /// Push an integer with minimal script-number encoding.
    pub fn push_int(&mut self, value: i64) {
        match value {
            0 => self.0.push(0x00),
            -1 => self.0.push(0x4f),
            1..=16 => self.0.push(0x50 + value as u8),
            _ => {
                let encoded = Self::encode_script_num(value);
                self.push_data(&encoded);
            }
        }
    }

    /// Little-endian sign-magnitude encoding used by script numbers.
    fn encode_script_num(value: i64) -> Vec<u8> {
        let negative = value < 0;
        let mut abs = value.unsigned_abs();
        let mut out = Vec::new();
        while abs > 0 {
            out.push((abs & 0xff) as u8);
            abs >>= 8;
        }
        if out.last().is_some_and(|b| b & 0x80 != 0) {
            out.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            let last = out.len() - 1;
            out[last] |= 0x80;
        }
        out
    }
}

/// Input of a game transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    /// Spent outpoint; null for dummy bounty inputs.
    pub prevout: OutPoint,
    /// Informational script encoding the game operation.
    pub script_sig: Script,
}

/// Output of a game transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    /// Paid amount.
    pub value: Amount,
    /// Destination script.
    pub script_pubkey: Script,
}

/// A game-generated transaction.
///
/// Game transactions pay no fees and skip the usual version checks; the
/// block builder appends them verbatim in the order this module emits them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameTransaction {
    /// Inputs.
    pub vin: Vec<TxIn>,
    /// Outputs.
    pub vout: Vec<TxOut>,
}

/// Coin data attached to a registered name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameData {
    /// Outpoint of the name's latest update (the lock).
    pub update_outpoint: OutPoint,
    /// Script paying to the name's own address.
    pub address: Script,
}

/// Read-only view of the host's name database.
pub trait NameCoinView {
    /// Coin data for a name, if the name exists.
    fn get_name(&self, name: &str) -> Option<NameData>;

    /// Output script for a player-provided payment address.
    ///
    /// Address encoding belongs to the host; `None` means the address
    /// cannot be encoded.
    fn script_for_address(&self, address: &str) -> Option<Script>;
}

/// Build the ordered game transactions for one step.
///
/// # Errors
///
/// Fails when a referenced player name is missing from the view or a bounty
/// address cannot be encoded; both mean the block is inconsistent.
pub fn create_game_transactions(
    view: &dyn NameCoinView,
    step_result: &StepResult,
) -> EngineResult<Vec<GameTransaction>> {
    let mut txs = Vec::new();

    // Destroy the name locks of killed players.
    let mut tx_kills = GameTransaction::default();
    for victim in step_result.killed_players() {
        let data = view
            .get_name(victim)
            .ok_or_else(|| EngineError::NameNotFound(victim.clone()))?;
        let reasons = step_result
            .killed_by()
            .get(victim)
            .ok_or_else(|| EngineError::MissingKillReason(victim.clone()))?;
        let Some(first) = reasons.iter().next() else {
            return Err(EngineError::MissingKillReason(victim.clone()));
        };

        // The smallest reason decides the encoding; for a destruct, every
        // simultaneous killer is listed after the opcode.
        let mut sig = Script::new();
        sig.push_data(victim.as_bytes());
        match first {
            KilledByInfo::Destruct(_) => {
                sig.push_int(GAMEOP_KILLED_BY);
                for reason in reasons {
                    match reason {
                        KilledByInfo::Destruct(killer) => {
                            sig.push_data(killer.to_string().as_bytes());
                        }
                        _ => break,
                    }
                }
            }
            KilledByInfo::Spawn => sig.push_int(GAMEOP_KILLED_BY),
            KilledByInfo::Poison => sig.push_int(GAMEOP_KILLED_POISON),
        }

        tx_kills.vin.push(TxIn {
            prevout: data.update_outpoint,
            script_sig: sig,
        });
    }
    if !tx_kills.vin.is_empty() {
        txs.push(tx_kills);
    }

    // Pay the bounties. Inputs are dummies describing their outputs.
    let mut tx_bounties = GameTransaction::default();
    for bounty in &step_result.bounties {
        let data = view
            .get_name(&bounty.character.player)
            .ok_or_else(|| EngineError::NameNotFound(bounty.character.player.clone()))?;

        let script_pubkey = if bounty.address.is_empty() {
            data.address
        } else {
            view.script_for_address(&bounty.address)
                .ok_or_else(|| EngineError::BadBountyAddress(bounty.address.clone()))?
        };
        tx_bounties.vout.push(TxOut {
            value: bounty.loot.amount,
            script_pubkey,
        });

        let mut sig = Script::new();
        sig.push_data(bounty.character.player.as_bytes());
        if bounty.loot.is_refund() {
            sig.push_int(GAMEOP_REFUND);
            sig.push_int(i64::from(bounty.character.index));
            sig.push_int(i64::from(bounty.loot.refund_height()));
        } else {
            sig.push_int(GAMEOP_COLLECTED_BOUNTY);
            sig.push_int(i64::from(bounty.character.index));
            sig.push_int(i64::from(bounty.loot.first_block));
            sig.push_int(i64::from(bounty.loot.last_block));
            sig.push_int(i64::from(bounty.loot.collected_first_block));
            sig.push_int(i64::from(bounty.loot.collected_last_block));
        }
        tx_bounties.vin.push(TxIn {
            prevout: OutPoint::null(),
            script_sig: sig,
        });
    }
    if !tx_bounties.vout.is_empty() {
        txs.push(tx_bounties);
    }

    Ok(txs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::loot::{CollectedLootInfo, LootInfo};
    use crate::game::state::{CharacterId, CollectedBounty};
    use std::collections::BTreeMap;

    struct MockView {
        names: BTreeMap<String, NameData>,
    }

    impl MockView {
        fn with_names(names: &[&str]) -> Self {
            let mut map = BTreeMap::new();
            for (i, name) in names.iter().enumerate() {
                let mut address = Script::new();
                address.push_data(name.as_bytes());
                map.insert(
                    (*name).to_string(),
                    NameData {
                        update_outpoint: OutPoint {
                            txid: Hash256::digest(name.as_bytes()),
                            n: i as u32,
                        },
                        address,
                    },
                );
            }
            Self { names: map }
        }
    }

    impl NameCoinView for MockView {
        fn get_name(&self, name: &str) -> Option<NameData> {
            self.names.get(name).cloned()
        }

        fn script_for_address(&self, address: &str) -> Option<Script> {
            if address.starts_with("bad") {
                return None;
            }
            let mut s = Script::new();
            s.push_data(address.as_bytes());
            Some(s)
        }
    }

    fn banked_bounty(player: &str, amount: Amount) -> CollectedBounty {
        let mut loot = CollectedLootInfo::default();
        loot.collect(&LootInfo::new(amount, 10), 12);
        CollectedBounty {
            character: CharacterId::new(player, 0),
            loot,
            address: String::new(),
        }
    }

    #[test]
    fn test_script_int_encoding() {
        let mut s = Script::new();
        s.push_int(0);
        s.push_int(1);
        s.push_int(16);
        s.push_int(17);
        s.push_int(-1);
        s.push_int(300);
        assert_eq!(
            s.as_bytes(),
            &[0x00, 0x51, 0x60, 0x01, 0x11, 0x4f, 0x02, 0x2c, 0x01]
        );
    }

    #[test]
    fn test_script_negative_and_high_bit() {
        let mut s = Script::new();
        s.push_int(-300);
        s.push_int(128);
        assert_eq!(s.as_bytes(), &[0x02, 0x2c, 0x81, 0x02, 0x80, 0x00]);
    }

    #[test]
    fn test_kill_tx_lists_all_killers() {
        let mut result = StepResult::default();
        result.kill_player(
            "victim".to_string(),
            KilledByInfo::Destruct(CharacterId::new("hunter1", 0)),
        );
        result.kill_player(
            "victim".to_string(),
            KilledByInfo::Destruct(CharacterId::new("hunter2", 0)),
        );
        let view = MockView::with_names(&["victim"]);

        let txs = create_game_transactions(&view, &result).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].vin.len(), 1);
        assert!(txs[0].vout.is_empty());

        let mut expected = Script::new();
        expected.push_data(b"victim");
        expected.push_int(GAMEOP_KILLED_BY);
        expected.push_data(b"hunter1");
        expected.push_data(b"hunter2");
        assert_eq!(txs[0].vin[0].script_sig, expected);
    }

    #[test]
    fn test_spawn_kill_has_no_killers() {
        let mut result = StepResult::default();
        result.kill_player("idler".to_string(), KilledByInfo::Spawn);
        let view = MockView::with_names(&["idler"]);

        let txs = create_game_transactions(&view, &result).unwrap();
        let mut expected = Script::new();
        expected.push_data(b"idler");
        expected.push_int(GAMEOP_KILLED_BY);
        assert_eq!(txs[0].vin[0].script_sig, expected);
    }

    #[test]
    fn test_poison_kill_opcode() {
        let mut result = StepResult::default();
        result.kill_player("sick".to_string(), KilledByInfo::Poison);
        let view = MockView::with_names(&["sick"]);

        let txs = create_game_transactions(&view, &result).unwrap();
        let mut expected = Script::new();
        expected.push_data(b"sick");
        expected.push_int(GAMEOP_KILLED_POISON);
        assert_eq!(txs[0].vin[0].script_sig, expected);
    }

    #[test]
    fn test_bounty_tx_pairs_inputs_and_outputs() {
        let mut result = StepResult::default();
        result.bounties.push(banked_bounty("alice", 70));
        result.bounties.push(banked_bounty("bob", 30));
        let view = MockView::with_names(&["alice", "bob"]);

        let txs = create_game_transactions(&view, &result).unwrap();
        assert_eq!(txs.len(), 1);
        let tx = &txs[0];
        assert_eq!(tx.vin.len(), 2);
        assert_eq!(tx.vout.len(), 2);
        assert_eq!(tx.vout[0].value, 70);
        assert_eq!(tx.vout[1].value, 30);
        assert_eq!(tx.vin[0].prevout, OutPoint::null());
    }

    #[test]
    fn test_refund_bounty_encoding() {
        let mut loot = CollectedLootInfo::default();
        loot.set_refund(42, 99);
        let mut result = StepResult::default();
        result.bounties.push(CollectedBounty {
            character: CharacterId::new("idler", 0),
            loot,
            address: String::new(),
        });
        let view = MockView::with_names(&["idler"]);

        let txs = create_game_transactions(&view, &result).unwrap();
        let mut expected = Script::new();
        expected.push_data(b"idler");
        expected.push_int(GAMEOP_REFUND);
        expected.push_int(0);
        expected.push_int(99);
        assert_eq!(txs[0].vin[0].script_sig, expected);
        assert_eq!(txs[0].vout[0].value, 42);
    }

    #[test]
    fn test_kills_precede_bounties() {
        let mut result = StepResult::default();
        result.kill_player("victim".to_string(), KilledByInfo::Poison);
        result.bounties.push(banked_bounty("alice", 10));
        let view = MockView::with_names(&["victim", "alice"]);

        let txs = create_game_transactions(&view, &result).unwrap();
        assert_eq!(txs.len(), 2);
        assert!(txs[0].vout.is_empty());
        assert!(!txs[1].vout.is_empty());
    }

    #[test]
    fn test_missing_name_is_fatal() {
        let mut result = StepResult::default();
        result.kill_player("unknown".to_string(), KilledByInfo::Poison);
        let view = MockView::with_names(&[]);

        let err = create_game_transactions(&view, &result).unwrap_err();
        assert!(matches!(err, EngineError::NameNotFound(_)));
    }

    #[test]
    fn test_bad_bounty_address_is_fatal() {
        let mut result = StepResult::default();
        let mut bounty = banked_bounty("alice", 10);
        bounty.address = "bad-address".to_string();
        result.bounties.push(bounty);
        let view = MockView::with_names(&["alice"]);

        let err = create_game_transactions(&view, &result).unwrap_err();
        assert!(matches!(err, EngineError::BadBountyAddress(_)));
    }

    #[test]
    fn test_player_address_used_when_set() {
        let mut result = StepResult::default();
        let mut bounty = banked_bounty("alice", 10);
        bounty.address = "GoodAddr".to_string();
        result.bounties.push(bounty);
        let view = MockView::with_names(&["alice"]);

        let txs = create_game_transactions(&view, &result).unwrap();
        let mut expected = Script::new();
        expected.push_data(b"GoodAddr");
        assert_eq!(txs[0].vout[0].script_pubkey, expected);
    }
}
