//! Chain parameters and consensus fork gates.
//!
//! The host selects one of the three networks at startup and passes the
//! resulting immutable [`ChainParams`] record into every step. Rule changes
//! are height-gated through [`ChainParams::fork_in_effect`]; the game engine
//! never consults anything else to decide which rule variant applies.

use crate::game::Hash256;

/// Coin amount in the smallest indivisible unit.
pub type Amount = i64;

/// Number of base units per coin.
pub const COIN: Amount = 100_000_000;

/// Proof-of-work algorithms merged-mined on the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowAlgo {
    /// Double SHA-256.
    Sha256d = 0,
    /// Scrypt.
    Scrypt = 1,
}

/// Number of supported PoW algorithms.
pub const NUM_ALGOS: usize = 2;

/// Height-gated rule changes, in activation order on mainnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fork {
    /// Introduces the poison disaster.
    Poison = 0,
    /// Introduces the loot carrying capacity.
    Carryingcap = 1,
    /// Stops heart spawning.
    Lesshearts = 2,
    /// Attacks drain locked coins instead of killing instantly; banks
    /// replace the spawn strip as banking spots; single-character players.
    Lifesteal = 3,
    /// Spawn-protection character modes and the ranged attack wave.
    Timesave = 4,
}

const NUM_FORKS: usize = 5;

/// Which network the parameters describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Production network.
    Main,
    /// Public test network.
    Test,
    /// Local regression-test network.
    Reg,
}

/// Immutable consensus parameters for one network.
#[derive(Debug, Clone)]
pub struct ChainParams {
    /// Which network this record describes.
    pub network: Network,
    /// Blocks between block-subsidy halvings.
    pub subsidy_halving_interval: i32,
    /// Initial block subsidy.
    pub initial_subsidy: Amount,
    /// Target seconds between blocks (across all algorithms).
    pub pow_target_spacing: u32,
    /// Minimum-difficulty target in compact bits, per algorithm.
    pub pow_limit_bits: [u32; NUM_ALGOS],
    /// AuxPoW chain id, per algorithm.
    pub auxpow_chain_id: [u32; NUM_ALGOS],
    /// Hash of the genesis block.
    pub genesis_hash: Hash256,
    /// Activation heights, indexed by [`Fork`].
    fork_heights: [i32; NUM_FORKS],
}

impl ChainParams {
    /// Parameters of the production network.
    #[must_use]
    pub fn main() -> Self {
        Self {
            network: Network::Main,
            subsidy_halving_interval: 2_100_000,
            initial_subsidy: 20 * COIN,
            pow_target_spacing: 60 * NUM_ALGOS as u32,
            pow_limit_bits: [0x1d00_ffff, 0x1e0f_ffff],
            auxpow_chain_id: [0x0006, 0x0002],
            genesis_hash: Hash256::digest(
                b"\nQuarry genesis timestamp\n03/Feb/2014 18:00 GMT\n",
            ),
            fork_heights: [255_000, 500_000, 590_000, 795_000, 1_521_500],
        }
    }

    /// Parameters of the public test network.
    #[must_use]
    pub fn test() -> Self {
        Self {
            network: Network::Test,
            subsidy_halving_interval: 2_100_000,
            initial_subsidy: 20 * COIN,
            pow_target_spacing: 60 * NUM_ALGOS as u32,
            pow_limit_bits: [0x1e00_ffff, 0x1f0f_ffff],
            auxpow_chain_id: [555, 555],
            genesis_hash: Hash256::digest(b"\nQuarry testnet timestamp\n28/Jul/2018 15:00 GMT\n"),
            fork_heights: [500, 1_000, 1_500, 2_000, 3_000],
        }
    }

    /// Parameters of the local regression-test network.
    #[must_use]
    pub fn regtest() -> Self {
        Self {
            network: Network::Reg,
            subsidy_halving_interval: 150,
            initial_subsidy: 20 * COIN,
            pow_target_spacing: 1,
            pow_limit_bits: [0x207f_ffff, 0x207f_ffff],
            auxpow_chain_id: [0x0006, 0x0002],
            genesis_hash: Hash256::digest(b"\nQuarry regtest\n"),
            fork_heights: [10, 12, 14, 15, 20],
        }
    }

    /// Activation height of a fork.
    #[must_use]
    pub fn fork_height(&self, fork: Fork) -> i32 {
        self.fork_heights[fork as usize]
    }

    /// Whether a fork is active at the given height.
    #[must_use]
    pub fn fork_in_effect(&self, fork: Fork, height: i32) -> bool {
        height >= self.fork_heights[fork as usize]
    }

    /// Whether relaxed testing rules apply (shorter disaster schedule).
    #[must_use]
    pub fn testing_rules(&self) -> bool {
        !matches!(self.network, Network::Main)
    }

    /// Block subsidy at a height, following the halving schedule.
    #[must_use]
    pub fn block_subsidy(&self, height: i32) -> Amount {
        let halvings = (height.max(0) / self.subsidy_halving_interval) as u32;
        if halvings >= 63 {
            return 0;
        }
        self.initial_subsidy >> halvings
    }

    /// Minimum amount of coins locked in a player's name output.
    ///
    /// This is both the spawning cost floor and the per-attacker damage unit
    /// once the life-steal fork is active.
    #[must_use]
    pub fn name_coin_amount(&self, height: i32) -> Amount {
        match self.network {
            Network::Reg => 3,
            Network::Main | Network::Test => {
                if self.fork_in_effect(Fork::Lifesteal, height) {
                    200 * COIN
                } else {
                    COIN
                }
            }
        }
    }
}
