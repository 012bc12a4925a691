//! Quarry CLI - inspect game snapshots and run scripted simulations.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::PathBuf;
use std::process::ExitCode;

use quarry::game::{snapshot, Hash256, Move, StepData};
use quarry::{perform_step, ChainParams, GameState};

/// Quarry - deterministic on-chain hunting game core
#[derive(Parser, Debug)]
#[command(name = "quarry")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a game-state snapshot as JSON
    Inspect {
        /// Snapshot file
        snapshot: PathBuf,
    },

    /// Run a scripted game on regtest rules and print a summary
    Simulate {
        /// Number of blocks to step through
        #[arg(short = 'n', long, default_value = "60")]
        steps: u32,

        /// Seed for the scripted moves
        #[arg(short, long, default_value = "1")]
        seed: u64,

        /// Number of players to spawn
        #[arg(short, long, default_value = "4")]
        players: u8,

        /// Save the final state as a snapshot
        #[arg(long)]
        save: Option<PathBuf>,

        /// Suppress per-block output
        #[arg(short, long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    let outcome = match args.command {
        Commands::Inspect { snapshot } => inspect(&snapshot),
        Commands::Simulate {
            steps,
            seed,
            players,
            save,
            quiet,
        } => simulate(steps, seed, players, save.as_deref(), quiet),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn inspect(path: &std::path::Path) -> Result<(), String> {
    let state = snapshot::load(path).map_err(|e| e.to_string())?;
    let json = serde_json::to_string_pretty(&state.to_json()).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

fn simulate(
    steps: u32,
    seed: u64,
    players: u8,
    save: Option<&std::path::Path>,
    quiet: bool,
) -> Result<(), String> {
    let params = ChainParams::regtest();
    let mut state = GameState::new();
    let mut noise = StdRng::seed_from_u64(seed);

    let mut total_kills = 0usize;
    let mut total_bounties = 0usize;

    for step in 0..steps {
        let height = step as i32;
        let mut hash_input = seed.to_le_bytes().to_vec();
        hash_input.extend_from_slice(&height.to_le_bytes());
        let hash = Hash256::digest(&hash_input);

        let mut data = StepData::new(hash, height, params.block_subsidy(height));

        // Spawn one player per block until the target population is reached.
        let spawned = state.players.len();
        if spawned < usize::from(players) {
            let name = format!("hunter{spawned}");
            let json = format!(r#"{{"color": {}}}"#, spawned % 4);
            if let Some(mv) = Move::parse(&name, params.name_coin_amount(height), &json) {
                data.add_move(mv);
            }
        }

        // Scripted wandering: some players pick a fresh destination.
        let names: Vec<String> = state.players.keys().cloned().collect();
        for name in names {
            if noise.gen_bool(0.6) {
                continue;
            }
            let x = noise.gen_range(2..500);
            let y = noise.gen_range(2..500);
            let json = format!(r#"{{"0": {{"wp": [{x}, {y}]}}}}"#);
            let locked = state.players[&name].locked_coins;
            if let Some(mv) = Move::parse(&name, locked, &json) {
                data.add_move(mv);
            }
        }

        let (next, result) = perform_step(&params, &state, &data).map_err(|e| e.to_string())?;
        total_kills += result.killed_players().len();
        total_bounties += result.bounties.len();

        if !quiet && (!result.killed_players().is_empty() || !result.bounties.is_empty()) {
            for victim in result.killed_players() {
                println!("block {height}: {victim} died");
            }
            for bounty in &result.bounties {
                println!(
                    "block {height}: {} banked {}",
                    bounty.character, bounty.loot.amount
                );
            }
        }

        state = next;
    }

    println!("--- simulation finished ---");
    println!("blocks:      {steps}");
    println!("players:     {}", state.players.len());
    println!("loot tiles:  {}", state.loot.len());
    println!("game fund:   {}", state.game_fund);
    println!("kills:       {total_kills}");
    println!("bounties:    {total_bounties}");

    if let Some(path) = save {
        snapshot::save(&state, path).map_err(|e| e.to_string())?;
        println!("snapshot written to {}", path.display());
    }

    Ok(())
}
