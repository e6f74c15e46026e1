//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! A match is a pure function of catalog, difficulty, seed and the command
//! script. Sources of non-determinism this guards against:
//!
//! - **Floating-point math**: the update uses [`lanewar_core::math::Fixed`]
//!   throughout; floats only appear in catalog files and snapshots.
//! - **Iteration order**: units live in an id-ordered map.
//! - **System randomness**: the opponent draws from a seeded ChaCha stream.
//!
//! # Test Levels
//!
//! 1. **Repeated runs**: the same setup run N times hashes identically
//! 2. **Scripted runs**: random command scripts replay identically
//! 3. **Threaded runs**: N copies on separate threads all match

use std::thread;

use lanewar_core::commands::Command;
use lanewar_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        assert!(
            self.is_deterministic,
            "Simulation is non-deterministic!\n\
             Runs: {}\n\
             Ticks: {}\n\
             Unique hashes: {} (expected 1)\n\
             All hashes: {:?}",
            self.hashes.len(),
            self.ticks,
            self.unique_hashes().len(),
            self.hashes
        );
    }
}

/// Run a setup multiple times and verify every run ends in the same state.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of updates per run
/// * `setup` - Creates the initial state
/// * `step` - Advances the state by one update
/// * `hash` - Computes the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();
        for _ in 0..ticks {
            step(&mut state);
        }
        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run `num_sims` copies on scoped threads and collect their final hashes.
///
/// # Panics
///
/// Panics if a worker thread panics.
pub fn run_threaded_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.step();
                    }
                    sim.session().state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("simulation thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two runs update by update and report the first divergence.
///
/// Returns `None` if the runs match throughout, `Some(tick)` otherwise.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.session().state_hash() != b.session().state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.step();
        b.step();
        if a.session().state_hash() != b.session().state_hash() {
            return Some(tick);
        }
    }

    None
}

/// A command scheduled before a given update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedCommand {
    /// Update number before which the command is applied.
    pub at_tick: u64,
    /// The command.
    pub command: Command,
}

/// Run a simulation with a command script and return the final hash.
///
/// Commands are applied through the silent command surface, so rejected
/// ones are simply skipped.
pub fn run_script(mut sim: Simulation, script: &[ScriptedCommand], ticks: u64) -> u64 {
    let mut pending = script.to_vec();
    pending.sort_by_key(|c| c.at_tick);
    let mut pending = pending.into_iter().peekable();

    for tick in 0..ticks {
        while let Some(next) = pending.next_if(|c| c.at_tick <= tick) {
            sim.apply(next.command);
        }
        if sim.step().is_none() {
            break;
        }
    }

    sim.session().state_hash()
}

/// Proptest strategies for simulation testing.
pub mod strategies {
    use lanewar_core::commands::Command;
    use lanewar_core::components::Side;
    use lanewar_core::data::DifficultyId;
    use proptest::prelude::*;

    use super::ScriptedCommand;

    /// Archetype ids from the built-in catalog plus one unknown id.
    pub const ARCHETYPES: [&str; 7] = [
        "warrior",
        "archer",
        "knight",
        "heavy_swordsman",
        "crossbowman",
        "dragon_knight",
        "unknown_unit",
    ];

    /// Upgrade ids from the built-in catalog plus one unknown id.
    pub const UPGRADES: [&str; 4] = ["wall", "cannon", "heavy_cannon", "unknown_upgrade"];

    /// Any difficulty.
    pub fn arb_difficulty() -> impl Strategy<Value = DifficultyId> {
        prop_oneof![
            Just(DifficultyId::Easy),
            Just(DifficultyId::Normal),
            Just(DifficultyId::Hard),
        ]
    }

    /// Either side.
    pub fn arb_side() -> impl Strategy<Value = Side> {
        prop_oneof![Just(Side::Player), Just(Side::Opponent)]
    }

    /// A match-level command (spawn, upgrade, evolve), valid or not.
    pub fn arb_command() -> impl Strategy<Value = Command> {
        prop_oneof![
            4 => (0..ARCHETYPES.len(), arb_side()).prop_map(|(i, side)| Command::SpawnUnit {
                archetype: ARCHETYPES[i].to_string(),
                side,
            }),
            1 => (0..UPGRADES.len(), arb_side()).prop_map(|(i, side)| Command::BuyUpgradeFor {
                side,
                upgrade: UPGRADES[i].to_string(),
            }),
            1 => arb_side().prop_map(|side| Command::Evolve { side }),
        ]
    }

    /// A command script spread over the first `max_tick` updates.
    pub fn arb_script(max_len: usize, max_tick: u64) -> impl Strategy<Value = Vec<ScriptedCommand>> {
        proptest::collection::vec(
            (0..max_tick, arb_command())
                .prop_map(|(at_tick, command)| ScriptedCommand { at_tick, command }),
            0..max_len,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{live_simulation, quiet_simulation};
    use lanewar_core::prelude::*;
    use proptest::prelude::*;

    fn skirmish() -> Simulation {
        let mut sim = live_simulation(DifficultyId::Hard, 1234);
        let session = sim.session_mut();
        session.base_mut(Side::Player).gold = Fixed::from_num(1000);
        for archetype in ["warrior", "archer", "knight", "warrior"] {
            session.try_spawn_unit(archetype, Side::Player).unwrap();
        }
        session.try_buy_upgrade(Side::Player, "cannon").unwrap();
        sim
    }

    #[test]
    fn test_repeated_runs_match() {
        verify_determinism(
            3,
            1800,
            skirmish,
            |sim| {
                sim.step();
            },
            |sim| sim.session().state_hash(),
        )
        .assert_deterministic();
    }

    #[test]
    fn test_no_divergence() {
        assert_eq!(find_first_divergence(skirmish, 1200), None);
    }

    #[test]
    fn test_threaded_runs_match() {
        run_threaded_simulations(skirmish, 4, 1200).assert_deterministic();
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = run_script(live_simulation(DifficultyId::Hard, 1), &[], 3600);
        let b = run_script(live_simulation(DifficultyId::Hard, 2), &[], 3600);
        assert_ne!(a, b);
    }

    #[test]
    fn test_script_ordering_is_stable() {
        let script = vec![
            ScriptedCommand {
                at_tick: 10,
                command: Command::spawn("archer"),
            },
            ScriptedCommand {
                at_tick: 0,
                command: Command::spawn("warrior"),
            },
        ];
        let mut reversed = script.clone();
        reversed.reverse();

        let a = run_script(quiet_simulation(DifficultyId::Normal), &script, 300);
        let b = run_script(quiet_simulation(DifficultyId::Normal), &reversed, 300);
        assert_eq!(a, b);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Any command script replays to the same state.
        #[test]
        fn prop_scripts_replay_identically(
            script in strategies::arb_script(20, 600),
            difficulty in strategies::arb_difficulty(),
            seed in any::<u64>(),
        ) {
            let a = run_script(live_simulation(difficulty, seed), &script, 900);
            let b = run_script(live_simulation(difficulty, seed), &script, 900);
            prop_assert_eq!(a, b);
        }
    }
}
