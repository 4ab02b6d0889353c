// Musical system solver: assign a note to each of the 22 paths so the tree
// sounds a world's triads.
//
// Each attempt is a pure function of (world, triads, seed) and runs five
// phases:
// 1. Supernal skeleton: the center key's major triad goes on paths 11/12/14
//    in shuffled order.
// 2. Ethical and Astral skeletons: each picks a random unplaced triad related
//    to the previous one (shared tone, or roots a third/fourth/fifth apart)
//    for 19/20/22 and then 27/28/30.
// 3. Slot fitting: every remaining triad must land in one of the seven
//    triad slots (shuffled). A slot fits when its already-assigned tones are
//    a subset of the triad and it has enough open paths for the rest.
// 4. Coverage: unused palette tones go on open paths (shuffled), then any
//    paths still open get random palette tones.
// 5. Verification: the full chord listing must realize at least
//    `min_distinct_triads` world triads. Passing attempts are scored.
//
// `solve` draws one seed per attempt from the caller's RNG and keeps the
// best-scoring candidate, stopping at the first one above
// `good_enough_score`. Failed attempts are only traced.

use crate::error::{Error, Result};
use crate::pitch::{Note, PitchSet};
use crate::system::{
    Assignment, ChordEntry, Consonance, MusicalSystem, chord_listing, distinct_triads_found,
};
use crate::tree::{ASTRAL, ETHICAL, Grouping, PathNumber, SUPERNAL, TreeTriad, triad_slots};
use crate::world::{Triad, TriadQuality, World, WorldName};
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, trace};

/// Search limits and acceptance thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SolverConfig {
    pub max_attempts: usize,
    /// Stop searching once a candidate scores strictly above this.
    pub good_enough_score: i32,
    pub min_distinct_triads: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_attempts: 2000,
            good_enough_score: 0,
            min_distinct_triads: 6,
        }
    }
}

/// Why a single attempt was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptFailure {
    NoRelatedTriad,
    NoSlotFits,
    CoverageShortfall { unused: usize, open: usize },
    TooFewTriads { found: usize },
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::NoRelatedTriad => write!(f, "no related triad left to place"),
            AttemptFailure::NoSlotFits => write!(f, "a triad fits no slot"),
            AttemptFailure::CoverageShortfall { unused, open } => {
                write!(f, "{unused} unused palette tones but {open} open paths")
            }
            AttemptFailure::TooFewTriads { found } => write!(f, "only {found} triads realized"),
        }
    }
}

/// A complete assignment that passed verification.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub assignment: Assignment,
    pub chords: Vec<ChordEntry>,
    pub score: i32,
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub world: WorldName,
    pub assignment: Assignment,
    pub score: i32,
    /// Seed of the winning attempt; `attempt` with this seed reproduces it.
    pub seed: u64,
    pub attempts: usize,
}

impl Solution {
    pub fn to_system(&self, date: &str) -> MusicalSystem {
        MusicalSystem::from_assignment(
            &self.world.world(),
            &self.assignment,
            MusicalSystem::system_name(self.world, date),
        )
    }
}

/// Heuristic pleasantness: +10 per grouping with more than one tone, +5 per
/// calm grouping, -5 per grouping that collapses to one tone over several
/// paths.
pub fn score(chords: &[ChordEntry]) -> i32 {
    chords
        .iter()
        .map(|c| {
            let tones = c.chord_tones.len();
            let mut s = 0;
            if tones > 1 {
                s += 10;
            }
            if c.spice == Consonance::Calm {
                s += 5;
            }
            if tones == 1 && c.path_numbers.len() > 1 {
                s -= 5;
            }
            s
        })
        .sum()
}

/// Run one attempt. Same inputs and seed, same result.
pub fn attempt(
    world: &World,
    triads: &[Triad],
    config: &SolverConfig,
    seed: u64,
) -> std::result::Result<Candidate, AttemptFailure> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut assignment = Assignment::new();
    let mut placed: Vec<PitchSet> = Vec::with_capacity(3);

    let supernal = triads
        .iter()
        .find(|t| t.root == world.center && t.quality == TriadQuality::Major)
        .or_else(|| triads.first())
        .ok_or(AttemptFailure::NoRelatedTriad)?;
    place_tree_triad(&mut assignment, &SUPERNAL, supernal, &mut rng);
    placed.push(supernal.signature());

    let ethical = pick_related(supernal, triads, &placed, &mut rng)?;
    place_tree_triad(&mut assignment, &ETHICAL, ethical, &mut rng);
    placed.push(ethical.signature());

    let astral = pick_related(ethical, triads, &placed, &mut rng)?;
    place_tree_triad(&mut assignment, &ASTRAL, astral, &mut rng);
    placed.push(astral.signature());

    let mut slots = triad_slots();
    slots.shuffle(&mut rng);
    for triad in triads.iter().filter(|t| !placed.contains(&t.signature())) {
        if !fit_into_slot(&mut assignment, triad, &slots, &mut rng) {
            return Err(AttemptFailure::NoSlotFits);
        }
    }

    fill_coverage(&mut assignment, world, &mut rng)?;

    let chords = chord_listing(&assignment);
    let found = distinct_triads_found(&chords, triads);
    if found < config.min_distinct_triads {
        return Err(AttemptFailure::TooFewTriads { found });
    }
    Ok(Candidate {
        score: score(&chords),
        assignment,
        chords,
    })
}

fn place_tree_triad(
    assignment: &mut Assignment,
    tree_triad: &TreeTriad,
    triad: &Triad,
    rng: &mut impl Rng,
) {
    let mut tones = triad.tones;
    tones.shuffle(rng);
    for (&path, note) in tree_triad.paths.iter().zip(tones) {
        assignment.set(path, note);
    }
}

fn pick_related<'a>(
    from: &Triad,
    triads: &'a [Triad],
    placed: &[PitchSet],
    rng: &mut impl Rng,
) -> std::result::Result<&'a Triad, AttemptFailure> {
    let candidates: Vec<&Triad> = triads
        .iter()
        .filter(|t| from.is_related_to(t) && !placed.contains(&t.signature()))
        .collect();
    candidates
        .choose(rng)
        .copied()
        .ok_or(AttemptFailure::NoRelatedTriad)
}

fn fit_into_slot(
    assignment: &mut Assignment,
    triad: &Triad,
    slots: &[Grouping],
    rng: &mut impl Rng,
) -> bool {
    let signature = triad.signature();
    for slot in slots {
        let assigned: Vec<Note> = slot.paths.iter().filter_map(|&p| assignment.get(p)).collect();
        if !assigned.iter().all(|n| signature.contains(n.pitch_class())) {
            continue;
        }
        let open: Vec<PathNumber> = slot
            .paths
            .iter()
            .copied()
            .filter(|&p| !assignment.is_assigned(p))
            .collect();
        let remaining: Vec<Note> = triad
            .tones
            .iter()
            .copied()
            .filter(|t| !assigned.contains(t))
            .collect();
        if open.len() < remaining.len() {
            continue;
        }
        for (i, &path) in open.iter().enumerate() {
            let note = match remaining.get(i) {
                Some(&n) => n,
                None => triad.tones[rng.random_range(0..triad.tones.len())],
            };
            assignment.set(path, note);
        }
        return true;
    }
    false
}

fn fill_coverage(
    assignment: &mut Assignment,
    world: &World,
    rng: &mut impl Rng,
) -> std::result::Result<(), AttemptFailure> {
    let used = assignment.used();
    let mut unused: Vec<Note> = world
        .palette
        .iter()
        .copied()
        .filter(|n| !used.contains(n.pitch_class()))
        .collect();
    let open = assignment.unassigned();
    if open.len() < unused.len() {
        return Err(AttemptFailure::CoverageShortfall {
            unused: unused.len(),
            open: open.len(),
        });
    }
    unused.shuffle(rng);
    for (i, path) in open.into_iter().enumerate() {
        let note = match unused.get(i) {
            Some(&n) => n,
            None => world.palette[rng.random_range(0..world.palette.len())],
        };
        assignment.set(path, note);
    }
    Ok(())
}

/// Search for a musical system, drawing attempt seeds from `rng`.
pub fn solve(world: WorldName, config: &SolverConfig, rng: &mut impl Rng) -> Result<Solution> {
    let world_data = world.world();
    let triads = world_data.triads();
    let mut best: Option<(Candidate, u64)> = None;
    let mut attempts = 0;

    for attempt_index in 0..config.max_attempts {
        attempts = attempt_index + 1;
        let seed: u64 = rng.random();
        match attempt(&world_data, &triads, config, seed) {
            Ok(candidate) => {
                let score = candidate.score;
                debug!(%world, attempt = attempt_index, score, "candidate accepted");
                if best.as_ref().is_none_or(|(b, _)| score > b.score) {
                    best = Some((candidate, seed));
                }
                if score > config.good_enough_score {
                    break;
                }
            }
            Err(failure) => {
                trace!(%world, attempt = attempt_index, %failure, "attempt rejected");
            }
        }
    }

    let (candidate, seed) = best.ok_or(Error::SolverExhausted {
        world,
        attempts: config.max_attempts,
    })?;
    info!(%world, score = candidate.score, attempts, seed, "musical system solved");
    Ok(Solution {
        world,
        assignment: candidate.assignment,
        score: candidate.score,
        seed,
        attempts,
    })
}

/// Replayable entry point: the whole search is fixed by `seed`.
pub fn solve_seeded(world: WorldName, config: &SolverConfig, seed: u64) -> Result<Solution> {
    let mut rng = StdRng::seed_from_u64(seed);
    solve(world, config, &mut rng)
}
