use crate::pow::is_valid_proof;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

/// Searches proofs in parallel and returns the smallest one satisfying the puzzle
/// against `previous_proof`, i.e. the same answer as [`crate::pow::solve`].
/// Returns `None` once `stop` is raised.
pub fn solve_parallel(previous_proof: u64, stop: &AtomicBool) -> Option<u64> {
    // `find_map_first` keeps the leftmost hit, so the result does not depend on
    // how rayon splits the range across threads.
    let found = (1u64..u64::MAX)
        .into_par_iter()
        .find_map_first(|candidate| {
            if stop.load(Ordering::Relaxed) {
                Some(None)
            } else if is_valid_proof(candidate, previous_proof) {
                Some(Some(candidate))
            } else {
                None
            }
        })
        .flatten();

    match found {
        Some(proof) => info!(previous_proof, proof, "solved proof of work"),
        None => debug!(previous_proof, "proof of work search stopped"),
    }
    found
}
