//! The three study engines. Each one only reads the card list it is given;
//! edits made in review mode are handed back to the caller for write-back.

pub mod matching;
pub mod review;
pub mod test_mode;

pub use matching::{MatchBoard, MatchItem, Mismatch, SelectOutcome, MISMATCH_CLEAR_DELAY};
pub use review::{EditDraft, ReviewDeck};
pub use test_mode::{Grade, TestPhase, TestSession};

use rand::seq::SliceRandom;
use rand::Rng;

/// A fresh uniform permutation of `0..len`.
pub(crate) fn shuffled_indices<R: Rng + ?Sized>(len: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    order.shuffle(rng);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn shuffled_indices_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut order = shuffled_indices(10, &mut rng);
        order.sort_unstable();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn different_runs_produce_different_orders() {
        let mut rng = StdRng::seed_from_u64(11);
        let runs: Vec<Vec<usize>> = (0..5).map(|_| shuffled_indices(8, &mut rng)).collect();
        assert!(runs.windows(2).any(|w| w[0] != w[1]));
    }
}
