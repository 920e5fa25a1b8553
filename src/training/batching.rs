//! Mini-batch index plans.
//!
//! [`minibatches`] splits `0..n` into consecutive chunks of `batch_size`
//! trials, after an optional shuffle. The last chunk may be shorter; every
//! trial appears exactly once per plan.
use rand::{Rng, seq::SliceRandom};

/// Index chunks covering `0..n` once.
///
/// A `batch_size` of 0 is treated as 1.
pub fn minibatches<R: Rng + ?Sized>(
    n: usize, batch_size: usize, shuffle: bool, rng: &mut R,
) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..n).collect();
    if shuffle {
        order.shuffle(rng);
    }
    order.chunks(batch_size.max(1)).map(<[usize]>::to_vec).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    // Purpose
    // -------
    // Verify a shuffled plan visits every trial exactly once.
    //
    // Given
    // -----
    // - n = 11, batch size 4, shuffle on.
    //
    // Expect
    // ------
    // - Chunk sizes [4, 4, 3]; sorted union equals 0..11.
    fn shuffled_plan_covers_every_trial_once() {
        // Arrange
        let mut rng = ChaCha8Rng::seed_from_u64(6);

        // Act
        let plan = minibatches(11, 4, true, &mut rng);

        // Assert
        let sizes: Vec<usize> = plan.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 3]);
        let mut seen: Vec<usize> = plan.concat();
        seen.sort_unstable();
        assert_eq!(seen, (0..11).collect::<Vec<_>>());
    }

    #[test]
    // Purpose
    // -------
    // Ensure an unshuffled plan keeps the natural order.
    //
    // Given
    // -----
    // - n = 3, batch size 2, shuffle off.
    //
    // Expect
    // ------
    // - [[0, 1], [2]].
    fn unshuffled_plan_keeps_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(minibatches(3, 2, false, &mut rng), vec![vec![0, 1], vec![2]]);
    }
}
