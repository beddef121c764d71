use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of the training and held-out partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded RNG and hold out `ceil(test_fraction * n)`
/// rows. The same `(n, test_fraction, seed)` always gives the same partition.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> Partition {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((test_fraction * n as f64).ceil() as usize).min(n);
    let train = indices.split_off(n_test);
    Partition {
        train,
        test: indices,
    }
}
