use crate::domain::model::{Matrix, MatrixSize};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::Mutex;

/// 測試輸入的取值範圍 [1, 10)
pub const TEST_VALUE_RANGE: Range<u8> = 1..10;

/// 產生隨機測試矩陣；給定 seed 時結果可重現
pub struct MatrixGenerator {
    rng: Mutex<StdRng>,
    range: Range<u8>,
}

impl MatrixGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng: Mutex::new(rng),
            range: TEST_VALUE_RANGE,
        }
    }

    pub fn with_range(mut self, range: Range<u8>) -> Self {
        self.range = range;
        self
    }

    pub fn generate(&self, size: MatrixSize) -> Matrix<u8> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Matrix::from_fn(size, |_, _| rng.random_range(self.range.clone()))
    }

    /// 依序產生 A 與 B
    pub fn generate_pair(&self, size: MatrixSize) -> (Matrix<u8>, Matrix<u8>) {
        (self.generate(size), self.generate(size))
    }
}

impl Default for MatrixGenerator {
    fn default() -> Self {
        Self::new(None)
    }
}
