use log::{debug, info};

use super::block::Block;
use super::{
    ADJUSTMENT_FACTOR_MAX, ADJUSTMENT_FACTOR_MIN, BASE_DIFFICULTY, DEAD_ZONE_LOWER,
    DEAD_ZONE_UPPER, EVERY_X_BLOCKS, EXPECTED_BLOCK_TIME_SECS, MIN_DIFFICULTY,
};

/// Computes the proof-of-work difficulty the next mined block must satisfy.
///
/// The oracle tracks one running scalar, seeded to `BASE_DIFFICULTY`, and
/// recomputes it only at checkpoints: whenever the chain holds more than one
/// block and `(len - 1) % EVERY_X_BLOCKS == 0`. The adjustment is a pure
/// function of observed block timing, so replaying the same chain from genesis
/// reproduces the same sequence of values at every index.
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyOracle {
    current: u64,
}

impl DifficultyOracle {
    pub fn new() -> Self {
        Self {
            current: BASE_DIFFICULTY,
        }
    }

    /// Difficulty for the block extending `chain`; adjusts the running scalar
    /// when `chain` ends on a checkpoint, returns it unchanged otherwise.
    pub fn difficulty_for(&mut self, chain: &[Block]) -> u64 {
        if chain.len() > 1 && (chain.len() - 1) % EVERY_X_BLOCKS == 0 {
            let last = &chain[chain.len() - 1];
            let nth_last = &chain[chain.len().saturating_sub(EVERY_X_BLOCKS)];
            let timestamp_diff = last.timestamp - nth_last.timestamp;
            debug!(
                "difficulty checkpoint at height {}: window {}..{} spanned {}s",
                chain.len() - 1,
                nth_last.index,
                last.index,
                timestamp_diff
            );
            self.current = adjust(self.current, timestamp_diff);
        }
        self.current
    }

    /// Re-derive the oracle deterministically by walking every prefix of
    /// `chain` from genesis. Used when a candidate chain replaces history.
    pub fn replay(chain: &[Block]) -> Self {
        let mut oracle = Self::new();
        for end in 1..=chain.len() {
            oracle.difficulty_for(&chain[..end]);
        }
        oracle
    }
}

impl Default for DifficultyOracle {
    fn default() -> Self {
        Self::new()
    }
}

fn adjust(current: u64, timestamp_diff: i64) -> u64 {
    if timestamp_diff == 0 {
        return current;
    }

    let expected = EXPECTED_BLOCK_TIME_SECS * EVERY_X_BLOCKS as i64;
    let time_ratio = timestamp_diff as f64 / expected as f64;

    // Inside the dead zone the timing is close enough to target; leave the
    // difficulty alone rather than oscillate on noise.
    if (DEAD_ZONE_LOWER..=DEAD_ZONE_UPPER).contains(&time_ratio) {
        debug!("no adjustment needed, time ratio {time_ratio:.2} within dead zone");
        return current;
    }

    let factor = time_ratio.clamp(ADJUSTMENT_FACTOR_MIN, ADJUSTMENT_FACTOR_MAX);
    let adjusted = ((current as f64 * factor).round() as u64).max(MIN_DIFFICULTY);
    info!("difficulty adjusted: {current} -> {adjusted} (factor {factor:.2})");
    adjusted
}
