//! Face-count classification strategies.
//!
//! The presence monitor only needs a face count per frame. Real deployments
//! plug a vision model in behind [`FaceClassifier`]; the two classifiers here
//! are for demos and tests.

use crate::platform::Frame;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Counts faces in a frame.
pub trait FaceClassifier: Send {
    /// Returns the number of faces visible in `frame`.
    fn count_faces(&mut self, frame: &Frame) -> usize;
}

/// Weighted random stand-in: 90% one face, 5% none, 5% two.
///
/// Demonstration only. The draw ignores frame content.
pub struct StubClassifier {
    rng: ChaCha8Rng,
}

impl StubClassifier {
    /// Seeded classifier; the same seed yields the same sequence.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self { rng: ChaCha8Rng::seed_from_u64(seed) }
    }
}

impl FaceClassifier for StubClassifier {
    fn count_faces(&mut self, _frame: &Frame) -> usize {
        match self.rng.gen_range(0..100u32) {
            0..=89 => 1,
            90..=94 => 0,
            _ => 2,
        }
    }
}

/// Replays a fixed sequence of counts, then repeats the last one.
pub struct ScriptedClassifier {
    script: Vec<usize>,
    position: usize,
}

impl ScriptedClassifier {
    /// Creates a classifier over `script`. An empty script always yields 1.
    #[must_use]
    pub fn new(script: impl Into<Vec<usize>>) -> Self {
        Self { script: script.into(), position: 0 }
    }
}

impl FaceClassifier for ScriptedClassifier {
    fn count_faces(&mut self, _frame: &Frame) -> usize {
        let Some(last) = self.script.last().copied() else {
            return 1;
        };
        let count = self.script.get(self.position).copied().unwrap_or(last);
        self.position = self.position.saturating_add(1);
        count
    }
}
