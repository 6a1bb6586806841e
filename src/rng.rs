use std::collections::VecDeque;

/// Source of uniform randomness consumed by board generation and collectible placement.
///
/// Only `next_f32` is required; the integer helpers are derived from it so every
/// implementation draws the same way.
pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn next_f32(&mut self) -> f32;

    /// Uniform integer in `[min, max]`, both ends inclusive.
    fn int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f32;
        let offset = (self.next_f32() * span).floor() as i32;
        min + offset.min(max - min)
    }

    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_f32() * len as f32).floor().min((len - 1) as f32) as usize
    }

    fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>
    where
        Self: Sized,
    {
        if items.is_empty() {
            return None;
        }
        items.get(self.pick_index(items.len()))
    }
}

/// Seeded mulberry32 generator; the same seed always yields the same board and placements.
#[derive(Clone, Debug)]
pub struct Rng {
    seed: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }
}

impl RandomSource for Rng {
    fn next_f32(&mut self) -> f32 {
        self.seed = self.seed.wrapping_add(0x6d2b79f5);
        let mut t = self.seed;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);
        (out as f64 / 4_294_967_296.0) as f32
    }
}

/// Replays a fixed list of integer draws, ignoring the requested range.
///
/// Lets tests walk the generator through specific accept/reject branches.
/// Once the script is exhausted every draw returns the lower bound.
#[derive(Clone, Debug, Default)]
pub struct ScriptedRng {
    ints: VecDeque<i32>,
    fractions: VecDeque<f32>,
}

impl ScriptedRng {
    pub fn new(ints: impl IntoIterator<Item = i32>) -> Self {
        Self {
            ints: ints.into_iter().collect(),
            fractions: VecDeque::new(),
        }
    }

    pub fn with_fractions(mut self, fractions: impl IntoIterator<Item = f32>) -> Self {
        self.fractions = fractions.into_iter().collect();
        self
    }

    pub fn remaining(&self) -> usize {
        self.ints.len()
    }
}

impl RandomSource for ScriptedRng {
    fn next_f32(&mut self) -> f32 {
        self.fractions.pop_front().unwrap_or(0.0)
    }

    fn int(&mut self, min: i32, _max: i32) -> i32 {
        self.ints.pop_front().unwrap_or(min)
    }
}
