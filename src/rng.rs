/// Source of uniform randomness for movement policies.
///
/// Every weighted draw in the crate goes through this trait so tests can
/// swap in a scripted sequence instead of the seeded generator.
pub trait RandomSource {
    /// Uniform value in `[0, 1)`.
    fn next_f32(&mut self) -> f32;

    fn chance(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_f32() * len as f32).floor().min((len - 1) as f32) as usize
    }
}

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
        // Top 24 bits fit the f32 mantissa exactly, so the result stays below 1.
        (out >> 8) as f32 / 16_777_216.0
    }
}

/// Replays a fixed list of values, wrapping around at the end.
#[derive(Clone, Debug)]
pub struct ScriptedRng {
    values: Vec<f32>,
    cursor: usize,
}

impl ScriptedRng {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, cursor: 0 }
    }

    pub fn constant(value: f32) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for ScriptedRng {
    fn next_f32(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = self.cursor.wrapping_add(1);
        value.clamp(0.0, 0.999_999)
    }
}
