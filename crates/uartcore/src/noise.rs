use anyhow::{ensure, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Flips a line level for single cycles at random.
///
/// Each call to `apply` inverts the level with probability `rate`, which
/// models a one-cycle glitch on the wire.
pub struct NoiseInjector {
    rng: StdRng,
    rate: f64,
    glitches: u64,
}

impl NoiseInjector {
    pub fn new(seed: u64, rate: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&rate),
            "glitch rate {rate} is not a probability"
        );
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            rate,
            glitches: 0,
        })
    }

    #[inline]
    pub fn glitches(&self) -> u64 {
        self.glitches
    }

    pub fn apply(&mut self, level: bool) -> bool {
        if self.rate > 0.0 && self.rng.gen_bool(self.rate) {
            self.glitches += 1;
            log::trace!("glitch: line forced {}", u8::from(!level));
            !level
        } else {
            level
        }
    }
}
