/// Oversample ticks per bit period.
pub const TICKS_PER_BIT: u8 = 16;
/// Oversample tick on which the window is voted and the bit completes.
pub const VOTE_TICK: u8 = 15;

/// Window slot filled on oversample tick `tick`, if any.
///
/// The three samples straddle the centre of the bit (ticks 7, 8 and 9 of
/// 16), away from both transition edges.
#[inline]
pub const fn sample_slot(tick: u8) -> Option<u8> {
    match tick {
        7 => Some(0),
        8 => Some(1),
        9 => Some(2),
        _ => None,
    }
}

/// 3-way majority of three line samples.
#[inline]
pub const fn majority(s0: bool, s1: bool, s2: bool) -> bool {
    (s0 & s1) | (s1 & s2) | (s0 & s2)
}

/// Three-sample window of raw line levels, denoised by majority vote.
///
/// Bit `n` of the window holds the sample for slot `n`. One corrupted
/// sample per bit period is outvoted; two are not.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MajorityVoteSampler {
    window: u8,
}

impl MajorityVoteSampler {
    /// Every slot set to `level`.
    #[inline]
    pub const fn filled(level: bool) -> Self {
        Self {
            window: if level { 0b111 } else { 0b000 },
        }
    }

    #[inline]
    pub const fn window(self) -> u8 {
        self.window
    }

    /// Store `level` into `slot` (0..=2).
    #[inline]
    pub const fn captured(self, slot: u8, level: bool) -> Self {
        let mask = 1u8 << slot;
        let window = if level {
            self.window | mask
        } else {
            self.window & !mask
        };
        Self {
            window: window & 0b111,
        }
    }

    #[inline]
    pub const fn sample(self, slot: u8) -> bool {
        (self.window >> slot) & 1 == 1
    }

    /// The denoised bit.
    #[inline]
    pub const fn vote(self) -> bool {
        majority(self.sample(0), self.sample(1), self.sample(2))
    }
}
