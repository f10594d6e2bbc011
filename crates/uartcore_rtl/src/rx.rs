//! Receive engine.
//!
//! The receiver runs its own divider at `divisor >> 4`, giving 16
//! oversample ticks per bit period. Every bit (start, data, parity, stop)
//! goes through the same 16-tick cycle: raw line samples on ticks 7, 8 and
//! 9, majority vote on tick 15. The start bit is re-checked this way before
//! a frame is committed to, so a short low glitch on an idle line is
//! dropped without raising an error.
//!
//! All outputs are registered. `rx_rdy` is high for exactly one cycle per
//! frame; `rx_buff` and `rx_error` hold until the next frame overwrites
//! them.

use uartcore_common::bits::xor_reduce;
use uartcore_common::{Parity, DATA_BITS};

use crate::baud::BaudTick;
use crate::vote::{sample_slot, MajorityVoteSampler, VOTE_TICK};

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum RxState {
    #[default]
    Wait,
    Start,
    Data,
    Parity,
    Stop,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RxInputs {
    pub divisor: u16,
    /// Serial input line, idle high.
    pub rx: bool,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RxOutputs {
    /// Last reconstructed byte.
    pub rx_buff: u8,
    /// One-cycle pulse per completed frame.
    pub rx_rdy: bool,
    /// Parity or framing fault.
    pub rx_error: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct RxRegs {
    state: RxState,
    baud: BaudTick,
    /// Position within the current bit period, 0..=15.
    oversample: u8,
    /// Data bits received in this frame, 0..=8.
    data_count: u8,
    /// Accumulator; each voted bit enters at bit 7 and moves down, so the
    /// first (LSB) bit ends up in bit 0.
    shift: u8,
    sampler: MajorityVoteSampler,
    rx_buff: u8,
    rx_rdy: bool,
    rx_error: bool,
}

impl RxRegs {
    const fn reset() -> Self {
        Self {
            state: RxState::Wait,
            baud: BaudTick::rx(),
            oversample: 0,
            data_count: 0,
            shift: 0,
            sampler: MajorityVoteSampler::filled(false),
            rx_buff: 0,
            rx_rdy: false,
            rx_error: false,
        }
    }
}

pub struct RxEngine {
    parity: Parity,
    regs: RxRegs,
    /// Test-only log of the cycles on which a raw line sample was taken.
    #[cfg(test)]
    pub(crate) sample_cycles: Vec<u64>,
    #[cfg(test)]
    cycle: u64,
}

impl Default for RxEngine {
    fn default() -> Self {
        Self::new(Parity::default())
    }
}

impl RxEngine {
    pub fn new(parity: Parity) -> Self {
        Self {
            parity,
            regs: RxRegs::reset(),
            #[cfg(test)]
            sample_cycles: Vec::new(),
            #[cfg(test)]
            cycle: 0,
        }
    }

    pub fn reset(&mut self) {
        self.regs = RxRegs::reset();
    }

    #[inline]
    pub fn parity(&self) -> Parity {
        self.parity
    }

    #[inline]
    pub fn state(&self) -> RxState {
        self.regs.state
    }

    /// Oversample position within the current bit period.
    #[inline]
    pub fn oversample_tick(&self) -> u8 {
        self.regs.oversample
    }

    #[inline]
    pub fn data_count(&self) -> u8 {
        self.regs.data_count
    }

    #[inline]
    pub fn outputs(&self) -> RxOutputs {
        RxOutputs {
            rx_buff: self.regs.rx_buff,
            rx_rdy: self.regs.rx_rdy,
            rx_error: self.regs.rx_error,
        }
    }

    /// Clear the error flag from outside the core.
    ///
    /// The receiver itself only ever ORs a framing fault into the flag, so
    /// without parity a fault stays visible until the host calls this.
    pub fn clear_error(&mut self) {
        self.regs.rx_error = false;
    }

    /// Advance one core-clock cycle and return the outputs that were
    /// presented during it.
    pub fn tick(&mut self, inputs: RxInputs) -> RxOutputs {
        let outputs = self.outputs();
        let next = self.next_regs(&inputs);
        let cur = &self.regs;

        if next.state != cur.state {
            log::trace!("rx {:?} -> {:?}", cur.state, next.state);
            if cur.state == RxState::Start && next.state == RxState::Wait {
                log::debug!("rx start bit rejected as noise");
            }
        }
        if next.rx_rdy && !cur.rx_rdy {
            log::debug!(
                "rx frame complete: {:#04x} error={}",
                next.rx_buff,
                next.rx_error
            );
        }

        #[cfg(test)]
        {
            let sampling = cur.baud.fired()
                && cur.state != RxState::Wait
                && sample_slot(cur.oversample).is_some()
                && !(cur.state == RxState::Data && cur.data_count == DATA_BITS);
            if sampling {
                self.sample_cycles.push(self.cycle);
            }
            self.cycle += 1;
        }

        self.regs = next;
        outputs
    }

    /// Pure transition: register values for the next cycle, computed only
    /// from the current registers and `inputs`.
    fn next_regs(&self, inputs: &RxInputs) -> RxRegs {
        let cur = &self.regs;
        let mut next = *cur;
        let target = BaudTick::rx_target(inputs.divisor);
        next.baud = cur.baud.advanced(target);
        let tick = cur.baud.fired();

        match cur.state {
            RxState::Wait => {
                next.rx_rdy = false;
                // With a one-cycle oversample period the counter never
                // leaves zero, so the line alone qualifies the edge.
                let qualified = cur.baud.counter() != 0 || target <= 1;
                if !inputs.rx && qualified {
                    next.sampler = MajorityVoteSampler::filled(inputs.rx);
                    next.baud = cur.baud.restarted(0);
                    next.state = RxState::Start;
                }
            }
            RxState::Start => {
                if tick {
                    if let Some(level) = oversample(cur, &mut next, inputs.rx) {
                        next.oversample = 0;
                        next.state = if level {
                            RxState::Wait
                        } else {
                            RxState::Data
                        };
                    }
                }
            }
            RxState::Data => {
                if tick {
                    if cur.data_count == DATA_BITS {
                        if self.parity.enabled() {
                            next.state = RxState::Parity;
                        } else {
                            next.rx_buff = cur.shift;
                            next.state = RxState::Stop;
                        }
                    } else if let Some(level) = oversample(cur, &mut next, inputs.rx) {
                        next.shift = (cur.shift >> 1) | (u8::from(level) << 7);
                        next.data_count = cur.data_count + 1;
                        next.oversample = 0;
                    }
                }
            }
            RxState::Parity => {
                if tick {
                    if let Some(level) = oversample(cur, &mut next, inputs.rx) {
                        next.rx_error = xor_reduce(cur.shift) ^ level;
                        next.rx_buff = cur.shift;
                        next.oversample = 0;
                        next.state = RxState::Stop;
                    }
                }
            }
            RxState::Stop => {
                if tick {
                    if let Some(level) = oversample(cur, &mut next, inputs.rx) {
                        // Sticky: a good stop bit never clears the flag.
                        next.rx_error = !level || cur.rx_error;
                        next.rx_rdy = true;
                        next.data_count = 0;
                        next.oversample = 0;
                        next.state = RxState::Wait;
                    }
                }
            }
        }
        next
    }
}

/// One oversample tick of a bit period.
///
/// Captures the line into the vote window on ticks 7..=9 and advances the
/// position. On tick 15 returns the voted bit and leaves the position for
/// the caller to reset.
fn oversample(cur: &RxRegs, next: &mut RxRegs, rx: bool) -> Option<bool> {
    if cur.oversample == VOTE_TICK {
        return Some(cur.sampler.vote());
    }
    if let Some(slot) = sample_slot(cur.oversample) {
        next.sampler = cur.sampler.captured(slot, rx);
    }
    next.oversample = cur.oversample + 1;
    None
}
