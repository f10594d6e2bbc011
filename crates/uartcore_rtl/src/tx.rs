//! Transmit engine.
//!
//! Serializes one byte per request as: start bit (low), 8 data bits LSB
//! first, optional parity bit, stop level (high). The line is a register,
//! so each level becomes visible on the cycle after the bit tick that
//! drives it.

use uartcore_common::bits::{bit, xor_reduce};
use uartcore_common::Parity;

use crate::baud::BaudTick;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum TxState {
    #[default]
    Wait,
    Data,
    Parity,
    Stop,
}

/// Inputs sampled by the transmitter on one cycle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TxInputs {
    pub divisor: u16,
    /// Byte to send; only read on the cycle a request is accepted.
    pub tx_buff: u8,
    /// Request pulse. Ignored unless the engine is in `Wait`.
    pub tx_req: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TxOutputs {
    /// Serial output line, idle high.
    pub tx: bool,
    /// High while idle and able to accept a request.
    pub tx_rdy: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct TxRegs {
    state: TxState,
    /// Shift register; bit 0 goes out next.
    shift: u8,
    /// Parity latched when the request was accepted.
    parity_bit: bool,
    /// Data bits emitted so far. Bit 3 set marks the end of the data phase.
    data_count: u8,
    baud: BaudTick,
    line: bool,
}

impl TxRegs {
    const fn reset() -> Self {
        Self {
            state: TxState::Wait,
            shift: 0,
            parity_bit: false,
            data_count: 0,
            baud: BaudTick::tx(),
            line: true,
        }
    }
}

pub struct TxEngine {
    parity: Parity,
    regs: TxRegs,
}

impl Default for TxEngine {
    fn default() -> Self {
        Self::new(Parity::default())
    }
}

impl TxEngine {
    pub fn new(parity: Parity) -> Self {
        Self {
            parity,
            regs: TxRegs::reset(),
        }
    }

    pub fn reset(&mut self) {
        self.regs = TxRegs::reset();
    }

    #[inline]
    pub fn parity(&self) -> Parity {
        self.parity
    }

    #[inline]
    pub fn state(&self) -> TxState {
        self.regs.state
    }

    /// Current level of the output line.
    #[inline]
    pub fn line(&self) -> bool {
        self.regs.line
    }

    /// Byte still to be shifted out. Only meaningful outside `Wait`.
    #[inline]
    pub fn shift_register(&self) -> u8 {
        self.regs.shift
    }

    /// Combinational outputs for this cycle, before the clock edge.
    pub fn outputs(&self, inputs: &TxInputs) -> TxOutputs {
        let tx_rdy = match self.regs.state {
            TxState::Wait => !inputs.tx_req,
            TxState::Data | TxState::Parity | TxState::Stop => false,
        };
        TxOutputs {
            tx: self.regs.line,
            tx_rdy,
        }
    }

    /// Advance one core-clock cycle and return the outputs that were
    /// presented during it.
    pub fn tick(&mut self, inputs: TxInputs) -> TxOutputs {
        let outputs = self.outputs(&inputs);
        let next = self.next_regs(&inputs);
        if next.state != self.regs.state {
            log::trace!("tx {:?} -> {:?}", self.regs.state, next.state);
        }
        self.regs = next;
        outputs
    }

    /// Pure transition: register values for the next cycle, computed only
    /// from the current registers and `inputs`.
    fn next_regs(&self, inputs: &TxInputs) -> TxRegs {
        let cur = &self.regs;
        let mut next = *cur;
        next.baud = cur.baud.advanced(BaudTick::tx_target(inputs.divisor));
        let bit_tick = cur.baud.fired();

        match cur.state {
            TxState::Wait => {
                next.line = true;
                if inputs.tx_req {
                    next.line = false;
                    next.shift = inputs.tx_buff;
                    next.parity_bit = xor_reduce(inputs.tx_buff);
                    // Start bit lasts a full period from here.
                    next.baud = cur.baud.restarted(1);
                    next.state = TxState::Data;
                }
            }
            TxState::Data => {
                if bit_tick {
                    next.line = bit(cur.shift, 0);
                    next.shift = cur.shift >> 1;
                    next.data_count = (cur.data_count + 1) & 0x0F;
                }
                if cur.data_count & 0x08 != 0 {
                    next.state = if self.parity.enabled() {
                        TxState::Parity
                    } else {
                        TxState::Stop
                    };
                }
            }
            TxState::Parity => {
                if bit_tick {
                    next.line = cur.parity_bit;
                    next.state = TxState::Stop;
                }
            }
            TxState::Stop => {
                if bit_tick {
                    next.line = true;
                    next.data_count = 0;
                    next.state = TxState::Wait;
                }
            }
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIVISOR: u16 = 16;

    fn idle() -> TxInputs {
        TxInputs {
            divisor: DIVISOR,
            ..TxInputs::default()
        }
    }

    fn request(byte: u8) -> TxInputs {
        TxInputs {
            divisor: DIVISOR,
            tx_buff: byte,
            tx_req: true,
        }
    }

    /// Accept `byte` and record the line until the engine is idle again.
    fn capture(tx: &mut TxEngine, byte: u8) -> Vec<bool> {
        tx.tick(request(byte));
        let mut levels = Vec::new();
        while tx.state() != TxState::Wait {
            levels.push(tx.line());
            tx.tick(idle());
        }
        levels
    }

    /// Level of bit period `n` (0 = start bit) in a captured waveform.
    fn period(levels: &[bool], n: usize) -> &[bool] {
        let start = n * DIVISOR as usize;
        &levels[start..start + DIVISOR as usize]
    }

    #[test]
    fn idle_line_is_high_and_ready() {
        let mut tx = TxEngine::default();
        for _ in 0..100 {
            let out = tx.tick(idle());
            assert!(out.tx);
            assert!(out.tx_rdy);
        }
        assert_eq!(tx.state(), TxState::Wait);
    }

    #[test]
    fn request_deasserts_ready_in_the_same_cycle() {
        let tx = TxEngine::default();
        assert!(!tx.outputs(&request(0x55)).tx_rdy);
        assert!(tx.outputs(&idle()).tx_rdy);
    }

    #[test]
    fn frame_with_parity() {
        let mut tx = TxEngine::new(Parity::Even);
        let byte = 0b1011_0010;
        let levels = capture(&mut tx, byte);
        // Start, 8 data bits and parity are each one full period; the engine
        // is back in Wait one cycle after driving the stop level.
        assert_eq!(levels.len(), 10 * DIVISOR as usize);

        assert!(period(&levels, 0).iter().all(|&l| !l));
        for i in 0..8 {
            let expected = (byte >> i) & 1 == 1;
            assert!(
                period(&levels, i + 1).iter().all(|&l| l == expected),
                "data bit {i}"
            );
        }
        assert!(period(&levels, 9).iter().all(|&l| l == xor_reduce(byte)));
        assert!(tx.line());
    }

    #[test]
    fn frame_without_parity() {
        let mut tx = TxEngine::new(Parity::None);
        let byte = 0x3C;
        let levels = capture(&mut tx, byte);
        assert_eq!(levels.len(), 9 * DIVISOR as usize);
        assert!(period(&levels, 0).iter().all(|&l| !l));
        for i in 0..8 {
            let expected = (byte >> i) & 1 == 1;
            assert!(period(&levels, i + 1).iter().all(|&l| l == expected));
        }
        assert!(tx.line());
    }

    #[test]
    fn parity_bit_is_xor_of_data() {
        for byte in [0x00u8, 0x01, 0x80, 0xFF, 0x7F, 0xA5] {
            let mut tx = TxEngine::new(Parity::Even);
            let levels = capture(&mut tx, byte);
            assert_eq!(period(&levels, 9)[0], byte.count_ones() % 2 == 1);
        }
    }

    #[test]
    fn request_while_busy_is_ignored() {
        let mut tx = TxEngine::new(Parity::Even);
        let byte = 0xA5;
        tx.tick(request(byte));
        let mut levels = Vec::new();
        while tx.state() != TxState::Wait {
            levels.push(tx.line());
            // Hammer the engine with a different byte every cycle.
            let out = tx.tick(request(0x0F));
            assert!(!out.tx_rdy);
        }
        assert_eq!(levels.len(), 10 * DIVISOR as usize);
        for i in 0..8 {
            let expected = (byte >> i) & 1 == 1;
            assert!(period(&levels, i + 1).iter().all(|&l| l == expected));
        }
    }

    #[test]
    fn ready_is_low_for_the_whole_frame() {
        let mut tx = TxEngine::new(Parity::Even);
        tx.tick(request(0x42));
        let mut busy = 0;
        loop {
            let out = tx.tick(idle());
            if out.tx_rdy {
                break;
            }
            busy += 1;
        }
        assert_eq!(busy, 10 * DIVISOR as usize);
    }

    #[test]
    fn reset_returns_to_idle() {
        let mut tx = TxEngine::default();
        tx.tick(request(0x81));
        tx.tick(idle());
        assert_eq!(tx.state(), TxState::Data);
        assert_eq!(tx.shift_register(), 0x81);
        assert!(!tx.line());
        tx.reset();
        assert_eq!(tx.state(), TxState::Wait);
        assert!(tx.line());
    }
}
