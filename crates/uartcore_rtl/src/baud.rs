use uartcore_common::OVERSAMPLE;

/// Free-running divider that produces the bit (TX) or oversample (RX)
/// enable.
///
/// The tick is the cycle on which the counter reads zero. Each cycle the
/// counter either wraps to zero (when `counter + 1 == target`) or
/// increments, truncated to the register width. A target of 0 or 1 keeps
/// the counter at zero, so the tick fires every cycle.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BaudTick {
    counter: u16,
    mask: u16,
}

impl BaudTick {
    /// 16-bit counter, compared against the divisor itself.
    pub const fn tx() -> Self {
        Self {
            counter: 0,
            mask: 0xFFFF,
        }
    }

    /// 12-bit counter, compared against `divisor / OVERSAMPLE`.
    pub const fn rx() -> Self {
        Self {
            counter: 0,
            mask: 0x0FFF,
        }
    }

    #[inline]
    pub const fn tx_target(divisor: u16) -> u16 {
        divisor
    }

    #[inline]
    pub const fn rx_target(divisor: u16) -> u16 {
        divisor / OVERSAMPLE
    }

    #[inline]
    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Whether the enable is asserted this cycle.
    #[inline]
    pub fn fired(&self) -> bool {
        self.counter == 0
    }

    /// Counter value for the next cycle.
    #[inline]
    pub fn advanced(self, target: u16) -> Self {
        let next = self.counter.wrapping_add(1) & self.mask;
        let counter = if target <= 1 || u32::from(self.counter) + 1 == u32::from(target) {
            0
        } else {
            next
        };
        Self { counter, ..self }
    }

    /// Force the counter, overriding the free-running update.
    #[inline]
    pub fn restarted(self, counter: u16) -> Self {
        Self {
            counter: counter & self.mask,
            ..self
        }
    }
}
