use anyhow::{ensure, Result};
use typed_builder::TypedBuilder;

use crate::{DEFAULT_DIVISOR, MIN_DIVISOR, OVERSAMPLE};

/// Parity configuration of a transceiver.
///
/// Both ends of a link must agree; the core has no way to detect a
/// mismatch other than a stream of parity or framing errors.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub enum Parity {
    /// One parity bit after the data bits, equal to the XOR of the data
    /// (even parity).
    #[default]
    Even,
    /// No parity bit: start, 8 data bits, stop.
    None,
}

impl Parity {
    #[inline]
    pub const fn enabled(self) -> bool {
        matches!(self, Parity::Even)
    }
}

/// Static configuration of one transceiver.
///
/// The divisor is also writable at runtime through
/// `UartCore::set_divisor`; this struct only carries the power-on value.
#[derive(Copy, Clone, Debug, Eq, PartialEq, TypedBuilder)]
pub struct UartConfig {
    /// Core-clock cycles per bit period.
    #[builder(default = DEFAULT_DIVISOR)]
    pub divisor: u16,
    #[builder(default)]
    pub parity: Parity,
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl UartConfig {
    /// Derive the divisor for `baud` from a core clock of `clock_hz`,
    /// rounding to the nearest whole cycle.
    pub fn from_baud(clock_hz: u32, baud: u32, parity: Parity) -> Result<Self> {
        ensure!(baud > 0, "baud rate must be non-zero");
        let divisor = (u64::from(clock_hz) + u64::from(baud) / 2) / u64::from(baud);
        ensure!(
            divisor >= u64::from(MIN_DIVISOR) && divisor <= u64::from(u16::MAX),
            "{clock_hz} Hz / {baud} baud gives divisor {divisor}, outside {MIN_DIVISOR}..={}",
            u16::MAX
        );
        let config = Self::builder()
            .divisor(divisor as u16)
            .parity(parity)
            .build();
        log::debug!("{clock_hz} Hz / {baud} baud -> divisor {divisor}");
        Ok(config)
    }

    /// Reject divisors the receiver cannot oversample.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.divisor >= MIN_DIVISOR,
            "divisor {} is below the minimum of {MIN_DIVISOR}",
            self.divisor
        );
        Ok(())
    }

    /// Core-clock cycles per RX oversample tick. The low four bits of the
    /// divisor are discarded.
    #[inline]
    pub const fn rx_sample_period(&self) -> u16 {
        self.divisor / OVERSAMPLE
    }

    /// Bit periods in one frame, stop bit included.
    #[inline]
    pub const fn frame_bits(&self) -> u32 {
        if self.parity.enabled() {
            11
        } else {
            10
        }
    }

    /// Core-clock cycles in one frame at the TX bit rate.
    #[inline]
    pub const fn frame_cycles(&self) -> u64 {
        self.frame_bits() as u64 * self.divisor as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_power_on_state() {
        let config = UartConfig::default();
        assert_eq!(config.divisor, 234);
        assert_eq!(config.parity, Parity::Even);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_baud_rounds_to_nearest() {
        let config = UartConfig::from_baud(27_000_000, 115_200, Parity::Even).unwrap();
        assert_eq!(config.divisor, 234);
        let config = UartConfig::from_baud(100_000_000, 115_200, Parity::None).unwrap();
        assert_eq!(config.divisor, 868);
        assert_eq!(config.parity, Parity::None);
    }

    #[test]
    fn from_baud_rejects_out_of_range() {
        assert!(UartConfig::from_baud(1_000_000, 115_200, Parity::Even).is_err());
        assert!(UartConfig::from_baud(100_000_000, 300, Parity::Even).is_err());
        assert!(UartConfig::from_baud(27_000_000, 0, Parity::Even).is_err());
    }

    #[test]
    fn validate_rejects_small_divisor() {
        let config = UartConfig::builder().divisor(15).build();
        assert!(config.validate().is_err());
        let config = UartConfig::builder().divisor(16).build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn derived_timing() {
        let config = UartConfig::builder().divisor(100).build();
        assert_eq!(config.rx_sample_period(), 6);
        assert_eq!(config.frame_bits(), 11);
        assert_eq!(config.frame_cycles(), 1100);
        let config = UartConfig::builder()
            .divisor(64)
            .parity(Parity::None)
            .build();
        assert_eq!(config.frame_bits(), 10);
        assert_eq!(config.frame_cycles(), 640);
    }
}
