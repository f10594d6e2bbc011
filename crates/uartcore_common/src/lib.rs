pub mod bits;
pub mod config;

pub use config::{Parity, UartConfig};

/// Data bits per frame. Fixed by the core.
pub const DATA_BITS: u8 = 8;
/// Receive oversampling factor: RX ticks per bit period.
pub const OVERSAMPLE: u16 = 16;
/// Smallest divisor for which the receiver resolves at least one cycle per
/// oversample tick.
pub const MIN_DIVISOR: u16 = OVERSAMPLE;
/// Power-on divisor: a 27 MHz core clock at 115200 baud.
pub const DEFAULT_DIVISOR: u16 = 234;
