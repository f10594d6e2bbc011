//! Cycle-accurate UART transceiver.
//!
//! Every engine advances one core-clock cycle per `tick` call. A tick reads
//! the registers as they were at the start of the cycle, computes the
//! outputs and the next register values from that snapshot, and only then
//! commits. Callers wire engines together by sampling one engine's
//! registered outputs before ticking the other.

pub mod baud;
pub mod rx;
pub mod tx;
pub mod uart;
pub mod vote;

pub use rx::{RxEngine, RxInputs, RxOutputs, RxState};
pub use tx::{TxEngine, TxInputs, TxOutputs, TxState};
pub use uart::{Status, UartCore, UartInputs, UartOutputs};
pub use uartcore_common::{Parity, UartConfig};
