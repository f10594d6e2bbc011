use bitflags::bitflags;
use uartcore_common::{Parity, UartConfig};

use crate::rx::{RxEngine, RxInputs, RxState};
use crate::tx::{TxEngine, TxInputs, TxState};

bitflags! {
    /// Snapshot of the host-visible status signals.
    ///
    /// Bit positions follow the status word the register layer exposes.
    #[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
    pub struct Status: u8 {
        const TX_READY = 1 << 0;
        const RX_READY = 1 << 1;
        const RX_ERROR = 1 << 2;
    }
}

/// Per-cycle inputs of the transceiver. The divisor is not here: it is a
/// register of the core, written through `UartCore::set_divisor`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UartInputs {
    pub tx_buff: u8,
    pub tx_req: bool,
    /// Serial input line.
    pub rx: bool,
}

impl Default for UartInputs {
    fn default() -> Self {
        Self {
            tx_buff: 0,
            tx_req: false,
            rx: true,
        }
    }
}

impl UartInputs {
    /// No request, receive line at `rx`.
    pub fn line(rx: bool) -> Self {
        Self {
            rx,
            ..Self::default()
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UartOutputs {
    pub tx: bool,
    pub tx_rdy: bool,
    pub rx_buff: u8,
    pub rx_rdy: bool,
    pub rx_error: bool,
}

impl UartOutputs {
    pub fn status(&self) -> Status {
        let mut status = Status::empty();
        status.set(Status::TX_READY, self.tx_rdy);
        status.set(Status::RX_READY, self.rx_rdy);
        status.set(Status::RX_ERROR, self.rx_error);
        status
    }
}

/// One transmitter and one receiver sharing a divisor.
///
/// The `tx` and `rx` lines are independent; connect them outside the core
/// (or to a peer) by feeding `tx_line()` of one side into `UartInputs::rx`
/// of the other before ticking.
pub struct UartCore {
    divisor: u16,
    tx: TxEngine,
    rx: RxEngine,
}

impl Default for UartCore {
    fn default() -> Self {
        Self::new(&UartConfig::default())
    }
}

impl UartCore {
    pub fn new(config: &UartConfig) -> Self {
        Self {
            divisor: config.divisor,
            tx: TxEngine::new(config.parity),
            rx: RxEngine::new(config.parity),
        }
    }

    pub fn reset(&mut self) {
        self.tx.reset();
        self.rx.reset();
    }

    #[inline]
    pub fn divisor(&self) -> u16 {
        self.divisor
    }

    /// Write the shared divisor. Both engines read it from the next cycle.
    pub fn set_divisor(&mut self, divisor: u16) {
        if divisor != self.divisor {
            log::debug!("divisor {} -> {}", self.divisor, divisor);
        }
        self.divisor = divisor;
    }

    #[inline]
    pub fn parity(&self) -> Parity {
        self.tx.parity()
    }

    /// Level currently driven on the transmit line.
    #[inline]
    pub fn tx_line(&self) -> bool {
        self.tx.line()
    }

    #[inline]
    pub fn tx_state(&self) -> TxState {
        self.tx.state()
    }

    #[inline]
    pub fn rx_state(&self) -> RxState {
        self.rx.state()
    }

    #[inline]
    pub fn rx_buff(&self) -> u8 {
        self.rx.outputs().rx_buff
    }

    pub fn clear_rx_error(&mut self) {
        self.rx.clear_error();
    }

    /// Status as seen by a host that is not requesting a transmission
    /// this cycle.
    pub fn status(&self) -> Status {
        let tx = self.tx.outputs(&TxInputs {
            divisor: self.divisor,
            ..TxInputs::default()
        });
        let rx = self.rx.outputs();
        UartOutputs {
            tx: tx.tx,
            tx_rdy: tx.tx_rdy,
            rx_buff: rx.rx_buff,
            rx_rdy: rx.rx_rdy,
            rx_error: rx.rx_error,
        }
        .status()
    }

    /// Advance both engines by one core-clock cycle.
    pub fn tick(&mut self, inputs: UartInputs) -> UartOutputs {
        let tx = self.tx.tick(TxInputs {
            divisor: self.divisor,
            tx_buff: inputs.tx_buff,
            tx_req: inputs.tx_req,
        });
        let rx = self.rx.tick(RxInputs {
            divisor: self.divisor,
            rx: inputs.rx,
        });
        UartOutputs {
            tx: tx.tx,
            tx_rdy: tx.tx_rdy,
            rx_buff: rx.rx_buff,
            rx_rdy: rx.rx_rdy,
            rx_error: rx.rx_error,
        }
    }

    /// Tick with the transmit line looped back into the receiver.
    pub fn tick_loopback(&mut self, tx_buff: u8, tx_req: bool) -> UartOutputs {
        let rx = self.tx_line();
        self.tick(UartInputs {
            tx_buff,
            tx_req,
            rx,
        })
    }
}
