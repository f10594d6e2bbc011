use std::fmt;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use typed_builder::TypedBuilder;
use uartcore_common::UartConfig;
use uartcore_rtl::{Status, UartCore, UartInputs, UartOutputs};

use crate::noise::NoiseInjector;
use crate::vcd::{Sample, VcdWriter};

/// Idle cycles before the first frame.
const SETTLE_CYCLES: u64 = 10;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Scenario {
    /// The core's transmit line wired to its own receiver.
    Loopback,
    /// A host core talking to a device core that sends every received
    /// byte back with its bit order reversed.
    Echo,
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::Loopback => f.write_str("loopback"),
            Scenario::Echo => f.write_str("echo"),
        }
    }
}

#[derive(Clone, Debug, TypedBuilder)]
pub struct SimConfig {
    #[builder(default)]
    pub uart: UartConfig,
    #[builder(default = 100)]
    pub frames: usize,
    #[builder(default = 0x5EED)]
    pub seed: u64,
    /// Per-cycle probability of a one-cycle glitch on each receive line.
    #[builder(default = 0.0)]
    pub glitch_rate: f64,
    /// Idle bit periods between frames.
    #[builder(default = 1)]
    pub gap_bits: u32,
    /// Write a VCD waveform of the host side here.
    #[builder(default)]
    pub trace: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Report {
    pub frames: usize,
    pub ok: usize,
    /// Frames whose byte differed from the expected one.
    pub mismatches: usize,
    /// Frames reported with `rx_error` set.
    pub errors: usize,
    /// Frames that never produced `rx_rdy` within the cycle budget.
    pub timeouts: usize,
    pub glitches: u64,
    pub cycles: u64,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.ok == self.frames
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} frames ok ({} mismatched, {} errored, {} timed out, {} glitches) in {} cycles",
            self.ok,
            self.frames,
            self.mismatches,
            self.errors,
            self.timeouts,
            self.glitches,
            self.cycles
        )
    }
}

/// Drives one scenario cycle by cycle, playing the part of the host.
pub struct Bench<W: Write> {
    scenario: Scenario,
    config: SimConfig,
    host: UartCore,
    /// Far end of the link in the echo scenario.
    device: Option<UartCore>,
    noise: NoiseInjector,
    rng: StdRng,
    trace: Option<VcdWriter<W>>,
    cycle: u64,
}

impl<W: Write> Bench<W> {
    pub fn new(scenario: Scenario, config: &SimConfig, trace: Option<VcdWriter<W>>) -> Result<Self> {
        config.uart.validate()?;
        let device = match scenario {
            Scenario::Loopback => None,
            Scenario::Echo => Some(UartCore::new(&config.uart)),
        };
        Ok(Self {
            scenario,
            config: config.clone(),
            host: UartCore::new(&config.uart),
            device,
            noise: NoiseInjector::new(config.seed.rotate_left(17), config.glitch_rate)?,
            rng: StdRng::seed_from_u64(config.seed),
            trace,
            cycle: 0,
        })
    }

    pub fn run(mut self) -> Result<Report> {
        let divisor = u64::from(self.config.uart.divisor);
        log::info!(
            "Running {} bench: {} frames, divisor {}, parity {:?}",
            self.scenario,
            self.config.frames,
            divisor,
            self.config.uart.parity
        );

        let mut report = Report {
            frames: self.config.frames,
            ..Report::default()
        };
        self.idle(SETTLE_CYCLES)?;
        for index in 0..self.config.frames {
            let sent: u8 = self.rng.gen();
            let expected = match self.scenario {
                Scenario::Loopback => sent,
                Scenario::Echo => sent.reverse_bits(),
            };
            match self.transfer(sent)? {
                Some((received, error)) => {
                    if received == expected && !error {
                        log::debug!("frame {index}: {sent:#04x} ok");
                        report.ok += 1;
                    } else {
                        if received != expected {
                            log::warn!(
                                "frame {index}: sent {sent:#04x}, expected {expected:#04x}, got {received:#04x}"
                            );
                            report.mismatches += 1;
                        }
                        if error {
                            log::warn!("frame {index}: rx_error set");
                            report.errors += 1;
                        }
                    }
                }
                None => {
                    log::warn!("frame {index}: no rx_rdy after {} cycles", self.budget());
                    report.timeouts += 1;
                }
            }
            // The error flag is sticky in the no-parity variant; account
            // per frame.
            self.host.clear_rx_error();
            if let Some(device) = self.device.as_mut() {
                device.clear_rx_error();
            }
            self.idle(u64::from(self.config.gap_bits) * divisor)?;
        }

        report.glitches = self.noise.glitches();
        report.cycles = self.cycle;
        if let Some(trace) = self.trace.take() {
            trace.finish()?;
        }
        log::info!("{} bench finished: {report}", self.scenario);
        Ok(report)
    }

    /// Cycles to wait for the receiver after a request is accepted.
    fn budget(&self) -> u64 {
        let frame = self.config.uart.frame_cycles();
        match self.scenario {
            Scenario::Loopback => frame + 2 * u64::from(self.config.uart.divisor),
            Scenario::Echo => 2 * frame + 4 * u64::from(self.config.uart.divisor),
        }
    }

    /// Send one byte from the host and wait for the host receiver.
    fn transfer(&mut self, byte: u8) -> Result<Option<(u8, bool)>> {
        while !self.host.status().contains(Status::TX_READY) {
            self.step(0, false)?;
        }
        self.step(byte, true)?;
        for _ in 0..self.budget() {
            let out = self.step(0, false)?;
            if out.rx_rdy {
                return Ok(Some((out.rx_buff, out.rx_error)));
            }
        }
        Ok(None)
    }

    fn idle(&mut self, cycles: u64) -> Result<()> {
        for _ in 0..cycles {
            self.step(0, false)?;
        }
        Ok(())
    }

    /// One core-clock cycle of the whole link.
    ///
    /// Line levels are sampled from every core before any of them ticks.
    fn step(&mut self, tx_buff: u8, tx_req: bool) -> Result<UartOutputs> {
        let host_tx = self.host.tx_line();
        let host_rx = match self.device.as_mut() {
            None => self.noise.apply(host_tx),
            Some(device) => {
                let device_tx = device.tx_line();
                let device_rx = self.noise.apply(host_tx);
                let echo = device.status().contains(Status::RX_READY);
                let echo_byte = device.rx_buff().reverse_bits();
                device.tick(UartInputs {
                    tx_buff: echo_byte,
                    tx_req: echo,
                    rx: device_rx,
                });
                self.noise.apply(device_tx)
            }
        };
        let out = self.host.tick(UartInputs {
            tx_buff,
            tx_req,
            rx: host_rx,
        });
        if let Some(trace) = self.trace.as_mut() {
            trace.record(
                self.cycle,
                Sample {
                    tx: out.tx,
                    rx: host_rx,
                    tx_rdy: out.tx_rdy,
                    rx_rdy: out.rx_rdy,
                    rx_error: out.rx_error,
                    rx_buff: out.rx_buff,
                },
            )?;
        }
        self.cycle += 1;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Sink;
    use uartcore_common::Parity;

    fn run(scenario: Scenario, config: &SimConfig) -> Report {
        Bench::<Sink>::new(scenario, config, None)
            .unwrap()
            .run()
            .unwrap()
    }

    fn uart(divisor: u16, parity: Parity) -> UartConfig {
        UartConfig::builder()
            .divisor(divisor)
            .parity(parity)
            .build()
    }

    #[test]
    fn loopback_delivers_every_frame() {
        for parity in [Parity::Even, Parity::None] {
            let config = SimConfig::builder()
                .uart(uart(32, parity))
                .frames(100)
                .build();
            let report = run(Scenario::Loopback, &config);
            assert!(report.passed(), "{parity:?}: {report}");
            assert_eq!(report.frames, 100);
            assert!(report.cycles > 100 * config.uart.frame_cycles());
        }
    }

    #[test]
    fn echo_returns_reversed_bytes() {
        for divisor in [32u16, 234] {
            let config = SimConfig::builder()
                .uart(uart(divisor, Parity::Even))
                .frames(20)
                .seed(3)
                .build();
            let report = run(Scenario::Echo, &config);
            assert!(report.passed(), "divisor {divisor}: {report}");
        }
    }

    #[test]
    fn sparse_glitches_are_mostly_absorbed() {
        let config = SimConfig::builder()
            .uart(uart(64, Parity::Even))
            .frames(40)
            .glitch_rate(0.0005)
            .seed(11)
            .build();
        let report = run(Scenario::Loopback, &config);
        assert!(report.glitches > 0);
        assert!(report.ok >= 30, "{report}");
        assert!(report.ok + report.timeouts <= report.frames);
    }

    #[test]
    fn invalid_divisor_is_rejected() {
        let config = SimConfig::builder().uart(uart(8, Parity::Even)).build();
        assert!(Bench::<Sink>::new(Scenario::Loopback, &config, None).is_err());
    }

    #[test]
    fn trace_records_the_start_bit() {
        let config = SimConfig::builder()
            .uart(uart(32, Parity::Even))
            .frames(1)
            .build();
        let trace = VcdWriter::new(Vec::new()).unwrap();
        let mut bench = Bench::new(Scenario::Loopback, &config, Some(trace)).unwrap();
        bench.idle(SETTLE_CYCLES).unwrap();
        assert_eq!(bench.transfer(0x00).unwrap(), Some((0x00, false)));
        let out = bench.trace.take().unwrap().finish().unwrap();
        let text = String::from_utf8(out).unwrap();
        // tx falls on the cycle after the request is accepted.
        assert!(text.contains(&format!("#{}\n0!\n", SETTLE_CYCLES + 1)));
    }
}
