use std::path::PathBuf;

use anyhow::{anyhow, bail, ensure, Context, Result};
use uartcore_common::{Parity, UartConfig};

use crate::bench::{Scenario, SimConfig};

pub const USAGE: &str = "\
Usage: uartcore [loopback|echo] [options]

Options:
  --divisor N           core-clock cycles per bit (default 234)
  --baud CLOCK_HZ:BAUD  derive the divisor from a clock and baud rate
  --no-parity           use the no-parity transceiver variant
  --frames N            frames to send (default 100)
  --seed N              seed for data and noise (default 24301)
  --glitch RATE         per-cycle probability of a one-cycle line glitch
  --gap BITS            idle bit periods between frames (default 1)
  --vcd PATH            write a waveform of the host side";

fn value<I: Iterator<Item = String>>(args: &mut I, flag: &str) -> Result<String> {
    args.next().ok_or_else(|| anyhow!("{flag} expects a value"))
}

fn number<T, I>(args: &mut I, flag: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    I: Iterator<Item = String>,
{
    let raw = value(args, flag)?;
    raw.parse()
        .with_context(|| format!("invalid value '{raw}' for {flag}"))
}

/// Parse command-line arguments (without the program name).
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<(Scenario, SimConfig)> {
    let mut scenario = Scenario::Loopback;
    let mut divisor: Option<u16> = None;
    let mut baud: Option<(u32, u32)> = None;
    let mut parity = Parity::Even;
    let defaults = SimConfig::default();
    let mut frames = defaults.frames;
    let mut seed = defaults.seed;
    let mut glitch_rate = defaults.glitch_rate;
    let mut gap_bits = defaults.gap_bits;
    let mut trace: Option<PathBuf> = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "loopback" => scenario = Scenario::Loopback,
            "echo" => scenario = Scenario::Echo,
            "--divisor" => divisor = Some(number(&mut args, "--divisor")?),
            "--baud" => {
                let raw = value(&mut args, "--baud")?;
                let (clock, rate) = raw
                    .split_once(':')
                    .ok_or_else(|| anyhow!("--baud expects CLOCK_HZ:BAUD, got '{raw}'"))?;
                let clock: u32 = clock
                    .parse()
                    .with_context(|| format!("invalid clock '{clock}'"))?;
                let rate: u32 = rate
                    .parse()
                    .with_context(|| format!("invalid baud rate '{rate}'"))?;
                baud = Some((clock, rate));
            }
            "--no-parity" => parity = Parity::None,
            "--frames" => frames = number(&mut args, "--frames")?,
            "--seed" => seed = number(&mut args, "--seed")?,
            "--glitch" => glitch_rate = number(&mut args, "--glitch")?,
            "--gap" => gap_bits = number(&mut args, "--gap")?,
            "--vcd" => trace = Some(PathBuf::from(value(&mut args, "--vcd")?)),
            other => bail!("unknown argument '{other}'"),
        }
    }

    let uart = match (divisor, baud) {
        (Some(_), Some(_)) => bail!("--divisor and --baud are mutually exclusive"),
        (Some(divisor), None) => UartConfig::builder()
            .divisor(divisor)
            .parity(parity)
            .build(),
        (None, Some((clock, rate))) => UartConfig::from_baud(clock, rate, parity)?,
        (None, None) => UartConfig::builder().parity(parity).build(),
    };
    uart.validate()?;
    ensure!(
        (0.0..=1.0).contains(&glitch_rate),
        "--glitch expects a probability between 0 and 1"
    );

    let config = SimConfig::builder()
        .uart(uart)
        .frames(frames)
        .seed(seed)
        .glitch_rate(glitch_rate)
        .gap_bits(gap_bits)
        .trace(trace)
        .build();
    Ok((scenario, config))
}
