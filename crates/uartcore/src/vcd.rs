//! Value Change Dump output for waveform viewers.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Signals recorded on one cycle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Sample {
    pub tx: bool,
    pub rx: bool,
    pub tx_rdy: bool,
    pub rx_rdy: bool,
    pub rx_error: bool,
    pub rx_buff: u8,
}

/// (identifier, name, width) for every traced signal, in header order.
const SIGNALS: [(char, &str, u8); 6] = [
    ('!', "tx", 1),
    ('"', "rx", 1),
    ('#', "tx_rdy", 1),
    ('$', "rx_rdy", 1),
    ('%', "rx_error", 1),
    ('&', "rx_buff", 8),
];

pub struct VcdWriter<W: Write> {
    out: W,
    last: Option<Sample>,
}

impl VcdWriter<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create trace file '{}'", path.display()))?;
        log::info!("Tracing waveform to '{}'", path.display());
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> VcdWriter<W> {
    /// Write the header. One time unit is one core-clock cycle.
    pub fn new(mut out: W) -> Result<Self> {
        writeln!(out, "$version uartcore {} $end", env!("CARGO_PKG_VERSION"))?;
        writeln!(out, "$timescale 10ns $end")?;
        writeln!(out, "$scope module uart $end")?;
        for (id, name, width) in SIGNALS {
            writeln!(out, "$var wire {width} {id} {name} $end")?;
        }
        writeln!(out, "$upscope $end")?;
        writeln!(out, "$enddefinitions $end")?;
        Ok(Self { out, last: None })
    }

    /// Record the signals for `cycle`. Only changed signals are written.
    pub fn record(&mut self, cycle: u64, sample: Sample) -> Result<()> {
        if self.last == Some(sample) {
            return Ok(());
        }
        let prev = self.last;
        writeln!(self.out, "#{cycle}")?;
        let bits = [sample.tx, sample.rx, sample.tx_rdy, sample.rx_rdy, sample.rx_error];
        let old_bits = prev.map(|p| [p.tx, p.rx, p.tx_rdy, p.rx_rdy, p.rx_error]);
        for (i, level) in bits.into_iter().enumerate() {
            if old_bits.map_or(true, |old| old[i] != level) {
                writeln!(self.out, "{}{}", u8::from(level), SIGNALS[i].0)?;
            }
        }
        if prev.map_or(true, |p| p.rx_buff != sample.rx_buff) {
            writeln!(self.out, "b{:08b} {}", sample.rx_buff, SIGNALS[5].0)?;
        }
        self.last = Some(sample);
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(writer: VcdWriter<Vec<u8>>) -> String {
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn header_declares_every_signal() {
        let out = text(VcdWriter::new(Vec::new()).unwrap());
        for (id, name, width) in SIGNALS {
            assert!(out.contains(&format!("$var wire {width} {id} {name} $end")));
        }
        assert!(out.trim_end().ends_with("$enddefinitions $end"));
    }

    #[test]
    fn first_sample_dumps_all_values() {
        let mut vcd = VcdWriter::new(Vec::new()).unwrap();
        vcd.record(
            0,
            Sample {
                tx: true,
                rx: true,
                tx_rdy: true,
                rx_buff: 0x41,
                ..Sample::default()
            },
        )
        .unwrap();
        let out = text(vcd);
        let body = out.split("$enddefinitions $end\n").nth(1).unwrap();
        assert_eq!(body, "#0\n1!\n1\"\n1#\n0$\n0%\nb01000001 &\n");
    }

    #[test]
    fn only_changes_are_written() {
        let idle = Sample {
            tx: true,
            rx: true,
            tx_rdy: true,
            ..Sample::default()
        };
        let mut vcd = VcdWriter::new(Vec::new()).unwrap();
        vcd.record(0, idle).unwrap();
        vcd.record(1, idle).unwrap();
        vcd.record(2, idle).unwrap();
        vcd.record(
            3,
            Sample {
                tx: false,
                tx_rdy: false,
                ..idle
            },
        )
        .unwrap();
        let out = text(vcd);
        let body = out.split("$enddefinitions $end\n").nth(1).unwrap();
        assert!(!body.contains("#1\n"));
        assert!(!body.contains("#2\n"));
        assert!(body.ends_with("#3\n0!\n0#\n"));
    }
}
