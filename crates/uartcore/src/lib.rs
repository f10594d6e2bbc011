pub mod bench;
pub mod cli;
pub mod noise;
pub mod vcd;

use std::io::Sink;

use anyhow::Result;

pub use bench::{Bench, Report, Scenario, SimConfig};
use vcd::VcdWriter;

pub fn run(scenario: Scenario, config: &SimConfig) -> Result<Report> {
    match &config.trace {
        Some(path) => {
            let trace = VcdWriter::create(path)?;
            Bench::new(scenario, config, Some(trace))?.run()
        }
        None => Bench::<Sink>::new(scenario, config, None)?.run(),
    }
}
