use uartcore::cli;

fn main() {
    env_logger::init();

    let (scenario, config) = match cli::parse_args(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("{err:#}\n\n{}", cli::USAGE);
            std::process::exit(2);
        }
    };

    match uartcore::run(scenario, &config) {
        Ok(report) => {
            println!("{scenario}: {report}");
            if !report.passed() {
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{scenario} bench failed: {err:#}");
            std::process::exit(1);
        }
    }
}
