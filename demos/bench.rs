use clap::{AppSettings, Clap};
use hexdyn::config::Config;
use hexdyn::driver::{driver, Simulation};

#[derive(Debug, Clap)]
#[clap(version = "1.0")]
#[clap(setting = AppSettings::ColoredHelp)]
struct Opts {
    /// Label printed in the table banner
    #[clap(short = 'l', long, default_value = "rayon")]
    label: String,

    /// First exponent of the size range (elements scale as 2^i)
    #[clap(short = 'b', long, default_value = "0")]
    beg: u32,

    /// One past the last exponent of the size range
    #[clap(short = 'e', long, default_value = "4")]
    end: u32,

    /// Repetitions per size; the best timing of each phase is kept
    #[clap(short = 'r', long, default_value = "3")]
    runs: usize,

    #[clap(short = 't', long, default_value = "0")]
    num_threads: usize,

    #[clap(short = 'n', long, default_value = "1000")]
    num_steps: usize,

    /// Write the final field state of a 10x1x1 run to this file as CBOR
    #[clap(short = 'o', long)]
    output: Option<String>,
}

fn main() {
    simple_logger::SimpleLogger::new().init().unwrap();
    let opts = Opts::parse();

    let config = Config {
        num_threads: opts.num_threads,
        num_steps: opts.num_steps,
        ..Config::default()
    };

    if let Err(e) = driver(&opts.label, opts.beg, opts.end, opts.runs, &config) {
        eprintln!("run aborted: {}", e);
        std::process::exit(1);
    }

    if let Some(path) = opts.output {
        let mut sim = Simulation::new((10, 1, 1), config).unwrap();

        if let Err(e) = sim.run() {
            eprintln!("run aborted: {}", e);
            std::process::exit(1);
        }
        let file = std::fs::File::create(path).unwrap();
        let mut buffer = std::io::BufWriter::new(file);
        ciborium::ser::into_writer(&sim.snapshot(), &mut buffer).unwrap();
    }
}
