use hexdyn::config::Config;
use hexdyn::driver::{explicit_dynamics_app, PerformanceData};

// assume 2x logical cores per CPU
const LOGICAL_CORES_PER_CPU: usize = 2;

fn main() {
    simple_logger::SimpleLogger::new().init().unwrap();
    let num_cores = (core_affinity::get_core_ids().unwrap().len() / LOGICAL_CORES_PER_CPU).max(1);

    let t0 = run_with_num_threads(1);
    let t1 = run_with_num_threads(1);
    let t2 = run_with_num_threads(num_cores);
    let t3 = run_with_num_threads(num_cores);
    println!(
        "scaling is {:.3}% to {} threads",
        100.0 * (t0 + t1) / (t2 + t3) / num_cores as f64,
        num_cores
    );
}

fn run_with_num_threads(num_threads: usize) -> f64 {
    let config = Config {
        num_threads,
        num_steps: 200,
        ..Config::default()
    };
    let mut perf = PerformanceData::default();

    explicit_dynamics_app((40, 8, 8), &config, &mut perf).unwrap();

    let stepping = perf.internal_force_time + perf.stable_time_step_time + perf.central_diff_time;
    println!("num_threads: {}: {:.4}s", num_threads, stepping);
    stepping
}
