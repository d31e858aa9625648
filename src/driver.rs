use std::time::Instant;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use crate::config::Config;
use crate::error::Error;
use crate::kernels;
use crate::mesh::BoxMesh;
use crate::region::{Region, StateIndices};




#[derive(Clone, Copy, Debug, Default, Serialize)]

/**
 * Wall-clock seconds accumulated per phase over one run: mesh construction,
 * one-time initialization, and the three per-step stages, plus the optional
 * host-mirror copies.
 */
pub struct PerformanceData {
    pub mesh_time: f64,
    pub init_time: f64,
    pub internal_force_time: f64,
    pub stable_time_step_time: f64,
    pub central_diff_time: f64,
    pub copy_to_host_time: f64,
}

impl PerformanceData {

    /**
     * Keep the element-wise minimum of this record and another. The
     * benchmark driver folds repeated runs through this to discard noise.
     */
    pub fn best(&mut self, rhs: &PerformanceData) {
        self.mesh_time = self.mesh_time.min(rhs.mesh_time);
        self.init_time = self.init_time.min(rhs.init_time);
        self.internal_force_time = self.internal_force_time.min(rhs.internal_force_time);
        self.stable_time_step_time = self.stable_time_step_time.min(rhs.stable_time_step_time);
        self.central_diff_time = self.central_diff_time.min(rhs.central_diff_time);
        self.copy_to_host_time = self.copy_to_host_time.min(rhs.copy_to_host_time);
    }
}




#[derive(Clone, Debug, Serialize, Deserialize)]

/**
 * A host-side mirror of the freshest field state, taken on the snapshot
 * cadence and after the final step.
 */
pub struct Snapshot {
    pub step: usize,
    pub acceleration: Vec<f64>,
    pub velocity: Vec<f64>,
    pub displacement: Vec<f64>,
    pub internal_force: Vec<f64>,
    pub stress: Vec<f64>,
}




#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    Initializing,
    Stepping,
    Done,
}




/**
 * One simulation run: the region, the rotating state indices, and the
 * per-phase timings. Construction allocates everything; `initialize` runs
 * the one-time kernels and applies the face-velocity initial condition;
 * each `step` performs the full kernel sequence with a barrier between
 * kernels. A kernel error aborts the run and leaves the phase short of
 * `Done`, so partial results are never mistaken for valid ones.
 */
pub struct Simulation {
    pub config: Config,
    pub region: Region,
    pub state: StateIndices,
    pub step: usize,
    pub phase: Phase,
    pub perf: PerformanceData,
    pub polar_fallbacks: usize,
    pub mirror: Option<Snapshot>,
}




// ============================================================================
impl Simulation {

    pub fn new(extents: (usize, usize, usize), config: Config) -> Result<Self, Error> {
        let clock = Instant::now();
        let (ex, ey, ez) = extents;
        let mesh = BoxMesh::new(ex, ey, ez)?;
        let region = Region::new(mesh, config.material, config.user_dt);

        let mut perf = PerformanceData::default();
        perf.mesh_time = clock.elapsed().as_secs_f64();

        Ok(Self {
            config,
            region,
            state: StateIndices::new(),
            step: 0,
            phase: Phase::Initializing,
            perf,
            polar_fallbacks: 0,
            mirror: None,
        })
    }

    /**
     * Run the one-time element and node kernels and apply the initial
     * condition: the `x = 0` face moves along x in both velocity slots.
     */
    pub fn initialize(&mut self) -> Result<(), Error> {
        let clock = Instant::now();

        kernels::initialize_element(&mut self.region)?;
        kernels::initialize_node(&mut self.region)?;

        for node in 0..self.region.num_nodes() {
            if self.region.mesh.coord(node, 0) == 0.0 {
                self.region.velocity[0][3 * node] = self.config.face_velocity;
                self.region.velocity[1][3 * node] = self.config.face_velocity;
            }
        }
        self.perf.init_time = clock.elapsed().as_secs_f64();
        self.phase = if self.config.num_steps == 0 { Phase::Done } else { Phase::Stepping };
        Ok(())
    }

    /**
     * Advance one step: rotate the state slots, run the element chain, the
     * time-step reduction and broadcast, and the node update, accumulating
     * each stage's elapsed time.
     */
    pub fn step(&mut self) -> Result<(), Error> {
        let user_dt = self.config.user_dt;

        self.state.rotate();

        let clock = Instant::now();
        kernels::grad_hgop(&mut self.region, &self.state)?;
        self.polar_fallbacks += kernels::decomp_rotate(&mut self.region, &self.state);
        kernels::divergence(&mut self.region, user_dt, &self.state)?;
        self.perf.internal_force_time += clock.elapsed().as_secs_f64();

        let clock = Instant::now();
        let bound = kernels::minimum_stable_time_step(&self.region)?;
        kernels::set_next_time_step(&mut self.region, bound, user_dt, &self.state);
        self.perf.stable_time_step_time += clock.elapsed().as_secs_f64();

        let clock = Instant::now();
        kernels::finish_step(&mut self.region, &self.state)?;
        self.perf.central_diff_time += clock.elapsed().as_secs_f64();

        if let Some(interval) = self.config.snapshot_interval {
            if self.step % interval == 0 {
                let clock = Instant::now();
                self.mirror = Some(self.snapshot());
                self.perf.copy_to_host_time += clock.elapsed().as_secs_f64();
            }
        }
        self.step += 1;

        if self.step >= self.config.num_steps {
            self.phase = Phase::Done;
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<(), Error> {
        if self.phase == Phase::Initializing {
            self.initialize()?;
        }
        while self.phase == Phase::Stepping {
            self.step()?;
        }
        if self.polar_fallbacks > 0 {
            warn!(
                "polar decomposition fell back to the identity rotation {} times",
                self.polar_fallbacks
            );
        }
        Ok(())
    }

    /**
     * Copy the freshest device-resident state into a host-side mirror. Runs
     * strictly after the node update, so it observes a consistent step.
     */
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            step: self.step,
            acceleration: self.region.acceleration.clone(),
            velocity: self.region.velocity[self.state.next].clone(),
            displacement: self.region.displacement[self.state.next].clone(),
            internal_force: self.region.internal_force.clone(),
            stress: self.region.stress[self.state.current].clone(),
        }
    }
}




/**
 * The core entry point: build the mesh and region for the given extents,
 * run initialization and the configured number of steps, and populate the
 * performance record. Kernels execute in a dedicated rayon pool when the
 * configuration names a thread count; assembly is gather-based, so the
 * result is bit-identical for any worker count.
 */
pub fn explicit_dynamics_app(
    extents: (usize, usize, usize),
    config: &Config,
    perf: &mut PerformanceData,
) -> Result<(), Error> {
    let run = || -> Result<PerformanceData, Error> {
        let mut sim = Simulation::new(extents, config.clone())?;
        sim.run()?;
        Ok(sim.perf)
    };

    info!(
        "explicit dynamics: extents {:?}, {} steps",
        extents, config.num_steps
    );

    *perf = if config.num_threads > 0 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build()
            .unwrap();
        pool.install(run)?
    } else {
        run()?
    };
    Ok(())
}




/**
 * The multi-size benchmark driver. For each exponent in `beg..end`, builds
 * extents (10 f, f, f) with f the cube root of 2^i, runs the app `runs`
 * times keeping the element-wise best record, and prints one fixed-column
 * row: times in milliseconds, the last column the per-element cost of the
 * three per-step stages.
 */
pub fn driver(label: &str, beg: u32, end: u32, runs: usize, config: &Config) -> Result<(), Error> {
    let columns = [
        "\"Size\"",
        "\"Setup\"",
        "\"Initialize\"",
        "\"InternalForce\"",
        "\"StableTimeStep\"",
        "\"CentralDiff\"",
        "\"CopyToHost\"",
        "\"TimePerElement\"",
    ];
    let units = [
        "\"elements\"",
        "\"millisec\"",
        "\"millisec\"",
        "\"millisec\"",
        "\"millisec\"",
        "\"millisec\"",
        "\"millisec\"",
        "\"millisec/element\"",
    ];

    println!();
    println!("\"ExplicitDynamics {}\"", label);
    println!("{}", columns.iter().map(|c| format!("{:<20}", format!("{} , ", c))).collect::<String>());
    println!("{}", units.iter().map(|u| format!("{:<20}", format!("{} , ", u))).collect::<String>());

    for i in beg..end {
        let factor = ((1u64 << i) as f64).cbrt() as usize;
        let extents = (10 * factor, factor, factor);
        let n = extents.0 * extents.1 * extents.2;

        let mut best = PerformanceData::default();

        for run in 0..runs {
            let mut perf = PerformanceData::default();
            explicit_dynamics_app(extents, config, &mut perf)?;

            if run == 0 {
                best = perf;
            } else {
                best.best(&perf);
            }
        }
        let time_per_element =
            (best.internal_force_time + best.stable_time_step_time + best.central_diff_time) / n as f64;

        println!(
            "{:<17} , {:<17} , {:<17} , {:<17} , {:<17} , {:<17} , {:<17} , {:<20}",
            n,
            best.mesh_time * 1000.0,
            best.init_time * 1000.0,
            best.internal_force_time * 1000.0,
            best.stable_time_step_time * 1000.0,
            best.central_diff_time * 1000.0,
            best.copy_to_host_time * 1000.0,
            time_per_element * 1000.0,
        );
    }
    Ok(())
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;
    use crate::config::Config;

    const EXTENTS: (usize, usize, usize) = (10, 1, 1);

    fn short_config(num_steps: usize) -> Config {
        Config { num_steps, ..Config::default() }
    }

    fn run_to_completion(config: Config) -> Simulation {
        let mut sim = Simulation::new(EXTENTS, config).unwrap();
        sim.run().unwrap();
        sim
    }

    #[test]
    fn hundred_step_bar_completes_with_bounded_fields() {
        let sim = run_to_completion(short_config(100));
        assert_eq!(sim.phase, Phase::Done);
        assert_eq!(sim.polar_fallbacks, 0);

        let u = &sim.region.displacement[sim.state.next];
        let v = &sim.region.velocity[sim.state.next];
        let s = &sim.region.stress[sim.state.current];

        assert!(u.iter().all(|x| x.is_finite() && x.abs() < 10.0));
        assert!(v.iter().all(|x| x.is_finite() && x.abs() < 1.0e4));
        assert!(s.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn identical_runs_are_bit_identical() {
        let a = run_to_completion(short_config(100));
        let b = run_to_completion(short_config(100));

        assert_eq!(a.region.displacement[a.state.next], b.region.displacement[b.state.next]);
        assert_eq!(a.region.velocity[a.state.next], b.region.velocity[b.state.next]);
        assert_eq!(a.region.stress[a.state.current], b.region.stress[b.state.current]);
    }

    #[test]
    fn worker_count_does_not_change_the_answer() {
        let serial = Config { num_threads: 1, ..short_config(50) };
        let threaded = Config { num_threads: 4, ..short_config(50) };

        let run = |config: Config| {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.num_threads)
                .build()
                .unwrap();
            pool.install(|| run_to_completion(config))
        };
        let a = run(serial);
        let b = run(threaded);
        assert_eq!(a.region.displacement[a.state.next], b.region.displacement[b.state.next]);
    }

    #[test]
    fn momentum_is_conserved_over_a_short_run() {
        let mut sim = Simulation::new(EXTENTS, short_config(50)).unwrap();
        sim.initialize().unwrap();

        let before = sim.region.momentum(0);
        sim.run().unwrap();
        let after = sim.region.momentum(sim.state.next);

        assert!(before[0] > 0.0);
        for axis in 0..3 {
            assert!((after[axis] - before[axis]).abs() <= 1.0e-9 * before[0]);
        }
    }

    #[test]
    fn displacement_stays_put_without_the_initial_condition() {
        let config = Config { face_velocity: 0.0, ..short_config(20) };
        let sim = run_to_completion(config);
        assert!(sim.region.displacement[sim.state.next].iter().all(|&u| u == 0.0));
        assert!(sim.region.stress[sim.state.current].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn zero_extent_fails_before_any_kernel_runs() {
        let result = Simulation::new((10, 0, 1), Config::default());
        assert!(matches!(result, Err(Error::InvalidExtents(10, 0, 1))));

        let mut perf = PerformanceData::default();
        assert!(explicit_dynamics_app((0, 1, 1), &Config::default(), &mut perf).is_err());
    }

    #[test]
    fn performance_record_is_populated_and_non_negative() {
        let mut perf = PerformanceData::default();
        explicit_dynamics_app(EXTENTS, &short_config(10), &mut perf).unwrap();

        assert!(perf.mesh_time >= 0.0);
        assert!(perf.init_time > 0.0);
        assert!(perf.internal_force_time > 0.0);
        assert!(perf.stable_time_step_time > 0.0);
        assert!(perf.central_diff_time > 0.0);
        assert_eq!(perf.copy_to_host_time, 0.0);
    }

    #[test]
    fn best_keeps_the_element_wise_minimum() {
        let mut a = PerformanceData {
            mesh_time: 2.0,
            init_time: 1.0,
            internal_force_time: 5.0,
            stable_time_step_time: 0.5,
            central_diff_time: 3.0,
            copy_to_host_time: 0.0,
        };
        let b = PerformanceData {
            mesh_time: 1.0,
            init_time: 2.0,
            internal_force_time: 4.0,
            stable_time_step_time: 0.75,
            central_diff_time: 3.5,
            copy_to_host_time: 0.25,
        };
        a.best(&b);
        assert_eq!(a.mesh_time, 1.0);
        assert_eq!(a.init_time, 1.0);
        assert_eq!(a.internal_force_time, 4.0);
        assert_eq!(a.stable_time_step_time, 0.5);
        assert_eq!(a.central_diff_time, 3.0);
        assert_eq!(a.copy_to_host_time, 0.0);
    }

    #[test]
    fn snapshots_follow_the_configured_cadence() {
        let config = Config { snapshot_interval: Some(25), ..short_config(60) };
        let sim = run_to_completion(config);

        let mirror = sim.mirror.unwrap();
        assert_eq!(mirror.step, 50);
        assert!(sim.perf.copy_to_host_time > 0.0);
        assert_eq!(mirror.displacement.len(), 3 * sim.region.num_nodes());
    }
}
