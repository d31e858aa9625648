use serde::{Deserialize, Serialize};
use crate::material::Material;




#[derive(Clone, Debug, Serialize, Deserialize)]

/**
 * Run configuration: the material block, the user time step ceiling, the
 * number of steps, the initial face-velocity boundary condition, the worker
 * thread count (0 means the rayon default), and the optional host snapshot
 * cadence.
 */
pub struct Config {
    pub material: Material,
    pub user_dt: f64,
    pub num_steps: usize,
    pub face_velocity: f64,
    pub num_threads: usize,
    pub snapshot_interval: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            material: Material::default(),
            user_dt: 1.0e-5,
            num_steps: 1000,
            face_velocity: 1.0e3,
            num_threads: 0,
            snapshot_interval: None,
        }
    }
}
