use rayon::prelude::*;
use crate::region::{slot_pair, Region, StateIndices, TENSOR_COMPS};
use crate::tensor::{polar_rotation, Mat3};

/// Iteration cap and convergence tolerance for the polar decomposition.
const POLAR_MAX_ITER: usize = 8;
const POLAR_TOL: f64 = 1.0e-12;




/**
 * Second kernel of the element chain. Builds the incremental deformation
 * `F = I + dt L` from the velocity gradient, extracts its rotation factor
 * by bounded polar iteration, and composes it onto the previous rotation
 * state. An element whose decomposition fails to converge keeps its
 * previous orientation (identity increment); the return value counts such
 * fallbacks so the driver can report them.
 */
pub fn decomp_rotate(region: &mut Region, state: &StateIndices) -> usize {
    let Region { rotation, vel_grad, time_step, .. } = region;

    let dt = time_step[state.current];
    let vel_grad = &vel_grad[..];
    let (rot_write, rot_read) = slot_pair(rotation, state.current, state.previous);

    rot_write
        .par_chunks_mut(TENSOR_COMPS)
        .enumerate()
        .map(|(elem, rot_new)| {
            let l = &vel_grad[TENSOR_COMPS * elem..TENSOR_COMPS * (elem + 1)];

            let mut f = [0.0; TENSOR_COMPS];
            for n in 0..TENSOR_COMPS {
                f[n] = dt * l[n];
            }
            f[0] += 1.0;
            f[4] += 1.0;
            f[8] += 1.0;

            let polar = polar_rotation(&Mat3(f), POLAR_MAX_ITER, POLAR_TOL);

            let mut prev = [0.0; TENSOR_COMPS];
            match rot_read {
                Some(read) => prev.copy_from_slice(&read[TENSOR_COMPS * elem..TENSOR_COMPS * (elem + 1)]),
                None => prev.copy_from_slice(rot_new),
            }
            let composed = polar.rotation.matmul(&Mat3(prev));
            rot_new.copy_from_slice(&composed.0);

            if polar.converged { 0 } else { 1 }
        })
        .sum()
}
