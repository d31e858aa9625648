use rayon::prelude::*;
use crate::error::Error;
use crate::mesh::NODES_PER_ELEM;
use crate::region::{Region, StateIndices, GRAD_COMPS, HGOP_COMPS, TENSOR_COMPS};
use super::{dot8, gather_coords, uniform_gradient, ONE12TH};

/// Hourglass base vectors of the 8-node hexahedron: the three bilinear and
/// one trilinear deformation modes the uniform gradient cannot see.
const HG_BASE: [[f64; NODES_PER_ELEM]; 4] = [
    [1.0, 1.0, -1.0, -1.0, -1.0, -1.0, 1.0, 1.0],
    [1.0, -1.0, -1.0, 1.0, -1.0, 1.0, 1.0, -1.0],
    [1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0, 1.0, 1.0, -1.0, 1.0, -1.0],
];




/**
 * First kernel of the per-step element chain. For each element, at the
 * midpoint of the previous and current configurations: the uniform-gradient
 * operator, the element volume (fatal if non-positive: a tangled element
 * invalidates everything downstream), the velocity gradient, and the
 * volume-corrected hourglass operator.
 */
pub fn grad_hgop(region: &mut Region, state: &StateIndices) -> Result<(), Error> {
    let Region { mesh, displacement, velocity, grad_op, hgop, vel_grad, mid_volume, .. } = region;

    let conn = &mesh.connectivity;
    let coords = &mesh.coords;
    let disp_cur = &displacement[state.current];
    let disp_prev = &displacement[state.previous];
    let vel_cur = &velocity[state.current];

    grad_op
        .par_chunks_mut(GRAD_COMPS)
        .zip(hgop.par_chunks_mut(HGOP_COMPS))
        .zip(vel_grad.par_chunks_mut(TENSOR_COMPS))
        .zip(mid_volume.par_iter_mut())
        .enumerate()
        .try_for_each(|(elem, (((grad, hgop), vel_grad), volume))| {
            let nodes = &conn[NODES_PER_ELEM * elem..NODES_PER_ELEM * (elem + 1)];
            let (x, y, z) = gather_coords(nodes, coords, disp_cur, disp_prev, 0.5);

            let grad_x = uniform_gradient(&z, &y);
            let grad_y = uniform_gradient(&x, &z);
            let grad_z = uniform_gradient(&y, &x);

            let vol = dot8(&x, &grad_x) * ONE12TH;

            if !vol.is_finite() || vol <= 0.0 {
                return Err(Error::DegenerateElement(elem, vol));
            }
            *volume = vol;

            grad[..NODES_PER_ELEM].copy_from_slice(&grad_x);
            grad[NODES_PER_ELEM..2 * NODES_PER_ELEM].copy_from_slice(&grad_y);
            grad[2 * NODES_PER_ELEM..].copy_from_slice(&grad_z);

            // velocity gradient L_ij = sum_I v_iI B_jI / (12 V)
            let inv_12v = 1.0 / (12.0 * vol);
            let mut l = [0.0; TENSOR_COMPS];

            for (i, &n) in nodes.iter().enumerate() {
                let b = [grad_x[i], grad_y[i], grad_z[i]];

                for row in 0..3 {
                    let v = vel_cur[3 * n + row];

                    for col in 0..3 {
                        l[3 * row + col] += v * b[col];
                    }
                }
            }
            for (out, value) in vel_grad.iter_mut().zip(&l) {
                *out = value * inv_12v;
            }

            // hourglass operator: base vectors made orthogonal to the
            // deformed linear fields, gamma_aI = h_aI - (h_a . x_j) B_jI / 12V
            for (alpha, base) in HG_BASE.iter().enumerate() {
                let hx = dot8(base, &x);
                let hy = dot8(base, &y);
                let hz = dot8(base, &z);

                for i in 0..NODES_PER_ELEM {
                    hgop[NODES_PER_ELEM * alpha + i] = base[i]
                        - (hx * grad_x[i] + hy * grad_y[i] + hz * grad_z[i]) * inv_12v;
                }
            }
            Ok(())
        })
}
