use rayon::prelude::*;
use crate::error::Error;
use crate::mesh::NODES_PER_ELEM;
use crate::region::{slot_pair, Region, StateIndices};
use crate::region::{FORCE_COMPS, GRAD_COMPS, HGOP_COMPS, HG_RESIST_COMPS, SYM_COMPS, TENSOR_COMPS};
use crate::tensor::{Mat3, Sym3};
use super::{gather_coords, ONE12TH};

/// Corner quads of the hexahedron faces, for the characteristic-length
/// face areas.
const FACES: [[usize; 4]; 6] = [
    [0, 1, 2, 3],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];




/**
 * Last and heaviest kernel of the element chain. For each element: rotate
 * the stretch rate into the unrotated frame, integrate the hypoelastic
 * stress there, rotate the result back to the spatial frame, add bulk
 * viscosity pressure and hourglass resistance, emit the per-corner internal
 * force contributions (gathered by the node kernel, never scattered), and
 * record the element's Courant-type stable time-step bound.
 */
pub fn divergence(region: &mut Region, user_dt: f64, state: &StateIndices) -> Result<(), Error> {
    let Region {
        mesh,
        material,
        displacement,
        velocity,
        stress,
        rotation,
        hg_resist,
        grad_op,
        hgop,
        vel_grad,
        mid_volume,
        force_contrib,
        elem_dt,
        ..
    } = region;

    let conn = &mesh.connectivity;
    let coords = &mesh.coords;
    let disp_cur = &displacement[state.current];
    let disp_prev = &displacement[state.previous];
    let vel_cur = &velocity[state.current];
    let rot_cur = &rotation[state.current];
    let grad_op = &grad_op[..];
    let hgop = &hgop[..];
    let vel_grad = &vel_grad[..];
    let mid_volume = &mid_volume[..];
    let material = *material;

    let (stress_write, stress_read) = slot_pair(stress, state.current, state.previous);
    let (hg_write, hg_read) = slot_pair(hg_resist, state.current, state.previous);

    let wave_speed = material.wave_speed();
    let hg_stiff = material.hg_stiffness * material.two_mu();
    let hg_visc = material.hg_viscosity * material.density * wave_speed;

    stress_write
        .par_chunks_mut(SYM_COMPS)
        .zip(hg_write.par_chunks_mut(HG_RESIST_COMPS))
        .zip(force_contrib.par_chunks_mut(FORCE_COMPS))
        .zip(elem_dt.par_iter_mut())
        .enumerate()
        .try_for_each(|(elem, (((stress_new, hg_new), force), stable_dt))| {
            let nodes = &conn[NODES_PER_ELEM * elem..NODES_PER_ELEM * (elem + 1)];
            let (x, y, z) = gather_coords(nodes, coords, disp_cur, disp_prev, 0.5);
            let vol = mid_volume[elem];

            let grad = &grad_op[GRAD_COMPS * elem..GRAD_COMPS * (elem + 1)];
            let (grad_x, rest) = grad.split_at(NODES_PER_ELEM);
            let (grad_y, grad_z) = rest.split_at(NODES_PER_ELEM);

            let mut r = [0.0; TENSOR_COMPS];
            r.copy_from_slice(&rot_cur[TENSOR_COMPS * elem..TENSOR_COMPS * (elem + 1)]);
            let r = Mat3(r);

            // unrotated stretch rate
            let l = &vel_grad[TENSOR_COMPS * elem..TENSOR_COMPS * (elem + 1)];
            let d = Sym3([
                l[0],
                l[4],
                l[8],
                0.5 * (l[1] + l[3]),
                0.5 * (l[5] + l[7]),
                0.5 * (l[6] + l[2]),
            ]);
            let d_unrot = d.unrotated(&r);

            // hypoelastic stress update in the unrotated frame
            let mut old = [0.0; SYM_COMPS];
            match stress_read {
                Some(read) => old.copy_from_slice(&read[SYM_COMPS * elem..SYM_COMPS * (elem + 1)]),
                None => old.copy_from_slice(stress_new),
            }
            let increment = material.stress_increment(&d_unrot, user_dt);

            for (n, s) in stress_new.iter_mut().enumerate() {
                *s = old[n] + increment.0[n];
            }
            let mut unrot = [0.0; SYM_COMPS];
            unrot.copy_from_slice(stress_new);
            let mut spatial = Sym3(unrot).rotated(&r);

            // characteristic length = volume / largest face area
            let mut area_max = 0.0_f64;

            for corners in &FACES {
                let [a, b, c, e] = *corners;
                let d1 = [x[c] - x[a], y[c] - y[a], z[c] - z[a]];
                let d2 = [x[e] - x[b], y[e] - y[b], z[e] - z[b]];
                let cross = [
                    d1[1] * d2[2] - d1[2] * d2[1],
                    d1[2] * d2[0] - d1[0] * d2[2],
                    d1[0] * d2[1] - d1[1] * d2[0],
                ];
                let area = 0.5 * (cross[0] * cross[0] + cross[1] * cross[1] + cross[2] * cross[2]).sqrt();
                area_max = area_max.max(area);
            }
            let length = vol / area_max;

            // bulk viscosity pressure on compressing elements
            let trd = d.trace();

            if trd < 0.0 {
                let q = material.density
                    * length
                    * trd.abs()
                    * (material.quad_bulk_visc * length * trd.abs() + material.lin_bulk_visc * wave_speed);
                spatial.0[0] -= q;
                spatial.0[1] -= q;
                spatial.0[2] -= q;
            }

            // hourglass modal rates, resistance state, and corner forces
            let hg = &hgop[HGOP_COMPS * elem..HGOP_COMPS * (elem + 1)];
            let mut resist = [0.0; HG_RESIST_COMPS];
            let stiff = hg_stiff * vol.cbrt();
            let visc = hg_visc * vol.powf(2.0 / 3.0);

            for alpha in 0..4 {
                let gamma = &hg[NODES_PER_ELEM * alpha..NODES_PER_ELEM * (alpha + 1)];

                for axis in 0..3 {
                    let rate: f64 = gamma
                        .iter()
                        .zip(nodes)
                        .map(|(g, &n)| g * vel_cur[3 * n + axis])
                        .sum();
                    let slot = 3 * alpha + axis;
                    let old_resist = match hg_read {
                        Some(read) => read[HG_RESIST_COMPS * elem + slot],
                        None => hg_new[slot],
                    };
                    hg_new[slot] = old_resist + user_dt * stiff * rate;
                    resist[slot] = hg_new[slot] + visc * rate;
                }
            }

            let [sxx, syy, szz, sxy, syz, szx] = spatial.0;

            for i in 0..NODES_PER_ELEM {
                let bx = grad_x[i] * ONE12TH;
                let by = grad_y[i] * ONE12TH;
                let bz = grad_z[i] * ONE12TH;

                let mut fx = sxx * bx + sxy * by + szx * bz;
                let mut fy = sxy * bx + syy * by + syz * bz;
                let mut fz = szx * bx + syz * by + szz * bz;

                for alpha in 0..4 {
                    let gamma = hg[NODES_PER_ELEM * alpha + i];
                    fx += gamma * resist[3 * alpha + 0];
                    fy += gamma * resist[3 * alpha + 1];
                    fz += gamma * resist[3 * alpha + 2];
                }
                force[3 * i + 0] = fx;
                force[3 * i + 1] = fy;
                force[3 * i + 2] = fz;
            }

            // a non-finite or non-positive bound must fail loudly here:
            // f64::min would silently discard a NaN in the reduction
            let bound = length / (wave_speed + material.lin_bulk_visc * wave_speed
                + material.quad_bulk_visc * length * trd.min(0.0).abs());

            if !bound.is_finite() || bound <= 0.0 {
                return Err(Error::UnstableTimeStep(bound));
            }
            *stable_dt = bound;
            Ok(())
        })
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::super::fixtures::initialized_region;
    use super::super::{grad_hgop, decomp_rotate};
    use super::*;
    use crate::region::StateIndices;

    const USER_DT: f64 = 1.0e-5;

    fn stepped_state() -> StateIndices {
        let mut state = StateIndices::new();
        state.rotate();
        state
    }

    fn run_chain(region: &mut Region, state: &StateIndices) {
        grad_hgop(region, state).unwrap();
        decomp_rotate(region, state);
        divergence(region, USER_DT, state).unwrap();
    }

    #[test]
    fn quiescent_region_stays_stress_free() {
        let mut region = initialized_region(3, 1, 1);
        let state = stepped_state();
        run_chain(&mut region, &state);

        assert!(region.stress[state.current].iter().all(|&s| s == 0.0));
        assert!(region.force_contrib.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn uniaxial_compression_builds_compressive_stress() {
        let mut region = initialized_region(1, 1, 1);
        let state = stepped_state();

        // v_x = -10 x: uniform compression along x
        for node in 0..region.num_nodes() {
            region.velocity[state.current][3 * node] = -10.0 * region.mesh.coord(node, 0);
        }
        run_chain(&mut region, &state);

        let stress = &region.stress[state.current][..6];
        let expect = USER_DT * region.material.youngs_modulus * -10.0;
        assert!((stress[0] - expect).abs() < 1.0e-9 * expect.abs());
        assert!(stress[1].abs() < 1.0e-12);

        // corner forces push the faces apart along x and sum to zero
        let force = &region.force_contrib;
        let total_x: f64 = (0..8).map(|i| force[3 * i]).sum();
        assert!(total_x.abs() < 1.0e-12);
        assert!(force[0] > 0.0); // node 0 sits on the low-x face
        assert!(force[3] < 0.0); // node 1 sits on the high-x face
    }

    #[test]
    fn rest_cube_bound_is_length_over_wave_speed() {
        let mut region = initialized_region(2, 2, 2);
        let state = stepped_state();
        run_chain(&mut region, &state);

        let expect = 1.0 / region.material.wave_speed();
        assert!(region.elem_dt.iter().all(|&dt| (dt - expect).abs() < 1.0e-12 * expect));
    }

    #[test]
    fn stress_accumulates_across_two_steps() {
        let mut region = initialized_region(1, 1, 1);
        let mut state = stepped_state();

        for node in 0..region.num_nodes() {
            region.velocity[state.current][3 * node] = -10.0 * region.mesh.coord(node, 0);
        }
        run_chain(&mut region, &state);
        let first = region.stress[state.current][0];

        // same velocity field in the next slot, displacement still zero
        state.rotate();
        let vel = region.velocity[state.previous].clone();
        region.velocity[state.current].copy_from_slice(&vel);
        run_chain(&mut region, &state);

        let second = region.stress[state.current][0];
        assert!(second < first && (second - 2.0 * first).abs() < 1.0e-6 * first.abs());
    }
}
