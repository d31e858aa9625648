use rayon::prelude::*;
use crate::error::Error;
use crate::mesh::NODES_PER_ELEM;
use crate::region::{split_slots, Region, StateIndices, FORCE_COMPS};




/**
 * The node-update kernel. Gathers each node's internal force from the
 * contributions its attached elements emitted (deterministic: the same
 * fixed traversal regardless of worker count), applies Newton's second law,
 * and advances velocity then displacement into the next state slot by
 * central difference with the freshly broadcast time step.
 */
pub fn finish_step(region: &mut Region, state: &StateIndices) -> Result<(), Error> {
    let Region {
        mesh,
        velocity,
        displacement,
        acceleration,
        internal_force,
        nodal_mass,
        force_contrib,
        time_step,
        ..
    } = region;

    let dt = time_step[state.next];
    let mesh = &*mesh;
    let nodal_mass = &nodal_mass[..];
    let force_contrib = &force_contrib[..];
    let (vel_next, vel_cur) = split_slots(velocity, state.next, state.current);
    let (disp_next, disp_cur) = split_slots(displacement, state.next, state.current);

    acceleration
        .par_chunks_mut(3)
        .zip(internal_force.par_chunks_mut(3))
        .zip(vel_next.par_chunks_mut(3))
        .zip(disp_next.par_chunks_mut(3))
        .enumerate()
        .try_for_each(|(node, (((accel, int_force), vel), disp))| {
            let mut f = [0.0; 3];

            for &slot in mesh.attached(node) {
                let elem = slot / NODES_PER_ELEM;
                let corner = slot % NODES_PER_ELEM;
                let contrib = &force_contrib[FORCE_COMPS * elem + 3 * corner..][..3];

                f[0] += contrib[0];
                f[1] += contrib[1];
                f[2] += contrib[2];
            }
            let mass = nodal_mass[node];

            if !mass.is_finite() || mass <= 0.0 {
                return Err(Error::ZeroNodalMass(node));
            }
            for axis in 0..3 {
                let a = -f[axis] / mass;

                int_force[axis] = f[axis];
                accel[axis] = a;
                vel[axis] = vel_cur[3 * node + axis] + dt * a;
                disp[axis] = disp_cur[3 * node + axis] + dt * vel[axis];
            }
            Ok(())
        })
}
