use rayon::prelude::*;
use crate::error::Error;
use crate::mesh::NODES_PER_ELEM;
use crate::region::{Region, TENSOR_COMPS};
use super::{dot8, gather_coords, uniform_gradient, ONE12TH};




/**
 * One-time per-element setup: the reference volume from the undeformed
 * corner coordinates (fatal if non-positive), the lumped element mass, and
 * the identity rotation seeded into both state slots. Stress starts zeroed
 * by construction.
 */
pub fn initialize_element(region: &mut Region) -> Result<(), Error> {
    let Region { mesh, material, ref_volume, elem_mass, rotation, displacement, .. } = region;

    let conn = &mesh.connectivity;
    let coords = &mesh.coords;
    let density = material.density;
    let zero_disp = &displacement[0];
    let [rot_0, rot_1] = rotation;

    ref_volume
        .par_iter_mut()
        .zip(elem_mass.par_iter_mut())
        .zip(rot_0.par_chunks_mut(TENSOR_COMPS))
        .zip(rot_1.par_chunks_mut(TENSOR_COMPS))
        .enumerate()
        .try_for_each(|(elem, (((volume, mass), rot_0), rot_1))| {
            let nodes = &conn[NODES_PER_ELEM * elem..NODES_PER_ELEM * (elem + 1)];
            let (x, y, z) = gather_coords(nodes, coords, zero_disp, zero_disp, 0.0);

            let grad_x = uniform_gradient(&z, &y);
            let vol = dot8(&x, &grad_x) * ONE12TH;

            if !vol.is_finite() || vol <= 0.0 {
                return Err(Error::DegenerateElement(elem, vol));
            }
            *volume = vol;
            *mass = density * vol;

            for i in 0..3 {
                rot_0[4 * i] = 1.0;
                rot_1[4 * i] = 1.0;
            }
            Ok(())
        })
}




/**
 * One-time per-node setup: the lumped nodal mass, gathered as one eighth of
 * each attached element's mass. A node with no positive mass cannot be
 * integrated and is a fatal configuration error.
 */
pub fn initialize_node(region: &mut Region) -> Result<(), Error> {
    let Region { mesh, nodal_mass, elem_mass, .. } = region;
    let mesh = &*mesh;
    let elem_mass = &elem_mass[..];
    let share = 1.0 / NODES_PER_ELEM as f64;

    nodal_mass
        .par_iter_mut()
        .enumerate()
        .try_for_each(|(node, mass)| {
            let gathered: f64 = mesh
                .attached(node)
                .iter()
                .map(|&slot| elem_mass[slot / NODES_PER_ELEM] * share)
                .sum();

            if !gathered.is_finite() || gathered <= 0.0 {
                return Err(Error::ZeroNodalMass(node));
            }
            *mass = gathered;
            Ok(())
        })
}
