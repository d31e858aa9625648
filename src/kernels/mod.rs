/**
 * The per-entity compute passes, one module per kernel, executed by the
 * driver in a fixed order each step with a full barrier between passes.
 * Every kernel is a free function over the region and the rotating state
 * indices; per-element work touches only that element's topology
 * neighborhood, and all assembly into shared nodes goes through the
 * node-to-element gather rather than an element scatter.
 */

pub mod decomp_rotate;
pub mod divergence;
pub mod finish_step;
pub mod grad_hgop;
pub mod initialize;
pub mod time_step;

pub use decomp_rotate::decomp_rotate;
pub use divergence::divergence;
pub use finish_step::finish_step;
pub use grad_hgop::grad_hgop;
pub use initialize::{initialize_element, initialize_node};
pub use time_step::{minimum_stable_time_step, set_next_time_step};

use crate::mesh::NODES_PER_ELEM;

pub(crate) const ONE12TH: f64 = 1.0 / 12.0;




/**
 * One component of the uniform-gradient operator of an 8-node hexahedron,
 * in the 12-term cofactor form. `d` supplies the coordinate differences and
 * `m` the multipliers; the x-gradient is `uniform_gradient(z, y)`, the
 * y-gradient `uniform_gradient(x, z)`, the z-gradient `uniform_gradient(y,
 * x)`. The result carries a factor of 12: dotting a coordinate array with
 * its own gradient component gives twelve times the element volume.
 */
pub(crate) fn uniform_gradient(d: &[f64; NODES_PER_ELEM], m: &[f64; NODES_PER_ELEM]) -> [f64; NODES_PER_ELEM] {
    let r42 = d[3] - d[1];
    let r52 = d[4] - d[1];
    let r54 = d[4] - d[3];
    let r63 = d[5] - d[2];
    let r83 = d[7] - d[2];
    let r86 = d[7] - d[5];
    let r31 = d[2] - d[0];
    let r61 = d[5] - d[0];
    let r74 = d[6] - d[3];
    let r72 = d[6] - d[1];
    let r75 = d[6] - d[4];
    let r81 = d[7] - d[0];

    let t1 = r63 + r54;
    let t2 = r61 + r74;
    let t3 = r72 + r81;
    let t4 = r86 + r42;
    let t5 = r83 + r52;
    let t6 = r75 + r31;

    [
        (m[1] * t1) - (m[2] * r42) - (m[3] * t5) + (m[4] * t4) + (m[5] * r52) - (m[7] * r54),
        (m[2] * t2) + (m[3] * r31) - (m[0] * t1) - (m[5] * t6) + (m[6] * r63) - (m[4] * r61),
        (m[3] * t3) + (m[0] * r42) - (m[1] * t2) - (m[6] * t4) + (m[7] * r74) - (m[5] * r72),
        (m[0] * t5) - (m[1] * r31) - (m[2] * t3) + (m[7] * t6) + (m[4] * r81) - (m[6] * r83),
        (m[5] * t3) + (m[6] * r86) - (m[7] * t2) - (m[0] * t4) - (m[3] * r81) + (m[1] * r61),
        (m[6] * t5) - (m[4] * t3) - (m[7] * r75) + (m[1] * t6) - (m[0] * r52) + (m[2] * r72),
        (m[7] * t1) - (m[5] * t5) - (m[4] * r86) + (m[2] * t4) - (m[1] * r63) + (m[3] * r83),
        (m[4] * t2) - (m[6] * t1) + (m[5] * r75) - (m[3] * t6) - (m[2] * r74) + (m[0] * r54),
    ]
}

pub(crate) fn dot8(a: &[f64; NODES_PER_ELEM], b: &[f64; NODES_PER_ELEM]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/**
 * Gather one element's corner coordinates into per-axis arrays, displaced
 * by `scale` times the sum of the given displacement slots (pass the same
 * slot twice with `scale` 0.5 for a single-state offset, or two slots for
 * the midpoint configuration).
 */
pub(crate) fn gather_coords(
    nodes: &[usize],
    coords: &[f64],
    disp_a: &[f64],
    disp_b: &[f64],
    scale: f64,
) -> ([f64; NODES_PER_ELEM], [f64; NODES_PER_ELEM], [f64; NODES_PER_ELEM]) {
    let mut x = [0.0; NODES_PER_ELEM];
    let mut y = [0.0; NODES_PER_ELEM];
    let mut z = [0.0; NODES_PER_ELEM];

    for (i, &n) in nodes.iter().enumerate() {
        x[i] = coords[3 * n + 0] + scale * (disp_a[3 * n + 0] + disp_b[3 * n + 0]);
        y[i] = coords[3 * n + 1] + scale * (disp_a[3 * n + 1] + disp_b[3 * n + 1]);
        z[i] = coords[3 * n + 2] + scale * (disp_a[3 * n + 2] + disp_b[3 * n + 2]);
    }
    (x, y, z)
}




// ============================================================================
#[cfg(test)]
pub(crate) mod fixtures {

    use crate::config::Config;
    use crate::mesh::BoxMesh;
    use crate::region::Region;

    /**
     * A freshly initialized region on a small box mesh with the default
     * material, masses computed and the face velocity condition applied.
     */
    pub fn initialized_region(ex: usize, ey: usize, ez: usize) -> Region {
        let config = Config::default();
        let mesh = BoxMesh::new(ex, ey, ez).unwrap();
        let mut region = Region::new(mesh, config.material, config.user_dt);

        super::initialize_element(&mut region).unwrap();
        super::initialize_node(&mut region).unwrap();
        region
    }
}
