use crate::material::Material;
use crate::mesh::{BoxMesh, NODES_PER_ELEM};

/// Number of time-history slots carried by each multi-state field.
pub const NUM_STATES: usize = 2;

/// Components per element of the gradient operator (3 axes x 8 nodes).
pub const GRAD_COMPS: usize = 3 * NODES_PER_ELEM;

/// Components per element of the hourglass operator (4 modes x 8 nodes).
pub const HGOP_COMPS: usize = 4 * NODES_PER_ELEM;

/// Components per element of a full tensor.
pub const TENSOR_COMPS: usize = 9;

/// Independent components per element of a symmetric tensor.
pub const SYM_COMPS: usize = 6;

/// Components per element of the hourglass resistance (4 modes x 3 axes).
pub const HG_RESIST_COMPS: usize = 12;

/// Components per element of the nodal force contributions (8 nodes x 3 axes).
pub const FORCE_COMPS: usize = NODES_PER_ELEM * 3;




#[derive(Clone, Copy, Debug, PartialEq)]

/**
 * The rotating state-slot indices. All three start equal; the first
 * rotation of a run leaves `previous == current` (there is no history yet)
 * and every subsequent rotation keeps the three pairwise roles on a fixed
 * period-`NUM_STATES` schedule with `current != next`.
 */
pub struct StateIndices {
    pub previous: usize,
    pub current: usize,
    pub next: usize,
}

impl StateIndices {

    pub fn new() -> Self {
        Self { previous: 0, current: 0, next: 0 }
    }

    pub fn rotate(&mut self) {
        self.previous = self.current;
        self.current = self.next;
        self.next = (self.next + 1) % NUM_STATES;
    }
}




/**
 * The shared data model: every per-node and per-element field buffer, sized
 * once from the mesh and never resized during stepping. Multi-state fields
 * store one full buffer per slot; kernels address them through the rotating
 * `StateIndices` and only ever write the slot they own in a given step. The
 * region performs no synchronization itself.
 */
pub struct Region {
    pub mesh: BoxMesh,
    pub material: Material,

    // Two-state nodal fields, 3 components per node.
    pub velocity: [Vec<f64>; NUM_STATES],
    pub displacement: [Vec<f64>; NUM_STATES],

    // Two-state element fields. Stress lives in the unrotated frame.
    pub stress: [Vec<f64>; NUM_STATES],
    pub rotation: [Vec<f64>; NUM_STATES],
    pub hg_resist: [Vec<f64>; NUM_STATES],

    // The broadcast time-step slot written by the reduction stage.
    pub time_step: [f64; NUM_STATES],

    // Single-state nodal fields.
    pub acceleration: Vec<f64>,
    pub internal_force: Vec<f64>,
    pub nodal_mass: Vec<f64>,

    // Single-state element fields.
    pub elem_mass: Vec<f64>,
    pub ref_volume: Vec<f64>,
    pub mid_volume: Vec<f64>,
    pub grad_op: Vec<f64>,
    pub hgop: Vec<f64>,
    pub vel_grad: Vec<f64>,
    pub force_contrib: Vec<f64>,
    pub elem_dt: Vec<f64>,
}




// ============================================================================
impl Region {

    pub fn new(mesh: BoxMesh, material: Material, user_dt: f64) -> Self {
        let nn = mesh.num_nodes;
        let ne = mesh.num_elements;
        let nodal = || vec![0.0; 3 * nn];
        let elem = |comps: usize| vec![0.0; comps * ne];

        Self {
            mesh,
            material,
            velocity: [nodal(), nodal()],
            displacement: [nodal(), nodal()],
            stress: [elem(SYM_COMPS), elem(SYM_COMPS)],
            rotation: [elem(TENSOR_COMPS), elem(TENSOR_COMPS)],
            hg_resist: [elem(HG_RESIST_COMPS), elem(HG_RESIST_COMPS)],
            time_step: [user_dt; NUM_STATES],
            acceleration: nodal(),
            internal_force: nodal(),
            nodal_mass: vec![0.0; nn],
            elem_mass: vec![0.0; ne],
            ref_volume: vec![0.0; ne],
            mid_volume: vec![0.0; ne],
            grad_op: elem(GRAD_COMPS),
            hgop: elem(HGOP_COMPS),
            vel_grad: elem(TENSOR_COMPS),
            force_contrib: elem(FORCE_COMPS),
            elem_dt: vec![0.0; ne],
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.mesh.num_nodes
    }

    pub fn num_elements(&self) -> usize {
        self.mesh.num_elements
    }

    /**
     * Total linear momentum of the nodal field at the given state slot.
     */
    pub fn momentum(&self, slot: usize) -> [f64; 3] {
        let mut p = [0.0; 3];

        for (node, &m) in self.nodal_mass.iter().enumerate() {
            for axis in 0..3 {
                p[axis] += m * self.velocity[slot][3 * node + axis];
            }
        }
        p
    }
}




/**
 * Split a two-state field into one writable slot and one readable slot.
 * The slots must be distinct, which the rotation schedule guarantees for
 * every step after the first.
 */
pub fn split_slots(field: &mut [Vec<f64>; NUM_STATES], write: usize, read: usize) -> (&mut [f64], &[f64]) {
    assert!(write != read && write < NUM_STATES && read < NUM_STATES);
    let (lo, hi) = field.split_at_mut(1);

    if write == 0 {
        (&mut lo[0], &hi[0])
    } else {
        (&mut hi[0], &lo[0])
    }
}




/**
 * Like `split_slots`, but tolerates `write == read`, which happens on the
 * very first step when no history exists yet. In the aliased case the read
 * side is `None` and the kernel reads its own element's old values out of
 * the write chunk before overwriting them.
 */
pub fn slot_pair(field: &mut [Vec<f64>; NUM_STATES], write: usize, read: usize) -> (&mut [f64], Option<&[f64]>) {
    if write == read {
        (&mut field[write], None)
    } else {
        let (w, r) = split_slots(field, write, read);
        (w, Some(r))
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;

    #[test]
    fn rotation_schedule_has_period_two() {
        let mut state = StateIndices::new();
        state.rotate();
        assert_eq!(state, StateIndices { previous: 0, current: 0, next: 1 });
        state.rotate();
        assert_eq!(state, StateIndices { previous: 0, current: 1, next: 0 });
        state.rotate();
        assert_eq!(state, StateIndices { previous: 1, current: 0, next: 1 });
        state.rotate();
        assert_eq!(state, StateIndices { previous: 0, current: 1, next: 0 });
    }

    #[test]
    fn current_and_next_never_coincide_after_the_first_rotation() {
        let mut state = StateIndices::new();

        for _ in 0..17 {
            state.rotate();
            assert_ne!(state.current, state.next);
        }
    }

    #[test]
    fn split_slots_returns_disjoint_buffers() {
        let mut field = [vec![1.0; 4], vec![2.0; 4]];
        let (w, r) = split_slots(&mut field, 1, 0);
        assert_eq!(r[0], 1.0);
        w[0] = 9.0;
        assert_eq!(field[1][0], 9.0);
    }
}
