use crate::error::Error;

pub const NODES_PER_ELEM: usize = 8;




/**
 * A structured box mesh of hexahedral elements at unit node spacing. Node
 * `(i, j, k)` sits at coordinates `(i, j, k)`; element `(i, j, k)` spans the
 * unit cube with lowest corner at that node. Besides the element-to-node
 * connectivity, the fixture builds the reverse node-to-element adjacency in
 * compressed form, which the assembly kernels use to gather element
 * contributions deterministically instead of scattering them.
 */
pub struct BoxMesh {
    pub extents: (usize, usize, usize),
    pub num_nodes: usize,
    pub num_elements: usize,

    /// Node coordinates, 3 per node.
    pub coords: Vec<f64>,

    /// Element corner nodes, 8 per element, bottom face counterclockwise
    /// then top face counterclockwise.
    pub connectivity: Vec<usize>,

    /// CSR offsets into `node_elem_items`, one range per node.
    pub node_elem_offsets: Vec<usize>,

    /// Attached elements per node, packed as `element * 8 + local_node`.
    pub node_elem_items: Vec<usize>,
}




// ============================================================================
impl BoxMesh {

    pub fn new(ex: usize, ey: usize, ez: usize) -> Result<Self, Error> {
        if ex == 0 || ey == 0 || ez == 0 {
            return Err(Error::InvalidExtents(ex, ey, ez));
        }
        let (nx, ny, nz) = (ex + 1, ey + 1, ez + 1);
        let num_nodes = nx * ny * nz;
        let num_elements = ex * ey * ez;

        let node_id = |i: usize, j: usize, k: usize| (k * ny + j) * nx + i;

        let mut coords = vec![0.0; 3 * num_nodes];

        for k in 0..nz {
            for j in 0..ny {
                for i in 0..nx {
                    let n = node_id(i, j, k);
                    coords[3 * n + 0] = i as f64;
                    coords[3 * n + 1] = j as f64;
                    coords[3 * n + 2] = k as f64;
                }
            }
        }

        let mut connectivity = Vec::with_capacity(NODES_PER_ELEM * num_elements);

        for k in 0..ez {
            for j in 0..ey {
                for i in 0..ex {
                    connectivity.extend_from_slice(&[
                        node_id(i, j, k),
                        node_id(i + 1, j, k),
                        node_id(i + 1, j + 1, k),
                        node_id(i, j + 1, k),
                        node_id(i, j, k + 1),
                        node_id(i + 1, j, k + 1),
                        node_id(i + 1, j + 1, k + 1),
                        node_id(i, j + 1, k + 1),
                    ]);
                }
            }
        }

        let mut counts = vec![0; num_nodes];

        for &node in &connectivity {
            counts[node] += 1;
        }

        let mut node_elem_offsets = Vec::with_capacity(num_nodes + 1);
        let mut total = 0;

        node_elem_offsets.push(0);
        for &c in &counts {
            total += c;
            node_elem_offsets.push(total);
        }

        let mut cursor = node_elem_offsets.clone();
        let mut node_elem_items = vec![0; total];

        for (slot, &node) in connectivity.iter().enumerate() {
            node_elem_items[cursor[node]] = slot;
            cursor[node] += 1;
        }

        Ok(Self {
            extents: (ex, ey, ez),
            num_nodes,
            num_elements,
            coords,
            connectivity,
            node_elem_offsets,
            node_elem_items,
        })
    }

    pub fn coord(&self, node: usize, axis: usize) -> f64 {
        self.coords[3 * node + axis]
    }

    /**
     * The attachments of one node, each packed as `element * 8 + local_node`.
     */
    pub fn attached(&self, node: usize) -> &[usize] {
        &self.node_elem_items[self.node_elem_offsets[node]..self.node_elem_offsets[node + 1]]
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;
    use crate::error::Error;

    #[test]
    fn box_mesh_has_expected_counts() {
        let mesh = BoxMesh::new(10, 1, 1).unwrap();
        assert_eq!(mesh.num_elements, 10);
        assert_eq!(mesh.num_nodes, 11 * 2 * 2);
        assert_eq!(mesh.connectivity.len(), 80);
    }

    #[test]
    fn zero_extent_is_rejected() {
        assert!(matches!(BoxMesh::new(4, 0, 4), Err(Error::InvalidExtents(4, 0, 4))));
        assert!(matches!(BoxMesh::new(0, 1, 1), Err(Error::InvalidExtents(0, 1, 1))));
    }

    #[test]
    fn first_element_spans_the_unit_cube() {
        let mesh = BoxMesh::new(2, 2, 2).unwrap();
        let corners = &mesh.connectivity[..8];

        for axis in 0..3 {
            let lo = corners.iter().map(|&n| mesh.coord(n, axis)).fold(f64::MAX, f64::min);
            let hi = corners.iter().map(|&n| mesh.coord(n, axis)).fold(f64::MIN, f64::max);
            assert_eq!((lo, hi), (0.0, 1.0));
        }
    }

    #[test]
    fn interior_node_touches_eight_elements() {
        let mesh = BoxMesh::new(2, 2, 2).unwrap();
        let interior = (0..mesh.num_nodes)
            .find(|&n| (0..3).all(|a| mesh.coord(n, a) == 1.0))
            .unwrap();
        assert_eq!(mesh.attached(interior).len(), 8);

        let corner = (0..mesh.num_nodes)
            .find(|&n| (0..3).all(|a| mesh.coord(n, a) == 0.0))
            .unwrap();
        assert_eq!(mesh.attached(corner).len(), 1);
    }

    #[test]
    fn adjacency_inverts_the_connectivity() {
        let mesh = BoxMesh::new(3, 2, 1).unwrap();

        for node in 0..mesh.num_nodes {
            for &slot in mesh.attached(node) {
                assert_eq!(mesh.connectivity[slot], node);
            }
        }
        let total: usize = (0..mesh.num_nodes).map(|n| mesh.attached(n).len()).sum();
        assert_eq!(total, mesh.connectivity.len());
    }
}
