/**
 * Small fixed-size tensor arithmetic used by the element kernels: a 3x3
 * matrix in row-major storage, a symmetric 3x3 tensor holding its six
 * independent components, and the bounded-iteration polar decomposition
 * used to extract the rotation part of an incremental deformation.
 */

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat3(pub [f64; 9]);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sym3(pub [f64; 6]); // xx, yy, zz, xy, yz, zx




// ============================================================================
impl Mat3 {

    pub const IDENTITY: Mat3 = Mat3([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.0[3 * i + j]
    }

    pub fn transpose(&self) -> Mat3 {
        let m = &self.0;
        Mat3([m[0], m[3], m[6], m[1], m[4], m[7], m[2], m[5], m[8]])
    }

    pub fn matmul(&self, other: &Mat3) -> Mat3 {
        let mut out = [0.0; 9];

        for i in 0..3 {
            for j in 0..3 {
                out[3 * i + j] = (0..3).map(|k| self.get(i, k) * other.get(k, j)).sum();
            }
        }
        Mat3(out)
    }

    pub fn determinant(&self) -> f64 {
        let m = &self.0;
        m[0] * (m[4] * m[8] - m[5] * m[7])
            - m[1] * (m[3] * m[8] - m[5] * m[6])
            + m[2] * (m[3] * m[7] - m[4] * m[6])
    }

    /**
     * Return the matrix inverse, or `None` if the determinant vanishes.
     */
    pub fn inverse(&self) -> Option<Mat3> {
        let det = self.determinant();

        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let m = &self.0;
        let inv_det = 1.0 / det;

        Some(Mat3([
            (m[4] * m[8] - m[5] * m[7]) * inv_det,
            (m[2] * m[7] - m[1] * m[8]) * inv_det,
            (m[1] * m[5] - m[2] * m[4]) * inv_det,
            (m[5] * m[6] - m[3] * m[8]) * inv_det,
            (m[0] * m[8] - m[2] * m[6]) * inv_det,
            (m[2] * m[3] - m[0] * m[5]) * inv_det,
            (m[3] * m[7] - m[4] * m[6]) * inv_det,
            (m[1] * m[6] - m[0] * m[7]) * inv_det,
            (m[0] * m[4] - m[1] * m[3]) * inv_det,
        ]))
    }
}




// ============================================================================
impl Sym3 {

    pub const ZERO: Sym3 = Sym3([0.0; 6]);

    pub fn trace(&self) -> f64 {
        self.0[0] + self.0[1] + self.0[2]
    }

    pub fn to_mat(&self) -> Mat3 {
        let [xx, yy, zz, xy, yz, zx] = self.0;
        Mat3([xx, xy, zx, xy, yy, yz, zx, yz, zz])
    }

    fn from_mat(m: &Mat3) -> Sym3 {
        Sym3([m.get(0, 0), m.get(1, 1), m.get(2, 2), m.get(0, 1), m.get(1, 2), m.get(2, 0)])
    }

    /**
     * Conjugate this tensor into the frame of the given rotation: R S R^T.
     */
    pub fn rotated(&self, r: &Mat3) -> Sym3 {
        Sym3::from_mat(&r.matmul(&self.to_mat()).matmul(&r.transpose()))
    }

    /**
     * Conjugate this tensor out of the frame of the given rotation: R^T S R.
     */
    pub fn unrotated(&self, r: &Mat3) -> Sym3 {
        Sym3::from_mat(&r.transpose().matmul(&self.to_mat()).matmul(r))
    }
}




/**
 * The rotation factor of a polar decomposition, tagged with whether the
 * iteration converged or the caller received the identity fallback.
 */
pub struct PolarRotation {
    pub rotation: Mat3,
    pub converged: bool,
}

/**
 * Compute the rotation factor R of the polar decomposition F = R U by
 * Newton iteration on R <- (R + R^-T) / 2. The iteration count is bounded;
 * if it fails to converge, or the iterate becomes singular (a degenerate or
 * inverted input), the result is the identity rotation tagged as a
 * fallback. The output is finite for every finite input.
 */
pub fn polar_rotation(f: &Mat3, max_iter: usize, tol: f64) -> PolarRotation {
    let mut r = *f;

    for _ in 0..max_iter {
        let r_inv_t = match r.inverse() {
            Some(inv) => inv.transpose(),
            None => {
                return PolarRotation { rotation: Mat3::IDENTITY, converged: false };
            }
        };
        let mut next = [0.0; 9];
        let mut diff = 0.0_f64;

        for n in 0..9 {
            next[n] = 0.5 * (r.0[n] + r_inv_t.0[n]);
            diff = diff.max((next[n] - r.0[n]).abs());
        }
        r = Mat3(next);

        if diff < tol {
            return PolarRotation { rotation: r, converged: true };
        }
    }
    PolarRotation { rotation: Mat3::IDENTITY, converged: false }
}
