use std::error;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]

/**
 * Error to represent an invalid mesh configuration or a numerical stability
 * failure detected by one of the kernels. Any of these invalidates the whole
 * run; there is no per-element recovery.
 */
pub enum Error {
    InvalidExtents(usize, usize, usize),
    DegenerateElement(usize, f64),
    UnstableTimeStep(f64),
    ZeroNodalMass(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        use Error::*;

        match self {
            InvalidExtents(ex, ey, ez) => {
                writeln!(fmt, "mesh extents must all be positive: ({} {} {})", ex, ey, ez)
            }
            DegenerateElement(elem, vol) => {
                writeln!(fmt, "element {} has non-positive volume: {}", elem, vol)
            }
            UnstableTimeStep(dt) => {
                writeln!(fmt, "stable time step is not finite and positive: {}", dt)
            }
            ZeroNodalMass(node) => {
                writeln!(fmt, "node {} has zero mass", node)
            }
        }
    }
}

impl error::Error for Error {}
