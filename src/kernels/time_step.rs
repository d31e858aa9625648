use rayon::prelude::*;
use crate::error::Error;
use crate::region::{Region, StateIndices};




/**
 * Parallel reduction of the per-element stable time-step bounds computed by
 * the divergence kernel. Minimum is exact in floating point, so the result
 * does not depend on traversal order or worker count. The combiner
 * propagates NaN rather than using `f64::min`, which would silently drop
 * it; a poisoned bound must surface as a stability failure.
 */
pub fn minimum_stable_time_step(region: &Region) -> Result<f64, Error> {
    fn combine(a: f64, b: f64) -> f64 {
        if a.is_nan() {
            a
        } else if b.is_nan() {
            b
        } else {
            a.min(b)
        }
    }
    let bound = region
        .elem_dt
        .par_iter()
        .copied()
        .reduce(|| f64::INFINITY, combine);

    if !bound.is_finite() || bound <= 0.0 {
        return Err(Error::UnstableTimeStep(bound));
    }
    Ok(bound)
}




/**
 * Post-process of the reduction: broadcast the step size for the coming
 * integrator pass into the next state slot, capped by the user's ceiling.
 */
pub fn set_next_time_step(region: &mut Region, bound: f64, user_dt: f64, state: &StateIndices) {
    region.time_step[state.next] = user_dt.min(bound);
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::super::fixtures::initialized_region;
    use super::*;
    use crate::error::Error;
    use crate::region::StateIndices;

    #[test]
    fn reduction_is_traversal_order_independent() {
        let mut region = initialized_region(4, 2, 1);
        region.elem_dt = vec![3.0e-5, 1.25e-5, 9.0e-5, 2.0e-5, 8.5e-5, 1.5e-5, 4.0e-5, 7.0e-5];

        let forward = minimum_stable_time_step(&region).unwrap();
        region.elem_dt.reverse();
        let backward = minimum_stable_time_step(&region).unwrap();

        assert_eq!(forward, backward);
        assert_eq!(forward, 1.25e-5);
    }

    #[test]
    fn non_finite_bound_is_fatal() {
        let mut region = initialized_region(2, 1, 1);
        region.elem_dt = vec![1.0e-5, f64::NAN];
        assert!(matches!(minimum_stable_time_step(&region), Err(Error::UnstableTimeStep(_))));

        region.elem_dt = vec![1.0e-5, f64::INFINITY];
        assert!(matches!(minimum_stable_time_step(&region), Err(Error::UnstableTimeStep(_))));
    }

    #[test]
    fn non_positive_bound_is_fatal() {
        let mut region = initialized_region(2, 1, 1);
        region.elem_dt = vec![1.0e-5, 0.0];
        assert!(matches!(minimum_stable_time_step(&region), Err(Error::UnstableTimeStep(_))));
    }

    #[test]
    fn broadcast_takes_the_smaller_of_bound_and_user_dt() {
        let mut region = initialized_region(2, 1, 1);
        let mut state = StateIndices::new();
        state.rotate();

        set_next_time_step(&mut region, 3.0e-5, 1.0e-5, &state);
        assert_eq!(region.time_step[state.next], 1.0e-5);

        set_next_time_step(&mut region, 4.0e-6, 1.0e-5, &state);
        assert_eq!(region.time_step[state.next], 4.0e-6);
    }
}
