use serde::{Deserialize, Serialize};
use crate::tensor::Sym3;




#[derive(Clone, Copy, Debug, Serialize, Deserialize)]

/**
 * Linear-elastic material parameters for one element block, together with
 * the artificial viscosity and hourglass control coefficients. Set once at
 * construction and read-only during time stepping.
 */
pub struct Material {
    pub youngs_modulus: f64,
    pub poissons_ratio: f64,
    pub density: f64,
    pub lin_bulk_visc: f64,
    pub quad_bulk_visc: f64,
    pub hg_stiffness: f64,
    pub hg_viscosity: f64,
}




// ============================================================================
impl Material {

    pub fn two_mu(&self) -> f64 {
        self.youngs_modulus / (1.0 + self.poissons_ratio)
    }

    pub fn lame_lambda(&self) -> f64 {
        let nu = self.poissons_ratio;
        self.youngs_modulus * nu / ((1.0 + nu) * (1.0 - 2.0 * nu))
    }

    /**
     * The constrained (P-wave) modulus, lambda + 2 mu.
     */
    pub fn dilatational_modulus(&self) -> f64 {
        self.lame_lambda() + self.two_mu()
    }

    /**
     * The dilatational wave speed, which bounds how fast a disturbance can
     * cross an element.
     */
    pub fn wave_speed(&self) -> f64 {
        (self.dilatational_modulus() / self.density).sqrt()
    }

    /**
     * Integrate the stress rate for one step: hypoelastic update from the
     * unrotated stretch rate `d` over the interval `dt`.
     */
    pub fn stress_increment(&self, d: &Sym3, dt: f64) -> Sym3 {
        let two_mu = self.two_mu();
        let lambda_tr = self.lame_lambda() * d.trace();

        Sym3([
            dt * (two_mu * d.0[0] + lambda_tr),
            dt * (two_mu * d.0[1] + lambda_tr),
            dt * (two_mu * d.0[2] + lambda_tr),
            dt * two_mu * d.0[3],
            dt * two_mu * d.0[4],
            dt * two_mu * d.0[5],
        ])
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            youngs_modulus: 1.0e6,
            poissons_ratio: 0.0,
            density: 8.0e-4,
            lin_bulk_visc: 0.0,
            quad_bulk_visc: 0.0,
            hg_stiffness: 0.0,
            hg_viscosity: 0.0,
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::*;
    use crate::tensor::Sym3;

    #[test]
    fn default_material_has_poisson_free_moduli() {
        let m = Material::default();
        assert_eq!(m.two_mu(), m.youngs_modulus);
        assert_eq!(m.lame_lambda(), 0.0);
        assert_eq!(m.dilatational_modulus(), m.youngs_modulus);
    }

    #[test]
    fn wave_speed_matches_hand_computed_value() {
        let m = Material::default();
        assert!((m.wave_speed() - (1.0e6_f64 / 8.0e-4).sqrt()).abs() < 1.0e-9);
    }

    #[test]
    fn uniaxial_stretch_rate_produces_uniaxial_stress() {
        let m = Material::default();
        let d = Sym3([2.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let ds = m.stress_increment(&d, 1.0e-5);
        assert!((ds.0[0] - 1.0e-5 * 2.0e6).abs() < 1.0e-9);
        assert_eq!(ds.0[1], 0.0);
        assert_eq!(ds.0[3], 0.0);
    }

    #[test]
    fn nonzero_poisson_couples_the_normal_components() {
        let m = Material { poissons_ratio: 0.3, ..Material::default() };
        let d = Sym3([1.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let ds = m.stress_increment(&d, 1.0);
        assert!(ds.0[1] > 0.0);
        assert!((ds.0[1] - m.lame_lambda()).abs() < 1.0e-9);
    }
}
