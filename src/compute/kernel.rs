//! Matern-5/2 covariance over the 2-D behavior space.

use nalgebra::{DMatrix, DVector};

use crate::schema::Behavior;

const SQRT_5: f64 = 2.236_067_977_499_79;

/// Matern-5/2 covariance between two behaviors with length-scale `rho`.
///
/// Equals 1 at zero distance and decays monotonically towards 0.
pub fn matern52(a: &Behavior, b: &Behavior, rho: f64) -> f64 {
    let d = a.distance(b);
    let r = SQRT_5 * d / rho;
    (1.0 + r + 5.0 * d * d / (3.0 * rho * rho)) * (-r).exp()
}

/// Matern-5/2 kernel with a fixed length-scale.
#[derive(Debug, Clone, Copy)]
pub struct Matern52 {
    pub length_scale: f64,
}

impl Matern52 {
    pub fn new(length_scale: f64) -> Self {
        Self { length_scale }
    }

    #[inline]
    pub fn covariance(&self, a: &Behavior, b: &Behavior) -> f64 {
        matern52(a, b, self.length_scale)
    }

    /// Prior variance at a point.
    #[inline]
    pub fn self_covariance(&self, a: &Behavior) -> f64 {
        self.covariance(a, a)
    }

    /// Gram matrix over `points` with `noise` added on the diagonal.
    pub fn gram(&self, points: &[Behavior], noise: f64) -> DMatrix<f64> {
        let n = points.len();
        DMatrix::from_fn(n, n, |i, j| {
            let k = self.covariance(&points[i], &points[j]);
            if i == j { k + noise } else { k }
        })
    }

    /// Covariances between `x` and every point.
    pub fn cross(&self, x: &Behavior, points: &[Behavior]) -> DVector<f64> {
        DVector::from_iterator(points.len(), points.iter().map(|p| self.covariance(x, p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_self_covariance_is_one() {
        let kernel = Matern52::new(0.1);
        let x = Behavior::new(0.2, -0.3);
        assert_eq!(kernel.self_covariance(&x), 1.0);
    }

    #[test]
    fn test_known_value() {
        // d = rho: (1 + sqrt5 + 5/3) * exp(-sqrt5)
        let a = Behavior::new(0.0, 0.0);
        let b = Behavior::new(0.1, 0.0);
        let expected = (1.0 + 5f64.sqrt() + 5.0 / 3.0) * (-(5f64.sqrt())).exp();
        assert!((matern52(&a, &b, 0.1) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_vanishes_far_away() {
        let a = Behavior::new(0.0, 0.0);
        let b = Behavior::new(10.0, 0.0);
        assert!(matern52(&a, &b, 0.1) < 1e-50);
    }

    #[test]
    fn test_gram_matrix() {
        let kernel = Matern52::new(0.1);
        let points = [
            Behavior::new(0.0, 0.0),
            Behavior::new(0.05, 0.0),
            Behavior::new(0.0, 0.3),
        ];
        let gram = kernel.gram(&points, 0.03);
        assert_eq!(gram.shape(), (3, 3));
        for i in 0..3 {
            assert!((gram[(i, i)] - 1.03).abs() < 1e-12);
            for j in 0..3 {
                assert_eq!(gram[(i, j)], gram[(j, i)]);
            }
        }
        assert!(gram[(0, 1)] > gram[(0, 2)]);

        let cross = kernel.cross(&points[0], &points);
        assert_eq!(cross.len(), 3);
        assert_eq!(cross[0], 1.0);
        assert_eq!(cross[1], gram[(0, 1)]);
    }

    proptest! {
        #[test]
        fn prop_symmetric_and_bounded(
            ax in -1.0f64..1.0, ay in -1.0f64..1.0,
            bx in -1.0f64..1.0, by in -1.0f64..1.0,
            rho in 0.01f64..1.0,
        ) {
            let a = Behavior::new(ax, ay);
            let b = Behavior::new(bx, by);
            let k = matern52(&a, &b, rho);
            prop_assert_eq!(k, matern52(&b, &a, rho));
            prop_assert!(k > 0.0 && k <= 1.0);
        }

        #[test]
        fn prop_decreasing_in_distance(d in 0.0f64..2.0, step in 0.001f64..1.0, rho in 0.01f64..1.0) {
            let origin = Behavior::new(0.0, 0.0);
            let near = matern52(&origin, &Behavior::new(d, 0.0), rho);
            let far = matern52(&origin, &Behavior::new(d + step, 0.0), rho);
            prop_assert!(far <= near);
        }
    }
}
