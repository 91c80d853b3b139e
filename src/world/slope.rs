/// Gradient magnitude of a height function by central finite differences.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlopeEstimator {
    offset: f64,
}

impl SlopeEstimator {
    pub fn new(offset: f64) -> Self {
        SlopeEstimator { offset }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Four height evaluations. Always `>= 0`, and `0` when the samples are not finite.
    pub fn slope<F>(&self, height: F, x: f64, z: f64) -> f64
    where
        F: Fn(f64, f64) -> f64,
    {
        let h = self.offset;
        let dx = (height(x + h, z) - height(x - h, z)) / (2.0 * h);
        let dz = (height(x, z + h) - height(x, z - h)) / (2.0 * h);
        gradient_magnitude(dx, dz)
    }
}

pub(crate) fn gradient_magnitude(dx: f64, dz: f64) -> f64 {
    let magnitude = (dx * dx + dz * dz).sqrt();
    if magnitude.is_finite() { magnitude } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_gradient() {
        let estimator = SlopeEstimator::new(2.0);
        let slope = estimator.slope(|x, z| 3.0 * x + 4.0 * z, 10.0, -7.0);
        assert!((slope - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_is_zero() {
        let estimator = SlopeEstimator::new(0.5);
        assert_eq!(estimator.slope(|_, _| 12.0, 1.0, 2.0), 0.0);
    }

    #[test]
    fn test_non_finite_is_zero() {
        let estimator = SlopeEstimator::new(1.0);
        assert_eq!(estimator.slope(|x, _| if x > 0.0 { f64::NAN } else { 0.0 }, 0.0, 0.0), 0.0);
    }
}
