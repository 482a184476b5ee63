//! Action and observation space descriptors.
//!
//! Descriptors are immutable once built. They describe the legal shape,
//! element type, and numeric range of a single environment's action or
//! observation, never the batch.

use rand::Rng;

use crate::dtype::SpaceDtype;
use crate::error::SpaceError;
use crate::tensor::{numel, Shape};

/// A (possibly unbounded) box in `R^n`.
///
/// # Examples
///
/// ```
/// use tandem_core::space::BoxSpace;
/// use tandem_core::SpaceDtype;
///
/// let obs = BoxSpace::unbounded(&[7], SpaceDtype::Float32);
/// assert_eq!(obs.shape(), &[7]);
/// assert!(!obs.is_bounded());
///
/// let act = BoxSpace::uniform(-1.0, 1.0, &[2], SpaceDtype::Float32).unwrap();
/// assert!(act.contains(&[0.5, -1.0]));
/// assert!(!act.contains(&[1.5, 0.0]));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BoxSpace {
    low: Vec<f64>,
    high: Vec<f64>,
    shape: Shape,
    dtype: SpaceDtype,
}

impl BoxSpace {
    /// Box with per-component bounds. `low` and `high` are flat row-major
    /// vectors with one entry per component of `shape`.
    pub fn new(
        low: Vec<f64>,
        high: Vec<f64>,
        shape: &[usize],
        dtype: SpaceDtype,
    ) -> Result<Self, SpaceError> {
        let expected = numel(shape);
        for bound in [&low, &high] {
            if bound.len() != expected {
                return Err(SpaceError::BoundsLength {
                    expected,
                    actual: bound.len(),
                });
            }
        }
        // NaN fails the comparison and is rejected with the rest.
        for (index, (&l, &h)) in low.iter().zip(&high).enumerate() {
            if !(l <= h) {
                return Err(SpaceError::InvalidBounds { index, low: l, high: h });
            }
        }
        Ok(Self {
            low,
            high,
            shape: Shape::from_slice(shape),
            dtype,
        })
    }

    /// Box with the same bounds on every component.
    pub fn uniform(low: f64, high: f64, shape: &[usize], dtype: SpaceDtype) -> Result<Self, SpaceError> {
        let n = numel(shape);
        Self::new(vec![low; n], vec![high; n], shape, dtype)
    }

    /// Box with every component in `(-inf, +inf)`.
    pub fn unbounded(shape: &[usize], dtype: SpaceDtype) -> Self {
        let n = numel(shape);
        Self {
            low: vec![f64::NEG_INFINITY; n],
            high: vec![f64::INFINITY; n],
            shape: Shape::from_slice(shape),
            dtype,
        }
    }

    /// Per-environment shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Portable element type.
    pub fn dtype(&self) -> SpaceDtype {
        self.dtype
    }

    /// Flat lower bounds.
    pub fn low(&self) -> &[f64] {
        &self.low
    }

    /// Flat upper bounds.
    pub fn high(&self) -> &[f64] {
        &self.high
    }

    /// Number of scalar components.
    pub fn numel(&self) -> usize {
        self.low.len()
    }

    /// Whether every component has finite bounds on both sides.
    pub fn is_bounded(&self) -> bool {
        self.low.iter().chain(&self.high).all(|v| v.is_finite())
    }

    /// Whether a flat value lies inside the box.
    pub fn contains(&self, value: &[f64]) -> bool {
        value.len() == self.numel()
            && value
                .iter()
                .zip(self.low.iter().zip(&self.high))
                .all(|(v, (l, h))| *l <= *v && *v <= *h)
    }

    /// Clamp a flat value into the box in place.
    pub fn clip(&self, value: &mut [f32]) {
        for (v, (l, h)) in value.iter_mut().zip(self.low.iter().zip(&self.high)) {
            *v = (*v as f64).clamp(*l, *h) as f32;
        }
    }

    /// Draw one flat sample.
    ///
    /// Bounded components are uniform over `[low, high]`; components with
    /// an infinite side fall back to a standard normal shifted onto the
    /// finite bound, or centred at zero when both sides are infinite.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<f64> {
        self.low
            .iter()
            .zip(&self.high)
            .map(|(&l, &h)| match (l.is_finite(), h.is_finite()) {
                (true, true) if l == h => l,
                (true, true) => rng.random_range(l..=h),
                (true, false) => l + standard_normal(rng).abs(),
                (false, true) => h - standard_normal(rng).abs(),
                (false, false) => standard_normal(rng),
            })
            .collect()
    }
}

/// A finite set `{0, 1, ..., n-1}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiscreteSpace {
    n: u64,
}

impl DiscreteSpace {
    /// Discrete space with `n` choices. `n` must be non-zero.
    pub fn new(n: u64) -> Result<Self, SpaceError> {
        if n == 0 {
            return Err(SpaceError::EmptyDiscrete);
        }
        Ok(Self { n })
    }

    /// Number of choices.
    pub fn n(&self) -> u64 {
        self.n
    }

    /// Whether `value` is a legal choice.
    pub fn contains(&self, value: i64) -> bool {
        value >= 0 && (value as u64) < self.n
    }

    /// Draw one choice uniformly.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.random_range(0..self.n) as i64
    }
}

/// Any space descriptor a task can declare for its actions.
#[derive(Clone, Debug, PartialEq)]
pub enum Space {
    /// Continuous box.
    Box(BoxSpace),
    /// Finite set of choices.
    Discrete(DiscreteSpace),
}

impl Space {
    /// Per-environment shape (`[]` for discrete spaces).
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Box(b) => b.shape(),
            Self::Discrete(_) => &[],
        }
    }

    /// The box descriptor, if this is a box.
    pub fn as_box(&self) -> Option<&BoxSpace> {
        match self {
            Self::Box(b) => Some(b),
            Self::Discrete(_) => None,
        }
    }
}

impl From<BoxSpace> for Space {
    fn from(b: BoxSpace) -> Self {
        Self::Box(b)
    }
}

impl From<DiscreteSpace> for Space {
    fn from(d: DiscreteSpace) -> Self {
        Self::Discrete(d)
    }
}

/// Box-Muller draw from N(0, 1).
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-300);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn new_rejects_bad_lengths() {
        let err = BoxSpace::new(vec![0.0; 3], vec![1.0; 4], &[4], SpaceDtype::Float32).unwrap_err();
        assert_eq!(err, SpaceError::BoundsLength { expected: 4, actual: 3 });
    }

    #[test]
    fn new_rejects_inverted_and_nan_bounds() {
        let err = BoxSpace::new(vec![0.0, 2.0], vec![1.0, 1.0], &[2], SpaceDtype::Float32)
            .unwrap_err();
        assert!(matches!(err, SpaceError::InvalidBounds { index: 1, .. }));
        assert!(BoxSpace::new(vec![f64::NAN], vec![1.0], &[1], SpaceDtype::Float32).is_err());
    }

    #[test]
    fn unbounded_box_contains_everything_finite() {
        let b = BoxSpace::unbounded(&[2, 2], SpaceDtype::Float64);
        assert_eq!(b.numel(), 4);
        assert!(b.contains(&[1e30, -1e30, 0.0, 5.0]));
        assert!(!b.contains(&[0.0; 3]));
        assert!(b.low().iter().all(|v| *v == f64::NEG_INFINITY));
    }

    #[test]
    fn clip_clamps_into_bounds() {
        let b = BoxSpace::uniform(-1.0, 1.0, &[3], SpaceDtype::Float32).unwrap();
        let mut v = [-3.0f32, 0.25, 9.0];
        b.clip(&mut v);
        assert_eq!(v, [-1.0, 0.25, 1.0]);
    }

    #[test]
    fn discrete_rejects_zero() {
        assert_eq!(DiscreteSpace::new(0), Err(SpaceError::EmptyDiscrete));
        let d = DiscreteSpace::new(3).unwrap();
        assert!(d.contains(2));
        assert!(!d.contains(3));
        assert!(!d.contains(-1));
    }

    #[test]
    fn space_shape_for_discrete_is_scalar() {
        let s: Space = DiscreteSpace::new(5).unwrap().into();
        assert!(s.shape().is_empty());
        assert!(s.as_box().is_none());
    }

    proptest! {
        #[test]
        fn samples_stay_inside_bounded_box(
            seed in any::<u64>(),
            low in -100.0f64..0.0,
            width in 0.0f64..50.0,
        ) {
            let b = BoxSpace::uniform(low, low + width, &[5], SpaceDtype::Float32).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            prop_assert!(b.contains(&b.sample(&mut rng)));
        }

        #[test]
        fn half_bounded_samples_respect_finite_side(seed in any::<u64>()) {
            let b = BoxSpace::new(
                vec![0.0, f64::NEG_INFINITY],
                vec![f64::INFINITY, 0.0],
                &[2],
                SpaceDtype::Float64,
            ).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let s = b.sample(&mut rng);
            prop_assert!(s[0] >= 0.0);
            prop_assert!(s[1] <= 0.0);
        }

        #[test]
        fn discrete_samples_are_legal(seed in any::<u64>(), n in 1u64..1000) {
            let d = DiscreteSpace::new(n).unwrap();
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            prop_assert!(d.contains(d.sample(&mut rng)));
        }
    }
}
