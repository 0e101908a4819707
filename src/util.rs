use std::f64::consts::{PI, TAU};
use uom::si::angle::radian;
use uom::si::f64::Angle;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An angle kept in [0°, 360°).
///
/// Attitude angles and geodetic coordinates arrive from telemetry with arbitrary wraparound (eg,
/// a heading of -10° or 370°). This normalizes them once, on construction.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub(crate) struct BoundedAngle {
    radians: f64,
}

impl BoundedAngle {
    pub(crate) fn new(angle: impl Into<Angle>) -> Self {
        Self::from_radians(angle.into().get::<radian>())
    }

    pub(crate) fn from_radians(radians: f64) -> Self {
        Self {
            radians: Self::into_bounds(radians),
        }
    }

    /// Returns the angle in [0°, 360°) in radians.
    pub(crate) fn get_bounded(self) -> f64 {
        self.radians
    }

    /// Returns the angle in [-180°, 180°) in radians.
    pub(crate) fn to_signed_range(self) -> f64 {
        if self.radians < PI {
            self.radians
        } else {
            self.radians - TAU
        }
    }

    pub(crate) fn to_angle(self) -> Angle {
        Angle::new::<radian>(self.radians)
    }

    pub(crate) fn is_finite(self) -> bool {
        self.radians.is_finite()
    }

    fn into_bounds(radians: f64) -> f64 {
        let bounded = radians.rem_euclid(TAU);
        // rem_euclid can round up to exactly TAU for tiny negative inputs
        if bounded >= TAU {
            0.
        } else {
            bounded
        }
    }
}

impl<U: Into<Angle>> From<U> for BoundedAngle {
    fn from(value: U) -> Self {
        BoundedAngle::new(value)
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for BoundedAngle {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        // radians
        0.000_000_001
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        Self::from_radians(self.radians - other.radians)
            .to_signed_range()
            .abs()
            <= epsilon
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for BoundedAngle {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        let min = f64::min(self.radians, other.radians);
        let max = f64::max(self.radians, other.radians);

        // 359.9999° and 0° are neighbours
        f64::relative_eq(&min, &max, epsilon, max_relative)
            || f64::relative_eq(&(min + TAU), &max, epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use crate::util::BoundedAngle;
    use approx::{assert_abs_diff_eq, assert_abs_diff_ne, assert_relative_eq};
    use rstest::rstest;
    use uom::si::angle::{degree, radian};
    use uom::si::f64::Angle;

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }

    #[rstest]
    #[case(d(0.), 0.)]
    #[case(d(45.), 45.)]
    #[case(d(-10.), 350.)]
    #[case(d(-390.), 330.)]
    #[case(d(370.), 10.)]
    #[case(d(720.), 0.)]
    fn heading_like_angles_wrap_into_a_full_turn(#[case] input: Angle, #[case] expected: f64) {
        let bounded = BoundedAngle::new(input);
        assert!((0. ..std::f64::consts::TAU).contains(&bounded.get_bounded()));
        assert_abs_diff_eq!(
            bounded.get_bounded(),
            expected.to_radians(),
            epsilon = 1e-12
        );
    }

    #[rstest]
    #[case(d(0.), 0.)]
    #[case(d(180.), -180.)]
    #[case(d(359.), -1.)]
    #[case(d(90.), 90.)]
    #[case(d(270.), -90.)]
    #[case(d(-10.), -10.)]
    #[case(d(360.+120.), 120.)]
    fn signed_range(#[case] input: Angle, #[case] expected_in_degrees: f64) {
        assert_relative_eq!(
            BoundedAngle::new(input).to_signed_range(),
            expected_in_degrees.to_radians(),
            epsilon = f64::EPSILON * 1000.
        );
    }

    #[test]
    fn tiny_negative_angles_do_not_produce_a_full_turn() {
        let bounded = BoundedAngle::from_radians(-1e-300);
        assert!(bounded.get_bounded() < std::f64::consts::TAU);
    }

    #[test]
    fn non_finite_angles_are_detected() {
        assert!(!BoundedAngle::from_radians(f64::NAN).is_finite());
        assert!(!BoundedAngle::from_radians(f64::INFINITY).is_finite());
        assert!(BoundedAngle::new(d(12.)).is_finite());
    }

    #[test]
    fn round_trips_through_uom() {
        let bounded = BoundedAngle::new(d(-90.));
        assert_relative_eq!(bounded.to_angle().get::<radian>(), 1.5 * std::f64::consts::PI);
    }

    #[rstest]
    #[case(0., 1e-12, true)]
    #[case(360. - 1e-10, 0., true)]
    #[case(10., 2., false)]
    #[case(10., 10. + 360., true)]
    fn comparison_across_wraparound(#[case] a: f64, #[case] b: f64, #[case] expected: bool) {
        let a = BoundedAngle::new(d(a));
        let b = BoundedAngle::new(d(b));
        if expected {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        } else {
            assert_abs_diff_ne!(a, b, epsilon = 1e-9);
        }
    }
}
