use crate::util::BoundedAngle;
use std::fmt;
use std::marker::PhantomData;
use uom::si::angle::degree;
use uom::si::f64::Angle;
use uom::ConstZero;

#[cfg(any(test, feature = "approx"))]
use approx::AbsDiffEq;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The vehicle's roll, pitch, and heading at the instant an image was captured.
///
/// - Heading is measured clockwise from true north, like a compass bearing.
/// - Pitch is positive nose-up. For the downward-looking camera, pitching tilts every ray away
///   from nadir by the pitch angle.
/// - Roll is positive right-wing-down.
///
/// All three are stored normalized to [0°, 360°), so -10° and 350° are the same attitude.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Attitude {
    roll: BoundedAngle,
    pitch: BoundedAngle,
    heading: BoundedAngle,
}

impl Attitude {
    /// Constructs an attitude from its three angles.
    #[must_use]
    pub fn build(
        Components {
            roll,
            pitch,
            heading,
        }: Components,
    ) -> Self {
        Self::builder()
            .roll(roll)
            .pitch(pitch)
            .heading(heading)
            .build()
    }

    /// Provides a constructor for an [`Attitude`].
    pub fn builder() -> Builder<MissingRoll, MissingPitch, MissingHeading> {
        Builder {
            under_construction: Self::level(Angle::ZERO),
            has: (PhantomData, PhantomData, PhantomData),
        }
    }

    /// Shorthand for [`Attitude::build`] with all angles in degrees.
    #[must_use]
    pub fn from_degrees(roll: f64, pitch: f64, heading: f64) -> Self {
        Self::build(Components {
            roll: Angle::new::<degree>(roll),
            pitch: Angle::new::<degree>(pitch),
            heading: Angle::new::<degree>(heading),
        })
    }

    /// Level flight (no roll or pitch) along the given heading.
    #[must_use]
    pub fn level(heading: impl Into<Angle>) -> Self {
        Self {
            roll: BoundedAngle::new(Angle::ZERO),
            pitch: BoundedAngle::new(Angle::ZERO),
            heading: BoundedAngle::new(heading),
        }
    }

    /// Roll in [0°, 360°).
    #[must_use]
    pub fn roll(&self) -> Angle {
        self.roll.to_angle()
    }

    /// Pitch in [0°, 360°).
    #[must_use]
    pub fn pitch(&self) -> Angle {
        self.pitch.to_angle()
    }

    /// Heading in [0°, 360°).
    #[must_use]
    pub fn heading(&self) -> Angle {
        self.heading.to_angle()
    }

    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.roll.is_finite() && self.pitch.is_finite() && self.heading.is_finite()
    }

    pub(crate) fn roll_radians(&self) -> f64 {
        self.roll.to_signed_range()
    }

    // a slightly nose-down pitch is stored as ~2π; composition wants the small negative angle
    pub(crate) fn pitch_radians(&self) -> f64 {
        self.pitch.to_signed_range()
    }

    pub(crate) fn heading_radians(&self) -> f64 {
        self.heading.get_bounded()
    }
}

impl Default for Attitude {
    fn default() -> Self {
        Self::level(Angle::ZERO)
    }
}

impl fmt::Display for Attitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "roll {}°, pitch {}°, heading {}°",
            self.roll_radians().to_degrees(),
            self.pitch_radians().to_degrees(),
            self.heading_radians().to_degrees(),
        )
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Attitude {
    // radians
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        BoundedAngle::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.roll.abs_diff_eq(&other.roll, epsilon)
            && self.pitch.abs_diff_eq(&other.pitch, epsilon)
            && self.heading.abs_diff_eq(&other.heading, epsilon)
    }
}

/// Argument type for [`Attitude::build`].
#[derive(Debug, Default)]
#[must_use]
pub struct Components {
    /// Positive right-wing-down.
    pub roll: Angle,
    /// Positive nose-up.
    pub pitch: Angle,
    /// Clockwise from true north.
    pub heading: Angle,
}

/// Used to indicate that a partially-constructed [`Attitude`] is missing its roll.
pub struct MissingRoll;
/// Used to indicate that a partially-constructed [`Attitude`] has its roll set.
pub struct HasRoll;
/// Used to indicate that a partially-constructed [`Attitude`] is missing its pitch.
pub struct MissingPitch;
/// Used to indicate that a partially-constructed [`Attitude`] has its pitch set.
pub struct HasPitch;
/// Used to indicate that a partially-constructed [`Attitude`] is missing its heading.
pub struct MissingHeading;
/// Used to indicate that a partially-constructed [`Attitude`] has its heading set.
pub struct HasHeading;

/// [Builder] for an [`Attitude`].
///
/// Requiring all three angles by name avoids mixing up the order of roll, pitch, and heading,
/// which telemetry sources do not agree on.
///
/// [Builder]: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
#[derive(Debug)]
#[must_use]
pub struct Builder<Roll, Pitch, Heading> {
    under_construction: Attitude,
    has: (PhantomData<Roll>, PhantomData<Pitch>, PhantomData<Heading>),
}

// manual impls of Clone and Copy to avoid requiring the markers to be Copy + Clone
impl<R, P, H> Clone for Builder<R, P, H> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<R, P, H> Copy for Builder<R, P, H> {}

impl<R, P, H> Builder<R, P, H> {
    /// Sets the roll, positive right-wing-down.
    pub fn roll(mut self, roll: impl Into<Angle>) -> Builder<HasRoll, P, H> {
        self.under_construction.roll = BoundedAngle::new(roll);
        Builder {
            under_construction: self.under_construction,
            has: (PhantomData::<HasRoll>, self.has.1, self.has.2),
        }
    }

    /// Sets the pitch, positive nose-up.
    pub fn pitch(mut self, pitch: impl Into<Angle>) -> Builder<R, HasPitch, H> {
        self.under_construction.pitch = BoundedAngle::new(pitch);
        Builder {
            under_construction: self.under_construction,
            has: (self.has.0, PhantomData::<HasPitch>, self.has.2),
        }
    }

    /// Sets the heading, clockwise from true north.
    pub fn heading(mut self, heading: impl Into<Angle>) -> Builder<R, P, HasHeading> {
        self.under_construction.heading = BoundedAngle::new(heading);
        Builder {
            under_construction: self.under_construction,
            has: (self.has.0, self.has.1, PhantomData::<HasHeading>),
        }
    }
}

impl Builder<HasRoll, HasPitch, HasHeading> {
    #[must_use]
    pub fn build(self) -> Attitude {
        self.under_construction
    }
}
