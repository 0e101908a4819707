use crate::util::BoundedAngle;
use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::fmt::Display;
use std::marker::PhantomData;
use uom::si::f64::{Angle, Length};
use uom::si::{
    angle::{degree, radian},
    length::meter,
};
use uom::ConstZero;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Equatorial radius of the WGS84 ellipsoid.
// https://nsgreg.nga.mil/doc/view?i=4085 table 3.1
#[doc(alias = "a")]
pub(crate) const SEMI_MAJOR_AXIS: f64 = 6_378_137.0;

/// A point on (or above) the Earth given by latitude, longitude, and altitude.
///
/// The altitude datum is up to the caller: it may be relative to the take-off point or absolute,
/// as long as it is used consistently. For the sensor position of a
/// [`GeoFrame`](crate::GeoFrame) it is the height above the (flat) ground.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeoCoordinate {
    latitude: Angle,
    longitude: Angle,
    altitude: Length,
}

impl GeoCoordinate {
    /// Constructs a coordinate from latitude, longitude, and altitude.
    ///
    /// The latitude must be in [-90°,90°] % 360°. If it is not, this function returns `None`.
    #[must_use]
    pub fn build(
        Components {
            latitude,
            longitude,
            altitude,
        }: Components,
    ) -> Option<Self> {
        Some(
            Self::builder()
                .latitude(latitude)?
                .longitude(longitude)
                .altitude(altitude)
                .build(),
        )
    }

    /// Provides a constructor for a [`GeoCoordinate`].
    pub fn builder() -> Builder<MissingLatitude, MissingLongitude, MissingAltitude> {
        Builder {
            under_construction: GeoCoordinate {
                latitude: Angle::ZERO,
                longitude: Angle::ZERO,
                altitude: Length::ZERO,
            },
            has: (PhantomData, PhantomData, PhantomData),
        }
    }

    /// Shorthand for [`GeoCoordinate::build`] with latitude and longitude in degrees and the
    /// altitude in meters.
    #[must_use]
    pub fn from_degrees(latitude: f64, longitude: f64, altitude: f64) -> Option<Self> {
        Self::build(Components {
            latitude: Angle::new::<degree>(latitude),
            longitude: Angle::new::<degree>(longitude),
            altitude: Length::new::<meter>(altitude),
        })
    }

    /// Returns the latitude ("northing"), always in [-90°, 90°].
    #[must_use]
    pub fn latitude(&self) -> Angle {
        Angle::new::<radian>(BoundedAngle::new(self.latitude).to_signed_range())
    }

    /// Returns the longitude ("easting"), always in [-180°, 180°).
    #[must_use]
    pub fn longitude(&self) -> Angle {
        Angle::new::<radian>(BoundedAngle::new(self.longitude).to_signed_range())
    }

    #[must_use]
    pub fn altitude(&self) -> Length {
        self.altitude
    }

    /// Returns the same horizontal position at a different altitude.
    #[must_use]
    pub fn with_altitude(mut self, altitude: impl Into<Length>) -> Self {
        self.altitude = altitude.into();
        self
    }

    /// `true` if none of the components is NaN or infinite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.latitude.get::<radian>().is_finite()
            && self.longitude.get::<radian>().is_finite()
            && self.altitude.get::<meter>().is_finite()
    }

    /// Computes the [great-circle distance] between the two locations on a sphere with the
    /// equatorial radius of the Earth, ignoring altitude.
    ///
    /// [great-circle distance]: https://en.wikipedia.org/wiki/Great-circle_distance
    #[doc(alias = "great_circle_distance")]
    #[must_use]
    pub fn haversine_distance_on_surface(&self, other: &GeoCoordinate) -> Length {
        Length::new::<meter>(central_angle(self, other) * SEMI_MAJOR_AXIS)
    }

    /// Skips the latitude check; for computed coordinates whose latitude is already in range.
    pub(crate) fn from_parts_unchecked(latitude: Angle, longitude: Angle, altitude: Length) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    pub(crate) fn latitude_radians(&self) -> f64 {
        BoundedAngle::new(self.latitude).to_signed_range()
    }

    pub(crate) fn longitude_radians(&self) -> f64 {
        BoundedAngle::new(self.longitude).to_signed_range()
    }

    pub(crate) fn altitude_meters(&self) -> f64 {
        self.altitude.get::<meter>()
    }
}

impl Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat = self.latitude_radians().to_degrees();
        let lon = self.longitude_radians().to_degrees();
        let alt = self.altitude_meters();
        let ns = if lat.is_sign_negative() { 'S' } else { 'N' };
        let ew = if lon.is_sign_negative() { 'W' } else { 'E' };
        match f.precision() {
            Some(p) => write!(
                f,
                "{:.p$}°{ns}, {:.p$}°{ew}, {alt:.p$}m",
                lat.abs(),
                lon.abs()
            ),
            None => write!(f, "{}°{ns}, {}°{ew}, {alt}m", lat.abs(), lon.abs()),
        }
    }
}

/// Computes the central angle (in radians) between two coordinates using the [archaversine].
///
/// [archaversine]: https://en.wikipedia.org/wiki/Haversine_formula#Formulation
pub(crate) fn central_angle(a: &GeoCoordinate, b: &GeoCoordinate) -> f64 {
    let lat_a = a.latitude_radians(); // φ1
    let lat_b = b.latitude_radians(); // φ2
    let delta_lat = lat_b - lat_a;
    let delta_lon = b.longitude_radians() - a.longitude_radians();

    // sin² rather than 1 - cos, which cancels catastrophically over a few meters
    let haversine = (delta_lat / 2.).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.).sin().powi(2);
    // can exceed 1 by an ulp for antipodal points
    2. * haversine.clamp(0., 1.).sqrt().asin()
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for GeoCoordinate {
    type Epsilon = Length;

    fn default_epsilon() -> Self::Epsilon {
        // projections are only meaningful to about a millimeter anyway
        Length::new::<meter>(0.001)
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.haversine_distance_on_surface(other) <= epsilon
            && self
                .altitude_meters()
                .abs_diff_eq(&other.altitude_meters(), epsilon.get::<meter>())
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for GeoCoordinate {
    fn default_max_relative() -> Self::Epsilon {
        Length::new::<meter>(f64::default_max_relative())
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.haversine_distance_on_surface(other)
            .get::<meter>()
            .abs_diff_eq(&0., epsilon.get::<meter>())
            && self.altitude_meters().relative_eq(
                &other.altitude_meters(),
                epsilon.get::<meter>(),
                max_relative.get::<meter>(),
            )
    }
}

/// Argument type for [`GeoCoordinate::build`].
#[derive(Debug, Default)]
#[must_use]
pub struct Components {
    /// The latitude must be in [-90°,90°] % 360°.
    pub latitude: Angle,
    pub longitude: Angle,
    pub altitude: Length,
}

/// Used to indicate that a partially-constructed [`GeoCoordinate`] is missing the latitude.
pub struct MissingLatitude;
/// Used to indicate that a partially-constructed [`GeoCoordinate`] has the latitude set.
pub struct HasLatitude;
/// Used to indicate that a partially-constructed [`GeoCoordinate`] is missing the longitude.
pub struct MissingLongitude;
/// Used to indicate that a partially-constructed [`GeoCoordinate`] has the longitude set.
pub struct HasLongitude;
/// Used to indicate that a partially-constructed [`GeoCoordinate`] is missing the altitude.
pub struct MissingAltitude;
/// Used to indicate that a partially-constructed [`GeoCoordinate`] has the altitude set.
pub struct HasAltitude;

/// [Builder] for a [`GeoCoordinate`].
///
/// Construct one through [`GeoCoordinate::builder`], and finalize with [`Builder::build`].
///
/// [Builder]: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
#[derive(Debug)]
#[must_use]
pub struct Builder<Latitude, Longitude, Altitude> {
    under_construction: GeoCoordinate,
    has: (
        PhantomData<Latitude>,
        PhantomData<Longitude>,
        PhantomData<Altitude>,
    ),
}

// manual impls of Clone and Copy to avoid requiring the markers to be Copy + Clone
impl<L1, L2, A> Clone for Builder<L1, L2, A> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<L1, L2, A> Copy for Builder<L1, L2, A> {}

impl<L1, L2, A> Builder<L1, L2, A> {
    /// Sets the latitude of the [`GeoCoordinate`]-to-be.
    ///
    /// The latitude must be in [-90°,90°] % 360°. If it is not, this function returns `None`.
    pub fn latitude(mut self, latitude: impl Into<Angle>) -> Option<Builder<HasLatitude, L2, A>> {
        let latitude = latitude.into();
        let signed = BoundedAngle::new(latitude).to_signed_range();
        if !(-FRAC_PI_2..=FRAC_PI_2).contains(&signed) {
            return None;
        }
        self.under_construction.latitude = latitude;
        Some(Builder {
            under_construction: self.under_construction,
            has: (PhantomData::<HasLatitude>, self.has.1, self.has.2),
        })
    }

    /// Sets the longitude of the [`GeoCoordinate`]-to-be.
    pub fn longitude(mut self, longitude: impl Into<Angle>) -> Builder<L1, HasLongitude, A> {
        self.under_construction.longitude = longitude.into();
        Builder {
            under_construction: self.under_construction,
            has: (self.has.0, PhantomData::<HasLongitude>, self.has.2),
        }
    }

    /// Sets the altitude of the [`GeoCoordinate`]-to-be.
    pub fn altitude(mut self, altitude: impl Into<Length>) -> Builder<L1, L2, HasAltitude> {
        self.under_construction.altitude = altitude.into();
        Builder {
            under_construction: self.under_construction,
            has: (self.has.0, self.has.1, PhantomData::<HasAltitude>),
        }
    }
}

impl Builder<HasLatitude, HasLongitude, HasAltitude> {
    #[must_use]
    pub fn build(self) -> GeoCoordinate {
        self.under_construction
    }
}
