//! Distance, bearing, and destination-point computations between geographic coordinates.
//!
//! A [`GeoFrame`](crate::GeoFrame) only ever needs three things from the shape of the Earth, and
//! they are captured by the [`Geodesy`] trait. Which model is appropriate depends on the scale you
//! operate at; for the few hundred meters a camera at low altitude can see, all of them agree to
//! well under a centimeter.
//!
//! - [`GreatCircle`] treats the Earth as a sphere. This is the default.
//! - [`FlatEarth`] offsets latitude and longitude linearly (an [equirectangular] approximation),
//!   scaling longitude by `1/cos(latitude)`.
//! - [`LocalTangentPlane`] works on the WGS84 ellipsoid by going through Earth-centered,
//!   Earth-fixed (ECEF) coordinates and the north-east-down plane tangent to the origin, which is
//!   exactly the flat ground the projection model assumes.
//!
//! [equirectangular]: https://en.wikipedia.org/wiki/Equirectangular_projection

use crate::coordinate::{central_angle, GeoCoordinate, SEMI_MAJOR_AXIS};
use crate::util::BoundedAngle;
use nalgebra::{Matrix3, Rotation3, Vector3};
use std::f64::consts::FRAC_PI_2;
use uom::si::f64::{Angle, Length};
use uom::si::{angle::radian, length::meter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[doc(alias = "1/f")]
const FLATTENING_FACTOR: f64 = 298.257_223_563;
#[doc(alias = "f")]
const FLATTENING: f64 = 1.0 / FLATTENING_FACTOR;
// b = a * (1 - f)
#[doc(alias = "b")]
const SEMI_MINOR_AXIS: f64 = SEMI_MAJOR_AXIS * (1.0 - FLATTENING);
// e^2 = 2f - f^2
#[doc(alias = "e^2")]
const ECCENTRICITY_SQ: f64 = 2.0 * FLATTENING - FLATTENING * FLATTENING;

/// Mean Earth radius used by [`FlatEarth`].
pub const MEAN_EARTH_RADIUS: f64 = 6_371_000.0;

/// The geodesy operations a [`GeoFrame`](crate::GeoFrame) relies on.
///
/// Implementations are expected to be pure and cheap; they are called once per projection.
pub trait Geodesy {
    /// Horizontal distance from `from` to `to`.
    fn distance(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> Length;

    /// Initial bearing from `from` towards `to`, clockwise from true north, in [0°, 360°).
    fn bearing(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> Angle;

    /// The coordinate reached by travelling `distance` from `origin` with initial `bearing`.
    ///
    /// The returned coordinate keeps the altitude of `origin`.
    fn destination(&self, origin: &GeoCoordinate, distance: Length, bearing: Angle)
        -> GeoCoordinate;
}

impl<G: Geodesy + ?Sized> Geodesy for &G {
    fn distance(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> Length {
        (**self).distance(from, to)
    }

    fn bearing(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> Angle {
        (**self).bearing(from, to)
    }

    fn destination(
        &self,
        origin: &GeoCoordinate,
        distance: Length,
        bearing: Angle,
    ) -> GeoCoordinate {
        (**self).destination(origin, distance, bearing)
    }
}

/// Assembles a coordinate from raw radians.
///
/// Rounding can push a computed latitude a hair past a pole, so it is clamped. A NaN latitude is
/// passed through for the frame to reject.
fn from_radians(latitude: f64, longitude: f64, altitude: Length) -> GeoCoordinate {
    GeoCoordinate::from_parts_unchecked(
        Angle::new::<radian>(latitude.clamp(-FRAC_PI_2, FRAC_PI_2)),
        Angle::new::<radian>(longitude),
        altitude,
    )
}

/// Spherical Earth with [great-circle] navigation.
///
/// [great-circle]: https://www.movable-type.co.uk/scripts/latlong.html
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GreatCircle {
    radius: Length,
}

impl GreatCircle {
    #[must_use]
    pub fn with_radius(radius: impl Into<Length>) -> Self {
        Self {
            radius: radius.into(),
        }
    }

    #[must_use]
    pub fn radius(&self) -> Length {
        self.radius
    }
}

impl Default for GreatCircle {
    /// A sphere with the WGS84 equatorial radius, matching
    /// [`GeoCoordinate::haversine_distance_on_surface`].
    fn default() -> Self {
        Self::with_radius(Length::new::<meter>(SEMI_MAJOR_AXIS))
    }
}

impl Geodesy for GreatCircle {
    fn distance(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> Length {
        Length::new::<meter>(central_angle(from, to) * self.radius.get::<meter>())
    }

    fn bearing(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> Angle {
        let phi1 = from.latitude_radians();
        let phi2 = to.latitude_radians();
        let delta_lambda = to.longitude_radians() - from.longitude_radians();

        let y = delta_lambda.sin() * phi2.cos();
        let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * delta_lambda.cos();
        BoundedAngle::from_radians(y.atan2(x)).to_angle()
    }

    fn destination(
        &self,
        origin: &GeoCoordinate,
        distance: Length,
        bearing: Angle,
    ) -> GeoCoordinate {
        let phi1 = origin.latitude_radians();
        let lambda1 = origin.longitude_radians();
        let theta = bearing.get::<radian>();
        // angular distance
        let delta = distance.get::<meter>() / self.radius.get::<meter>();

        let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos();
        let phi2 = sin_phi2.clamp(-1., 1.).asin();
        let lambda2 = lambda1
            + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * sin_phi2);

        from_radians(phi2, lambda2, origin.altitude())
    }
}

/// Equirectangular offsets on a sphere.
///
/// Northward displacement changes latitude by `distance / radius`; eastward displacement changes
/// longitude by `distance / (radius * cos(latitude))`. Accurate for short distances away from the
/// poles, and increasingly wrong as either grows.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FlatEarth {
    radius: Length,
}

impl FlatEarth {
    #[must_use]
    pub fn with_radius(radius: impl Into<Length>) -> Self {
        Self {
            radius: radius.into(),
        }
    }

    /// North and east displacement (in meters) from `from` to `to`.
    fn offsets(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> (f64, f64) {
        let r = self.radius.get::<meter>();
        let north = (to.latitude_radians() - from.latitude_radians()) * r;
        let delta_lon =
            BoundedAngle::from_radians(to.longitude_radians() - from.longitude_radians())
                .to_signed_range();
        let east = delta_lon * r * from.latitude_radians().cos();
        (north, east)
    }
}

impl Default for FlatEarth {
    fn default() -> Self {
        Self::with_radius(Length::new::<meter>(MEAN_EARTH_RADIUS))
    }
}

impl Geodesy for FlatEarth {
    fn distance(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> Length {
        let (north, east) = self.offsets(from, to);
        Length::new::<meter>(north.hypot(east))
    }

    fn bearing(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> Angle {
        let (north, east) = self.offsets(from, to);
        BoundedAngle::from_radians(east.atan2(north)).to_angle()
    }

    fn destination(
        &self,
        origin: &GeoCoordinate,
        distance: Length,
        bearing: Angle,
    ) -> GeoCoordinate {
        let r = self.radius.get::<meter>();
        let d = distance.get::<meter>();
        let theta = bearing.get::<radian>();
        let lat = origin.latitude_radians();

        let north = d * theta.cos();
        let east = d * theta.sin();
        let scale = lat.cos();
        if scale.abs() < f64::EPSILON {
            // longitude is meaningless at the pole; the caller sees a non-finite coordinate
            return from_radians(f64::NAN, f64::NAN, origin.altitude());
        }
        from_radians(
            lat + north / r,
            origin.longitude_radians() + east / (r * scale),
            origin.altitude(),
        )
    }
}

/// WGS84 ellipsoid, measured in the north-east plane tangent to the origin.
///
/// Distances and bearings are the horizontal components of the vector from the origin to the
/// target expressed in the origin's north-east-down frame, with the target lifted to the origin's
/// altitude first so that a height difference does not leak into the horizontal distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocalTangentPlane;

impl LocalTangentPlane {
    /// North and east displacement (in meters) from `from` to `to`.
    fn offsets(from: &GeoCoordinate, to: &GeoCoordinate) -> (f64, f64) {
        let lifted = to.with_altitude(from.altitude());
        let delta = to_ecef(&lifted) - to_ecef(from);
        let ned = ecef_to_ned(from.latitude_radians(), from.longitude_radians()) * delta;
        (ned.x, ned.y)
    }
}

impl Geodesy for LocalTangentPlane {
    fn distance(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> Length {
        let (north, east) = Self::offsets(from, to);
        Length::new::<meter>(north.hypot(east))
    }

    fn bearing(&self, from: &GeoCoordinate, to: &GeoCoordinate) -> Angle {
        let (north, east) = Self::offsets(from, to);
        BoundedAngle::from_radians(east.atan2(north)).to_angle()
    }

    fn destination(
        &self,
        origin: &GeoCoordinate,
        distance: Length,
        bearing: Angle,
    ) -> GeoCoordinate {
        let d = distance.get::<meter>();
        let theta = bearing.get::<radian>();
        let ned = Vector3::new(d * theta.cos(), d * theta.sin(), 0.);

        let ned_to_ecef =
            ecef_to_ned(origin.latitude_radians(), origin.longitude_radians()).inverse();
        let target = from_ecef(&(to_ecef(origin) + ned_to_ecef * ned));
        // the tangent plane rises above the ellipsoid with distance; report the target at the
        // origin's altitude like the other models do
        target.with_altitude(origin.altitude())
    }
}

/// Converts a coordinate (altitude above the ellipsoid) to Earth-centered, Earth-fixed meters.
///
/// See:
/// <https://en.wikipedia.org/wiki/Geographic_coordinate_conversion#From_geodetic_to_ECEF_coordinates>
pub(crate) fn to_ecef(position: &GeoCoordinate) -> Vector3<f64> {
    let height_h = position.altitude_meters();
    let lon_lambda = position.longitude_radians();
    let lat_phi = position.latitude_radians();

    // https://en.wikipedia.org/wiki/Earth_radius#Prime_vertical
    let n_phi = SEMI_MAJOR_AXIS / (1. - ECCENTRICITY_SQ * lat_phi.sin().powi(2)).sqrt();

    Vector3::new(
        (n_phi + height_h) * lat_phi.cos() * lon_lambda.cos(),
        (n_phi + height_h) * lat_phi.cos() * lon_lambda.sin(),
        ((1. - ECCENTRICITY_SQ) * n_phi + height_h) * lat_phi.sin(),
    )
}

/// Converts Earth-centered, Earth-fixed meters back to latitude, longitude, and altitude.
///
/// Uses the iterative algorithm of Shu & Li, "An iterative algorithm to compute geodetic
/// coordinates" (Computers & Geosciences, 2010), which converges in a handful of steps without
/// the boundary problems of the closed-form solutions.
pub(crate) fn from_ecef(ecef: &Vector3<f64>) -> GeoCoordinate {
    let lon = ecef.y.atan2(ecef.x);

    let a = SEMI_MAJOR_AXIS;
    let b = SEMI_MINOR_AXIS;
    let a2 = a.powi(2);
    let b2 = b.powi(2);
    let ab = a * b;
    let z2 = ecef.z.powi(2);
    let r2 = ecef.x.powi(2) + ecef.y.powi(2);
    let r = r2.sqrt();
    let bigr2 = r2 + z2;

    let mut k = (((a2 * z2 + b2 * r2).sqrt() - ab) * bigr2) / (a2 * z2 + b2 * r2);
    for _ in 0..32 {
        let p = a + b * k;
        let q = b + a * k;
        let f_k = 2. * (b * p * q.powi(2) + a * p.powi(2) * q - a * r2 * q - b * z2 * p);
        let dk = -1. / f_k;

        if !dk.is_normal() || dk.abs() < f64::EPSILON {
            break;
        }
        k += dk;
    }

    let p = a + b * k;
    let q = b + a * k;
    let lat = ((a * p * ecef.z) / (b * q * r)).atan();
    let altitude = k * ((b2 * r2 / p.powi(2)) + (a2 * z2 / q.powi(2))).sqrt();

    from_radians(lat, lon, Length::new::<meter>(altitude))
}

/// Rotation taking ECEF vectors into the north-east-down frame at the given latitude/longitude.
///
/// See
/// <https://en.wikipedia.org/wiki/Local_tangent_plane_coordinates#Local_north,_east,_down_(NED)_coordinates>.
pub(crate) fn ecef_to_ned(latitude: f64, longitude: f64) -> Rotation3<f64> {
    let (sin_phi, cos_phi) = latitude.sin_cos();
    let (sin_lambda, cos_lambda) = longitude.sin_cos();

    Rotation3::from_matrix_unchecked(Matrix3::new(
        -sin_phi * cos_lambda,
        -sin_phi * sin_lambda,
        cos_phi,
        -sin_lambda,
        cos_lambda,
        0.,
        -cos_phi * cos_lambda,
        -cos_phi * sin_lambda,
        -sin_phi,
    ))
}
