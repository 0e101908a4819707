//! Projection between the pixels of one captured image and the ground below the vehicle.

use crate::attitude::Attitude;
use crate::camera::CameraModel;
use crate::coordinate::GeoCoordinate;
use crate::error::{Error, Result};
use crate::geodesy::{Geodesy, GreatCircle};
use crate::image_source::{ImageDimensions, ImageSource};
use crate::util::BoundedAngle;
use nalgebra::{Rotation2, Vector2};
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::sync::Arc;
use uom::si::f64::{Angle, Length};
use uom::si::{angle::radian, length::meter};
use uom::ConstZero;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Targets closer than this (horizontally) to the sensor have no usable bearing.
const MIN_GROUND_DISTANCE: f64 = 1e-6;

/// An integer pixel position, origin in the top-left corner, y growing downward.
///
/// May lie outside the image; see [`GeoFrame::contains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pixel {
    pub x: i64,
    pub y: i64,
}

impl Pixel {
    #[must_use]
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl From<(i64, i64)> for Pixel {
    fn from((x, y): (i64, i64)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Pixel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Where the ray through a pixel meets the ground, relative to the point directly below the
/// sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundOffset {
    distance: Length,
    bearing: BoundedAngle,
    polar_angle: Angle,
}

impl GroundOffset {
    /// Horizontal distance from nadir.
    #[must_use]
    pub fn distance(&self) -> Length {
        self.distance
    }

    /// Direction from nadir, clockwise from true north in [0°, 360°).
    #[must_use]
    pub fn bearing(&self) -> Angle {
        self.bearing.to_angle()
    }

    /// Angle between the ray and straight down, in [0°, 90°).
    #[must_use]
    pub fn polar_angle(&self) -> Angle {
        self.polar_angle
    }

    /// Northward component of the offset.
    #[must_use]
    pub fn north(&self) -> Length {
        self.distance * self.bearing.get_bounded().cos()
    }

    /// Eastward component of the offset.
    #[must_use]
    pub fn east(&self) -> Length {
        self.distance * self.bearing.get_bounded().sin()
    }
}

/// One captured image together with where the camera was and how it was oriented at the time.
///
/// A frame is an immutable snapshot; when new telemetry arrives, build a new frame. The
/// [`CameraModel`] is shared between frames through an [`Arc`], so constructing a frame per video
/// frame is cheap, and frames can be moved to and evaluated on other threads freely.
///
/// The ground is assumed to be a plane at the altitude of the sensor position below it, and the
/// camera points straight down when the vehicle is level. The image's top edge faces the
/// vehicle's heading.
///
/// The geodesy model defaults to [`GreatCircle`] and can be swapped with
/// [`GeoFrame::with_geodesy`].
#[derive(Debug, Clone)]
pub struct GeoFrame<I = ImageDimensions, G = GreatCircle> {
    camera: Arc<CameraModel>,
    image: I,
    position: GeoCoordinate,
    attitude: Attitude,
    index: Option<u64>,
    geodesy: G,

    // roll turns the sensor plane under the image; positive roll is right-wing-down, image y is
    // flipped relative to the body frame, so the rotation is by -roll
    sensor_roll: Rotation2<f64>,
}

impl<I: ImageSource> GeoFrame<I> {
    /// Constructs a frame for an image taken by `camera` from `position` with `attitude`.
    ///
    /// The altitude of `position` is the height above the ground.
    ///
    /// Fails with
    ///
    /// - [`Error::ResolutionMismatch`] if the image does not have the camera's resolution,
    /// - [`Error::OutOfRangeInput`] if the position or attitude is not finite, or if the altitude
    ///   is not positive.
    pub fn new(
        camera: Arc<CameraModel>,
        image: I,
        position: GeoCoordinate,
        attitude: Attitude,
    ) -> Result<Self> {
        if image.dimensions() != camera.resolution() {
            return Err(Error::ResolutionMismatch {
                image: image.dimensions(),
                camera: camera.resolution(),
            });
        }
        if !position.is_finite() {
            return Err(Error::OutOfRangeInput(format!(
                "sensor position must be finite, got {position:?}"
            )));
        }
        let altitude = position.altitude_meters();
        if altitude <= 0. {
            return Err(Error::OutOfRangeInput(format!(
                "altitude above ground must be positive, got {altitude} m"
            )));
        }
        if !attitude.is_finite() {
            return Err(Error::OutOfRangeInput(format!(
                "attitude must be finite, got {attitude:?}"
            )));
        }

        Ok(Self {
            sensor_roll: Rotation2::new(-attitude.roll_radians()),
            camera,
            image,
            position,
            attitude,
            index: None,
            geodesy: GreatCircle::default(),
        })
    }
}

#[cfg(feature = "image")]
impl GeoFrame<image::DynamicImage> {
    /// Loads the image at `path` and constructs a frame for it.
    ///
    /// Loading failures are reported as [`Error::ImageLoad`] before any frame exists. See
    /// [`GeoFrame::new`] for the other failure conditions.
    pub fn open(
        camera: Arc<CameraModel>,
        path: impl AsRef<std::path::Path>,
        position: GeoCoordinate,
        attitude: Attitude,
    ) -> Result<Self> {
        let image = crate::image_source::open(path)?;
        Self::new(camera, image, position, attitude)
    }
}

impl<I, G> GeoFrame<I, G> {
    /// Returns this frame using a different [`Geodesy`] model.
    #[must_use]
    pub fn with_geodesy<G2: Geodesy>(self, geodesy: G2) -> GeoFrame<I, G2> {
        GeoFrame {
            camera: self.camera,
            image: self.image,
            position: self.position,
            attitude: self.attitude,
            index: self.index,
            geodesy,
            sensor_roll: self.sensor_roll,
        }
    }

    /// Tags this frame with an index, eg its position in a video. Only used in log messages.
    #[must_use]
    pub fn with_index(mut self, index: u64) -> Self {
        self.index = Some(index);
        self
    }

    #[must_use]
    pub fn camera(&self) -> &Arc<CameraModel> {
        &self.camera
    }

    #[must_use]
    pub fn image(&self) -> &I {
        &self.image
    }

    /// Position of the sensor when the image was captured.
    #[must_use]
    pub fn position(&self) -> &GeoCoordinate {
        &self.position
    }

    #[must_use]
    pub fn attitude(&self) -> &Attitude {
        &self.attitude
    }

    #[must_use]
    pub fn index(&self) -> Option<u64> {
        self.index
    }

    #[must_use]
    pub fn geodesy(&self) -> &G {
        &self.geodesy
    }

    fn label(&self) -> Label {
        Label(self.index)
    }
}

impl<I, G: Geodesy> GeoFrame<I, G> {
    /// Computes where on the ground the ray through pixel `(x, y)` lands, relative to nadir.
    ///
    /// This is [`GeoFrame::locate`] without the final step onto the Earth's surface.
    pub fn ground_offset(&self, x: f64, y: f64) -> Result<GroundOffset> {
        if !(x.is_finite() && y.is_finite()) {
            return Err(Error::OutOfRangeInput(format!(
                "pixel must be finite, got ({x}, {y})"
            )));
        }

        let on_sensor = self.sensor_roll * self.camera.pixel_to_sensor(x, y);
        // clockwise from the top of the sensor
        let azimuth = on_sensor.x.atan2(on_sensor.y);
        let off_boresight = self.camera.ray_angle(on_sensor.norm());

        let mut bearing = azimuth + self.attitude.heading_radians();
        let mut polar = off_boresight + self.attitude.pitch_radians();
        if polar < 0. {
            // the ray passes nadir and hits the ground behind it
            polar = -polar;
            bearing += PI;
        }
        if !(polar < FRAC_PI_2) {
            return Err(Error::NoGroundIntersection {
                x,
                y,
                polar_angle_deg: polar.to_degrees(),
            });
        }

        Ok(GroundOffset {
            distance: self.position.altitude() * polar.tan(),
            bearing: BoundedAngle::from_radians(bearing),
            polar_angle: Angle::new::<radian>(polar),
        })
    }

    /// Returns the point on the ground seen through pixel `(x, y)`.
    ///
    /// Pixels outside the image are allowed and extrapolate the camera model. The returned
    /// coordinate lies on the ground, so its altitude is zero.
    ///
    /// Fails with [`Error::NoGroundIntersection`] if the ray through the pixel points at or above
    /// the horizon.
    pub fn locate(&self, x: f64, y: f64) -> Result<GeoCoordinate> {
        let offset = self.ground_offset(x, y)?;
        let target = self
            .geodesy
            .destination(&self.position, offset.distance, offset.bearing())
            .with_altitude(Length::ZERO);
        if !target.is_finite() {
            return Err(Error::OutOfRangeInput(format!(
                "no destination {:.3} m from {} on bearing {:.3}°",
                offset.distance.get::<meter>(),
                self.position,
                offset.bearing.get_bounded().to_degrees(),
            )));
        }

        log::debug!(
            "{}: pixel ({x}, {y}) is at {target:.7} ({:.3} m at {:.3}°)",
            self.label(),
            offset.distance.get::<meter>(),
            offset.bearing.get_bounded().to_degrees(),
        );
        Ok(target)
    }

    /// Returns the exact (unrounded) pixel position through which `target` is seen.
    ///
    /// The altitude of `target` is ignored; it is taken to be on the ground. The result may lie
    /// outside the image.
    ///
    /// With the vehicle pitched nose-down, ground close to nadir is seen by two pixels: one whose
    /// ray crosses nadir and one whose ray does not. The latter is returned.
    ///
    /// Fails with [`Error::DegenerateProjection`] if `target` is directly below the sensor, or if
    /// no ray of the camera reaches it.
    pub fn project_subpixel(&self, target: &GeoCoordinate) -> Result<(f64, f64)> {
        if !target.is_finite() {
            return Err(Error::OutOfRangeInput(format!(
                "target must be finite, got {target:?}"
            )));
        }

        let distance = self.geodesy.distance(&self.position, target).get::<meter>();
        let bearing = self.geodesy.bearing(&self.position, target).get::<radian>();
        if !(distance.is_finite() && bearing.is_finite()) {
            return Err(Error::DegenerateProjection(format!(
                "no distance or bearing from {} to {target}",
                self.position
            )));
        }
        if distance < MIN_GROUND_DISTANCE {
            return Err(Error::DegenerateProjection(format!(
                "{target} is directly below the sensor"
            )));
        }

        let polar = distance.atan2(self.position.altitude_meters());
        let pitch = self.attitude.pitch_radians();
        let heading = self.attitude.heading_radians();
        // a ray that crossed nadir only exists for nose-down pitch, where the ray that did not
        // cross it always reaches the same point too
        let off_boresight = polar - pitch;
        if off_boresight < 0. {
            return Err(Error::DegenerateProjection(format!(
                "{target} is {:.3}° off nadir, which no ray reaches at {:.3}° pitch",
                polar.to_degrees(),
                pitch.to_degrees(),
            )));
        }
        let azimuth = bearing - heading;

        let radius = self.camera.sensor_radius(off_boresight).ok_or_else(|| {
            Error::DegenerateProjection(format!(
                "{target} is {:.3}° off boresight, beyond what the lens can image",
                off_boresight.to_degrees(),
            ))
        })?;
        let on_sensor = Vector2::new(radius * azimuth.sin(), radius * azimuth.cos());
        let (x, y) = self
            .camera
            .sensor_to_pixel(&(self.sensor_roll.inverse() * on_sensor));
        if !(x.is_finite() && y.is_finite()) {
            return Err(Error::DegenerateProjection(format!(
                "{target} projects to a non-finite pixel"
            )));
        }
        Ok((x, y))
    }

    /// Returns the pixel through which `target` is seen, rounded to the nearest integer.
    ///
    /// This is the inverse of [`GeoFrame::locate`]. See [`GeoFrame::project_subpixel`] for
    /// details and failure conditions.
    pub fn project(&self, target: &GeoCoordinate) -> Result<Pixel> {
        let (x, y) = self.project_subpixel(target)?;
        let pixel = Pixel::new(x.round() as i64, y.round() as i64);
        log::debug!("{}: {target:.7} is at pixel {pixel}", self.label());
        Ok(pixel)
    }

    /// `true` if `target` is visible in the image, that is, [`GeoFrame::project`] succeeds with
    /// a pixel inside `[0, res_x) × [0, res_y)`.
    ///
    /// The point directly below the sensor has no defined pixel and is therefore not contained.
    pub fn contains(&self, target: &GeoCoordinate) -> bool {
        let (res_x, res_y) = self.camera.resolution();
        let Ok(Pixel { x, y }) = self.project(target) else {
            return false;
        };
        let inside = (0..i64::from(res_x)).contains(&x) && (0..i64::from(res_y)).contains(&y);
        log::debug!(
            "{}: {target:.7} is {} the image",
            self.label(),
            if inside { "inside" } else { "outside" }
        );
        inside
    }

    /// Returns the ground coordinates seen by the four corners of the image, in the order
    /// top-left, top-right, bottom-right, bottom-left.
    ///
    /// Fails with [`Error::NoGroundIntersection`] if any corner looks at or above the horizon.
    pub fn footprint(&self) -> Result<[GeoCoordinate; 4]> {
        let (res_x, res_y) = self.camera.resolution();
        let (w, h) = (f64::from(res_x), f64::from(res_y));
        Ok([
            self.locate(0., 0.)?,
            self.locate(w, 0.)?,
            self.locate(w, h)?,
            self.locate(0., h)?,
        ])
    }
}

struct Label(Option<u64>);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(index) => write!(f, "frame #{index}"),
            None => f.write_str("frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::AngleMapping;
    use crate::geodesy::{FlatEarth, LocalTangentPlane};
    use approx::assert_relative_eq;
    use quickcheck::{quickcheck, TestResult};
    use rstest::rstest;
    use uom::si::angle::degree;
    use uom::si::length::millimeter;

    fn mm(millimeters: f64) -> Length {
        Length::new::<millimeter>(millimeters)
    }

    fn hq_camera() -> CameraModel {
        CameraModel::builder()
            .resolution(4056, 3040)
            .sensor(mm(6.29), mm(4.71))
            .field_of_view(Angle::new::<degree>(78.3))
            .build()
            .unwrap()
    }

    fn at(lat: f64, lon: f64, alt: f64) -> GeoCoordinate {
        GeoCoordinate::from_degrees(lat, lon, alt).unwrap()
    }

    fn frame(camera: CameraModel, position: GeoCoordinate, attitude: Attitude) -> GeoFrame {
        let image = ImageDimensions::from(camera.resolution());
        GeoFrame::new(Arc::new(camera), image, position, attitude).unwrap()
    }

    fn level_at_equator() -> GeoFrame {
        frame(hq_camera(), at(0., 0., 20.), Attitude::from_degrees(0., 0., 0.))
    }

    fn bearing_deg(frame: &GeoFrame, target: &GeoCoordinate) -> f64 {
        GreatCircle::default()
            .bearing(frame.position(), target)
            .get::<degree>()
    }

    fn distance_m(frame: &GeoFrame, target: &GeoCoordinate) -> f64 {
        GreatCircle::default()
            .distance(frame.position(), target)
            .get::<meter>()
    }

    #[test]
    fn image_center_is_directly_below_a_level_sensor() {
        let frame = level_at_equator();
        let center = frame.locate(2028., 1520.).unwrap();
        assert!(distance_m(&frame, &center) < 0.001);
        assert_eq!(center.altitude(), Length::ZERO);
    }

    #[test]
    fn top_right_corner_is_north_east() {
        let frame = level_at_equator();
        let corner = frame.locate(4056., 0.).unwrap();

        let azimuth = 2028f64.atan2(1520.).to_degrees();
        assert_relative_eq!(bearing_deg(&frame, &corner), azimuth, epsilon = 1e-6);
        assert!((0. ..90.).contains(&azimuth));

        let half_fov = (78.3f64 / 2.).to_radians();
        assert_relative_eq!(
            distance_m(&frame, &corner),
            20. * half_fov.tan(),
            epsilon = 1e-6
        );
        assert!(corner.latitude().get::<degree>() > 0.);
        assert!(corner.longitude().get::<degree>() > 0.);
    }

    #[test]
    fn ground_offset_components() {
        let frame = level_at_equator();
        let offset = frame.ground_offset(4056., 0.).unwrap();
        assert_relative_eq!(offset.polar_angle().get::<degree>(), 78.3 / 2., epsilon = 1e-9);
        assert_relative_eq!(
            offset.north().get::<meter>().hypot(offset.east().get::<meter>()),
            offset.distance().get::<meter>(),
            epsilon = 1e-9
        );
        assert_relative_eq!(
            offset.east().get::<meter>() / offset.north().get::<meter>(),
            2028. / 1520.,
            epsilon = 1e-9
        );
    }

    #[rstest]
    #[case(0., 0.)]
    #[case(90., 90.)]
    #[case(200., 200.)]
    #[case(-45., 315.)]
    fn top_center_looks_along_the_heading(#[case] heading: f64, #[case] expected: f64) {
        let frame = frame(
            hq_camera(),
            at(10., 20., 50.),
            Attitude::from_degrees(0., 0., heading),
        );
        let offset = frame.ground_offset(2028., 0.).unwrap();
        assert_relative_eq!(offset.bearing().get::<degree>(), expected, epsilon = 1e-9);
    }

    #[test]
    fn positive_roll_turns_rays_clockwise() {
        let frame = frame(
            hq_camera(),
            at(0., 0., 20.),
            Attitude::from_degrees(10., 0., 0.),
        );
        let offset = frame.ground_offset(2028., 0.).unwrap();
        assert_relative_eq!(offset.bearing().get::<degree>(), 10., epsilon = 1e-9);

        // roll does not change how far off boresight a pixel looks
        let level = level_at_equator().ground_offset(2028., 0.).unwrap();
        assert_relative_eq!(
            offset.polar_angle().get::<radian>(),
            level.polar_angle().get::<radian>(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn pitch_tilts_the_image_center_forward() {
        let frame = frame(
            hq_camera(),
            at(0., 0., 20.),
            Attitude::from_degrees(0., 10., 0.),
        );
        let offset = frame.ground_offset(2028., 1520.).unwrap();
        assert_relative_eq!(offset.polar_angle().get::<degree>(), 10., epsilon = 1e-9);
        assert_relative_eq!(
            offset.distance().get::<meter>(),
            20. * 10f64.to_radians().tan(),
            epsilon = 1e-9
        );
    }

    #[rstest]
    #[case(2028., 0.)]
    #[case(0., 0.)]
    #[case(4056., 3040.)]
    #[case(2028., -5000.)]
    fn rays_above_the_horizon_do_not_hit_the_ground(#[case] x: f64, #[case] y: f64) {
        let frame = frame(
            hq_camera(),
            at(0., 0., 20.),
            Attitude::from_degrees(0., 70., 0.),
        );
        match frame.locate(x, y) {
            Err(Error::NoGroundIntersection {
                polar_angle_deg, ..
            }) => assert!(polar_angle_deg >= 90.),
            other => panic!("expected no ground intersection, got {other:?}"),
        }
        assert!(frame.locate(2028., 1520.).is_ok());
    }

    #[test]
    fn ground_distance_grows_with_distance_from_the_center() {
        let frame = frame(
            hq_camera(),
            at(47., 8., 120.),
            Attitude::from_degrees(3., 5., 30.),
        );
        let mut previous = -1.;
        for step in 0..=100 {
            let t = f64::from(step) / 100.;
            let offset = frame
                .ground_offset(2028. + t * 2028., 1520. - t * 1520.)
                .unwrap();
            let distance = offset.distance().get::<meter>();
            assert!(distance > previous, "{distance} <= {previous} at step {step}");
            previous = distance;
        }
    }

    #[test]
    fn fov_and_equivalent_focal_length_locate_identically() {
        let by_fov = hq_camera();
        let by_focal_length = CameraModel::builder()
            .resolution(4056, 3040)
            .sensor(mm(6.29), mm(4.71))
            .focal_length(crate::camera::focal_length_from_fov(
                by_fov.sensor_diagonal(),
                Angle::new::<degree>(78.3),
            ))
            .build()
            .unwrap();

        let position = at(-33.9, 151.2, 80.);
        let attitude = Attitude::from_degrees(-2., 7., 123.);
        let a = frame(by_fov, position, attitude);
        let b = frame(by_focal_length, position, attitude);
        for (x, y) in [(0., 0.), (1000., 2500.), (4056., 1520.), (3900., 10.)] {
            let a = a.locate(x, y).unwrap();
            let b = b.locate(x, y).unwrap();
            assert!(a.haversine_distance_on_surface(&b).get::<meter>() < 1e-6);
        }
    }

    #[test]
    fn projecting_the_sensor_position_is_degenerate() {
        let frame = level_at_equator();
        assert!(matches!(
            frame.project(&at(0., 0., 0.)),
            Err(Error::DegenerateProjection(_))
        ));
        assert!(!frame.contains(&at(0., 0., 0.)));
    }

    #[test]
    fn targets_behind_a_steep_pitch_are_unreachable() {
        let frame = frame(
            hq_camera(),
            at(0., 0., 20.),
            Attitude::from_degrees(0., 30., 0.),
        );
        // ~10° off nadir, a third of the pitch
        let target = GreatCircle::default().destination(
            frame.position(),
            Length::new::<meter>(20. * 10f64.to_radians().tan()),
            Angle::new::<degree>(0.),
        );
        assert!(matches!(
            frame.project(&target),
            Err(Error::DegenerateProjection(_))
        ));
        assert!(!frame.contains(&target));
    }

    #[test]
    fn nose_down_pitch_sees_points_near_nadir_twice() {
        let frame = frame(
            hq_camera(),
            at(0., 0., 20.),
            Attitude::from_degrees(0., -10., 0.),
        );
        // above the center the ray crosses nadir, below it it does not
        let crossing = frame.pixel_at(5., 0.);
        let backward = frame.pixel_at(15., 180.);
        let a = frame.locate(crossing.0, crossing.1).unwrap();
        let b = frame.locate(backward.0, backward.1).unwrap();
        assert!(a.haversine_distance_on_surface(&b).get::<meter>() < 1e-6);
        assert!(bearing_deg(&frame, &a) > 90.);

        let (x, y) = frame.project_subpixel(&a).unwrap();
        assert_relative_eq!(x, backward.0, epsilon = 1e-6);
        assert_relative_eq!(y, backward.1, epsilon = 1e-6);
    }

    impl GeoFrame {
        /// Pixel (for a linear-mapping camera with no roll) that looks `off_boresight` degrees
        /// away from the boresight, at `azimuth` degrees clockwise from the top of the image.
        fn pixel_at(&self, off_boresight: f64, azimuth: f64) -> (f64, f64) {
            let camera = self.camera();
            let radius = camera.sensor_radius(off_boresight.to_radians()).unwrap();
            let azimuth = azimuth.to_radians();
            camera.sensor_to_pixel(&Vector2::new(radius * azimuth.sin(), radius * azimuth.cos()))
        }
    }

    #[test]
    fn contains() {
        let frame = level_at_equator();
        let geodesy = GreatCircle::default();
        let north = |meters: f64| {
            geodesy.destination(
                frame.position(),
                Length::new::<meter>(meters),
                Angle::new::<degree>(0.),
            )
        };
        // the top edge is ~23.5° off nadir, 8.7 m away at 20 m
        assert!(frame.contains(&north(5.)));
        assert!(frame.contains(&north(8.)));
        assert!(!frame.contains(&north(9.5)));
        assert!(!frame.contains(&north(1000.)));
        assert!(!frame.contains(&at(10., 10., 0.)));
    }

    #[test]
    fn footprint_is_symmetric_for_a_level_sensor() {
        let frame = level_at_equator();
        let corners = frame.footprint().unwrap();
        let bearings = corners.map(|c| bearing_deg(&frame, &c));
        let azimuth = 2028f64.atan2(1520.).to_degrees();
        for (bearing, expected) in
            bearings
                .iter()
                .zip([360. - azimuth, azimuth, 180. - azimuth, 180. + azimuth])
        {
            assert_relative_eq!(*bearing, expected, epsilon = 1e-6);
        }
        let distances = corners.map(|c| distance_m(&frame, &c));
        for distance in distances {
            assert_relative_eq!(distance, distances[0], epsilon = 1e-6);
        }
    }

    #[test]
    fn footprint_fails_past_the_horizon() {
        let frame = frame(
            hq_camera(),
            at(0., 0., 20.),
            Attitude::from_degrees(0., 60., 0.),
        );
        assert!(matches!(
            frame.footprint(),
            Err(Error::NoGroundIntersection { .. })
        ));
    }

    #[derive(Debug, Clone, Copy)]
    enum GeodesyModel {
        GreatCircle,
        FlatEarth,
        LocalTangentPlane,
    }

    #[rstest]
    fn round_trips_through_every_geodesy_model(
        #[values(
            GeodesyModel::GreatCircle,
            GeodesyModel::FlatEarth,
            GeodesyModel::LocalTangentPlane
        )]
        model: GeodesyModel,
        #[values(AngleMapping::Linear, AngleMapping::Perspective)] mapping: AngleMapping,
    ) {
        let frame = frame(
            hq_camera().with_angle_mapping(mapping),
            at(52.5, 13.4, 100.),
            Attitude::from_degrees(4., 8., 250.),
        );
        fn check<G: Geodesy>(frame: &GeoFrame<ImageDimensions, G>) {
            for (x, y) in [(0., 0.), (17., 3001.), (4055., 2999.), (2028., 1000.)] {
                let target = frame.locate(x, y).unwrap();
                let (px, py) = frame.project_subpixel(&target).unwrap();
                assert_relative_eq!(px, x, epsilon = 1e-4);
                assert_relative_eq!(py, y, epsilon = 1e-4);
                assert_eq!(
                    frame.project(&target).unwrap(),
                    Pixel::new(x.round() as i64, y.round() as i64)
                );
            }
        }
        match model {
            GeodesyModel::GreatCircle => check(&frame),
            GeodesyModel::FlatEarth => check(&frame.with_geodesy(FlatEarth::default())),
            GeodesyModel::LocalTangentPlane => check(&frame.with_geodesy(LocalTangentPlane)),
        }
    }

    #[rstest]
    #[case(ImageDimensions::new(640, 480), at(0., 0., 20.), Attitude::default())]
    #[case(ImageDimensions::new(3040, 4056), at(0., 0., 20.), Attitude::default())]
    fn image_must_match_the_camera(
        #[case] image: ImageDimensions,
        #[case] position: GeoCoordinate,
        #[case] attitude: Attitude,
    ) {
        assert!(matches!(
            GeoFrame::new(Arc::new(hq_camera()), image, position, attitude),
            Err(Error::ResolutionMismatch { .. })
        ));
    }

    #[rstest]
    #[case(at(0., 0., 0.), Attitude::default())]
    #[case(at(0., 0., -5.), Attitude::default())]
    #[case(at(0., 0., f64::NAN), Attitude::default())]
    #[case(at(0., f64::INFINITY, 20.), Attitude::default())]
    #[case(at(0., 0., 20.), Attitude::from_degrees(0., f64::NAN, 0.))]
    fn position_and_attitude_must_be_usable(
        #[case] position: GeoCoordinate,
        #[case] attitude: Attitude,
    ) {
        let result = GeoFrame::new(
            Arc::new(hq_camera()),
            ImageDimensions::new(4056, 3040),
            position,
            attitude,
        );
        assert!(
            matches!(result, Err(Error::OutOfRangeInput(_))),
            "{result:?}"
        );
    }

    #[test]
    fn non_finite_pixels_are_rejected() {
        let frame = level_at_equator();
        assert!(matches!(
            frame.locate(f64::NAN, 0.),
            Err(Error::OutOfRangeInput(_))
        ));
        assert!(matches!(
            frame.project(&at(0., 0., f64::INFINITY)),
            Err(Error::OutOfRangeInput(_))
        ));
    }

    #[test]
    fn frames_share_one_camera_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GeoFrame>();

        let camera = Arc::new(hq_camera());
        let frames: Vec<_> = (0..4u32)
            .map(|i| {
                GeoFrame::new(
                    Arc::clone(&camera),
                    ImageDimensions::new(4056, 3040),
                    at(0., f64::from(i) * 0.001, 20.),
                    Attitude::from_degrees(0., 0., f64::from(i) * 90.),
                )
                .unwrap()
                .with_index(u64::from(i))
            })
            .collect();
        assert_eq!(Arc::strong_count(&camera), 5);

        let located: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = frames
                .iter()
                .map(|frame| s.spawn(move || frame.locate(4056., 0.).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for ((i, frame), target) in frames.iter().enumerate().zip(&located) {
            assert_eq!(frame.index(), Some(i as u64));
            // the corner pixel rounds to just outside the image
            assert_eq!(frame.project(target).unwrap(), Pixel::new(4056, 0));
        }
    }

    #[test]
    fn pixel_display() {
        insta::assert_snapshot!(Pixel::new(-3, 4056), @"(-3, 4056)");
    }

    quickcheck! {
        fn locate_then_project_round_trips(
            x: u16,
            y: u16,
            roll: i16,
            pitch: u8,
            heading: u16,
            lat: i8,
            lon: i16,
            altitude: u16
        ) -> TestResult {
            let x = f64::from(x % 4057);
            let y = f64::from(y % 3041);
            let roll = f64::from(roll % 180);
            let pitch = f64::from(pitch % 30);
            let heading = f64::from(heading % 360);
            let lat = f64::from(lat % 60);
            let lon = f64::from(lon % 180);
            let altitude = 1. + f64::from(altitude % 500);

            let frame = frame(
                hq_camera(),
                at(lat, lon, altitude),
                Attitude::from_degrees(roll, pitch, heading),
            );
            let target = frame.locate(x, y).unwrap();
            match frame.project_subpixel(&target) {
                Ok((px, py)) => TestResult::from_bool((px - x).abs() < 1e-3 && (py - y).abs() < 1e-3),
                // the image center under a level sensor
                Err(Error::DegenerateProjection(_)) if pitch == 0. => TestResult::discard(),
                Err(e) => TestResult::error(e.to_string()),
            }
        }

        fn nose_down_locate_then_project_round_trips(
            x: u16,
            y: u16,
            pitch: u8,
            heading: u16,
            altitude: u16
        ) -> TestResult {
            let x = f64::from(x % 4057);
            let y = f64::from(y % 3041);
            let pitch = -1. - f64::from(pitch % 29);
            let heading = f64::from(heading % 360);
            let altitude = 1. + f64::from(altitude % 500);

            let frame = frame(
                hq_camera(),
                at(45., 10., altitude),
                Attitude::from_degrees(0., pitch, heading),
            );
            let off_nadir = frame.camera().off_boresight(x, y).get::<degree>() + pitch;
            if off_nadir.abs() < 1e-6 {
                return TestResult::discard();
            }
            let target = frame.locate(x, y).unwrap();
            match frame.project_subpixel(&target) {
                // rays that do not cross nadir come back to the same pixel
                Ok((px, py)) if off_nadir > 0. => {
                    TestResult::from_bool((px - x).abs() < 1e-3 && (py - y).abs() < 1e-3)
                }
                // the others come back to the twin pixel that sees the same ground point
                Ok((px, py)) => {
                    let twin = frame.locate(px, py).unwrap();
                    TestResult::from_bool(
                        twin.haversine_distance_on_surface(&target).get::<meter>() < 1e-4,
                    )
                }
                // right below the sensor
                Err(Error::DegenerateProjection(_)) => TestResult::discard(),
                Err(e) => TestResult::error(e.to_string()),
            }
        }
    }
}
