//! Intrinsic properties of a fixed-mount pinhole camera.
//!
//! A [`CameraModel`] knows the resolution of the image, the physical size of the sensor behind
//! it, and either the focal length of the lens or its diagonal field of view. From these it
//! derives how far off the optical axis (the boresight) the ray through any given pixel points.
//!
//! There is no lens distortion model; the camera is an ideal pinhole.

use crate::error::{Error, Result};
use nalgebra::Vector2;
use std::f64::consts::{FRAC_PI_2, PI};
use std::marker::PhantomData;
use uom::si::f64::{Angle, Length};
use uom::si::{
    angle::{degree, radian},
    length::{meter, millimeter},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How the distance of a point on the sensor from the optical axis turns into the angle of its
/// ray off boresight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum AngleMapping {
    /// `φ = r / sensor_diagonal · fov`.
    ///
    /// The angle grows linearly with the distance from the image center, reaching half the
    /// diagonal field of view in the corners. It agrees with perspective projection at the center
    /// and in the corners, and falls short of it in between; the more so the wider the lens.
    #[default]
    Linear,

    /// `φ = atan(r / focal_length)`, the exact pinhole relation.
    Perspective,
}

/// Which optical property a [`CameraModel`] was constructed from.
///
/// The other one is derived from it and the sensor diagonal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Optics {
    FocalLength,
    FieldOfView,
}

/// Returns the focal length that gives a sensor with the given diagonal the given diagonal field
/// of view.
///
/// `focal_length = (sensor_diagonal / 2) / tan(fov / 2)`
#[must_use]
pub fn focal_length_from_fov(sensor_diagonal: impl Into<Length>, fov: impl Into<Angle>) -> Length {
    let diagonal = sensor_diagonal.into().get::<meter>();
    let fov = fov.into().get::<radian>();
    Length::new::<meter>((diagonal / 2.) / (fov / 2.).tan())
}

/// Inverse of [`focal_length_from_fov`].
#[must_use]
pub fn fov_from_focal_length(
    sensor_diagonal: impl Into<Length>,
    focal_length: impl Into<Length>,
) -> Angle {
    let diagonal = sensor_diagonal.into().get::<meter>();
    let focal_length = focal_length.into().get::<meter>();
    Angle::new::<radian>(2. * (diagonal / 2.).atan2(focal_length))
}

/// Static intrinsics of a camera.
///
/// Immutable once built. Frames share a camera through an [`Arc`](std::sync::Arc) rather than
/// copying it, see [`GeoFrame::new`](crate::GeoFrame::new).
#[derive(Debug, Clone, PartialEq)]
pub struct CameraModel {
    res_x: u32,
    res_y: u32,
    sensor_width: Length,
    sensor_height: Length,
    focal_length: Length,
    field_of_view: Angle,
    optics: Optics,
    angle_mapping: AngleMapping,

    sensor_diagonal: Length,
    resolution_diagonal: f64,
}

impl CameraModel {
    /// Constructs a camera from its resolution, physical sensor size, and a focal length and/or a
    /// diagonal field of view.
    ///
    /// If both the focal length and the field of view are given, the field of view wins and the
    /// focal length is derived from it.
    ///
    /// Fails with [`Error::InvalidCameraConfig`] if neither is given, if any dimension is not
    /// positive, or if the field of view is not in (0°, 180°).
    pub fn new(
        res_x: u32,
        res_y: u32,
        sensor_width: impl Into<Length>,
        sensor_height: impl Into<Length>,
        focal_length: Option<Length>,
        field_of_view: Option<Angle>,
    ) -> Result<Self> {
        Self::from_draft(Draft {
            resolution: Some((res_x, res_y)),
            sensor: Some((sensor_width.into(), sensor_height.into())),
            focal_length,
            field_of_view,
            angle_mapping: AngleMapping::default(),
        })
    }

    /// Provides a constructor for a [`CameraModel`].
    ///
    /// ```rust
    /// use geoframe::CameraModel;
    /// use uom::si::f64::{Angle, Length};
    /// use uom::si::{angle::degree, length::millimeter};
    ///
    /// let camera = CameraModel::builder()
    ///     .resolution(4056, 3040)
    ///     .sensor(Length::new::<millimeter>(6.29), Length::new::<millimeter>(4.71))
    ///     .field_of_view(Angle::new::<degree>(78.3))
    ///     .build()
    ///     .expect("intrinsics are valid");
    ///
    /// assert!((camera.focal_length().get::<millimeter>() - 4.826).abs() < 1e-3);
    /// ```
    pub fn builder() -> Builder<MissingResolution, MissingSensor, MissingOptics> {
        Builder {
            draft: Draft::default(),
            has: (PhantomData, PhantomData, PhantomData),
        }
    }

    fn from_draft(draft: Draft) -> Result<Self> {
        let invalid = |reason: String| Err(Error::InvalidCameraConfig(reason));

        let Some((res_x, res_y)) = draft.resolution else {
            return invalid("missing resolution".into());
        };
        if res_x == 0 || res_y == 0 {
            return invalid(format!("resolution must be positive, got {res_x}x{res_y}"));
        }

        let Some((sensor_width, sensor_height)) = draft.sensor else {
            return invalid("missing sensor size".into());
        };
        for (name, value) in [("width", sensor_width), ("height", sensor_height)] {
            let value = value.get::<meter>();
            if !(value.is_finite() && value > 0.) {
                return invalid(format!("sensor {name} must be positive, got {value} m"));
            }
        }
        let sensor_diagonal = Length::new::<meter>(
            sensor_width
                .get::<meter>()
                .hypot(sensor_height.get::<meter>()),
        );

        let (focal_length, field_of_view, optics) = match (draft.field_of_view, draft.focal_length)
        {
            (Some(fov), _) => {
                let radians = fov.get::<radian>();
                if !(radians.is_finite() && radians > 0. && radians < PI) {
                    return invalid(format!(
                        "field of view must be in (0°, 180°), got {}°",
                        fov.get::<degree>()
                    ));
                }
                (
                    focal_length_from_fov(sensor_diagonal, fov),
                    fov,
                    Optics::FieldOfView,
                )
            }
            (None, Some(focal_length)) => {
                let meters = focal_length.get::<meter>();
                if !(meters.is_finite() && meters > 0.) {
                    return invalid(format!("focal length must be positive, got {meters} m"));
                }
                (
                    focal_length,
                    fov_from_focal_length(sensor_diagonal, focal_length),
                    Optics::FocalLength,
                )
            }
            (None, None) => {
                return invalid("either a focal length or a field of view is required".into())
            }
        };

        let camera = Self {
            res_x,
            res_y,
            sensor_width,
            sensor_height,
            focal_length,
            field_of_view,
            optics,
            angle_mapping: draft.angle_mapping,
            sensor_diagonal,
            resolution_diagonal: f64::from(res_x).hypot(f64::from(res_y)),
        };
        log::debug!(
            "camera {res_x}x{res_y}: focal length {:.4} mm, diagonal field of view {:.4}° ({:?} mapping)",
            camera.focal_length.get::<millimeter>(),
            camera.field_of_view.get::<degree>(),
            camera.angle_mapping,
        );
        Ok(camera)
    }

    /// Returns a copy of this camera using a different [`AngleMapping`].
    #[must_use]
    pub fn with_angle_mapping(mut self, angle_mapping: AngleMapping) -> Self {
        self.angle_mapping = angle_mapping;
        self
    }

    /// Width and height of the image in pixels.
    #[must_use]
    pub fn resolution(&self) -> (u32, u32) {
        (self.res_x, self.res_y)
    }

    #[must_use]
    pub fn res_x(&self) -> u32 {
        self.res_x
    }

    #[must_use]
    pub fn res_y(&self) -> u32 {
        self.res_y
    }

    #[must_use]
    pub fn sensor_width(&self) -> Length {
        self.sensor_width
    }

    #[must_use]
    pub fn sensor_height(&self) -> Length {
        self.sensor_height
    }

    /// The focal length, either as given or derived from the field of view.
    #[must_use]
    pub fn focal_length(&self) -> Length {
        self.focal_length
    }

    /// The diagonal field of view, either as given or derived from the focal length.
    #[must_use]
    pub fn field_of_view(&self) -> Angle {
        self.field_of_view
    }

    /// Which of [`focal_length`](Self::focal_length) and
    /// [`field_of_view`](Self::field_of_view) the camera was constructed from.
    #[must_use]
    pub fn optics(&self) -> Optics {
        self.optics
    }

    #[must_use]
    pub fn angle_mapping(&self) -> AngleMapping {
        self.angle_mapping
    }

    #[must_use]
    pub fn sensor_diagonal(&self) -> Length {
        self.sensor_diagonal
    }

    /// Length of the image diagonal in pixels.
    #[must_use]
    pub fn resolution_diagonal(&self) -> f64 {
        self.resolution_diagonal
    }

    /// Physical size of one pixel, assuming square pixels.
    ///
    /// This is the ratio of the sensor diagonal to the image diagonal, which is exact when the
    /// sensor and the image share an aspect ratio.
    #[must_use]
    pub fn pixel_pitch(&self) -> Length {
        self.sensor_diagonal / self.resolution_diagonal
    }

    /// Converts a pixel position into an offset (in meters) from the optical axis on the sensor
    /// plane, with x to the right and y up.
    ///
    /// Pixel coordinates have their origin in the top-left corner with y growing downward.
    /// Positions outside the image are allowed and extrapolate.
    #[must_use]
    pub fn pixel_to_sensor(&self, x: f64, y: f64) -> Vector2<f64> {
        let pitch = self.pixel_pitch().get::<meter>();
        let cx = x - f64::from(self.res_x) / 2.;
        let cy = f64::from(self.res_y) / 2. - y;
        Vector2::new(cx * pitch, cy * pitch)
    }

    /// Inverse of [`CameraModel::pixel_to_sensor`].
    #[must_use]
    pub fn sensor_to_pixel(&self, offset: &Vector2<f64>) -> (f64, f64) {
        let pitch = self.pixel_pitch().get::<meter>();
        (
            offset.x / pitch + f64::from(self.res_x) / 2.,
            f64::from(self.res_y) / 2. - offset.y / pitch,
        )
    }

    /// Angle off boresight (in radians) of the ray through the point `radius` meters from the
    /// optical axis on the sensor plane.
    pub(crate) fn ray_angle(&self, radius: f64) -> f64 {
        match self.angle_mapping {
            AngleMapping::Linear => {
                radius / self.sensor_diagonal.get::<meter>() * self.field_of_view.get::<radian>()
            }
            AngleMapping::Perspective => radius.atan2(self.focal_length.get::<meter>()),
        }
    }

    /// Inverse of [`CameraModel::ray_angle`].
    ///
    /// Returns `None` if no point on the sensor plane sees a ray at that angle.
    pub(crate) fn sensor_radius(&self, ray_angle: f64) -> Option<f64> {
        if !(ray_angle.is_finite() && ray_angle >= 0.) {
            return None;
        }
        match self.angle_mapping {
            AngleMapping::Linear => Some(
                ray_angle * self.sensor_diagonal.get::<meter>()
                    / self.field_of_view.get::<radian>(),
            ),
            AngleMapping::Perspective if ray_angle < FRAC_PI_2 => {
                Some(self.focal_length.get::<meter>() * ray_angle.tan())
            }
            AngleMapping::Perspective => None,
        }
    }

    /// Angle between the optical axis and the ray through the given pixel.
    ///
    /// This ignores the vehicle's attitude entirely; it is a property of the camera alone.
    #[must_use]
    pub fn off_boresight(&self, x: f64, y: f64) -> Angle {
        Angle::new::<radian>(self.ray_angle(self.pixel_to_sensor(x, y).norm()))
    }
}

/// Human-friendly description of a camera, for keeping intrinsics in configuration files.
///
/// ```rust
/// # #[cfg(feature = "serde")]
/// # {
/// use geoframe::{CameraModel, camera::CameraSpec};
///
/// let spec: CameraSpec = serde_yaml::from_str(
///     "resolution: [4056, 3040]\nsensor_width_mm: 6.29\nsensor_height_mm: 4.71\nfov_deg: 78.3\n",
/// ).unwrap();
/// let camera = CameraModel::try_from(spec).unwrap();
/// assert_eq!(camera.resolution(), (4056, 3040));
/// # }
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct CameraSpec {
    /// Width and height in pixels.
    pub resolution: [u32; 2],
    pub sensor_width_mm: f64,
    pub sensor_height_mm: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub focal_length_mm: Option<f64>,
    /// Diagonal field of view in degrees. Takes precedence over `focal_length_mm`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub fov_deg: Option<f64>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub angle_mapping: AngleMapping,
}

impl TryFrom<CameraSpec> for CameraModel {
    type Error = Error;

    fn try_from(spec: CameraSpec) -> Result<Self> {
        Self::from_draft(Draft {
            resolution: Some((spec.resolution[0], spec.resolution[1])),
            sensor: Some((
                Length::new::<millimeter>(spec.sensor_width_mm),
                Length::new::<millimeter>(spec.sensor_height_mm),
            )),
            focal_length: spec.focal_length_mm.map(Length::new::<millimeter>),
            field_of_view: spec.fov_deg.map(Angle::new::<degree>),
            angle_mapping: spec.angle_mapping,
        })
    }
}

impl From<&CameraModel> for CameraSpec {
    fn from(camera: &CameraModel) -> Self {
        let (focal_length_mm, fov_deg) = match camera.optics {
            Optics::FocalLength => (Some(camera.focal_length.get::<millimeter>()), None),
            Optics::FieldOfView => (None, Some(camera.field_of_view.get::<degree>())),
        };
        Self {
            resolution: [camera.res_x, camera.res_y],
            sensor_width_mm: camera.sensor_width.get::<millimeter>(),
            sensor_height_mm: camera.sensor_height.get::<millimeter>(),
            focal_length_mm,
            fov_deg,
            angle_mapping: camera.angle_mapping,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Draft {
    resolution: Option<(u32, u32)>,
    sensor: Option<(Length, Length)>,
    focal_length: Option<Length>,
    field_of_view: Option<Angle>,
    angle_mapping: AngleMapping,
}

/// Used to indicate that a partially-constructed [`CameraModel`] is missing its resolution.
pub struct MissingResolution;
/// Used to indicate that a partially-constructed [`CameraModel`] has its resolution set.
pub struct HasResolution;
/// Used to indicate that a partially-constructed [`CameraModel`] is missing its sensor size.
pub struct MissingSensor;
/// Used to indicate that a partially-constructed [`CameraModel`] has its sensor size set.
pub struct HasSensor;
/// Used to indicate that a partially-constructed [`CameraModel`] has neither a focal length nor a
/// field of view.
pub struct MissingOptics;
/// Used to indicate that a partially-constructed [`CameraModel`] has a focal length or a field of
/// view.
pub struct HasOptics;

/// [Builder] for a [`CameraModel`].
///
/// Construct one through [`CameraModel::builder`], and finalize with [`Builder::build`].
///
/// [Builder]: https://rust-unofficial.github.io/patterns/patterns/creational/builder.html
#[derive(Debug)]
#[must_use]
pub struct Builder<Resolution, Sensor, Optics> {
    draft: Draft,
    has: (
        PhantomData<Resolution>,
        PhantomData<Sensor>,
        PhantomData<Optics>,
    ),
}

// manual impls of Clone and Copy to avoid requiring the markers to be Copy + Clone
impl<R, S, O> Clone for Builder<R, S, O> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<R, S, O> Copy for Builder<R, S, O> {}

impl<R, S, O> Builder<R, S, O> {
    /// Sets the image resolution in pixels.
    pub fn resolution(mut self, res_x: u32, res_y: u32) -> Builder<HasResolution, S, O> {
        self.draft.resolution = Some((res_x, res_y));
        Builder {
            draft: self.draft,
            has: (PhantomData::<HasResolution>, self.has.1, self.has.2),
        }
    }

    /// Sets the physical width and height of the sensor.
    pub fn sensor(
        mut self,
        width: impl Into<Length>,
        height: impl Into<Length>,
    ) -> Builder<R, HasSensor, O> {
        self.draft.sensor = Some((width.into(), height.into()));
        Builder {
            draft: self.draft,
            has: (self.has.0, PhantomData::<HasSensor>, self.has.2),
        }
    }

    /// Sets the focal length of the lens.
    ///
    /// Ignored if a field of view is also set.
    pub fn focal_length(mut self, focal_length: impl Into<Length>) -> Builder<R, S, HasOptics> {
        self.draft.focal_length = Some(focal_length.into());
        Builder {
            draft: self.draft,
            has: (self.has.0, self.has.1, PhantomData::<HasOptics>),
        }
    }

    /// Sets the diagonal field of view of the lens.
    ///
    /// Must be in (0°, 180°). Overrides any focal length.
    pub fn field_of_view(mut self, fov: impl Into<Angle>) -> Builder<R, S, HasOptics> {
        self.draft.field_of_view = Some(fov.into());
        Builder {
            draft: self.draft,
            has: (self.has.0, self.has.1, PhantomData::<HasOptics>),
        }
    }

    /// Chooses the [`AngleMapping`]; defaults to [`AngleMapping::Linear`].
    pub fn angle_mapping(mut self, angle_mapping: AngleMapping) -> Self {
        self.draft.angle_mapping = angle_mapping;
        self
    }
}

impl Builder<HasResolution, HasSensor, HasOptics> {
    /// Validates the intrinsics and produces the camera.
    ///
    /// See [`CameraModel::new`] for the failure conditions.
    pub fn build(self) -> Result<CameraModel> {
        CameraModel::from_draft(self.draft)
    }
}
