//! This library maps between the pixels of an aerial photo and the ground it shows, for cameras
//! rigidly mounted underneath a vehicle (ie, without a gimbal).
//!
//! Knowing where the vehicle was and how it was oriented when the picture was taken, together with
//! the intrinsics of the camera, is enough to say where on the ground a detection in the image is
//! ([`GeoFrame::locate`]), and conversely where in the image a known ground point should appear
//! ([`GeoFrame::project`]) and whether it is in the picture at all ([`GeoFrame::contains`]).
//!
//! The model behind this is deliberately simple:
//!
//! - The camera is an ideal pinhole; there is no lens distortion.
//! - The ground is flat, at the sensor's altitude below it; there is no terrain.
//! - With the vehicle level, the camera looks straight down and the top of the image faces the
//!   vehicle's heading.
//!
//! The camera is described by a [`CameraModel`] that many frames share. Each image then becomes a
//! [`GeoFrame`], which freezes the vehicle's [`GeoCoordinate`] and [`Attitude`] at capture time.
//! How distances and bearings are measured on the Earth is pluggable through the
//! [`Geodesy`](geodesy::Geodesy) trait.
//!
//! Physical quantities are [`uom`] quantities throughout, so sensor sizes in millimeters and
//! altitudes in meters, or angles in degrees and radians, cannot be confused.
//!
//! # Examples
//!
//! A drone hovers 20m above the equator, facing north, and its object detector reports something
//! in the top-right quarter of the image:
//!
//! ```
//! use geoframe::{Attitude, CameraModel, GeoCoordinate, GeoFrame, Pixel};
//! use geoframe::image_source::ImageDimensions;
//! use std::sync::Arc;
//! use uom::si::f64::{Angle, Length};
//! use uom::si::{angle::degree, length::millimeter};
//!
//! // the camera is the same for every frame, so it is shared
//! let camera = Arc::new(
//!     CameraModel::builder()
//!         .resolution(4056, 3040)
//!         .sensor(Length::new::<millimeter>(6.29), Length::new::<millimeter>(4.71))
//!         .field_of_view(Angle::new::<degree>(78.3))
//!         .build()?,
//! );
//!
//! let position = GeoCoordinate::from_degrees(0., 0., 20.).expect("latitude is in [-90, 90]");
//! let frame = GeoFrame::new(
//!     Arc::clone(&camera),
//!     ImageDimensions::new(4056, 3040),
//!     position,
//!     Attitude::from_degrees(0., 0., 0.),
//! )?;
//!
//! // where is the detection?
//! let target = frame.locate(3000., 1000.)?;
//! assert!(target.latitude().get::<degree>() > 0.);
//! assert!(target.longitude().get::<degree>() > 0.);
//!
//! // and does it show up in the next frame, after the drone turned right?
//! let next = GeoFrame::new(
//!     camera,
//!     ImageDimensions::new(4056, 3040),
//!     position,
//!     Attitude::from_degrees(0., 0., 45.),
//! )?
//! .with_index(1);
//! assert!(next.contains(&target));
//! // turning right moves it towards the top of the image
//! let Pixel { x, y } = next.project(&target)?;
//! assert!(x > 2028 && x < 3000 && y < 1000);
//! # Ok::<(), geoframe::Error>(())
//! ```
//!
//! Rays that point at or above the horizon never reach the ground, and are reported as such rather
//! than producing a bogus coordinate:
//!
//! ```
//! # use geoframe::{Attitude, CameraModel, Error, GeoCoordinate, GeoFrame};
//! # use geoframe::image_source::ImageDimensions;
//! # use std::sync::Arc;
//! # use uom::si::f64::{Angle, Length};
//! # use uom::si::{angle::degree, length::millimeter};
//! # let camera = Arc::new(
//! #     CameraModel::builder()
//! #         .resolution(4056, 3040)
//! #         .sensor(Length::new::<millimeter>(6.29), Length::new::<millimeter>(4.71))
//! #         .field_of_view(Angle::new::<degree>(78.3))
//! #         .build()?,
//! # );
//! # let position = GeoCoordinate::from_degrees(0., 0., 20.).expect("latitude is in [-90, 90]");
//! // nose up by 70°
//! let frame = GeoFrame::new(
//!     camera,
//!     ImageDimensions::new(4056, 3040),
//!     position,
//!     Attitude::from_degrees(0., 70., 0.),
//! )?;
//! assert!(matches!(
//!     frame.locate(2028., 0.),
//!     Err(Error::NoGroundIntersection { .. })
//! ));
//! # Ok::<(), geoframe::Error>(())
//! ```

mod attitude;
mod coordinate;
mod error;
mod frame;
mod util;

pub mod camera;
pub mod geodesy;
pub mod image_source;

/// Typestate builders for the value types, and the argument types of their `build` functions.
pub mod builder {
    /// For [`Attitude`](crate::Attitude).
    pub mod attitude {
        pub use crate::attitude::{
            Builder, Components, HasHeading, HasPitch, HasRoll, MissingHeading, MissingPitch,
            MissingRoll,
        };
    }

    /// For [`GeoCoordinate`](crate::GeoCoordinate).
    pub mod coordinate {
        pub use crate::coordinate::{
            Builder, Components, HasAltitude, HasLatitude, HasLongitude, MissingAltitude,
            MissingLatitude, MissingLongitude,
        };
    }
}

pub use attitude::Attitude;
pub use camera::{AngleMapping, CameraModel};
pub use coordinate::GeoCoordinate;
pub use error::{Error, Result};
pub use frame::{GeoFrame, GroundOffset, Pixel};
