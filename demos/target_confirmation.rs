//! Follows a detection across the frames of a short flight.
//!
//! A drone flies north at 30m, taking a picture every second. Something is detected in the first
//! picture; the detection is located on the ground and then looked up in every later picture to
//! see whether (and where) it should still be visible.
//!
//! Run with `RUST_LOG=debug` to see every projection.

use geoframe::camera::CameraSpec;
use geoframe::geodesy::{Geodesy, GreatCircle};
use geoframe::image_source::ImageDimensions;
use geoframe::{Attitude, CameraModel, GeoCoordinate, GeoFrame};
use std::error::Error;
use std::sync::Arc;
use uom::si::f64::{Angle, Length};
use uom::si::{
    angle::degree,
    length::{meter, millimeter},
};

const CAMERA: &str = r#"
resolution: [4056, 3040]
sensor_width_mm: 6.29
sensor_height_mm: 4.71
fov_deg: 78.3
"#;

const SPEED: f64 = 4.; // m/s
const ALTITUDE: f64 = 30.;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let spec: CameraSpec = serde_yaml::from_str(CAMERA)?;
    let camera = Arc::new(CameraModel::try_from(spec)?);
    let (width, height) = camera.resolution();
    println!(
        "camera: {width}x{height}, focal length {:.3} mm",
        camera.focal_length().get::<millimeter>()
    );

    let start = GeoCoordinate::from_degrees(59.9139, 10.7522, ALTITUDE)
        .ok_or("start latitude out of range")?;
    let geodesy = GreatCircle::default();

    let frames = (0..12u32)
        .map(|second| {
            let position = geodesy.destination(
                &start,
                Length::new::<meter>(SPEED * f64::from(second)),
                Angle::new::<degree>(0.),
            );
            // a little wobble, as real telemetry would have
            let wobble = f64::from(second % 3) - 1.;
            let attitude = Attitude::from_degrees(wobble, 2. + wobble, 0.5 * wobble);
            GeoFrame::new(
                Arc::clone(&camera),
                ImageDimensions::new(width, height),
                position,
                attitude,
            )
            .map(|frame| frame.with_index(u64::from(second)))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let detection = (2600., 900.);
    let target = frames[0].locate(detection.0, detection.1)?;
    println!(
        "detection at pixel ({}, {}) in frame 0 is at {target:.6}",
        detection.0, detection.1
    );

    for frame in &frames[1..] {
        let index = frame.index().unwrap_or_default();
        if frame.contains(&target) {
            println!("frame {index:>2}: visible at pixel {}", frame.project(&target)?);
        } else {
            println!("frame {index:>2}: out of view");
        }
    }

    let [top_left, top_right, bottom_right, bottom_left] = frames[0].footprint()?;
    println!("frame 0 covers {top_left:.6} / {top_right:.6} / {bottom_right:.6} / {bottom_left:.6}");

    Ok(())
}
