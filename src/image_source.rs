//! The image a [`GeoFrame`](crate::GeoFrame) was captured into.
//!
//! Projection never looks at pixel content, only at how many pixels there are. Anything that can
//! report its width and height can therefore back a frame: a decoded image, a memory-mapped video
//! frame, or just the bare dimensions.

use std::rc::Rc;
use std::sync::Arc;

#[cfg(feature = "image")]
use crate::error::{Error, Result};
#[cfg(feature = "image")]
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Something with a width and a height in pixels.
pub trait ImageSource {
    /// Width and height in pixels.
    fn dimensions(&self) -> (u32, u32);

    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }
}

impl<T: ImageSource + ?Sized> ImageSource for &T {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }
}

impl<T: ImageSource + ?Sized> ImageSource for Box<T> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }
}

impl<T: ImageSource + ?Sized> ImageSource for Rc<T> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }
}

impl<T: ImageSource + ?Sized> ImageSource for Arc<T> {
    fn dimensions(&self) -> (u32, u32) {
        (**self).dimensions()
    }
}

/// An image known only by its size.
///
/// Useful when pixels live elsewhere (eg, on a GPU) or were never decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl ImageSource for ImageDimensions {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl From<(u32, u32)> for ImageDimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

#[cfg(feature = "image")]
impl ImageSource for image::DynamicImage {
    fn dimensions(&self) -> (u32, u32) {
        image::GenericImageView::dimensions(self)
    }
}

#[cfg(feature = "image")]
impl<P, C> ImageSource for image::ImageBuffer<P, C>
where
    P: image::Pixel,
    C: std::ops::Deref<Target = [P::Subpixel]>,
{
    fn dimensions(&self) -> (u32, u32) {
        image::ImageBuffer::dimensions(self)
    }
}

/// Decodes the image at `path`.
///
/// The format is guessed from the file extension. Failures to read or decode the file are
/// reported as [`Error::ImageLoad`].
#[cfg(feature = "image")]
pub fn open(path: impl AsRef<Path>) -> Result<image::DynamicImage> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source: Box::new(source),
    })?;
    log::debug!(
        "loaded {}x{} image from {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(image)
}
