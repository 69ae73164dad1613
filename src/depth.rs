use std::path::Path;

use image::{DynamicImage, GenericImageView, ImageBuffer, Pixel};

use crate::error::{Error, Result};

/// Parameters controlling how raw image samples become distances in meters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    /// Channel carrying depth in multi-channel images. Ignored for single-channel images.
    pub channel: usize,
    pub scale_to_meter: f64,
    /// Replace every depth with `1.0 - depth` after scaling. Meant for normalized
    /// encodings where a larger raw value is closer to the camera.
    pub invert: bool,
}

impl Default for Params {
    fn default() -> Self {
        Params {
            channel: 0,
            scale_to_meter: 0.001,
            invert: false,
        }
    }
}

/// Samples decoded from a depth image, row-major, with their shape.
///
/// A shape of `[height, width]` is a single-channel image and `[height, width, channels]`
/// a multi-channel one.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDepthImage {
    shape: Vec<usize>,
    samples: Vec<f64>,
}

impl RawDepthImage {
    pub fn new(shape: Vec<usize>, samples: Vec<f64>) -> Result<RawDepthImage> {
        let expected: usize = shape.iter().product();
        if expected != samples.len() {
            return Err(Error::SampleCount {
                expected,
                actual: samples.len(),
            });
        }
        Ok(RawDepthImage { shape, samples })
    }

    pub fn from_dynamic_image(img: &DynamicImage) -> RawDepthImage {
        let (width, height) = img.dimensions();
        let (width, height) = (width as usize, height as usize);

        let (channels, samples) = match img {
            DynamicImage::ImageLuma8(buf) => (1, samples_of(buf)),
            DynamicImage::ImageLuma16(buf) => (1, samples_of(buf)),
            DynamicImage::ImageLumaA8(buf) => (2, samples_of(buf)),
            DynamicImage::ImageLumaA16(buf) => (2, samples_of(buf)),
            DynamicImage::ImageRgb8(buf) => (3, samples_of(buf)),
            DynamicImage::ImageRgb16(buf) => (3, samples_of(buf)),
            DynamicImage::ImageRgb32F(buf) => (3, samples_of(buf)),
            DynamicImage::ImageRgba8(buf) => (4, samples_of(buf)),
            DynamicImage::ImageRgba16(buf) => (4, samples_of(buf)),
            DynamicImage::ImageRgba32F(buf) => (4, samples_of(buf)),
            other => (4, samples_of(&other.to_rgba32f())),
        };

        let shape = if channels == 1 {
            vec![height, width]
        } else {
            vec![height, width, channels]
        };

        RawDepthImage { shape, samples }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }
}

fn samples_of<P>(buffer: &ImageBuffer<P, Vec<P::Subpixel>>) -> Vec<f64>
where
    P: Pixel,
    P::Subpixel: Into<f64>,
{
    buffer.as_raw().iter().map(|&s| s.into()).collect()
}

/// A grid of distances in meters. A value of exactly `0.0` means the pixel has no depth.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMatrix {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl DepthMatrix {
    /// Builds a matrix from row-major values that are already in meters.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() != width * height`.
    pub fn from_rows(width: usize, height: usize, values: Vec<f64>) -> DepthMatrix {
        assert_eq!(
            values.len(),
            width * height,
            "Depth values don't match the matrix dimensions"
        );
        DepthMatrix {
            width,
            height,
            values,
        }
    }

    /// Selects the depth channel, scales to meters and optionally inverts.
    pub fn from_raw(raw: &RawDepthImage, params: &Params) -> Result<DepthMatrix> {
        let (height, width, values): (usize, usize, Vec<f64>) = match raw.shape() {
            [height, width] => (*height, *width, raw.samples().to_vec()),
            [height, width, channels] => {
                if params.channel >= *channels {
                    return Err(Error::UnsupportedChannel {
                        channel: params.channel,
                        available: *channels,
                    });
                }
                let values = raw
                    .samples()
                    .iter()
                    .skip(params.channel)
                    .step_by(*channels)
                    .copied()
                    .collect();
                (*height, *width, values)
            }
            shape => return Err(Error::UnsupportedShape(shape.to_vec())),
        };

        let values = values
            .into_iter()
            .map(|raw_depth| {
                let depth = raw_depth * params.scale_to_meter;
                if params.invert {
                    1.0 - depth
                } else {
                    depth
                }
            })
            .collect();

        Ok(DepthMatrix {
            width,
            height,
            values,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Depth at column `u`, row `v` (row 0 is the top of the image).
    pub fn get(&self, u: usize, v: usize) -> f64 {
        self.values[v * self.width + u]
    }

    pub fn invalid_count(&self) -> usize {
        self.values.iter().filter(|&&d| d == 0.0).count()
    }
}

/// Reads a depth image from disk and turns it into a [`DepthMatrix`].
pub fn load_depth_image<P: AsRef<Path>>(path: P, params: &Params) -> Result<DepthMatrix> {
    let path = path.as_ref();
    log::info!("Loading depth image from {:?}", path);

    let img = image::open(path)?;
    let raw = RawDepthImage::from_dynamic_image(&img);
    log::debug!("Decoded depth image with shape {:?}", raw.shape());

    DepthMatrix::from_raw(&raw, params)
}
