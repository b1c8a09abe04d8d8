use crate::error::ScanError;
use crate::models::config::PreprocessingConfig;
use crate::models::roi::Roi;
use image::{DynamicImage, GenericImageView, GrayImage};
use rayon::prelude::*;
use tracing::debug;

/// Image preprocessing service for OCR optimization
pub struct PreprocessingService {
    config: PreprocessingConfig,
}

impl Default for PreprocessingService {
    fn default() -> Self {
        Self::new(PreprocessingConfig::default())
    }
}

impl PreprocessingService {
    /// Create a new preprocessing service with custom configuration
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// Decode a screenshot and run the full pipeline on it
    pub fn preprocess_bytes(
        &self,
        bytes: &[u8],
        crop_to_party_bar: bool,
    ) -> Result<DynamicImage, ScanError> {
        let image = image::load_from_memory(bytes)?;
        self.preprocess(&image, crop_to_party_bar)
    }

    /// Full preprocessing pipeline: (crop → scale) → grayscale → contrast → near-binarize
    pub fn preprocess(
        &self,
        image: &DynamicImage,
        crop_to_party_bar: bool,
    ) -> Result<DynamicImage, ScanError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ScanError::Preprocess(format!("Empty image: {}x{}", width, height)));
        }

        let working = if crop_to_party_bar {
            let roi = Roi::party_bar(width, height, &self.config);
            if !roi.is_valid() || !roi.fits_within(width, height) {
                return Err(ScanError::Preprocess(format!("Invalid party bar region: {:?}", roi)));
            }
            let factor = capped_scale_factor(self.config.scale_factor, (width, height), &roi);
            debug!(?roi, factor, "Cropping party bar");
            let cropped = self.crop(image, &roi);
            self.scale(&cropped, factor)
        } else {
            image.clone()
        };

        let mut gray = self.to_grayscale(&working);
        self.tone_map(&mut gray);

        Ok(DynamicImage::ImageLuma8(gray))
    }

    /// Extract a region of the image
    pub fn crop(&self, image: &DynamicImage, roi: &Roi) -> DynamicImage {
        image.crop_imm(roi.x, roi.y, roi.width, roi.height)
    }

    /// Scale image by factor
    pub fn scale(&self, image: &DynamicImage, factor: f64) -> DynamicImage {
        let (width, height) = image.dimensions();
        let new_width = (width as f64 * factor) as u32;
        let new_height = (height as f64 * factor) as u32;

        image.resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3)
    }

    /// Convert to grayscale with 0.299/0.587/0.114 luma weights
    pub fn to_grayscale(&self, image: &DynamicImage) -> GrayImage {
        let rgb = image.to_rgb8();
        let (width, height) = rgb.dimensions();

        GrayImage::from_fn(width, height, |x, y| {
            let p = rgb.get_pixel(x, y);
            image::Luma([luma(p[0], p[1], p[2])])
        })
    }

    /// Contrast stretch followed by near-binarization, row-parallel
    pub fn tone_map(&self, gray: &mut GrayImage) {
        let width = gray.width() as usize;
        if width == 0 {
            return;
        }

        let contrast = self.config.contrast;
        let white = self.config.white_threshold;
        let black = self.config.black_threshold;

        gray.par_chunks_mut(width).for_each(|row| {
            for value in row.iter_mut() {
                let stretched = stretch(*value, contrast);
                *value = binarize(stretched, white, black);
            }
        });
    }
}

/// Upscale factor for the cropped strip, lowered so the result never has
/// more pixels than the original capture
fn capped_scale_factor(factor: f64, (width, height): (u32, u32), roi: &Roi) -> f64 {
    let input_area = width as f64 * height as f64;
    let crop_area = roi.width as f64 * roi.height as f64;
    factor.min((input_area / crop_area).sqrt())
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let l = 0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64;
    l.round().clamp(0.0, 255.0) as u8
}

/// Stretch contrast around the 128 midpoint
fn stretch(value: u8, contrast: f64) -> u8 {
    let v = (value as f64 - 128.0) * contrast + 128.0;
    v.round().clamp(0.0, 255.0) as u8
}

/// Push near-white to white and near-black to black, keep the middle band
fn binarize(value: u8, white: u8, black: u8) -> u8 {
    if value > white {
        255
    } else if value < black {
        0
    } else {
        value
    }
}
