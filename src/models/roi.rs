use serde::{Deserialize, Serialize};
use crate::models::config::PreprocessingConfig;

/// Region of interest inside a captured screenshot, in pixels
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// Create a new ROI from coordinates
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Locate the party bar inside an image of the given size.
    ///
    /// The bar sits at a fixed position: the bottom strip of the screen
    /// (a ratio of the height, never less than `min_crop_height`) between
    /// the left and right width ratios.
    pub fn party_bar(image_width: u32, image_height: u32, config: &PreprocessingConfig) -> Self {
        let ratio_height = (image_height as f64 * config.crop_height_ratio).round() as u32;
        let height = ratio_height.max(config.min_crop_height).min(image_height);
        let y = image_height - height;

        let left = (image_width as f64 * config.crop_left_ratio).round() as u32;
        let right = (image_width as f64 * config.crop_right_ratio).round() as u32;
        let left = left.min(image_width);
        let right = right.clamp(left, image_width);

        Self::new(left, y, right - left, height)
    }

    /// Validate ROI dimensions
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Get the end coordinates
    pub fn x2(&self) -> u32 {
        self.x + self.width
    }

    pub fn y2(&self) -> u32 {
        self.y + self.height
    }

    /// Check whether the ROI lies fully inside an image of the given size
    pub fn fits_within(&self, image_width: u32, image_height: u32) -> bool {
        self.x2() <= image_width && self.y2() <= image_height
    }
}
