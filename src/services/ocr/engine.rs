use crate::error::RecognitionError;
use async_trait::async_trait;
use image::DynamicImage;

/// Text recognizer abstraction - an OCR backend turning a raster into text lines
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize all text in the image, one line per party bar row, joined with '\n'
    async fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError>;
}
