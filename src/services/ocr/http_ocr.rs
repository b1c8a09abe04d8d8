use super::engine::TextRecognizer;
use crate::error::RecognitionError;
use crate::models::config::OcrConfig;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Boxes overlapping more than this are treated as duplicates
const IOU_THRESHOLD: f64 = 0.3;

/// HTTP OCR client that talks to a local recognition server
#[derive(Clone)]
pub struct HttpOcrClient {
    client: reqwest::Client,
    base_url: String,
    lang: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    image_base64: String,
    lang: &'a str,
}

/// Single text box with bounding box coordinates
#[derive(Deserialize, Clone, Debug)]
struct TextBox {
    #[serde(rename = "box")]
    bbox: Vec<Vec<f64>>, // 4 corner points [[x1,y1], [x2,y2], [x3,y3], [x4,y4]]
    text: String,
    #[allow(dead_code)]
    score: f64,
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    boxes: Vec<TextBox>,
    #[serde(default)]
    raw_text: String,
}

impl TextBox {
    /// Get bounding box as (x_min, y_min, x_max, y_max)
    fn rect(&self) -> (f64, f64, f64, f64) {
        let mut x_min = f64::INFINITY;
        let mut y_min = f64::INFINITY;
        let mut x_max = f64::NEG_INFINITY;
        let mut y_max = f64::NEG_INFINITY;

        for point in self.bbox.iter().filter(|p| p.len() >= 2) {
            x_min = x_min.min(point[0]);
            x_max = x_max.max(point[0]);
            y_min = y_min.min(point[1]);
            y_max = y_max.max(point[1]);
        }

        if !x_min.is_finite() {
            return (0.0, 0.0, 0.0, 0.0);
        }
        (x_min, y_min, x_max, y_max)
    }

    /// Compute IoU (Intersection over Union) with another box
    fn iou(&self, other: &TextBox) -> f64 {
        let (x1_min, y1_min, x1_max, y1_max) = self.rect();
        let (x2_min, y2_min, x2_max, y2_max) = other.rect();

        let inter_w = x1_max.min(x2_max) - x1_min.max(x2_min);
        let inter_h = y1_max.min(y2_max) - y1_min.max(y2_min);
        if inter_w <= 0.0 || inter_h <= 0.0 {
            return 0.0;
        }

        let inter_area = inter_w * inter_h;
        let union_area = self.area() + other.area() - inter_area;
        if union_area <= 0.0 {
            return 0.0;
        }

        inter_area / union_area
    }

    fn left_x(&self) -> f64 {
        self.rect().0
    }

    fn center_y(&self) -> f64 {
        let (_, y_min, _, y_max) = self.rect();
        (y_min + y_max) / 2.0
    }

    fn height(&self) -> f64 {
        let (_, y_min, _, y_max) = self.rect();
        y_max - y_min
    }

    fn area(&self) -> f64 {
        let (x_min, y_min, x_max, y_max) = self.rect();
        (x_max - x_min) * (y_max - y_min)
    }
}

impl HttpOcrClient {
    /// Create a new HTTP OCR client
    pub fn new(config: &OcrConfig) -> Result<Self, RecognitionError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            lang: config.lang.clone(),
            timeout,
        })
    }

    /// Encode image to base64 PNG
    fn encode_image(image: &DynamicImage) -> Result<String, RecognitionError> {
        let mut buffer = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
            .map_err(RecognitionError::Encode)?;
        Ok(general_purpose::STANDARD.encode(&buffer))
    }

    /// Apply NMS-like filtering: keep the larger box when two overlap
    fn filter_overlapping_boxes(boxes: Vec<TextBox>) -> Vec<TextBox> {
        let mut remaining = boxes;
        // Smallest first so pop() yields the largest
        remaining.sort_by(|a, b| a.area().total_cmp(&b.area()));

        let mut kept = Vec::new();
        while let Some(current) = remaining.pop() {
            remaining.retain(|other| current.iou(other) <= IOU_THRESHOLD);
            kept.push(current);
        }

        kept
    }

    /// Group boxes into rows, order rows top to bottom and words left to right
    fn process_ocr_boxes(boxes: Vec<TextBox>) -> String {
        let mut filtered = Self::filter_overlapping_boxes(boxes);
        filtered.sort_by(|a, b| a.center_y().total_cmp(&b.center_y()));

        let mut lines: Vec<Vec<TextBox>> = Vec::new();
        for text_box in filtered {
            // Same row when the centre falls within half a box height of the row's first box
            let same_row = lines.last().and_then(|row| row.first()).map_or(false, |anchor| {
                let tolerance = anchor.height().max(text_box.height()) / 2.0;
                (anchor.center_y() - text_box.center_y()).abs() <= tolerance
            });

            match lines.last_mut() {
                Some(row) if same_row => row.push(text_box),
                _ => lines.push(vec![text_box]),
            }
        }

        lines
            .into_iter()
            .map(|mut row| {
                row.sort_by(|a, b| a.left_x().total_cmp(&b.left_x()));
                row.iter().map(|b| b.text.trim()).collect::<Vec<_>>().join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl TextRecognizer for HttpOcrClient {
    async fn recognize(&self, image: &DynamicImage) -> Result<String, RecognitionError> {
        let image_base64 = Self::encode_image(image)?;
        let url = format!("{}/ocr", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&ImageRequest {
                image_base64,
                lang: &self.lang,
            })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RecognitionError::Timeout(self.timeout)
                } else {
                    RecognitionError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RecognitionError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let data: OcrResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::InvalidResponse(e.to_string()))?;

        debug!(boxes = data.boxes.len(), "OCR response received");

        if data.boxes.is_empty() {
            return Ok(data.raw_text);
        }
        Ok(Self::process_ocr_boxes(data.boxes))
    }
}
