use serde::{Deserialize, Serialize};

/// Image preprocessing configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Party bar height as a ratio of the screenshot height
    pub crop_height_ratio: f64,
    /// Lower bound for the party bar height in pixels
    pub min_crop_height: u32,
    pub crop_left_ratio: f64,
    pub crop_right_ratio: f64,
    /// Upscale factor applied after cropping
    pub scale_factor: f64,
    /// Contrast stretch factor around the 128 midpoint
    pub contrast: f64,
    pub white_threshold: u8,
    pub black_threshold: u8,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            crop_height_ratio: 0.15,
            min_crop_height: 150,
            crop_left_ratio: 0.15,
            crop_right_ratio: 0.70,
            scale_factor: 2.0,
            contrast: 1.5,
            white_threshold: 128,
            black_threshold: 50,
        }
    }
}

/// Text recognition server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OcrConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Language hint forwarded to the recognizer
    pub lang: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:39835".to_string(),
            timeout_secs: 30,
            lang: "kor+eng".to_string(),
        }
    }
}

/// Character source endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// Base URL of the cached character index (PostgREST)
    pub cache_url: String,
    /// Base URL of the live character search service
    pub live_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            cache_url: "http://127.0.0.1:54321".to_string(),
            live_url: "http://127.0.0.1:39836".to_string(),
            api_key: None,
            timeout_secs: 10,
        }
    }
}

/// The party bar never shows more than four members
pub const MAX_PARTY_SIZE: usize = 4;

/// Roster lookup tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LookupConfig {
    /// Upper bound on candidates resolved at the same time
    pub max_concurrent_lookups: usize,
    /// Per source call timeout; a call exceeding it counts as "not found"
    pub lookup_timeout_ms: u64,
    /// Roster slots to fill; values above `MAX_PARTY_SIZE` are capped
    pub party_size: usize,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            max_concurrent_lookups: 4,
            lookup_timeout_ms: 5000,
            party_size: MAX_PARTY_SIZE,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ScannerConfig {
    pub preprocessing: PreprocessingConfig,
    pub ocr: OcrConfig,
    pub source: SourceConfig,
    pub lookup: LookupConfig,
}
