pub mod engine;
pub mod http_ocr;
pub mod parser;
pub mod preprocessing;

// Re-export main types
pub use engine::TextRecognizer;
pub use http_ocr::HttpOcrClient;
pub use parser::parse_roster;
pub use preprocessing::PreprocessingService;
