pub mod aggregator;
pub mod config;
pub mod ocr;
pub mod party_scanner;
pub mod resolver;
pub mod selection;
pub mod servers;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;
