pub mod rest;

use crate::error::SourceError;
use crate::models::character::{CandidateRecord, CharacterDetail};
use async_trait::async_trait;

pub use rest::RestCharacterSource;

/// Character lookup backend: a fast cached index, a slow live search, and a
/// detail call for records that lack a precomputed combat score.
#[async_trait]
pub trait CharacterSource: Send + Sync {
    /// Search the cached/local character index
    async fn search_cached(
        &self,
        name: &str,
        server_id: Option<u32>,
    ) -> Result<Vec<CandidateRecord>, SourceError>;

    /// Search the live game API
    async fn search_live(
        &self,
        name: &str,
        server_id: Option<u32>,
    ) -> Result<Vec<CandidateRecord>, SourceError>;

    /// Fetch the full detail for one character
    async fn fetch_detail(
        &self,
        character_id: &str,
        server_id: u32,
    ) -> Result<CharacterDetail, SourceError>;
}
