use super::CharacterSource;
use crate::error::SourceError;
use crate::models::character::{CandidateRecord, CharacterDetail};
use crate::models::config::SourceConfig;
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[^>]+(>|$)").expect("valid tag pattern"));

/// Row of the cached `characters` table (PostgREST)
#[derive(Deserialize)]
struct CachedRow {
    character_id: String,
    server_id: u32,
    name: String,
    #[serde(default)]
    level: Option<u32>,
    #[serde(default)]
    class_name: Option<String>,
    #[serde(default)]
    race_name: Option<String>,
    #[serde(default)]
    profile_image: Option<String>,
    #[serde(default)]
    noa_score: Option<u32>,
    #[serde(default)]
    item_level: Option<u32>,
}

impl From<CachedRow> for CandidateRecord {
    fn from(row: CachedRow) -> Self {
        Self {
            character_id: row.character_id,
            name: row.name,
            server_id: row.server_id,
            server_name: None,
            class_name: row.class_name.unwrap_or_default(),
            level: row.level.unwrap_or(0),
            race: row.race_name,
            profile_image: row.profile_image,
            // A zero score in the cache means "never computed"
            combat_score: row.noa_score.filter(|s| *s > 0),
            gear_score: row.item_level,
        }
    }
}

/// Entry of the live search response
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveRow {
    character_id: String,
    name: String,
    #[serde(alias = "server_id")]
    server_id: u32,
    #[serde(default)]
    server_name: Option<String>,
    #[serde(default)]
    level: Option<u32>,
    #[serde(default)]
    job: Option<String>,
    #[serde(default)]
    race: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
}

impl From<LiveRow> for CandidateRecord {
    fn from(row: LiveRow) -> Self {
        Self {
            character_id: row.character_id,
            // Live search highlights the keyword with markup
            name: strip_tags(&row.name),
            server_id: row.server_id,
            server_name: row.server_name,
            class_name: row.job.unwrap_or_default(),
            level: row.level.unwrap_or(0),
            race: row.race,
            profile_image: row.image_url,
            combat_score: None,
            gear_score: None,
        }
    }
}

#[derive(Deserialize)]
struct LiveSearchResponse {
    #[serde(default)]
    list: Vec<LiveRow>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailResponse {
    character_id: String,
    #[serde(default)]
    noa_score: u32,
    #[serde(default)]
    item_level: u32,
    #[serde(default)]
    job: Option<String>,
    #[serde(default)]
    level: Option<u32>,
    #[serde(default)]
    image_url: Option<String>,
}

impl From<DetailResponse> for CharacterDetail {
    fn from(detail: DetailResponse) -> Self {
        Self {
            character_id: detail.character_id,
            combat_score: detail.noa_score,
            gear_score: detail.item_level,
            class_name: detail.job,
            level: detail.level,
            profile_image: detail.image_url,
        }
    }
}

/// Character source backed by the cached index (PostgREST) and the live search API
#[derive(Clone)]
pub struct RestCharacterSource {
    client: reqwest::Client,
    cache_url: String,
    live_url: String,
    api_key: Option<String>,
}

impl RestCharacterSource {
    pub fn new(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            cache_url: config.cache_url.trim_end_matches('/').to_string(),
            live_url: config.live_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, SourceError> {
        let request = match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl CharacterSource for RestCharacterSource {
    async fn search_cached(
        &self,
        name: &str,
        server_id: Option<u32>,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let url = format!("{}/rest/v1/characters", self.cache_url);
        let mut query = vec![
            ("select", "*".to_string()),
            ("name", format!("eq.{}", name)),
        ];
        if let Some(id) = server_id {
            query.push(("server_id", format!("eq.{}", id)));
        }

        let rows: Vec<CachedRow> = self.get_json(self.client.get(&url).query(&query)).await?;
        Ok(rows.into_iter().map(CandidateRecord::from).collect())
    }

    async fn search_live(
        &self,
        name: &str,
        server_id: Option<u32>,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        let url = format!("{}/search", self.live_url);
        let mut query = vec![("keyword", name.to_string())];
        if let Some(id) = server_id {
            query.push(("serverId", id.to_string()));
        }

        let request = self.client.get(&url).query(&query);
        let response: LiveSearchResponse = self.get_json(request).await?;
        Ok(response.list.into_iter().map(CandidateRecord::from).collect())
    }

    async fn fetch_detail(
        &self,
        character_id: &str,
        server_id: u32,
    ) -> Result<CharacterDetail, SourceError> {
        let url = format!("{}/character", self.live_url);
        let query = [
            ("characterId", character_id.to_string()),
            ("serverId", server_id.to_string()),
        ];

        let detail: DetailResponse = self.get_json(self.client.get(&url).query(&query)).await?;
        Ok(detail.into())
    }
}

/// Remove HTML tags such as `<strong>` from a name
fn strip_tags(name: &str) -> String {
    HTML_TAG.replace_all(name, "").into_owned()
}
