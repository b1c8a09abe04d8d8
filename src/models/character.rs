use serde::{Deserialize, Serialize};

/// Faction a server belongs to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Race {
    Elyos,
    Asmodian,
}

/// Game server entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    pub id: u32,
    pub name: String,
    pub race: Race,
}

impl ServerInfo {
    pub fn new(id: u32, name: &str, race: Race) -> Self {
        Self {
            id,
            name: name.to_string(),
            race,
        }
    }
}

/// Character row returned by a search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CandidateRecord {
    pub character_id: String,
    pub name: String,
    pub server_id: u32,
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub race: Option<String>,
    #[serde(default)]
    pub profile_image: Option<String>,
    /// Precomputed combat score; absent until the detail has been fetched once
    #[serde(default)]
    pub combat_score: Option<u32>,
    #[serde(default)]
    pub gear_score: Option<u32>,
}

/// Full character detail, used to fill in a missing combat score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CharacterDetail {
    pub character_id: String,
    pub combat_score: u32,
    pub gear_score: u32,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub level: Option<u32>,
    #[serde(default)]
    pub profile_image: Option<String>,
}
