//! In-memory collaborators for tests

use crate::error::{RecognitionError, SourceError};
use crate::models::character::{CandidateRecord, CharacterDetail, Race, ServerInfo};
use crate::services::ocr::TextRecognizer;
use crate::services::servers::ServerDirectory;
use crate::services::source::CharacterSource;
use async_trait::async_trait;
use image::DynamicImage;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Siel (1), Isrr1..3 (2..4), Nezakan (5)
pub(crate) fn latin_directory() -> ServerDirectory {
    ServerDirectory::new(vec![
        ServerInfo::new(1, "Siel", Race::Elyos),
        ServerInfo::new(2, "Isrr1", Race::Asmodian),
        ServerInfo::new(3, "Isrr2", Race::Asmodian),
        ServerInfo::new(4, "Isrr3", Race::Asmodian),
        ServerInfo::new(5, "Nezakan", Race::Elyos),
    ])
}

pub(crate) fn record(name: &str, server_id: u32, combat_score: Option<u32>) -> CandidateRecord {
    CandidateRecord {
        character_id: format!("{}@{}", name, server_id),
        name: name.to_string(),
        server_id,
        server_name: None,
        class_name: "Gladiator".to_string(),
        level: 45,
        race: None,
        profile_image: None,
        combat_score,
        gear_score: combat_score.map(|s| s / 2),
    }
}

#[derive(Default)]
struct Counters {
    cached: AtomicUsize,
    live: AtomicUsize,
    detail: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Call statistics shared with a `FakeSource`
#[derive(Clone, Default)]
pub(crate) struct CallLog(Arc<Counters>);

impl CallLog {
    pub(crate) fn cached(&self) -> usize {
        self.0.cached.load(Ordering::SeqCst)
    }

    pub(crate) fn live(&self) -> usize {
        self.0.live.load(Ordering::SeqCst)
    }

    pub(crate) fn detail(&self) -> usize {
        self.0.detail.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.0.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.0.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.0.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Lookup tier of a `FakeSource`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Tier {
    Cached,
    Live,
    Detail,
}

/// Character source answering from in-memory tables
#[derive(Default)]
pub(crate) struct FakeSource {
    cached: Vec<CandidateRecord>,
    live: Vec<CandidateRecord>,
    details: HashMap<String, CharacterDetail>,
    delay: Option<Duration>,
    name_delays: HashMap<String, Duration>,
    tier_delays: HashMap<Tier, Duration>,
    failing_tiers: HashSet<Tier>,
    failing_servers: HashSet<u32>,
    calls: CallLog,
}

impl FakeSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_cached(
        mut self,
        name: &str,
        server_id: u32,
        combat_score: Option<u32>,
    ) -> Self {
        self.cached.push(record(name, server_id, combat_score));
        self
    }

    pub(crate) fn with_live(mut self, name: &str, server_id: u32) -> Self {
        self.live.push(record(name, server_id, None));
        self
    }

    pub(crate) fn with_detail(mut self, name: &str, server_id: u32, combat_score: u32) -> Self {
        let character_id = format!("{}@{}", name, server_id);
        self.details.insert(
            character_id.clone(),
            CharacterDetail {
                character_id,
                combat_score,
                gear_score: combat_score / 2,
                class_name: Some("Cleric".to_string()),
                level: Some(50),
                profile_image: None,
            },
        );
        self
    }

    /// Delay every call
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Delay calls for one name only
    pub(crate) fn with_name_delay(mut self, name: &str, delay: Duration) -> Self {
        self.name_delays.insert(name.to_string(), delay);
        self
    }

    /// Every call returns an error
    pub(crate) fn failing(mut self) -> Self {
        self.failing_tiers.extend([Tier::Cached, Tier::Live, Tier::Detail]);
        self
    }

    /// Calls to one tier return an error
    pub(crate) fn failing_tier(mut self, tier: Tier) -> Self {
        self.failing_tiers.insert(tier);
        self
    }

    /// Calls to one tier hang for `delay`
    pub(crate) fn slow_tier(mut self, tier: Tier, delay: Duration) -> Self {
        self.tier_delays.insert(tier, delay);
        self
    }

    /// Every call scoped to one server returns an error
    pub(crate) fn failing_server(mut self, server_id: u32) -> Self {
        self.failing_servers.insert(server_id);
        self
    }

    pub(crate) fn calls(&self) -> CallLog {
        self.calls.clone()
    }

    async fn pause(&self, tier: Tier, name: &str) {
        let delay = self
            .tier_delays
            .get(&tier)
            .or_else(|| self.name_delays.get(name))
            .copied()
            .or(self.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_failure(&self, tier: Tier, server_id: Option<u32>) -> Result<(), SourceError> {
        let server_down = server_id.is_some_and(|id| self.failing_servers.contains(&id));
        if self.failing_tiers.contains(&tier) || server_down {
            return Err(SourceError::InvalidResponse("injected failure".to_string()));
        }
        Ok(())
    }

    async fn search(
        &self,
        tier: Tier,
        name: &str,
        server_id: Option<u32>,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        self.calls.enter();
        self.pause(tier, name).await;
        self.calls.leave();

        self.check_failure(tier, server_id)?;

        let table = match tier {
            Tier::Live => &self.live,
            _ => &self.cached,
        };

        // Substring search, like the real services
        let needle = name.to_lowercase();
        Ok(table
            .iter()
            .filter(|r| r.name.to_lowercase().contains(&needle))
            .filter(|r| server_id.map_or(true, |id| r.server_id == id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CharacterSource for FakeSource {
    async fn search_cached(
        &self,
        name: &str,
        server_id: Option<u32>,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        self.calls.0.cached.fetch_add(1, Ordering::SeqCst);
        self.search(Tier::Cached, name, server_id).await
    }

    async fn search_live(
        &self,
        name: &str,
        server_id: Option<u32>,
    ) -> Result<Vec<CandidateRecord>, SourceError> {
        self.calls.0.live.fetch_add(1, Ordering::SeqCst);
        self.search(Tier::Live, name, server_id).await
    }

    async fn fetch_detail(
        &self,
        character_id: &str,
        server_id: u32,
    ) -> Result<CharacterDetail, SourceError> {
        self.calls.0.detail.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.tier_delays.get(&Tier::Detail) {
            tokio::time::sleep(*delay).await;
        }
        self.check_failure(Tier::Detail, Some(server_id))?;
        self.details
            .get(character_id)
            .cloned()
            .ok_or_else(|| SourceError::Status {
                status: 404,
                body: format!("{} not found", character_id),
            })
    }
}

/// Recognizer returning canned text
pub(crate) struct FakeRecognizer {
    text: Option<String>,
    delay: Option<Duration>,
}

impl FakeRecognizer {
    pub(crate) fn returning(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            delay: None,
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            text: None,
            delay: None,
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl TextRecognizer for FakeRecognizer {
    async fn recognize(&self, _image: &DynamicImage) -> Result<String, RecognitionError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.text.clone().ok_or_else(|| RecognitionError::Server {
            status: 500,
            body: "recognizer unavailable".to_string(),
        })
    }
}

/// Small PNG screenshot
pub(crate) fn png_capture(width: u32, height: u32) -> Vec<u8> {
    let pixels = image::RgbImage::from_pixel(width, height, image::Rgb([200, 200, 200]));
    let image = DynamicImage::ImageRgb8(pixels);
    let mut buffer = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut buffer), image::ImageFormat::Png)
        .expect("encode test png");
    buffer
}
