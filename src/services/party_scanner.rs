use crate::error::{RecognitionError, ScanError, SetupError};
use crate::models::config::{LookupConfig, PreprocessingConfig, ScannerConfig, MAX_PARTY_SIZE};
use crate::models::roster::{AnalysisResult, PrimaryCharacter, RawCapture};
use crate::services::aggregator::aggregate;
use crate::services::config::PreferenceStore;
use crate::services::ocr::{parse_roster, HttpOcrClient, PreprocessingService, TextRecognizer};
use crate::services::resolver::EntityResolver;
use crate::services::servers::ServerDirectory;
use crate::services::source::{CharacterSource, RestCharacterSource};
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pipeline stage of the most recent scan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", content = "detail", rename_all = "camelCase")]
pub enum ScanStage {
    Idle,
    Preprocessing,
    Recognizing,
    Parsing,
    Resolving { done: usize, total: usize },
    Completed,
    Failed(String),
}

/// Progress snapshot published to subscribers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanStatus {
    pub generation: u64,
    pub stage: ScanStage,
}

/// Token of the scan currently in flight
struct ActiveScan {
    generation: u64,
    token: CancellationToken,
}

/// Screenshot to party roster: preprocess, recognize, parse, resolve, aggregate.
///
/// Only the latest scan counts. Starting a scan cancels the one in flight,
/// which then returns `ScanError::Cancelled` instead of a result.
pub struct PartyScanner {
    recognizer: Arc<dyn TextRecognizer>,
    resolver: EntityResolver,
    directory: Arc<ServerDirectory>,
    preprocessing: PreprocessingConfig,
    lookup: LookupConfig,
    ocr_timeout: Duration,
    /// Guards the generation bump, token swap and status publishing
    current: Mutex<Option<ActiveScan>>,
    generation: AtomicU64,
    status: watch::Sender<ScanStatus>,
}

impl PartyScanner {
    pub fn new(
        config: &ScannerConfig,
        directory: ServerDirectory,
        recognizer: Arc<dyn TextRecognizer>,
        source: Arc<dyn CharacterSource>,
    ) -> Self {
        let directory = Arc::new(directory);
        let resolver = EntityResolver::new(
            source,
            Arc::clone(&directory),
            Duration::from_millis(config.lookup.lookup_timeout_ms),
        );
        let (status, _) = watch::channel(ScanStatus {
            generation: 0,
            stage: ScanStage::Idle,
        });

        Self {
            recognizer,
            resolver,
            directory,
            preprocessing: config.preprocessing.clone(),
            lookup: config.lookup.clone(),
            ocr_timeout: Duration::from_secs(config.ocr.timeout_secs),
            current: Mutex::new(None),
            generation: AtomicU64::new(0),
            status,
        }
    }

    /// Scanner wired to the HTTP OCR server and the REST character sources
    pub fn from_config(config: &ScannerConfig) -> Result<Self, SetupError> {
        let recognizer = HttpOcrClient::new(&config.ocr)?;
        let source = RestCharacterSource::new(&config.source)?;

        info!(
            ocr = %config.ocr.base_url,
            cache = %config.source.cache_url,
            live = %config.source.live_url,
            "Party scanner configured"
        );

        Ok(Self::new(
            config,
            ServerDirectory::default(),
            Arc::new(recognizer),
            Arc::new(source),
        ))
    }

    /// Watch scan progress
    pub fn subscribe(&self) -> watch::Receiver<ScanStatus> {
        self.status.subscribe()
    }

    /// Cancel the scan in flight, if any
    pub fn cancel(&self) {
        if let Some(active) = self.current.lock().take() {
            active.token.cancel();
        }
    }

    /// Scan a screenshot
    pub async fn scan(
        &self,
        capture: RawCapture,
        primary: Option<PrimaryCharacter>,
    ) -> Result<AnalysisResult, ScanError> {
        let (generation, token) = self.begin();
        let started = Instant::now();
        info!(
            scan = generation,
            bytes = capture.bytes.len(),
            crop = capture.crop_to_party_bar,
            "Scan started"
        );

        let result = self.run_scan(generation, &token, capture, primary).await;
        self.finish(generation, started, result)
    }

    /// Scan a screenshot, reading the primary character from `preferences` first.
    /// An unreadable preference scans without a primary character.
    pub async fn scan_with_preferences(
        &self,
        capture: RawCapture,
        preferences: &dyn PreferenceStore,
    ) -> Result<AnalysisResult, ScanError> {
        let primary = preferences.load_primary().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load primary character, scanning without it");
            None
        });
        self.scan(capture, primary).await
    }

    /// Run the pipeline on text recognized elsewhere
    pub async fn analyze_text(
        &self,
        text: &str,
        primary: Option<PrimaryCharacter>,
    ) -> Result<AnalysisResult, ScanError> {
        let (generation, token) = self.begin();
        let started = Instant::now();
        info!(scan = generation, chars = text.chars().count(), "Text analysis started");

        let result = self.analyze(generation, &token, text, primary).await;
        self.finish(generation, started, result)
    }

    async fn run_scan(
        &self,
        generation: u64,
        token: &CancellationToken,
        capture: RawCapture,
        primary: Option<PrimaryCharacter>,
    ) -> Result<AnalysisResult, ScanError> {
        self.publish(generation, ScanStage::Preprocessing);

        let config = self.preprocessing.clone();
        let RawCapture {
            bytes,
            crop_to_party_bar,
        } = capture;
        let image = tokio::task::spawn_blocking(move || {
            PreprocessingService::new(config).preprocess_bytes(&bytes, crop_to_party_bar)
        })
        .await
        .map_err(|e| ScanError::Preprocess(e.to_string()))??;

        self.ensure_current(generation, token)?;
        self.publish(generation, ScanStage::Recognizing);
        debug!(
            scan = generation,
            width = image.width(),
            height = image.height(),
            "Recognizing text"
        );

        let text = tokio::select! {
            _ = token.cancelled() => return Err(ScanError::Cancelled),
            result = tokio::time::timeout(self.ocr_timeout, self.recognizer.recognize(&image)) => {
                result.map_err(|_| RecognitionError::Timeout(self.ocr_timeout))??
            }
        };

        self.ensure_current(generation, token)?;
        self.analyze(generation, token, &text, primary).await
    }

    async fn analyze(
        &self,
        generation: u64,
        token: &CancellationToken,
        text: &str,
        primary: Option<PrimaryCharacter>,
    ) -> Result<AnalysisResult, ScanError> {
        self.publish(generation, ScanStage::Parsing);

        let party_size = self.lookup.party_size.min(MAX_PARTY_SIZE);
        let candidates = parse_roster(text, primary.as_ref(), &self.directory, party_size);
        let total = candidates.len();
        info!(scan = generation, candidates = total, "Parsed roster");

        self.publish(generation, ScanStage::Resolving { done: 0, total });

        // Completion order is arbitrary; outcomes carry their slot
        let resolver = &self.resolver;
        let mut lookups = stream::iter(candidates.into_iter().enumerate())
            .map(|(slot, candidate)| resolver.resolve(slot, candidate, token))
            .buffer_unordered(self.lookup.max_concurrent_lookups.max(1));

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = lookups.next().await {
            outcomes.push(outcome);
            self.publish(
                generation,
                ScanStage::Resolving {
                    done: outcomes.len(),
                    total,
                },
            );
        }

        self.ensure_current(generation, token)?;
        Ok(aggregate(outcomes, total))
    }

    /// Register a new scan, cancelling the previous one
    fn begin(&self) -> (u64, CancellationToken) {
        let token = CancellationToken::new();
        let mut current = self.current.lock();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = current.replace(ActiveScan {
            generation,
            token: token.clone(),
        });
        if let Some(previous) = previous {
            previous.token.cancel();
        }
        (generation, token)
    }

    fn ensure_current(&self, generation: u64, token: &CancellationToken) -> Result<(), ScanError> {
        if token.is_cancelled() || self.generation.load(Ordering::SeqCst) != generation {
            Err(ScanError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Publish progress, unless a newer scan owns the status
    fn publish(&self, generation: u64, stage: ScanStage) {
        let _current = self.current.lock();
        if self.generation.load(Ordering::SeqCst) == generation {
            self.status.send_replace(ScanStatus { generation, stage });
        }
    }

    fn finish(
        &self,
        generation: u64,
        started: Instant,
        result: Result<AnalysisResult, ScanError>,
    ) -> Result<AnalysisResult, ScanError> {
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(analysis) => {
                info!(
                    scan = generation,
                    members = analysis.members.len(),
                    verified = analysis.verified_count,
                    pending = analysis.pending_selections.len(),
                    grade = analysis.grade.as_str(),
                    elapsed_ms,
                    "Scan completed"
                );
                if analysis.has_pending_selections() {
                    info!(scan = generation, "Roster awaits a server selection");
                }
                self.publish(generation, ScanStage::Completed);
            }
            Err(ScanError::Cancelled) => {
                info!(scan = generation, elapsed_ms, "Scan superseded");
            }
            Err(e) => {
                error!(scan = generation, error = %e, elapsed_ms, "Scan failed");
                self.publish(generation, ScanStage::Failed(e.to_string()));
            }
        }

        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|active| active.generation == generation) {
            current.take();
        }
        drop(current);

        result
    }
}
