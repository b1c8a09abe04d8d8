pub mod error;
pub mod models;
pub mod services;

pub use error::{ConfigError, RecognitionError, ScanError, SelectionError, SetupError, SourceError};
pub use models::config::ScannerConfig;
pub use models::roster::{
    AnalysisResult, Grade, ParsedCandidate, PendingSelection, PrimaryCharacter, RawCapture,
    ResolvedMember, SelectionChoice, ServerCandidate,
};
pub use services::config::{ConfigManager, MemoryPreferenceStore, PreferenceStore};
pub use services::party_scanner::{PartyScanner, ScanStage, ScanStatus};
pub use services::selection::{apply_selection, choose_candidate};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// filter. Calling this more than once is a no-op.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("party_scanner_lib=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
