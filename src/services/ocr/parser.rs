use crate::models::roster::{ParsedCandidate, PrimaryCharacter};
use crate::services::servers::ServerDirectory;
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// `name[abbreviation]`, optionally separated by whitespace
static MEMBER_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([가-힣A-Za-z0-9]+)\s*\[([가-힣A-Za-z0-9]+)\]").expect("valid member pattern")
});

const MIN_TOKEN_CHARS: usize = 2;

/// Extract up to `party_size` roster candidates from recognized text.
///
/// The primary character, when configured, always takes slot 0 whether or
/// not it appears in the text. Matches are accepted in reading order until
/// the party is full. Finding nothing is a valid, empty result.
pub fn parse_roster(
    text: &str,
    primary: Option<&PrimaryCharacter>,
    directory: &ServerDirectory,
    party_size: usize,
) -> Vec<ParsedCandidate> {
    let mut candidates: Vec<ParsedCandidate> = Vec::with_capacity(party_size);

    let primary_name = primary.map(|p| clean_name(&p.name));
    if let (Some(primary), Some(name)) = (primary, &primary_name) {
        candidates.push(ParsedCandidate {
            name: name.clone(),
            raw_abbreviation: primary.server.clone(),
            possible_servers: vec![primary.server.clone()],
            is_primary: true,
        });
    }

    let blob = text.lines().map(str::trim).collect::<Vec<_>>().join(" ");

    for caps in MEMBER_PATTERN.captures_iter(&blob) {
        if candidates.len() >= party_size {
            break;
        }

        let raw_name = &caps[1];
        let abbreviation = &caps[2];

        if is_numeric(abbreviation) {
            debug!(name = raw_name, abbreviation, "Skipping numeric abbreviation");
            continue;
        }

        let name = clean_name(raw_name);
        if !validate_token(&name) || !validate_token(abbreviation) {
            debug!(name = raw_name, abbreviation, "Skipping short token");
            continue;
        }

        if primary_name.as_deref() == Some(name.as_str())
            || candidates.iter().any(|c| c.name == name)
        {
            debug!(name = %name, "Skipping duplicate name");
            continue;
        }

        if !directory.is_known(abbreviation) {
            debug!(name = %name, abbreviation, "Unrecognized server abbreviation, kept verbatim");
        }
        let possible_servers = directory.possible_servers(abbreviation);
        debug!(name = %name, abbreviation, servers = ?possible_servers, "Parsed party member");

        candidates.push(ParsedCandidate {
            name,
            raw_abbreviation: abbreviation.to_string(),
            possible_servers,
            is_primary: false,
        });
    }

    candidates
}

/// Keep ASCII alphanumerics and Hangul syllables only
pub fn clean_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || is_hangul_syllable(*c))
        .collect()
}

fn is_hangul_syllable(c: char) -> bool {
    ('\u{AC00}'..='\u{D7A3}').contains(&c)
}

/// An all-digit abbreviation is a misread level or score
fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_digit())
}

/// Validate a name or abbreviation is long enough to be real
pub fn validate_token(token: &str) -> bool {
    token.chars().count() >= MIN_TOKEN_CHARS
}
