use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw screenshot handed to the scanner
#[derive(Debug, Clone, PartialEq)]
pub struct RawCapture {
    pub bytes: Vec<u8>,
    /// Only scan the fixed party bar region at the bottom of the screen
    pub crop_to_party_bar: bool,
}

impl RawCapture {
    pub fn new(bytes: Vec<u8>, crop_to_party_bar: bool) -> Self {
        Self {
            bytes,
            crop_to_party_bar,
        }
    }
}

/// User's "main character", always assumed to occupy slot 1
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PrimaryCharacter {
    pub name: String,
    pub server: String,
}

/// A `name[abbreviation]` pair pulled out of OCR text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCandidate {
    pub name: String,
    pub raw_abbreviation: String,
    /// Full server names the abbreviation could denote (never empty)
    pub possible_servers: Vec<String>,
    pub is_primary: bool,
}

impl ParsedCandidate {
    pub fn is_ambiguous(&self) -> bool {
        self.possible_servers.len() > 1
    }
}

/// Party member as shown in the roster
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedMember {
    /// Internal slot id, stable across manual selection
    pub id: String,
    pub character_id: Option<String>,
    pub name: String,
    pub class_name: String,
    pub combat_score: u32,
    pub gear_score: u32,
    pub server: String,
    pub server_id: Option<u32>,
    pub level: u32,
    pub profile_image: Option<String>,
    pub is_primary: bool,
    /// False for OCR-only placeholders
    pub is_from_verified_source: bool,
    pub is_mvp: bool,
}

impl ResolvedMember {
    /// Placeholder for a slot no source could confirm
    pub fn placeholder(id: String, name: &str, server_label: String, is_primary: bool) -> Self {
        Self {
            id,
            character_id: None,
            name: name.to_string(),
            class_name: String::new(),
            combat_score: 0,
            gear_score: 0,
            server: server_label,
            server_id: None,
            level: 0,
            profile_image: None,
            is_primary,
            is_from_verified_source: false,
            is_mvp: false,
        }
    }
}

/// Lookup result for one of several possible servers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerCandidate {
    pub server: String,
    pub server_id: Option<u32>,
    pub found: bool,
    pub resolved_member: Option<ResolvedMember>,
}

/// Slot waiting for the user to pick among several verified servers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingSelection {
    pub slot_index: usize,
    pub name: String,
    pub raw_abbreviation: String,
    /// Only candidates that were found
    pub candidates: Vec<ServerCandidate>,
}

/// The user's pick for a pending slot
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChoice {
    pub server: String,
    pub member: ResolvedMember,
}

/// Party grade tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Grade {
    S,
    A,
    B,
    C,
    #[serde(rename = "-")]
    None,
}

impl Grade {
    /// Grade by average combat score; thresholds are inclusive
    pub fn from_average(average: f64) -> Self {
        if average >= 4500.0 {
            Grade::S
        } else if average >= 3500.0 {
            Grade::A
        } else if average >= 2500.0 {
            Grade::B
        } else {
            Grade::C
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::None => "-",
        }
    }
}

/// Outcome of one scan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Primary first, then parse order
    pub members: Vec<ResolvedMember>,
    pub total_score: u64,
    pub average_score: f64,
    pub grade: Grade,
    pub recognized_count: usize,
    pub verified_count: usize,
    pub pending_selections: Vec<PendingSelection>,
    pub scanned_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn has_pending_selections(&self) -> bool {
        !self.pending_selections.is_empty()
    }

    pub fn pending_for_slot(&self, slot_index: usize) -> Option<&PendingSelection> {
        self.pending_selections
            .iter()
            .find(|p| p.slot_index == slot_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_boundaries_inclusive() {
        assert_eq!(Grade::from_average(4500.0), Grade::S);
        assert_eq!(Grade::from_average(4499.9), Grade::A);
        assert_eq!(Grade::from_average(3500.0), Grade::A);
        assert_eq!(Grade::from_average(2500.0), Grade::B);
        assert_eq!(Grade::from_average(2499.0), Grade::C);
        assert_eq!(Grade::from_average(0.0), Grade::C);
    }

    #[test]
    fn test_grade_serializes_as_letter() {
        assert_eq!(serde_json::to_string(&Grade::S).unwrap(), "\"S\"");
        assert_eq!(serde_json::to_string(&Grade::None).unwrap(), "\"-\"");
        assert_eq!(Grade::None.as_str(), "-");
    }

    #[test]
    fn test_placeholder_is_unverified() {
        let member =
            ResolvedMember::placeholder("member-1".to_string(), "Kael", "Siel".to_string(), false);
        assert!(!member.is_from_verified_source);
        assert_eq!(member.combat_score, 0);
        assert_eq!(member.gear_score, 0);
        assert_eq!(member.server, "Siel");
    }

    #[test]
    fn test_member_serializes_camel_case() {
        let member =
            ResolvedMember::placeholder("member-0".to_string(), "Kael", "Siel".to_string(), true);
        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(json["isPrimary"], true);
        assert_eq!(json["isFromVerifiedSource"], false);
        assert_eq!(json["combatScore"], 0);
    }
}
