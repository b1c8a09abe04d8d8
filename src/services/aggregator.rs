use crate::models::roster::{AnalysisResult, Grade, PendingSelection, ResolvedMember};
use crate::services::resolver::{Resolution, SlotOutcome};
use chrono::Utc;

/// Build the final roster from resolved slots.
///
/// Slots are ordered by parse position with the primary character moved to
/// the front; pending selections get the slot index of their member in that
/// final order.
pub fn aggregate(mut outcomes: Vec<SlotOutcome>, recognized_count: usize) -> AnalysisResult {
    outcomes.sort_by_key(|o| o.slot);
    // Stable: everyone else keeps parse order
    outcomes.sort_by_key(|o| !o.candidate.is_primary);

    let mut members = Vec::with_capacity(outcomes.len());
    let mut pending_selections = Vec::new();

    for (slot_index, outcome) in outcomes.into_iter().enumerate() {
        match outcome.resolution {
            Resolution::Resolved(member) | Resolution::Unresolved(member) => members.push(member),
            Resolution::Ambiguous {
                provisional,
                candidates,
            } => {
                pending_selections.push(PendingSelection {
                    slot_index,
                    name: outcome.candidate.name.clone(),
                    raw_abbreviation: outcome.candidate.raw_abbreviation.clone(),
                    candidates,
                });
                members.push(provisional);
            }
        }
    }

    let mut result = AnalysisResult {
        members,
        total_score: 0,
        average_score: 0.0,
        grade: Grade::None,
        recognized_count,
        verified_count: 0,
        pending_selections,
        scanned_at: Utc::now(),
    };
    recompute_aggregates(&mut result);
    result
}

/// Recompute score totals, grade, MVP flags and the verified count in place
pub fn recompute_aggregates(result: &mut AnalysisResult) {
    result.total_score = total_score(&result.members);
    result.average_score = average_score(result.total_score, result.members.len());
    result.grade = grade(result.average_score, result.members.len());
    mark_mvps(&mut result.members);
    result.verified_count = result
        .members
        .iter()
        .filter(|m| m.is_from_verified_source)
        .count();
}

pub fn total_score(members: &[ResolvedMember]) -> u64 {
    members.iter().map(|m| m.combat_score as u64).sum()
}

pub fn average_score(total: u64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total as f64 / count as f64
    }
}

/// `-` for an empty party, otherwise the tier of the average score
pub fn grade(average: f64, count: usize) -> Grade {
    if count == 0 {
        Grade::None
    } else {
        Grade::from_average(average)
    }
}

/// Flag every member sharing the top score. Ties all get the flag; a top score of 0 flags nobody.
pub fn mark_mvps(members: &mut [ResolvedMember]) {
    let max = members.iter().map(|m| m.combat_score).max().unwrap_or(0);
    for member in members.iter_mut() {
        member.is_mvp = max > 0 && member.combat_score == max;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::roster::{ParsedCandidate, ServerCandidate};

    fn member(slot: usize, score: u32, verified: bool, is_primary: bool) -> ResolvedMember {
        let mut m = ResolvedMember::placeholder(
            format!("member-{}", slot),
            &format!("P{}", slot),
            "Siel".to_string(),
            is_primary,
        );
        m.combat_score = score;
        m.is_from_verified_source = verified;
        m
    }

    fn outcome(slot: usize, score: u32, is_primary: bool) -> SlotOutcome {
        SlotOutcome {
            slot,
            candidate: ParsedCandidate {
                name: format!("P{}", slot),
                raw_abbreviation: "Sie".to_string(),
                possible_servers: vec!["Siel".to_string()],
                is_primary,
            },
            resolution: Resolution::Resolved(member(slot, score, true, is_primary)),
        }
    }

    #[test]
    fn test_empty_roster() {
        let result = aggregate(Vec::new(), 0);

        assert!(result.members.is_empty());
        assert_eq!(result.grade, Grade::None);
        assert_eq!(result.total_score, 0);
        assert_eq!(result.average_score, 0.0);
        assert_eq!(result.recognized_count, 0);
        assert_eq!(result.verified_count, 0);
        assert!(result.pending_selections.is_empty());
    }

    #[test]
    fn test_totals_and_grade() {
        let result = aggregate(vec![outcome(0, 4000, false), outcome(1, 5000, false)], 2);

        assert_eq!(result.total_score, 9000);
        assert_eq!(result.average_score, 4500.0);
        assert_eq!(result.grade, Grade::S, "Exactly 4500 is S");
    }

    #[test]
    fn test_grade_b_boundary() {
        let result = aggregate(vec![outcome(0, 2000, false), outcome(1, 3000, false)], 2);
        assert_eq!(result.grade, Grade::B, "Exactly 2500 is B");
    }

    #[test]
    fn test_primary_sorted_first_others_stable() {
        let outcomes = vec![
            outcome(2, 100, false),
            outcome(0, 100, false),
            outcome(3, 100, true),
            outcome(1, 100, false),
        ];

        let result = aggregate(outcomes, 4);

        let ids: Vec<&str> = result.members.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["member-3", "member-0", "member-1", "member-2"]);
        assert!(result.members[0].is_primary);
    }

    #[test]
    fn test_tied_mvps_both_flagged() {
        let outcomes = vec![
            outcome(0, 4000, false),
            outcome(1, 4000, false),
            outcome(2, 3000, false),
        ];
        let result = aggregate(outcomes, 3);

        let mvps: Vec<bool> = result.members.iter().map(|m| m.is_mvp).collect();
        assert_eq!(mvps, vec![true, true, false]);
    }

    #[test]
    fn test_zero_scores_no_mvp() {
        let result = aggregate(vec![outcome(0, 0, false), outcome(1, 0, false)], 2);
        assert!(result.members.iter().all(|m| !m.is_mvp));
        assert_eq!(result.grade, Grade::C);
    }

    #[test]
    fn test_verified_count_excludes_placeholders() {
        let mut unresolved = outcome(1, 0, false);
        unresolved.resolution = Resolution::Unresolved(member(1, 0, false, false));

        let result = aggregate(vec![outcome(0, 3000, false), unresolved], 2);

        assert_eq!(result.recognized_count, 2);
        assert_eq!(result.verified_count, 1);
    }

    #[test]
    fn test_ambiguous_becomes_pending_selection() {
        let mut provisional = member(1, 3000, true, false);
        provisional.server = "Isrr1 (selection required)".to_string();
        let candidates = vec![
            ServerCandidate {
                server: "Isrr1".to_string(),
                server_id: Some(2),
                found: true,
                resolved_member: Some(member(1, 3000, true, false)),
            },
            ServerCandidate {
                server: "Isrr3".to_string(),
                server_id: Some(4),
                found: true,
                resolved_member: Some(member(1, 5000, true, false)),
            },
        ];
        let ambiguous = SlotOutcome {
            slot: 1,
            candidate: ParsedCandidate {
                name: "P1".to_string(),
                raw_abbreviation: "Isrr".to_string(),
                possible_servers: ["Isrr1", "Isrr2", "Isrr3"].map(String::from).to_vec(),
                is_primary: false,
            },
            resolution: Resolution::Ambiguous { provisional, candidates },
        };

        let result = aggregate(vec![outcome(0, 1000, false), ambiguous], 2);

        assert_eq!(result.members.len(), 2, "Provisional member should be in the roster");
        assert_eq!(result.pending_selections.len(), 1);
        assert_eq!(result.pending_selections[0].slot_index, 1);
        assert_eq!(result.pending_selections[0].candidates.len(), 2);
        assert_eq!(result.members[1].server, "Isrr1 (selection required)");
        assert_eq!(result.total_score, 4000);
    }
}
