use crate::error::SelectionError;
use crate::models::roster::{AnalysisResult, SelectionChoice};
use crate::services::aggregator::recompute_aggregates;
use tracing::info;

/// Settle a pending ambiguous slot with the user's choice.
///
/// The member keeps its internal id and primary flag. Once a slot is settled
/// its pending selection is gone, so repeating the call fails with
/// `NoPendingSelection` and leaves the result untouched.
pub fn apply_selection(
    result: &mut AnalysisResult,
    slot_index: usize,
    choice: SelectionChoice,
) -> Result<(), SelectionError> {
    let position = result
        .pending_selections
        .iter()
        .position(|p| p.slot_index == slot_index)
        .ok_or(SelectionError::NoPendingSelection { slot_index })?;

    let pending = &result.pending_selections[position];
    if !pending.candidates.iter().any(|c| c.server == choice.server) {
        return Err(SelectionError::UnknownCandidate {
            slot_index,
            server: choice.server,
        });
    }

    let Some(current) = result.members.get(slot_index) else {
        return Err(SelectionError::NoPendingSelection { slot_index });
    };

    let mut member = choice.member;
    member.id = current.id.clone();
    member.is_primary = current.is_primary;
    member.server = choice.server;
    member.is_from_verified_source = true;

    info!(slot_index, name = %member.name, server = %member.server, "Applied server selection");

    result.members[slot_index] = member;
    result.pending_selections.remove(position);
    recompute_aggregates(result);

    Ok(())
}

/// Settle a pending slot with one of its own candidates, by index
pub fn choose_candidate(
    result: &mut AnalysisResult,
    slot_index: usize,
    candidate_index: usize,
) -> Result<(), SelectionError> {
    let pending = result
        .pending_for_slot(slot_index)
        .ok_or(SelectionError::NoPendingSelection { slot_index })?;

    let candidate = pending
        .candidates
        .get(candidate_index)
        .ok_or(SelectionError::CandidateIndexOutOfRange {
            slot_index,
            index: candidate_index,
        })?;

    let member = candidate
        .resolved_member
        .clone()
        .ok_or(SelectionError::CandidateIndexOutOfRange {
            slot_index,
            index: candidate_index,
        })?;

    let choice = SelectionChoice {
        server: candidate.server.clone(),
        member,
    };
    apply_selection(result, slot_index, choice)
}
