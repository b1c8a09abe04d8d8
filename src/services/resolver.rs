use crate::error::SourceError;
use crate::models::character::CandidateRecord;
use crate::models::roster::{ParsedCandidate, ResolvedMember, ServerCandidate};
use crate::services::servers::ServerDirectory;
use crate::services::source::CharacterSource;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a parsed candidate ended up
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Confirmed on exactly one server
    Resolved(ResolvedMember),
    /// No source confirmed the candidate; OCR-only placeholder
    Unresolved(ResolvedMember),
    /// Confirmed on several servers; the user has to pick one
    Ambiguous {
        provisional: ResolvedMember,
        candidates: Vec<ServerCandidate>,
    },
}

impl Resolution {
    pub fn member(&self) -> &ResolvedMember {
        match self {
            Resolution::Resolved(member) | Resolution::Unresolved(member) => member,
            Resolution::Ambiguous { provisional, .. } => provisional,
        }
    }
}

/// Resolution of one roster slot, tagged with its parse position
#[derive(Debug, Clone, PartialEq)]
pub struct SlotOutcome {
    pub slot: usize,
    pub candidate: ParsedCandidate,
    pub resolution: Resolution,
}

/// Internal id of the member occupying a parse slot
pub fn member_id(slot: usize) -> String {
    format!("member-{}", slot)
}

/// Looks parsed candidates up in the character source chain
#[derive(Clone)]
pub struct EntityResolver {
    source: Arc<dyn CharacterSource>,
    directory: Arc<ServerDirectory>,
    lookup_timeout: Duration,
}

impl EntityResolver {
    pub fn new(
        source: Arc<dyn CharacterSource>,
        directory: Arc<ServerDirectory>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            source,
            directory,
            lookup_timeout,
        }
    }

    /// Resolve one candidate. Never fails: lookup problems degrade to placeholders.
    pub async fn resolve(
        &self,
        slot: usize,
        candidate: ParsedCandidate,
        cancel: &CancellationToken,
    ) -> SlotOutcome {
        let id = member_id(slot);

        let resolution = if candidate.is_ambiguous() {
            self.resolve_ambiguous(&id, &candidate, cancel).await
        } else {
            let server = &candidate.possible_servers[0];
            match self.lookup(&id, &candidate.name, server, candidate.is_primary, cancel).await {
                Some(member) => Resolution::Resolved(member),
                None => Resolution::Unresolved(ResolvedMember::placeholder(
                    id,
                    &candidate.name,
                    server.clone(),
                    candidate.is_primary,
                )),
            }
        };

        debug!(
            slot,
            name = %candidate.name,
            verified = resolution.member().is_from_verified_source,
            ambiguous = matches!(resolution, Resolution::Ambiguous { .. }),
            "Candidate resolved"
        );

        SlotOutcome {
            slot,
            candidate,
            resolution,
        }
    }

    /// Look the name up on every possible server, then classify
    async fn resolve_ambiguous(
        &self,
        id: &str,
        candidate: &ParsedCandidate,
        cancel: &CancellationToken,
    ) -> Resolution {
        let lookups = candidate.possible_servers.iter().map(|server| async move {
            let member = self
                .lookup(id, &candidate.name, server, candidate.is_primary, cancel)
                .await;
            ServerCandidate {
                server: server.clone(),
                server_id: self.directory.server_id(server),
                found: member.is_some(),
                resolved_member: member,
            }
        });

        let found: Vec<ServerCandidate> = join_all(lookups)
            .await
            .into_iter()
            .filter(|c| c.found)
            .collect();

        match found.len() {
            0 => Resolution::Unresolved(ResolvedMember::placeholder(
                id.to_string(),
                &candidate.name,
                format!("{} (unconfirmed)", candidate.raw_abbreviation),
                candidate.is_primary,
            )),
            1 => {
                let member = found
                    .into_iter()
                    .next()
                    .and_then(|c| c.resolved_member);
                match member {
                    Some(member) => Resolution::Resolved(member),
                    None => Resolution::Unresolved(ResolvedMember::placeholder(
                        id.to_string(),
                        &candidate.name,
                        format!("{} (unconfirmed)", candidate.raw_abbreviation),
                        candidate.is_primary,
                    )),
                }
            }
            _ => {
                let mut provisional = found[0]
                    .resolved_member
                    .clone()
                    .unwrap_or_else(|| {
                        ResolvedMember::placeholder(
                            id.to_string(),
                            &candidate.name,
                            String::new(),
                            candidate.is_primary,
                        )
                    });
                provisional.server = format!("{} (selection required)", found[0].server);

                Resolution::Ambiguous {
                    provisional,
                    candidates: found,
                }
            }
        }
    }

    /// Cache first, live search on a miss; exact name match within the server only
    async fn lookup(
        &self,
        id: &str,
        name: &str,
        server: &str,
        is_primary: bool,
        cancel: &CancellationToken,
    ) -> Option<ResolvedMember> {
        let Some(server_id) = self.directory.server_id(server) else {
            debug!(name, server, "Unknown server, skipping lookup");
            return None;
        };

        let cached = self
            .guarded("search_cached", cancel, self.source.search_cached(name, Some(server_id)))
            .await
            .unwrap_or_default();

        let record = match best_exact_match(cached, name, server_id) {
            Some(record) => {
                debug!(name, server, "Cache hit");
                record
            }
            None => {
                let live = self
                    .guarded("search_live", cancel, self.source.search_live(name, Some(server_id)))
                    .await
                    .unwrap_or_default();
                let record = best_exact_match(live, name, server_id)?;
                debug!(name, server, "Live search hit");
                record
            }
        };

        let mut member = ResolvedMember {
            id: id.to_string(),
            character_id: Some(record.character_id.clone()),
            name: record.name.clone(),
            class_name: record.class_name.clone(),
            combat_score: record.combat_score.unwrap_or(0),
            gear_score: record.gear_score.unwrap_or(0),
            server: server.to_string(),
            server_id: Some(server_id),
            level: record.level,
            profile_image: record.profile_image.clone(),
            is_primary,
            is_from_verified_source: true,
            is_mvp: false,
        };

        if record.combat_score.is_none() {
            let fetch = self.source.fetch_detail(&record.character_id, server_id);
            let detail = self.guarded("fetch_detail", cancel, fetch).await;

            if let Some(detail) = detail {
                member.combat_score = detail.combat_score;
                if record.gear_score.is_none() {
                    member.gear_score = detail.gear_score;
                }
                if member.class_name.is_empty() {
                    member.class_name = detail.class_name.unwrap_or_default();
                }
                if member.level == 0 {
                    member.level = detail.level.unwrap_or(0);
                }
                if member.profile_image.is_none() {
                    member.profile_image = detail.profile_image;
                }
            }
        }

        Some(member)
    }

    /// Run one source call under the lookup timeout and the scan's cancellation.
    /// Errors, timeouts and cancellation all read as "nothing found".
    async fn guarded<T, F>(
        &self,
        call: &'static str,
        cancel: &CancellationToken,
        fut: F,
    ) -> Option<T>
    where
        F: Future<Output = Result<T, SourceError>>,
    {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!(call, "Lookup cancelled");
                None
            }
            result = tokio::time::timeout(self.lookup_timeout, fut) => match result {
                Ok(Ok(value)) => Some(value),
                Ok(Err(e)) => {
                    warn!(call, error = %e, "Lookup failed, treating as not found");
                    None
                }
                Err(_) => {
                    let timeout_ms = self.lookup_timeout.as_millis() as u64;
                    warn!(call, timeout_ms, "Lookup timed out, treating as not found");
                    None
                }
            }
        }
    }
}

/// Exact-name record on the given server; the highest score wins among duplicates
fn best_exact_match(
    records: Vec<CandidateRecord>,
    name: &str,
    server_id: u32,
) -> Option<CandidateRecord> {
    records
        .into_iter()
        .filter(|r| r.name == name && r.server_id == server_id)
        .max_by_key(|r| r.combat_score.unwrap_or(0))
}
