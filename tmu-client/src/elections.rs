use std::collections::{HashMap, HashSet};

use tmu_types::{vote_percentage, Candidate, Election, ElectionStatus};

use crate::api::ElectionBackend;
use crate::error::{ActionError, ActionResult};

pub const ELECTIONS_LOAD_ERROR: &str = "Could not load elections. Please try again.";
pub const VOTE_ERROR: &str = "Could not submit vote. Please try again.";

/// Active elections with the viewer's pending choices
#[derive(Debug, Clone, Default)]
pub struct ElectionBoard {
    elections: Vec<Election>,
    selected: Option<String>,
    choices: HashMap<String, String>,
    voted: HashSet<String>,
    loading: bool,
    submitting: bool,
    error: Option<String>,
}

/// One candidate's standing in an election
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing<'a> {
    pub candidate: &'a Candidate,
    pub percentage: u32,
    pub chosen: bool,
}

impl ElectionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elections(&self) -> &[Election] {
        &self.elections
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn election(&self, election_id: &str) -> Option<&Election> {
        self.elections.iter().find(|e| e.id == election_id)
    }

    pub fn selected_election(&self) -> Option<&Election> {
        self.selected.as_deref().and_then(|id| self.election(id))
    }

    /// Fetch active elections. Keeps the current selection if it is still listed.
    pub async fn load<B: ElectionBackend + ?Sized>(&mut self, backend: &B) -> bool {
        self.loading = true;
        self.error = None;
        let result = backend.fetch_elections(Some(ElectionStatus::Active)).await;
        self.loading = false;

        match result {
            Ok(elections) => {
                self.elections = elections;
                let still_listed = self.selected_election().is_some();
                if !still_listed {
                    self.selected = self.elections.first().map(|e| e.id.clone());
                }
                true
            }
            Err(e) => {
                log::warn!("Failed to load elections: {}", e);
                self.error = Some(ELECTIONS_LOAD_ERROR.to_string());
                false
            }
        }
    }

    pub fn select_election(&mut self, election_id: &str) -> ActionResult<()> {
        if self.election(election_id).is_none() {
            return Err(ActionError::ElectionNotFound(election_id.to_string()));
        }
        self.selected = Some(election_id.to_string());
        Ok(())
    }

    /// Whether the viewer voted, by the backend's record or in this session
    pub fn has_voted(&self, election_id: &str) -> bool {
        self.voted.contains(election_id) || self.election(election_id).is_some_and(|e| e.has_voted)
    }

    pub fn choice(&self, election_id: &str) -> Option<&str> {
        self.choices.get(election_id).map(String::as_str)
    }

    /// Pick a candidate. Ignored once the election is voted; returns whether the choice was taken.
    pub fn select_candidate(&mut self, election_id: &str, candidate_id: &str) -> ActionResult<bool> {
        let election = self
            .election(election_id)
            .ok_or_else(|| ActionError::ElectionNotFound(election_id.to_string()))?;
        if election.candidate(candidate_id).is_none() {
            return Ok(false);
        }
        if self.has_voted(election_id) {
            return Ok(false);
        }
        self.choices.insert(election_id.to_string(), candidate_id.to_string());
        Ok(true)
    }

    /// Cast the chosen vote, then reload the tallies.
    ///
    /// Returns Ok(false) without contacting the backend when nothing is chosen,
    /// the election is already voted, or a vote is being submitted.
    pub async fn vote<B: ElectionBackend + ?Sized>(&mut self, backend: &B, election_id: &str) -> ActionResult<bool> {
        let Some(candidate_id) = self.choices.get(election_id).cloned() else {
            return Ok(false);
        };
        if self.submitting || self.has_voted(election_id) {
            return Ok(false);
        }

        self.submitting = true;
        let result = backend.vote(election_id, &[candidate_id]).await;
        self.submitting = false;

        if let Err(e) = result {
            log::warn!("Vote in {} failed: {}", election_id, e);
            self.error = Some(VOTE_ERROR.to_string());
            return Err(e.into());
        }

        log::info!("Vote recorded in {}", election_id);
        self.voted.insert(election_id.to_string());
        self.load(backend).await;
        Ok(true)
    }

    /// Candidates with rounded vote shares
    pub fn standings(&self, election_id: &str) -> Vec<Standing<'_>> {
        let Some(election) = self.election(election_id) else {
            return Vec::new();
        };
        let total = election.total_votes();
        let chosen = self.choice(election_id);
        election
            .candidates
            .iter()
            .map(|candidate| Standing {
                candidate,
                percentage: vote_percentage(candidate.votes, total),
                chosen: chosen == Some(candidate.id.as_str()),
            })
            .collect()
    }
}
