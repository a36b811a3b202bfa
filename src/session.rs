// 📋 Session State - The threaded (roster, ledger, assignments) tuple
// Roster edits happen between rounds; shuffles swap in the orchestrator's result.

use crate::config::RECENCY_WINDOW;
use crate::error::SessionError;
use crate::ledger::PartnershipLedger;
use crate::participant::Participant;
use crate::round::{self, RoundOrchestrator, RoundResult};
use crate::stations::{Assignment, RoundId};
use rand::Rng;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    /// Roster in registration order
    pub participants: Vec<Participant>,

    pub ledger: PartnershipLedger,

    /// Rows of the most recent rounds (bounded to the recency window)
    pub assignments: Vec<Assignment>,

    /// Id of the last round assigned, including rounds that produced no stations
    pub latest_round: Option<RoundId>,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState::default()
    }

    // ========================================================================
    // ROSTER
    // ========================================================================

    /// Register a participant; surrounding whitespace is dropped
    pub fn add_participant(&mut self, name: &str) -> Result<&Participant, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }

        self.participants.push(Participant::new(name));
        info!(name, "participant added");
        let index = self.participants.len() - 1;
        Ok(&self.participants[index])
    }

    /// Delete a participant along with their partnerships and station slots
    pub fn remove_participant(&mut self, id: &str) -> Result<Participant, SessionError> {
        let index = self.index_of(id)?;
        let removed = self.participants.remove(index);

        self.ledger = self.ledger.without_participant(id);
        drop_from_rows(&mut self.assignments, id, None);

        info!(name = %removed.name, "participant removed");
        Ok(removed)
    }

    /// Flip checked-in status; checking out vacates the current station slot
    pub fn toggle_active(&mut self, id: &str) -> Result<bool, SessionError> {
        let index = self.index_of(id)?;
        let participant = &mut self.participants[index];
        participant.is_active = !participant.is_active;
        let now_active = participant.is_active;

        if !now_active {
            self.vacate_current_round(id);
        }
        Ok(now_active)
    }

    /// Take a break mid-session; vacates the current station slot
    pub fn pause(&mut self, id: &str) -> Result<(), SessionError> {
        let index = self.index_of(id)?;
        self.participants[index].is_paused = true;
        self.vacate_current_round(id);
        Ok(())
    }

    pub fn resume(&mut self, id: &str) -> Result<(), SessionError> {
        let index = self.index_of(id)?;
        self.participants[index].is_paused = false;
        Ok(())
    }

    // ========================================================================
    // ROUNDS
    // ========================================================================

    /// Assign a new round using the thread-local RNG
    pub fn shuffle(&mut self) -> Result<RoundResult, SessionError> {
        self.shuffle_with_rng(&mut rand::thread_rng())
    }

    /// Assign a new round; on error nothing changes
    pub fn shuffle_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<RoundResult, SessionError> {
        let result = RoundOrchestrator::new().run_round_after(
            &self.participants,
            &self.ledger,
            &self.assignments,
            self.last_round(),
            rng,
        )?;

        self.participants = result.participants.clone();
        self.ledger = result.ledger.clone();
        self.assignments.extend(result.assignments.iter().cloned());
        self.latest_round = Some(result.round_id);
        self.prune_history();

        Ok(result)
    }

    /// Empty every station; ledger and counters are kept
    pub fn clear_stations(&mut self) {
        self.assignments.clear();
    }

    /// Forget everything: roster, partnerships and assignments
    pub fn clear_all(&mut self) {
        *self = SessionState::new();
    }

    // ========================================================================
    // VIEWS
    // ========================================================================

    /// Rows of the last round; empty when that round produced no stations
    pub fn current_round(&self) -> Vec<&Assignment> {
        match self.last_round() {
            Some(round_id) => round::round_rows(&self.assignments, round_id),
            None => Vec::new(),
        }
    }

    /// Eligible participants without a station in the current round
    pub fn sitting_out(&self) -> Vec<&Participant> {
        let current = self.current_round();
        self.participants
            .iter()
            .filter(|p| p.is_eligible())
            .filter(|p| !current.iter().any(|row| row.contains(&p.id)))
            .collect()
    }

    pub fn paused(&self) -> Vec<&Participant> {
        self.participants
            .iter()
            .filter(|p| p.is_active && p.is_paused)
            .collect()
    }

    pub fn inactive(&self) -> Vec<&Participant> {
        self.participants.iter().filter(|p| !p.is_active).collect()
    }

    pub fn eligible_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_eligible()).count()
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.get(id).map(|p| p.name.as_str())
    }

    /// Look up by exact id, then by case-insensitive name
    pub fn find(&self, who: &str) -> Option<&Participant> {
        let who = who.trim();
        self.get(who).or_else(|| {
            self.participants
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(who))
        })
    }

    // ========================================================================
    // HELPERS
    // ========================================================================

    fn index_of(&self, id: &str) -> Result<usize, SessionError> {
        self.participants
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| SessionError::ParticipantNotFound(id.to_string()))
    }

    /// Stored round id, or the newest one in the rows for sessions saved without it
    fn last_round(&self) -> Option<RoundId> {
        self.latest_round.max(round::latest_round_id(&self.assignments))
    }

    fn vacate_current_round(&mut self, id: &str) {
        if let Some(round_id) = self.last_round() {
            drop_from_rows(&mut self.assignments, id, Some(round_id));
        }
    }

    /// Keep only the rows of the last RECENCY_WINDOW distinct rounds
    fn prune_history(&mut self) {
        let keep = round::recency_window(&self.assignments, RECENCY_WINDOW);
        let before = self.assignments.len();
        self.assignments.retain(|a| keep.contains(&a.round_id));
        debug!(dropped = before - self.assignments.len(), "pruned assignment history");
    }
}

/// Remove `id` from rows (of one round, or all when `only_round` is None); empty rows go away
fn drop_from_rows(rows: &mut Vec<Assignment>, id: &str, only_round: Option<RoundId>) {
    for row in rows.iter_mut() {
        if only_round.map_or(true, |r| row.round_id == r) {
            row.player_ids.retain(|p| p != id);
        }
    }
    rows.retain(|row| !row.player_ids.is_empty());
}
