// 🤝 Team Pairer - Greedy teammate selection by fewest shared rounds
// Candidates seen within the recency window are vetoed unless nobody else is left.

use crate::ledger::PartnershipLedger;
use crate::participant::Participant;
use crate::stations::RoundId;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

// ============================================================================
// TEAM
// ============================================================================

/// Two teammates, in the order they were paired
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team {
    pub first: String,
    pub second: String,
}

impl Team {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Team {
            first: first.into(),
            second: second.into(),
        }
    }

    pub fn members(&self) -> [&str; 2] {
        [self.first.as_str(), self.second.as_str()]
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.first == participant_id || self.second == participant_id
    }
}

// ============================================================================
// PAIRING OUTCOME
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct PairingOutcome {
    /// Every playing participant exactly once
    pub teams: Vec<Team>,

    /// Teams formed by ignoring the recency veto (subset of `teams`)
    pub forced_repeats: Vec<Team>,
}

// ============================================================================
// TEAM PAIRER
// ============================================================================

#[derive(Debug, Default)]
pub struct TeamPairer;

impl TeamPairer {
    pub fn new() -> Self {
        TeamPairer
    }

    /// Pair the whole playing pool.
    ///
    /// `recency_window` holds the ids of the most recent distinct rounds.
    pub fn pair<R: Rng + ?Sized>(
        &self,
        playing: &[Participant],
        ledger: &PartnershipLedger,
        recency_window: &HashSet<RoundId>,
        rng: &mut R,
    ) -> PairingOutcome {
        // Name order drives the scan; the shuffle only settles equal names
        let mut order = playing.to_vec();
        order.shuffle(rng);
        order.sort_by(|a, b| a.name.cmp(&b.name));

        let mut claimed = vec![false; order.len()];
        let mut outcome = PairingOutcome::default();

        for i in 0..order.len() {
            if claimed[i] {
                continue;
            }

            let unclaimed: Vec<usize> = (0..order.len())
                .filter(|&j| j != i && !claimed[j])
                .collect();

            let current = &order[i].id;
            let fresh: Vec<usize> = unclaimed
                .iter()
                .copied()
                .filter(|&j| !ledger.played_within(current, &order[j].id, recency_window))
                .collect();

            let (partner, forced) = match Self::fewest_shared(current, &fresh, &order, ledger) {
                Some(j) => (j, false),
                None => match Self::fewest_shared(current, &unclaimed, &order, ledger) {
                    Some(j) => (j, true),
                    None => break,
                },
            };

            claimed[i] = true;
            claimed[partner] = true;

            let team = Team::new(current.clone(), order[partner].id.clone());
            if forced {
                warn!(
                    first = %order[i].name,
                    second = %order[partner].name,
                    "no fresh teammate left, repeating a recent pairing"
                );
                outcome.forced_repeats.push(team.clone());
            }
            outcome.teams.push(team);
        }

        outcome
    }

    /// Candidate with the strictly lowest count; earliest in scan order wins ties
    fn fewest_shared(
        current: &str,
        candidates: &[usize],
        order: &[Participant],
        ledger: &PartnershipLedger,
    ) -> Option<usize> {
        let mut best: Option<(usize, u32)> = None;
        for &j in candidates {
            let count = ledger.count_together(current, &order[j].id);
            match best {
                Some((_, best_count)) if count >= best_count => {}
                _ => best = Some((j, count)),
            }
        }
        best.map(|(j, _)| j)
    }
}
