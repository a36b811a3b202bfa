// 📒 Partnership Ledger - Who has shared a station with whom, and when
// Keys are unordered pairs: (a, b) and (b, a) are the same partnership

use crate::config::RECENT_ROUNDS_CAP;
use crate::stations::RoundId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

// ============================================================================
// PAIR KEY
// ============================================================================

/// Canonical unordered pair of participant ids (lexicographically smaller first)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            PairKey {
                first: a.to_string(),
                second: b.to_string(),
            }
        } else {
            PairKey {
                first: b.to_string(),
                second: a.to_string(),
            }
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn involves(&self, participant_id: &str) -> bool {
        self.first == participant_id || self.second == participant_id
    }
}

// ============================================================================
// PARTNERSHIP
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partnership {
    /// Rounds shared (>= 1 once created)
    pub times_played: u32,

    /// Most recent last, at most RECENT_ROUNDS_CAP entries
    pub recent_rounds: Vec<RoundId>,
}

impl Partnership {
    fn record(&mut self, round_id: RoundId) {
        self.times_played += 1;
        self.recent_rounds.push(round_id);
        if self.recent_rounds.len() > RECENT_ROUNDS_CAP {
            let excess = self.recent_rounds.len() - RECENT_ROUNDS_CAP;
            self.recent_rounds.drain(..excess);
        }
    }
}

// ============================================================================
// LEDGER
// ============================================================================

/// Value-semantics ledger: updates return a new ledger and leave `self` alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartnershipLedger {
    entries: BTreeMap<PairKey, Partnership>,
}

impl PartnershipLedger {
    pub fn new() -> Self {
        PartnershipLedger::default()
    }

    /// Rebuild a ledger from stored rows
    pub fn from_entries(entries: impl IntoIterator<Item = (PairKey, Partnership)>) -> Self {
        PartnershipLedger {
            entries: entries.into_iter().collect(),
        }
    }

    /// Times `a` and `b` have shared a station (0 if never)
    pub fn count_together(&self, a: &str, b: &str) -> u32 {
        self.get(a, b).map(|p| p.times_played).unwrap_or(0)
    }

    /// Up to three most recent rounds shared by `a` and `b`, most recent last
    pub fn recent_rounds(&self, a: &str, b: &str) -> &[RoundId] {
        self.get(a, b)
            .map(|p| p.recent_rounds.as_slice())
            .unwrap_or(&[])
    }

    /// Whether `a` and `b` shared a station in any round of `window`
    pub fn played_within(&self, a: &str, b: &str, window: &HashSet<RoundId>) -> bool {
        self.recent_rounds(a, b).iter().any(|r| window.contains(r))
    }

    pub fn get(&self, a: &str, b: &str) -> Option<&Partnership> {
        self.entries.get(&PairKey::new(a, b))
    }

    /// Record every pairwise combination among the station's occupants
    pub fn record_station<S: AsRef<str>>(&self, participant_ids: &[S], round_id: RoundId) -> Self {
        let mut next = self.clone();
        next.record_station_in_place(participant_ids, round_id);
        next
    }

    pub(crate) fn record_station_in_place<S: AsRef<str>>(
        &mut self,
        participant_ids: &[S],
        round_id: RoundId,
    ) {
        // Occupants form a set; repeated ids count once
        let occupants: Vec<&str> = participant_ids
            .iter()
            .map(|id| id.as_ref())
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .collect();

        for i in 0..occupants.len() {
            for j in (i + 1)..occupants.len() {
                let (a, b) = (occupants[i], occupants[j]);

                self.entries
                    .entry(PairKey::new(a, b))
                    .or_insert_with(|| Partnership {
                        times_played: 0,
                        recent_rounds: Vec::new(),
                    })
                    .record(round_id);
            }
        }
    }

    /// Drop every partnership involving `participant_id`
    pub fn without_participant(&self, participant_id: &str) -> Self {
        PartnershipLedger {
            entries: self
                .entries
                .iter()
                .filter(|(key, _)| !key.involves(participant_id))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PairKey, &Partnership)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
