// 🎲 Round Orchestrator - One round-assignment transaction
// sit-outs → teams → stations → ledger → sit-out counters, all from one snapshot

use crate::config::RECENCY_WINDOW;
use crate::error::RoundError;
use crate::ledger::PartnershipLedger;
use crate::pairing::{PairingOutcome, Team, TeamPairer};
use crate::participant::{eligible_pool, Participant};
use crate::sit_out::SitOutScheduler;
use crate::stations::{Assignment, RoundId, StationPacker};
use rand::Rng;
use std::collections::{BTreeSet, HashSet};
use tracing::info;

// ============================================================================
// HISTORY VIEWS
// ============================================================================

/// Most recent round id present in the history
pub fn latest_round_id(history: &[Assignment]) -> Option<RoundId> {
    history.iter().map(|a| a.round_id).max()
}

/// Rows of the most recent round, ordered by station number
pub fn current_round(history: &[Assignment]) -> Vec<&Assignment> {
    match latest_round_id(history) {
        Some(latest) => round_rows(history, latest),
        None => Vec::new(),
    }
}

/// Rows of one round, ordered by station number (empty for a round with no stations)
pub fn round_rows(history: &[Assignment], round_id: RoundId) -> Vec<&Assignment> {
    let mut rows: Vec<&Assignment> = history.iter().filter(|a| a.round_id == round_id).collect();
    rows.sort_by_key(|a| a.station_number);
    rows
}

/// The `size` most recent distinct round ids
pub fn recency_window(history: &[Assignment], size: usize) -> HashSet<RoundId> {
    let distinct: BTreeSet<RoundId> = history.iter().map(|a| a.round_id).collect();
    distinct.into_iter().rev().take(size).collect()
}

/// Eligible participants who were left out of the most recent round
pub fn previous_sit_outs(pool: &[Participant], history: &[Assignment]) -> HashSet<String> {
    sat_out_of_round(pool, history, latest_round_id(history))
}

/// Eligible participants left out of `round_id`; a round without stations benched everyone
pub fn sat_out_of_round(
    pool: &[Participant],
    history: &[Assignment],
    round_id: Option<RoundId>,
) -> HashSet<String> {
    let Some(round_id) = round_id else {
        return HashSet::new();
    };

    let current = round_rows(history, round_id);
    pool.iter()
        .filter(|p| !current.iter().any(|row| row.contains(&p.id)))
        .map(|p| p.id.clone())
        .collect()
}

// ============================================================================
// ROUND RESULT
// ============================================================================

#[derive(Debug, Clone)]
pub struct RoundResult {
    /// Identifier shared by every new row
    pub round_id: RoundId,

    /// New station rows (possibly empty for pools under four)
    pub assignments: Vec<Assignment>,

    /// Ledger including this round's stations
    pub ledger: PartnershipLedger,

    /// Full roster with updated sit-out counters
    pub participants: Vec<Participant>,

    /// Ids benched this round
    pub sitting_out: Vec<String>,

    /// Teams formed by breaking the recency veto
    pub forced_repeats: Vec<Team>,
}

impl RoundResult {
    pub fn teams(&self) -> usize {
        self.assignments.iter().map(|a| a.player_ids.len() / 2).sum()
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct RoundOrchestrator {
    pub scheduler: SitOutScheduler,
    pub pairer: TeamPairer,
    pub packer: StationPacker,

    /// Distinct recent rounds whose pairings are vetoed (default: 3)
    pub recency_window: usize,
}

impl Default for RoundOrchestrator {
    fn default() -> Self {
        RoundOrchestrator::new()
    }
}

impl RoundOrchestrator {
    pub fn new() -> Self {
        RoundOrchestrator {
            scheduler: SitOutScheduler::new(),
            pairer: TeamPairer::new(),
            packer: StationPacker::new(),
            recency_window: RECENCY_WINDOW,
        }
    }

    /// Run one round with the thread-local RNG
    pub fn run_round(
        &self,
        participants: &[Participant],
        ledger: &PartnershipLedger,
        prior_assignments: &[Assignment],
    ) -> Result<RoundResult, RoundError> {
        self.run_round_with_rng(participants, ledger, prior_assignments, &mut rand::thread_rng())
    }

    /// Run one round drawing every shuffle from `rng`.
    ///
    /// Inputs are never modified; the returned result carries the new state.
    pub fn run_round_with_rng<R: Rng + ?Sized>(
        &self,
        participants: &[Participant],
        ledger: &PartnershipLedger,
        prior_assignments: &[Assignment],
        rng: &mut R,
    ) -> Result<RoundResult, RoundError> {
        let last_round = latest_round_id(prior_assignments);
        self.run_round_after(participants, ledger, prior_assignments, last_round, rng)
    }

    /// Run a round that follows `last_round`, which may have produced no stations
    pub fn run_round_after<R: Rng + ?Sized>(
        &self,
        participants: &[Participant],
        ledger: &PartnershipLedger,
        prior_assignments: &[Assignment],
        last_round: Option<RoundId>,
        rng: &mut R,
    ) -> Result<RoundResult, RoundError> {
        let pool = eligible_pool(participants);
        if pool.is_empty() {
            return Err(RoundError::NoEligibleParticipants);
        }

        let last_round = last_round.max(latest_round_id(prior_assignments));
        let sat_out_last_round = sat_out_of_round(&pool, prior_assignments, last_round);
        let window = recency_window(prior_assignments, self.recency_window);
        let round_id = RoundId::next_after(last_round);

        // 1. Who waits
        let selection = self.scheduler.select(&pool, &sat_out_last_round, rng);

        // 2. Teammates
        let PairingOutcome {
            teams,
            forced_repeats,
        } = self.pairer.pair(&selection.playing, ledger, &window, rng);

        // 3. Stations
        let assignments = self.packer.pack(&teams, round_id, rng);

        // 4. Ledger: every pair sharing a station
        let mut next_ledger = ledger.clone();
        for row in &assignments {
            next_ledger.record_station_in_place(row.player_ids.as_slice(), round_id);
        }

        // 5. Sit-out counters
        let sitting_out = selection.sitting_out_ids();
        let benched: HashSet<&str> = sitting_out.iter().map(String::as_str).collect();
        let updated: Vec<Participant> = participants
            .iter()
            .map(|p| {
                let mut p = p.clone();
                if benched.contains(p.id.as_str()) {
                    p.sit_out_count += 1;
                }
                p
            })
            .collect();

        info!(
            round = %round_id,
            stations = assignments.len(),
            sitting_out = sitting_out.len(),
            forced_repeats = forced_repeats.len(),
            "round assigned"
        );

        Ok(RoundResult {
            round_id,
            assignments,
            ledger: next_ledger,
            participants: updated,
            sitting_out,
            forced_repeats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_PLAYING;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn roster(n: usize) -> Vec<Participant> {
        (0..n)
            .map(|i| Participant::with_id(format!("p{:02}", i), format!("Player {:02}", i)))
            .collect()
    }

    fn placed_ids(rows: &[Assignment]) -> HashSet<String> {
        rows.iter().flat_map(|r| r.player_ids.iter().cloned()).collect()
    }

    #[test]
    fn test_empty_pool_is_rejected() {
        let orchestrator = RoundOrchestrator::new();
        let err = orchestrator
            .run_round(&[], &PartnershipLedger::new(), &[])
            .unwrap_err();
        assert_eq!(err, RoundError::NoEligibleParticipants);

        let mut everyone_paused = roster(4);
        for p in everyone_paused.iter_mut() {
            p.is_paused = true;
        }
        let err = orchestrator
            .run_round(&everyone_paused, &PartnershipLedger::new(), &[])
            .unwrap_err();
        assert_eq!(err, RoundError::NoEligibleParticipants);
    }

    #[test]
    fn test_eight_players_fresh_ledger() {
        let mut rng = StdRng::seed_from_u64(8);
        let players = roster(8);

        let result = RoundOrchestrator::new()
            .run_round_with_rng(&players, &PartnershipLedger::new(), &[], &mut rng)
            .unwrap();

        assert_eq!(result.assignments.len(), 2);
        assert_eq!(result.teams(), 4);
        assert!(result.sitting_out.is_empty());
        assert_eq!(result.ledger.len(), 12);
        assert!(result.ledger.iter().all(|(_, p)| p.times_played == 1));
        assert!(result.participants.iter().all(|p| p.sit_out_count == 0));
        assert!(result.assignments.iter().all(|a| a.round_id == result.round_id));
        assert_eq!(placed_ids(&result.assignments).len(), 8);
    }

    #[test]
    fn test_five_players_rotate_sit_out() {
        let mut rng = StdRng::seed_from_u64(5);
        let orchestrator = RoundOrchestrator::new();

        let first = orchestrator
            .run_round_with_rng(&roster(5), &PartnershipLedger::new(), &[], &mut rng)
            .unwrap();
        assert_eq!(first.assignments.len(), 1);
        assert_eq!(first.sitting_out.len(), 1);
        let benched = first.sitting_out[0].clone();
        let benched_count = first
            .participants
            .iter()
            .find(|p| p.id == benched)
            .map(|p| p.sit_out_count);
        assert_eq!(benched_count, Some(1));

        let second = orchestrator
            .run_round_with_rng(&first.participants, &first.ledger, &first.assignments, &mut rng)
            .unwrap();
        assert_eq!(second.sitting_out.len(), 1);
        assert_ne!(second.sitting_out[0], benched);
        assert!(second.round_id > first.round_id);
    }

    #[test]
    fn test_small_pool_has_no_stations() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut players = roster(6);
        players[3].is_paused = true;
        players[4].is_active = false;
        players[5].is_paused = true;
        players[5].sit_out_count = 4;

        let result = RoundOrchestrator::new()
            .run_round_with_rng(&players, &PartnershipLedger::new(), &[], &mut rng)
            .unwrap();

        assert!(result.assignments.is_empty());
        assert!(result.ledger.is_empty());
        assert_eq!(result.sitting_out.len(), 3);
        for (before, after) in players.iter().zip(&result.participants) {
            if before.is_eligible() {
                assert_eq!(after.sit_out_count, before.sit_out_count + 1);
            } else {
                assert_eq!(after.sit_out_count, before.sit_out_count);
            }
        }
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let mut rng = StdRng::seed_from_u64(9);
        let players = roster(9);
        let ledger = PartnershipLedger::new();
        let snapshot = players.clone();

        let _ = RoundOrchestrator::new()
            .run_round_with_rng(&players, &ledger, &[], &mut rng)
            .unwrap();

        assert_eq!(players, snapshot);
        assert!(ledger.is_empty());
    }

    /// Every team in `round` that shared a station in `earlier` must be a forced repeat
    fn assert_only_forced_repeats(round: &RoundResult, earlier: &[Assignment], seed: u64) {
        for row in &round.assignments {
            for team in [row.team_a(), row.team_b()] {
                let repeat = earlier
                    .iter()
                    .any(|prev| prev.contains(&team[0]) && prev.contains(&team[1]));
                if repeat {
                    assert!(
                        round
                            .forced_repeats
                            .iter()
                            .any(|t| t.contains(&team[0]) && t.contains(&team[1])),
                        "seed {}: unforced repeat of {:?}",
                        seed,
                        team
                    );
                }
            }
        }
    }

    #[test]
    fn test_recent_station_mates_not_repaired_unless_forced() {
        let orchestrator = RoundOrchestrator::new();
        for seed in 0..25 {
            let mut rng = StdRng::seed_from_u64(seed);
            let first = orchestrator
                .run_round_with_rng(&roster(16), &PartnershipLedger::new(), &[], &mut rng)
                .unwrap();
            let second = orchestrator
                .run_round_with_rng(&first.participants, &first.ledger, &first.assignments, &mut rng)
                .unwrap();
            assert_only_forced_repeats(&second, &first.assignments, seed);

            // The veto still covers round one two rounds later
            let history: Vec<Assignment> = first
                .assignments
                .iter()
                .chain(&second.assignments)
                .cloned()
                .collect();
            let third = orchestrator
                .run_round_with_rng(&second.participants, &second.ledger, &history, &mut rng)
                .unwrap();
            assert_only_forced_repeats(&third, &history, seed);
        }
    }

    #[test]
    fn test_history_views() {
        let rows = vec![
            Assignment { station_number: 2, round_id: RoundId(5), player_ids: vec!["a".into()] },
            Assignment { station_number: 1, round_id: RoundId(5), player_ids: vec!["b".into()] },
            Assignment { station_number: 1, round_id: RoundId(3), player_ids: vec!["c".into()] },
            Assignment { station_number: 1, round_id: RoundId(2), player_ids: vec!["d".into()] },
            Assignment { station_number: 1, round_id: RoundId(1), player_ids: vec!["e".into()] },
        ];

        assert_eq!(latest_round_id(&rows), Some(RoundId(5)));
        let current: Vec<usize> = current_round(&rows).iter().map(|a| a.station_number).collect();
        assert_eq!(current, vec![1, 2]);

        let window = recency_window(&rows, 3);
        let expected: HashSet<RoundId> = [RoundId(5), RoundId(3), RoundId(2)].into_iter().collect();
        assert_eq!(window, expected);

        let pool = vec![
            Participant::with_id("a", "A"),
            Participant::with_id("c", "C"),
            Participant::with_id("z", "Z"),
        ];
        let prev = previous_sit_outs(&pool, &rows);
        let expected: HashSet<String> = ["c".to_string(), "z".to_string()].into_iter().collect();
        assert_eq!(prev, expected);

        assert!(previous_sit_outs(&pool, &[]).is_empty());
        assert!(recency_window(&[], 3).is_empty());

        // A round with no stations benched the whole pool
        assert!(round_rows(&rows, RoundId(6)).is_empty());
        let everyone: HashSet<String> = pool.iter().map(|p| p.id.clone()).collect();
        assert_eq!(sat_out_of_round(&pool, &rows, Some(RoundId(6))), everyone);
        assert!(sat_out_of_round(&pool, &rows, None).is_empty());
    }

    #[test]
    fn test_round_after_stationless_round() {
        let mut rng = StdRng::seed_from_u64(11);
        let orchestrator = RoundOrchestrator::new();
        let first = orchestrator
            .run_round_with_rng(&roster(4), &PartnershipLedger::new(), &[], &mut rng)
            .unwrap();

        // Round two had only three eligible players, so it left no rows behind
        let mut players = first.participants.clone();
        players[0].is_paused = true;
        let second = orchestrator
            .run_round_after(&players, &first.ledger, &first.assignments, Some(first.round_id), &mut rng)
            .unwrap();
        assert!(second.assignments.is_empty());
        assert!(second.round_id > first.round_id);

        players = second.participants.clone();
        players[0].is_paused = false;
        let third = orchestrator
            .run_round_after(&players, &second.ledger, &first.assignments, Some(second.round_id), &mut rng)
            .unwrap();

        assert!(third.round_id > second.round_id);
        assert_eq!(third.assignments.len(), 1);
        assert!(third.sitting_out.is_empty());
    }

    proptest! {
        #[test]
        fn prop_round_partitions_pool(
            n in 0usize..30,
            paused_mask in proptest::collection::vec(any::<bool>(), 30),
            seed in any::<u64>(),
        ) {
            let mut players = roster(n);
            for (p, paused) in players.iter_mut().zip(&paused_mask) {
                p.is_paused = *paused;
            }
            let pool: HashSet<String> = players
                .iter()
                .filter(|p| p.is_eligible())
                .map(|p| p.id.clone())
                .collect();

            let mut rng = StdRng::seed_from_u64(seed);
            let outcome = RoundOrchestrator::new()
                .run_round_with_rng(&players, &PartnershipLedger::new(), &[], &mut rng);

            if pool.is_empty() {
                prop_assert_eq!(outcome.unwrap_err(), RoundError::NoEligibleParticipants);
                return Ok(());
            }
            let result = outcome.unwrap();

            let playing = placed_ids(&result.assignments);
            let benched: HashSet<String> = result.sitting_out.iter().cloned().collect();
            let expected_playing = ((pool.len() / 4) * 4).min(MAX_PLAYING);

            prop_assert_eq!(playing.len(), expected_playing);
            prop_assert_eq!(benched.len(), pool.len() - expected_playing);
            prop_assert!(playing.is_disjoint(&benched));
            prop_assert_eq!(&playing | &benched, pool);

            for row in &result.assignments {
                prop_assert_eq!(row.player_ids.len(), 4);
                let unique: HashSet<&String> = row.player_ids.iter().collect();
                prop_assert_eq!(unique.len(), 4);
            }
        }

        #[test]
        fn prop_ledger_is_symmetric(seed in any::<u64>(), n in 4usize..20) {
            let mut rng = StdRng::seed_from_u64(seed);
            let players = roster(n);
            let result = RoundOrchestrator::new()
                .run_round_with_rng(&players, &PartnershipLedger::new(), &[], &mut rng)
                .unwrap();

            for a in &players {
                for b in &players {
                    prop_assert_eq!(
                        result.ledger.count_together(&a.id, &b.id),
                        result.ledger.count_together(&b.id, &a.id)
                    );
                }
            }
        }
    }
}
