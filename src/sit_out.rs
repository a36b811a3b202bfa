// 🪑 Sit-Out Scheduler - Who waits this round
// Lowest sit-out count sits first; ties are broken by a uniform shuffle.
// Avoids benching the same people twice in a row when anyone else qualifies.

use crate::config::{MAX_PLAYING, STATION_CAPACITY};
use crate::participant::Participant;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;
use tracing::debug;

// ============================================================================
// SELECTION RESULT
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SitOutSelection {
    /// Participants benched this round (exactly `n - playable`)
    pub sitting_out: Vec<Participant>,

    /// Participants going on court (multiple of the station capacity)
    pub playing: Vec<Participant>,
}

impl SitOutSelection {
    pub fn sitting_out_ids(&self) -> Vec<String> {
        self.sitting_out.iter().map(|p| p.id.clone()).collect()
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

pub struct SitOutScheduler {
    /// Participants per station (default: 4)
    pub station_capacity: usize,

    /// Upper bound on players per round (default: 16)
    pub max_playing: usize,
}

impl Default for SitOutScheduler {
    fn default() -> Self {
        SitOutScheduler::new()
    }
}

impl SitOutScheduler {
    pub fn new() -> Self {
        SitOutScheduler {
            station_capacity: STATION_CAPACITY,
            max_playing: MAX_PLAYING,
        }
    }

    /// Largest playable group for a pool of `n`
    pub fn playable(&self, n: usize) -> usize {
        ((n / self.station_capacity) * self.station_capacity).min(self.max_playing)
    }

    /// Split `pool` into sitting-out and playing groups.
    ///
    /// `sat_out_last_round` holds the ids benched in the immediately preceding round.
    pub fn select<R: Rng + ?Sized>(
        &self,
        pool: &[Participant],
        sat_out_last_round: &HashSet<String>,
        rng: &mut R,
    ) -> SitOutSelection {
        let n = pool.len();
        let playable = self.playable(n);
        let must_sit_out = n - playable;

        // Shuffle first so the stable sort only orders by count and equals stay random
        let mut ordered = pool.to_vec();
        ordered.shuffle(rng);
        ordered.sort_by_key(|p| p.sit_out_count);

        if must_sit_out == 0 {
            return SitOutSelection {
                sitting_out: Vec::new(),
                playing: ordered,
            };
        }

        let chosen = Self::choose(&ordered, sat_out_last_round, must_sit_out);

        debug!(
            pool = n,
            playable,
            sitting_out = must_sit_out,
            "selected sit-outs"
        );

        let sitting_out: Vec<Participant> = chosen.iter().map(|&i| ordered[i].clone()).collect();
        let playing: Vec<Participant> = ordered
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !chosen.contains(i))
            .map(|(_, p)| p)
            .collect();

        SitOutSelection {
            sitting_out,
            playing,
        }
    }

    /// Indices into `ordered` (count-sorted, shuffled among equals), in pick order.
    ///
    /// Pick order: lowest-count members who did not sit out last round, then the
    /// rest of the lowest-count group, then last round's sitters, then everyone
    /// else by ascending count. Shuffle order breaks ties within each tier.
    fn choose(
        ordered: &[Participant],
        sat_out_last_round: &HashSet<String>,
        must_sit_out: usize,
    ) -> Vec<usize> {
        let min_count = ordered[0].sit_out_count;
        let min_group: Vec<usize> = (0..ordered.len())
            .filter(|&i| ordered[i].sit_out_count == min_count)
            .collect();

        let fresh: Vec<usize> = min_group
            .iter()
            .copied()
            .filter(|&i| !sat_out_last_round.contains(&ordered[i].id))
            .collect();

        if fresh.len() >= must_sit_out {
            return fresh.into_iter().take(must_sit_out).collect();
        }

        // Whole lowest-count group goes first; its fresh members lead
        let mut chosen: Vec<usize> = fresh;
        for i in min_group {
            if chosen.len() >= must_sit_out {
                break;
            }
            if !chosen.contains(&i) {
                chosen.push(i);
            }
        }

        let repeaters: Vec<usize> = (0..ordered.len())
            .filter(|i| sat_out_last_round.contains(&ordered[*i].id))
            .collect();
        for i in repeaters {
            if chosen.len() >= must_sit_out {
                break;
            }
            if !chosen.contains(&i) {
                chosen.push(i);
            }
        }

        for i in 0..ordered.len() {
            if chosen.len() >= must_sit_out {
                break;
            }
            if !chosen.contains(&i) {
                chosen.push(i);
            }
        }

        chosen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(n: usize) -> Vec<Participant> {
        (0..n)
            .map(|i| Participant::with_id(format!("p{}", i), format!("Player {}", i)))
            .collect()
    }

    fn ids(ps: &[Participant]) -> HashSet<String> {
        ps.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_playable_sizes() {
        let s = SitOutScheduler::new();
        assert_eq!(s.playable(0), 0);
        assert_eq!(s.playable(3), 0);
        assert_eq!(s.playable(5), 4);
        assert_eq!(s.playable(8), 8);
        assert_eq!(s.playable(15), 12);
        assert_eq!(s.playable(16), 16);
        assert_eq!(s.playable(23), 16);
    }

    #[test]
    fn test_partition_is_exact() {
        let mut rng = StdRng::seed_from_u64(1);
        let roster = pool(11);

        let sel = SitOutScheduler::new().select(&roster, &HashSet::new(), &mut rng);

        assert_eq!(sel.playing.len(), 8);
        assert_eq!(sel.sitting_out.len(), 3);
        let playing = ids(&sel.playing);
        let benched = ids(&sel.sitting_out);
        assert!(playing.is_disjoint(&benched));
        assert_eq!(&playing | &benched, ids(&roster));
    }

    #[test]
    fn test_small_pool_everyone_sits_out() {
        let mut rng = StdRng::seed_from_u64(2);
        let sel = SitOutScheduler::new().select(&pool(3), &HashSet::new(), &mut rng);

        assert!(sel.playing.is_empty());
        assert_eq!(sel.sitting_out.len(), 3);
    }

    #[test]
    fn test_empty_pool() {
        let mut rng = StdRng::seed_from_u64(2);
        let sel = SitOutScheduler::new().select(&[], &HashSet::new(), &mut rng);
        assert!(sel.playing.is_empty());
        assert!(sel.sitting_out.is_empty());
    }

    #[test]
    fn test_lowest_count_sits_out_first() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut roster = pool(6);
        for p in roster.iter_mut() {
            p.sit_out_count = 2;
        }
        roster[4].sit_out_count = 0;
        roster[5].sit_out_count = 1;

        let sel = SitOutScheduler::new().select(&roster, &HashSet::new(), &mut rng);

        assert_eq!(sel.sitting_out_ids(), vec!["p4".to_string(), "p5".to_string()]);
    }

    #[test]
    fn test_avoids_consecutive_sit_out() {
        let roster = pool(5);
        let last: HashSet<String> = ["p0".to_string()].into_iter().collect();

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let sel = SitOutScheduler::new().select(&roster, &last, &mut rng);
            assert_eq!(sel.sitting_out.len(), 1);
            assert_ne!(sel.sitting_out[0].id, "p0", "seed {} benched p0 twice", seed);
        }
    }

    #[test]
    fn test_repeat_allowed_when_forced() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut roster = pool(7);
        // Only p0..p2 have the lowest count, and p0 sat out last round
        for p in roster.iter_mut().skip(3) {
            p.sit_out_count = 1;
        }
        let last: HashSet<String> = ["p0".to_string()].into_iter().collect();

        let sel = SitOutScheduler::new().select(&roster, &last, &mut rng);

        assert_eq!(ids(&sel.sitting_out), ids(&roster[..3]));
    }

    #[test]
    fn test_backfills_by_ascending_count() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut roster = pool(7);
        roster[0].sit_out_count = 0;
        roster[1].sit_out_count = 1;
        for p in roster.iter_mut().skip(2) {
            p.sit_out_count = 5;
        }

        let sel = SitOutScheduler::new().select(&roster, &HashSet::new(), &mut rng);

        let benched = sel.sitting_out_ids();
        assert_eq!(benched.len(), 3);
        assert_eq!(benched[0], "p0");
        assert_eq!(benched[1], "p1");
    }

    #[test]
    fn test_ties_are_randomized() {
        let roster = pool(5);
        let mut seen = HashSet::new();
        for seed in 0..40 {
            let mut rng = StdRng::seed_from_u64(seed);
            let sel = SitOutScheduler::new().select(&roster, &HashSet::new(), &mut rng);
            seen.insert(sel.sitting_out[0].id.clone());
        }
        assert!(seen.len() > 1, "tie-break never varied");
    }
}
