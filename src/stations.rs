// 🏟️ Station Packer - Teams → stations, two teams per station
// Shuffles team order so nobody is systematically parked on station 1

use crate::config::{STATION_COUNT, TEAMS_PER_STATION};
use crate::pairing::Team;
use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ROUND IDENTIFIER
// ============================================================================

/// Groups every assignment row produced by one orchestration call.
///
/// Milliseconds since the Unix epoch; strictly increasing across rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoundId(pub i64);

impl RoundId {
    /// Timestamp-derived id that is always newer than `latest`
    pub fn next_after(latest: Option<RoundId>) -> RoundId {
        let now = Utc::now().timestamp_millis();
        match latest {
            Some(RoundId(prev)) if prev >= now => RoundId(prev + 1),
            _ => RoundId(now),
        }
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ASSIGNMENT ROW
// ============================================================================

/// One station for one round.
///
/// `player_ids[0..2]` is team A, `player_ids[2..4]` is team B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub station_number: usize,
    pub round_id: RoundId,
    pub player_ids: Vec<String>,
}

impl Assignment {
    pub fn team_a(&self) -> &[String] {
        let end = self.player_ids.len().min(2);
        &self.player_ids[..end]
    }

    pub fn team_b(&self) -> &[String] {
        let start = self.player_ids.len().min(2);
        &self.player_ids[start..]
    }

    pub fn contains(&self, participant_id: &str) -> bool {
        self.player_ids.iter().any(|id| id == participant_id)
    }

    pub fn is_full(&self) -> bool {
        self.player_ids.len() == crate::config::STATION_CAPACITY
    }
}

// ============================================================================
// STATION PACKER
// ============================================================================

pub struct StationPacker {
    /// Stations available (default: 4)
    pub station_count: usize,

    /// Teams hosted per station (default: 2)
    pub teams_per_station: usize,
}

impl Default for StationPacker {
    fn default() -> Self {
        StationPacker::new()
    }
}

impl StationPacker {
    pub fn new() -> Self {
        StationPacker {
            station_count: STATION_COUNT,
            teams_per_station: TEAMS_PER_STATION,
        }
    }

    /// Shuffle the teams and fill stations 1..=station_count in order.
    ///
    /// A station that cannot get a full complement of teams is left out.
    pub fn pack<R: Rng + ?Sized>(
        &self,
        teams: &[Team],
        round_id: RoundId,
        rng: &mut R,
    ) -> Vec<Assignment> {
        let mut shuffled = teams.to_vec();
        shuffled.shuffle(rng);

        shuffled
            .chunks(self.teams_per_station)
            .take(self.station_count)
            .filter(|chunk| chunk.len() == self.teams_per_station)
            .enumerate()
            .map(|(i, chunk)| Assignment {
                station_number: i + 1,
                round_id,
                player_ids: chunk
                    .iter()
                    .flat_map(|team| team.members().into_iter().map(str::to_string))
                    .collect(),
            })
            .collect()
    }
}
