// ⚙️ Configuration - Fixed court topology + where session state lives

use std::path::{Path, PathBuf};

// ============================================================================
// TOPOLOGY (fixed: doubles on four courts)
// ============================================================================

/// Participants per team
pub const TEAM_SIZE: usize = 2;

/// Participants per station (two teams)
pub const STATION_CAPACITY: usize = 4;

/// Teams per station
pub const TEAMS_PER_STATION: usize = STATION_CAPACITY / TEAM_SIZE;

/// Stations available each round
pub const STATION_COUNT: usize = 4;

/// Most participants that can play in one round
pub const MAX_PLAYING: usize = STATION_CAPACITY * STATION_COUNT;

/// Distinct recent rounds whose pairings are vetoed
pub const RECENCY_WINDOW: usize = 3;

/// Round ids remembered per partnership
pub const RECENT_ROUNDS_CAP: usize = 3;

// ============================================================================
// RUNTIME CONFIG
// ============================================================================

/// Environment variable overriding the database location
pub const DB_ENV_VAR: &str = "COURT_ROTATION_DB";

/// Default database file, relative to the working directory
pub const DEFAULT_DB_FILE: &str = "court_rotation.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite file holding roster, partnerships and assignments
    pub db_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            db_path: PathBuf::from(DEFAULT_DB_FILE),
        }
    }
}

impl Config {
    /// Explicit path wins, otherwise the default file
    pub fn resolve(db_path: Option<&Path>) -> Self {
        match db_path {
            Some(path) => Config {
                db_path: path.to_path_buf(),
            },
            None => Config::default(),
        }
    }
}
