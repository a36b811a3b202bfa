// Court Rotation - Core Library
// Round assignment for doubles sessions: fair sit-outs, fresh teammates, packed courts.
// Exposes all modules for use in the CLI, the TUI, and tests

pub mod config;
pub mod error;
pub mod participant;
pub mod ledger;     // Partnership history
pub mod sit_out;    // Who waits this round
pub mod pairing;    // Teammate selection
pub mod stations;   // Teams → courts
pub mod round;      // One round, end to end
pub mod session;    // Roster edits + applying rounds
pub mod db;

// Re-export commonly used types
pub use config::{
    Config, MAX_PLAYING, RECENCY_WINDOW, STATION_CAPACITY, STATION_COUNT, TEAM_SIZE,
};
pub use error::{RoundError, SessionError};
pub use participant::{eligible_pool, Participant};
pub use ledger::{PairKey, Partnership, PartnershipLedger};
pub use sit_out::{SitOutScheduler, SitOutSelection};
pub use pairing::{PairingOutcome, Team, TeamPairer};
pub use stations::{Assignment, RoundId, StationPacker};
pub use round::{
    current_round, latest_round_id, previous_sit_outs, recency_window, round_rows,
    sat_out_of_round, RoundOrchestrator, RoundResult,
};
pub use session::SessionState;
pub use db::{load_state, open_database, save_state, setup_database};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
