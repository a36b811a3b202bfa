use thiserror::Error;

/// The single precondition a round can reject
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundError {
    #[error("no eligible participants: everyone is inactive or paused")]
    NoEligibleParticipants,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("participant name cannot be empty")]
    EmptyName,

    #[error("participant not found: {0}")]
    ParticipantNotFound(String),

    #[error(transparent)]
    Round(#[from] RoundError),
}
