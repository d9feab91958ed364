//! Negotiation state machine.

use serde::{Deserialize, Serialize};

/// The state of a negotiation.
///
/// State transitions:
/// ```text
/// Initial ──► Created ──┬──► Accepted
///                       └──► Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NegotiationStatus {
    /// Negotiation exists but no offer has been made.
    #[default]
    #[serde(rename = "")]
    Initial,

    /// An offer is open.
    Created,

    /// The offer was accepted (terminal state).
    Accepted,

    /// The offer was rejected (terminal state).
    Rejected,
}

impl NegotiationStatus {
    pub fn can_create_offer(&self) -> bool {
        matches!(self, NegotiationStatus::Initial)
    }

    /// Returns true if an open offer can be accepted or rejected.
    pub fn can_decide(&self) -> bool {
        matches!(self, NegotiationStatus::Created)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, NegotiationStatus::Accepted | NegotiationStatus::Rejected)
    }

    /// Returns the wire name of the status; the initial status is empty.
    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationStatus::Initial => "",
            NegotiationStatus::Created => "created",
            NegotiationStatus::Accepted => "accepted",
            NegotiationStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for NegotiationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NegotiationStatus::Initial => write!(f, "initial"),
            other => write!(f, "{}", other.as_str()),
        }
    }
}
