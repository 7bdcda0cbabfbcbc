//! Initiator exchange states
//!
//! # State Transitions
//!
//! ```text
//! SA_INIT
//!   ↓ (recv IKE_SA_INIT response, keys derived)
//! SA_AUTH
//!   ↓ (recv IKE_AUTH response, responder authenticated)
//! CHILD_SA            (only when a CREATE_CHILD_SA response is expected)
//!   ↓ (recv CREATE_CHILD_SA response)
//! DONE
//! ```
//!
//! Each state accepts exactly one exchange type and message ID.

use super::constants::ExchangeType;
use std::fmt;

/// Exchange state of the initiator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExchangeState {
    /// Waiting to send or receive IKE_SA_INIT
    SaInit,

    /// Keys derived, waiting to send or receive IKE_AUTH
    SaAuth,

    /// Responder authenticated, waiting for CREATE_CHILD_SA response
    ChildSa,

    /// Exchange complete
    Done,
}

impl ExchangeState {
    /// Exchange type and message ID accepted in this state
    ///
    /// `None` in the terminal state, where nothing is accepted.
    pub fn expected_exchange(self) -> Option<(ExchangeType, u32)> {
        match self {
            ExchangeState::SaInit => Some((ExchangeType::IkeSaInit, 0)),
            ExchangeState::SaAuth => Some((ExchangeType::IkeAuth, 1)),
            ExchangeState::ChildSa => Some((ExchangeType::CreateChildSa, 2)),
            ExchangeState::Done => None,
        }
    }

    /// Check if state is a valid next state
    pub fn can_transition_to(self, next: ExchangeState) -> bool {
        use ExchangeState::*;

        matches!(
            (self, next),
            (SaInit, SaAuth) | (SaAuth, ChildSa) | (SaAuth, Done) | (ChildSa, Done)
        )
    }

    /// Check if this is a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, ExchangeState::Done)
    }

    /// Protocol name of the state
    pub fn name(self) -> &'static str {
        match self {
            ExchangeState::SaInit => "SA_INIT",
            ExchangeState::SaAuth => "SA_AUTH",
            ExchangeState::ChildSa => "CHILD_SA",
            ExchangeState::Done => "DONE",
        }
    }
}

impl fmt::Display for ExchangeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
