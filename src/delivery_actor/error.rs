//! Error types for the Delivery actor.

use crate::model::DeliveryState;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Why a state assignment was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionViolation {
    /// The delivery already reached a terminal state.
    Terminal,
    /// The target state is reserved for insured deliveries.
    InsuranceRequired,
}

impl fmt::Display for TransitionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionViolation::Terminal => write!(f, "delivery is in a terminal state"),
            TransitionViolation::InsuranceRequired => {
                write!(f, "state is only available to insured deliveries")
            }
        }
    }
}

/// Errors that can occur during delivery operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeliveryError {
    /// Construction arguments were invalid (negative weight, negative insured value).
    #[error("Delivery validation error: {0}")]
    ValidationError(String),

    /// A state assignment broke the terminal or insurance rule.
    #[error("Illegal state transition for {code}: {from} -> {to} ({reason})")]
    IllegalStateTransition {
        code: Uuid,
        from: DeliveryState,
        to: DeliveryState,
        reason: TransitionViolation,
    },

    /// A delivery with the same code is already registered.
    #[error("Delivery already exists: {0}")]
    DuplicateIdentity(Uuid),

    /// Only deliveries in a terminal state can be removed.
    #[error("Delivery {code} cannot be removed while {state}")]
    NotTerminal { code: Uuid, state: DeliveryState },

    /// The requested delivery was not found.
    #[error("Delivery not found: {0}")]
    NotFound(Uuid),

    /// Refunds are only granted to failed insured deliveries.
    #[error("Refund not allowed for {code} ({reason})")]
    RefundNotAllowed { code: Uuid, reason: &'static str },

    /// An error occurred while communicating with the actor system.
    #[error("Actor communication error: {0}")]
    ActorCommunicationError(String),
}

impl From<crate::framework::FrameworkError> for DeliveryError {
    fn from(e: crate::framework::FrameworkError) -> Self {
        DeliveryError::ActorCommunicationError(e.to_string())
    }
}
