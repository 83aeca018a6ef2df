//! The delivery entity and its state rules.
//!
//! A [`Delivery`] carries immutable descriptive fields and a single mutable
//! field, its [`DeliveryState`]. Which states are terminal, and which states may
//! be assigned at all, is decided by the [`StatePolicy`] of the delivery's
//! [`DeliveryKind`]. The kind is a plain tagged value chosen at construction
//! (or deserialization) time, so both variants share one struct.

use super::DeliveryState;
use crate::delivery_actor::{DeliveryError, TransitionViolation};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Terminal predicate and transition guard for one kind of delivery.
pub trait StatePolicy: Send + Sync {
    /// True when a delivery in `state` must never change again.
    fn is_terminal(&self, state: DeliveryState) -> bool;

    /// True when `state` may be assigned to this kind of delivery at all.
    fn permits(&self, state: DeliveryState) -> bool;
}

/// Rules for ordinary deliveries: `Received` and `Failed` are final and the
/// refund states are off limits.
pub struct StandardPolicy;

impl StatePolicy for StandardPolicy {
    fn is_terminal(&self, state: DeliveryState) -> bool {
        matches!(state, DeliveryState::Received | DeliveryState::Failed)
    }

    fn permits(&self, state: DeliveryState) -> bool {
        !state.requires_insurance()
    }
}

/// Rules for insured deliveries: a failure can still be refunded, so `Failed`
/// is not final, while `RefundPaid` is.
pub struct InsuredPolicy;

impl StatePolicy for InsuredPolicy {
    fn is_terminal(&self, state: DeliveryState) -> bool {
        match state {
            DeliveryState::Failed => false,
            DeliveryState::RefundPaid => true,
            other => StandardPolicy.is_terminal(other),
        }
    }

    fn permits(&self, _state: DeliveryState) -> bool {
        true
    }
}

/// Discriminates standard from insured deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryKind {
    Standard,
    Insured { insured_value: u64 },
}

impl DeliveryKind {
    /// The rule set for this kind.
    pub fn policy(&self) -> &'static dyn StatePolicy {
        match self {
            DeliveryKind::Standard => &StandardPolicy,
            DeliveryKind::Insured { .. } => &InsuredPolicy,
        }
    }

    pub fn insured_value(&self) -> Option<u64> {
        match self {
            DeliveryKind::Standard => None,
            DeliveryKind::Insured { insured_value } => Some(*insured_value),
        }
    }
}

/// Payload for creating a new delivery.
///
/// `insured_value: Some(_)` creates an insured delivery.
#[derive(Debug, Clone)]
pub struct DeliveryCreate {
    pub sender: Uuid,
    pub destination: String,
    pub weight: f64,
    pub insured_value: Option<i64>,
}

/// Result of a committed state assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    pub code: Uuid,
    pub old: DeliveryState,
    pub new: DeliveryState,
    /// True exactly when the terminal predicate flipped from false to true.
    pub became_terminal: bool,
}

/// A parcel tracked by the system.
///
/// Equality and hashing only look at [`Delivery::code`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "DeliveryRecord", into = "DeliveryRecord")]
pub struct Delivery {
    code: Uuid,
    sender: Uuid,
    date: NaiveDate,
    destination: String,
    weight: f64,
    kind: DeliveryKind,
    state: DeliveryState,
}

impl Delivery {
    /// Builds a brand new delivery (fresh code, today's date, `InPreparation`).
    pub fn create(params: DeliveryCreate) -> Result<Self, DeliveryError> {
        let kind = match params.insured_value {
            None => DeliveryKind::Standard,
            Some(value) => DeliveryKind::Insured {
                insured_value: u64::try_from(value).map_err(|_| {
                    DeliveryError::ValidationError(format!(
                        "insured value cannot be negative: {value}"
                    ))
                })?,
            },
        };
        Self::restore(
            Uuid::new_v4(),
            params.sender,
            Local::now().date_naive(),
            params.destination,
            params.weight,
            kind,
            DeliveryState::InPreparation,
        )
    }

    /// Shorthand for a new standard delivery.
    pub fn standard(
        sender: Uuid,
        destination: impl Into<String>,
        weight: f64,
    ) -> Result<Self, DeliveryError> {
        Self::create(DeliveryCreate {
            sender,
            destination: destination.into(),
            weight,
            insured_value: None,
        })
    }

    /// Shorthand for a new insured delivery.
    pub fn insured(
        sender: Uuid,
        destination: impl Into<String>,
        weight: f64,
        insured_value: i64,
    ) -> Result<Self, DeliveryError> {
        Self::create(DeliveryCreate {
            sender,
            destination: destination.into(),
            weight,
            insured_value: Some(insured_value),
        })
    }

    /// Rebuilds a delivery from stored fields, re-running every validation.
    pub fn restore(
        code: Uuid,
        sender: Uuid,
        date: NaiveDate,
        destination: impl Into<String>,
        weight: f64,
        kind: DeliveryKind,
        state: DeliveryState,
    ) -> Result<Self, DeliveryError> {
        // JSON has no encoding for non-finite numbers.
        if !weight.is_finite() || weight < 0.0 {
            return Err(DeliveryError::ValidationError(format!(
                "weight must be a finite non-negative number: {weight}"
            )));
        }
        if !kind.policy().permits(state) {
            return Err(DeliveryError::IllegalStateTransition {
                code,
                from: DeliveryState::InPreparation,
                to: state,
                reason: TransitionViolation::InsuranceRequired,
            });
        }
        Ok(Self {
            code,
            sender,
            date,
            destination: destination.into(),
            weight,
            kind,
            state,
        })
    }

    pub fn code(&self) -> Uuid {
        self.code
    }

    pub fn sender(&self) -> Uuid {
        self.sender
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Weight in kilograms.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn kind(&self) -> DeliveryKind {
        self.kind
    }

    pub fn is_insured(&self) -> bool {
        matches!(self.kind, DeliveryKind::Insured { .. })
    }

    pub fn insured_value(&self) -> Option<u64> {
        self.kind.insured_value()
    }

    pub fn state(&self) -> DeliveryState {
        self.state
    }

    /// Terminal predicate of this delivery's kind applied to its current state.
    pub fn is_terminal(&self) -> bool {
        self.kind.policy().is_terminal(self.state)
    }

    /// Assigns a new state.
    ///
    /// Fails if the delivery is already terminal, or if `new` is reserved for
    /// insured deliveries and this one is not. Any other assignment is
    /// accepted; there is no adjacency restriction between states.
    pub fn set_state(&mut self, new: DeliveryState) -> Result<StateChange, DeliveryError> {
        let policy = self.kind.policy();
        if policy.is_terminal(self.state) {
            return Err(self.violation(new, TransitionViolation::Terminal));
        }
        if !policy.permits(new) {
            return Err(self.violation(new, TransitionViolation::InsuranceRequired));
        }
        let old = self.state;
        self.state = new;
        Ok(StateChange {
            code: self.code,
            old,
            new,
            became_terminal: policy.is_terminal(new),
        })
    }

    fn violation(&self, to: DeliveryState, reason: TransitionViolation) -> DeliveryError {
        DeliveryError::IllegalStateTransition {
            code: self.code,
            from: self.state,
            to,
            reason,
        }
    }
}

impl PartialEq for Delivery {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
    }
}

impl Eq for Delivery {}

impl Hash for Delivery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code.hash(state);
    }
}

/// On-disk shape of a delivery, discriminated by a `"type"` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum DeliveryRecord {
    Standard {
        code: Uuid,
        sender: Uuid,
        date: NaiveDate,
        destination: String,
        weight: f64,
        state: DeliveryState,
    },
    Insured {
        code: Uuid,
        sender: Uuid,
        date: NaiveDate,
        destination: String,
        weight: f64,
        #[serde(rename = "insuredValue")]
        insured_value: u64,
        state: DeliveryState,
    },
}

impl From<Delivery> for DeliveryRecord {
    fn from(d: Delivery) -> Self {
        match d.kind {
            DeliveryKind::Standard => DeliveryRecord::Standard {
                code: d.code,
                sender: d.sender,
                date: d.date,
                destination: d.destination,
                weight: d.weight,
                state: d.state,
            },
            DeliveryKind::Insured { insured_value } => DeliveryRecord::Insured {
                code: d.code,
                sender: d.sender,
                date: d.date,
                destination: d.destination,
                weight: d.weight,
                insured_value,
                state: d.state,
            },
        }
    }
}

impl TryFrom<DeliveryRecord> for Delivery {
    type Error = DeliveryError;

    fn try_from(record: DeliveryRecord) -> Result<Self, Self::Error> {
        match record {
            DeliveryRecord::Standard {
                code,
                sender,
                date,
                destination,
                weight,
                state,
            } => Delivery::restore(
                code,
                sender,
                date,
                destination,
                weight,
                DeliveryKind::Standard,
                state,
            ),
            DeliveryRecord::Insured {
                code,
                sender,
                date,
                destination,
                weight,
                insured_value,
                state,
            } => Delivery::restore(
                code,
                sender,
                date,
                destination,
                weight,
                DeliveryKind::Insured { insured_value },
                state,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> Delivery {
        Delivery::standard(Uuid::new_v4(), "Via Roma 1", 2.5).unwrap()
    }

    fn insured() -> Delivery {
        Delivery::insured(Uuid::new_v4(), "Via Emilia 9", 1.0, 300).unwrap()
    }

    #[test]
    fn new_delivery_starts_in_preparation() {
        let d = standard();
        assert_eq!(d.state(), DeliveryState::InPreparation);
        assert!(!d.is_terminal());
        assert!(!d.is_insured());
        assert_eq!(d.insured_value(), None);
    }

    #[test]
    fn negative_weight_is_rejected() {
        let err = Delivery::standard(Uuid::new_v4(), "x", -0.1).unwrap_err();
        assert!(matches!(err, DeliveryError::ValidationError(_)));
        let err = Delivery::standard(Uuid::new_v4(), "x", f64::NAN).unwrap_err();
        assert!(matches!(err, DeliveryError::ValidationError(_)));
        let err = Delivery::standard(Uuid::new_v4(), "x", f64::INFINITY).unwrap_err();
        assert!(matches!(err, DeliveryError::ValidationError(_)));
        let err = Delivery::insured(Uuid::new_v4(), "x", f64::INFINITY, 10).unwrap_err();
        assert!(matches!(err, DeliveryError::ValidationError(_)));
    }

    #[test]
    fn zero_weight_is_fine() {
        assert!(Delivery::standard(Uuid::new_v4(), "x", 0.0).is_ok());
    }

    #[test]
    fn negative_insured_value_is_rejected() {
        let err = Delivery::insured(Uuid::new_v4(), "x", 1.0, -1).unwrap_err();
        assert!(matches!(err, DeliveryError::ValidationError(_)));
    }

    #[test]
    fn standard_rejects_insurance_states() {
        for target in [DeliveryState::RefundRequired, DeliveryState::RefundPaid] {
            let mut d = standard();
            let err = d.set_state(target).unwrap_err();
            assert!(matches!(
                err,
                DeliveryError::IllegalStateTransition {
                    reason: TransitionViolation::InsuranceRequired,
                    ..
                }
            ));
            assert_eq!(d.state(), DeliveryState::InPreparation);
        }
    }

    #[test]
    fn any_state_may_follow_a_non_terminal_one() {
        let mut d = standard();
        d.set_state(DeliveryState::InTransit).unwrap();
        d.set_state(DeliveryState::InPreparation).unwrap();
        let change = d.set_state(DeliveryState::Received).unwrap();
        assert!(change.became_terminal);
        assert_eq!(change.old, DeliveryState::InPreparation);
    }

    #[test]
    fn terminal_standard_delivery_is_frozen() {
        let mut d = standard();
        d.set_state(DeliveryState::Failed).unwrap();
        assert!(d.is_terminal());
        let err = d.set_state(DeliveryState::InTransit).unwrap_err();
        assert!(matches!(
            err,
            DeliveryError::IllegalStateTransition {
                reason: TransitionViolation::Terminal,
                ..
            }
        ));
        assert_eq!(d.state(), DeliveryState::Failed);
    }

    #[test]
    fn insured_failure_is_not_terminal_but_refund_paid_is() {
        let mut d = insured();
        let change = d.set_state(DeliveryState::Failed).unwrap();
        assert!(!change.became_terminal);
        assert!(!d.is_terminal());

        d.set_state(DeliveryState::RefundRequired).unwrap();
        let change = d.set_state(DeliveryState::RefundPaid).unwrap();
        assert!(change.became_terminal);
        assert!(d.is_terminal());
        assert!(d.set_state(DeliveryState::InTransit).is_err());
    }

    #[test]
    fn insured_received_is_terminal() {
        let mut d = insured();
        d.set_state(DeliveryState::Received).unwrap();
        assert!(d.is_terminal());
    }

    #[test]
    fn equality_is_by_code_only() {
        let a = standard();
        let mut b = a.clone();
        b.set_state(DeliveryState::InTransit).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, standard());
    }

    #[test]
    fn serialized_shape_is_tagged() {
        let d = insured();
        let value = serde_json::to_value(&d).unwrap();
        assert_eq!(value["type"], "insured");
        assert_eq!(value["insuredValue"], 300);
        assert_eq!(value["state"], "IN_PREPARATION");

        let back: Delivery = serde_json::from_value(value).unwrap();
        assert_eq!(back.code(), d.code());
        assert_eq!(back.insured_value(), Some(300));
    }

    #[test]
    fn deserialization_revalidates() {
        let json = format!(
            r#"{{"type":"standard","code":"{}","sender":"{}","date":"2024-03-01",
                "destination":"x","weight":1.0,"state":"REFUND_PAID"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        assert!(serde_json::from_str::<Delivery>(&json).is_err());

        let json = format!(
            r#"{{"type":"standard","code":"{}","sender":"{}","date":"2024-03-01",
                "destination":"x","weight":-3.0,"state":"IN_TRANSIT"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        assert!(serde_json::from_str::<Delivery>(&json).is_err());
    }
}
