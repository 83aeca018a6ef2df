use serde::{Deserialize, Serialize};
use std::fmt;

/// The states a delivery moves through.
///
/// Two of them (`RefundRequired`, `RefundPaid`) only make sense for insured
/// deliveries; see [`DeliveryState::requires_insurance`]. Whether a state is
/// terminal is *not* a property of the state alone, it depends on the kind of
/// delivery holding it (see [`StatePolicy`](super::StatePolicy)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryState {
    InPreparation,
    InTransit,
    Received,
    Failed,
    RefundRequired,
    RefundPaid,
}

impl DeliveryState {
    /// Every state, in declaration order.
    pub const ALL: [DeliveryState; 6] = [
        DeliveryState::InPreparation,
        DeliveryState::InTransit,
        DeliveryState::Received,
        DeliveryState::Failed,
        DeliveryState::RefundRequired,
        DeliveryState::RefundPaid,
    ];

    /// True for states that can only be assigned to an insured delivery.
    pub fn requires_insurance(self) -> bool {
        matches!(self, DeliveryState::RefundRequired | DeliveryState::RefundPaid)
    }

    /// True when the background worker may advance a delivery in this state.
    pub fn is_auto_advanceable(self) -> bool {
        matches!(
            self,
            DeliveryState::InPreparation | DeliveryState::InTransit | DeliveryState::RefundRequired
        )
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            DeliveryState::InPreparation => "In preparation",
            DeliveryState::InTransit => "In transit",
            DeliveryState::Received => "Received",
            DeliveryState::Failed => "Failed",
            DeliveryState::RefundRequired => "Refund required",
            DeliveryState::RefundPaid => "Refund paid",
        }
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
