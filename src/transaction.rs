//! Settlement records and the status transition policy
use super::error::{MarketError, ValidationError};
use super::impact::EcoImpact;
use super::time::TimeStamp;
use chrono::Utc;

/// How the buyer receives the item. An address only exists for deliveries,
/// so "address required iff delivery" cannot be violated by construction.
#[derive(minicbor::Encode, minicbor::Decode, Clone, Debug, Eq, PartialEq)]
pub enum DeliveryMethod {
    #[n(0)]
    Pickup,
    #[n(1)]
    Delivery {
        #[n(0)]
        address: String,
    },
}

impl DeliveryMethod {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Delivery { address } if address.trim().is_empty() => {
                Err(ValidationError::MissingDeliveryAddress)
            }
            _ => Ok(()),
        }
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransactionStatus {
    #[n(0)]
    Purchased,
    #[n(1)]
    Shipped,
    #[n(2)]
    Delivered,
    #[n(3)]
    Completed,
    #[n(4)]
    Canceled,
}

/// Governs which status overwrites a participant may request.
///
/// `Unrestricted` keeps the historical behaviour where any overwrite is
/// accepted, including moving a completed order back to purchased.
/// `ForwardOnly` only admits strictly later stages, with cancellation
/// reachable until the item has been delivered.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TransitionPolicy {
    #[default]
    Unrestricted,
    ForwardOnly,
}

impl TransitionPolicy {
    pub fn permits(&self, from: TransactionStatus, to: TransactionStatus) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::ForwardOnly => {
                // completed orders and canceled orders are terminal
                if matches!(
                    from,
                    TransactionStatus::Completed | TransactionStatus::Canceled
                ) {
                    return false;
                }
                match (stage(from), stage(to)) {
                    (Some(from_stage), Some(to_stage)) => to_stage > from_stage,
                    // cancellation stays open until the item has been delivered
                    _ => matches!(
                        from,
                        TransactionStatus::Purchased | TransactionStatus::Shipped
                    ),
                }
            }
        }
    }
}

// Position along the fulfilment path. Canceled sits outside it.
fn stage(status: TransactionStatus) -> Option<u8> {
    match status {
        TransactionStatus::Purchased => Some(0),
        TransactionStatus::Shipped => Some(1),
        TransactionStatus::Delivered => Some(2),
        TransactionStatus::Completed => Some(3),
        TransactionStatus::Canceled => None,
    }
}

/// The durable result of a settlement. Price, seller and eco impact are
/// snapshots taken from the product when the purchase went through, only
/// `status` and `updated_at` change afterwards.
#[derive(minicbor::Encode, minicbor::Decode, Clone, Debug, Eq, PartialEq)]
pub struct Transaction {
    #[n(0)]
    pub id: String, // uuid7, bech32 encoded with a "txn_" prefix
    #[n(1)]
    pub product: String,
    #[n(2)]
    pub buyer: String,
    #[n(3)]
    pub seller: String,
    #[n(4)]
    pub price: u64,
    #[n(5)]
    pub delivery: DeliveryMethod,
    #[n(6)]
    pub status: TransactionStatus,
    #[n(7)]
    pub eco_impact: EcoImpact,
    #[n(8)]
    pub created_at: TimeStamp<Utc>,
    #[n(9)]
    pub updated_at: TimeStamp<Utc>,
}

impl Transaction {
    /// Participant gate, only the buyer or the seller may touch the record
    pub fn ensure_participant(&self, actor: &str) -> Result<(), MarketError> {
        if self.buyer != actor && self.seller != actor {
            return Err(MarketError::Forbidden(
                "Not authorized to update this transaction",
            ));
        }
        Ok(())
    }
}
