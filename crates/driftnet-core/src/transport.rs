//! Boundary contract toward the transport collaborator
//!
//! The engine has no wire format of its own; it hands owned bundle copies
//! to the transport and reports every terminal or refused outcome through
//! this trait, so nothing is silently swallowed.

use serde::{Deserialize, Serialize};

use crate::bundle::{Bundle, BundleId};
use crate::identity::NodeIdentity;

/// Why a bundle left a store without being delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// TTL elapsed
    Expired,
    /// Evicted or rejected under buffer pressure
    BufferFull,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::Expired => write!(f, "expired"),
            DropReason::BufferFull => write!(f, "buffer full"),
        }
    }
}

/// Why a forward decision was not carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardRefusal {
    /// Sending would drive the battery below the reserve floor
    InsufficientEnergy,
}

impl std::fmt::Display for ForwardRefusal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForwardRefusal::InsufficientEnergy => write!(f, "insufficient energy"),
        }
    }
}

/// Outbound interface supplied by the transport/simulation collaborator
///
/// `send` is fire-and-forget; the collaborator is responsible for handing
/// the copy to the neighbor's store, or marking delivery if the neighbor is
/// the destination. Each send must result in at most one delivery attempt.
pub trait Transport<I: NodeIdentity> {
    /// Request delivery of an owned copy to a neighbor
    fn send(&mut self, bundle: Bundle<I>, to: &I);

    /// The local node was the bundle's destination
    fn notify_delivered(&mut self, bundle: &Bundle<I>);

    /// A local copy reached a terminal non-delivered state
    fn notify_dropped(&mut self, id: BundleId, reason: DropReason);

    /// A forward decision was refused before any side effect was applied
    fn notify_forward_refused(&mut self, id: BundleId, reason: ForwardRefusal);
}
