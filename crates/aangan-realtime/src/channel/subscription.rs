//! Subscriber callbacks, handles, and failure isolation.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

/// Unique subscription identifier, assigned in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Error a subscriber callback reports for one delivery.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The subscriber's connection is gone.
    #[error("subscriber closed")]
    Closed,
    /// The subscriber's outbound queue is full.
    #[error("subscriber queue full")]
    Backpressure,
    /// The message could not be encoded for this subscriber.
    #[error("encoding failed: {0}")]
    Encoding(String),
    /// The callback panicked.
    #[error("callback panicked: {0}")]
    Panicked(String),
    /// Any other subscriber-side failure.
    #[error("{0}")]
    Rejected(String),
}

/// A registered subscriber callback.
pub type Callback<M> = Arc<dyn Fn(&Arc<M>) -> Result<(), DeliveryError> + Send + Sync>;

/// Opaque handle returned by the registry, used to remove exactly one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    /// Subscription ID.
    pub(crate) id: SubscriptionId,
    /// Channel the subscription lives on.
    pub(crate) channel: String,
}

impl SubscriptionHandle {
    /// Subscription ID.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Channel name.
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

/// Invokes a callback, containing both `Err` returns and panics.
///
/// Failures are logged here and returned to the caller for accounting; they
/// never propagate further.
pub fn invoke_isolated<M>(
    channel: &str,
    id: SubscriptionId,
    callback: &Callback<M>,
    message: &Arc<M>,
) -> Result<(), DeliveryError> {
    let outcome = match catch_unwind(AssertUnwindSafe(|| callback(message))) {
        Ok(result) => result,
        Err(payload) => Err(DeliveryError::Panicked(panic_message(payload.as_ref()))),
    };

    if let Err(ref e) = outcome {
        warn!(
            channel = %channel,
            subscription = %id,
            error = %e,
            "Subscriber callback failed; continuing fan-out"
        );
    }

    outcome
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_passes_through() {
        let cb: Callback<u32> = Arc::new(|_: &Arc<u32>| Ok(()));
        assert!(invoke_isolated("tapri", SubscriptionId(1), &cb, &Arc::new(7)).is_ok());
    }

    #[test]
    fn test_err_is_returned() {
        let cb: Callback<u32> = Arc::new(|_: &Arc<u32>| Err(DeliveryError::Backpressure));
        assert_eq!(
            invoke_isolated("tapri", SubscriptionId(1), &cb, &Arc::new(7)),
            Err(DeliveryError::Backpressure)
        );
    }

    #[test]
    fn test_panic_is_contained() {
        let cb: Callback<u32> = Arc::new(|_: &Arc<u32>| panic!("boom"));
        match invoke_isolated("tapri", SubscriptionId(1), &cb, &Arc::new(7)) {
            Err(DeliveryError::Panicked(msg)) => assert_eq!(msg, "boom"),
            other => panic!("expected panic to be contained, got {other:?}"),
        }
    }
}
