//! Explicit actor + business time threaded through every mutating call.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::id::UserId;

/// Who is performing a mutation, and when (business time).
///
/// Workflows never look up a default user; callers always pass one.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContext {
    actor: UserId,
    at: DateTime<Utc>,
}

impl OperationContext {
    /// Context stamped with the current wall-clock time.
    pub fn new(actor: UserId) -> Self {
        Self {
            actor,
            at: Utc::now(),
        }
    }

    /// Context with an explicit business time (tests, imports, replays).
    pub fn at(actor: UserId, at: DateTime<Utc>) -> Self {
        Self { actor, at }
    }

    pub fn actor(&self) -> UserId {
        self.actor
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Business date of the operation (UTC).
    pub fn today(&self) -> NaiveDate {
        self.at.date_naive()
    }
}
