//! Identifier allocation.
//!
//! New records are inserted through [`IdAllocator::allocate`], which picks a
//! candidate identifier and tries to insert the record under it. The store's
//! uniqueness constraint on identifiers is the only point of serialization:
//! when another writer wins the race for a candidate the insert fails with a
//! duplicate-key conflict and the allocator starts over with a fresh one.
//!
//! ```text
//! ComputeCandidate -> AttemptInsert -+-> Ok                 (done)
//!        ^                           +-> DuplicateKey ------+
//!        |                           +-> any other error    (fail)
//!        +--------------------------------------------------+
//! ```
//!
//! Two strategies are supported:
//!
//! - [`IdStrategy::Token`]: a fresh 96-bit random token per attempt.
//! - [`IdStrategy::Sequence`]: one more than the largest sequence number
//!   currently stored in the collection.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::identifier::{Identifier, IdentifierError};
use crate::store::{Store, StoreError};

/// How identifiers are chosen for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random URL-safe tokens.
    #[default]
    Token,
    /// Monotonic per-collection integers.
    Sequence,
}

impl IdStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdStrategy::Token => "token",
            IdStrategy::Sequence => "sequence",
        }
    }

    /// Parses the textual form of an identifier issued under this strategy.
    pub fn parse_id(&self, text: &str) -> Result<Identifier, IdentifierError> {
        match self {
            IdStrategy::Token => Identifier::parse_token(text),
            IdStrategy::Sequence => Identifier::parse_sequence(text),
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "token" => Ok(IdStrategy::Token),
            "sequence" => Ok(IdStrategy::Sequence),
            other => Err(format!(
                "Unknown id strategy '{}' (expected 'token' or 'sequence')",
                other
            )),
        }
    }
}

/// Bounds on how long an allocation keeps retrying after conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total insert attempts allowed; `None` retries for as long as it takes.
    pub max_attempts: Option<u32>,
    /// Conflicts beyond this many are logged at warn level.
    pub warn_after: u32,
}

impl RetryPolicy {
    pub fn unbounded() -> Self {
        Self {
            max_attempts: None,
            warn_after: 16,
        }
    }

    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            ..Self::unbounded()
        }
    }

    fn allows_another(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Errors that abort an allocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// Any store failure other than a duplicate-key conflict.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Gave up allocating an identifier in {collection} after {attempts} conflicting attempts")]
    RetriesExhausted { collection: String, attempts: u32 },

    #[error("Sequence identifiers exhausted in {0}")]
    SequenceOverflow(String),
}

/// Where a single allocation currently stands.
enum Attempt {
    ComputeCandidate,
    AttemptInsert(Identifier),
}

/// Allocates identifiers for new records. Stateless; share freely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdAllocator {
    strategy: IdStrategy,
    policy: RetryPolicy,
}

impl IdAllocator {
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            strategy,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Computes the next candidate identifier without reserving it.
    ///
    /// For sequences this reads the current maximum; a failed lookup is an
    /// error and is never mistaken for an empty collection.
    pub async fn propose(&self, store: &dyn Store, collection: &str) -> Result<Identifier, AllocError> {
        match self.strategy {
            IdStrategy::Token => Ok(Identifier::new_token()),
            IdStrategy::Sequence => {
                let next = match store.find_max_identifier(collection).await? {
                    Some(max) => max
                        .checked_add(1)
                        .ok_or_else(|| AllocError::SequenceOverflow(collection.to_string()))?,
                    None => 1,
                };
                Ok(Identifier::Sequence(next))
            }
        }
    }

    /// Inserts `record` into `collection` under a newly allocated identifier
    /// and returns that identifier.
    ///
    /// Only duplicate-key conflicts are retried. Every other store error is
    /// returned unchanged. There is no timeout here; callers needing bounded
    /// latency wrap the call in their own deadline or configure a
    /// [`RetryPolicy`].
    pub async fn allocate(
        &self,
        store: &dyn Store,
        collection: &str,
        record: &Value,
    ) -> Result<Identifier, AllocError> {
        let mut attempts: u32 = 0;
        let mut state = Attempt::ComputeCandidate;

        loop {
            state = match state {
                Attempt::ComputeCandidate => {
                    Attempt::AttemptInsert(self.propose(store, collection).await?)
                }
                Attempt::AttemptInsert(candidate) => {
                    attempts += 1;
                    match store.insert(collection, &candidate, record).await {
                        Ok(()) => {
                            tracing::debug!(
                                collection,
                                id = %candidate,
                                attempts,
                                "allocated identifier"
                            );
                            return Ok(candidate);
                        }
                        Err(StoreError::DuplicateKey { .. }) => {
                            if !self.policy.allows_another(attempts) {
                                tracing::warn!(
                                    collection,
                                    attempts,
                                    "giving up on identifier allocation"
                                );
                                return Err(AllocError::RetriesExhausted {
                                    collection: collection.to_string(),
                                    attempts,
                                });
                            }
                            if attempts >= self.policy.warn_after {
                                tracing::warn!(
                                    collection,
                                    id = %candidate,
                                    attempts,
                                    "identifier conflict, retrying"
                                );
                            } else {
                                tracing::debug!(
                                    collection,
                                    id = %candidate,
                                    attempts,
                                    "identifier conflict, retrying"
                                );
                            }
                            Attempt::ComputeCandidate
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
            };
        }
    }
}
