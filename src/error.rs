use crate::{EntityId, ResourceId};

/// Errors that are fatal to the offending process.
///
/// These indicate a model-construction bug rather than a runtime condition,
/// so they propagate out of [`Process::resume`](crate::Process::resume) and
/// abort the run. Recoverable conditions (cancelling an unknown request,
/// clamping a preemptive amount) are reported through
/// [`Environment::warnings`](crate::Environment::warnings) instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A negative fixed duration was passed to an activity or timeout.
    #[error("negative duration: {0}")]
    InvalidDuration(f64),

    /// A `get`/`put`/`add` would push the resource outside `[0, capacity]`.
    #[error("capacity violation on resource {resource}: {message}")]
    CapacityViolation {
        /// The resource on which the violation occurred.
        resource: ResourceId,
        /// What was attempted.
        message: String,
    },

    /// An entity attribute was read before being set.
    #[error("unknown attribute `{key}` on entity {entity}")]
    UnknownAttribute {
        /// Owner of the attribute map.
        entity: EntityId,
        /// The missing key.
        key: String,
    },

    /// Invalid parameters for a duration distribution.
    #[error("invalid distribution: {0}")]
    InvalidDistribution(String),
}

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
