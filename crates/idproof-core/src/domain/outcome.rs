//! Tagged adapter results.

/// Result of asking an external capability for something.
///
/// `Degraded` carries a stand-in value the pipeline may keep running with,
/// and is always distinguishable from a genuine `Ok` even when the values are
/// equal.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The capability produced a genuine value.
    Ok(T),
    /// The capability failed and a neutral stand-in was substituted.
    Degraded {
        /// The stand-in value.
        value: T,
        /// Why the capability failed (for logs).
        reason: String,
    },
    /// The capability failed and no stand-in makes sense.
    Failed(String),
}

impl<T> Outcome<T> {
    /// Returns the value, genuine or stand-in.
    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(value) | Self::Degraded { value, .. } => Some(value),
            Self::Failed(_) => None,
        }
    }

    /// Returns the value only if it is genuine.
    #[must_use]
    pub const fn genuine(&self) -> Option<&T> {
        match self {
            Self::Ok(value) => Some(value),
            _ => None,
        }
    }

    /// Whether a stand-in value was substituted.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// Failure reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Degraded { reason, .. } | Self::Failed(reason) => Some(reason),
        }
    }

    /// Maps the carried value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ok(value) => Outcome::Ok(f(value)),
            Self::Degraded { value, reason } => Outcome::Degraded {
                value: f(value),
                reason,
            },
            Self::Failed(reason) => Outcome::Failed(reason),
        }
    }
}
