//! Time source for feed timestamps.

use chrono::{DateTime, SubsecRound, Utc};

/// Supplies the instant written into `updated`/`published` fields.
pub trait Clock: Send + Sync {
    /// Current instant as seen by the catalog.
    fn now(&self) -> DateTime<Utc>;
}

/// A clock that always returns the same instant.
///
/// The service freezes time once at startup and stamps every feed with it,
/// so repeated requests produce byte-identical documents until restart.
#[derive(Debug, Clone, Copy)]
pub struct FrozenClock(DateTime<Utc>);

impl FrozenClock {
    /// Freeze the given instant, dropping sub-second precision.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant.trunc_subsecs(0))
    }

    /// Freeze the current wall-clock time.
    pub fn startup() -> Self {
        Self::at(Utc::now())
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
