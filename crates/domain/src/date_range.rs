use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use staffhub_core::{AppError, AppResult};

/// Closed interval of instants where `end` never precedes `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    /// Creates a validated date range.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> AppResult<Self> {
        if end < start {
            return Err(AppError::Validation(
                "end must not be earlier than start".to_owned(),
            ));
        }

        Ok(Self { start, end })
    }

    /// Range starting at `start` lasting one hour, the default for new events.
    #[must_use]
    pub fn one_hour_from(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start + Duration::hours(1),
        }
    }

    /// Returns range start.
    #[must_use]
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns range end.
    #[must_use]
    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns range length.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Returns whether the ranges share at least one instant.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}
