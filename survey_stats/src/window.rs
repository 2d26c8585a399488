use chrono::{DateTime, Utc};
use log::debug;

use crate::config::{ClosedReason, Survey};

/// Whether a survey accepts responses at a given instant.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum WindowStatus {
    Open,
    Closed(ClosedReason),
}

/// Evaluates the window of a survey. Both bounds of the window are inclusive.
///
/// An inactive survey is reported as such, whatever the dates.
pub fn window_status(survey: &Survey, now: DateTime<Utc>) -> WindowStatus {
    let status = if !survey.is_active {
        WindowStatus::Closed(ClosedReason::NotActive)
    } else if now < survey.start_date {
        WindowStatus::Closed(ClosedReason::NotYetStarted {
            opens_at: survey.start_date,
        })
    } else if now > survey.end_date {
        WindowStatus::Closed(ClosedReason::AlreadyEnded {
            closed_at: survey.end_date,
        })
    } else {
        WindowStatus::Open
    };
    debug!(
        "window_status: survey {} at {}: {:?}",
        survey.id,
        now.to_rfc3339(),
        status
    );
    status
}

pub fn is_open(survey: &Survey, now: DateTime<Utc>) -> bool {
    window_status(survey, now) == WindowStatus::Open
}
