//! Transition detector (spec §4.H).
//!
//! A pure function with no teacher analogue: given the previous dependency
//! row (if any) and the newly-parsed record, classifies the change.

use db::models::{CanonicalDependency, Dependency};

/// The five possible classifications of a poll's effect on one dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    NoChange,
    FirstSeen,
    BecameUnhealthy,
    Recovered,
    StillUnhealthyButErrorChanged,
}

impl Transition {
    /// Only these two kinds produce an alert event (spec §4.H).
    pub fn is_alertable(self) -> bool {
        matches!(self, Transition::BecameUnhealthy | Transition::Recovered)
    }
}

/// Classify the effect of a newly-parsed record against the previous row.
///
/// A first-seen record that is already unhealthy is treated the same as a
/// transition from an unknown prior state (spec §8 S1): it reports
/// `BecameUnhealthy` with `previous_healthy = None`, not `FirstSeen`, so it
/// still produces a status-change event and an alert.
pub fn classify(previous: Option<&Dependency>, new: &CanonicalDependency) -> Transition {
    let previous = match previous {
        None => {
            return if new.healthy == Some(false) {
                Transition::BecameUnhealthy
            } else {
                Transition::FirstSeen
            };
        }
        Some(p) => p,
    };

    match (previous.healthy, new.healthy) {
        (prev, cur) if prev == cur => {
            if cur == Some(false) && error_changed(previous, new) {
                Transition::StillUnhealthyButErrorChanged
            } else {
                Transition::NoChange
            }
        }
        (prev, Some(false)) if prev != Some(false) => Transition::BecameUnhealthy,
        (Some(false), cur) if cur != Some(false) => Transition::Recovered,
        _ => Transition::NoChange,
    }
}

fn error_changed(previous: &Dependency, new: &CanonicalDependency) -> bool {
    previous.error_message.as_deref() != new.error_message.as_deref()
        || previous.error != new.error
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn dependency_row(healthy: Option<bool>, error_message: Option<&str>) -> Dependency {
        Dependency {
            id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            name: "db".to_string(),
            canonical_name: "db".to_string(),
            description: None,
            impact: None,
            dependency_type: "database".to_string(),
            healthy,
            health_state: None,
            health_code: None,
            latency_ms: None,
            last_checked: Utc::now(),
            last_status_change: Utc::now(),
            error: None,
            error_message: error_message.map(|s| s.to_string()),
            skipped: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn canonical(healthy: Option<bool>, error_message: Option<&str>) -> CanonicalDependency {
        CanonicalDependency {
            name: "db".to_string(),
            description: None,
            impact: None,
            dependency_type: None,
            healthy,
            health_state: None,
            health_code: None,
            latency_ms: None,
            error: None,
            error_message: error_message.map(|s| s.to_string()),
        }
    }

    #[test]
    fn first_seen_when_no_previous_row() {
        assert_eq!(classify(None, &canonical(Some(true), None)), Transition::FirstSeen);
    }

    #[test]
    fn first_seen_unhealthy_is_became_unhealthy() {
        assert_eq!(
            classify(None, &canonical(Some(false), Some("down"))),
            Transition::BecameUnhealthy
        );
    }

    #[test]
    fn no_change_when_healthy_unchanged() {
        let prev = dependency_row(Some(true), None);
        assert_eq!(classify(Some(&prev), &canonical(Some(true), None)), Transition::NoChange);
    }

    #[test]
    fn became_unhealthy_on_true_to_false() {
        let prev = dependency_row(Some(true), None);
        assert_eq!(
            classify(Some(&prev), &canonical(Some(false), Some("timeout"))),
            Transition::BecameUnhealthy
        );
    }

    #[test]
    fn recovered_on_false_to_true() {
        let prev = dependency_row(Some(false), Some("timeout"));
        assert_eq!(classify(Some(&prev), &canonical(Some(true), None)), Transition::Recovered);
    }

    #[test]
    fn still_unhealthy_with_changed_error_message() {
        let prev = dependency_row(Some(false), Some("timeout"));
        assert_eq!(
            classify(Some(&prev), &canonical(Some(false), Some("connection refused"))),
            Transition::StillUnhealthyButErrorChanged
        );
    }

    #[test]
    fn still_unhealthy_with_unchanged_error_is_no_change() {
        let prev = dependency_row(Some(false), Some("timeout"));
        assert_eq!(
            classify(Some(&prev), &canonical(Some(false), Some("timeout"))),
            Transition::NoChange
        );
    }

    #[test]
    fn unknown_to_unhealthy_is_became_unhealthy() {
        let prev = dependency_row(None, None);
        assert_eq!(
            classify(Some(&prev), &canonical(Some(false), Some("down"))),
            Transition::BecameUnhealthy
        );
    }
}
