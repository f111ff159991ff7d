// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Demurrage calculation.
//!
//! Pure and deterministic: no I/O, recomputable from scratch whenever a
//! visit's times are corrected.

use crate::models::{Geofence, LocationVisit};

/// Result of a demurrage calculation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Demurrage {
    /// Hours beyond the geofence's free time. Zero when the stay fit
    /// inside the free window.
    pub chargeable_hours: f64,
    /// None when nothing is chargeable or the fence has no rate.
    pub charge: Option<f64>,
}

/// Compute demurrage for a visit against its geofence's billing rules.
///
/// Returns None if the visit has no exit time yet or the geofence does
/// not have demurrage enabled.
pub fn compute_demurrage(visit: &LocationVisit, geofence: &Geofence) -> Option<Demurrage> {
    if !geofence.demurrage_enabled {
        return None;
    }
    let duration = visit.duration_hours()?;

    let chargeable_hours = (duration - geofence.free_time_hours).max(0.0);

    let charge = if chargeable_hours > 0.0 {
        geofence
            .demurrage_rate_per_hour
            .map(|rate| chargeable_hours * rate)
    } else {
        None
    };

    Some(Demurrage {
        chargeable_hours,
        charge,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FenceBoundary, FencePolicy};
    use geo::polygon;
    use uuid::Uuid;

    fn billing_fence(free_hours: f64, rate: Option<f64>) -> Geofence {
        Geofence {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Container Terminal".to_string(),
            location_type: "PORT".to_string(),
            boundary: FenceBoundary::Polygon(polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 0.0),
            ]),
            policy: FencePolicy::Inclusion,
            demurrage_enabled: true,
            free_time_hours: free_hours,
            demurrage_rate_per_hour: rate,
            is_active: true,
        }
    }

    fn visit_lasting(entry: &str, exit: Option<&str>) -> LocationVisit {
        let mut visit = LocationVisit::open(
            Uuid::new_v4(),
            Uuid::new_v4(),
            None,
            entry.parse().unwrap(),
            Uuid::new_v4(),
        );
        if let Some(exit) = exit {
            visit.close(exit.parse().unwrap(), Uuid::new_v4());
        }
        visit
    }

    #[test]
    fn four_hour_visit_with_two_free_hours() {
        let fence = billing_fence(2.0, Some(50.0));
        let visit = visit_lasting("2024-01-15T08:00:00Z", Some("2024-01-15T12:00:00Z"));

        let result = compute_demurrage(&visit, &fence).unwrap();
        assert_eq!(result.chargeable_hours, 2.0);
        assert_eq!(result.charge, Some(100.0));
    }

    #[test]
    fn visit_within_free_time_has_no_charge() {
        let fence = billing_fence(2.0, Some(50.0));
        let visit = visit_lasting("2024-01-15T08:00:00Z", Some("2024-01-15T09:00:00Z"));

        let result = compute_demurrage(&visit, &fence).unwrap();
        assert_eq!(result.chargeable_hours, 0.0);
        assert_eq!(result.charge, None);
    }

    #[test]
    fn active_visit_yields_none() {
        let fence = billing_fence(2.0, Some(50.0));
        let visit = visit_lasting("2024-01-15T08:00:00Z", None);
        assert!(compute_demurrage(&visit, &fence).is_none());
    }

    #[test]
    fn disabled_demurrage_yields_none() {
        let mut fence = billing_fence(2.0, Some(50.0));
        fence.demurrage_enabled = false;
        let visit = visit_lasting("2024-01-15T08:00:00Z", Some("2024-01-15T12:00:00Z"));
        assert!(compute_demurrage(&visit, &fence).is_none());
    }

    #[test]
    fn chargeable_hours_without_rate_yield_no_charge() {
        let fence = billing_fence(1.0, None);
        let visit = visit_lasting("2024-01-15T08:00:00Z", Some("2024-01-15T12:00:00Z"));

        let result = compute_demurrage(&visit, &fence).unwrap();
        assert_eq!(result.chargeable_hours, 3.0);
        assert_eq!(result.charge, None);
    }

    #[test]
    fn recomputation_after_time_correction_is_from_scratch() {
        let fence = billing_fence(2.0, Some(50.0));
        let mut visit = visit_lasting("2024-01-15T08:00:00Z", Some("2024-01-15T12:00:00Z"));

        let first = compute_demurrage(&visit, &fence).unwrap();
        assert_eq!(first.charge, Some(100.0));

        // Administrative correction shortens the stay; recomputing must
        // not carry anything over from the previous result.
        visit.exit_time = Some("2024-01-15T09:30:00Z".parse().unwrap());
        let second = compute_demurrage(&visit, &fence).unwrap();
        assert_eq!(second.chargeable_hours, 0.0);
        assert_eq!(second.charge, None);
    }

    #[test]
    fn fractional_hours_are_charged_fractionally() {
        let fence = billing_fence(2.0, Some(40.0));
        let visit = visit_lasting("2024-01-15T08:00:00Z", Some("2024-01-15T10:45:00Z"));

        let result = compute_demurrage(&visit, &fence).unwrap();
        assert!((result.chargeable_hours - 0.75).abs() < 1e-9);
        assert!((result.charge.unwrap() - 30.0).abs() < 1e-9);
    }
}
