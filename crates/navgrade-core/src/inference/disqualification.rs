//! Disqualification-driven closure.
//!
//! Some page messages disclose that a whole region of the query space is
//! impossible for one restaurant: the booking horizon ends before a date, or
//! the party size is outside what the restaurant accepts. An alternative that
//! names that restaurant and lies entirely inside the impossible region is
//! resolved by the disclosure alone.

use chrono::NaiveDate;

use super::snapshot::{
    InfoSnapshot, MultiCandidateQuery, HORIZON_MESSAGE, PARTY_TOO_LARGE_MESSAGE,
    PARTY_TOO_SMALL_MESSAGE,
};

/// A structural impossibility disclosed by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disqualification {
    /// No online bookings on or after `cutoff`.
    BookingHorizon { restaurant: String, cutoff: NaiveDate },
    /// Parties of `size` or fewer are refused.
    PartyTooSmall { restaurant: String, size: u32 },
    /// Parties of `size` or more are refused.
    PartyTooLarge { restaurant: String, size: u32 },
}

impl Disqualification {
    /// Every disqualification disclosed by one snapshot.
    pub fn from_snapshot(snapshot: &InfoSnapshot) -> Vec<Self> {
        let msg = snapshot.info.to_lowercase();
        let restaurant = snapshot.restaurant_name.to_lowercase();
        let mut out = Vec::new();
        if msg.contains(HORIZON_MESSAGE) {
            if let Some(cutoff) = snapshot.date {
                out.push(Self::BookingHorizon {
                    restaurant: restaurant.clone(),
                    cutoff,
                });
            }
        }
        if msg.contains(PARTY_TOO_SMALL_MESSAGE) {
            out.push(Self::PartyTooSmall {
                restaurant: restaurant.clone(),
                size: snapshot.party_size,
            });
        }
        if msg.contains(PARTY_TOO_LARGE_MESSAGE) {
            out.push(Self::PartyTooLarge {
                restaurant,
                size: snapshot.party_size,
            });
        }
        out
    }

    pub fn restaurant(&self) -> &str {
        match self {
            Self::BookingHorizon { restaurant, .. }
            | Self::PartyTooSmall { restaurant, .. }
            | Self::PartyTooLarge { restaurant, .. } => restaurant,
        }
    }

    /// Short reason code for provenance.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BookingHorizon { .. } => "booking_horizon_exceeded",
            Self::PartyTooSmall { .. } => "party_too_small",
            Self::PartyTooLarge { .. } => "party_too_large",
        }
    }

    /// Whether `query` is resolved by this disclosure: it must name the
    /// restaurant and its whole requested dimension must be on the
    /// disqualified side. Queries that leave the dimension open are not.
    pub fn rules_out(&self, query: &MultiCandidateQuery) -> bool {
        if !query.names_restaurant(self.restaurant()) {
            return false;
        }
        match self {
            Self::BookingHorizon { cutoff, .. } => query
                .dates()
                .is_some_and(|dates| dates.iter().all(|d| d >= cutoff)),
            Self::PartyTooSmall { size, .. } => query
                .party_sizes()
                .is_some_and(|sizes| sizes.iter().all(|s| s <= size)),
            Self::PartyTooLarge { size, .. } => query
                .party_sizes()
                .is_some_and(|sizes| sizes.iter().all(|s| s >= size)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::snapshot::fixtures::{query, snapshot};
    use super::*;

    #[test]
    fn test_booking_horizon() {
        let snap = snapshot(
            "Chez TJ",
            2,
            "2025-09-01",
            "19:00:00",
            "Sorry, we don't take online reservations that far in advance.",
        );
        let dq = Disqualification::from_snapshot(&snap);
        assert_eq!(dq.len(), 1);
        assert_eq!(dq[0].code(), "booking_horizon_exceeded");

        let beyond = query(&["chez tj"], &["2025-09-01", "2025-09-15"], &[], &[]);
        let straddling = query(&["chez tj"], &["2025-08-31", "2025-09-15"], &[], &[]);
        let other = query(&["nari"], &["2025-09-15"], &[], &[]);
        let unnamed = query(&[], &["2025-09-15"], &[], &[]);
        let open_dates = query(&["chez tj"], &[], &[], &[]);
        assert!(dq[0].rules_out(&beyond));
        assert!(!dq[0].rules_out(&straddling));
        assert!(!dq[0].rules_out(&other));
        assert!(!dq[0].rules_out(&unnamed));
        assert!(!dq[0].rules_out(&open_dates));
    }

    #[test]
    fn test_party_bounds() {
        let small = snapshot("Nari", 1, "2025-06-30", "19:00:00", "Your party is too small");
        let large = snapshot("Nari", 8, "2025-06-30", "19:00:00", "Your party is too large");
        let small = &Disqualification::from_snapshot(&small)[0];
        let large = &Disqualification::from_snapshot(&large)[0];

        assert!(small.rules_out(&query(&["NARI"], &[], &[], &[1])));
        assert!(!small.rules_out(&query(&["nari"], &[], &[], &[1, 2])));
        assert!(large.rules_out(&query(&["nari"], &[], &[], &[8, 10])));
        assert!(!large.rules_out(&query(&["nari"], &[], &[], &[6, 8])));
    }

    #[test]
    fn test_plain_messages_disclose_nothing() {
        let snap = snapshot("Nari", 2, "2025-06-30", "19:00:00", "Unavailable");
        assert!(Disqualification::from_snapshot(&snap).is_empty());
    }
}
