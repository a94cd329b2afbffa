//! Indirect coverage: evidence that resolves a requirement without the exact
//! target ever being observed.
//!
//! - [`neighbor`]: an unlisted time is resolved by visible neighbors.
//! - [`disqualification`]: a page message rules out a region of the query.
//! - [`exhaustive`]: every slot of a query was proven unavailable.
//!
//! All three only ever add coverage, and all three are pure functions of
//! recorded observations, so an episode can be re-graded offline.

pub mod disqualification;
pub mod exhaustive;
pub mod neighbor;
pub mod snapshot;

pub use disqualification::Disqualification;
pub use neighbor::{AvailabilitySlot, Condition, SlotHistory};
pub use snapshot::{InfoSnapshot, MultiCandidateQuery, SnapshotKind, SnapshotMatch};
