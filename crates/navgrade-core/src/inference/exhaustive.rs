//! Exhaustive-negative-proof closure.
//!
//! A query is exhausted when every slot in the Cartesian product of its
//! dimensions (restaurant × party size × date × time, with an open dimension
//! contributing a single wildcard) is proven unavailable by some recorded
//! negative snapshot.

use super::snapshot::{InfoSnapshot, MultiCandidateQuery, SlotQuery};

/// All concrete slots a query expands to.
pub fn slots(query: &MultiCandidateQuery) -> Vec<SlotQuery<'_>> {
    fn or_wildcard<T: Copy>(values: Option<&[T]>) -> Vec<Option<T>> {
        match values {
            Some(v) => v.iter().copied().map(Some).collect(),
            None => vec![None],
        }
    }

    let names: Vec<Option<&str>> = match query.names() {
        Some(n) => n.iter().map(|s| Some(s.as_str())).collect(),
        None => vec![None],
    };
    let sizes = or_wildcard(query.party_sizes());
    let dates = or_wildcard(query.dates());
    let times = or_wildcard(query.times());

    let mut out = Vec::with_capacity(names.len() * sizes.len() * dates.len() * times.len());
    for name in &names {
        for size in &sizes {
            for date in &dates {
                for time in &times {
                    out.push(SlotQuery {
                        restaurant_name: *name,
                        party_size: *size,
                        date: *date,
                        time: *time,
                    });
                }
            }
        }
    }
    out
}

/// Whether `negatives` prove every slot of `query` unavailable.
pub fn is_exhausted<'a, I>(query: &MultiCandidateQuery, negatives: I) -> bool
where
    I: IntoIterator<Item = &'a InfoSnapshot>,
    I::IntoIter: Clone,
{
    let negatives = negatives.into_iter();
    slots(query)
        .iter()
        .all(|slot| negatives.clone().any(|snap| snap.proves_unavailable(slot)))
}
