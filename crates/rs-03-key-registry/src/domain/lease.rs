//! # Lease Selection
//!
//! Least-recently-used choice among leasable keys. Ties on `last_used` go
//! to the lexicographically smallest identity so selection is repeatable.

use crate::domain::entities::KeyEntry;
use shared_types::Timestamp;

/// Whether `entry` may be leased now.
pub fn is_leasable(entry: &KeyEntry, stale_before: Option<Timestamp>) -> bool {
    !entry.in_use || stale_before.is_some_and(|cutoff| entry.last_used < cutoff)
}

/// Pick the next key to lease.
pub fn select_candidate<'a, I>(entries: I, stale_before: Option<Timestamp>) -> Option<&'a KeyEntry>
where
    I: IntoIterator<Item = &'a KeyEntry>,
{
    entries
        .into_iter()
        .filter(|e| is_leasable(e, stale_before))
        .min_by(|a, b| {
            a.last_used
                .cmp(&b.last_used)
                .then_with(|| a.identity.cmp(&b.identity))
        })
}
