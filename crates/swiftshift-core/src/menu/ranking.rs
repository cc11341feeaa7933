//! Smart topology: which topics are shown directly under a parent.

use std::cmp::Ordering;

use crate::domain::Destination;

/// Default number of topics rendered directly under their parent.
pub const TOP_TOPICS: usize = 5;

#[derive(Debug, Default)]
pub struct RankedTopics<'a> {
    pub top: Vec<&'a Destination>,
    pub more: Vec<&'a Destination>,
}

/// Split `topics` into the directly visible ones and the "More Topics" overflow.
///
/// Pinned topics come first, then recently used ones by recency index, then the
/// rest in their stored order. The overflow is sorted alphabetically.
pub fn rank_topics<'a>(
    topics: &[&'a Destination],
    recency: &[String],
    limit: usize,
) -> RankedTopics<'a> {
    let mut sorted = topics.to_vec();
    sorted.sort_by_key(|t| {
        let recent = recency
            .iter()
            .position(|id| *id == t.id)
            .unwrap_or(usize::MAX);
        (!t.pinned, recent)
    });

    let split = limit.min(sorted.len());
    let mut more = sorted.split_off(split);
    more.sort_by(|a, b| compare_names(&a.name, &b.name));

    RankedTopics { top: sorted, more }
}

/// Case-insensitive comparison with an exact tie-break so ordering is total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
