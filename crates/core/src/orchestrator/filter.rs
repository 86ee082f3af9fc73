//! Result post-processing applied before results are emitted.

use chrono::{DateTime, Utc};

use crate::category::taxonomy;
use crate::source::{Query, ResultItem, Source};

/// Filter by the query's categories, clamp to its limit and pull
/// future-dated items back to `now`.
pub fn post_process(
    items: Vec<ResultItem>,
    query: &Query,
    source: &Source,
    now: DateTime<Utc>,
) -> Vec<ResultItem> {
    let limit = query.limit.filter(|&l| l > 0).unwrap_or(usize::MAX);
    items
        .into_iter()
        .filter(|item| matches_categories(item, query, source))
        .take(limit)
        .map(|mut item| {
            if item.publish_date > now {
                item.publish_date = now;
            }
            item
        })
        .collect()
}

/// Items without categories always pass; otherwise an item passes when it
/// shares a category with the query, or one of its categories is the child
/// of a queried one. Sources mapping children to parents also let
/// parent-tagged items through for child queries.
fn matches_categories(item: &ResultItem, query: &Query, source: &Source) -> bool {
    if !query.has_categories() || item.categories.is_empty() {
        return true;
    }
    item.categories.iter().any(|&cat| {
        query.categories.contains(&cat)
            || taxonomy::parent_of(cat).is_some_and(|parent| query.categories.contains(&parent))
            || (source.categories.maps_children_to_parent()
                && query
                    .categories
                    .iter()
                    .any(|&wanted| taxonomy::parent_of(wanted) == Some(cat)))
    })
}
