//! Post-processing applied to search results before they reach the caller.

use crate::object::DirectoryObject;
use crate::options::ObjectOptions;

/// Attributes kept even when the caller restricts the attribute set.
const ALWAYS_KEPT: &[&str] = &["cn"];

/// Filters and shapes `objects` according to `opts`, preserving order.
#[must_use]
pub fn process(opts: &ObjectOptions, objects: Vec<DirectoryObject>) -> Vec<DirectoryObject> {
    objects
        .into_iter()
        .filter(|object| matches_query(object, opts.query.as_deref()))
        .map(|object| match &opts.attributes {
            Some(keep) => project(object, keep),
            None => object,
        })
        .collect()
}

fn matches_query(object: &DirectoryObject, query: Option<&str>) -> bool {
    let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) else {
        return true;
    };
    let needle = query.to_lowercase();
    object.dn.to_lowercase().contains(&needle)
        || object
            .attributes
            .values()
            .flatten()
            .any(|value| value.to_lowercase().contains(&needle))
}

fn project(mut object: DirectoryObject, keep: &[String]) -> DirectoryObject {
    object.attributes.retain(|name, _| {
        ALWAYS_KEPT.iter().any(|k| name.eq_ignore_ascii_case(k))
            || keep.iter().any(|k| name.eq_ignore_ascii_case(k))
    });
    object
}
