//! Naming helpers shared by the object and package builders.

use std::cmp::Ordering;

/// Generate an object id from a title.
///
/// Rules:
/// - Lowercase
/// - Replace non-alphanumeric characters with hyphens
/// - Collapse consecutive hyphens into one
/// - Trim leading/trailing hyphens
///
/// # Examples
///
/// ```
/// use fixturekit_types::naming::slugify;
///
/// assert_eq!(slugify("The Folder"), "the-folder");
/// assert_eq!(slugify("Report 2013 (final)"), "report-2013-final");
/// ```
pub fn slugify(title: &str) -> String {
    let slug: String = title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();

    let mut result = String::with_capacity(slug.len());
    let mut prev_was_hyphen = true;
    for c in slug.chars() {
        if c == '-' {
            if !prev_was_hyphen {
                result.push('-');
            }
            prev_was_hyphen = true;
        } else {
            result.push(c);
            prev_was_hyphen = false;
        }
    }

    if result.ends_with('-') {
        result.pop();
    }

    result
}

/// All parent dotted names of a dotted name, outermost first.
///
/// `"my.fancy.package"` yields `["my", "my.fancy"]`; a first-level name has
/// no parents.
pub fn parent_namespaces(dottedname: &str) -> Vec<String> {
    let segments: Vec<&str> = dottedname.split('.').collect();
    (1..segments.len())
        .map(|end| segments[..end].join("."))
        .collect()
}

/// Compare two profile versions.
///
/// Versions are split on `.`; segments that are both numeric compare as
/// integers, anything else compares lexically. `"999" < "1000"` and
/// `"1.2" < "1.10"`.
pub fn compare_versions(left: &str, right: &str) -> Ordering {
    let mut left_parts = left.split('.');
    let mut right_parts = right.split('.');
    loop {
        match (left_parts.next(), right_parts.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ordering = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    _ => l.cmp(r),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}
