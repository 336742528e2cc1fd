use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // A declared field name: one segment, no dots
    static ref FIELD_NAME_REGEX: Regex = Regex::new(
        r"^[A-Za-z_][A-Za-z0-9_\-]*$"
    ).unwrap();

    // A materialized path: names separated by dots, with numeric entry indices
    static ref FIELD_PATH_REGEX: Regex = Regex::new(
        r"^[A-Za-z_][A-Za-z0-9_\-]*(\.([A-Za-z_][A-Za-z0-9_\-]*|[0-9]+))*$"
    ).unwrap();

    static ref INDEX_SEGMENT_REGEX: Regex = Regex::new(r"^[0-9]+$").unwrap();
}

/// Check that a declared field name is a single well-formed segment.
pub fn is_valid_field_name(name: &str) -> bool {
    FIELD_NAME_REGEX.is_match(name)
}

/// Check the format of a field path.
///
/// Valid formats include:
/// - "name"
/// - "address.city"
/// - "employers.2.name"
/// - "employers.0.projects.1.title"
pub fn is_valid_field_path(path: &str) -> bool {
    FIELD_PATH_REGEX.is_match(path)
}

/// Whether a path segment is an entry index
pub fn is_index_segment(segment: &str) -> bool {
    INDEX_SEGMENT_REGEX.is_match(segment)
}

/// Join a parent path and a child name with a dot
pub fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Path of entry `index` under an array path, e.g. `employers.2`
pub fn indexed(array_path: &str, index: usize) -> String {
    format!("{}.{}", array_path, index)
}

/// Strip entry indices from a materialized path.
///
/// - "employers.2.name" -> "employers.name"
/// - "name" -> "name"
pub fn template_path(path: &str) -> String {
    path.split('.')
        .filter(|segment| !is_index_segment(segment))
        .collect::<Vec<_>>()
        .join(".")
}

/// Replace `from` with `to` when `path` lies strictly under `from` and does
/// not already name an entry of it.
///
/// Used to qualify a template path (`employers.current`) into a concrete
/// entry (`employers.3.current`); `employers.1.current` is left alone.
pub fn rebase(path: &str, from: &str, to: &str) -> Option<String> {
    let rest = path.strip_prefix(from)?.strip_prefix('.')?;
    let first = rest.split('.').next().unwrap_or_default();
    if is_index_segment(first) {
        return None;
    }
    Some(join(to, rest))
}

/// Whether `path` equals `ancestor` or lies underneath it
pub fn is_within(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .map(|rest| rest.starts_with('.'))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_field_paths() {
        assert!(is_valid_field_path("name"));
        assert!(is_valid_field_path("address.city"));
        assert!(is_valid_field_path("employers.2.name"));
        assert!(is_valid_field_path("employers.0.projects.11.title"));
        assert!(is_valid_field_path("has_previous-visas"));
    }

    #[test]
    fn test_invalid_field_paths() {
        assert!(!is_valid_field_path(""));
        assert!(!is_valid_field_path("name."));
        assert!(!is_valid_field_path(".name"));
        assert!(!is_valid_field_path("employers..name"));
        assert!(!is_valid_field_path("2.name"));
        assert!(!is_valid_field_path("na me"));
        assert!(!is_valid_field_path("naïve"));
    }

    #[test]
    fn test_field_names() {
        assert!(is_valid_field_name("firstName"));
        assert!(!is_valid_field_name("first.name"));
        assert!(!is_valid_field_name("0"));
    }

    #[test]
    fn test_template_path() {
        assert_eq!(template_path("employers.2.name"), "employers.name");
        assert_eq!(template_path("employers.0.projects.3.title"), "employers.projects.title");
        assert_eq!(template_path("name"), "name");
    }

    #[test]
    fn test_rebase() {
        assert_eq!(
            rebase("employers.current", "employers", "employers.3"),
            Some("employers.3.current".to_string())
        );
        assert_eq!(rebase("employersX.current", "employers", "employers.3"), None);
        assert_eq!(rebase("employers", "employers", "employers.3"), None);
        assert_eq!(rebase("employers.1.current", "employers", "employers.3"), None);
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("employers.1.name", "employers"));
        assert!(is_within("employers", "employers"));
        assert!(!is_within("employersOld.1", "employers"));
    }
}
