//! Upstream override table and routing-tag parsing

use std::collections::HashMap;
use tracing::warn;

/// A statically configured alternate upstream for one routing tag.
#[derive(Debug, Clone)]
pub struct OverrideConfig {
    pub upstream_url: String,
    /// Proxy through this origin even for same-origin fetches, e.g. because
    /// the upstream serves no CORS headers of its own.
    pub must_proxy: bool,
}

/// Parse the tag → upstream table from its TSV form: one
/// `tag<TAB>upstream_url<TAB>must_proxy` row per line. Malformed rows are
/// skipped.
pub fn parse_overrides(tsv: &str) -> HashMap<String, OverrideConfig> {
    let mut overrides = HashMap::new();

    for line in tsv.trim().lines() {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() != 3 {
            continue;
        }
        let must_proxy = match parts[2].trim() {
            "true" | "1" => true,
            "false" | "0" => false,
            other => {
                warn!(tag = parts[0], value = other, "skipping override row with bad must_proxy flag");
                continue;
            }
        };
        overrides.insert(
            parts[0].to_string(),
            OverrideConfig {
                upstream_url: parts[1].to_string(),
                must_proxy,
            },
        );
    }

    overrides
}

/// Split a request path into its routing tag and object path.
///
/// The first segment is a routing tag iff it contains `:`; otherwise the
/// whole path is the object path and the tag is empty.
///
/// `/gd:123/abc/def` → `("gd:123", "/abc/def")`;
/// `/gd:123` → `("gd:123", "/")`;
/// `/abc/def` → `("", "/abc/def")`.
pub fn split_upstream_tag(path: &str) -> (&str, &str) {
    let trimmed = path.strip_prefix('/').unwrap_or(path);
    match trimmed.find('/') {
        Some(idx) if trimmed[..idx].contains(':') => (&trimmed[..idx], &trimmed[idx..]),
        None if trimmed.contains(':') => (trimmed, "/"),
        _ => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tagged_path() {
        assert_eq!(split_upstream_tag("/gd:123/abc/def"), ("gd:123", "/abc/def"));
        assert_eq!(split_upstream_tag("/ext:1/video.mp4"), ("ext:1", "/video.mp4"));
    }

    #[test]
    fn test_split_untagged_path_is_unchanged() {
        assert_eq!(split_upstream_tag("/abc/def"), ("", "/abc/def"));
        assert_eq!(split_upstream_tag("/movie.mp4"), ("", "/movie.mp4"));
    }

    #[test]
    fn test_split_tag_without_remainder() {
        assert_eq!(split_upstream_tag("/gd:123"), ("gd:123", "/"));
    }

    #[test]
    fn test_split_bare_and_root_paths() {
        assert_eq!(split_upstream_tag("/"), ("", "/"));
        assert_eq!(split_upstream_tag(""), ("", ""));
    }

    #[test]
    fn test_parse_overrides_rows() {
        let tsv = "ext:1\thttps://cdn.example\tfalse\next:2\thttps://mirror.example\ttrue\n";
        let overrides = parse_overrides(tsv);

        assert_eq!(overrides.len(), 2);
        assert_eq!(overrides["ext:1"].upstream_url, "https://cdn.example");
        assert!(!overrides["ext:1"].must_proxy);
        assert!(overrides["ext:2"].must_proxy);
    }

    #[test]
    fn test_parse_overrides_skips_malformed_rows() {
        let tsv = "only-two-columns\thttps://cdn.example\n\
                   ext:1\thttps://cdn.example\tmaybe\n\
                   ext:2\thttps://mirror.example\t1\n";
        let overrides = parse_overrides(tsv);

        assert_eq!(overrides.len(), 1);
        assert!(overrides["ext:2"].must_proxy);
    }

    #[test]
    fn test_parse_overrides_empty_input() {
        assert!(parse_overrides("").is_empty());
        assert!(parse_overrides("\n\n").is_empty());
    }
}
