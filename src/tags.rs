//! Classification of repository tags for subpath-scoped modules.
//!
//! A repository hosting several independently versioned directories tags
//! their releases either as `subpath/v1.2.3` (prefix form) or as
//! `v1.2.3-subpath` (suffix form). Only the string shape of a tag is used to
//! decide which directory it belongs to.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("tag `{tag}` does not match subpath `{subpath}`")]
pub struct TagError {
    pub tag: String,
    pub subpath: String,
}

/// Keeps the tags relevant to `subpath`.
///
/// Without a subpath every tag is kept except those containing a `/` that do
/// not start with `v`, which most likely version some other directory. Tags
/// that are not version-shaped are left for version parsing to reject.
pub fn filter_tags_for_subpath<S: AsRef<str>>(tags: &[S], subpath: &str) -> Vec<String> {
    tags.iter()
        .map(AsRef::as_ref)
        .filter(|tag| {
            if subpath.is_empty() {
                !(tag.contains('/') && !tag.starts_with('v'))
            } else {
                strip_subpath(tag, subpath).is_some()
            }
        })
        .map(str::to_owned)
        .collect()
}

/// Recovers the bare version token from a tag, e.g.
/// `intrusive_list/v1.0.0` -> `v1.0.0` for subpath `intrusive_list`.
/// Tags are returned unchanged when there is no subpath.
pub fn extract_version(tag: &str, subpath: &str) -> Result<String, TagError> {
    if subpath.is_empty() {
        return Ok(tag.to_owned());
    }
    strip_subpath(tag, subpath)
        .map(str::to_owned)
        .ok_or_else(|| TagError {
            tag: tag.to_owned(),
            subpath: subpath.to_owned(),
        })
}

// Prefix form first, suffix form second.
fn strip_subpath<'a>(tag: &'a str, subpath: &str) -> Option<&'a str> {
    tag.strip_prefix(subpath)
        .and_then(|rest| rest.strip_prefix('/'))
        .filter(|version| !version.is_empty())
        .or_else(|| {
            tag.strip_suffix(subpath)
                .and_then(|rest| rest.strip_suffix('-'))
                .filter(|version| !version.is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn prefix_form() {
        let tags = ["intrusive_list/v1.0.0", "span/v1.0.0", "v1.0.0"];
        assert_eq!(
            filter_tags_for_subpath(&tags, "intrusive_list"),
            vec!["intrusive_list/v1.0.0"]
        );
    }

    #[test]
    fn suffix_form() {
        let tags = ["v1.0.0-intrusive_list", "v1.0.0-span"];
        assert_eq!(
            filter_tags_for_subpath(&tags, "intrusive_list"),
            vec!["v1.0.0-intrusive_list"]
        );
    }

    #[test]
    fn mixed_forms_keep_order() {
        let tags = [
            "span/v1.1.0",
            "v1.0.0-span",
            "v1.0.0-alpha",
            "spanner/v2.0.0",
            "span/v1.2.0",
        ];
        assert_eq!(
            filter_tags_for_subpath(&tags, "span"),
            vec!["span/v1.1.0", "v1.0.0-span", "span/v1.2.0"]
        );
    }

    #[test]
    fn nested_subpath() {
        let tags = ["libs/span/v0.2.0", "span/v0.3.0", "v0.1.0-libs/span"];
        assert_eq!(
            filter_tags_for_subpath(&tags, "libs/span"),
            vec!["libs/span/v0.2.0", "v0.1.0-libs/span"]
        );
    }

    #[test]
    fn root_filter_drops_foreign_prefix_tags() {
        let tags = [
            "v1.0.0",
            "span/v1.0.0",
            "v2.0.0-rc.1",
            "release-2024",
            "v3/legacy",
        ];
        assert_eq!(
            filter_tags_for_subpath(&tags, ""),
            vec!["v1.0.0", "v2.0.0-rc.1", "release-2024", "v3/legacy"]
        );
    }

    #[test]
    fn bare_subpath_is_not_a_tag() {
        let tags = ["span/", "-span", "span"];
        assert!(filter_tags_for_subpath(&tags, "span").is_empty());
    }

    #[test]
    fn extract_prefix_and_suffix() {
        assert_eq!(
            extract_version("intrusive_list/v1.0.0", "intrusive_list").unwrap(),
            "v1.0.0"
        );
        assert_eq!(
            extract_version("v1.0.0-intrusive_list", "intrusive_list").unwrap(),
            "v1.0.0"
        );
        assert_eq!(
            extract_version("v1.0.0-rc.1-span", "span").unwrap(),
            "v1.0.0-rc.1"
        );
    }

    #[test]
    fn extract_without_subpath() {
        assert_eq!(extract_version("v1.0.0", "").unwrap(), "v1.0.0");
    }

    #[test]
    fn extract_mismatch() {
        assert_eq!(
            extract_version("intrusive_list/v1.0.0", "span"),
            Err(TagError {
                tag: "intrusive_list/v1.0.0".to_owned(),
                subpath: "span".to_owned(),
            })
        );
        assert!(extract_version("v1.0.0", "span").is_err());
    }
}
