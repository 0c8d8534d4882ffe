use log::{debug, trace};

use crate::{
    model::module_path::ModulePath,
    tags::{extract_version, filter_tags_for_subpath, TagError},
    version::{Constraint, Version},
};

/// The release picked for a module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// The bare version token, e.g. `v1.2.0`.
    pub version: String,
    /// The tag to fetch, e.g. `span/v1.2.0`.
    pub tag: String,
    /// Whether the repository's root tags were used for a subpath module.
    pub root_fallback: bool,
}

/// Picks the highest version satisfying `constraint` among the tags of the
/// module's repository.
///
/// Subpath modules use their own `subpath/vX.Y.Z` or `vX.Y.Z-subpath` tags.
/// When a subpath has no version tags at all, the repository's root tags are
/// used instead and the selected root tag is fetched as is.
pub fn select_version<S: AsRef<str>>(
    tags: &[S],
    module: &ModulePath,
    constraint: &Constraint,
) -> Result<Option<Selection>, TagError> {
    let candidates = filter_tags_for_subpath(tags, &module.subpath)
        .into_iter()
        .map(|tag| Ok((extract_version(&tag, &module.subpath)?, tag)))
        .collect::<Result<Vec<_>, TagError>>()?;

    let has_versions = candidates
        .iter()
        .any(|(token, _)| Version::parse(token).is_ok());

    if module.has_subpath() && !has_versions {
        debug!(
            "No version tags for subpath {} of {}, falling back to root tags",
            module.subpath, module.repo
        );
        let root = filter_tags_for_subpath(tags, "")
            .into_iter()
            .map(|tag| (tag.clone(), tag));
        return Ok(highest_match(root, constraint).map(|(version, tag)| Selection {
            version,
            tag,
            root_fallback: true,
        }));
    }

    Ok(
        highest_match(candidates, constraint).map(|(version, tag)| Selection {
            version,
            tag,
            root_fallback: false,
        }),
    )
}

// On ties the first candidate wins, so the result follows the tag order.
fn highest_match(
    candidates: impl IntoIterator<Item = (String, String)>,
    constraint: &Constraint,
) -> Option<(String, String)> {
    let mut best: Option<(Version, String, String)> = None;
    for (token, tag) in candidates {
        let Ok(version) = Version::parse(&token) else {
            trace!("Skipping tag {tag}: not a version");
            continue;
        };
        if !version.satisfies(constraint) {
            continue;
        }
        if best.as_ref().map_or(true, |(current, _, _)| version > *current) {
            best = Some((version, token, tag));
        }
    }
    best.map(|(_, token, tag)| (token, tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn select(tags: &[&str], module: &str, constraint: &str) -> Option<Selection> {
        select_version(
            tags,
            &ModulePath::parse(module).unwrap(),
            &Constraint::parse(constraint).unwrap(),
        )
        .unwrap()
    }

    fn selected(version: &str, tag: &str, root_fallback: bool) -> Option<Selection> {
        Some(Selection {
            version: version.to_owned(),
            tag: tag.to_owned(),
            root_fallback,
        })
    }

    #[test]
    fn highest_compatible_root_tag() {
        let tags = ["v0.9.0", "v1.0.0", "v1.2.0", "v2.0.0"];
        assert_eq!(
            select(&tags, "github.com/acme/list", "^1.0.0"),
            selected("v1.2.0", "v1.2.0", false)
        );
    }

    #[test]
    fn any_picks_highest_release() {
        let tags = ["v1.0.0", "v3.0.0-rc.1", "v2.5.1", "nightly", "docs/v9.0.0"];
        assert_eq!(
            select(&tags, "github.com/acme/list", ""),
            selected("v3.0.0-rc.1", "v3.0.0-rc.1", false)
        );
    }

    #[test]
    fn keeps_tag_spelling() {
        let tags = ["1.0.0", "v1.1.0", "1.2.0"];
        assert_eq!(
            select(&tags, "github.com/acme/list", "~1.2.0"),
            selected("1.2.0", "1.2.0", false)
        );
    }

    #[test]
    fn first_tag_wins_ties() {
        let tags = ["v1.0.0+linux", "1.0.0", "v1.0.0"];
        assert_eq!(
            select(&tags, "github.com/acme/list", "^1.0.0"),
            selected("v1.0.0+linux", "v1.0.0+linux", false)
        );
    }

    #[test]
    fn subpath_prefix_tags() {
        let tags = [
            "v5.0.0",
            "intrusive_list/v1.0.0",
            "intrusive_list/v1.3.0",
            "span/v1.9.0",
        ];
        assert_eq!(
            select(&tags, "github.com/acme/libs/intrusive_list", "^1.0.0"),
            selected("v1.3.0", "intrusive_list/v1.3.0", false)
        );
    }

    #[test]
    fn subpath_suffix_tags() {
        let tags = ["v1.0.0-span", "v1.1.0-span", "v1.4.0-list"];
        assert_eq!(
            select(&tags, "github.com/acme/libs/span", "^1.0.0"),
            selected("v1.1.0", "v1.1.0-span", false)
        );
    }

    #[test]
    fn subpath_without_tags_falls_back_to_root() {
        let tags = ["v1.0.0", "v1.4.2", "v2.0.0", "other/v1.9.0"];
        assert_eq!(
            select(&tags, "github.com/acme/repo/sub/dir", "^1.0.0"),
            selected("v1.4.2", "v1.4.2", true)
        );
    }

    #[test]
    fn subpath_with_only_non_version_tags_falls_back() {
        let tags = ["sub/latest", "v0.3.1"];
        assert_eq!(
            select(&tags, "github.com/acme/repo/sub", "^0.3.0"),
            selected("v0.3.1", "v0.3.1", true)
        );
    }

    #[test]
    fn subpath_tags_do_not_fall_back_when_incompatible() {
        let tags = ["span/v1.0.0", "v2.0.0"];
        assert_eq!(select(&tags, "github.com/acme/libs/span", "^2.0.0"), None);
    }

    #[test]
    fn no_compatible_version() {
        let tags = ["v0.9.0", "v2.0.0"];
        assert_eq!(select(&tags, "github.com/acme/list", "^1.0.0"), None);
        assert_eq!(select(&[], "github.com/acme/list", ""), None);
    }
}
