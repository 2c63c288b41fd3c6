//! Decides under which tag an already published commit image is promoted.

use std::sync::LazyLock;

use regex::Regex;

const HEADS_PREFIX: &str = "refs/heads/";
const TAGS_PREFIX: &str = "refs/tags/";

/// Maintenance branches such as `v1.2.x` or `t12.0.x-hotfix`. Images built from these branches
/// must be tagged manually before they are published.
static VERSION_BRANCH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[vt][0-9]{1,2}\.[0-9]{1,2}\.x").unwrap());

enum Rule {
    /// The ref is a tag, the image is published under the same tag.
    ReleaseTag,
    /// A long-lived branch with a fixed alias.
    Branch {
        name: &'static str,
        alias: &'static str,
    },
    /// The last path segment of the head branch, e.g. `xyz` for `someone:feature/xyz`.
    HeadBranch,
}

const RULES: &[Rule] = &[
    Rule::ReleaseTag,
    Rule::Branch {
        name: "main",
        alias: "stable",
    },
    Rule::Branch {
        name: "develop",
        alias: "latest",
    },
    Rule::HeadBranch,
];

impl Rule {
    fn apply(&self, branch: &str, head_ref_branch: &str) -> Option<String> {
        match self {
            Rule::ReleaseTag => branch
                .contains(TAGS_PREFIX)
                .then(|| branch.replace(TAGS_PREFIX, "")),
            Rule::Branch { name, alias } => (branch == *name).then(|| (*alias).to_owned()),
            Rule::HeadBranch => head_ref_branch.rsplit('/').next().map(ToOwned::to_owned),
        }
    }
}

pub fn is_version_branch(branch: &str) -> bool {
    VERSION_BRANCH.is_match(branch)
}

/// Returns the tag to promote to, or `None` when the ref is a version branch.
pub fn resolve(github_ref: &str, head_ref_branch: &str) -> Option<String> {
    let branch = github_ref.strip_prefix(HEADS_PREFIX).unwrap_or(github_ref);

    if is_version_branch(branch) {
        return None;
    }

    RULES
        .iter()
        .find_map(|rule| rule.apply(branch, head_ref_branch))
}
