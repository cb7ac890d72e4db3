//! Branch-name rules shared by the catalog and the merge entry point.

/// Remote branches that may be merged: everything except the current branch,
/// de-duplicated, in the order git reported them.
pub fn merge_candidates(remote: &[String], current: Option<&str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(remote.len());
    for name in remote {
        if Some(name.as_str()) == current || out.contains(name) {
            continue;
        }
        out.push(name.clone());
    }
    out
}

/// Reject names git would refuse or misread as an option.
///
/// This is a subset of `git check-ref-format`, enough to keep a user-supplied
/// name from turning into a flag on the `git pull` command line.
pub fn validate_branch_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("branch name must not be empty".to_string());
    }
    if name.starts_with('-') {
        return Err(format!("branch name '{name}' must not start with '-'"));
    }
    if name.starts_with('/') || name.ends_with('/') || name.ends_with('.') {
        return Err(format!("branch name '{name}' has an invalid start or end"));
    }
    if name.ends_with(".lock") || name.contains("..") || name.contains("//") || name.contains("@{")
    {
        return Err(format!("branch name '{name}' is not a valid ref name"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| c.is_control() || c.is_whitespace() || "~^:?*[\\".contains(*c))
    {
        return Err(format!(
            "branch name '{name}' contains invalid character {bad:?}"
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn candidates_exclude_current_branch() {
        let remote = names(&["main", "feature", "main", "fix/crash"]);
        assert_eq!(
            merge_candidates(&remote, Some("main")),
            names(&["feature", "fix/crash"])
        );
    }

    #[test]
    fn candidates_without_current_keep_everything_once() {
        let remote = names(&["a", "b", "a"]);
        assert_eq!(merge_candidates(&remote, None), names(&["a", "b"]));
    }

    #[test]
    fn accepts_ordinary_names() {
        for name in ["master", "feature/ui-rework", "pr-1234", "v1.2"] {
            assert!(validate_branch_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_option_like_and_malformed_names() {
        for name in [
            "",
            "--upload-pack=evil",
            "a..b",
            "trailing/",
            "x.lock",
            "has space",
            "star*",
            "ref@{1}",
        ] {
            assert!(validate_branch_name(name).is_err(), "{name:?}");
        }
    }
}
