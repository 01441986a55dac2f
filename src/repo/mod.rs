use std::path::{Component, Path, PathBuf};

/// Resolves a client-supplied repository reference to a path confined
/// beneath `root`.
///
/// The reference may be wrapped in one layer of single quotes (git clients
/// quote the path in the exec command). Normalization happens before the
/// join: `.` and root components are dropped and `..` pops the components
/// collected so far, so no input can climb out of `root`. An empty
/// reference resolves to `root` itself.
pub fn resolve(root: &Path, raw: &str) -> PathBuf {
    let unquoted = unquote(raw);
    let mut parts: Vec<&std::ffi::OsStr> = Vec::new();
    for component in Path::new(unquoted).components() {
        match component {
            Component::Normal(c) => parts.push(c),
            Component::ParentDir => {
                parts.pop();
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    let mut resolved = root.to_path_buf();
    for part in parts {
        resolved.push(part);
    }
    resolved
}

fn unquote(raw: &str) -> &str {
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_reference() {
        assert_eq!(
            resolve(Path::new("/repos"), "proj.git"),
            PathBuf::from("/repos/proj.git")
        );
    }

    #[test]
    fn test_quoted_matches_unquoted() {
        let root = Path::new("/repos");
        assert_eq!(resolve(root, "'proj.git'"), resolve(root, "proj.git"));
    }

    #[test]
    fn test_traversal_is_confined() {
        let root = Path::new("/repos");
        assert_eq!(resolve(root, "../secret"), PathBuf::from("/repos/secret"));
        assert_eq!(resolve(root, "a/../../b"), PathBuf::from("/repos/b"));
        assert_eq!(
            resolve(root, "../../etc/passwd"),
            PathBuf::from("/repos/etc/passwd")
        );
    }

    #[test]
    fn test_quoted_traversal_is_confined() {
        assert_eq!(
            resolve(Path::new("/repos"), "'../../etc'"),
            PathBuf::from("/repos/etc")
        );
    }

    #[test]
    fn test_absolute_reference_is_confined() {
        assert_eq!(
            resolve(Path::new("/repos"), "/etc/passwd"),
            PathBuf::from("/repos/etc/passwd")
        );
    }

    #[test]
    fn test_confinement_prefix_holds_for_hostile_inputs() {
        let root = Path::new("/repos");
        for raw in [
            "",
            "''",
            ".",
            "..",
            "../..",
            "....//....//etc",
            "a/b/../../../../root",
            "nul\0byte.git",
            "//double//slash.git",
        ] {
            let resolved = resolve(root, raw);
            assert!(
                resolved.starts_with(root),
                "{:?} escaped to {:?}",
                raw,
                resolved
            );
        }
    }

    #[test]
    fn test_empty_resolves_to_root() {
        assert_eq!(resolve(Path::new("/repos"), ""), PathBuf::from("/repos"));
        assert_eq!(resolve(Path::new("/repos"), "''"), PathBuf::from("/repos"));
    }

    #[test]
    fn test_resolution_is_idempotent_per_reference() {
        let root = Path::new("/repos");
        assert_eq!(resolve(root, "a/../b.git"), resolve(root, "a/../b.git"));
    }

    #[test]
    fn test_redundant_separators_collapse() {
        assert_eq!(
            resolve(Path::new("/repos"), "ns///proj.git"),
            PathBuf::from("/repos/ns/proj.git")
        );
        assert_eq!(
            resolve(Path::new("/repos"), "./ns/./proj.git"),
            PathBuf::from("/repos/ns/proj.git")
        );
    }
}
