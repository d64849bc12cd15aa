//! Path helpers for logical, `/`-separated VFS paths.
//!
//! Logical paths are always relative to some root: leading separators are
//! dropped, `\` is accepted as a separator, `.` and empty segments vanish and
//! `..` never climbs above the root.

/// Normalizes a logical path. The root is the empty string.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }
    parts.join("/")
}

/// Joins `rel` onto `base` and normalizes the result.
pub fn join(base: &str, rel: &str) -> String {
    if base.is_empty() {
        return normalize(rel);
    }
    if rel.is_empty() {
        return normalize(base);
    }
    normalize(&format!("{base}/{rel}"))
}

/// Splits a normalized path into its directory and leaf parts.
pub fn split_leaf(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(pos) => (&path[..pos], &path[pos + 1..]),
        None => ("", path),
    }
}

/// Iterates the segments of a normalized path.
pub fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Case-folds a name for case-insensitive comparison.
///
/// Uses Unicode lowercase mapping. Every key stored in a directory tree and
/// every query is folded with this function, so comparisons reduce to exact
/// map lookups.
pub fn fold(name: &str) -> String {
    name.to_lowercase()
}

/// Returns true if `name` ends with `suffix`, ignoring case.
pub fn ends_with_folded(name: &str, suffix: &str) -> bool {
    fold(name).ends_with(&fold(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    mod normalize {
        use super::*;

        #[test]
        fn test_normalize_path() {
            assert_eq!(normalize("/a/b/c/"), "a/b/c");
            assert_eq!(normalize("a/b/./c"), "a/b/c");
            assert_eq!(normalize("a/b/../c"), "a/c");
            assert_eq!(normalize("/"), "");
            assert_eq!(normalize("/.."), "");
            assert_eq!(normalize(".."), "");
            assert_eq!(normalize(""), "");
            assert_eq!(normalize("../a"), "a");
            assert_eq!(normalize("./a"), "a");
            assert_eq!(normalize("a//b"), "a/b");
            assert_eq!(normalize("a\\b\\..\\c"), "a/c");
        }

        #[test]
        fn test_normalize_keeps_case() {
            assert_eq!(normalize("Img/Title.PNG"), "Img/Title.PNG");
        }
    }

    mod join_split {
        use super::*;

        #[test]
        fn test_join() {
            assert_eq!(join("", "a"), "a");
            assert_eq!(join("a", ""), "a");
            assert_eq!(join("a/b", "c/d.txt"), "a/b/c/d.txt");
            assert_eq!(join("a/b", "../c"), "a/c");
            assert_eq!(join("a", "/b"), "a/b");
        }

        #[test]
        fn test_split_leaf() {
            assert_eq!(split_leaf("a/b/c.txt"), ("a/b", "c.txt"));
            assert_eq!(split_leaf("c.txt"), ("", "c.txt"));
            assert_eq!(split_leaf(""), ("", ""));
        }

        #[test]
        fn test_components() {
            let parts: Vec<_> = components("a/b/c").collect();
            assert_eq!(parts, vec!["a", "b", "c"]);
            assert_eq!(components("").count(), 0);
        }
    }

    mod folding {
        use super::*;

        #[test]
        fn test_fold_ascii_and_unicode() {
            assert_eq!(fold("Title.PNG"), "title.png");
            assert_eq!(fold("ÄRGER.txt"), "ärger.txt");
            assert_eq!(fold("ПАПКА"), "папка");
        }

        #[test]
        fn test_ends_with_folded() {
            assert!(ends_with_folded("Game.TAR", ".tar"));
            assert!(ends_with_folded("game.tar.GZ", ".tar.gz"));
            assert!(!ends_with_folded("game.zip", ".tar"));
        }
    }
}
