//! Virtual path resolution
//!
//! Sessions address files with absolute, normalized virtual paths rooted at
//! `/`. `..` never climbs above the root.

/// Resolves `param` against the current path.
pub fn resolve_path(current: &str, param: &str) -> String {
    if param.starts_with('/') {
        normalize(param)
    } else {
        normalize(&format!("{}/{}", current, param))
    }
}

/// Parent of an absolute virtual path; the root is its own parent.
pub fn parent_path(path: &str) -> String {
    resolve_path(path, "..")
}

/// Collapses empty, `.` and `..` segments.
pub fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            name => segments.push(name),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_join_current() {
        assert_eq!(resolve_path("/", "docs"), "/docs");
        assert_eq!(resolve_path("/docs", "a.txt"), "/docs/a.txt");
        assert_eq!(resolve_path("/docs", ""), "/docs");
    }

    #[test]
    fn absolute_paths_ignore_current() {
        assert_eq!(resolve_path("/docs", "/b.txt"), "/b.txt");
    }

    #[test]
    fn dot_segments_are_collapsed() {
        assert_eq!(resolve_path("/docs/2024", "../2023/./q1"), "/docs/2023/q1");
        assert_eq!(normalize("//a///b/"), "/a/b");
    }

    #[test]
    fn root_cannot_be_escaped() {
        assert_eq!(resolve_path("/", "../../etc/passwd"), "/etc/passwd");
        assert_eq!(parent_path("/"), "/");
        assert_eq!(parent_path("/docs/reports"), "/docs");
    }
}
