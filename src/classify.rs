//! Production-vs-test file classification.
//!
//! Path-based heuristics shared by the resolver (disambiguation scoring),
//! hotspot analysis (test exclusion), and reference ordering (source files
//! ahead of test files). The graph itself stays language-agnostic; the
//! boundary is derived from paths at query time.

use regex::Regex;
use std::sync::OnceLock;

fn test_path_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Directory conventions
            r"(^|/)tests?/",
            r"(^|/)__tests__/",
            r"(^|/)spec/",
            r"(^|/)testdata/",
            r"(^|/)fixtures?/",
            // File-name conventions
            r"(^|/)test_[^/]*$",
            r"_test\.[a-z]+$",
            r"\.test\.[a-z]+$",
            r"\.spec\.[a-z]+$",
            r"_spec\.[a-z]+$",
            r"(^|/)conftest\.py$",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern"))
        .collect()
    })
}

fn doc_path_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [r"\.(md|rst|txt|adoc)$", r"(^|/)docs?/", r"(^|/)examples?/"]
            .iter()
            .map(|p| Regex::new(p).expect("static pattern"))
            .collect()
    })
}

/// Whether a path looks like a test file.
pub fn is_test_file(path: &str) -> bool {
    // Go test files are always tests, whatever directory they sit in.
    if path
        .rsplit('/')
        .next()
        .is_some_and(|base| base.ends_with("_test.go"))
    {
        return true;
    }
    let lowered = path.to_ascii_lowercase();
    test_path_patterns().iter().any(|re| re.is_match(&lowered))
}

/// Whether a path is production source: not a test file, not documentation.
pub fn is_production_file(path: &str) -> bool {
    if path.is_empty() {
        return false;
    }
    if is_test_file(path) {
        return false;
    }
    let lowered = path.to_ascii_lowercase();
    !doc_path_patterns().iter().any(|re| re.is_match(&lowered))
}

/// Directory depth of a path (components before the file name).
pub fn directory_depth(path: &str) -> usize {
    path.matches('/').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn go_test_suffix_always_wins() {
        assert!(is_test_file("pkg/server/server_test.go"));
        assert!(is_test_file("cmd/production/handler_test.go"));
        assert!(!is_production_file("cmd/production/handler_test.go"));
    }

    #[test]
    fn test_directories_detected() {
        assert!(is_test_file("tests/integration.rs"));
        assert!(is_test_file("src/__tests__/app.spec.ts"));
        assert!(is_test_file("pkg/testdata/golden.go"));
        assert!(is_test_file("module/test_helpers.py"));
    }

    #[test]
    fn production_paths_pass() {
        assert!(is_production_file("src/server/router.go"));
        assert!(is_production_file("pkg/api/client.py"));
        assert!(!is_production_file("README.md"));
        assert!(!is_production_file("docs/usage.md"));
        assert!(!is_production_file(""));
    }

    #[test]
    fn depth_counts_separators() {
        assert_eq!(directory_depth("main.go"), 0);
        assert_eq!(directory_depth("a/b/c/d.go"), 3);
    }
}
