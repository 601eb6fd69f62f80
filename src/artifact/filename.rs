//! Artifact file naming.

/// Fallback stem for keys that sanitize to nothing.
const EMPTY_KEY_STEM: &str = "artifact";

/// Maps a citation-key to a safe file stem.
///
/// Path separators, shell-hostile punctuation, whitespace and control
/// characters become `_`; runs of `_` collapse and leading/trailing `_` are
/// trimmed. `10.1145/3292500.3330701` becomes `10.1145_3292500.3330701`.
#[must_use]
pub fn sanitize_key(key: &str) -> String {
    let mut out = String::new();
    let mut prev_sep = false;
    for ch in key.chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\'' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        };
        if mapped == '_' {
            if !prev_sep {
                out.push('_');
                prev_sep = true;
            }
        } else {
            out.push(mapped);
            prev_sep = false;
        }
    }

    let trimmed = out.trim_start_matches(['.', '_']).trim_end_matches('_');
    if trimmed.is_empty() {
        EMPTY_KEY_STEM.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Returns `<sanitized key>.pdf`.
#[must_use]
pub fn artifact_file_name(key: &str) -> String {
    format!("{}.pdf", sanitize_key(key))
}

/// Returns `<sanitized key>-<n>.pdf`, used when two keys share a stem.
#[must_use]
pub fn numbered_file_name(key: &str, n: usize) -> String {
    format!("{}-{n}.pdf", sanitize_key(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_key_replaces_path_separators() {
        assert_eq!(sanitize_key("10.1145/3292500.3330701"), "10.1145_3292500.3330701");
        assert_eq!(sanitize_key("hep-th/9901001v1"), "hep-th_9901001v1");
    }

    #[test]
    fn test_sanitize_key_collapses_unsafe_runs() {
        assert_eq!(sanitize_key("10.1002/(sici)1097:<1>"), "10.1002_sici_1097_1");
    }

    #[test]
    fn test_sanitize_key_blocks_dot_traversal() {
        assert_eq!(sanitize_key("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_key(".."), "artifact");
        assert_eq!(sanitize_key(""), "artifact");
    }

    #[test]
    fn test_artifact_file_name_appends_pdf() {
        assert_eq!(artifact_file_name("2301.01234v1"), "2301.01234v1.pdf");
    }

    #[test]
    fn test_numbered_file_name_keeps_stem() {
        assert_eq!(numbered_file_name("10.1/x/y", 2), "10.1_x_y-2.pdf");
    }
}
