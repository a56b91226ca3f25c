//! # Utility Functions Module
//!
//! This module provides utility functions that improve code readability
//! and reduce boilerplate across the application.

/// Converts a vector of string-like items to Vec<String>.
///
/// Used to build argument lists for external tools without repetitive
/// `.to_string()` calls.
///
/// # Example
/// ```rust
/// use eml_compressor::utils::to_string_vec;
///
/// let args = to_string_vec(["--compression-level=9", "--linearize"]);
/// assert_eq!(args, vec!["--compression-level=9".to_string(), "--linearize".to_string()]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Macro for even more convenient argument building.
///
/// # Example
/// ```rust
/// use eml_compressor::args;
///
/// let level = 9;
/// let args = args![format!("--compression-level={}", level), "--linearize"];
/// assert_eq!(args[0], "--compression-level=9");
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$($item.to_string()),*])
    };
}

/// Makes a name safe to use as a file name, falling back when nothing usable remains.
///
/// Path separators and other characters rejected by common file systems are
/// collapsed into `_`, trailing dots are trimmed.
pub fn sanitize_filename(name: Option<&str>, fallback: &str) -> String {
    let name = name.unwrap_or(fallback);
    let pieces: Vec<&str> = name
        .split(|c: char| c.is_control() || matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .filter(|piece| !piece.is_empty())
        .collect();
    let sanitized = pieces.join("_");
    let sanitized = sanitized.trim_end_matches('.').trim();

    if sanitized.is_empty() {
        fallback.to_string()
    } else {
        sanitized.to_string()
    }
}

/// Replaces (or appends) the extension of a file name, keeping any directory prefix.
///
/// `photos/a.png` with `jpg` becomes `photos/a.jpg`; a dot that starts the final
/// component (`.hidden`) is not treated as an extension separator.
pub fn replace_extension(name: &str, extension: &str) -> String {
    let file_start = name.rfind(['/', '\\']).map(|i| i + 1).unwrap_or(0);
    let stem_end = match name[file_start..].rfind('.') {
        Some(0) | None => name.len(),
        Some(dot) => file_start + dot,
    };
    format!("{}.{}", &name[..stem_end], extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_string_vec_string_literals() {
        let result = to_string_vec(["hello", "world"]);
        assert_eq!(result, vec!["hello".to_string(), "world".to_string()]);
    }

    #[test]
    fn test_to_string_vec_empty() {
        let result: Vec<String> = to_string_vec(Vec::<&str>::new());
        assert_eq!(result, Vec::<String>::new());
    }

    #[test]
    fn test_args_macro() {
        let level = 9;
        let result = args!["--compression-level", level, "--linearize"];
        assert_eq!(result, vec!["--compression-level".to_string(), "9".to_string(), "--linearize".to_string()]);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename(Some("report.pdf"), "temp_pdf"), "report.pdf");
        assert_eq!(sanitize_filename(Some("../etc/passwd"), "temp_pdf"), ".._etc_passwd");
        assert_eq!(sanitize_filename(Some("a:b*c?.pdf."), "temp_pdf"), "a_b_c_.pdf");
        assert_eq!(sanitize_filename(Some("///"), "temp_pdf"), "temp_pdf");
        assert_eq!(sanitize_filename(None, "temp_pdf"), "temp_pdf");
    }

    #[test]
    fn test_replace_extension() {
        assert_eq!(replace_extension("a.png", "jpg"), "a.jpg");
        assert_eq!(replace_extension("photos/holiday.final.PNG", "jpg"), "photos/holiday.final.jpg");
        assert_eq!(replace_extension("scan", "jpg"), "scan.jpg");
        assert_eq!(replace_extension("dir.v2/scan", "jpg"), "dir.v2/scan.jpg");
        assert_eq!(replace_extension(".hidden", "jpg"), ".hidden.jpg");
    }
}
