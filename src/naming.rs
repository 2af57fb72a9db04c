//! Filename derivation: issuer name → slug, slug + date → target filename.
//!
//! Everything here is pure and total. [`sanitize`] never fails; an issuer
//! name made only of punctuation simply produces an empty slug, and
//! [`target_filename`] substitutes [`FALLBACK_ISSUER`] for it.
//!
//! ## Normalisation order
//!
//! 1. Polish diacritics → ASCII via a fixed table (`ł` has no Unicode
//!    decomposition, so NFD alone would turn it into a separator)
//! 2. NFD decomposition, combining marks dropped
//! 3. Lowercase
//! 4. Every run outside `[a-z0-9]` → one `_`
//! 5. Strip leading/trailing `_`
//! 6. Truncate to [`MAX_SLUG_LEN`] characters

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Slug used when the issuer name sanitises to nothing ("no name").
pub const FALLBACK_ISSUER: &str = "brak_nazwy";

/// Maximum length of the issuer slug, in characters.
pub const MAX_SLUG_LEN: usize = 80;

/// Extension assumed when the source file has none.
pub const DEFAULT_EXTENSION: &str = ".pdf";

static RE_SEPARATOR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Map a Polish letter with a diacritic to its ASCII base letter.
fn fold_polish(c: char) -> char {
    match c {
        'ą' => 'a',
        'ć' => 'c',
        'ę' => 'e',
        'ł' => 'l',
        'ń' => 'n',
        'ó' => 'o',
        'ś' => 's',
        'ź' | 'ż' => 'z',
        'Ą' => 'A',
        'Ć' => 'C',
        'Ę' => 'E',
        'Ł' => 'L',
        'Ń' => 'N',
        'Ó' => 'O',
        'Ś' => 'S',
        'Ź' | 'Ż' => 'Z',
        other => other,
    }
}

/// Turn an arbitrary issuer name into a filesystem-safe slug.
///
/// The result contains only `[a-z0-9_]`, never starts or ends with `_`, and
/// is at most [`MAX_SLUG_LEN`] characters long. It may be empty.
///
/// ```rust
/// use edgequake_invoice_rename::naming::sanitize;
///
/// assert_eq!(sanitize("Orlen S.A. — Stacja nr 123"), "orlen_s_a_stacja_nr_123");
/// assert_eq!(sanitize("Żabka Polska"), "zabka_polska");
/// assert_eq!(sanitize("***"), "");
/// ```
pub fn sanitize(raw: &str) -> String {
    let folded: String = raw
        .chars()
        .map(fold_polish)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let lowered = folded.to_lowercase();
    let slug = RE_SEPARATOR_RUN.replace_all(&lowered, "_");
    let slug = slug.trim_matches('_');

    // The slug is pure ASCII here, so byte and char counts agree.
    let mut truncated = slug[..slug.len().min(MAX_SLUG_LEN)].to_string();
    // A cut that lands inside a separator run would leave a trailing `_`.
    while truncated.ends_with('_') {
        truncated.pop();
    }
    truncated
}

/// Extension of `path` including the leading dot, or [`DEFAULT_EXTENSION`].
///
/// The original casing is kept: `SCAN.PDF` yields `.PDF`.
pub fn extension_of(path: &Path) -> String {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if !ext.is_empty() => format!(".{ext}"),
        _ => DEFAULT_EXTENSION.to_string(),
    }
}

/// Build `{issue_date}_{slug}{extension}`.
///
/// `extension` is expected to carry its leading dot (see [`extension_of`]).
pub fn target_filename(issue_date: &str, issuer_name: &str, extension: &str) -> String {
    let slug = sanitize(issuer_name);
    let slug = if slug.is_empty() {
        FALLBACK_ISSUER
    } else {
        slug.as_str()
    };
    format!("{issue_date}_{slug}{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    static RE_TARGET: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"^\d{6}_[a-z0-9_]*\.[^.]+$").unwrap());

    fn assert_slug_shape(s: &str) {
        assert!(
            s.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
            "unexpected character in {s:?}"
        );
        assert!(!s.starts_with('_') && !s.ends_with('_'), "edge underscore in {s:?}");
        assert!(s.len() <= MAX_SLUG_LEN, "too long: {s:?}");
    }

    #[test]
    fn test_polish_diacritics_folded() {
        assert_eq!(sanitize("ąćęłńóśźż"), "acelnoszz");
        assert_eq!(sanitize("ĄĆĘŁŃÓŚŹŻ"), "acelnoszz");
        assert_eq!(sanitize("Łódź Śródmieście"), "lodz_srodmiescie");
    }

    #[test]
    fn test_polish_names_have_valid_shape() {
        for name in [
            "Przedsiębiorstwo Handlowo-Usługowe „Gęś” Sp. z o.o.",
            "  Hotel Zakopiański *** ",
            "Stacja Paliw ŁĘG 24h",
            "ŻÓŁW & Syn",
        ] {
            assert_slug_shape(&sanitize(name));
        }
    }

    #[test]
    fn test_other_diacritics_stripped_by_decomposition() {
        assert_eq!(sanitize("Café Müller"), "cafe_muller");
        assert_eq!(sanitize("Škoda Auto a.s."), "skoda_auto_a_s");
    }

    #[test]
    fn test_empty_and_blank_inputs() {
        assert_eq!(sanitize(""), "");
        assert_eq!(sanitize("   "), "");
        assert_eq!(sanitize("***"), "");
        assert_eq!(sanitize("—–-"), "");
    }

    #[test]
    fn test_corporate_name_lowercased_without_periods() {
        let s = sanitize("Shell Polska Sp. z o.o.");
        assert!(!s.chars().any(|c| c.is_ascii_uppercase()), "got {s}");
        assert!(!s.contains('.'), "got {s}");
        assert_eq!(s, "shell_polska_sp_z_o_o");
    }

    #[test]
    fn test_separator_runs_collapse() {
        assert_eq!(sanitize("a  --  b"), "a_b");
        assert_eq!(sanitize("__a__"), "a");
    }

    #[test]
    fn test_truncated_to_limit() {
        let long = "x".repeat(200);
        assert_eq!(sanitize(&long).len(), MAX_SLUG_LEN);
    }

    #[test]
    fn test_truncation_never_leaves_trailing_underscore() {
        // 79 letters, then a separator at position 80.
        let name = format!("{} tail", "a".repeat(79));
        let s = sanitize(&name);
        assert_eq!(s, "a".repeat(79));
        assert_slug_shape(&s);
    }

    #[test]
    fn test_idempotent_on_normalised_input() {
        for name in ["Shell Polska Sp. z o.o.", "Orlen", "BP Europa SE 95", "ŁÓDŹ"] {
            let once = sanitize(name);
            assert_eq!(sanitize(&once), once);
        }
    }

    #[test]
    fn test_target_filename_uses_slug() {
        assert_eq!(
            target_filename("250615", "Shell", ".pdf"),
            "250615_shell.pdf"
        );
    }

    #[test]
    fn test_target_filename_fallback() {
        let name = target_filename("250615", "***", ".pdf");
        assert_eq!(name, "250615_brak_nazwy.pdf");
        assert!(RE_TARGET.is_match(&name));
    }

    #[test]
    fn test_target_filename_shape() {
        for issuer in ["Orlen S.A.", "", "Hotel Mercure Kraków", "Circle K Polska"] {
            let name = target_filename("240101", issuer, ".pdf");
            assert!(RE_TARGET.is_match(&name), "bad target {name}");
        }
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("in/a.pdf")), ".pdf");
        assert_eq!(extension_of(Path::new("in/SCAN.PDF")), ".PDF");
        assert_eq!(extension_of(Path::new("in/noext")), ".pdf");
    }
}
