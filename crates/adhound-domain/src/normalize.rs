//! Principal-name and domain normalization.
//!
//! Backends disagree on identifier shape: the legacy store returns bare
//! account names (`alice`) while the CE store returns UPN-style names
//! (`ALICE@ESSOS.LOCAL`). Every comparison and every value placed into an
//! [`crate::AceResult`] goes through [`normalize`] first so the two stores
//! produce identical output.

/// Strips a trailing `@DOMAIN` suffix and surrounding whitespace.
///
/// Splits once on the *last* `@`, so an account name that itself contains
/// `@` keeps everything before the final separator. Names without `@` are
/// returned trimmed but otherwise unchanged, which makes the function
/// idempotent: `normalize(normalize(x)) == normalize(x)`.
///
/// Case is preserved; display values keep whatever casing the backend sent.
pub fn normalize(name: &str) -> &str {
    let trimmed = name.trim();
    match trimmed.rfind('@') {
        Some(at) => trimmed[..at].trim_end(),
        None => trimmed,
    }
}

/// Case-folds a domain string for comparison.
///
/// Used for deduplication keys, blacklist matching and domain-scope
/// equality. The values carried in results keep the backend's casing.
pub fn fold_domain(domain: &str) -> String {
    domain.trim().to_ascii_lowercase()
}

/// Case-insensitive domain equality on the folded form.
pub fn domain_eq(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
