//! Branch code canonicalization.

/// Longest value accepted as a branch name.
pub const MAX_BRANCH_LEN: usize = 20;

/// Upper-cased branch code to city name.
const BRANCH_CODES: &[(&str, &str)] = &[
    ("HK", "Hong Kong"),
    ("NY", "New York"),
    ("NYC", "New York"),
    ("RG", "Ramat Gan"),
    ("TA", "Tel Aviv"),
    ("TLV", "Tel Aviv"),
    ("ANT", "Antwerp"),
    ("LA", "Los Angeles"),
    ("BKK", "Bangkok"),
    ("MUM", "Mumbai"),
    ("BOM", "Mumbai"),
    ("DXB", "Dubai"),
    ("LDN", "London"),
    ("LON", "London"),
];

/// Why a branch value was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchRejection {
    LooksLikeUrl,
    TooLong,
}

impl std::fmt::Display for BranchRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LooksLikeUrl => write!(f, "looks like a URL"),
            Self::TooLong => write!(f, "longer than {MAX_BRANCH_LEN} characters"),
        }
    }
}

/// Canonicalize a raw branch value.
///
/// Returns `Ok(None)` for blank input, `Ok(Some(city))` for a known code or
/// city name, and `Ok(Some(trimmed))` for anything else that passes the
/// sanity checks. The fallback keeps the caller's casing.
///
/// # Errors
///
/// Returns a [`BranchRejection`] for URLs and overlong values.
pub fn canonicalize_branch(raw: &str) -> Result<Option<String>, BranchRejection> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.contains("://") {
        return Err(BranchRejection::LooksLikeUrl);
    }
    if trimmed.chars().count() > MAX_BRANCH_LEN {
        return Err(BranchRejection::TooLong);
    }

    let code = trimmed.to_uppercase();
    let city = BRANCH_CODES
        .iter()
        .find(|(known, city)| *known == code || city.eq_ignore_ascii_case(trimmed))
        .map(|(_, city)| *city);

    Ok(Some(city.map_or_else(|| trimmed.to_string(), str::to_string)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(canonicalize_branch("hk").unwrap().as_deref(), Some("Hong Kong"));
        assert_eq!(canonicalize_branch(" NYC ").unwrap().as_deref(), Some("New York"));
        assert_eq!(canonicalize_branch("tlv").unwrap().as_deref(), Some("Tel Aviv"));
        assert_eq!(canonicalize_branch("RG").unwrap().as_deref(), Some("Ramat Gan"));
    }

    #[test]
    fn test_city_names_map_to_themselves() {
        assert_eq!(canonicalize_branch("hong kong").unwrap().as_deref(), Some("Hong Kong"));
        assert_eq!(canonicalize_branch("Antwerp").unwrap().as_deref(), Some("Antwerp"));
    }

    #[test]
    fn test_unknown_code_keeps_trimmed_original() {
        assert_eq!(canonicalize_branch("ZZ").unwrap().as_deref(), Some("ZZ"));
        assert_eq!(canonicalize_branch("  Geneva ").unwrap().as_deref(), Some("Geneva"));
        assert_eq!(canonicalize_branch("zz").unwrap().as_deref(), Some("zz"));
    }

    #[test]
    fn test_blank_is_null() {
        assert_eq!(canonicalize_branch("   ").unwrap(), None);
    }

    #[test]
    fn test_url_rejected() {
        assert_eq!(
            canonicalize_branch("http://x.com"),
            Err(BranchRejection::LooksLikeUrl)
        );
        assert_eq!(
            canonicalize_branch("HTTPS://branch.example"),
            Err(BranchRejection::LooksLikeUrl)
        );
    }

    #[test]
    fn test_host_without_scheme_falls_back() {
        assert_eq!(
            canonicalize_branch(" www.hk.com ").unwrap().as_deref(),
            Some("www.hk.com")
        );
    }

    #[test]
    fn test_overlength_rejected() {
        let raw = "A".repeat(25);
        assert_eq!(canonicalize_branch(&raw), Err(BranchRejection::TooLong));
        assert!(canonicalize_branch(&"A".repeat(20)).unwrap().is_some());
    }
}
