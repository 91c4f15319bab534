//! Contract code normalization.
//!
//! Codes arrive from spreadsheets and YAML as numbers or strings
//! (`99741`, `"099741.0"`, `" 06765a "`). They are normalized to an
//! uppercase token without a trailing `.0`, preserving leading zeros and
//! variable length.

/// Maximum accepted contract code length.
pub const MAX_CONTRACT_CODE_LEN: usize = 20;

/// Normalizes a raw contract code.
///
/// # Examples
/// ```
/// use cotdash_core::contract_codes::normalize_contract_code;
///
/// assert_eq!(normalize_contract_code("099741.0"), "099741");
/// assert_eq!(normalize_contract_code(" 06765a "), "06765A");
/// assert_eq!(normalize_contract_code("12460+"), "12460+");
/// ```
#[must_use]
pub fn normalize_contract_code(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    match upper.strip_suffix(".0") {
        Some(stripped) => stripped.to_string(),
        None => upper,
    }
}

/// Returns true if the code matches `[A-Z0-9+]{1,20}`.
#[must_use]
pub fn is_valid_contract_code(code: &str) -> bool {
    !code.is_empty()
        && code.len() <= MAX_CONTRACT_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '+')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_float_suffix() {
        assert_eq!(normalize_contract_code("099741.0"), "099741");
        assert_eq!(normalize_contract_code("99741"), "99741");
    }

    #[test]
    fn normalize_keeps_inner_dot_zero() {
        assert_eq!(normalize_contract_code("1.05"), "1.05");
    }

    #[test]
    fn valid_codes() {
        assert!(is_valid_contract_code("099741"));
        assert!(is_valid_contract_code("06765A"));
        assert!(is_valid_contract_code("12460+"));
    }

    #[test]
    fn invalid_codes() {
        assert!(!is_valid_contract_code(""));
        assert!(!is_valid_contract_code("abc123"));
        assert!(!is_valid_contract_code("0997-41"));
        assert!(!is_valid_contract_code(&"1".repeat(21)));
    }
}
