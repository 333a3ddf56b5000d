//! Field validators shared by the request payloads and the navigation resolver.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

static PRODUCT_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]{3}[0-9]{2}$").unwrap());

static UUID_V4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-4[0-9a-fA-F]{3}-[89abAB][0-9a-fA-F]{3}-[0-9a-fA-F]{12}$",
    )
    .unwrap()
});

const MIN_PHONE_DIGITS: usize = 8;
const MAX_PHONE_DIGITS: usize = 15;

/// Exactly three ASCII letters followed by two ASCII digits, any case.
pub fn is_valid_product_code(code: &str) -> bool {
    PRODUCT_CODE_RE.is_match(code)
}

/// Canonical stored form of a product code.
pub fn normalize_product_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Returns the input unchanged when it is shaped like a v4 UUID, `None` otherwise.
pub fn sanitize_uuid(candidate: &str) -> Option<&str> {
    UUID_V4_RE.is_match(candidate).then_some(candidate)
}

/// Strips everything but digits so "(11) 98888-7777" and "11988887777" match.
pub fn normalize_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn validate_product_code(code: &str) -> Result<(), ValidationError> {
    if is_valid_product_code(code.trim()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("product_code");
        err.message = Some("Product code must be 3 letters followed by 2 digits".into());
        Err(err)
    }
}

pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = normalize_phone(phone).len();
    if (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("Phone must contain between 8 and 15 digits".into());
        Err(err)
    }
}

pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value cannot be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

pub fn validate_non_negative_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("negative_price");
        err.message = Some("Price cannot be negative".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Trims optional free text and maps blank strings to `None`.
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("ABC12", true)]
    #[case("abC34", true)]
    #[case("xyz00", true)]
    #[case("AB123", false)]
    #[case("ABCD1", false)]
    #[case("abc1", false)]
    #[case("ABC123", false)]
    #[case("ÁBC12", false)]
    #[case("", false)]
    #[case(" ABC12", false)]
    fn product_code_shape(#[case] code: &str, #[case] expected: bool) {
        assert_eq!(is_valid_product_code(code), expected);
    }

    #[test]
    fn product_code_validator_trims_before_matching() {
        assert!(validate_product_code(" abc12 ").is_ok());
        assert!(validate_product_code("ab-12").is_err());
        assert_eq!(normalize_product_code(" abC34 "), "ABC34");
    }

    #[rstest]
    #[case("3f2504e0-4f89-41d3-9a0c-0305e82c3301")]
    #[case("3F2504E0-4F89-41D3-BA0C-0305E82C3301")]
    #[case("00000000-0000-4000-8000-000000000000")]
    fn v4_uuids_pass_through_unchanged(#[case] input: &str) {
        assert_eq!(sanitize_uuid(input), Some(input));
    }

    #[rstest]
    #[case("")]
    #[case("null")]
    #[case("undefined")]
    #[case("6ba7b810-9dad-11d1-80b4-00c04fd430c8")] // v1
    #[case("3f2504e0-4f89-41d3-7a0c-0305e82c3301")] // bad variant
    #[case("3f2504e04f8941d39a0c0305e82c3301")]
    #[case("3f2504e0-4f89-41d3-9a0c-0305e82c3301 ")]
    #[case("' OR 1=1 --")]
    fn non_v4_strings_are_dropped(#[case] input: &str) {
        assert_eq!(sanitize_uuid(input), None);
    }

    #[test]
    fn phone_normalization_keeps_digits_only() {
        assert_eq!(normalize_phone("(11) 98888-7777"), "11988887777");
        assert!(validate_phone("(11) 98888-7777").is_ok());
        assert!(validate_phone("123").is_err());
    }

    #[test]
    fn prices_must_not_be_negative() {
        assert!(validate_non_negative_price(&dec!(0)).is_ok());
        assert!(validate_non_negative_price(&dec!(12.90)).is_ok());
        assert!(validate_non_negative_price(&dec!(-0.01)).is_err());
    }

    #[test]
    fn blank_optional_text_becomes_none() {
        assert_eq!(clean_optional(Some("   ".into())), None);
        assert_eq!(clean_optional(Some(" Nestlé ".into())), Some("Nestlé".into()));
        assert_eq!(clean_optional(None), None);
    }
}
