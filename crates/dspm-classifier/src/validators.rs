//! Semantic validators for matched literals.
//!
//! Each validator takes the literal text a pattern matched and decides whether
//! it is actually plausible as an instance of the thing the rule claims to
//! find. Validators never see surrounding context — only the match itself.

/// US Social Security Number structural check.
///
/// Strips separators, requires nine digits, and rejects the documented
/// invalid ranges: area 000/666/900-999, group 00, serial 0000.
pub fn validate_ssn(value: &str) -> bool {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 9 {
        return false;
    }
    let area: u32 = digits[0..3].parse().unwrap_or(0);
    let group: u32 = digits[3..5].parse().unwrap_or(0);
    let serial: u32 = digits[5..9].parse().unwrap_or(0);

    if area == 0 || area == 666 || area >= 900 {
        return false;
    }
    if group == 0 {
        return false;
    }
    if serial == 0 {
        return false;
    }
    true
}

/// Luhn checksum (credit card / PAN validation).
pub fn validate_luhn(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// ABA routing-transit-number checksum.
pub fn validate_aba_routing(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 9 {
        return false;
    }
    let checksum = 3 * (digits[0] + digits[3] + digits[6])
        + 7 * (digits[1] + digits[4] + digits[7])
        + (digits[2] + digits[5] + digits[8]);
    checksum % 10 == 0
}

/// IBAN mod-97 checksum per ISO 7064.
pub fn validate_iban(value: &str) -> bool {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();

    if cleaned.len() < 15 || cleaned.len() > 34 {
        return false;
    }
    if !cleaned.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }

    let rotated = format!("{}{}", &cleaned[4..], &cleaned[..4]);

    let mut numeric = String::with_capacity(rotated.len() * 2);
    for c in rotated.chars() {
        if c.is_ascii_digit() {
            numeric.push(c);
        } else {
            let value = c as u32 - 'A' as u32 + 10;
            numeric.push_str(&value.to_string());
        }
    }

    mod_97(&numeric) == 1
}

/// Computes `numeric_string mod 97` digit-by-digit to avoid overflow for
/// arbitrarily long IBAN-derived numbers.
fn mod_97(numeric: &str) -> u32 {
    let mut remainder: u64 = 0;
    for c in numeric.chars() {
        let digit = c.to_digit(10).unwrap_or(0) as u64;
        remainder = (remainder * 10 + digit) % 97;
    }
    remainder as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssn_rejects_invalid_area_codes() {
        assert!(!validate_ssn("000-12-3456"));
        assert!(!validate_ssn("666-12-3456"));
        assert!(!validate_ssn("900-12-3456"));
        assert!(!validate_ssn("999-12-3456"));
    }

    #[test]
    fn ssn_rejects_zero_group_and_serial() {
        assert!(!validate_ssn("123-00-4567"));
        assert!(!validate_ssn("123-45-0000"));
    }

    #[test]
    fn ssn_accepts_plausible_number() {
        assert!(validate_ssn("123-45-6789"));
    }

    #[test]
    fn ssn_rejects_wrong_length() {
        assert!(!validate_ssn("123-45-678"));
    }

    #[test]
    fn luhn_accepts_published_test_pan() {
        assert!(validate_luhn("4532015112830366"));
    }

    #[test]
    fn luhn_rejects_single_digit_flip() {
        assert!(!validate_luhn("4532015112830367"));
    }

    #[test]
    fn luhn_rejects_out_of_range_length() {
        assert!(!validate_luhn("123456789012"));
    }

    #[test]
    fn aba_accepts_known_good_routing_numbers() {
        assert!(validate_aba_routing("021000021"));
        assert!(validate_aba_routing("011401533"));
    }

    #[test]
    fn aba_rejects_bad_checksum() {
        assert!(!validate_aba_routing("021000022"));
    }

    #[test]
    fn iban_accepts_known_good_ibans() {
        assert!(validate_iban("GB82WEST12345698765432"));
        assert!(validate_iban("DE89370400440532013000"));
    }

    #[test]
    fn iban_rejects_single_character_mutation() {
        assert!(!validate_iban("GB83WEST12345698765432"));
        assert!(!validate_iban("DE89370400440532013001"));
    }

    #[test]
    fn iban_rejects_bad_length() {
        assert!(!validate_iban("GB82WEST1234"));
    }
}
