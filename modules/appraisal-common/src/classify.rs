// District detection: account-number format rules first, city names second.

use crate::types::District;

/// Which rule produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Matched an account-number format. The raw input is an account key.
    AccountFormat(District),
    /// Matched a city name inside free text. The raw input is an address.
    CityName(District),
    Unknown,
}

impl Classification {
    pub fn district(&self) -> Option<District> {
        match self {
            Classification::AccountFormat(d) | Classification::CityName(d) => Some(*d),
            Classification::Unknown => None,
        }
    }
}

/// Substring → district, checked in order, case-insensitively.
const CITY_TABLE: &[(&str, District)] = &[
    ("dallas", District::Dcad),
    ("austin", District::Tcad),
    ("fort worth", District::Tad),
    ("plano", District::Ccad),
    ("houston", District::Hcad),
];

pub struct AccountClassifier;

impl AccountClassifier {
    /// Map a raw account string or address to a district. `None` is Unknown.
    pub fn classify(raw: &str) -> Option<District> {
        Self::classify_detailed(raw).district()
    }

    pub fn classify_detailed(raw: &str) -> Classification {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Classification::Unknown;
        }

        // Separators are stripped for the length checks only.
        let stripped: String = trimmed
            .chars()
            .filter(|c| *c != '-' && !c.is_whitespace())
            .collect();
        let len = stripped.chars().count();
        let all_digits = stripped.chars().all(|c| c.is_ascii_digit());

        if len == 17 {
            return Classification::AccountFormat(District::Dcad);
        }
        if len == 13 && all_digits {
            return Classification::AccountFormat(District::Hcad);
        }
        if trimmed.starts_with(['R', 'r']) {
            return Classification::AccountFormat(District::Ccad);
        }
        // 6-7 digits could also be a truncated TAD account; kept as TCAD.
        if all_digits && len <= 7 {
            return Classification::AccountFormat(District::Tcad);
        }
        if all_digits && len == 8 {
            return Classification::AccountFormat(District::Tad);
        }

        if trimmed.chars().any(char::is_alphabetic) {
            let lower = trimmed.to_lowercase();
            if let Some((_, district)) = CITY_TABLE.iter().find(|(city, _)| lower.contains(city)) {
                return Classification::CityName(*district);
            }
        }

        Classification::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(raw: &str) -> Option<District> {
        AccountClassifier::classify(raw)
    }

    #[test]
    fn thirteen_digits_is_hcad() {
        assert_eq!(classify("0660460450034"), Some(District::Hcad));
        assert_eq!(classify(" 0660460360030 "), Some(District::Hcad));
    }

    #[test]
    fn seventeen_chars_is_dcad() {
        assert_eq!(classify("00000776533000000"), Some(District::Dcad));
        assert_eq!(classify("00000-77653-3000000"), Some(District::Dcad));
        // Length rule applies to any 17 characters, not only digits.
        assert_eq!(classify("0000077653300000A"), Some(District::Dcad));
    }

    #[test]
    fn r_prefix_is_ccad() {
        assert_eq!(classify("R-2815-00C-0100-1"), Some(District::Ccad));
        assert_eq!(classify("r987654"), Some(District::Ccad));
    }

    #[test]
    fn short_digit_strings_are_tcad() {
        assert_eq!(classify("1"), Some(District::Tcad));
        assert_eq!(classify("123456"), Some(District::Tcad));
        assert_eq!(classify("2787425"), Some(District::Tcad));
    }

    #[test]
    fn eight_digits_is_tad() {
        assert_eq!(classify("04657837"), Some(District::Tad));
        assert_eq!(classify("0465-7837"), Some(District::Tad));
    }

    #[test]
    fn thirteen_chars_with_letters_is_not_hcad() {
        assert_eq!(classify("A660460450034"), None);
    }

    #[test]
    fn city_names_fall_back_for_free_text() {
        assert_eq!(
            AccountClassifier::classify_detailed("123 Main St, Dallas, TX"),
            Classification::CityName(District::Dcad)
        );
        assert_eq!(classify("9 Elm, FORT WORTH"), Some(District::Tad));
        assert_eq!(classify("500 Congress Ave Austin"), Some(District::Tcad));
        assert_eq!(classify("1 Legacy Dr, Plano"), Some(District::Ccad));
        assert_eq!(classify("77 Westheimer, houston"), Some(District::Hcad));
    }

    #[test]
    fn account_formats_win_over_city_names() {
        // Leading R wins even though "Houston" is present.
        assert_eq!(classify("Rice Blvd, Houston"), Some(District::Ccad));
    }

    #[test]
    fn unmatched_input_is_unknown() {
        assert_eq!(classify(""), None);
        assert_eq!(classify("   "), None);
        assert_eq!(classify("123456789"), None);
        assert_eq!(classify("12 Elm St, San Antonio"), None);
        assert_eq!(AccountClassifier::classify_detailed("?"), Classification::Unknown);
    }
}
