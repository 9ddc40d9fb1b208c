// Per-district property-type dictionaries into the shared SPTD category codes.

use crate::types::District;

/// Texas comptroller (SPTD) property category codes.
pub const SPTD_CODES: &[&str] = &[
    "A", "A1", "A2", "A3", "A4", "B", "B1", "B2", "B3", "B4", "C1", "C2", "C3", "D1", "D2", "E",
    "F1", "F2", "F3", "G1", "G2", "G3", "H1", "H2", "J1", "J2", "J3", "J4", "J5", "J6", "J7",
    "J8", "J9", "L1", "L2", "M1", "M2", "N", "O", "S", "X",
];

/// DCAD publishes a division code rather than a category code.
const DCAD_DIVISIONS: &[(&str, &str)] = &[("RES", "A1"), ("COM", "F1"), ("BPP", "L1")];

/// Map a district's native property-type code to the shared vocabulary.
/// Unmapped codes are dropped.
pub fn map_state_class(district: District, native: &str) -> Option<String> {
    let code = native.trim().trim_matches('"').to_ascii_uppercase();
    if code.is_empty() {
        return None;
    }
    match district {
        District::Dcad => DCAD_DIVISIONS
            .iter()
            .find(|(div, _)| *div == code)
            .map(|(_, sptd)| sptd.to_string()),
        District::Hcad | District::Ccad | District::Tad | District::Tcad => {
            SPTD_CODES.contains(&code.as_str()).then_some(code)
        }
    }
}

/// HCAD bulk imports default to residential categories only.
pub fn is_residential_class(state_class: &str) -> bool {
    matches!(
        state_class.trim().chars().next().map(|c| c.to_ascii_uppercase()),
        Some('A' | 'B')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sptd_districts_accept_the_vocabulary() {
        assert_eq!(map_state_class(District::Hcad, "a1"), Some("A1".into()));
        assert_eq!(map_state_class(District::Tad, " F1 "), Some("F1".into()));
        assert_eq!(map_state_class(District::Ccad, "\"B2\""), Some("B2".into()));
    }

    #[test]
    fn dcad_divisions_are_translated() {
        assert_eq!(map_state_class(District::Dcad, "RES"), Some("A1".into()));
        assert_eq!(map_state_class(District::Dcad, "com"), Some("F1".into()));
        assert_eq!(map_state_class(District::Dcad, "BPP"), Some("L1".into()));
        // DCAD never publishes raw SPTD codes; they are not guessed.
        assert_eq!(map_state_class(District::Dcad, "A1"), None);
    }

    #[test]
    fn unmapped_codes_are_dropped() {
        assert_eq!(map_state_class(District::Hcad, "Z9"), None);
        assert_eq!(map_state_class(District::Tcad, ""), None);
        assert_eq!(map_state_class(District::Dcad, "IND"), None);
    }

    #[test]
    fn residential_classes() {
        assert!(is_residential_class("A1"));
        assert!(is_residential_class("b4"));
        assert!(!is_residential_class("F1"));
        assert!(!is_residential_class(""));
    }
}
