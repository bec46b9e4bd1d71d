//! Fixed catalog of succession step templates.
//!
//! Maps a case's intake flags to the ordered list of blueprints that the plan
//! generator materializes. Total over the flag space and free of I/O.

use crate::domain::models::IntakeFlags;

pub const COLLECT_CIVIL_RECORDS: &str = "collect-civil-records";
pub const GATHER_ESTATE_INVENTORY: &str = "gather-estate-inventory";
pub const SUBMIT_SUCCESSION_NOTIFICATION: &str = "submit-succession-notification";
pub const VALIDATE_WILL: &str = "validate-will";
pub const ENGAGE_LEGAL_SUPPORT: &str = "engage-legal-support";
pub const ENGAGE_FINANCIAL_SUPPORT: &str = "engage-financial-support";

/// Template for one step of a case plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepBlueprint {
    pub step_key: &'static str,
    pub title: &'static str,
    /// Keys of sibling blueprints that must be satisfied first
    pub depends_on: &'static [&'static str],
}

impl StepBlueprint {
    pub const fn new(step_key: &'static str, title: &'static str, depends_on: &'static [&'static str]) -> Self {
        Self {
            step_key,
            title,
            depends_on,
        }
    }
}

const BASE_CHAIN: [StepBlueprint; 3] = [
    StepBlueprint::new(COLLECT_CIVIL_RECORDS, "Collect civil records", &[]),
    StepBlueprint::new(GATHER_ESTATE_INVENTORY, "Gather estate inventory", &[]),
    StepBlueprint::new(
        SUBMIT_SUCCESSION_NOTIFICATION,
        "Submit succession notification",
        &[COLLECT_CIVIL_RECORDS, GATHER_ESTATE_INVENTORY],
    ),
];

const WILL_VALIDATION: StepBlueprint =
    StepBlueprint::new(VALIDATE_WILL, "Validate will", &[COLLECT_CIVIL_RECORDS]);

const LEGAL_SUPPORT: StepBlueprint = StepBlueprint::new(
    ENGAGE_LEGAL_SUPPORT,
    "Engage legal support",
    &[SUBMIT_SUCCESSION_NOTIFICATION],
);

const FINANCIAL_SUPPORT: StepBlueprint = StepBlueprint::new(
    ENGAGE_FINANCIAL_SUPPORT,
    "Engage financial support",
    &[GATHER_ESTATE_INVENTORY],
);

/// Blueprints for the given intake, base chain first, then conditional steps
/// in flag order. The position in this list becomes the step's sequence.
pub fn blueprints_for(flags: &IntakeFlags) -> Vec<StepBlueprint> {
    let mut blueprints = BASE_CHAIN.to_vec();

    if flags.has_will {
        blueprints.push(WILL_VALIDATION);
    }
    if flags.requires_legal_support {
        blueprints.push(LEGAL_SUPPORT);
    }
    if flags.requires_financial_support {
        blueprints.push(FINANCIAL_SUPPORT);
    }

    blueprints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(blueprints: &[StepBlueprint]) -> Vec<&'static str> {
        blueprints.iter().map(|b| b.step_key).collect()
    }

    #[test]
    fn test_base_chain_without_flags() {
        let blueprints = blueprints_for(&IntakeFlags::default());
        assert_eq!(
            keys(&blueprints),
            vec![COLLECT_CIVIL_RECORDS, GATHER_ESTATE_INVENTORY, SUBMIT_SUCCESSION_NOTIFICATION]
        );
        assert!(blueprints[0].depends_on.is_empty());
        assert!(blueprints[1].depends_on.is_empty());
        assert_eq!(blueprints[2].depends_on, &[COLLECT_CIVIL_RECORDS, GATHER_ESTATE_INVENTORY]);
    }

    #[test]
    fn test_all_flags_append_in_flag_order() {
        let blueprints = blueprints_for(&IntakeFlags::new(true, true, true));
        assert_eq!(
            keys(&blueprints),
            vec![
                COLLECT_CIVIL_RECORDS,
                GATHER_ESTATE_INVENTORY,
                SUBMIT_SUCCESSION_NOTIFICATION,
                VALIDATE_WILL,
                ENGAGE_LEGAL_SUPPORT,
                ENGAGE_FINANCIAL_SUPPORT,
            ]
        );
        assert_eq!(blueprints[3].depends_on, &[COLLECT_CIVIL_RECORDS]);
        assert_eq!(blueprints[4].depends_on, &[SUBMIT_SUCCESSION_NOTIFICATION]);
        assert_eq!(blueprints[5].depends_on, &[GATHER_ESTATE_INVENTORY]);
    }

    #[test]
    fn test_each_flag_is_independent() {
        let only_financial = blueprints_for(&IntakeFlags::new(false, false, true));
        assert_eq!(only_financial.len(), 4);
        assert_eq!(only_financial[3].step_key, ENGAGE_FINANCIAL_SUPPORT);

        let will_and_financial = blueprints_for(&IntakeFlags::new(true, false, true));
        assert_eq!(
            keys(&will_and_financial)[3..],
            [VALIDATE_WILL, ENGAGE_FINANCIAL_SUPPORT]
        );
    }

    #[test]
    fn test_catalog_is_deterministic() {
        for bits in 0u8..8 {
            let flags = IntakeFlags::new(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            assert_eq!(blueprints_for(&flags), blueprints_for(&flags));
            assert_eq!(blueprints_for(&flags).len(), 3 + bits.count_ones() as usize);
        }
    }
}
