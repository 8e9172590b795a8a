use std::collections::HashMap;

use regex::Regex;

/// Sensitive-data categories the gate detects and masks (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PiiType {
    Email,
    Phone,
    CreditCard,
    Ssn,
    Ipv4,
    Date,
}

impl PiiType {
    pub const ALL: [PiiType; 6] = [
        PiiType::Email,
        PiiType::Phone,
        PiiType::CreditCard,
        PiiType::Ssn,
        PiiType::Ipv4,
        PiiType::Date,
    ];

    pub fn token_label(self) -> &'static str {
        match self {
            PiiType::Email => "EMAIL",
            PiiType::Phone => "PHONE",
            PiiType::CreditCard => "CARD",
            PiiType::Ssn => "SSN",
            PiiType::Ipv4 => "IP",
            PiiType::Date => "DATE",
        }
    }
}

fn pattern_for(pii_type: PiiType) -> &'static str {
    match pii_type {
        PiiType::Email => r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
        PiiType::Phone => r"\b\d{3}[-.]\d{3}[-.]\d{4}\b",
        PiiType::CreditCard => r"\b\d{4}[- ]\d{4}[- ]\d{4}[- ]\d{4}\b",
        PiiType::Ssn => r"\b\d{3}-\d{2}-\d{4}\b",
        PiiType::Ipv4 => r"\b(?:\d{1,3}\.){3}\d{1,3}\b",
        PiiType::Date => r"\b\d{4}-\d{2}-\d{2}\b",
    }
}

/// One compiled [`Regex`] per sensitive type, built once at construction —
/// the same shape a PII-detection module elsewhere in the corpus uses for
/// its `HashMap<PIIType, Vec<Regex>>`.
pub fn compile_patterns() -> HashMap<PiiType, Regex> {
    PiiType::ALL
        .into_iter()
        .map(|pii_type| {
            let regex = Regex::new(pattern_for(pii_type)).expect("pattern is a valid regex literal");
            (pii_type, regex)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_pattern_matches() {
        let patterns = compile_patterns();
        assert!(patterns[&PiiType::Email].is_match("reach me at jane.doe@example.com please"));
    }

    #[test]
    fn card_pattern_matches_grouped_digits() {
        let patterns = compile_patterns();
        assert!(patterns[&PiiType::CreditCard].is_match("card 4111-1111-1111-1234 on file"));
    }

    #[test]
    fn ipv4_pattern_matches() {
        let patterns = compile_patterns();
        assert!(patterns[&PiiType::Ipv4].is_match("connect to 192.168.1.10 now"));
    }
}
