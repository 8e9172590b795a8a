use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use common::model::PrivacyLevel;

use crate::patterns::PiiType;

fn stable_hash(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// `public`: hash-replace the match with a typed, deterministic token, e.g.
/// `[EMAIL_a1b2c3d4]` (spec.md §4.6). Deterministic so the same input
/// always anonymizes to the same token within one run.
fn full_tokenize(pii_type: PiiType, matched: &str) -> String {
    format!(
        "[{}_{:08x}]",
        pii_type.token_label(),
        stable_hash(matched) & 0xFFFF_FFFF
    )
}

fn mask_email(local_visible: usize, matched: &str) -> String {
    let Some((local, domain)) = matched.split_once('@') else {
        return matched.to_owned();
    };
    let visible: String = local.chars().take(local_visible).collect();
    format!("{visible}***@{domain}")
}

fn mask_phone(area_visible: bool, last_visible: bool, matched: &str) -> String {
    let separator = if matched.contains('.') { '.' } else { '-' };
    let digits: Vec<char> = matched.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 10 {
        return matched.to_owned();
    }
    let area: String = digits[0..3].iter().collect();
    let last: String = digits[6..10].iter().collect();
    let area_part = if area_visible { area } else { "***".to_owned() };
    let last_part = if last_visible { last } else { "****".to_owned() };
    format!("{area_part}{separator}***{separator}{last_part}")
}

fn mask_card(matched: &str) -> String {
    let separator = if matched.contains(' ') { ' ' } else { '-' };
    let digits: Vec<char> = matched.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 16 {
        return matched.to_owned();
    }
    let last: String = digits[12..16].iter().collect();
    format!("****{separator}****{separator}****{separator}{last}")
}

fn mask_ssn(matched: &str) -> String {
    let digits: Vec<char> = matched.chars().filter(char::is_ascii_digit).collect();
    if digits.len() != 9 {
        return matched.to_owned();
    }
    let last: String = digits[5..9].iter().collect();
    format!("***-**-{last}")
}

fn mask_ipv4(matched: &str) -> String {
    let octets: Vec<&str> = matched.split('.').collect();
    if octets.len() != 4 {
        return matched.to_owned();
    }
    format!("{}.{}.{}.***", octets[0], octets[1], octets[2])
}

fn mask_date(matched: &str) -> String {
    let parts: Vec<&str> = matched.split('-').collect();
    if parts.len() != 3 {
        return matched.to_owned();
    }
    format!("{}-{}-**", parts[0], parts[1])
}

/// `private`: partial mask — reveals a structural hint (domain, area code,
/// last four digits, month) while hiding the identifying part.
fn partial_mask(pii_type: PiiType, matched: &str) -> String {
    match pii_type {
        PiiType::Email => mask_email(0, matched),
        PiiType::Phone => mask_phone(true, false, matched),
        PiiType::CreditCard => mask_card(matched),
        PiiType::Ssn => mask_ssn(matched),
        PiiType::Ipv4 => mask_ipv4(matched),
        PiiType::Date => mask_date(matched),
    }
}

/// `enterprise`: minimal mask — reveals more than `private` for low-risk
/// types; card/SSN still fully tokenized by the caller before reaching
/// here.
fn minimal_mask(pii_type: PiiType, matched: &str) -> String {
    match pii_type {
        PiiType::Email => mask_email(1, matched),
        PiiType::Phone => mask_phone(true, true, matched),
        PiiType::Ipv4 => mask_ipv4(matched),
        PiiType::Date => mask_date(matched),
        PiiType::CreditCard | PiiType::Ssn => matched.to_owned(),
    }
}

/// Applies the transform intensity appropriate for `level` (spec.md §4.6):
/// `public` fully tokenizes everything, `private` partially masks,
/// `enterprise` minimally masks but still fully tokenizes card/SSN, and
/// `restricted` passes everything through except card/SSN.
pub fn mask_for_level(pii_type: PiiType, matched: &str, level: PrivacyLevel) -> String {
    let always_tokenized = matches!(pii_type, PiiType::CreditCard | PiiType::Ssn);
    match level {
        PrivacyLevel::Public => full_tokenize(pii_type, matched),
        PrivacyLevel::Private => partial_mask(pii_type, matched),
        PrivacyLevel::Enterprise => {
            if always_tokenized {
                full_tokenize(pii_type, matched)
            } else {
                minimal_mask(pii_type, matched)
            }
        }
        PrivacyLevel::Restricted => {
            if always_tokenized {
                full_tokenize(pii_type, matched)
            } else {
                matched.to_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_level_tokenizes_email() {
        let masked = mask_for_level(PiiType::Email, "jane@example.com", PrivacyLevel::Public);
        assert!(masked.starts_with("[EMAIL_"));
    }

    #[test]
    fn private_level_partially_masks_email() {
        let masked = mask_for_level(PiiType::Email, "jane@example.com", PrivacyLevel::Private);
        assert_eq!(masked, "***@example.com");
    }

    #[test]
    fn enterprise_level_minimally_masks_email() {
        let masked = mask_for_level(PiiType::Email, "jane@example.com", PrivacyLevel::Enterprise);
        assert_eq!(masked, "j***@example.com");
    }

    #[test]
    fn restricted_level_tokenizes_card_but_passes_through_email() {
        let email = mask_for_level(PiiType::Email, "jane@example.com", PrivacyLevel::Restricted);
        assert_eq!(email, "jane@example.com");

        let card = mask_for_level(PiiType::CreditCard, "4111-1111-1111-1234", PrivacyLevel::Restricted);
        assert!(card.starts_with("[CARD_"));
    }

    #[test]
    fn enterprise_level_tokenizes_ssn() {
        let masked = mask_for_level(PiiType::Ssn, "123-45-6789", PrivacyLevel::Enterprise);
        assert!(masked.starts_with("[SSN_"));
    }

    #[test]
    fn private_level_masks_phone_keeping_area_code() {
        let masked = mask_for_level(PiiType::Phone, "555-123-4567", PrivacyLevel::Private);
        assert_eq!(masked, "555-***-****");
    }

    #[test]
    fn enterprise_level_masks_phone_keeping_area_and_last_four() {
        let masked = mask_for_level(PiiType::Phone, "555-123-4567", PrivacyLevel::Enterprise);
        assert_eq!(masked, "555-***-4567");
    }
}
