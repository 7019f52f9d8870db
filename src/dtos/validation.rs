//! Validatori condivisi tra i DTO

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

lazy_static! {
    /// matricola: solo lettere e cifre, da 4 a 32 caratteri
    pub static ref REGISTRATION_RE: Regex = Regex::new(r"^[0-9A-Za-z]{4,32}$").unwrap();
}

/// Rifiuta stringhe composte solo da spazi
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("must not be blank".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_blank() {
        assert!(not_blank("ok").is_ok());
        assert!(not_blank("   ").is_err());
        assert!(not_blank("").is_err());
    }

    #[test]
    fn test_registration_pattern() {
        assert!(REGISTRATION_RE.is_match("2023A0042"));
        assert!(!REGISTRATION_RE.is_match("20-23"));
        assert!(!REGISTRATION_RE.is_match("abc"));
    }
}
