//! Utility functions and helpers

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Generate a random alphanumeric string from the given generator
pub fn random_string_with<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    rng.sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Replace every `(placeholder, value)` pair in `template`
pub fn replace_placeholders(template: &str, replacements: &[(&str, &str)]) -> String {
    replacements
        .iter()
        .fold(template.to_string(), |acc, (placeholder, value)| {
            acc.replace(placeholder, value)
        })
}

/// Sanitize a secret for logging
pub fn sanitize_for_logging(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }

    if s.chars().count() <= 8 {
        return "***".to_string();
    }

    // Keep the first 4 characters so operators can tell secrets apart
    let head: String = s.chars().take(4).collect();
    format!("{}***", head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_random_string_length_and_alphabet() {
        let s = random_string_with(&mut rand::thread_rng(), 64);
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_random_string_is_deterministic_with_seed() {
        let a = random_string_with(&mut StdRng::seed_from_u64(7), 16);
        let b = random_string_with(&mut StdRng::seed_from_u64(7), 16);
        assert_eq!(a, b);
    }

    #[test]
    fn test_replace_placeholders() {
        let out = replace_placeholders("a={A} b={B} a={A}", &[("{A}", "1"), ("{B}", "2")]);
        assert_eq!(out, "a=1 b=2 a=1");
    }

    #[test]
    fn test_sanitize_for_logging() {
        assert_eq!(sanitize_for_logging(""), "");
        assert_eq!(sanitize_for_logging("short"), "***");
        assert_eq!(sanitize_for_logging("verylongsecret"), "very***");
    }
}
