//! One-time login codes emailed to users.

use rand::Rng;

/// Codes are valid for ten minutes.
pub const OTP_TTL_MINUTES: i64 = 10;

/// Six decimal digits, never leading-zero (100000..=999999).
pub fn generate() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..100 {
            let code = generate();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.chars().next(), Some('0'));
        }
    }
}
