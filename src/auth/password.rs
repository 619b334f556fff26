//! Password hashing. Cost 10 matches the hashes the original backend
//! produced, so existing accounts keep working after migration.

use crate::error::AppError;

const COST: u32 = 10;

pub fn hash(plain: &str) -> Result<String, AppError> {
    bcrypt::hash(plain, COST).map_err(|e| AppError::Internal(format!("bcrypt: {e}")))
}

pub fn verify(plain: &str, hashed: &str) -> bool {
    bcrypt::verify(plain, hashed).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_matching_password() {
        let h = hash("admin123").unwrap();
        assert!(verify("admin123", &h));
        assert!(!verify("admin124", &h));
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(!verify("x", "not-a-bcrypt-hash"));
    }
}
