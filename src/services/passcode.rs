use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::error::ApiError;

pub const PASSCODE_LEN: usize = 10;

/// Attempts before giving up on a colliding passcode
pub const MAX_PASSCODE_ATTEMPTS: usize = 5;

pub fn generate() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(PASSCODE_LEN)
        .map(char::from)
        .collect()
}

pub fn is_valid(passcode: &str) -> bool {
    passcode.len() == PASSCODE_LEN && passcode.bytes().all(|b| b.is_ascii_alphanumeric())
}

pub fn validate(passcode: &str) -> Result<(), ApiError> {
    if is_valid(passcode) {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Invalid passcode: expected {} alphanumeric characters",
            PASSCODE_LEN
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_passcodes_are_valid() {
        for _ in 0..100 {
            let code = generate();
            assert!(is_valid(&code), "{code}");
        }
    }

    #[test]
    fn rejects_wrong_length_and_symbols() {
        assert!(is_valid("ABCDEFGHIJ"));
        assert!(is_valid("abc123XYZ0"));
        assert!(!is_valid("ABCDEFGHI"));
        assert!(!is_valid("ABCDEFGHIJK"));
        assert!(!is_valid("ABCDE-GHIJ"));
        assert!(!is_valid("ÅBCDEFGHI"));
        assert_eq!(validate("short").unwrap_err().status_code(), 400);
    }
}
