//! Exit code constants for the borp CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, not a Borg repository/cache)
//! - 2: Config failure (parse error, invalid value)
//! - 3: Lock failure (filesystem error, not locked, not my lock)
//! - 4: Lock timeout
//!
//! `borp lock with` exits with the status of the command it ran.

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or an unusable location.
pub const USER_ERROR: i32 = 1;

/// Config failure: the config file could not be parsed or holds an invalid value.
pub const CONFIG_FAILURE: i32 = 2;

/// Lock failure: the lock could not be created or released.
pub const LOCK_FAILURE: i32 = 3;

/// Lock timeout: the lock is held by someone else and the wait expired.
pub const LOCK_TIMEOUT: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, CONFIG_FAILURE, LOCK_FAILURE, LOCK_TIMEOUT];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn exit_codes_fit_in_a_byte() {
        for code in [SUCCESS, USER_ERROR, CONFIG_FAILURE, LOCK_FAILURE, LOCK_TIMEOUT] {
            assert!((0..=255).contains(&code));
        }
    }
}
