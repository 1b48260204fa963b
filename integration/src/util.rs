//! Assertion helpers for the scenarios

use eyre::{eyre, Result};
use furio_scripts::errors::ScriptError;

/// Assert that two values are equal, returning an error otherwise
#[macro_export]
macro_rules! assert_eq_result {
    ($left:expr, $right:expr) => {{
        let (left, right) = (&$left, &$right);
        if left == right {
            Ok(())
        } else {
            Err(eyre::eyre!(
                "assertion `{} == {}` failed\n  left: {:?}\n right: {:?}",
                stringify!($left),
                stringify!($right),
                left,
                right
            ))
        }
    }};
}

/// Assert that a condition holds, returning an error otherwise
#[macro_export]
macro_rules! assert_true_result {
    ($cond:expr) => {
        if $cond {
            Ok(())
        } else {
            Err(eyre::eyre!("assertion `{}` failed", stringify!($cond)))
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if $cond {
            Ok(())
        } else {
            Err(eyre::eyre!($($arg)+))
        }
    };
}

/// Check that a transaction reverted with a reason containing `reason`
pub(crate) fn expect_revert<T>(res: Result<T, ScriptError>, reason: &str) -> Result<()> {
    match res {
        Err(ScriptError::TransactionReverted(msg)) if msg.contains(reason) => Ok(()),
        Err(e) => Err(eyre!("expected a revert with `{}`, got: {}", reason, e)),
        Ok(_) => Err(eyre!("expected a revert with `{}`, but the call succeeded", reason)),
    }
}
