//! Parse error kinds.
//!
//! Every [`Schema`](crate::Schema) carries the [`ErrorKind`] of its most
//! recent parse. The `Display` impl doubles as the static description table
//! returned by [`error_description`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of failure recorded against a schema by a parse call.
///
/// # Examples
///
/// ```
/// use argwright_core::ErrorKind;
///
/// assert_eq!(ErrorKind::default(), ErrorKind::Ok);
/// assert!(ErrorKind::InvalidValue.is_failure());
/// assert_eq!(
///     ErrorKind::TooFewArguments.to_string(),
///     "required positional arguments missing"
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No failure.
    #[default]
    #[error("no error")]
    Ok,
    /// The schema is self-inconsistent.
    #[error("configuration is invalid")]
    InvalidConfig,
    /// A token failed its verifier.
    #[error("argument value does not match expected type or criteria")]
    InvalidValue,
    /// Unrecognized flag or option syntax.
    #[error("unrecognized option or flag syntax")]
    InvalidOption,
    /// More positional tokens than the schema declares.
    #[error("too many positional arguments provided")]
    TooManyArguments,
    /// A required positional was never satisfied.
    #[error("required positional arguments missing")]
    TooFewArguments,
}

impl ErrorKind {
    /// Returns `true` for every kind except [`ErrorKind::Ok`].
    pub fn is_failure(self) -> bool {
        self != Self::Ok
    }

    /// Static description of this error kind.
    pub fn description(self) -> &'static str {
        match self {
            Self::Ok => "no error",
            Self::InvalidConfig => "configuration is invalid",
            Self::InvalidValue => "argument value does not match expected type or criteria",
            Self::InvalidOption => "unrecognized option or flag syntax",
            Self::TooManyArguments => "too many positional arguments provided",
            Self::TooFewArguments => "required positional arguments missing",
        }
    }
}

/// Returns the static description of `kind`.
///
/// # Examples
///
/// ```
/// use argwright_core::{ErrorKind, error_description};
///
/// assert_eq!(error_description(ErrorKind::Ok), "no error");
/// assert_eq!(
///     error_description(ErrorKind::InvalidOption),
///     "unrecognized option or flag syntax"
/// );
/// ```
pub fn error_description(kind: ErrorKind) -> &'static str {
    kind.description()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ErrorKind; 6] = [
        ErrorKind::Ok,
        ErrorKind::InvalidConfig,
        ErrorKind::InvalidValue,
        ErrorKind::InvalidOption,
        ErrorKind::TooManyArguments,
        ErrorKind::TooFewArguments,
    ];

    #[test]
    fn test_display_matches_description_table() {
        for kind in ALL {
            assert_eq!(kind.to_string(), error_description(kind));
        }
    }

    #[test]
    fn test_only_ok_is_not_a_failure() {
        let failures: Vec<_> = ALL.iter().filter(|k| k.is_failure()).collect();
        assert_eq!(failures.len(), 5);
        assert!(!ErrorKind::Ok.is_failure());
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::TooManyArguments).unwrap();
        assert_eq!(json, "\"too_many_arguments\"");
    }
}
