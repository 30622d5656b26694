//! Reference syntax — the `@` sigil.
//!
//! A string argument prefixed with `@` means "substitute the deployed address
//! of that contract". Everything else passes through byte-identical. The
//! recursive ensure-before-use resolution lives in the engine; this module
//! owns the syntax.

use super::error::EngineError;
use super::types::Value;

/// The prefix marking an address reference.
pub const SIGIL: char = '@';

/// Returns the referenced contract name if `value` is a sigil reference.
pub fn reference_name(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => strip_sigil(s),
        _ => None,
    }
}

/// Returns the contract name if `s` is in reference form (`@Name`).
pub fn strip_sigil(s: &str) -> Option<&str> {
    s.strip_prefix(SIGIL).filter(|rest| !rest.is_empty())
}

/// True if `s` is in reference form.
pub fn is_reference(s: &str) -> bool {
    strip_sigil(s).is_some()
}

/// Require `entry` to be in reference form, as dependency declarations and
/// action targets must be. Returns the referenced name.
pub fn require_reference<'a>(contract: &str, entry: &'a str) -> Result<&'a str, EngineError> {
    strip_sigil(entry).ok_or_else(|| EngineError::InvalidDependencyFormat {
        contract: contract.to_string(),
        dependency: entry.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_resolver_reference_name() {
        assert_eq!(
            reference_name(&Value::String("@Registry".to_string())),
            Some("Registry")
        );
        assert_eq!(reference_name(&Value::String("Registry".to_string())), None);
        assert_eq!(reference_name(&Value::from(42)), None);
        assert_eq!(reference_name(&Value::Bool(true)), None);
    }

    #[test]
    fn test_resolver_bare_sigil_is_not_a_reference() {
        assert_eq!(strip_sigil("@"), None);
        assert!(!is_reference("@"));
    }

    #[test]
    fn test_resolver_is_reference() {
        assert!(is_reference("@A"));
        assert!(!is_reference("A"));
        assert!(!is_reference(""));
        // Sigil must be the first byte
        assert!(!is_reference("x@A"));
    }

    #[test]
    fn test_resolver_require_reference_ok() {
        assert_eq!(require_reference("Child", "@Parent").unwrap(), "Parent");
    }

    #[test]
    fn test_resolver_require_reference_rejects_bare_name() {
        let err = require_reference("Child", "Parent").unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidDependencyFormat { ref contract, ref dependency }
                if contract == "Child" && dependency == "Parent"
        ));
    }

    proptest! {
        /// Any string not starting with the sigil is a literal.
        #[test]
        fn prop_resolver_literals_pass_through(s in "[^@][a-zA-Z0-9_@]{0,24}") {
            prop_assert!(!is_reference(&s));
            let value = Value::String(s.clone());
            prop_assert_eq!(reference_name(&value), None);
        }

        /// Stripping the sigil always yields the declared name.
        #[test]
        fn prop_resolver_sigil_roundtrip(name in "[A-Za-z][A-Za-z0-9_]{0,24}") {
            let reference = format!("@{}", name);
            prop_assert_eq!(strip_sigil(&reference), Some(name.as_str()));
        }
    }
}
