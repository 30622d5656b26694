//! Plan parsing and validation.
//!
//! Parses deploy.yaml and validates structural constraints:
//! - Contract names unique and non-empty
//! - Dependencies and action targets in `@` reference form
//! - Every reference names a declared contract
//! - Action commands unique per contract, `initialize` reserved

use super::error::EngineError;
use super::resolver;
use super::types::{DeployPlan, Value};
use std::collections::HashSet;
use std::path::Path;

/// Validation error.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Parse a deploy.yaml file from disk.
pub fn parse_plan_file(path: &Path) -> Result<DeployPlan, EngineError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    parse_plan(&content)
}

/// Parse a deploy.yaml from a string.
pub fn parse_plan(yaml: &str) -> Result<DeployPlan, EngineError> {
    serde_yaml_ng::from_str(yaml)
        .map_err(|e| EngineError::Config(format!("YAML parse error: {}", e)))
}

/// Validate a parsed plan. Returns a list of errors (empty = valid).
pub fn validate_plan(plan: &DeployPlan) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let declared: HashSet<&str> = plan.contracts.iter().map(|c| c.contract.as_str()).collect();

    // Uniqueness
    let mut seen = HashSet::new();
    for spec in &plan.contracts {
        if spec.contract.is_empty() {
            errors.push(ValidationError {
                message: "contract name must not be empty".to_string(),
            });
        }
        if !seen.insert(spec.contract.as_str()) {
            errors.push(ValidationError {
                message: format!("duplicate contract name '{}'", spec.contract),
            });
        }
    }

    for spec in &plan.contracts {
        let name = &spec.contract;

        for dep in &spec.dependencies {
            match resolver::strip_sigil(dep) {
                Some(dep_name) => {
                    if !declared.contains(dep_name) {
                        errors.push(ValidationError {
                            message: format!(
                                "contract '{}' depends on undeclared '{}'",
                                name, dep_name
                            ),
                        });
                    }
                }
                None => errors.push(ValidationError {
                    message: format!(
                        "contract '{}' dependency '{}' must use the '@Name' form",
                        name, dep
                    ),
                }),
            }
        }

        check_arg_references(name, "args", &spec.args, &declared, &mut errors);
        if let Some(ref init_args) = spec.initialize {
            check_arg_references(name, "initialize", init_args, &declared, &mut errors);
        }

        let mut commands = HashSet::new();
        for action in &spec.actions {
            if action.command.is_empty() {
                errors.push(ValidationError {
                    message: format!("contract '{}' has an action with no command", name),
                });
            }
            if !commands.insert(action.command.as_str()) {
                errors.push(ValidationError {
                    message: format!(
                        "contract '{}' declares action '{}' more than once",
                        name, action.command
                    ),
                });
            }
            // The journal keys the initialize call by this name
            if action.command == "initialize" && spec.initialize.is_some() {
                errors.push(ValidationError {
                    message: format!(
                        "contract '{}': action command 'initialize' conflicts with initialize args",
                        name
                    ),
                });
            }

            match resolver::strip_sigil(&action.target) {
                Some(target_name) => {
                    if !declared.contains(target_name) {
                        errors.push(ValidationError {
                            message: format!(
                                "contract '{}' action '{}' targets undeclared '{}'",
                                name, action.command, target_name
                            ),
                        });
                    }
                }
                None => errors.push(ValidationError {
                    message: format!(
                        "contract '{}' action '{}' target '{}' must use the '@Name' form",
                        name, action.command, action.target
                    ),
                }),
            }

            check_arg_references(name, &action.command, &action.args, &declared, &mut errors);
        }
    }

    errors
}

fn check_arg_references(
    contract: &str,
    context: &str,
    args: &[Value],
    declared: &HashSet<&str>,
    errors: &mut Vec<ValidationError>,
) {
    for arg in args {
        if let Some(referenced) = resolver::reference_name(arg) {
            if !declared.contains(referenced) {
                errors.push(ValidationError {
                    message: format!(
                        "contract '{}' ({}) references undeclared '{}'",
                        contract, context, referenced
                    ),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_parse_valid() {
        let yaml = r#"
contracts:
  - contract: Registry
  - contract: Vault
    args: ["@Registry"]
    dependencies: ["@Registry"]
"#;
        let plan = parse_plan(yaml).unwrap();
        assert_eq!(plan.contracts.len(), 2);
        let errors = validate_plan(&plan);
        assert!(
            errors.is_empty(),
            "unexpected errors: {:?}",
            errors.iter().map(|e| &e.message).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_parser_duplicate_name() {
        let yaml = r#"
contracts:
  - contract: Registry
  - contract: Registry
"#;
        let errors = validate_plan(&parse_plan(yaml).unwrap());
        assert!(errors.iter().any(|e| e.message.contains("duplicate")));
    }

    #[test]
    fn test_parser_undeclared_arg_reference() {
        let yaml = r#"
contracts:
  - contract: Vault
    args: ["@Ghost"]
"#;
        let errors = validate_plan(&parse_plan(yaml).unwrap());
        assert!(errors.iter().any(|e| e.message.contains("undeclared 'Ghost'")));
    }

    #[test]
    fn test_parser_bare_dependency_rejected() {
        let yaml = r#"
contracts:
  - contract: Registry
  - contract: Vault
    dependencies: ["Registry"]
"#;
        let errors = validate_plan(&parse_plan(yaml).unwrap());
        assert!(errors.iter().any(|e| e.message.contains("'@Name' form")));
    }

    #[test]
    fn test_parser_self_dependency_left_to_cycle_guard() {
        // Cycles, including self-cycles, are the engine's cycle guard to
        // report with the full path; the validator stays out of it.
        let yaml = r#"
contracts:
  - contract: Vault
    dependencies: ["@Vault"]
"#;
        let errors = validate_plan(&parse_plan(yaml).unwrap());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_parser_action_target_checks() {
        let yaml = r#"
contracts:
  - contract: Vault
    actions:
      - target: Vault
        command: poke
      - target: "@Ghost"
        command: prod
"#;
        let errors = validate_plan(&parse_plan(yaml).unwrap());
        assert!(errors.iter().any(|e| e.message.contains("'@Name' form")));
        assert!(errors.iter().any(|e| e.message.contains("undeclared 'Ghost'")));
    }

    #[test]
    fn test_parser_duplicate_action_command() {
        let yaml = r#"
contracts:
  - contract: Vault
    actions:
      - target: "@Vault"
        command: setOwner
      - target: "@Vault"
        command: setOwner
"#;
        let errors = validate_plan(&parse_plan(yaml).unwrap());
        assert!(errors.iter().any(|e| e.message.contains("more than once")));
    }

    #[test]
    fn test_parser_initialize_command_reserved() {
        let yaml = r#"
contracts:
  - contract: Vault
    initialize: [1]
    actions:
      - target: "@Vault"
        command: initialize
"#;
        let errors = validate_plan(&parse_plan(yaml).unwrap());
        assert!(errors.iter().any(|e| e.message.contains("conflicts")));
    }

    #[test]
    fn test_parser_literal_at_in_nested_array_ignored() {
        // Only top-level string values are references
        let yaml = r#"
contracts:
  - contract: Vault
    args: [["@Ghost"]]
"#;
        let errors = validate_plan(&parse_plan(yaml).unwrap());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_parser_parse_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.yaml");
        std::fs::write(&path, "contracts:\n  - contract: Registry\n").unwrap();
        let plan = parse_plan_file(&path).unwrap();
        assert_eq!(plan.contracts[0].contract, "Registry");
    }

    #[test]
    fn test_parser_parse_invalid_yaml() {
        let result = parse_plan("not: [valid: yaml: {{");
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_parser_missing_file() {
        let result = parse_plan_file(Path::new("/nonexistent/deploy.yaml"));
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
