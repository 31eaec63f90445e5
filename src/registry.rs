//! Link-time registry of named targets.
//!
//! Functions annotated with `#[probe_target]` land in a distributed slice
//! and can be resolved into a [`CallableHandle`] by owner and name, the way a
//! reflective harness would look a method up on a class.
//!
//! ```rust,ignore
//! use cntryl_probe::{probe_target, Failure, Value};
//!
//! #[probe_target(owner = "Math", params = "i64, i64")]
//! fn add(args: &[Value]) -> Result<Value, Failure> {
//!     let a = args[0].as_i64().unwrap_or_default();
//!     let b = args[1].as_i64().unwrap_or_default();
//!     Ok(Value::from(a + b))
//! }
//!
//! let handle = cntryl_probe::registry::resolve("Math", "add")?;
//! ```

use crate::error::ConfigError;
use crate::failure::Failure;
use crate::handle::CallableHandle;
use crate::Value;

/// A registered target.
#[doc(hidden)]
pub struct TargetEntry {
    /// Operation name (function name or custom)
    pub name: &'static str,
    /// Owner name (custom, or the defining module path)
    pub owner: &'static str,
    /// Comma-separated parameter type names
    pub params: &'static str,
    /// The target function
    pub func: fn(&[Value]) -> Result<Value, Failure>,
}

impl TargetEntry {
    pub fn param_list(&self) -> Vec<String> {
        self.params
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// `Owner.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.owner, self.name)
    }

    pub fn handle(&self) -> CallableHandle {
        CallableHandle::function(self.owner, self.name, self.func).with_params(self.param_list())
    }
}

// Re-export linkme for the proc macro
#[doc(hidden)]
pub use linkme;

/// Distributed slice collecting all registered targets.
#[doc(hidden)]
#[linkme::distributed_slice]
pub static PROBE_TARGETS: [TargetEntry];

/// Resolve a registered target by owner and operation name.
///
/// Owners declared with a module path also match on their last segment, so
/// `my_crate::fixtures` resolves as `fixtures` too.
pub fn resolve(owner: &str, name: &str) -> Result<CallableHandle, ConfigError> {
    PROBE_TARGETS
        .iter()
        .find(|t| t.name == name && owner_matches(t.owner, owner))
        .map(TargetEntry::handle)
        .ok_or_else(|| ConfigError::UnresolvedTarget {
            owner: owner.to_string(),
            name: name.to_string(),
        })
}

/// Resolve `Owner.name` (or `Owner::name`).
pub fn resolve_path(path: &str) -> Result<CallableHandle, ConfigError> {
    let (owner, name) = split_path(path)?;
    resolve(owner, name)
}

/// Get all registered targets, optionally filtered by glob pattern over
/// their qualified names.
pub fn list_targets(filter: Option<&str>) -> Vec<&'static TargetEntry> {
    let mut targets: Vec<_> = PROBE_TARGETS
        .iter()
        .filter(|t| match filter {
            Some(pattern) => matches_glob(&t.qualified_name(), pattern),
            None => true,
        })
        .collect();
    targets.sort_by(|a, b| (a.owner, a.name).cmp(&(b.owner, b.name)));
    targets
}

/// Get count of registered targets.
pub fn target_count() -> usize {
    PROBE_TARGETS.len()
}

fn split_path(path: &str) -> Result<(&str, &str), ConfigError> {
    let split = path
        .rsplit_once("::")
        .or_else(|| path.rsplit_once('.'))
        .filter(|(owner, name)| !owner.is_empty() && !name.is_empty());
    split.ok_or_else(|| ConfigError::InvalidTargetPath(path.to_string()))
}

fn owner_matches(declared: &str, wanted: &str) -> bool {
    declared == wanted || declared.rsplit("::").next() == Some(wanted)
}

/// Simple glob matching supporting `*`; without wildcards it is a substring
/// match. Case-insensitive.
pub fn matches_glob(text: &str, pattern: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let text = text.to_lowercase();

    if !pattern.contains('*') {
        return text.contains(&pattern);
    }

    let parts: Vec<&str> = pattern.split('*').collect();
    let mut remaining = text.as_str();

    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            // First part anchors at the start
            if !remaining.starts_with(part) {
                return false;
            }
            remaining = &remaining[part.len()..];
        } else if i == parts.len() - 1 {
            // Last part anchors at the end
            if !remaining.ends_with(part) {
                return false;
            }
        } else if let Some(pos) = remaining.find(part) {
            remaining = &remaining[pos + part.len()..];
        } else {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::Callable;
    use crate::probe_target;
    use serde_json::json;

    #[probe_target(owner = "RegistryFixture", params = "i64, i64")]
    fn add(args: &[Value]) -> Result<Value, Failure> {
        let a = args[0].as_i64().unwrap_or_default();
        let b = args[1].as_i64().unwrap_or_default();
        Ok(json!(a + b))
    }

    #[probe_target(owner = "RegistryFixture", name = "always_fails")]
    fn fails(_args: &[Value]) -> Result<Value, Failure> {
        Err(Failure::new("Exception", "crac"))
    }

    #[probe_target]
    fn module_owned(_args: &[Value]) -> Result<Value, Failure> {
        Ok(Value::Null)
    }

    #[test]
    fn should_resolve_registered_target_with_params() {
        let handle = resolve("RegistryFixture", "add").unwrap();
        assert_eq!(handle.owner(), "RegistryFixture");
        assert_eq!(handle.params(), &["i64".to_string(), "i64".to_string()]);
        assert_eq!(handle.invoke(&[json!(40), json!(2)]).unwrap(), json!(42));
    }

    #[test]
    fn should_resolve_custom_name() {
        let handle = resolve_path("RegistryFixture.always_fails").unwrap();
        assert_eq!(handle.arity(), 0);
        assert!(handle.invoke(&[]).is_err());
        assert!(resolve("RegistryFixture", "fails").is_err());
    }

    #[test]
    fn should_resolve_module_owner_by_last_segment() {
        assert!(resolve("tests", "module_owned").is_ok());
        assert!(resolve_path("cntryl_probe::registry::tests::module_owned").is_ok());
    }

    #[test]
    fn should_report_unresolved_target() {
        let err = resolve("RegistryFixture", "missing").unwrap_err();
        assert_eq!(
            err,
            ConfigError::UnresolvedTarget {
                owner: "RegistryFixture".to_string(),
                name: "missing".to_string()
            }
        );
        assert!(matches!(
            resolve_path("no_separator"),
            Err(ConfigError::InvalidTargetPath(_))
        ));
    }

    #[test]
    fn should_list_targets_sorted_and_filtered() {
        let names: Vec<String> = list_targets(Some("registryfixture*"))
            .iter()
            .map(|t| t.qualified_name())
            .collect();
        assert_eq!(names, vec!["RegistryFixture.add", "RegistryFixture.always_fails"]);
        assert!(target_count() >= 3);
    }

    #[test]
    fn glob_matches_substring() {
        assert!(matches_glob("Math.add", "add"));
        assert!(!matches_glob("Math.add", "sub"));
    }

    #[test]
    fn glob_matches_wildcard() {
        assert!(matches_glob("Math.add_all", "math*all"));
        assert!(matches_glob("Math.add_all", "*add*"));
        assert!(matches_glob("Math.add_all", "Math*"));
        assert!(matches_glob("Math.add_all", "*all"));
        assert!(!matches_glob("Math.add_all", "sub*"));
    }

    #[test]
    fn glob_is_case_insensitive() {
        assert!(matches_glob("BatchTests", "batchtests"));
        assert!(matches_glob("batchtests", "BATCH*"));
    }
}
