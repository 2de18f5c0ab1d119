//! Evaluation values, confidence levels and scoped contexts
//!
//! Partial evaluation never guesses: every computed value carries a
//! confidence level, and combining values takes the minimum. Scopes form
//! a parent-linked chain; variable and platform-check lookups walk the
//! chain, cache variables do not inherit.

use crate::analysis::Target;
use std::collections::HashMap;

/// Value types a CMake variable can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    Bool(bool),
    Num(f64),
    List(Vec<String>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

/// How trustworthy an evaluated value is. Ordered from most to least:
/// combining values takes the minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    Unknown,
    Uncertain,
    Likely,
    Certain,
}

impl Confidence {
    /// Lattice meet: the weaker of the two.
    pub fn min(self, other: Confidence) -> Confidence {
        std::cmp::min(self, other)
    }
}

/// A value plus the evaluator's confidence in it.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedValue {
    pub value: Value,
    pub confidence: Confidence,
}

impl EvaluatedValue {
    pub fn new(value: impl Into<Value>, confidence: Confidence) -> Self {
        Self {
            value: value.into(),
            confidence,
        }
    }

    pub fn certain(value: impl Into<Value>) -> Self {
        Self::new(value, Confidence::Certain)
    }

    pub fn unknown(value: impl Into<Value>) -> Self {
        Self::new(value, Confidence::Unknown)
    }

    pub fn is_certain(&self) -> bool {
        self.confidence == Confidence::Certain
    }

    /// A value is known iff its confidence is not `Unknown`.
    pub fn is_known(&self) -> bool {
        self.confidence != Confidence::Unknown
    }
}

/// Helpers for converting between value shapes.
pub mod value_helpers {
    use super::Value;

    /// String form: lists join with `;` (the CMake list format), booleans
    /// spell TRUE/FALSE, floats drop trailing zeros.
    pub fn to_string(value: &Value) -> String {
        match value {
            Value::Str(s) => s.clone(),
            Value::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            Value::Num(n) => format_num(*n),
            Value::List(items) => items.join(";"),
        }
    }

    pub(crate) fn format_num(n: f64) -> String {
        if n == n.trunc() && n.abs() < 1e15 {
            format!("{}", n as i64)
        } else {
            format!("{}", n)
        }
    }

    /// CMake truthiness: a string is true iff non-empty and not one of
    /// the false constants and not ending in `-NOTFOUND`.
    pub fn is_truthy(value: &Value) -> bool {
        match value {
            Value::Str(s) => {
                !s.is_empty()
                    && s != "0"
                    && s != "OFF"
                    && s != "NO"
                    && s != "FALSE"
                    && s != "N"
                    && s != "IGNORE"
                    && s != "NOTFOUND"
                    && !s.ends_with("-NOTFOUND")
            }
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0,
            Value::List(items) => !items.is_empty(),
        }
    }

    pub fn to_bool(value: &Value) -> Option<bool> {
        match value {
            Value::Str(s) => match s.as_str() {
                "1" | "ON" | "YES" | "TRUE" | "Y" => Some(true),
                "" | "0" | "OFF" | "NO" | "FALSE" | "N" | "IGNORE" | "NOTFOUND" => Some(false),
                other if other.ends_with("-NOTFOUND") => Some(false),
                _ => None,
            },
            Value::Bool(b) => Some(*b),
            Value::Num(n) => Some(*n != 0.0),
            Value::List(items) => Some(!items.is_empty()),
        }
    }

    pub fn to_f64(value: &Value) -> Option<f64> {
        match value {
            Value::Str(s) => s.parse().ok(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Num(n) => Some(*n),
            Value::List(_) => None,
        }
    }

    /// List form: a string splits on `;`, everything else wraps.
    pub fn to_list(value: &Value) -> Vec<String> {
        match value {
            Value::Str(s) => {
                if s.is_empty() {
                    Vec::new()
                } else if s.contains(';') {
                    s.split(';').map(|item| item.to_string()).collect()
                } else {
                    vec![s.clone()]
                }
            }
            Value::Bool(b) => vec![if *b { "TRUE" } else { "FALSE" }.to_string()],
            Value::Num(n) => vec![format_num(*n)],
            Value::List(items) => items.clone(),
        }
    }
}

/// One scope of the evaluation environment. Children observe parents
/// read-only during lookup and write only to their own frame.
#[derive(Debug, Default)]
pub struct EvaluationContext {
    variables: HashMap<String, EvaluatedValue>,
    cache_variables: HashMap<String, EvaluatedValue>,
    platform_checks: HashMap<String, bool>,
    targets: Vec<Target>,
    parent: Option<Box<EvaluationContext>>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Root context with the built-in variable set seeded.
    pub fn with_builtins() -> Self {
        let mut ctx = Self::new();
        ctx.seed_builtins();
        ctx
    }

    // Variables -------------------------------------------------------

    pub fn set_variable(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        confidence: Confidence,
    ) {
        let name = name.into();
        log::trace!("set variable '{}' ({:?})", name, confidence);
        self.variables
            .insert(name, EvaluatedValue::new(value, confidence));
    }

    /// Remove a variable from the current frame.
    pub fn unset_variable(&mut self, name: &str) {
        self.variables.remove(name);
    }

    /// Lookup walks the parent chain.
    pub fn get_variable(&self, name: &str) -> Option<&EvaluatedValue> {
        match self.variables.get(name) {
            Some(value) => Some(value),
            None => self.parent.as_ref().and_then(|p| p.get_variable(name)),
        }
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.get_variable(name).is_some()
    }

    // Cache variables (no inheritance) ---------------------------------

    pub fn set_cache_variable(
        &mut self,
        name: impl Into<String>,
        value: impl Into<Value>,
        confidence: Confidence,
    ) {
        self.cache_variables
            .insert(name.into(), EvaluatedValue::new(value, confidence));
    }

    pub fn get_cache_variable(&self, name: &str) -> Option<&EvaluatedValue> {
        self.cache_variables.get(name)
    }

    // Platform checks ---------------------------------------------------

    pub fn set_platform_check(&mut self, check: impl Into<String>, result: bool) {
        self.platform_checks.insert(check.into(), result);
    }

    pub fn get_platform_check(&self, check: &str) -> Option<bool> {
        match self.platform_checks.get(check) {
            Some(result) => Some(*result),
            None => self.parent.as_ref().and_then(|p| p.get_platform_check(check)),
        }
    }

    // Targets -----------------------------------------------------------

    pub fn add_target(&mut self, target: Target) {
        log::trace!("add target '{}'", target.name);
        self.targets.push(target);
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target_mut(&mut self, name: &str) -> Option<&mut Target> {
        self.targets.iter_mut().find(|t| t.name == name)
    }

    pub fn take_targets(&mut self) -> Vec<Target> {
        std::mem::take(&mut self.targets)
    }

    // Scope management ----------------------------------------------------

    /// Detach this context and hang it as the parent of a fresh child
    /// frame. Use [`EvaluationContext::pop_scope`] to get back.
    pub fn push_scope(&mut self) {
        let parent = std::mem::take(self);
        *self = EvaluationContext {
            parent: Some(Box::new(parent)),
            ..Default::default()
        };
    }

    /// Drop the innermost frame, keeping targets discovered inside it.
    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.parent.take() {
            let child_targets = std::mem::take(&mut self.targets);
            *self = *parent;
            self.targets.extend(child_targets);
        }
    }

    // Inspection ---------------------------------------------------------

    /// Sorted names of all visible variables (including inherited ones).
    pub fn variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.variables.keys().cloned().collect();
        if let Some(parent) = &self.parent {
            names.extend(parent.variable_names());
        }
        names.sort();
        names.dedup();
        names
    }

    pub fn cache_variable_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.cache_variables.keys().cloned().collect();
        names.sort();
        names
    }

    /// Seed the built-in CMake environment: directory placeholders,
    /// host-platform identifiers, compiler defaults, boolean spellings.
    pub fn seed_builtins(&mut self) {
        use Confidence::{Certain, Likely, Uncertain};

        self.set_variable("CMAKE_SOURCE_DIR", "/source", Uncertain);
        self.set_variable("CMAKE_BINARY_DIR", "/build", Uncertain);
        self.set_variable("CMAKE_CURRENT_SOURCE_DIR", "/source", Uncertain);
        self.set_variable("CMAKE_CURRENT_BINARY_DIR", "/build", Uncertain);

        // Host platform identifiers at Certain confidence; everything the
        // host is not gets the empty (falsy) string.
        let platforms: [(&str, bool); 6] = [
            ("WIN32", cfg!(target_os = "windows")),
            ("WINDOWS", cfg!(target_os = "windows")),
            ("APPLE", cfg!(target_os = "macos")),
            ("DARWIN", cfg!(target_os = "macos")),
            ("LINUX", cfg!(target_os = "linux")),
            ("UNIX", cfg!(unix)),
        ];
        for (name, on) in platforms {
            self.set_variable(name, if on { "1" } else { "" }, Certain);
            self.set_platform_check(name, on);
        }
        self.set_platform_check("MSVC", cfg!(target_os = "windows"));
        self.set_platform_check("MINGW", false);
        self.set_platform_check("CYGWIN", false);
        self.set_variable("MSVC", if cfg!(target_os = "windows") { "1" } else { "" }, Certain);
        self.set_variable("MINGW", "", Certain);
        self.set_variable("CYGWIN", "", Certain);

        self.set_variable("CMAKE_CXX_COMPILER_ID", "Generic", Uncertain);
        self.set_variable("CMAKE_CXX_STANDARD", "17", Likely);
        self.set_variable("CMAKE_C_COMPILER_ID", "Generic", Uncertain);
        self.set_variable("CMAKE_C_STANDARD", "11", Likely);
        self.set_variable("CMAKE_BUILD_TYPE", "Release", Uncertain);

        self.set_variable("TRUE", "1", Certain);
        self.set_variable("FALSE", "", Certain);
        self.set_variable("ON", "ON", Certain);
        self.set_variable("OFF", "OFF", Certain);
        self.set_variable("YES", "1", Certain);
        self.set_variable("NO", "", Certain);

        log::debug!("seeded built-in CMake variables");
    }
}

#[cfg(test)]
mod tests {
    use super::value_helpers::*;
    use super::*;

    #[test]
    fn test_confidence_ordering() {
        assert!(Confidence::Certain > Confidence::Likely);
        assert!(Confidence::Likely > Confidence::Uncertain);
        assert!(Confidence::Uncertain > Confidence::Unknown);
        assert_eq!(
            Confidence::Certain.min(Confidence::Uncertain),
            Confidence::Uncertain
        );
    }

    #[test]
    fn test_variable_lookup_walks_parents() {
        let mut ctx = EvaluationContext::new();
        ctx.set_variable("OUTER", "1", Confidence::Certain);
        ctx.push_scope();
        ctx.set_variable("INNER", "2", Confidence::Certain);

        assert!(ctx.get_variable("OUTER").is_some());
        assert!(ctx.get_variable("INNER").is_some());

        ctx.pop_scope();
        assert!(ctx.get_variable("OUTER").is_some());
        assert!(ctx.get_variable("INNER").is_none());
    }

    #[test]
    fn test_cache_variables_do_not_inherit() {
        let mut ctx = EvaluationContext::new();
        ctx.set_cache_variable("OPT", "ON", Confidence::Uncertain);
        ctx.push_scope();
        assert!(ctx.get_cache_variable("OPT").is_none());
        ctx.pop_scope();
        assert!(ctx.get_cache_variable("OPT").is_some());
    }

    #[test]
    fn test_child_scope_shadows() {
        let mut ctx = EvaluationContext::new();
        ctx.set_variable("X", "outer", Confidence::Certain);
        ctx.push_scope();
        ctx.set_variable("X", "inner", Confidence::Certain);
        assert_eq!(
            to_string(&ctx.get_variable("X").unwrap().value),
            "inner"
        );
        ctx.pop_scope();
        assert_eq!(
            to_string(&ctx.get_variable("X").unwrap().value),
            "outer"
        );
    }

    #[test]
    fn test_targets_survive_pop_scope() {
        let mut ctx = EvaluationContext::new();
        ctx.push_scope();
        ctx.add_target(crate::analysis::Target::new(
            "inner_lib",
            crate::analysis::TargetKind::StaticLib,
        ));
        ctx.pop_scope();
        assert_eq!(ctx.targets().len(), 1);
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&Value::Str("1".into())));
        assert!(is_truthy(&Value::Str("anything".into())));
        for falsy in ["", "0", "OFF", "NO", "FALSE", "N", "IGNORE", "NOTFOUND"] {
            assert!(!is_truthy(&Value::Str(falsy.into())), "{:?}", falsy);
        }
        assert!(!is_truthy(&Value::Str("FMT-NOTFOUND".into())));
        assert!(!is_truthy(&Value::List(vec![])));
        assert!(is_truthy(&Value::List(vec!["x".into()])));
        assert!(!is_truthy(&Value::Num(0.0)));
    }

    #[test]
    fn test_to_string_joins_lists() {
        assert_eq!(
            to_string(&Value::List(vec!["a".into(), "b".into()])),
            "a;b"
        );
        assert_eq!(to_string(&Value::Num(3.0)), "3");
        assert_eq!(to_string(&Value::Num(3.5)), "3.5");
        assert_eq!(to_string(&Value::Bool(true)), "TRUE");
    }

    #[test]
    fn test_to_list_splits_semicolons() {
        assert_eq!(
            to_list(&Value::Str("a;b;c".into())),
            vec!["a", "b", "c"]
        );
        assert_eq!(to_list(&Value::Str("single".into())), vec!["single"]);
        assert!(to_list(&Value::Str("".into())).is_empty());
    }

    #[test]
    fn test_builtins_seeded() {
        let ctx = EvaluationContext::with_builtins();
        let unix = ctx.get_variable("UNIX").expect("UNIX");
        assert!(unix.is_certain());
        assert!(ctx.get_variable("CMAKE_SOURCE_DIR").is_some());
        #[cfg(target_os = "linux")]
        {
            assert!(is_truthy(&ctx.get_variable("LINUX").unwrap().value));
            assert!(!is_truthy(&ctx.get_variable("WIN32").unwrap().value));
        }
    }
}
