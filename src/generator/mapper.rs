//! Target mapping
//!
//! Pure translation from discovered CMake targets to Buck2 rule shapes.
//! Entries that still reference unresolved variables or generator
//! expressions have no stable Buck equivalent and are dropped here.

use crate::analysis::{Target, TargetKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Buck2 rule a target maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    CxxLibrary,
    CxxBinary,
    CxxTest,
    FileGroup,
    PrebuiltCxxLibrary,
    HttpArchive,
    Unknown,
}

impl RuleKind {
    /// Starlark function name for the rule call.
    pub fn function_name(&self) -> &'static str {
        match self {
            RuleKind::CxxLibrary => "cxx_library",
            RuleKind::CxxBinary => "cxx_binary",
            RuleKind::CxxTest => "cxx_test",
            RuleKind::FileGroup => "filegroup",
            RuleKind::PrebuiltCxxLibrary => "prebuilt_cxx_library",
            RuleKind::HttpArchive => "http_archive",
            RuleKind::Unknown => "unknown",
        }
    }

    /// Load statement source for the rule, when one is needed.
    pub fn load_file(&self) -> Option<&'static str> {
        match self {
            RuleKind::CxxLibrary | RuleKind::CxxBinary | RuleKind::CxxTest => {
                Some("@prelude//cxx:cxx.bzl")
            }
            RuleKind::PrebuiltCxxLibrary => Some("@prelude//cxx:cxx.bzl"),
            // filegroup and http_archive are built in.
            RuleKind::FileGroup | RuleKind::HttpArchive | RuleKind::Unknown => None,
        }
    }
}

/// A target translated into Buck2 attribute form, ready to render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedTarget {
    pub name: String,
    pub rule_kind: RuleKind,
    pub srcs: Vec<String>,
    pub headers: Vec<String>,
    pub deps: Vec<String>,
    /// Extra attributes, already serialized as Starlark values.
    pub properties: BTreeMap<String, String>,
    /// Platform selector the emitter should wrap the rule in, if any.
    pub platform_select: Option<String>,
}

impl MappedTarget {
    pub fn is_unknown(&self) -> bool {
        self.rule_kind == RuleKind::Unknown
    }
}

/// Map one CMake target to its Buck2 shape.
pub fn map_target(target: &Target) -> MappedTarget {
    let rule_kind = determine_rule_kind(target);
    let mut properties = BTreeMap::new();

    if !target.compile_defs.is_empty() {
        properties.insert(
            "preprocessor_flags".to_string(),
            starlark_list(&target.compile_defs),
        );
    }
    if !target.include_dirs.is_empty() {
        properties.insert(
            "exported_headers".to_string(),
            starlark_list(&target.include_dirs),
        );
    }
    if !target.compile_opts.is_empty() {
        properties.insert(
            "compiler_flags".to_string(),
            starlark_list(&target.compile_opts),
        );
    }
    if rule_kind == RuleKind::CxxBinary && !target.link_libs.is_empty() {
        properties.insert(
            "linker_flags".to_string(),
            starlark_list(&target.link_libs),
        );
    }

    MappedTarget {
        name: normalize_name(&target.name),
        rule_kind,
        srcs: transform_sources(&target.sources),
        headers: target.headers.clone(),
        deps: resolve_dependencies(&target.link_libs),
        properties,
        platform_select: None,
    }
}

fn determine_rule_kind(target: &Target) -> RuleKind {
    match target.kind {
        TargetKind::Executable => RuleKind::CxxBinary,
        // Interface libraries become header-only cxx_library rules.
        TargetKind::StaticLib | TargetKind::SharedLib | TargetKind::InterfaceLib => {
            RuleKind::CxxLibrary
        }
        TargetKind::Custom => RuleKind::FileGroup,
        TargetKind::Unknown => RuleKind::Unknown,
    }
}

/// Replace everything outside `[A-Za-z0-9_-]` with `_`; names may not
/// start with a digit. Idempotent.
pub fn normalize_name(name: &str) -> String {
    let mut normalized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if normalized.starts_with(|c: char| c.is_ascii_digit()) {
        normalized.insert_str(0, "lib_");
    }
    normalized
}

/// Drop sources still carrying unresolved references or generator
/// expressions; keep the rest verbatim.
fn transform_sources(sources: &[String]) -> Vec<String> {
    sources
        .iter()
        .filter(|s| !s.contains("${") && !s.contains("$<"))
        .cloned()
        .collect()
}

/// `Pkg::component` deps are external CMake-style targets; everything
/// else resolves within the generated package.
fn resolve_dependencies(deps: &[String]) -> Vec<String> {
    deps.iter()
        .map(|dep| {
            if dep.contains("::") {
                format!("//{}", dep.replace(':', "_"))
            } else {
                format!(":{}", normalize_name(dep))
            }
        })
        .collect()
}

/// Serialize to a single-line Starlark list literal.
pub fn starlark_list(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("\"{}\"", item)).collect();
    format!("[{}]", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Target, TargetKind};

    #[test]
    fn test_kind_mapping() {
        let cases = [
            (TargetKind::StaticLib, RuleKind::CxxLibrary),
            (TargetKind::SharedLib, RuleKind::CxxLibrary),
            (TargetKind::InterfaceLib, RuleKind::CxxLibrary),
            (TargetKind::Executable, RuleKind::CxxBinary),
            (TargetKind::Custom, RuleKind::FileGroup),
            (TargetKind::Unknown, RuleKind::Unknown),
        ];
        for (kind, expected) in cases {
            let mapped = map_target(&Target::new("t", kind));
            assert_eq!(mapped.rule_kind, expected, "{:?}", kind);
        }
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("my.target"), "my_target");
        assert_eq!(normalize_name("a b+c"), "a_b_c");
        assert_eq!(normalize_name("7zip"), "lib_7zip");
        assert_eq!(normalize_name("fine-name_2"), "fine-name_2");
    }

    #[test]
    fn test_normalize_name_idempotent() {
        for name in ["my.target", "7zip", "x::y", "ok"] {
            let once = normalize_name(name);
            assert_eq!(normalize_name(&once), once);
        }
    }

    #[test]
    fn test_sources_drop_unresolved() {
        let mut target = Target::new("t", TargetKind::StaticLib);
        target.sources = vec![
            "a.cpp".into(),
            "${GEN_DIR}/gen.cpp".into(),
            "$<TARGET_OBJECTS:core>".into(),
            "b.cpp".into(),
        ];
        let mapped = map_target(&target);
        assert_eq!(mapped.srcs, vec!["a.cpp", "b.cpp"]);
    }

    #[test]
    fn test_dependency_resolution() {
        let mut target = Target::new("app", TargetKind::Executable);
        target.link_libs = vec!["fmt::fmt".into(), "core".into(), "my.lib".into()];
        let mapped = map_target(&target);
        assert_eq!(mapped.deps, vec!["//fmt__fmt", ":core", ":my_lib"]);
    }

    #[test]
    fn test_properties_serialized_as_lists() {
        let mut target = Target::new("lib", TargetKind::StaticLib);
        target.compile_defs = vec!["FOO=1".into(), "BAR".into()];
        target.include_dirs = vec!["include".into()];
        target.compile_opts = vec!["-O2".into()];
        let mapped = map_target(&target);
        assert_eq!(
            mapped.properties["preprocessor_flags"],
            "[\"FOO=1\", \"BAR\"]"
        );
        assert_eq!(mapped.properties["exported_headers"], "[\"include\"]");
        assert_eq!(mapped.properties["compiler_flags"], "[\"-O2\"]");
        // Libraries do not get linker_flags.
        assert!(!mapped.properties.contains_key("linker_flags"));
    }

    #[test]
    fn test_binary_linker_flags() {
        let mut target = Target::new("app", TargetKind::Executable);
        target.link_libs = vec!["m".into()];
        let mapped = map_target(&target);
        assert_eq!(mapped.properties["linker_flags"], "[\"m\"]");
    }
}
