//! Per-rule-kind Starlark templates
//!
//! Each template renders one rule call with stable attribute order:
//! name, srcs, headers, rule-specific extras, deps, then the serialized
//! properties sorted by key.

use super::mapper::{MappedTarget, RuleKind};
use super::starlark::format_list;
use std::collections::HashMap;

/// Renders one rule kind.
pub trait RuleTemplate {
    fn generate(&self, target: &MappedTarget) -> String;
}

/// `cxx_library`: header glob, PUBLIC visibility and a header namespace
/// named after the target.
pub struct CxxLibraryTemplate;

impl RuleTemplate for CxxLibraryTemplate {
    fn generate(&self, target: &MappedTarget) -> String {
        let mut out = String::from("cxx_library(\n");
        out.push_str(&format!("    name = \"{}\",\n", target.name));

        if !target.srcs.is_empty() {
            out.push_str(&format!(
                "    srcs = {},\n",
                multiline_list(&target.srcs)
            ));
        }

        // The glob is emitted even without explicit headers; CMake
        // targets rarely list them and the glob is the safe superset.
        out.push_str("    headers = glob([\"**/*.h\", \"**/*.hpp\"]),\n");
        out.push_str("    visibility = [\"PUBLIC\"],\n");
        out.push_str(&format!(
            "    header_namespace = \"{}\",\n",
            target.name
        ));

        if !target.deps.is_empty() {
            out.push_str(&format!(
                "    deps = {},\n",
                multiline_list(&target.deps)
            ));
        }

        push_properties(&mut out, target);
        out.push(')');
        out
    }
}

/// `cxx_binary`: explicit headers only when present.
pub struct CxxBinaryTemplate;

impl RuleTemplate for CxxBinaryTemplate {
    fn generate(&self, target: &MappedTarget) -> String {
        let mut out = String::from("cxx_binary(\n");
        out.push_str(&format!("    name = \"{}\",\n", target.name));

        if !target.srcs.is_empty() {
            out.push_str(&format!(
                "    srcs = {},\n",
                multiline_list(&target.srcs)
            ));
        }
        if !target.headers.is_empty() {
            out.push_str(&format!(
                "    headers = {},\n",
                multiline_list(&target.headers)
            ));
        }
        if !target.deps.is_empty() {
            out.push_str(&format!(
                "    deps = {},\n",
                multiline_list(&target.deps)
            ));
        }

        push_properties(&mut out, target);
        out.push(')');
        out
    }
}

pub struct CxxTestTemplate;

impl RuleTemplate for CxxTestTemplate {
    fn generate(&self, target: &MappedTarget) -> String {
        let mut out = String::from("cxx_test(\n");
        out.push_str(&format!("    name = \"{}\",\n", target.name));

        if !target.srcs.is_empty() {
            out.push_str(&format!(
                "    srcs = {},\n",
                format_list(&target.srcs, "    ")
            ));
        }
        if !target.headers.is_empty() {
            out.push_str(&format!(
                "    headers = {},\n",
                format_list(&target.headers, "    ")
            ));
        }
        if !target.deps.is_empty() {
            out.push_str(&format!(
                "    deps = {},\n",
                format_list(&target.deps, "    ")
            ));
        }

        push_properties(&mut out, target);
        out.push(')');
        out
    }
}

/// `filegroup` for custom targets: name plus sources.
pub struct FileGroupTemplate;

impl RuleTemplate for FileGroupTemplate {
    fn generate(&self, target: &MappedTarget) -> String {
        let mut out = String::from("filegroup(\n");
        out.push_str(&format!("    name = \"{}\",\n", target.name));
        out.push_str(&format!(
            "    srcs = {},\n",
            multiline_list(&target.srcs)
        ));
        out.push(')');
        out
    }
}

/// `prebuilt_cxx_library` for imported binaries.
pub struct PrebuiltCxxLibraryTemplate;

impl RuleTemplate for PrebuiltCxxLibraryTemplate {
    fn generate(&self, target: &MappedTarget) -> String {
        let mut out = String::from("prebuilt_cxx_library(\n");
        out.push_str(&format!("    name = \"{}\",\n", target.name));
        if !target.srcs.is_empty() {
            out.push_str(&format!(
                "    static_lib = \"{}\",\n",
                target.srcs[0]
            ));
        }
        out.push_str("    visibility = [\"PUBLIC\"],\n");
        push_properties(&mut out, target);
        out.push(')');
        out
    }
}

/// `http_archive` for fetched packages.
pub struct HttpArchiveTemplate;

impl RuleTemplate for HttpArchiveTemplate {
    fn generate(&self, target: &MappedTarget) -> String {
        let mut out = String::from("http_archive(\n");
        out.push_str(&format!("    name = \"{}\",\n", target.name));
        push_properties(&mut out, target);
        out.push(')');
        out
    }
}

fn multiline_list(items: &[String]) -> String {
    if items.is_empty() {
        return "[]".to_string();
    }
    let mut out = String::from("[\n");
    for item in items {
        out.push_str(&format!("        \"{}\",\n", item));
    }
    out.push_str("    ]");
    out
}

fn push_properties(out: &mut String, target: &MappedTarget) {
    // BTreeMap iteration keeps property order stable.
    for (key, value) in &target.properties {
        out.push_str(&format!("    {} = {},\n", key, value));
    }
}

/// Lookup table from rule kind to its template.
pub struct TemplateRegistry {
    templates: HashMap<RuleKind, Box<dyn RuleTemplate>>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            templates: HashMap::new(),
        };
        registry.register(RuleKind::CxxLibrary, Box::new(CxxLibraryTemplate));
        registry.register(RuleKind::CxxBinary, Box::new(CxxBinaryTemplate));
        registry.register(RuleKind::CxxTest, Box::new(CxxTestTemplate));
        registry.register(RuleKind::FileGroup, Box::new(FileGroupTemplate));
        registry.register(
            RuleKind::PrebuiltCxxLibrary,
            Box::new(PrebuiltCxxLibraryTemplate),
        );
        registry.register(RuleKind::HttpArchive, Box::new(HttpArchiveTemplate));
        registry
    }

    pub fn register(&mut self, kind: RuleKind, template: Box<dyn RuleTemplate>) {
        self.templates.insert(kind, template);
    }

    pub fn get(&self, kind: RuleKind) -> Option<&dyn RuleTemplate> {
        self.templates.get(&kind).map(|t| t.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Target, TargetKind};
    use crate::generator::mapper::map_target;

    fn library_target() -> MappedTarget {
        let mut target = Target::new("calculator", TargetKind::StaticLib);
        target.sources = vec!["src/calculator.cpp".into()];
        map_target(&target)
    }

    #[test]
    fn test_cxx_library_shape() {
        let rendered = CxxLibraryTemplate.generate(&library_target());
        assert!(rendered.starts_with("cxx_library(\n"));
        assert!(rendered.contains("    name = \"calculator\",\n"));
        assert!(rendered.contains("        \"src/calculator.cpp\",\n"));
        assert!(rendered.contains("    headers = glob([\"**/*.h\", \"**/*.hpp\"]),\n"));
        assert!(rendered.contains("    visibility = [\"PUBLIC\"],\n"));
        assert!(rendered.contains("    header_namespace = \"calculator\",\n"));
        assert!(rendered.ends_with(')'));
    }

    #[test]
    fn test_cxx_library_glob_without_headers() {
        // The glob appears even when no headers were discovered.
        let rendered = CxxLibraryTemplate.generate(&library_target());
        assert!(rendered.contains("glob(["));
    }

    #[test]
    fn test_cxx_binary_shape() {
        let mut target = Target::new("app", TargetKind::Executable);
        target.sources = vec!["main.cpp".into()];
        target.link_libs = vec!["core".into()];
        let rendered = CxxBinaryTemplate.generate(&map_target(&target));
        assert!(rendered.starts_with("cxx_binary(\n"));
        assert!(rendered.contains("    deps = [\n        \":core\",\n    ],\n"));
        assert!(rendered.contains("    linker_flags = [\"core\"],\n"));
        assert!(!rendered.contains("visibility"));
    }

    #[test]
    fn test_registry_covers_all_known_kinds() {
        let registry = TemplateRegistry::new();
        for kind in [
            RuleKind::CxxLibrary,
            RuleKind::CxxBinary,
            RuleKind::CxxTest,
            RuleKind::FileGroup,
            RuleKind::PrebuiltCxxLibrary,
            RuleKind::HttpArchive,
        ] {
            assert!(registry.get(kind).is_some(), "{:?}", kind);
        }
        assert!(registry.get(RuleKind::Unknown).is_none());
    }

    #[test]
    fn test_filegroup_shape() {
        let mut target = Target::new("assets", TargetKind::Custom);
        target.sources = vec!["data/a.txt".into()];
        let rendered = FileGroupTemplate.generate(&map_target(&target));
        assert!(rendered.starts_with("filegroup(\n"));
        assert!(rendered.contains("\"data/a.txt\""));
    }
}
