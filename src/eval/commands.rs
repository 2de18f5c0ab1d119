//! Recognized command handlers
//!
//! Dispatch matches on the command name. Unrecognized commands evaluate
//! to an empty string with Unknown confidence — preservation is
//! preferred over errors, since most CMake commands have no bearing on
//! target discovery.

use super::{value_helpers, Confidence, EvaluatedValue, Evaluator, Value};
use crate::analysis::{Target, TargetKind};
use crate::ast::Node;
use crate::error::{AnalysisCategory, AnalysisError, Result};
use crate::source::SourceLocation;
use log::trace;

/// Visibility keywords skipped when collecting target property values.
fn is_visibility_keyword(s: &str) -> bool {
    matches!(s, "PUBLIC" | "PRIVATE" | "INTERFACE")
}

impl Evaluator {
    pub(crate) fn eval_command(
        &mut self,
        name: &str,
        args: &[Node],
        location: &SourceLocation,
    ) -> Result<EvaluatedValue> {
        match name {
            "set" => self.cmd_set(args, location),
            "unset" => self.cmd_unset(args),
            "list" => self.cmd_list(args),
            "cmake_minimum_required" => self.cmd_cmake_minimum_required(args, location),
            "project" => self.cmd_project(args, location),
            "option" => self.cmd_option(args, location),
            "add_library" => self.cmd_add_library(args, location),
            "add_executable" => self.cmd_add_executable(args, location),
            "add_custom_target" => self.cmd_add_custom_target(args, location),
            "target_include_directories" => {
                self.cmd_target_append(args, location, |t| &mut t.include_dirs)
            }
            "target_link_libraries" => {
                self.cmd_target_append(args, location, |t| &mut t.link_libs)
            }
            "target_compile_definitions" => {
                self.cmd_target_append(args, location, |t| &mut t.compile_defs)
            }
            "target_compile_options" => {
                self.cmd_target_append(args, location, |t| &mut t.compile_opts)
            }
            "target_sources" => self.cmd_target_append(args, location, |t| &mut t.sources),
            "message" => Ok(EvaluatedValue::certain("")),
            "include" => {
                trace!("include() left to discovery: included files are parsed on their own");
                Ok(EvaluatedValue::certain(""))
            }
            "find_package" => {
                if let Some(pkg) = args.first().and_then(crate::parser::node_string) {
                    self.warn(format!(
                        "{}: find_package({}) is not resolved; map the dependency manually",
                        location, pkg
                    ));
                }
                Ok(EvaluatedValue::unknown(""))
            }
            _ => {
                // Unknown command: no error, nothing learned.
                trace!("command '{}' not evaluated", name);
                Ok(EvaluatedValue::unknown(""))
            }
        }
    }

    // set / unset / list ---------------------------------------------------

    fn cmd_set(&mut self, args: &[Node], location: &SourceLocation) -> Result<EvaluatedValue> {
        if args.is_empty() {
            return Err(AnalysisError::invalid("set() requires a variable name")
                .at(location.clone())
                .into());
        }

        let name_value = self.eval(&args[0])?;
        if !name_value.is_certain() {
            return Err(AnalysisError::new(
                AnalysisCategory::UndefinedVariable,
                "cannot determine variable name in set()",
            )
            .at(location.clone())
            .into());
        }
        let var_name = value_helpers::to_string(&name_value.value);

        let mut values = &args[1..];

        // set(X) unsets.
        if values.is_empty() {
            self.context_mut().unset_variable(&var_name);
            return Ok(EvaluatedValue::certain(""));
        }

        // PARENT_SCOPE is detected but not implemented: the value lands
        // in the current scope so later reads in this file still see it.
        if let Some(last) = values.last() {
            if crate::parser::node_string(last).as_deref() == Some("PARENT_SCOPE") {
                self.warn(format!(
                    "{}: set({} ... PARENT_SCOPE) is not supported; value stored in current scope",
                    location, var_name
                ));
                values = &values[..values.len() - 1];
            }
        }

        // set(X value CACHE TYPE "doc" [FORCE]) stores a cache entry.
        if let Some(cache_pos) = values
            .iter()
            .position(|a| crate::parser::node_string(a).as_deref() == Some("CACHE"))
        {
            let cache_values = &values[..cache_pos];
            let (value, confidence) = self.eval_value_list(cache_values)?;
            self.context_mut().set_cache_variable(
                var_name,
                value,
                confidence.min(Confidence::Uncertain),
            );
            return Ok(EvaluatedValue::certain(""));
        }

        let (value, confidence) = self.eval_value_list(values)?;
        self.context_mut().set_variable(var_name, value, confidence);
        Ok(EvaluatedValue::certain(""))
    }

    /// One value stays scalar; several become a list. The stored
    /// confidence is the minimum over the elements.
    fn eval_value_list(&mut self, values: &[Node]) -> Result<(Value, Confidence)> {
        if values.len() == 1 {
            let value = self.eval(&values[0])?;
            return Ok((value.value, value.confidence));
        }
        let mut items = Vec::with_capacity(values.len());
        let mut confidence = Confidence::Certain;
        for node in values {
            match self.eval(node) {
                Ok(value) => {
                    confidence = confidence.min(value.confidence);
                    items.push(value_helpers::to_string(&value.value));
                }
                Err(_) => {
                    confidence = Confidence::Unknown;
                    items.push(crate::parser::node_text(node));
                }
            }
        }
        Ok((Value::List(items), confidence))
    }

    fn cmd_unset(&mut self, args: &[Node]) -> Result<EvaluatedValue> {
        if let Some(name) = args.first().and_then(crate::parser::node_string) {
            self.context_mut().unset_variable(&name);
        }
        Ok(EvaluatedValue::certain(""))
    }

    /// Only the APPEND form mutates state; other list() operations are
    /// left symbolic.
    fn cmd_list(&mut self, args: &[Node]) -> Result<EvaluatedValue> {
        let operation = args.first().and_then(crate::parser::node_string);
        if operation.as_deref() != Some("APPEND") || args.len() < 2 {
            return Ok(EvaluatedValue::unknown(""));
        }

        let Some(var_name) = crate::parser::node_string(&args[1]) else {
            return Ok(EvaluatedValue::unknown(""));
        };

        let mut items = self
            .context()
            .get_variable(&var_name)
            .map(|v| value_helpers::to_list(&v.value))
            .unwrap_or_default();
        let mut confidence = self
            .context()
            .get_variable(&var_name)
            .map(|v| v.confidence)
            .unwrap_or(Confidence::Certain);

        for node in &args[2..] {
            let value = self.eval(node)?;
            confidence = confidence.min(value.confidence);
            items.extend(value_helpers::to_list(&value.value));
        }
        self.context_mut()
            .set_variable(var_name, Value::List(items), confidence);
        Ok(EvaluatedValue::certain(""))
    }

    // Project metadata -----------------------------------------------------

    fn cmd_cmake_minimum_required(
        &mut self,
        args: &[Node],
        location: &SourceLocation,
    ) -> Result<EvaluatedValue> {
        if args.len() < 2 {
            return Err(AnalysisError::invalid(
                "cmake_minimum_required() requires a VERSION argument",
            )
            .at(location.clone())
            .into());
        }

        let mut version_idx = None;
        for (i, arg) in args.iter().enumerate() {
            if crate::parser::node_string(arg).as_deref() == Some("VERSION") {
                version_idx = Some(i + 1);
                break;
            }
        }

        if let Some(idx) = version_idx {
            if let Some(version_node) = args.get(idx) {
                let version = self.eval(version_node)?;
                self.context_mut().set_variable(
                    "CMAKE_MINIMUM_REQUIRED_VERSION",
                    value_helpers::to_string(&version.value),
                    Confidence::Certain,
                );
            }
        }

        Ok(EvaluatedValue::certain(""))
    }

    fn cmd_project(&mut self, args: &[Node], location: &SourceLocation) -> Result<EvaluatedValue> {
        if args.is_empty() {
            return Err(AnalysisError::invalid("project() requires a name")
                .at(location.clone())
                .into());
        }

        let name = self.eval(&args[0])?;
        let project_name = value_helpers::to_string(&name.value);
        self.context_mut()
            .set_variable("PROJECT_NAME", project_name.clone(), Confidence::Certain);
        self.context_mut()
            .set_variable("CMAKE_PROJECT_NAME", project_name, Confidence::Certain);

        for (i, arg) in args.iter().enumerate() {
            if crate::parser::node_string(arg).as_deref() == Some("VERSION") {
                if let Some(version_node) = args.get(i + 1) {
                    let version = self.eval(version_node)?;
                    self.context_mut().set_variable(
                        "PROJECT_VERSION",
                        value_helpers::to_string(&version.value),
                        Confidence::Certain,
                    );
                }
            }
        }

        Ok(EvaluatedValue::certain(""))
    }

    fn cmd_option(&mut self, args: &[Node], location: &SourceLocation) -> Result<EvaluatedValue> {
        if args.len() < 2 {
            return Err(AnalysisError::invalid(
                "option() requires a name and a description",
            )
            .at(location.clone())
            .into());
        }

        let name = value_helpers::to_string(&self.eval(&args[0])?.value);

        // Default lives after the description string; absent means OFF.
        let mut default_on = false;
        if args.len() >= 3 {
            let value = self.eval(&args[args.len() - 1])?;
            let text = value_helpers::to_string(&value.value);
            default_on = matches!(text.as_str(), "ON" | "TRUE" | "YES" | "1");
        }

        // The user may override at configure time, so never Certain.
        self.context_mut().set_cache_variable(
            name,
            if default_on { "ON" } else { "OFF" },
            Confidence::Uncertain,
        );

        Ok(EvaluatedValue::certain(""))
    }

    // Target creation ------------------------------------------------------

    fn cmd_add_library(
        &mut self,
        args: &[Node],
        location: &SourceLocation,
    ) -> Result<EvaluatedValue> {
        if args.is_empty() {
            return Err(AnalysisError::new(
                AnalysisCategory::UnknownTarget,
                "add_library() requires a target name",
            )
            .at(location.clone())
            .into());
        }

        let name = value_helpers::to_string(&self.eval(&args[0])?.value);
        let mut kind = TargetKind::StaticLib;
        let mut source_start = 1;

        if let Some(type_node) = args.get(1) {
            match crate::parser::node_string(type_node).as_deref() {
                Some("STATIC") => {
                    kind = TargetKind::StaticLib;
                    source_start = 2;
                }
                Some("SHARED") => {
                    kind = TargetKind::SharedLib;
                    source_start = 2;
                }
                Some("INTERFACE") => {
                    kind = TargetKind::InterfaceLib;
                    source_start = 2;
                }
                Some("MODULE") => {
                    kind = TargetKind::SharedLib;
                    source_start = 2;
                }
                // Not a type keyword: it is the first source file.
                _ => {}
            }
        }

        let mut target = Target::new(name.clone(), kind);
        target.source_dir = self.source_dir().to_path_buf();
        for node in &args[source_start..] {
            if let Some(text) = crate::parser::node_string(node) {
                if text == "EXCLUDE_FROM_ALL" {
                    continue;
                }
            }
            let source = self.eval(node)?;
            target.sources.extend(value_helpers::to_list(&source.value));
        }

        trace!("library target '{}' ({:?})", name, kind);
        self.context_mut().add_target(target);
        Ok(EvaluatedValue::certain(""))
    }

    fn cmd_add_executable(
        &mut self,
        args: &[Node],
        location: &SourceLocation,
    ) -> Result<EvaluatedValue> {
        if args.is_empty() {
            return Err(AnalysisError::new(
                AnalysisCategory::UnknownTarget,
                "add_executable() requires a target name",
            )
            .at(location.clone())
            .into());
        }

        let name = value_helpers::to_string(&self.eval(&args[0])?.value);
        let mut target = Target::new(name.clone(), TargetKind::Executable);
        target.source_dir = self.source_dir().to_path_buf();

        for node in &args[1..] {
            if let Some(text) = crate::parser::node_string(node) {
                if matches!(text.as_str(), "WIN32" | "MACOSX_BUNDLE" | "EXCLUDE_FROM_ALL") {
                    continue;
                }
            }
            let source = self.eval(node)?;
            target.sources.extend(value_helpers::to_list(&source.value));
        }

        trace!("executable target '{}'", name);
        self.context_mut().add_target(target);
        Ok(EvaluatedValue::certain(""))
    }

    fn cmd_add_custom_target(
        &mut self,
        args: &[Node],
        location: &SourceLocation,
    ) -> Result<EvaluatedValue> {
        if args.is_empty() {
            return Err(AnalysisError::new(
                AnalysisCategory::UnknownTarget,
                "add_custom_target() requires a target name",
            )
            .at(location.clone())
            .into());
        }

        let name = value_helpers::to_string(&self.eval(&args[0])?.value);
        let mut target = Target::new(name, TargetKind::Custom);
        target.source_dir = self.source_dir().to_path_buf();
        self.context_mut().add_target(target);
        Ok(EvaluatedValue::certain(""))
    }

    // Target property setters ---------------------------------------------

    /// Shared shape of the `target_*` appenders: locate the target, skip
    /// visibility keywords, evaluate and append everything else in order.
    fn cmd_target_append(
        &mut self,
        args: &[Node],
        location: &SourceLocation,
        select: fn(&mut Target) -> &mut Vec<String>,
    ) -> Result<EvaluatedValue> {
        if args.len() < 2 {
            return Err(AnalysisError::invalid(
                "target property command requires a target and values",
            )
            .at(location.clone())
            .into());
        }

        let name = value_helpers::to_string(&self.eval(&args[0])?.value);

        let mut values = Vec::new();
        for node in &args[1..] {
            let value = self.eval(node)?;
            for item in value_helpers::to_list(&value.value) {
                if is_visibility_keyword(&item) || item.is_empty() {
                    continue;
                }
                values.push(item);
            }
        }

        match self.context_mut().target_mut(&name) {
            Some(target) => {
                select(target).extend(values);
                Ok(EvaluatedValue::certain(""))
            }
            None => {
                self.warn(format!(
                    "{}: target '{}' is not defined in this file",
                    location, name
                ));
                Ok(EvaluatedValue::unknown(""))
            }
        }
    }

    fn source_dir(&self) -> &std::path::Path {
        &self.source_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::Evaluator;
    use crate::parser::Parser;

    fn analyze(source: &str) -> crate::analysis::ProjectAnalysis {
        let outcome = Parser::new(source, "CMakeLists.txt").parse_file();
        assert!(outcome.is_clean(), "parse errors: {:?}", outcome.errors);
        Evaluator::new().analyze_file(&outcome.file)
    }

    #[test]
    fn test_simple_library_scenario() {
        let analysis = analyze(
            "cmake_minimum_required(VERSION 3.20)\n\
             project(simple-library VERSION 1.0.0)\n\
             add_library(calculator STATIC src/calculator.cpp)\n\
             target_include_directories(calculator PUBLIC include)\n",
        );

        assert_eq!(analysis.project_name, "simple-library");
        assert_eq!(analysis.project_version, "1.0.0");
        assert_eq!(analysis.targets.len(), 1);

        let target = &analysis.targets[0];
        assert_eq!(target.name, "calculator");
        assert_eq!(target.kind, TargetKind::StaticLib);
        assert_eq!(target.sources, vec!["src/calculator.cpp"]);
        assert_eq!(target.include_dirs, vec!["include"]);
    }

    #[test]
    fn test_minimum_required_version_spelling() {
        let analysis = analyze("cmake_minimum_required(VERSION 3.20)\n");
        assert_eq!(
            analysis.global_vars["CMAKE_MINIMUM_REQUIRED_VERSION"],
            "3.20"
        );
    }

    #[test]
    fn test_option_sets_cache_only() {
        let analysis = analyze("option(ENABLE_TESTS \"Enable testing\" ON)\n");
        assert_eq!(analysis.cache_vars["ENABLE_TESTS"], "ON");
        assert!(!analysis.global_vars.contains_key("ENABLE_TESTS"));
    }

    #[test]
    fn test_option_defaults_off() {
        let analysis = analyze("option(ENABLE_LTO \"Link-time optimization\")\n");
        assert_eq!(analysis.cache_vars["ENABLE_LTO"], "OFF");
    }

    #[test]
    fn test_shared_and_interface_libraries() {
        let analysis = analyze(
            "add_library(a SHARED a.cpp)\nadd_library(b INTERFACE)\nadd_library(c c.cpp)\n",
        );
        assert_eq!(analysis.targets[0].kind, TargetKind::SharedLib);
        assert_eq!(analysis.targets[1].kind, TargetKind::InterfaceLib);
        // No type keyword: first argument after the name is a source.
        assert_eq!(analysis.targets[2].kind, TargetKind::StaticLib);
        assert_eq!(analysis.targets[2].sources, vec!["c.cpp"]);
    }

    #[test]
    fn test_property_setters_are_order_sensitive() {
        let analysis = analyze(
            "add_executable(app main.cpp)\n\
             target_link_libraries(app PRIVATE a)\n\
             target_link_libraries(app PRIVATE b)\n",
        );
        assert_eq!(analysis.targets[0].link_libs, vec!["a", "b"]);
    }

    #[test]
    fn test_visibility_keywords_skipped() {
        let analysis = analyze(
            "add_library(lib x.cpp)\n\
             target_compile_definitions(lib PUBLIC FOO=1 PRIVATE BAR=2 INTERFACE BAZ=3)\n",
        );
        assert_eq!(
            analysis.targets[0].compile_defs,
            vec!["FOO=1", "BAR=2", "BAZ=3"]
        );
    }

    #[test]
    fn test_unknown_target_warns() {
        let analysis = analyze("target_link_libraries(ghost PRIVATE x)\n");
        assert!(analysis
            .warnings
            .iter()
            .any(|w| w.contains("'ghost'")));
    }

    #[test]
    fn test_set_cache_form() {
        let analysis = analyze("set(MY_PATH /opt/thing CACHE PATH \"where\")\n");
        assert_eq!(analysis.cache_vars["MY_PATH"], "/opt/thing");
        assert!(!analysis.global_vars.contains_key("MY_PATH"));
    }

    #[test]
    fn test_set_unsets_without_value() {
        let analysis = analyze("set(X 1)\nset(X)\n");
        assert!(!analysis.global_vars.contains_key("X"));
    }

    #[test]
    fn test_list_append() {
        let analysis = analyze("set(SRCS a.cpp)\nlist(APPEND SRCS b.cpp c.cpp)\n");
        assert_eq!(analysis.global_vars["SRCS"], "a.cpp;b.cpp;c.cpp");
    }

    #[test]
    fn test_sources_with_variables() {
        let analysis = analyze(
            "set(CORE_SRC core.cpp)\nadd_library(core STATIC ${CORE_SRC} util.cpp)\n",
        );
        assert_eq!(analysis.targets[0].sources, vec!["core.cpp", "util.cpp"]);
    }

    #[test]
    fn test_find_package_warns() {
        let analysis = analyze("find_package(Boost REQUIRED)\n");
        assert!(analysis.warnings.iter().any(|w| w.contains("Boost")));
    }

    #[test]
    fn test_project_without_version() {
        let analysis = analyze("project(bare)\n");
        assert_eq!(analysis.project_name, "bare");
        assert_eq!(analysis.project_version, "");
    }
}
