//! Evaluator integration tests: platform branching, option defaults,
//! interpolation, determinism

use finch::eval::{value_helpers, Confidence, Evaluator};
use finch::parser::Parser;
use finch::ProjectAnalysis;

fn analyze(source: &str) -> ProjectAnalysis {
    let outcome = Parser::new(source, "CMakeLists.txt").parse_file();
    assert!(outcome.is_clean(), "parse errors: {:?}", outcome.errors);
    Evaluator::new().analyze_file(&outcome.file)
}

fn eval_keep(source: &str) -> Evaluator {
    let outcome = Parser::new(source, "CMakeLists.txt").parse_file();
    assert!(outcome.is_clean(), "parse errors: {:?}", outcome.errors);
    let mut evaluator = Evaluator::new();
    evaluator.eval(&outcome.file).expect("file evaluation");
    evaluator
}

#[test]
fn platform_branching_takes_host_branch() {
    let evaluator = eval_keep(
        "if(WIN32)\n\
           set(LIB_TYPE SHARED)\n\
         else()\n\
           set(LIB_TYPE STATIC)\n\
         endif()\n",
    );

    let lib_type = evaluator
        .context()
        .get_variable("LIB_TYPE")
        .expect("LIB_TYPE");
    assert!(lib_type.is_certain());

    let expected = if cfg!(target_os = "windows") {
        "SHARED"
    } else {
        "STATIC"
    };
    assert_eq!(value_helpers::to_string(&lib_type.value), expected);
}

#[test]
fn option_default_is_cache_only_and_uncertain() {
    let evaluator = eval_keep("option(ENABLE_TESTS \"Enable testing\" ON)\n");

    let cached = evaluator
        .context()
        .get_cache_variable("ENABLE_TESTS")
        .expect("cache entry");
    assert_eq!(value_helpers::to_string(&cached.value), "ON");
    assert_eq!(cached.confidence, Confidence::Uncertain);

    assert!(evaluator.context().get_variable("ENABLE_TESTS").is_none());
}

#[test]
fn interpolation_with_defined_variables() {
    let evaluator = eval_keep(
        "set(PREFIX my)\n\
         set(SUFFIX lib)\n\
         set(LIB_NAME ${PREFIX}_${SUFFIX})\n",
    );
    let value = evaluator.context().get_variable("LIB_NAME").expect("LIB_NAME");
    assert_eq!(value_helpers::to_string(&value.value), "my_lib");
    assert!(value.is_certain());
}

#[test]
fn interpolation_with_undefined_prefix() {
    let evaluator = eval_keep(
        "set(SUFFIX lib)\n\
         set(LIB_NAME ${PREFIX}_${SUFFIX})\n",
    );
    let value = evaluator.context().get_variable("LIB_NAME").expect("LIB_NAME");
    let text = value_helpers::to_string(&value.value);
    assert!(text.contains("${PREFIX}"), "got {:?}", text);
    assert!(value.confidence <= Confidence::Uncertain);
}

#[test]
fn quoted_interpolation_resolves() {
    let evaluator = eval_keep(
        "set(NAME core)\n\
         set(FULL \"lib${NAME}.a\")\n",
    );
    let value = evaluator.context().get_variable("FULL").expect("FULL");
    assert_eq!(value_helpers::to_string(&value.value), "libcore.a");
}

#[test]
fn evaluating_same_file_twice_is_deterministic() {
    let source = "cmake_minimum_required(VERSION 3.16)\n\
                  project(deterministic VERSION 0.2.1)\n\
                  option(WITH_TESTS \"tests\" OFF)\n\
                  set(SRCS a.cpp b.cpp)\n\
                  add_library(core STATIC ${SRCS})\n\
                  target_link_libraries(core PRIVATE fmt::fmt)\n\
                  if(UNIX)\n\
                    target_compile_definitions(core PRIVATE ON_UNIX=1)\n\
                  endif()\n";

    let outcome = Parser::new(source, "CMakeLists.txt").parse_file();
    let a = Evaluator::new().analyze_file(&outcome.file);
    let b = Evaluator::new().analyze_file(&outcome.file);
    assert_eq!(a, b);
}

#[test]
fn property_setters_accumulate_in_order() {
    let analysis = analyze(
        "add_library(x STATIC x.cpp)\n\
         target_link_libraries(x PRIVATE a)\n\
         target_link_libraries(x PRIVATE b)\n\
         target_link_libraries(x PUBLIC c)\n",
    );
    assert_eq!(analysis.targets[0].link_libs, vec!["a", "b", "c"]);
}

#[test]
fn list_variable_expands_into_sources() {
    let analysis = analyze(
        "set(SRCS one.cpp two.cpp)\n\
         add_library(lib STATIC ${SRCS})\n",
    );
    // The list lands as one semicolon-joined source entry or expands;
    // either way both file names must be present.
    let joined = analysis.targets[0].sources.join(";");
    assert!(joined.contains("one.cpp"));
    assert!(joined.contains("two.cpp"));
}

#[test]
fn untaken_platform_branch_leaves_no_trace() {
    let analysis = analyze(
        "if(WIN32)\n\
           add_library(win_only STATIC w.cpp)\n\
         else()\n\
           add_library(posix_only STATIC p.cpp)\n\
         endif()\n",
    );
    assert_eq!(analysis.targets.len(), 1);
    let expected = if cfg!(target_os = "windows") {
        "win_only"
    } else {
        "posix_only"
    };
    assert_eq!(analysis.targets[0].name, expected);
}

#[test]
fn warnings_surface_in_analysis() {
    let analysis = analyze(
        "set(X 1 PARENT_SCOPE)\n\
         while(TRUE)\n\
           set(Y 1)\n\
         endwhile()\n",
    );
    assert!(analysis.warnings.iter().any(|w| w.contains("PARENT_SCOPE")));
    assert!(analysis
        .warnings
        .iter()
        .any(|w| w.contains("while loop not evaluated")));
}

#[test]
fn project_metadata_lands_in_analysis() {
    let analysis = analyze("project(meta-demo VERSION 3.4.5)\n");
    assert_eq!(analysis.project_name, "meta-demo");
    assert_eq!(analysis.project_version, "3.4.5");
    assert_eq!(analysis.global_vars["CMAKE_PROJECT_NAME"], "meta-demo");
}

#[test]
fn merge_across_files_keeps_first_project() {
    let first = analyze("project(root VERSION 1.0)\nadd_library(a STATIC a.cpp)\n");
    let second = analyze("project(sub VERSION 9.9)\nadd_library(b STATIC b.cpp)\n");

    let mut merged = ProjectAnalysis::default();
    merged.merge(first);
    merged.merge(second);

    assert_eq!(merged.project_name, "root");
    assert_eq!(merged.project_version, "1.0");
    assert_eq!(merged.targets.len(), 2);
}
