//! Parser integration tests: statement shapes, error recovery,
//! pretty-print round-trips

use finch::ast::Node;
use finch::parser::{ParseOutcome, Parser};

fn parse(source: &str) -> ParseOutcome {
    Parser::new(source, "test.cmake").parse_file()
}

fn statements(outcome: &ParseOutcome) -> &[Node] {
    match &outcome.file {
        Node::File { statements, .. } => statements,
        other => panic!("expected File, got {:?}", other),
    }
}

#[test]
fn clean_file_has_no_error_nodes() {
    let outcome = parse(
        "cmake_minimum_required(VERSION 3.20)\n\
         project(demo VERSION 1.0.0)\n\
         add_library(calculator STATIC src/calculator.cpp)\n\
         target_include_directories(calculator PUBLIC include)\n",
    );
    assert!(outcome.is_clean());
    assert_eq!(outcome.file.error_count(), 0);
    assert_eq!(statements(&outcome).len(), 4);
}

#[test]
fn error_recovery_keeps_later_statements() {
    // Missing ')' on the first statement; the rest must still parse.
    let outcome = parse(
        "add_library(broken STATIC a.cpp\n\
         project(still-here)\n\
         add_executable(app main.cpp)\n",
    );

    assert!(!outcome.is_clean());
    assert!(outcome.errors.len() >= 1);
    assert!(outcome.errors.len() < 10, "errors must stay finite");

    let names: Vec<String> = statements(&outcome)
        .iter()
        .filter_map(|s| match s {
            Node::CommandCall { name, .. } => Some(name.to_string()),
            _ => None,
        })
        .collect();
    assert!(names.contains(&"project".to_string()));
    assert!(names.contains(&"add_executable".to_string()));
}

#[test]
fn error_nodes_match_reported_errors() {
    let outcome = parse("set(A 1\nset(B 2\nset(C 3)\n");
    assert_eq!(outcome.file.error_count(), outcome.errors.len());
    assert!(outcome.errors.len() >= 2);
}

#[test]
fn errors_carry_locations() {
    let outcome = parse("set(X 1)\n\nset(Y 2\nproject(p)\n");
    assert!(!outcome.is_clean());
    let loc = outcome.errors[0].location().expect("location");
    assert_eq!(loc.file, "test.cmake");
    assert!(loc.line >= 3, "error should point at the defect site");
}

#[test]
fn nested_blocks_parse() {
    let outcome = parse(
        "if(A)\n\
           foreach(x IN ITEMS 1 2 3)\n\
             if(B)\n\
               set(Y ${x})\n\
             endif()\n\
           endforeach()\n\
         endif()\n",
    );
    assert!(outcome.is_clean(), "errors: {:?}", outcome.errors);
    let stmts = statements(&outcome);
    assert_eq!(stmts.len(), 1);
}

#[test]
fn pretty_print_reparses_to_equal_ast() {
    let source = "cmake_minimum_required(VERSION 3.20)\n\
                  project(demo VERSION 1.0.0)\n\
                  set(SRCS a.cpp b.cpp)\n\
                  if(WIN32)\n\
                      set(PLAT win)\n\
                  elseif(APPLE)\n\
                      set(PLAT mac)\n\
                  else()\n\
                      set(PLAT linux)\n\
                  endif()\n\
                  foreach(s IN LISTS SRCS)\n\
                      message(${s})\n\
                  endforeach()\n\
                  add_library(demo STATIC ${SRCS})\n";

    let first = parse(source);
    assert!(first.is_clean(), "errors: {:?}", first.errors);

    let printed = first.file.pretty_print(0);
    let second = Parser::new(printed.clone(), "test.cmake").parse_file();
    assert!(
        second.is_clean(),
        "pretty-print output failed to parse: {:?}\n{}",
        second.errors,
        printed
    );

    // Statement structure survives the round trip.
    let describe = |outcome: &ParseOutcome| -> Vec<String> {
        statements(outcome)
            .iter()
            .map(|s| s.pretty_print(0))
            .collect()
    };
    assert_eq!(describe(&first), describe(&second));
}

#[test]
fn function_bodies_survive_verbatim() {
    let outcome = parse(
        "function(register_module name)\n\
           add_library(${name} STATIC ${name}.cpp)\n\
           target_include_directories(${name} PUBLIC include)\n\
         endfunction()\n\
         register_module(core)\n",
    );
    assert!(outcome.is_clean(), "errors: {:?}", outcome.errors);
    let stmts = statements(&outcome);
    assert_eq!(stmts.len(), 2);
    match &stmts[0] {
        Node::FunctionDef { body, .. } => assert_eq!(body.len(), 2),
        other => panic!("expected FunctionDef, got {:?}", other),
    }
    // The invocation stays a generic command call (no inlining).
    assert!(matches!(&stmts[1], Node::CommandCall { name, .. } if *name == "register_module"));
}

#[test]
fn generator_expressions_preserved_in_arguments() {
    let outcome = parse(
        "target_link_libraries(app PRIVATE $<$<CONFIG:Debug>:debug_lib>)\n",
    );
    assert!(outcome.is_clean());
    let mut found = false;
    outcome.file.walk(&mut |node| {
        if let Node::GeneratorExpr { text, .. } = node {
            assert_eq!(text, "$<CONFIG:Debug>:debug_lib");
            found = true;
        }
    });
    assert!(found);
}

#[test]
fn comments_do_not_become_statements() {
    let outcome = parse(
        "# leading comment\n\
         project(p) # trailing\n\
         #[[ block\n comment ]]\n\
         set(X 1)\n",
    );
    assert!(outcome.is_clean());
    assert_eq!(statements(&outcome).len(), 2);
}

#[test]
fn deeply_nested_ifs_within_supported_depth() {
    let depth = 40;
    let mut source = String::new();
    for _ in 0..depth {
        source.push_str("if(A)\n");
    }
    source.push_str("set(X 1)\n");
    for _ in 0..depth {
        source.push_str("endif()\n");
    }

    let outcome = parse(&source);
    assert!(outcome.is_clean(), "errors: {:?}", outcome.errors);
}
