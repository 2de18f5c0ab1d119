// Production-quality lints
#![warn(
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
// Deny truly dangerous patterns
#![deny(clippy::mem_forget)]
// Allow common patterns in library code
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! # finch — CMake to Buck2 migration
//!
//! finch translates a tree of CMake build descriptions into Buck2's
//! Starlark-based `BUCK` format: point it at a source directory and it
//! writes `BUCK` files plus a top-level `.buckconfig`.
//!
//! ## Pipeline
//!
//! Processing is strictly linear per file:
//!
//! ```text
//! bytes ──► tokens ──► AST ──► targets + variables ──► rules ──► BUCK
//!        lexer     parser   evaluator              mapper    emitter
//! ```
//!
//! - the **lexer** and recursive-descent **parser** produce an immutable
//!   AST with panic-mode error recovery, so one run reports as many
//!   problems as possible;
//! - the **evaluator** walks the AST against a scoped variable
//!   environment; evaluation is *partial* — platform-dependent and
//!   user-provided values keep a confidence level instead of a guess;
//! - the **target mapper** and **emitter** translate the discovered
//!   targets into Starlark rule calls with stable, deterministic
//!   formatting.
//!
//! The driver merges per-file analyses into a single project record
//! before emission so cross-file references resolve.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use finch::parser::Parser;
//! use finch::eval::Evaluator;
//!
//! let outcome = Parser::new(source, "CMakeLists.txt").parse_file();
//! for err in &outcome.errors {
//!     eprintln!("{}", err.render_human());
//! }
//!
//! let analysis = Evaluator::new().analyze_file(&outcome.file);
//! println!("{} targets found", analysis.targets.len());
//! ```
//!
//! ## What is preserved, what is dropped
//!
//! Generator expressions (`$<...>`) are preserved opaquely and never
//! emitted into Buck attributes; unresolved `${...}` references are kept
//! symbolic and surfaced in warnings; function and macro definitions are
//! recognized but never inlined at call sites.

// Core model
pub mod analysis;
pub mod ast;
pub mod error;
pub mod source;

// Pipeline stages
pub mod eval;
pub mod generator;
pub mod lexer;
pub mod parser;

// Driver and collaborators
pub mod config;
pub mod pipeline;
pub mod progress;

// Re-exports
pub use analysis::{ProjectAnalysis, Target, TargetKind};
pub use ast::{IStr, Interner, Node};
pub use config::FinchConfig;
pub use error::{
    AnalysisError, ConfigError, Error, GenerationError, IoError, ParseError, Result,
};
pub use eval::{Confidence, EvaluatedValue, EvaluationContext, Evaluator, Value};
pub use generator::{map_target, Generator, GeneratorConfig, MappedTarget, RuleKind};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{ParseOutcome, Parser};
pub use pipeline::{discover_cmake_files, MigrationPipeline, MigrationSummary, PipelineConfig};
pub use progress::{ConsoleReporter, JsonReporter, NullReporter, Phase, ProgressReporter};
pub use source::{SourceBuffer, SourceLocation, SourceRange};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
