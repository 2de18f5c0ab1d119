//! Error types for finch
//!
//! Five error kinds cover the pipeline stages: parsing, analysis,
//! generation, filesystem I/O, and configuration. Each carries a message,
//! an optional source location, an ordered chain of context notes, and an
//! optional help string, and renders either human-readable
//! (`file:line:col: error: msg` plus `note:`/`help:` lines) or structured
//! (`ERROR:file:line:col:Kind:msg` plus `NOTE:::`/`HELP:::` lines).

use crate::source::SourceLocation;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// finch errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("parse error ({}): {}", .0.category.name(), .0.message)]
    Parse(ParseError),

    #[error("analysis error ({}): {}", .0.category.name(), .0.message)]
    Analysis(AnalysisError),

    #[error("generation error ({}): {}", .0.category.name(), .0.message)]
    Generation(GenerationError),

    #[error("I/O error ({}): {}", .0.category.name(), .0.message)]
    Io(IoError),

    #[error("configuration error ({}): {}", .0.category.name(), .0.message)]
    Config(ConfigError),
}

impl Error {
    /// Kind name for structured output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::Parse(_) => "ParseError",
            Error::Analysis(_) => "AnalysisError",
            Error::Generation(_) => "GenerationError",
            Error::Io(_) => "IOError",
            Error::Config(_) => "ConfigError",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Parse(e) => &e.message,
            Error::Analysis(e) => &e.message,
            Error::Generation(e) => &e.message,
            Error::Io(e) => &e.message,
            Error::Config(e) => &e.message,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Error::Parse(e) => e.location.as_ref(),
            Error::Analysis(e) => e.location.as_ref(),
            Error::Generation(e) => e.location.as_ref(),
            Error::Io(e) => e.location.as_ref(),
            Error::Config(e) => e.location.as_ref(),
        }
    }

    pub fn context(&self) -> &[String] {
        match self {
            Error::Parse(e) => &e.context,
            Error::Analysis(e) => &e.context,
            Error::Generation(e) => &e.context,
            Error::Io(e) => &e.context,
            Error::Config(e) => &e.context,
        }
    }

    pub fn help(&self) -> Option<&str> {
        match self {
            Error::Parse(e) => e.help.as_deref(),
            Error::Analysis(e) => e.help.as_deref(),
            Error::Generation(e) => e.help.as_deref(),
            Error::Io(e) => e.help.as_deref(),
            Error::Config(e) => e.help.as_deref(),
        }
    }

    /// Render as `file:line:col: error: msg` with indented notes and help.
    pub fn render_human(&self) -> String {
        let mut out = String::new();
        if let Some(loc) = self.location() {
            out.push_str(&format!("{}: ", loc));
        }
        out.push_str(&format!("error: {}\n", self));
        for ctx in self.context() {
            out.push_str(&format!("  note: {}\n", ctx));
        }
        if let Some(help) = self.help() {
            out.push_str(&format!("  help: {}\n", help));
        }
        out
    }

    /// Render as `ERROR:file:line:col:Kind:msg` for machine consumption.
    /// An absent location leaves the three location fields empty.
    pub fn render_structured(&self) -> String {
        let mut out = String::from("ERROR:");
        match self.location() {
            Some(loc) => out.push_str(&format!("{}:{}:{}:", loc.file, loc.line, loc.column)),
            None => out.push_str(":::"),
        }
        out.push_str(&format!("{}:{}\n", self.kind_name(), self.message()));
        for ctx in self.context() {
            out.push_str(&format!("NOTE:::{}\n", ctx));
        }
        if let Some(help) = self.help() {
            out.push_str(&format!("HELP:::{}\n", help));
        }
        out
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let category = match err.kind() {
            std::io::ErrorKind::NotFound => IoCategory::FileNotFound,
            std::io::ErrorKind::PermissionDenied => IoCategory::PermissionDenied,
            std::io::ErrorKind::TimedOut => IoCategory::TimeoutError,
            _ => IoCategory::InvalidPath,
        };
        Error::Io(IoError::new(category, err.to_string()))
    }
}

macro_rules! builder_methods {
    ($ty:ident) => {
        impl $ty {
            /// Attach the source location (builder form).
            pub fn at(mut self, location: SourceLocation) -> Self {
                self.location = Some(location);
                self
            }

            /// Append a context note (builder form).
            pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
                self.context.push(ctx.into());
                self
            }

            /// Attach help text (builder form).
            pub fn with_help(mut self, help: impl Into<String>) -> Self {
                self.help = Some(help.into());
                self
            }
        }
    };
}

/// Issues during CMake file parsing
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub category: ParseCategory,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub context: Vec<String>,
    pub help: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseCategory {
    UnexpectedToken,
    UnterminatedString,
    InvalidSyntax,
    UnknownCommand,
    TooManyArguments,
    TooFewArguments,
    InvalidEscape,
    UnbalancedParens,
    UnexpectedEof,
}

impl ParseCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ParseCategory::UnexpectedToken => "unexpected token",
            ParseCategory::UnterminatedString => "unterminated string",
            ParseCategory::InvalidSyntax => "invalid syntax",
            ParseCategory::UnknownCommand => "unknown command",
            ParseCategory::TooManyArguments => "too many arguments",
            ParseCategory::TooFewArguments => "too few arguments",
            ParseCategory::InvalidEscape => "invalid escape sequence",
            ParseCategory::UnbalancedParens => "unbalanced parentheses",
            ParseCategory::UnexpectedEof => "unexpected end of file",
        }
    }
}

impl ParseError {
    pub fn new(category: ParseCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            location: None,
            context: Vec::new(),
            help: None,
        }
    }

    /// Defaults to the InvalidSyntax category.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ParseCategory::InvalidSyntax, message)
    }
}

builder_methods!(ParseError);

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::Parse(err)
    }
}

/// Issues during semantic analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisError {
    pub category: AnalysisCategory,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub context: Vec<String>,
    pub help: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisCategory {
    UnknownTarget,
    CircularDependency,
    MissingDependency,
    InvalidProperty,
    UnsupportedFeature,
    PlatformSpecific,
    TypeMismatch,
    UndefinedVariable,
    InvalidConfiguration,
}

impl AnalysisCategory {
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisCategory::UnknownTarget => "unknown target",
            AnalysisCategory::CircularDependency => "circular dependency",
            AnalysisCategory::MissingDependency => "missing dependency",
            AnalysisCategory::InvalidProperty => "invalid property",
            AnalysisCategory::UnsupportedFeature => "unsupported feature",
            AnalysisCategory::PlatformSpecific => "platform-specific issue",
            AnalysisCategory::TypeMismatch => "type mismatch",
            AnalysisCategory::UndefinedVariable => "undefined variable",
            AnalysisCategory::InvalidConfiguration => "invalid configuration",
        }
    }
}

impl AnalysisError {
    pub fn new(category: AnalysisCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            location: None,
            context: Vec::new(),
            help: None,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(AnalysisCategory::InvalidConfiguration, message)
    }
}

builder_methods!(AnalysisError);

impl From<AnalysisError> for Error {
    fn from(err: AnalysisError) -> Self {
        Error::Analysis(err)
    }
}

/// Issues during Buck2 code generation
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationError {
    pub category: GenerationCategory,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub context: Vec<String>,
    pub help: Option<String>,
    /// Target the failure belongs to, when known.
    pub target: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationCategory {
    UnsupportedTarget,
    InvalidRule,
    MissingTemplate,
    FileWriteError,
    FormattingError,
    InvalidAttribute,
    MissingDependency,
}

impl GenerationCategory {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationCategory::UnsupportedTarget => "unsupported target type",
            GenerationCategory::InvalidRule => "invalid rule",
            GenerationCategory::MissingTemplate => "missing template",
            GenerationCategory::FileWriteError => "file write error",
            GenerationCategory::FormattingError => "formatting error",
            GenerationCategory::InvalidAttribute => "invalid attribute",
            GenerationCategory::MissingDependency => "missing dependency",
        }
    }
}

impl GenerationError {
    pub fn new(category: GenerationCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            location: None,
            context: Vec::new(),
            help: None,
            target: None,
        }
    }

    pub fn for_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

builder_methods!(GenerationError);

impl From<GenerationError> for Error {
    fn from(err: GenerationError) -> Self {
        Error::Generation(err)
    }
}

/// Filesystem and network related errors
#[derive(Debug, Clone, PartialEq)]
pub struct IoError {
    pub category: IoCategory,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub context: Vec<String>,
    pub help: Option<String>,
    /// Offending path, when known.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCategory {
    FileNotFound,
    PermissionDenied,
    NetworkError,
    DiskFull,
    InvalidPath,
    TimeoutError,
}

impl IoCategory {
    pub fn name(&self) -> &'static str {
        match self {
            IoCategory::FileNotFound => "file not found",
            IoCategory::PermissionDenied => "permission denied",
            IoCategory::NetworkError => "network error",
            IoCategory::DiskFull => "disk full",
            IoCategory::InvalidPath => "invalid path",
            IoCategory::TimeoutError => "timeout error",
        }
    }
}

impl IoError {
    pub fn new(category: IoCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            location: None,
            context: Vec::new(),
            help: None,
            path: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

builder_methods!(IoError);

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Error::Io(err)
    }
}

/// Issues with configuration files and settings
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub category: ConfigCategory,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub context: Vec<String>,
    pub help: Option<String>,
    /// Offending option name, when known.
    pub option: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCategory {
    InvalidFormat,
    MissingRequired,
    InvalidValue,
    UnknownOption,
    ConflictingOptions,
    ParseError,
}

impl ConfigCategory {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigCategory::InvalidFormat => "invalid format",
            ConfigCategory::MissingRequired => "missing required option",
            ConfigCategory::InvalidValue => "invalid value",
            ConfigCategory::UnknownOption => "unknown option",
            ConfigCategory::ConflictingOptions => "conflicting options",
            ConfigCategory::ParseError => "parse error",
        }
    }
}

impl ConfigError {
    pub fn new(category: ConfigCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            location: None,
            context: Vec::new(),
            help: None,
            option: None,
        }
    }

    pub fn for_option(mut self, option: impl Into<String>) -> Self {
        self.option = Some(option.into());
        self
    }
}

builder_methods!(ConfigError);

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_rendering_with_location() {
        let err: Error = ParseError::new(ParseCategory::UnexpectedToken, "expected ')'")
            .at(SourceLocation::new("CMakeLists.txt", 3, 14, 40))
            .with_context("while parsing arguments of add_library")
            .with_help("add a closing parenthesis")
            .into();

        let rendered = err.render_human();
        assert!(rendered.starts_with("CMakeLists.txt:3:14: error:"));
        assert!(rendered.contains("  note: while parsing arguments of add_library\n"));
        assert!(rendered.contains("  help: add a closing parenthesis\n"));
    }

    #[test]
    fn test_structured_rendering() {
        let err: Error = AnalysisError::new(AnalysisCategory::UndefinedVariable, "no such var")
            .at(SourceLocation::new("a.cmake", 7, 2, 88))
            .with_context("in set()")
            .into();

        let rendered = err.render_structured();
        assert!(rendered.starts_with("ERROR:a.cmake:7:2:AnalysisError:no such var\n"));
        assert!(rendered.contains("NOTE:::in set()\n"));
    }

    #[test]
    fn test_structured_rendering_without_location() {
        let err: Error = ConfigError::new(ConfigCategory::MissingRequired, "no source dir")
            .for_option("source")
            .into();
        assert!(err
            .render_structured()
            .starts_with("ERROR::::ConfigError:no source dir"));
    }

    #[test]
    fn test_io_error_from_std() {
        let err: Error = std::io::Error::from(std::io::ErrorKind::NotFound).into();
        match err {
            Error::Io(io) => assert_eq!(io.category, IoCategory::FileNotFound),
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_generation_error_target() {
        let err = GenerationError::new(GenerationCategory::MissingTemplate, "no template")
            .for_target("calculator");
        assert_eq!(err.target.as_deref(), Some("calculator"));
    }
}
