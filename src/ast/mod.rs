//! AST types for the CMake language
//!
//! One closed `Node` enum covers literals, references, command calls,
//! control flow, expressions, structure, the CPM package-manager commands,
//! and error-recovery stand-ins. Every node carries a `SourceLocation`;
//! dispatch is by pattern match. Nodes are plain owned data — immutability
//! comes from the evaluator only ever holding `&Node`.

pub mod interner;

pub use interner::{IStr, Interner};

use crate::error::ParseCategory;
use crate::source::SourceLocation;

/// Scope of a variable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    Normal,
    Env,
    Cache,
}

/// Integer-or-float payload of a number literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumberValue {
    Int(i64),
    Float(f64),
}

impl NumberValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            NumberValue::Int(i) => *i as f64,
            NumberValue::Float(f) => *f,
        }
    }
}

/// Loop form of a `foreach`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopKind {
    /// `foreach(v a b c)` or `foreach(v IN a b c)`
    In,
    /// `foreach(v IN LISTS l1 l2)`
    InLists,
    /// `foreach(v IN ITEMS a b c)`
    InItems,
    /// `foreach(a b IN ZIP_LISTS l1 l2)`
    InZipLists,
    /// `foreach(i RANGE 10)`
    Range,
}

/// One `elseif(cond) ...` arm of an if-statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub condition: Box<Node>,
    pub body: Vec<Node>,
    pub location: SourceLocation,
}

/// Where a CPM package comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpmSourceKind {
    GitHub,
    GitUrl,
    Url,
    Local,
}

/// Parsed CPM version requirement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpmVersion {
    pub version: String,
    /// `@X.Y` pins an exact version; `>=X.Y` (and plain versions) do not.
    pub exact: bool,
    /// Set when the string doubles as a git ref (40-hex hash, or contains
    /// `/` or `-`), or came from GIT_TAG.
    pub git_tag: Option<String>,
}

/// `CPMAddPackage(...)`
#[derive(Debug, Clone, PartialEq)]
pub struct CpmAddPackage {
    pub name: String,
    pub source_kind: CpmSourceKind,
    /// `owner/repo`, git URL, archive URL, or local path.
    pub source: String,
    pub version: Option<CpmVersion>,
    pub options: Vec<(String, String)>,
    /// Whether the package falls back to `find_package`.
    pub find_package_fallback: bool,
    pub location: SourceLocation,
}

/// `CPMFindPackage(...)`
#[derive(Debug, Clone, PartialEq)]
pub struct CpmFindPackage {
    pub name: String,
    pub version: Option<String>,
    pub components: Vec<String>,
    pub github: Option<String>,
    pub git_tag: Option<String>,
    pub location: SourceLocation,
}

/// `CPMDeclarePackage(...)`
#[derive(Debug, Clone, PartialEq)]
pub struct CpmDeclarePackage {
    pub name: String,
    pub version: Option<String>,
    pub github: Option<String>,
    pub git: Option<String>,
    pub location: SourceLocation,
}

/// AST node over the closed variant set.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    // Literals
    StringLiteral {
        value: String,
        quoted: bool,
        location: SourceLocation,
    },
    NumberLiteral {
        text: String,
        value: NumberValue,
        location: SourceLocation,
    },
    BooleanLiteral {
        value: bool,
        /// The spelling as written: TRUE/ON/YES/Y or FALSE/OFF/NO/N.
        original: String,
        location: SourceLocation,
    },

    // References
    Identifier {
        name: IStr,
        location: SourceLocation,
    },
    Variable {
        name: IStr,
        scope: VarScope,
        location: SourceLocation,
    },

    // Commands
    CommandCall {
        name: IStr,
        args: Vec<Node>,
        location: SourceLocation,
    },
    FunctionDef {
        name: IStr,
        params: Vec<IStr>,
        body: Vec<Node>,
        location: SourceLocation,
    },
    MacroDef {
        name: IStr,
        params: Vec<IStr>,
        body: Vec<Node>,
        location: SourceLocation,
    },

    // Control flow
    If {
        condition: Box<Node>,
        then_branch: Vec<Node>,
        elseifs: Vec<ElseIf>,
        else_branch: Option<Vec<Node>>,
        location: SourceLocation,
    },
    While {
        condition: Box<Node>,
        body: Vec<Node>,
        location: SourceLocation,
    },
    ForEach {
        vars: Vec<IStr>,
        loop_kind: LoopKind,
        items: Vec<Node>,
        body: Vec<Node>,
        location: SourceLocation,
    },

    // Expressions
    List {
        elements: Vec<Node>,
        /// Separator used when the list prints: empty for adjacency
        /// splits (`pre${X}post`), a space for expression lists.
        separator: String,
        location: SourceLocation,
    },
    GeneratorExpr {
        text: String,
        location: SourceLocation,
    },
    BracketExpr {
        content: Box<Node>,
        quoted: bool,
        location: SourceLocation,
    },
    BinaryOp {
        left: Box<Node>,
        op: IStr,
        right: Box<Node>,
        location: SourceLocation,
    },
    UnaryOp {
        op: IStr,
        operand: Box<Node>,
        location: SourceLocation,
    },
    FunctionCall {
        name: IStr,
        args: Vec<Node>,
        location: SourceLocation,
    },

    // Structure
    Block {
        statements: Vec<Node>,
        location: SourceLocation,
    },
    File {
        path: IStr,
        statements: Vec<Node>,
        /// Hex SHA-256 of the source, for change detection.
        content_hash: Option<String>,
        location: SourceLocation,
    },

    // Package-manager commands
    CpmAddPackage(CpmAddPackage),
    CpmFindPackage(CpmFindPackage),
    CpmUsePackageLock {
        path: String,
        location: SourceLocation,
    },
    CpmDeclarePackage(CpmDeclarePackage),

    // Error recovery
    Error {
        message: String,
        category: ParseCategory,
        location: SourceLocation,
    },
}

impl Node {
    pub fn location(&self) -> &SourceLocation {
        match self {
            Node::StringLiteral { location, .. }
            | Node::NumberLiteral { location, .. }
            | Node::BooleanLiteral { location, .. }
            | Node::Identifier { location, .. }
            | Node::Variable { location, .. }
            | Node::CommandCall { location, .. }
            | Node::FunctionDef { location, .. }
            | Node::MacroDef { location, .. }
            | Node::If { location, .. }
            | Node::While { location, .. }
            | Node::ForEach { location, .. }
            | Node::List { location, .. }
            | Node::GeneratorExpr { location, .. }
            | Node::BracketExpr { location, .. }
            | Node::BinaryOp { location, .. }
            | Node::UnaryOp { location, .. }
            | Node::FunctionCall { location, .. }
            | Node::Block { location, .. }
            | Node::File { location, .. }
            | Node::CpmUsePackageLock { location, .. }
            | Node::Error { location, .. } => location,
            Node::CpmAddPackage(pkg) => &pkg.location,
            Node::CpmFindPackage(pkg) => &pkg.location,
            Node::CpmDeclarePackage(pkg) => &pkg.location,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Node::Error { .. })
    }

    /// Variant name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::StringLiteral { .. } => "StringLiteral",
            Node::NumberLiteral { .. } => "NumberLiteral",
            Node::BooleanLiteral { .. } => "BooleanLiteral",
            Node::Identifier { .. } => "Identifier",
            Node::Variable { .. } => "Variable",
            Node::CommandCall { .. } => "CommandCall",
            Node::FunctionDef { .. } => "FunctionDef",
            Node::MacroDef { .. } => "MacroDef",
            Node::If { .. } => "IfStatement",
            Node::While { .. } => "WhileStatement",
            Node::ForEach { .. } => "ForEachStatement",
            Node::List { .. } => "ListExpression",
            Node::GeneratorExpr { .. } => "GeneratorExpression",
            Node::BracketExpr { .. } => "BracketExpression",
            Node::BinaryOp { .. } => "BinaryOp",
            Node::UnaryOp { .. } => "UnaryOp",
            Node::FunctionCall { .. } => "FunctionCall",
            Node::Block { .. } => "Block",
            Node::File { .. } => "File",
            Node::CpmAddPackage(_) => "CPMAddPackage",
            Node::CpmFindPackage(_) => "CPMFindPackage",
            Node::CpmUsePackageLock { .. } => "CPMUsePackageLock",
            Node::CpmDeclarePackage(_) => "CPMDeclarePackage",
            Node::Error { .. } => "ErrorNode",
        }
    }

    /// Depth-first walk over this node and all descendants.
    pub fn walk(&self, f: &mut impl FnMut(&Node)) {
        f(self);
        match self {
            Node::CommandCall { args, .. } | Node::FunctionCall { args, .. } => {
                for arg in args {
                    arg.walk(f);
                }
            }
            Node::FunctionDef { body, .. } | Node::MacroDef { body, .. } => {
                for stmt in body {
                    stmt.walk(f);
                }
            }
            Node::If {
                condition,
                then_branch,
                elseifs,
                else_branch,
                ..
            } => {
                condition.walk(f);
                for stmt in then_branch {
                    stmt.walk(f);
                }
                for arm in elseifs {
                    arm.condition.walk(f);
                    for stmt in &arm.body {
                        stmt.walk(f);
                    }
                }
                if let Some(else_branch) = else_branch {
                    for stmt in else_branch {
                        stmt.walk(f);
                    }
                }
            }
            Node::While {
                condition, body, ..
            } => {
                condition.walk(f);
                for stmt in body {
                    stmt.walk(f);
                }
            }
            Node::ForEach { items, body, .. } => {
                for item in items {
                    item.walk(f);
                }
                for stmt in body {
                    stmt.walk(f);
                }
            }
            Node::List { elements, .. } => {
                for elem in elements {
                    elem.walk(f);
                }
            }
            Node::BracketExpr { content, .. } => content.walk(f),
            Node::BinaryOp { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Node::UnaryOp { operand, .. } => operand.walk(f),
            Node::Block { statements, .. } | Node::File { statements, .. } => {
                for stmt in statements {
                    stmt.walk(f);
                }
            }
            // Leaves
            Node::StringLiteral { .. }
            | Node::NumberLiteral { .. }
            | Node::BooleanLiteral { .. }
            | Node::Identifier { .. }
            | Node::Variable { .. }
            | Node::GeneratorExpr { .. }
            | Node::CpmAddPackage(_)
            | Node::CpmFindPackage(_)
            | Node::CpmUsePackageLock { .. }
            | Node::CpmDeclarePackage(_)
            | Node::Error { .. } => {}
        }
    }

    /// Number of error-recovery nodes in this subtree.
    pub fn error_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |node| {
            if node.is_error() {
                count += 1;
            }
        });
        count
    }

    /// Render the subtree back to CMake source. Statement nodes end with a
    /// newline; argument nodes render inline.
    pub fn pretty_print(&self, indent: usize) -> String {
        let pad = "    ".repeat(indent);
        match self {
            Node::StringLiteral { value, quoted, .. } => {
                if *quoted {
                    format!("\"{}\"", escape_quoted(value))
                } else {
                    value.clone()
                }
            }
            Node::NumberLiteral { text, .. } => text.clone(),
            Node::BooleanLiteral { original, .. } => original.clone(),
            Node::Identifier { name, .. } => name.to_string(),
            Node::Variable { name, scope, .. } => match scope {
                // ENV{/CACHE{ wrappers already live in the name.
                VarScope::Env | VarScope::Cache => format!("${}", name),
                VarScope::Normal => format!("${{{}}}", name),
            },
            Node::CommandCall { name, args, .. } => {
                format!("{}{}({})", pad, name, join_args(args))
            }
            Node::FunctionDef {
                name, params, body, ..
            } => {
                let mut out = format!("{}function({}", pad, name);
                for param in params {
                    out.push(' ');
                    out.push_str(param);
                }
                out.push_str(")\n");
                out.push_str(&print_body(body, indent + 1));
                out.push_str(&format!("{}endfunction()", pad));
                out
            }
            Node::MacroDef {
                name, params, body, ..
            } => {
                let mut out = format!("{}macro({}", pad, name);
                for param in params {
                    out.push(' ');
                    out.push_str(param);
                }
                out.push_str(")\n");
                out.push_str(&print_body(body, indent + 1));
                out.push_str(&format!("{}endmacro()", pad));
                out
            }
            Node::If {
                condition,
                then_branch,
                elseifs,
                else_branch,
                ..
            } => {
                let mut out = format!("{}if({})\n", pad, condition.pretty_print(0));
                out.push_str(&print_body(then_branch, indent + 1));
                for arm in elseifs {
                    out.push_str(&format!("{}elseif({})\n", pad, arm.condition.pretty_print(0)));
                    out.push_str(&print_body(&arm.body, indent + 1));
                }
                if let Some(else_branch) = else_branch {
                    out.push_str(&format!("{}else()\n", pad));
                    out.push_str(&print_body(else_branch, indent + 1));
                }
                out.push_str(&format!("{}endif()", pad));
                out
            }
            Node::While {
                condition, body, ..
            } => {
                let mut out = format!("{}while({})\n", pad, condition.pretty_print(0));
                out.push_str(&print_body(body, indent + 1));
                out.push_str(&format!("{}endwhile()", pad));
                out
            }
            Node::ForEach {
                vars,
                loop_kind,
                items,
                body,
                ..
            } => {
                let mut head: Vec<String> = vars.iter().map(|v| v.to_string()).collect();
                match loop_kind {
                    LoopKind::In => head.push("IN".into()),
                    LoopKind::InLists => {
                        head.push("IN".into());
                        head.push("LISTS".into());
                    }
                    LoopKind::InItems => {
                        head.push("IN".into());
                        head.push("ITEMS".into());
                    }
                    LoopKind::InZipLists => {
                        head.push("IN".into());
                        head.push("ZIP_LISTS".into());
                    }
                    LoopKind::Range => head.push("RANGE".into()),
                }
                for item in items {
                    head.push(item.pretty_print(0));
                }
                let mut out = format!("{}foreach({})\n", pad, head.join(" "));
                out.push_str(&print_body(body, indent + 1));
                out.push_str(&format!("{}endforeach()", pad));
                out
            }
            Node::List {
                elements,
                separator,
                ..
            } => elements
                .iter()
                .map(|e| e.pretty_print(0))
                .collect::<Vec<_>>()
                .join(separator),
            Node::GeneratorExpr { text, .. } => format!("$<{}>", text),
            Node::BracketExpr { content, .. } => {
                format!("[[{}]]", content.pretty_print(0))
            }
            Node::BinaryOp {
                left, op, right, ..
            } => format!(
                "{} {} {}",
                left.pretty_print(0),
                op,
                right.pretty_print(0)
            ),
            Node::UnaryOp { op, operand, .. } => {
                format!("{} {}", op, operand.pretty_print(0))
            }
            Node::FunctionCall { name, args, .. } => {
                format!("{}({})", name, join_args(args))
            }
            Node::Block { statements, .. } => print_body(statements, indent),
            Node::File { statements, .. } => {
                let mut out = String::new();
                for stmt in statements {
                    out.push_str(&stmt.pretty_print(indent));
                    out.push('\n');
                }
                out
            }
            Node::CpmAddPackage(pkg) => {
                let mut out = format!("{}CPMAddPackage(NAME {}", pad, pkg.name);
                match pkg.source_kind {
                    CpmSourceKind::GitHub => {
                        out.push_str(&format!(" GITHUB_REPOSITORY {}", pkg.source))
                    }
                    CpmSourceKind::GitUrl => {
                        out.push_str(&format!(" GIT_REPOSITORY {}", pkg.source))
                    }
                    CpmSourceKind::Url => out.push_str(&format!(" URL {}", pkg.source)),
                    CpmSourceKind::Local => {
                        out.push_str(&format!(" SOURCE_DIR {}", pkg.source))
                    }
                }
                if let Some(version) = &pkg.version {
                    out.push_str(&format!(" VERSION {}", version.version));
                }
                if !pkg.options.is_empty() {
                    out.push_str(" OPTIONS");
                    for (key, value) in &pkg.options {
                        out.push_str(&format!(" \"{} {}\"", key, value));
                    }
                }
                out.push(')');
                out
            }
            Node::CpmFindPackage(pkg) => {
                let mut out = format!("{}CPMFindPackage(NAME {}", pad, pkg.name);
                if let Some(version) = &pkg.version {
                    out.push_str(&format!(" VERSION {}", version));
                }
                out.push(')');
                out
            }
            Node::CpmUsePackageLock { path, .. } => {
                format!("{}CPMUsePackageLock({})", pad, path)
            }
            Node::CpmDeclarePackage(pkg) => {
                format!("{}CPMDeclarePackage(NAME {})", pad, pkg.name)
            }
            Node::Error { message, .. } => format!("{}# <error: {}>", pad, message),
        }
    }
}

fn join_args(args: &[Node]) -> String {
    args.iter()
        .map(|a| a.pretty_print(0))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_body(body: &[Node], indent: usize) -> String {
    let mut out = String::new();
    for stmt in body {
        out.push_str(&stmt.pretty_print(indent));
        out.push('\n');
    }
    out
}

fn escape_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out
}
