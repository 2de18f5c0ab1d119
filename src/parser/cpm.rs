//! CPM package-manager command parsing
//!
//! Commands whose name starts with `CPM` get first-class AST nodes. Two
//! input shapes exist: the GitHub shorthand
//! (`CPMAddPackage("gh:owner/repo@1.2.3")`) and the keyword-driven form
//! (`NAME`, `VERSION`, `GIT_TAG`, `GITHUB_REPOSITORY`, `GIT_REPOSITORY`,
//! `URL`, `OPTIONS`, `COMPONENTS`).

use super::arguments::node_string;
use crate::ast::{
    CpmAddPackage, CpmDeclarePackage, CpmFindPackage, CpmSourceKind, CpmVersion, Node,
};
use crate::error::{ParseCategory, ParseError, Result};
use crate::source::SourceLocation;
use regex::Regex;
use std::sync::OnceLock;

fn github_shorthand_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:gh:)?([^/@#]+)/([^/@#]+?)(?:([@#])(.+))?$").expect("static regex")
    })
}

/// Keywords that end an OPTIONS block.
fn is_cpm_flag(s: &str) -> bool {
    matches!(
        s,
        "DOWNLOAD_ONLY" | "EXCLUDE_FROM_ALL" | "SYSTEM" | "NO_CACHE" | "FIND_PACKAGE_ARGUMENTS"
    )
}

/// Dispatch a CPM-prefixed command. `None` means the name is not one of
/// the recognized package commands and should stay a generic call.
pub(crate) fn parse_cpm_command(
    name: &str,
    args: &[Node],
    location: SourceLocation,
) -> Option<Result<Node>> {
    match name {
        "CPMAddPackage" => Some(parse_add_package(args, location).map(Node::CpmAddPackage)),
        "CPMFindPackage" => Some(parse_find_package(args, location).map(Node::CpmFindPackage)),
        "CPMUsePackageLock" => Some(parse_use_package_lock(args, location)),
        "CPMDeclarePackage" => {
            Some(parse_declare_package(args, location).map(Node::CpmDeclarePackage))
        }
        _ => None,
    }
}

fn parse_add_package(args: &[Node], location: SourceLocation) -> Result<CpmAddPackage> {
    if args.is_empty() {
        return Err(ParseError::new(
            ParseCategory::TooFewArguments,
            "CPMAddPackage requires arguments",
        )
        .at(location)
        .into());
    }

    // Single-string shorthand
    if args.len() == 1 {
        if let Some(text) = node_string(&args[0]) {
            if github_shorthand_regex().is_match(&text) && text.contains('/') {
                return parse_add_package_shorthand(&text, location);
            }
        }
    }

    parse_add_package_keywords(args, location)
}

fn parse_add_package_shorthand(
    shorthand: &str,
    location: SourceLocation,
) -> Result<CpmAddPackage> {
    let caps = github_shorthand_regex()
        .captures(shorthand)
        .ok_or_else(|| {
            ParseError::syntax(format!("invalid CPM shorthand '{}'", shorthand))
                .at(location.clone())
                .with_help("use the form gh:owner/repo@version")
        })?;

    let owner = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let repo = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let separator = caps.get(3).map(|m| m.as_str());
    let version_str = caps.get(4).map(|m| m.as_str());

    let version = match (separator, version_str) {
        // `@1.2.3` pins the exact release
        (Some("@"), Some(v)) => Some(CpmVersion {
            version: v.to_string(),
            exact: true,
            git_tag: git_ref_tag(v),
        }),
        // `#ref` names a git revision
        (Some("#"), Some(v)) => Some(CpmVersion {
            version: v.to_string(),
            exact: false,
            git_tag: Some(v.to_string()),
        }),
        _ => None,
    };

    Ok(CpmAddPackage {
        name: repo.to_string(),
        source_kind: CpmSourceKind::GitHub,
        source: format!("{}/{}", owner, repo),
        version,
        options: Vec::new(),
        find_package_fallback: false,
        location,
    })
}

fn parse_add_package_keywords(args: &[Node], location: SourceLocation) -> Result<CpmAddPackage> {
    let mut package = CpmAddPackage {
        name: String::new(),
        source_kind: CpmSourceKind::Local,
        source: String::new(),
        version: None,
        options: Vec::new(),
        find_package_fallback: false,
        location: location.clone(),
    };

    let strings: Vec<Option<String>> = args.iter().map(node_string).collect();
    let mut i = 0;

    // A leading non-keyword argument doubles as the name.
    if let Some(Some(first)) = strings.first() {
        if !is_add_package_keyword(first) {
            package.name = first.clone();
            i = 1;
        }
    }

    while i < args.len() {
        let key = match &strings[i] {
            Some(key) => key.clone(),
            None => {
                i += 1;
                continue;
            }
        };

        match key.as_str() {
            "NAME" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.name = value.clone();
                    i += 1;
                }
            }
            "GITHUB_REPOSITORY" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.source_kind = CpmSourceKind::GitHub;
                    package.source = value.clone();
                    i += 1;
                }
            }
            "GIT_REPOSITORY" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.source_kind = CpmSourceKind::GitUrl;
                    package.source = value.clone();
                    i += 1;
                }
            }
            "URL" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.source_kind = CpmSourceKind::Url;
                    package.source = value.clone();
                    i += 1;
                }
            }
            "SOURCE_DIR" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.source_kind = CpmSourceKind::Local;
                    package.source = value.clone();
                    i += 1;
                }
            }
            "VERSION" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.version = Some(parse_version_string(value));
                    i += 1;
                }
            }
            "GIT_TAG" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    let mut version = package.version.take().unwrap_or_default();
                    if version.version.is_empty() {
                        version.version = value.clone();
                    }
                    version.git_tag = Some(value.clone());
                    package.version = Some(version);
                    i += 1;
                }
            }
            "OPTIONS" => {
                let consumed = parse_options_block(&strings[i + 1..], &mut package);
                i += consumed;
            }
            "FIND_PACKAGE_ARGUMENTS" => {
                package.find_package_fallback = true;
            }
            _ => {}
        }
        i += 1;
    }

    if package.name.is_empty() {
        return Err(ParseError::new(
            ParseCategory::TooFewArguments,
            "CPMAddPackage requires NAME",
        )
        .at(location)
        .into());
    }

    Ok(package)
}

fn is_add_package_keyword(s: &str) -> bool {
    matches!(
        s,
        "NAME"
            | "VERSION"
            | "GIT_TAG"
            | "GITHUB_REPOSITORY"
            | "GIT_REPOSITORY"
            | "URL"
            | "SOURCE_DIR"
            | "OPTIONS"
    ) || is_cpm_flag(s)
}

/// OPTIONS entries are `"KEY VALUE"` strings (optionally `"KEY:TYPE
/// VALUE"`) or consecutive key/value arguments. Returns how many
/// arguments were consumed.
fn parse_options_block(entries: &[Option<String>], package: &mut CpmAddPackage) -> usize {
    let mut consumed = 0;
    let mut i = 0;
    while i < entries.len() {
        let entry = match &entries[i] {
            Some(entry) if !is_add_package_keyword(entry) => entry.clone(),
            _ => break,
        };

        if let Some(space) = entry.find(' ') {
            let mut key = entry[..space].to_string();
            let value = entry[space + 1..].to_string();
            if let Some(colon) = key.find(':') {
                key.truncate(colon);
            }
            package.options.push((key, value));
            consumed = i + 1;
            i += 1;
        } else if let Some(Some(value)) = entries.get(i + 1) {
            package.options.push((entry, value.clone()));
            consumed = i + 2;
            i += 2;
        } else {
            consumed = i + 1;
            break;
        }
    }
    consumed
}

fn parse_find_package(args: &[Node], location: SourceLocation) -> Result<CpmFindPackage> {
    if args.is_empty() {
        return Err(ParseError::new(
            ParseCategory::TooFewArguments,
            "CPMFindPackage requires arguments",
        )
        .at(location)
        .into());
    }

    let strings: Vec<Option<String>> = args.iter().map(node_string).collect();
    let mut package = CpmFindPackage {
        name: String::new(),
        version: None,
        components: Vec::new(),
        github: None,
        git_tag: None,
        location: location.clone(),
    };

    let mut i = 0;
    if let Some(Some(first)) = strings.first() {
        if first != "NAME" {
            package.name = first.clone();
            i = 1;
        }
    }

    while i < args.len() {
        let key = match &strings[i] {
            Some(key) => key.clone(),
            None => {
                i += 1;
                continue;
            }
        };

        match key.as_str() {
            "NAME" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.name = value.clone();
                    i += 1;
                }
            }
            "VERSION" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.version = Some(value.clone());
                    i += 1;
                }
            }
            "GITHUB_REPOSITORY" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.github = Some(value.clone());
                    i += 1;
                }
            }
            "GIT_TAG" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.git_tag = Some(value.clone());
                    i += 1;
                }
            }
            "COMPONENTS" => {
                while let Some(Some(comp)) = strings.get(i + 1) {
                    if matches!(comp.as_str(), "REQUIRED" | "QUIET" | "OPTIONAL") {
                        break;
                    }
                    package.components.push(comp.clone());
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    if package.name.is_empty() {
        return Err(ParseError::new(
            ParseCategory::TooFewArguments,
            "CPMFindPackage requires a package name",
        )
        .at(location)
        .into());
    }

    Ok(package)
}

fn parse_use_package_lock(args: &[Node], location: SourceLocation) -> Result<Node> {
    let path = args.first().and_then(node_string).unwrap_or_default();
    if path.is_empty() {
        return Err(ParseError::new(
            ParseCategory::TooFewArguments,
            "CPMUsePackageLock requires a file path",
        )
        .at(location)
        .into());
    }
    Ok(Node::CpmUsePackageLock { path, location })
}

fn parse_declare_package(args: &[Node], location: SourceLocation) -> Result<CpmDeclarePackage> {
    let strings: Vec<Option<String>> = args.iter().map(node_string).collect();
    let mut package = CpmDeclarePackage {
        name: String::new(),
        version: None,
        github: None,
        git: None,
        location: location.clone(),
    };

    let mut i = 0;
    while i < args.len() {
        let key = match &strings[i] {
            Some(key) => key.clone(),
            None => {
                i += 1;
                continue;
            }
        };

        match key.as_str() {
            "NAME" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.name = value.clone();
                    i += 1;
                }
            }
            "VERSION" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.version = Some(value.clone());
                    i += 1;
                }
            }
            "GITHUB_REPOSITORY" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.github = Some(value.clone());
                    i += 1;
                }
            }
            "GIT_REPOSITORY" => {
                if let Some(Some(value)) = strings.get(i + 1) {
                    package.git = Some(value.clone());
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }

    if package.name.is_empty() {
        return Err(ParseError::new(
            ParseCategory::TooFewArguments,
            "CPMDeclarePackage requires NAME",
        )
        .at(location)
        .into());
    }

    Ok(package)
}

/// `@X.Y` pins an exact version, `>=X.Y` a minimum; anything that looks
/// like a git ref doubles as `git_tag`.
fn parse_version_string(version_str: &str) -> CpmVersion {
    if let Some(rest) = version_str.strip_prefix('@') {
        return CpmVersion {
            version: rest.to_string(),
            exact: true,
            git_tag: None,
        };
    }
    if let Some(rest) = version_str.strip_prefix(">=") {
        return CpmVersion {
            version: rest.to_string(),
            exact: false,
            git_tag: None,
        };
    }
    CpmVersion {
        version: version_str.to_string(),
        exact: false,
        git_tag: git_ref_tag(version_str),
    }
}

/// A 40-hex string or one containing `/` or `-` reads as a git ref.
fn git_ref_tag(s: &str) -> Option<String> {
    let is_sha = s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit());
    if is_sha || s.contains('/') || s.contains('-') {
        Some(s.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn parse_single(source: &str) -> Node {
        let outcome = Parser::new(source, "t.cmake").parse_file();
        assert!(outcome.is_clean(), "errors: {:?}", outcome.errors);
        match outcome.file {
            Node::File { mut statements, .. } => statements.remove(0),
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_shorthand_with_version() {
        match parse_single("CPMAddPackage(\"gh:fmtlib/fmt@10.0.0\")") {
            Node::CpmAddPackage(pkg) => {
                assert_eq!(pkg.name, "fmt");
                assert_eq!(pkg.source_kind, CpmSourceKind::GitHub);
                assert_eq!(pkg.source, "fmtlib/fmt");
                let version = pkg.version.expect("version");
                assert_eq!(version.version, "10.0.0");
                assert!(version.exact);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_shorthand_without_prefix() {
        match parse_single("CPMAddPackage(\"nlohmann/json\")") {
            Node::CpmAddPackage(pkg) => {
                assert_eq!(pkg.name, "json");
                assert_eq!(pkg.source, "nlohmann/json");
                assert!(pkg.version.is_none());
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_shorthand_git_ref() {
        match parse_single("CPMAddPackage(\"gh:catchorg/Catch2#devel\")") {
            Node::CpmAddPackage(pkg) => {
                let version = pkg.version.expect("version");
                assert!(!version.exact);
                assert_eq!(version.git_tag.as_deref(), Some("devel"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_keyword_form() {
        let source = "CPMAddPackage(NAME spdlog VERSION 1.12.0 GITHUB_REPOSITORY gabime/spdlog)";
        match parse_single(source) {
            Node::CpmAddPackage(pkg) => {
                assert_eq!(pkg.name, "spdlog");
                assert_eq!(pkg.source_kind, CpmSourceKind::GitHub);
                assert_eq!(pkg.source, "gabime/spdlog");
                assert_eq!(pkg.version.expect("version").version, "1.12.0");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_git_tag_becomes_version_ref() {
        let source = "CPMAddPackage(NAME lib GIT_REPOSITORY https://example.com/lib.git GIT_TAG v1.2.3-rc1)";
        match parse_single(source) {
            Node::CpmAddPackage(pkg) => {
                assert_eq!(pkg.source_kind, CpmSourceKind::GitUrl);
                let version = pkg.version.expect("version");
                assert_eq!(version.git_tag.as_deref(), Some("v1.2.3-rc1"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_sha_version_is_git_ref() {
        let sha = "0123456789abcdef0123456789abcdef01234567";
        let version = parse_version_string(sha);
        assert_eq!(version.git_tag.as_deref(), Some(sha));
    }

    #[test]
    fn test_minimum_version() {
        let version = parse_version_string(">=3.11");
        assert_eq!(version.version, "3.11");
        assert!(!version.exact);
        assert!(version.git_tag.is_none());
    }

    #[test]
    fn test_options_single_string() {
        let source = "CPMAddPackage(NAME json OPTIONS \"JSON_BuildTests OFF\" \"JSON_Install ON\")";
        match parse_single(source) {
            Node::CpmAddPackage(pkg) => {
                assert_eq!(
                    pkg.options,
                    vec![
                        ("JSON_BuildTests".to_string(), "OFF".to_string()),
                        ("JSON_Install".to_string(), "ON".to_string()),
                    ]
                );
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_options_typed_key() {
        let source = "CPMAddPackage(NAME z OPTIONS \"BUILD_SHARED:BOOL OFF\")";
        match parse_single(source) {
            Node::CpmAddPackage(pkg) => {
                assert_eq!(
                    pkg.options,
                    vec![("BUILD_SHARED".to_string(), "OFF".to_string())]
                );
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_find_package_with_components() {
        let source = "CPMFindPackage(NAME Boost VERSION 1.80 COMPONENTS system filesystem)";
        match parse_single(source) {
            Node::CpmFindPackage(pkg) => {
                assert_eq!(pkg.name, "Boost");
                assert_eq!(pkg.version.as_deref(), Some("1.80"));
                assert_eq!(pkg.components, vec!["system", "filesystem"]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_use_package_lock() {
        match parse_single("CPMUsePackageLock(package-lock.cmake)") {
            Node::CpmUsePackageLock { path, .. } => {
                assert_eq!(path, "package-lock.cmake");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_declare_package() {
        let source = "CPMDeclarePackage(NAME fmt VERSION 10.0.0 GITHUB_REPOSITORY fmtlib/fmt)";
        match parse_single(source) {
            Node::CpmDeclarePackage(pkg) => {
                assert_eq!(pkg.name, "fmt");
                assert_eq!(pkg.version.as_deref(), Some("10.0.0"));
                assert_eq!(pkg.github.as_deref(), Some("fmtlib/fmt"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_unrecognized_cpm_stays_generic() {
        match parse_single("CPMGetPackageVersion(fmt OUT_VAR)") {
            Node::CommandCall { name, .. } => assert_eq!(name, "CPMGetPackageVersion"),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
