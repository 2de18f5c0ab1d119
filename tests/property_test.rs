//! Property-based tests for the invariants that quantify over inputs

use finch::generator::normalize_name;
use finch::source::SourceBuffer;
use proptest::prelude::*;

/// Reference implementation: linear scan for line/column.
fn linear_line_column(content: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(content.len());
    let mut line = 1;
    let mut column = 1;
    for (i, byte) in content.bytes().enumerate() {
        if i == offset {
            break;
        }
        if byte == b'\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

proptest! {
    #[test]
    fn location_at_agrees_with_linear_scan(
        content in "[ -~\n]{0,200}",
        offset in 0usize..250,
    ) {
        let buffer = SourceBuffer::new(content.clone(), "prop.cmake");
        let (line, column) = buffer.line_column_at(offset);
        let (expected_line, expected_column) = linear_line_column(&content, offset);
        prop_assert_eq!((line, column), (expected_line, expected_column));
    }

    #[test]
    fn normalized_names_use_safe_charset(name in "\\PC{1,40}") {
        let normalized = normalize_name(&name);
        prop_assert!(normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        if let Some(first) = normalized.chars().next() {
            prop_assert!(!first.is_ascii_digit());
        }
    }

    #[test]
    fn normalization_is_idempotent(name in "\\PC{1,40}") {
        let once = normalize_name(&name);
        prop_assert_eq!(normalize_name(&once), once);
    }

    #[test]
    fn lexed_token_text_slices_back(source in "[a-zA-Z0-9_() \n${}\"]{0,80}") {
        let mut lexer = finch::lexer::Lexer::new(source.clone(), "prop.cmake");
        loop {
            match lexer.next_token() {
                Ok(tok) => {
                    if tok.kind == finch::lexer::TokenKind::Eof {
                        break;
                    }
                    let start = tok.location.offset;
                    prop_assert_eq!(&source[start..start + tok.text.len()], tok.text.as_str());
                }
                // Unterminated constructs are legal failures here.
                Err(_) => break,
            }
        }
    }

    #[test]
    fn interner_dedup_is_pointer_stable(names in proptest::collection::vec("[a-z_]{1,12}", 1..20)) {
        let mut interner = finch::ast::Interner::new();
        let first: Vec<finch::ast::IStr> = names.iter().map(|n| interner.intern(n)).collect();
        let second: Vec<finch::ast::IStr> = names.iter().map(|n| interner.intern(n)).collect();
        for (a, b) in first.iter().zip(&second) {
            prop_assert!(finch::ast::IStr::ptr_eq(a, b));
        }

        let unique: std::collections::HashSet<&String> = names.iter().collect();
        prop_assert_eq!(interner.len(), unique.len());
    }
}
