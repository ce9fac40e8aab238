//! # Markup tokens
//!
//! Container markup is split into a flat token stream using [Logos]. Like
//! any lossless lexer, **every byte of the input lands in exactly one
//! token**, so token spans can be used directly as markup offsets.
//!
//! [Logos]: https://docs.rs/logos
//!
//! ```
//! use article_linker_engine::document::markup::{tokenize, TokenKind};
//!
//! let tokens = tokenize("say <span>hi</span>");
//! let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![TokenKind::Text, TokenKind::Open, TokenKind::Text, TokenKind::Close]
//! );
//! ```
//!
//! The tokenizer knows nothing about element semantics. A tag is either an
//! opening tag, a closing tag, or a void tag that never takes a closing
//! partner (`<br>`, `<img ...>`, anything ending in `/>`).

use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"")]
enum RawToken {
    #[regex(r"</[^>]*>")]
    CloseTag,

    // quoted attribute values may contain `>`
    #[regex(r#"<[A-Za-z](?:[^>"']|"[^"]*"|'[^']*')*>"#)]
    OpenTag,

    #[regex(r"<[!?][^>]*>")]
    Declaration,

    #[regex(r"[^<]+")]
    Text,
}

/// Classified token kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Text,
    Open,
    Close,
    Void,
}

impl TokenKind {
    pub fn is_tag(self) -> bool {
        !matches!(self, TokenKind::Text)
    }
}

/// A token and the byte range it covers in the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupToken {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Tokenize container markup.
///
/// Unrecognised input (a stray `<`) is reported as text.
pub fn tokenize(markup: &str) -> Vec<MarkupToken> {
    let mut tokens: Vec<MarkupToken> = Vec::new();
    let mut lexer = RawToken::lexer(markup);

    while let Some(result) = lexer.next() {
        let span = lexer.span();
        let kind = match result {
            Ok(RawToken::CloseTag) => TokenKind::Close,
            Ok(RawToken::OpenTag) => classify_open(lexer.slice()),
            Ok(RawToken::Declaration) => TokenKind::Void,
            Ok(RawToken::Text) | Err(()) => TokenKind::Text,
        };

        // Keep text runs whole even when an error token split them.
        if kind == TokenKind::Text
            && let Some(last) = tokens.last_mut()
            && last.kind == TokenKind::Text
            && last.span.end == span.start
        {
            last.span.end = span.end;
            continue;
        }

        tokens.push(MarkupToken { kind, span });
    }

    tokens
}

fn classify_open(tag: &str) -> TokenKind {
    if tag.ends_with("/>") {
        return TokenKind::Void;
    }
    let name: String = tag[1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    if VOID_ELEMENTS.contains(&name.as_str()) {
        TokenKind::Void
    } else {
        TokenKind::Open
    }
}

/// Find the tag token that strictly contains `offset`, if any.
///
/// An offset sitting exactly on a tag edge is not "inside" it.
pub fn tag_containing(tokens: &[MarkupToken], offset: usize) -> Option<&MarkupToken> {
    tokens
        .iter()
        .find(|t| t.kind.is_tag() && t.span.start < offset && offset < t.span.end)
}

/// Whether the tags fully inside `range` nest properly without closing a
/// tag opened before the range or leaving one open past it.
pub fn is_balanced(tokens: &[MarkupToken], range: &Range<usize>) -> bool {
    let mut depth = 0usize;
    for token in tokens
        .iter()
        .filter(|t| t.span.start >= range.start && t.span.end <= range.end)
    {
        match token.kind {
            TokenKind::Open => depth += 1,
            TokenKind::Close => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            TokenKind::Text | TokenKind::Void => {}
        }
    }
    depth == 0
}

/// Text runs intersecting `range`, clipped to it.
pub fn text_runs(tokens: &[MarkupToken], range: &Range<usize>) -> Vec<Range<usize>> {
    tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Text)
        .map(|t| t.span.start.max(range.start)..t.span.end.min(range.end))
        .filter(|r| r.start < r.end)
        .collect()
}
