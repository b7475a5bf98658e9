//! Hand-written scanner producing spanned tokens.
//!
//! Comments and whitespace are skipped. String and template literals become
//! single tokens (template substitutions are swallowed into the template
//! token; the engine only ever needs a template's raw text). A `/` in operand
//! position scans as a regex literal so division never derails the scan.

use unhammer_core::recorder::Span;

/// Lexical token categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or keyword.
    Ident,
    /// Single- or double-quoted string literal.
    Str,
    /// Backtick template literal, including any `${...}` substitutions.
    Template,
    /// Numeric literal.
    Number,
    /// Regular expression literal.
    Regex,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Semicolon,
    Dot,
    At,
    /// `=>`
    Arrow,
    /// `...`
    Spread,
    /// Any other operator or punctuation character sequence.
    Punct,
}

/// A token with its byte span in the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    /// Slice the token's text out of the source.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start..self.span.end]
    }
}

/// Decode a string literal token to its value (quotes stripped, common
/// escapes resolved). Unknown escapes keep the escaped character.
pub fn string_value(source: &str, token: &Token) -> String {
    let raw = token.text(source);
    let inner = if raw.len() >= 2 {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// The raw text between a template literal's backticks.
pub fn template_value(source: &str, token: &Token) -> String {
    let raw = token.text(source);
    if raw.len() >= 2 && raw.starts_with('`') && raw.ends_with('`') {
        raw[1..raw.len() - 1].to_string()
    } else {
        raw.to_string()
    }
}

/// Keywords after which a `/` starts a regex rather than division.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "case", "do", "else",
    "yield", "await", "throw",
];

/// Tokenize the source. Never fails: malformed trailing constructs produce a
/// final token covering the remaining text.
pub fn tokenize(source: &str) -> Vec<Token> {
    let bytes = source.as_bytes();
    let len = bytes.len();
    let mut tokens: Vec<Token> = Vec::new();
    let mut i = 0usize;

    while i < len {
        let b = bytes[i];

        // Whitespace
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        // Comments
        if b == b'/' && i + 1 < len {
            if bytes[i + 1] == b'/' {
                while i < len && bytes[i] != b'\n' {
                    i += 1;
                }
                continue;
            }
            if bytes[i + 1] == b'*' {
                let mut j = i + 2;
                while j + 1 < len && !(bytes[j] == b'*' && bytes[j + 1] == b'/') {
                    j += 1;
                }
                i = if j + 1 < len { j + 2 } else { len };
                continue;
            }
        }

        // Identifiers (non-ASCII bytes are treated as identifier characters)
        if b == b'_' || b == b'$' || b.is_ascii_alphabetic() || b >= 0x80 {
            let start = i;
            while i < len
                && (bytes[i] == b'_'
                    || bytes[i] == b'$'
                    || bytes[i].is_ascii_alphanumeric()
                    || bytes[i] >= 0x80)
            {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Ident,
                span: Span::new(start, i),
            });
            continue;
        }

        // Numbers
        if b.is_ascii_digit() {
            let start = i;
            while i < len
                && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'.' || bytes[i] == b'_')
            {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Number,
                span: Span::new(start, i),
            });
            continue;
        }

        // Strings
        if b == b'\'' || b == b'"' {
            let start = i;
            i += 1;
            while i < len && bytes[i] != b {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(len);
            tokens.push(Token {
                kind: TokenKind::Str,
                span: Span::new(start, i),
            });
            continue;
        }

        // Template literals (substitutions swallowed, nesting tracked)
        if b == b'`' {
            let start = i;
            i = scan_template(bytes, i + 1);
            tokens.push(Token {
                kind: TokenKind::Template,
                span: Span::new(start, i),
            });
            continue;
        }

        // Regex literal heuristic
        if b == b'/' && regex_position(source, &tokens) {
            let start = i;
            i += 1;
            let mut in_class = false;
            while i < len {
                match bytes[i] {
                    b'\\' => i += 1,
                    b'[' => in_class = true,
                    b']' => in_class = false,
                    b'/' if !in_class => break,
                    b'\n' => break,
                    _ => {}
                }
                i += 1;
            }
            i = (i + 1).min(len);
            while i < len && bytes[i].is_ascii_alphabetic() {
                i += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Regex,
                span: Span::new(start, i),
            });
            continue;
        }

        // Spread / dot
        if b == b'.' {
            if i + 2 < len && bytes[i + 1] == b'.' && bytes[i + 2] == b'.' {
                tokens.push(Token {
                    kind: TokenKind::Spread,
                    span: Span::new(i, i + 3),
                });
                i += 3;
            } else {
                tokens.push(Token {
                    kind: TokenKind::Dot,
                    span: Span::new(i, i + 1),
                });
                i += 1;
            }
            continue;
        }

        // Arrow
        if b == b'=' && i + 1 < len && bytes[i + 1] == b'>' {
            tokens.push(Token {
                kind: TokenKind::Arrow,
                span: Span::new(i, i + 2),
            });
            i += 2;
            continue;
        }

        let kind = match b {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b':' => TokenKind::Colon,
            b';' => TokenKind::Semicolon,
            b'@' => TokenKind::At,
            _ => TokenKind::Punct,
        };
        tokens.push(Token {
            kind,
            span: Span::new(i, i + 1),
        });
        i += 1;
    }

    tokens
}

/// Scan a template literal body starting just past the opening backtick.
/// Returns the offset just past the closing backtick.
fn scan_template(bytes: &[u8], mut i: usize) -> usize {
    let len = bytes.len();
    while i < len {
        match bytes[i] {
            b'\\' => i += 2,
            b'`' => return i + 1,
            b'$' if i + 1 < len && bytes[i + 1] == b'{' => {
                // Swallow the substitution, tracking brace depth and nested
                // strings/templates.
                i += 2;
                let mut depth = 1usize;
                while i < len && depth > 0 {
                    match bytes[i] {
                        b'{' => {
                            depth += 1;
                            i += 1;
                        }
                        b'}' => {
                            depth -= 1;
                            i += 1;
                        }
                        b'\'' | b'"' => {
                            let quote = bytes[i];
                            i += 1;
                            while i < len && bytes[i] != quote {
                                if bytes[i] == b'\\' {
                                    i += 1;
                                }
                                i += 1;
                            }
                            i = (i + 1).min(len);
                        }
                        b'`' => {
                            i = scan_template(bytes, i + 1);
                        }
                        b'\\' => i += 2,
                        _ => i += 1,
                    }
                }
            }
            _ => i += 1,
        }
    }
    len
}

/// True if a `/` at the current position starts a regex literal: the previous
/// significant token cannot end an operand.
fn regex_position(source: &str, tokens: &[Token]) -> bool {
    match tokens.last() {
        None => true,
        Some(tok) => match tok.kind {
            TokenKind::Ident => REGEX_PRECEDING_KEYWORDS.contains(&tok.text(source)),
            TokenKind::Str
            | TokenKind::Template
            | TokenKind::Number
            | TokenKind::Regex
            | TokenKind::RParen
            | TokenKind::RBracket => false,
            _ => true,
        },
    }
}
