//! Tolerant recursive-descent parser.
//!
//! Produces a structural tree, not a faithful grammar: import/export
//! statements, decorators, object and array literals, string and template
//! literals, identifier references and their postfix chains (property access,
//! calls, element access) are modeled with exact spans. Control flow,
//! declarations and operators are consumed without dedicated nodes. The
//! parser never fails; on any unexpected token it advances and keeps going.

use unhammer_core::recorder::Span;

use crate::ast::{ImportClause, NodeArena, NodeId, NodeKind};
use crate::tokenizer::{string_value, template_value, tokenize, Token, TokenKind};

/// Keywords consumed without producing a node when an operand is expected.
const SKIPPED_KEYWORDS: &[&str] = &[
    "const",
    "let",
    "var",
    "return",
    "new",
    "typeof",
    "void",
    "delete",
    "class",
    "function",
    "if",
    "else",
    "for",
    "while",
    "do",
    "switch",
    "case",
    "default",
    "try",
    "catch",
    "finally",
    "throw",
    "async",
    "await",
    "yield",
    "export",
    "extends",
    "implements",
    "interface",
    "enum",
    "declare",
    "abstract",
    "static",
    "public",
    "private",
    "protected",
    "readonly",
    "break",
    "continue",
];

/// Keywords after which a `{` opens a statement block, not an object literal.
const BLOCK_KEYWORDS: &[&str] = &["else", "do", "try", "finally"];

/// Parse a source file. Never fails.
pub fn parse(source: &str) -> NodeArena {
    let tokens = tokenize(source);
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        arena: NodeArena::new(source.len()),
    };
    let root = parser.arena.root();
    while parser.peek().is_some() {
        parser.parse_statement(root);
    }
    parser.arena
}

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    arena: NodeArena,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    /// Borrows from the source text, not from `self`, so the slice stays
    /// usable across `advance` calls.
    fn text_of(&self, tok: Token) -> &'a str {
        tok.text(self.source)
    }

    /// End offset of the most recently consumed token.
    fn prev_end(&self) -> usize {
        if self.pos == 0 {
            0
        } else {
            self.tokens[self.pos - 1].span.end
        }
    }

    fn is_ident(&self, tok: Token, text: &str) -> bool {
        tok.kind == TokenKind::Ident && self.text_of(tok) == text
    }

    fn is_punct(&self, tok: Token, text: &str) -> bool {
        tok.kind == TokenKind::Punct && self.text_of(tok) == text
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_statement(&mut self, parent: NodeId) {
        let before = self.pos;
        let Some(tok) = self.peek() else { return };
        match tok.kind {
            TokenKind::Ident if self.text_of(tok) == "import" => {
                // `import(...)` and `import.meta` are expressions.
                let next = self.peek_at(1);
                let is_expr = matches!(
                    next,
                    Some(t) if t.kind == TokenKind::LParen || t.kind == TokenKind::Dot
                );
                if is_expr {
                    self.parse_expression(parent);
                } else {
                    self.parse_import(parent);
                }
            }
            TokenKind::Ident if self.text_of(tok) == "export" => {
                let next = self.peek_at(1);
                let is_reexport = matches!(
                    next,
                    Some(t) if t.kind == TokenKind::LBrace || self.is_punct(t, "*")
                );
                if is_reexport {
                    self.parse_export_from(parent);
                } else {
                    self.parse_expression(parent);
                }
            }
            TokenKind::At => {
                self.parse_decorator(parent);
            }
            TokenKind::LBrace => {
                self.parse_block(parent);
            }
            TokenKind::Semicolon => {
                self.advance();
            }
            _ => {
                self.parse_expression(parent);
            }
        }
        if self.pos == before {
            self.pos += 1;
        }
    }

    fn parse_block(&mut self, parent: NodeId) -> NodeId {
        // Caller guarantees the current token is `{`.
        let start = self.peek().map(|t| t.span.start).unwrap_or(0);
        self.advance();
        let block = self.arena.alloc(parent, NodeKind::Block, Span::new(start, start));
        loop {
            match self.peek() {
                None => break,
                Some(t) if t.kind == TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                _ => self.parse_statement(block),
            }
        }
        let end = self.prev_end().max(start);
        self.arena.set_span(block, Span::new(start, end));
        block
    }

    // ------------------------------------------------------------------
    // Imports and re-exports
    // ------------------------------------------------------------------

    fn parse_import(&mut self, parent: NodeId) {
        let start = self.peek().map(|t| t.span.start).unwrap_or(0);
        self.advance(); // `import`

        // Type-only imports carry no runtime bindings.
        if let Some(t) = self.peek() {
            let type_only = self.is_ident(t, "type")
                && matches!(
                    self.peek_at(1),
                    Some(n) if n.kind == TokenKind::LBrace
                        || n.kind == TokenKind::Ident
                        || self.is_punct(n, "*")
                );
            if type_only {
                self.skip_to_module_end();
                return;
            }
        }

        let decl = self.arena.alloc(
            parent,
            NodeKind::ImportDecl {
                module: String::new(),
                clause: ImportClause::SideEffect,
            },
            Span::new(start, start),
        );

        let mut clause = ImportClause::SideEffect;
        let mut module = String::new();

        match self.peek() {
            Some(t) if t.kind == TokenKind::Str => {
                module = string_value(self.source, &t);
                self.advance();
            }
            Some(t) if self.is_punct(t, "*") => {
                self.advance();
                if matches!(self.peek(), Some(t) if self.is_ident(t, "as")) {
                    self.advance();
                }
                let local = match self.peek() {
                    Some(t) if t.kind == TokenKind::Ident => {
                        self.advance();
                        self.text_of(t).to_string()
                    }
                    _ => String::new(),
                };
                clause = ImportClause::Namespace { local };
                module = self.consume_from_module();
            }
            Some(t) if t.kind == TokenKind::LBrace => {
                self.parse_import_specifiers(decl);
                clause = ImportClause::Named;
                module = self.consume_from_module();
            }
            Some(t) if t.kind == TokenKind::Ident => {
                let local = self.text_of(t).to_string();
                self.advance();
                if matches!(self.peek(), Some(t) if t.kind == TokenKind::Comma) {
                    self.advance();
                    if matches!(self.peek(), Some(t) if t.kind == TokenKind::LBrace) {
                        self.parse_import_specifiers(decl);
                    }
                }
                clause = ImportClause::Default { local };
                module = self.consume_from_module();
            }
            _ => {}
        }

        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Semicolon) {
            self.advance();
        }
        let end = self.prev_end().max(start);
        if let NodeKind::ImportDecl {
            module: m,
            clause: c,
        } = &mut self.arena.get_mut(decl).kind
        {
            *m = module;
            *c = clause;
        }
        self.arena.set_span(decl, Span::new(start, end));
    }

    /// Parse `{ a, b as c }` specifiers as children of `decl`.
    fn parse_import_specifiers(&mut self, decl: NodeId) {
        self.advance(); // `{`
        loop {
            match self.peek() {
                None => break,
                Some(t) if t.kind == TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                Some(t) if t.kind == TokenKind::Comma => {
                    self.advance();
                }
                Some(t) if t.kind == TokenKind::Ident || t.kind == TokenKind::Str => {
                    let spec_start = t.span.start;
                    let imported = if t.kind == TokenKind::Str {
                        string_value(self.source, &t)
                    } else {
                        self.text_of(t).to_string()
                    };
                    self.advance();
                    let mut local = imported.clone();
                    let mut end = t.span.end;
                    if matches!(self.peek(), Some(t) if self.is_ident(t, "as")) {
                        self.advance();
                        if let Some(l) = self.peek() {
                            if l.kind == TokenKind::Ident {
                                local = self.text_of(l).to_string();
                                end = l.span.end;
                                self.advance();
                            }
                        }
                    }
                    self.arena.alloc(
                        decl,
                        NodeKind::ImportSpecifier { imported, local },
                        Span::new(spec_start, end),
                    );
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Consume `from 'module'` and return the module specifier.
    fn consume_from_module(&mut self) -> String {
        if matches!(self.peek(), Some(t) if self.is_ident(t, "from")) {
            self.advance();
        }
        match self.peek() {
            Some(t) if t.kind == TokenKind::Str => {
                self.advance();
                string_value(self.source, &t)
            }
            _ => String::new(),
        }
    }

    /// Skip the rest of an import/export statement we do not model.
    fn skip_to_module_end(&mut self) {
        while let Some(t) = self.peek() {
            self.advance();
            if t.kind == TokenKind::Str {
                break;
            }
            if t.kind == TokenKind::Semicolon {
                return;
            }
        }
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Semicolon) {
            self.advance();
        }
    }

    fn parse_export_from(&mut self, parent: NodeId) {
        let start = self.peek().map(|t| t.span.start).unwrap_or(0);
        self.advance(); // `export`

        if matches!(self.peek(), Some(t) if self.is_punct(t, "*")) {
            // Star re-exports are not followed.
            self.skip_to_module_end();
            return;
        }

        // `{ a, b as c }`
        self.advance(); // `{`
        let mut names: Vec<(String, String)> = Vec::new();
        loop {
            match self.peek() {
                None => break,
                Some(t) if t.kind == TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                Some(t) if t.kind == TokenKind::Comma => {
                    self.advance();
                }
                Some(t) if t.kind == TokenKind::Ident => {
                    let original = self.text_of(t).to_string();
                    self.advance();
                    let mut exported = original.clone();
                    if matches!(self.peek(), Some(t) if self.is_ident(t, "as")) {
                        self.advance();
                        if let Some(l) = self.peek() {
                            if l.kind == TokenKind::Ident {
                                exported = self.text_of(l).to_string();
                                self.advance();
                            }
                        }
                    }
                    names.push((original, exported));
                }
                _ => {
                    self.advance();
                }
            }
        }

        if matches!(self.peek(), Some(t) if self.is_ident(t, "from")) {
            self.advance();
            if let Some(t) = self.peek() {
                if t.kind == TokenKind::Str {
                    let module = string_value(self.source, &t);
                    self.advance();
                    if matches!(self.peek(), Some(t) if t.kind == TokenKind::Semicolon) {
                        self.advance();
                    }
                    let end = self.prev_end().max(start);
                    self.arena.alloc(
                        parent,
                        NodeKind::ExportFrom { module, names },
                        Span::new(start, end),
                    );
                    return;
                }
            }
        }
        // A plain local export list carries no cross-file information.
        if matches!(self.peek(), Some(t) if t.kind == TokenKind::Semicolon) {
            self.advance();
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_decorator(&mut self, parent: NodeId) -> NodeId {
        let start = self.peek().map(|t| t.span.start).unwrap_or(0);
        self.advance(); // `@`
        let dec = self
            .arena
            .alloc(parent, NodeKind::Decorator, Span::new(start, start));
        self.parse_expression(dec);
        let end = self.prev_end().max(start);
        self.arena.set_span(dec, Span::new(start, end));
        dec
    }

    /// Parse one expression into an [`NodeKind::Expr`] wrapper under `parent`.
    ///
    /// Stops at `,` `;` `)` `]` `}` and at a token that can only begin a new
    /// statement (automatic semicolon insertion).
    fn parse_expression(&mut self, parent: NodeId) -> NodeId {
        let start = self.peek().map(|t| t.span.start).unwrap_or(self.prev_end());
        let expr = self
            .arena
            .alloc(parent, NodeKind::Expr, Span::new(start, start));

        let mut expect_operand = true;
        let mut prev_arrow = false;
        let mut prev_block_keyword = false;
        // Last operand node, target for postfix chains.
        let mut last: Option<NodeId> = None;

        loop {
            let Some(tok) = self.peek() else { break };
            match tok.kind {
                TokenKind::Comma
                | TokenKind::Semicolon
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace => break,

                TokenKind::LBrace => {
                    if expect_operand && !prev_arrow && !prev_block_keyword {
                        last = Some(self.parse_object_literal(expr));
                        expect_operand = false;
                    } else {
                        self.parse_block(expr);
                        expect_operand = false;
                        last = None;
                    }
                    prev_arrow = false;
                    prev_block_keyword = false;
                }

                TokenKind::LBracket => {
                    if expect_operand {
                        last = Some(self.parse_array_literal(expr));
                        expect_operand = false;
                    } else if let Some(obj) = last {
                        last = Some(self.parse_element_access(expr, obj));
                    } else {
                        self.advance();
                        expect_operand = true;
                    }
                    prev_arrow = false;
                    prev_block_keyword = false;
                }

                TokenKind::LParen => {
                    if !expect_operand && last.is_some() {
                        let callee = last.take().unwrap();
                        last = Some(self.parse_call(expr, callee));
                    } else {
                        // Parenthesized expression or parameter list.
                        self.advance();
                        loop {
                            match self.peek() {
                                None => break,
                                Some(t) if t.kind == TokenKind::RParen => {
                                    self.advance();
                                    break;
                                }
                                Some(t) if t.kind == TokenKind::Comma => {
                                    self.advance();
                                }
                                _ => {
                                    let before = self.pos;
                                    self.parse_expression(expr);
                                    if self.pos == before {
                                        self.pos += 1;
                                    }
                                }
                            }
                        }
                        expect_operand = false;
                        last = None;
                    }
                    prev_arrow = false;
                    prev_block_keyword = false;
                }

                TokenKind::Dot => {
                    self.advance();
                    let name = match self.peek() {
                        Some(t) if t.kind == TokenKind::Ident => Some(t),
                        _ => None,
                    };
                    match (last, name) {
                        (Some(obj), Some(name_tok)) => {
                            let property = self.text_of(name_tok).to_string();
                            let span = Span::new(
                                self.arena.get(obj).span.start,
                                name_tok.span.end,
                            );
                            self.advance();
                            let access = self.arena.alloc(
                                expr,
                                NodeKind::PropertyAccess { property },
                                span,
                            );
                            self.arena.reparent(obj, access);
                            last = Some(access);
                            expect_operand = false;
                        }
                        _ => {
                            // `import.meta`, stray dot. Consume the name too.
                            if name.is_some() {
                                self.advance();
                            }
                            expect_operand = false;
                            last = None;
                        }
                    }
                    prev_arrow = false;
                    prev_block_keyword = false;
                }

                TokenKind::Ident => {
                    let text = self.text_of(tok);
                    if expect_operand {
                        if SKIPPED_KEYWORDS.contains(&text) {
                            prev_block_keyword = BLOCK_KEYWORDS.contains(&text);
                            self.advance();
                        } else if text == "this" || text == "super" {
                            self.advance();
                            last = Some(self.arena.alloc(expr, NodeKind::Expr, tok.span));
                            expect_operand = false;
                            prev_block_keyword = false;
                        } else {
                            self.advance();
                            last = Some(self.arena.alloc(
                                expr,
                                NodeKind::Identifier {
                                    name: text.to_string(),
                                },
                                tok.span,
                            ));
                            expect_operand = false;
                            prev_block_keyword = false;
                        }
                    } else if matches!(text, "as" | "in" | "instanceof" | "of") {
                        self.advance();
                        expect_operand = true;
                        last = None;
                    } else {
                        // A bare identifier after an operand starts a new
                        // statement.
                        break;
                    }
                    prev_arrow = false;
                }

                TokenKind::Str => {
                    if !expect_operand {
                        break;
                    }
                    let value = string_value(self.source, &tok);
                    self.advance();
                    last = Some(self.arena.alloc(
                        expr,
                        NodeKind::StringLiteral { value },
                        tok.span,
                    ));
                    expect_operand = false;
                    prev_arrow = false;
                    prev_block_keyword = false;
                }

                TokenKind::Template => {
                    // Consumed in either position: tagged templates bind to
                    // the preceding operand.
                    let raw = template_value(self.source, &tok);
                    self.advance();
                    last = Some(self.arena.alloc(
                        expr,
                        NodeKind::TemplateLiteral { raw },
                        tok.span,
                    ));
                    expect_operand = false;
                    prev_arrow = false;
                    prev_block_keyword = false;
                }

                TokenKind::Number | TokenKind::Regex => {
                    if !expect_operand {
                        break;
                    }
                    self.advance();
                    expect_operand = false;
                    last = None;
                    prev_arrow = false;
                    prev_block_keyword = false;
                }

                TokenKind::At => {
                    if !expect_operand {
                        break;
                    }
                    self.parse_decorator(expr);
                    expect_operand = true;
                    last = None;
                    prev_arrow = false;
                    prev_block_keyword = false;
                }

                TokenKind::Arrow => {
                    self.advance();
                    expect_operand = true;
                    prev_arrow = true;
                    prev_block_keyword = false;
                    last = None;
                }

                TokenKind::Colon | TokenKind::Spread => {
                    self.advance();
                    expect_operand = true;
                    last = None;
                    prev_arrow = false;
                    prev_block_keyword = false;
                }

                TokenKind::Punct => {
                    let text = self.text_of(tok);
                    if !expect_operand && text == "?" {
                        // Optional chaining: `?.` then a property name.
                        if matches!(self.peek_at(1), Some(t) if t.kind == TokenKind::Dot) {
                            self.advance();
                            continue;
                        }
                        // Ternary condition operator.
                        self.advance();
                        expect_operand = true;
                        last = None;
                    } else if !expect_operand && text == "!" {
                        // Non-null assertion, postfix.
                        self.advance();
                    } else {
                        self.advance();
                        expect_operand = true;
                        last = None;
                    }
                    prev_arrow = false;
                    prev_block_keyword = false;
                }
            }
        }

        let end = self.prev_end().max(start);
        self.arena.set_span(expr, Span::new(start, end));
        expr
    }

    fn parse_call(&mut self, parent: NodeId, callee: NodeId) -> NodeId {
        let start = self.arena.get(callee).span.start;
        self.advance(); // `(`
        let call = self
            .arena
            .alloc(parent, NodeKind::Call, Span::new(start, start));
        self.arena.reparent(callee, call);
        loop {
            match self.peek() {
                None => break,
                Some(t) if t.kind == TokenKind::RParen => {
                    self.advance();
                    break;
                }
                Some(t) if t.kind == TokenKind::Comma => {
                    self.advance();
                }
                _ => {
                    let before = self.pos;
                    self.parse_expression(call);
                    if self.pos == before {
                        self.pos += 1;
                    }
                }
            }
        }
        let end = self.prev_end().max(start);
        self.arena.set_span(call, Span::new(start, end));
        call
    }

    fn parse_element_access(&mut self, parent: NodeId, object: NodeId) -> NodeId {
        let start = self.arena.get(object).span.start;
        self.advance(); // `[`

        // `obj['key']` keeps the string key for marker matching.
        let argument = match (self.peek(), self.peek_at(1)) {
            (Some(key), Some(close))
                if key.kind == TokenKind::Str && close.kind == TokenKind::RBracket =>
            {
                let value = string_value(self.source, &key);
                self.advance();
                self.advance();
                Some(value)
            }
            _ => {
                loop {
                    match self.peek() {
                        None => break,
                        Some(t) if t.kind == TokenKind::RBracket => {
                            self.advance();
                            break;
                        }
                        Some(t) if t.kind == TokenKind::Comma => {
                            self.advance();
                        }
                        _ => {
                            let before = self.pos;
                            self.parse_expression(parent);
                            if self.pos == before {
                                self.pos += 1;
                            }
                        }
                    }
                }
                None
            }
        };

        let end = self.prev_end().max(start);
        let access = self.arena.alloc(
            parent,
            NodeKind::ElementAccess { argument },
            Span::new(start, end),
        );
        self.arena.reparent(object, access);
        access
    }

    fn parse_object_literal(&mut self, parent: NodeId) -> NodeId {
        let start = self.peek().map(|t| t.span.start).unwrap_or(0);
        self.advance(); // `{`
        let obj = self
            .arena
            .alloc(parent, NodeKind::ObjectLiteral, Span::new(start, start));
        loop {
            let Some(tok) = self.peek() else { break };
            match tok.kind {
                TokenKind::RBrace => {
                    self.advance();
                    break;
                }
                TokenKind::Comma | TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Ident | TokenKind::Str
                    if matches!(self.peek_at(1), Some(t) if t.kind == TokenKind::Colon) =>
                {
                    let name = if tok.kind == TokenKind::Str {
                        string_value(self.source, &tok)
                    } else {
                        self.text_of(tok).to_string()
                    };
                    let prop_start = tok.span.start;
                    self.advance(); // name
                    self.advance(); // `:`
                    let prop = self.arena.alloc(
                        obj,
                        NodeKind::PropertyAssignment { name },
                        Span::new(prop_start, prop_start),
                    );
                    let before = self.pos;
                    self.parse_expression(prop);
                    if self.pos == before {
                        self.pos += 1;
                    }
                    let end = self.prev_end().max(prop_start);
                    self.arena.set_span(prop, Span::new(prop_start, end));
                }
                TokenKind::Ident
                    if matches!(
                        self.peek_at(1),
                        Some(t) if t.kind == TokenKind::Comma || t.kind == TokenKind::RBrace
                    ) =>
                {
                    // Shorthand property: the name is also a reference.
                    let name = self.text_of(tok).to_string();
                    self.advance();
                    let prop = self.arena.alloc(
                        obj,
                        NodeKind::PropertyAssignment { name: name.clone() },
                        tok.span,
                    );
                    self.arena
                        .alloc(prop, NodeKind::Identifier { name }, tok.span);
                }
                _ => {
                    // Spread, computed keys, methods; parse structurally.
                    let before = self.pos;
                    self.parse_expression(obj);
                    if self.pos == before {
                        self.pos += 1;
                    }
                }
            }
        }
        let end = self.prev_end().max(start);
        self.arena.set_span(obj, Span::new(start, end));
        obj
    }

    fn parse_array_literal(&mut self, parent: NodeId) -> NodeId {
        let start = self.peek().map(|t| t.span.start).unwrap_or(0);
        self.advance(); // `[`
        let array = self
            .arena
            .alloc(parent, NodeKind::ArrayLiteral, Span::new(start, start));
        loop {
            match self.peek() {
                None => break,
                Some(t) if t.kind == TokenKind::RBracket => {
                    self.advance();
                    break;
                }
                Some(t) if t.kind == TokenKind::Comma => {
                    self.advance();
                }
                _ => {
                    let before = self.pos;
                    self.parse_expression(array);
                    if self.pos == before {
                        self.pos += 1;
                    }
                }
            }
        }
        let end = self.prev_end().max(start);
        self.arena.set_span(array, Span::new(start, end));
        array
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_all<'a>(
        arena: &'a NodeArena,
        pred: impl Fn(&NodeKind) -> bool + 'a,
    ) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![arena.root()];
        while let Some(id) = stack.pop() {
            if pred(&arena.get(id).kind) {
                out.push(id);
            }
            for &child in arena.get(id).children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    fn identifiers(arena: &NodeArena) -> Vec<String> {
        find_all(arena, |k| matches!(k, NodeKind::Identifier { .. }))
            .into_iter()
            .map(|id| match &arena.get(id).kind {
                NodeKind::Identifier { name } => name.clone(),
                _ => unreachable!(),
            })
            .collect()
    }

    mod import_tests {
        use super::*;

        #[test]
        fn named_import_with_alias() {
            let source = "import { HammerModule, HAMMER_GESTURE_CONFIG as CFG } from '@angular/platform-browser';\n";
            let arena = parse(source);
            let decls = find_all(&arena, |k| matches!(k, NodeKind::ImportDecl { .. }));
            assert_eq!(decls.len(), 1);
            let decl = arena.get(decls[0]);
            match &decl.kind {
                NodeKind::ImportDecl { module, clause } => {
                    assert_eq!(module, "@angular/platform-browser");
                    assert_eq!(*clause, ImportClause::Named);
                }
                _ => panic!("not an import"),
            }
            let specs: Vec<_> = decl
                .children
                .iter()
                .map(|&c| match &arena.get(c).kind {
                    NodeKind::ImportSpecifier { imported, local } => {
                        (imported.clone(), local.clone())
                    }
                    _ => panic!("not a specifier"),
                })
                .collect();
            assert_eq!(
                specs,
                vec![
                    ("HammerModule".to_string(), "HammerModule".to_string()),
                    ("HAMMER_GESTURE_CONFIG".to_string(), "CFG".to_string()),
                ]
            );
            // The statement span covers the trailing semicolon.
            assert_eq!(decl.span.end, source.trim_end().len());
        }

        #[test]
        fn side_effect_and_namespace_imports() {
            let arena = parse("import 'hammerjs';\nimport * as hammer from 'hammerjs';\n");
            let decls = find_all(&arena, |k| matches!(k, NodeKind::ImportDecl { .. }));
            assert_eq!(decls.len(), 2);
            assert!(matches!(
                &arena.get(decls[0]).kind,
                NodeKind::ImportDecl { module, clause: ImportClause::SideEffect } if module == "hammerjs"
            ));
            assert!(matches!(
                &arena.get(decls[1]).kind,
                NodeKind::ImportDecl { clause: ImportClause::Namespace { local }, .. } if local == "hammer"
            ));
        }

        #[test]
        fn default_with_named() {
            let arena = parse("import Hammer, { Pan } from 'hammerjs';");
            let decls = find_all(&arena, |k| matches!(k, NodeKind::ImportDecl { .. }));
            let decl = arena.get(decls[0]);
            assert!(matches!(
                &decl.kind,
                NodeKind::ImportDecl { clause: ImportClause::Default { local }, .. } if local == "Hammer"
            ));
            assert_eq!(decl.children.len(), 1);
        }

        #[test]
        fn type_import_produces_no_node() {
            let arena = parse("import type { Foo } from './foo';\nconst x = 1;");
            assert!(find_all(&arena, |k| matches!(k, NodeKind::ImportDecl { .. })).is_empty());
        }

        #[test]
        fn reexport_with_alias() {
            let arena = parse("export { GestureConfig as Config } from './gesture-config';");
            let exports = find_all(&arena, |k| matches!(k, NodeKind::ExportFrom { .. }));
            assert_eq!(exports.len(), 1);
            match &arena.get(exports[0]).kind {
                NodeKind::ExportFrom { module, names } => {
                    assert_eq!(module, "./gesture-config");
                    assert_eq!(
                        names,
                        &vec![("GestureConfig".to_string(), "Config".to_string())]
                    );
                }
                _ => unreachable!(),
            }
        }

        #[test]
        fn star_reexport_is_skipped() {
            let arena = parse("export * from './all';\nconst y = 2;");
            assert!(find_all(&arena, |k| matches!(k, NodeKind::ExportFrom { .. })).is_empty());
            assert_eq!(identifiers(&arena), vec!["y"]);
        }
    }

    mod expression_tests {
        use super::*;

        #[test]
        fn property_access_chain_spans() {
            let source = "window.Hammer.defaults;";
            let arena = parse(source);
            let accesses = find_all(&arena, |k| matches!(k, NodeKind::PropertyAccess { .. }));
            assert_eq!(accesses.len(), 2);
            // Outermost access covers the whole chain.
            let outer = accesses
                .iter()
                .find(|&&id| match &arena.get(id).kind {
                    NodeKind::PropertyAccess { property } => property == "defaults",
                    _ => false,
                })
                .copied()
                .unwrap();
            assert_eq!(&source[arena.get(outer).span.start..arena.get(outer).span.end],
                "window.Hammer.defaults");
        }

        #[test]
        fn bootstrap_call_shape() {
            let arena = parse("platformBrowserDynamic().bootstrapModule(AppModule);");
            let calls = find_all(&arena, |k| matches!(k, NodeKind::Call));
            assert_eq!(calls.len(), 2);
            // Find the call whose callee is the bootstrapModule access.
            let bootstrap = calls
                .iter()
                .find(|&&id| {
                    let callee = arena.get(id).children[0];
                    matches!(
                        &arena.get(callee).kind,
                        NodeKind::PropertyAccess { property } if property == "bootstrapModule"
                    )
                })
                .copied()
                .unwrap();
            let node = arena.get(bootstrap);
            assert_eq!(node.children.len(), 2);
            let arg = node.children[1];
            let arg_idents: Vec<String> = arena
                .get(arg)
                .children
                .iter()
                .filter_map(|&c| match &arena.get(c).kind {
                    NodeKind::Identifier { name } => Some(name.clone()),
                    _ => None,
                })
                .collect();
            assert_eq!(arg_idents, vec!["AppModule"]);
        }

        #[test]
        fn decorator_with_object_argument() {
            let source = "@NgModule({ declarations: [AppComponent], providers: [] })\nexport class AppModule {}";
            let arena = parse(source);
            let decorators = find_all(&arena, |k| matches!(k, NodeKind::Decorator));
            assert_eq!(decorators.len(), 1);
            let props = find_all(&arena, |k| matches!(k, NodeKind::PropertyAssignment { .. }));
            let names: Vec<String> = props
                .iter()
                .map(|&id| match &arena.get(id).kind {
                    NodeKind::PropertyAssignment { name } => name.clone(),
                    _ => unreachable!(),
                })
                .collect();
            assert_eq!(names, vec!["declarations", "providers"]);
        }

        #[test]
        fn array_elements_are_expr_wrappers() {
            let source = "[{ provide: TOK, useClass: Cfg }, Other]";
            let arena = parse(source);
            let arrays = find_all(&arena, |k| matches!(k, NodeKind::ArrayLiteral));
            assert_eq!(arrays.len(), 1);
            let array = arena.get(arrays[0]);
            assert_eq!(array.children.len(), 2);
            let first = arena.get(array.children[0]);
            assert_eq!(&source[first.span.start..first.span.end],
                "{ provide: TOK, useClass: Cfg }");
            let second = arena.get(array.children[1]);
            assert_eq!(&source[second.span.start..second.span.end], "Other");
        }

        #[test]
        fn element_access_string_key() {
            let arena = parse("window['Hammer'].defaults;");
            let accesses = find_all(&arena, |k| matches!(k, NodeKind::ElementAccess { .. }));
            assert_eq!(accesses.len(), 1);
            assert!(matches!(
                &arena.get(accesses[0]).kind,
                NodeKind::ElementAccess { argument: Some(a) } if a == "Hammer"
            ));
        }

        #[test]
        fn shorthand_property_is_a_reference() {
            let arena = parse("const obj = { GestureConfig };");
            assert!(identifiers(&arena).contains(&"GestureConfig".to_string()));
        }

        #[test]
        fn inline_template_survives() {
            let source = "@Component({ template: `<div (tap)=\"onTap()\"></div>` })\nexport class C {}";
            let arena = parse(source);
            let templates = find_all(&arena, |k| matches!(k, NodeKind::TemplateLiteral { .. }));
            assert_eq!(templates.len(), 1);
            match &arena.get(templates[0]).kind {
                NodeKind::TemplateLiteral { raw } => {
                    assert!(raw.contains("(tap)"));
                }
                _ => unreachable!(),
            }
        }

        #[test]
        fn new_expression_keeps_callee_reference() {
            let arena = parse("const mc = new Hammer(element);");
            assert!(identifiers(&arena).contains(&"Hammer".to_string()));
            let calls = find_all(&arena, |k| matches!(k, NodeKind::Call));
            assert_eq!(calls.len(), 1);
        }

        #[test]
        fn optional_chain_still_builds_access() {
            let arena = parse("win?.Hammer?.defaults;");
            let accesses = find_all(&arena, |k| matches!(k, NodeKind::PropertyAccess { .. }));
            assert_eq!(accesses.len(), 2);
        }
    }

    mod tolerance_tests {
        use super::*;

        #[test]
        fn garbage_never_panics() {
            for source in [
                ")))]]]}}}",
                "import",
                "import {",
                "export *",
                "@",
                "a..b",
                "const x = {,,,};",
                "((((",
            ] {
                let arena = parse(source);
                assert!(arena.len() >= 1);
            }
        }

        #[test]
        fn class_body_is_block_not_object() {
            let arena = parse("export class AppModule { constructor() { init(); } }");
            let objects = find_all(&arena, |k| matches!(k, NodeKind::ObjectLiteral));
            assert!(objects.is_empty());
            assert!(identifiers(&arena).contains(&"init".to_string()));
        }

        #[test]
        fn arrow_body_is_block() {
            let arena = parse("items.forEach(x => { use(x); });");
            let objects = find_all(&arena, |k| matches!(k, NodeKind::ObjectLiteral));
            assert!(objects.is_empty());
        }

        #[test]
        fn method_shorthand_body_parsed() {
            let arena = parse("const cfg = { buildHammer(el) { return new Hammer(el); } };");
            assert!(identifiers(&arena).contains(&"Hammer".to_string()));
        }
    }
}
