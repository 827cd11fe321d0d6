//! Recursive-descent builder from the token stream to a [`Node`] tree.
//!
//! This is a pragmatic subset of PHP's grammar: enough to recognise every
//! construct the resolver components dispatch on (spec §4.H/§4.I). It is
//! not a validating parser — malformed input degrades to [`NodeKind::Unknown`]
//! leaves plus a recorded [`ParseError`], never a panic.

use std::collections::HashMap;

use super::lexer::{Token, TokenKind, tokenize};
use super::*;
use crate::docblock;
use crate::symbol::ModifierMask;

struct Parser {
    tokens: Vec<Token>,
    doc_at: HashMap<usize, String>,
    pos: usize,
    errors: Vec<ParseError>,
}

pub fn parse(source: &str) -> ParseTree {
    let raw = tokenize(source);
    let (tokens, doc_at) = strip_trivia(raw);
    let mut p = Parser { tokens, doc_at, pos: 0, errors: Vec::new() };
    let root = p.parse_program();
    ParseTree { root, errors: p.errors }
}

fn strip_trivia(raw: Vec<Token>) -> (Vec<Token>, HashMap<usize, String>) {
    let mut tokens = Vec::with_capacity(raw.len());
    let mut doc_at = HashMap::new();
    let mut pending: Option<String> = None;
    for tok in raw {
        match tok.kind {
            TokenKind::DocComment => pending = Some(tok.text),
            TokenKind::OpenTag | TokenKind::CloseTag => {}
            _ => {
                if let Some(doc) = pending.take() {
                    doc_at.insert(tokens.len(), doc);
                }
                tokens.push(tok);
            }
        }
    }
    (tokens, doc_at)
}

const MEMBER_MODIFIERS: &[(&str, ModifierMask)] = &[
    ("public", ModifierMask::PUBLIC),
    ("protected", ModifierMask::PROTECTED),
    ("private", ModifierMask::PRIVATE),
    ("static", ModifierMask::STATIC),
    ("abstract", ModifierMask::ABSTRACT),
    ("final", ModifierMask::FINAL),
    ("readonly", ModifierMask::READONLY),
    ("var", ModifierMask::PUBLIC),
];

impl Parser {
    fn cur(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn at_eof(&self) -> bool {
        self.cur().kind == TokenKind::Eof
    }

    fn at_kw(&self, kw: &str) -> bool {
        self.cur().kind == TokenKind::Identifier && self.cur().text.eq_ignore_ascii_case(kw)
    }

    fn at_op(&self, op: &str) -> bool {
        self.cur().kind == TokenKind::Operator && self.cur().text == op
    }

    fn advance(&mut self) -> Token {
        let tok = self.cur().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn doc_here(&self) -> Option<String> {
        self.doc_at.get(&self.pos).cloned()
    }

    fn error_here(&mut self, what: &str) {
        let tok = self.cur().clone();
        let name = match tok.kind {
            TokenKind::Eof => "end of file".to_string(),
            TokenKind::Variable => format!("variable '{}'", tok.text),
            _ => format!("'{}'", tok.text),
        };
        self.errors.push(ParseError {
            message: format!("Unexpected {}", name),
            token_text: tok.text,
            span: tok.span,
        });
        let _ = what;
    }

    fn expect_op(&mut self, op: &str) {
        if self.at_op(op) {
            self.advance();
        } else {
            self.error_here(op);
        }
    }

    fn skip_until_op(&mut self, op: &str) {
        while !self.at_eof() && !self.at_op(op) {
            self.advance();
        }
        if self.at_op(op) {
            self.advance();
        }
    }

    /// Consume a balanced `(...)`/`[...]`/`{...}` group starting at the
    /// current open delimiter, returning its span. Used where expression
    /// contents (call arguments, default values) aren't modeled further.
    fn skip_balanced(&mut self, open: &str, close: &str) -> Span {
        let start = self.cur().span;
        if !self.at_op(open) {
            return start;
        }
        self.advance();
        let mut depth = 1;
        let mut end = start;
        while !self.at_eof() && depth > 0 {
            if self.at_op(open) {
                depth += 1;
            } else if self.at_op(close) {
                depth -= 1;
            }
            end = self.cur().span;
            self.advance();
        }
        Span::join(start, end)
    }

    fn parse_name_text(&mut self) -> String {
        if self.cur().kind == TokenKind::Identifier {
            self.advance().text
        } else {
            String::new()
        }
    }

    /// Parse a type hint string: a run of `?`, `|`, `&`, and identifiers,
    /// stopping before the parameter/property variable or `=`/`;`/`,`/`)`.
    fn parse_type_hint(&mut self) -> Option<String> {
        let mut out = String::new();
        loop {
            if self.cur().kind == TokenKind::Identifier {
                out.push_str(&self.cur().text);
                self.advance();
            } else if self.at_op("?") || self.at_op("|") || self.at_op("&") {
                out.push_str(&self.cur().text);
                self.advance();
            } else {
                break;
            }
        }
        if out.is_empty() { None } else { Some(out) }
    }

    // ---- top level ----------------------------------------------------

    fn parse_program(&mut self) -> Node {
        let start = self.cur().span;
        let mut children = Vec::new();
        while !self.at_eof() {
            let before = self.pos;
            children.push(self.parse_statement());
            if self.pos == before {
                self.advance();
            }
        }
        let end = self.tokens.last().map(|t| t.span).unwrap_or(start);
        Node::new(NodeKind::Program, Span::join(start, end), children)
    }

    fn parse_statement(&mut self) -> Node {
        if self.at_kw("namespace") {
            return self.parse_namespace();
        }
        if self.at_kw("use") {
            return self.parse_use_decl();
        }
        if self.is_class_like_start() {
            return self.parse_class_like();
        }
        if self.at_kw("function") && self.looks_like_named_function() {
            return self.parse_function_decl();
        }
        if self.at_op("{") {
            return self.parse_block();
        }
        if self.at_kw("if") {
            return self.parse_if();
        }
        if self.at_kw("switch") {
            return self.parse_switch();
        }
        if self.at_kw("foreach") {
            return self.parse_foreach();
        }
        if self.at_kw("try") {
            return self.parse_try();
        }
        if self.at_kw("return") {
            return self.parse_return();
        }
        self.parse_expression_statement()
    }

    fn looks_like_named_function(&self) -> bool {
        // `function` followed by `(` is a closure expression, not a declaration.
        matches!(self.tokens.get(self.pos + 1), Some(t) if t.kind == TokenKind::Identifier)
            || matches!(self.tokens.get(self.pos + 1), Some(t) if t.kind == TokenKind::Operator && t.text == "&")
    }

    fn is_class_like_start(&self) -> bool {
        if self.at_kw("class") || self.at_kw("interface") || self.at_kw("trait") || self.at_kw("enum") {
            return true;
        }
        if (self.at_kw("abstract") || self.at_kw("final")) {
            if let Some(next) = self.tokens.get(self.pos + 1) {
                return next.kind == TokenKind::Identifier && next.text.eq_ignore_ascii_case("class");
            }
        }
        false
    }

    fn parse_namespace(&mut self) -> Node {
        let start = self.cur().span;
        self.advance(); // namespace
        let name = if self.cur().kind == TokenKind::Identifier {
            Some(self.advance().text)
        } else {
            None
        };
        let mut children = Vec::new();
        if self.at_op("{") {
            children.push(self.parse_block());
        } else {
            self.expect_op(";");
        }
        let end = children.last().map(|c: &Node| c.span).unwrap_or(start);
        Node::new(NodeKind::NamespaceDefinition { name }, Span::join(start, end), children)
    }

    fn parse_use_decl(&mut self) -> Node {
        let start = self.cur().span;
        self.advance(); // use
        let kind = if self.at_kw("function") {
            self.advance();
            UseKind::Function
        } else if self.at_kw("const") {
            self.advance();
            UseKind::Constant
        } else {
            UseKind::Class
        };
        let mut children = Vec::new();
        loop {
            let clause_start = self.cur().span;
            let mut fqn = self.parse_name_text();
            if self.at_op("{") {
                // Grouped use: `use Foo\{Bar, Baz as B};`
                let prefix = fqn.clone();
                self.advance();
                loop {
                    let member_start = self.cur().span;
                    let member = self.parse_name_text();
                    let alias = if self.at_kw("as") {
                        self.advance();
                        Some(self.parse_name_text())
                    } else {
                        None
                    };
                    let full = format!("{}\\{}", prefix.trim_end_matches('\\'), member);
                    children.push(Node::leaf(
                        NodeKind::NamespaceUseClause { kind, fqn: full, alias },
                        Span::join(member_start, self.cur().span),
                    ));
                    if self.at_op(",") {
                        self.advance();
                        continue;
                    }
                    break;
                }
                self.expect_op("}");
                fqn = String::new();
            } else {
                let alias = if self.at_kw("as") {
                    self.advance();
                    Some(self.parse_name_text())
                } else {
                    None
                };
                if !fqn.is_empty() {
                    children.push(Node::leaf(
                        NodeKind::NamespaceUseClause { kind, fqn, alias },
                        Span::join(clause_start, self.cur().span),
                    ));
                }
            }
            if self.at_op(",") {
                self.advance();
                continue;
            }
            break;
        }
        self.expect_op(";");
        Node::new(NodeKind::NamespaceUseDeclaration, Span::join(start, self.cur().span), children)
    }

    fn parse_class_like(&mut self) -> Node {
        let start = self.cur().span;
        while self.at_kw("abstract") || self.at_kw("final") {
            self.advance();
        }
        let kind = if self.at_kw("interface") {
            self.advance();
            ClassLikeKind::Interface
        } else if self.at_kw("trait") {
            self.advance();
            ClassLikeKind::Trait
        } else if self.at_kw("enum") {
            self.advance();
            ClassLikeKind::Enum
        } else {
            self.advance(); // class
            ClassLikeKind::Class
        };
        let name = self.parse_name_text();

        // Enums may carry a backing type: `enum Suit: string`.
        if self.at_op(":") {
            self.advance();
            self.parse_type_hint();
        }

        let mut extends = Vec::new();
        if self.at_kw("extends") {
            self.advance();
            loop {
                extends.push(self.parse_name_text());
                if self.at_op(",") {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        let mut implements = Vec::new();
        if self.at_kw("implements") {
            self.advance();
            loop {
                implements.push(self.parse_name_text());
                if self.at_op(",") {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        let body = self.parse_class_body();
        let end = body.span;
        Node::new(
            NodeKind::ClassLike { kind, name, extends, implements },
            Span::join(start, end),
            vec![body],
        )
    }

    fn parse_class_body(&mut self) -> Node {
        let start = self.cur().span;
        self.expect_op("{");
        let mut children = Vec::new();
        while !self.at_eof() && !self.at_op("}") {
            let before = self.pos;
            children.push(self.parse_class_member());
            if self.pos == before {
                self.advance();
            }
        }
        let end = self.cur().span;
        self.expect_op("}");
        Node::new(NodeKind::ClassBody, Span::join(start, end), children)
    }

    fn parse_class_member(&mut self) -> Node {
        let start = self.cur().span;
        let doc = self.doc_here();

        if self.at_kw("use") {
            self.advance();
            let mut names = Vec::new();
            loop {
                names.push(self.parse_name_text());
                if self.at_op(",") {
                    self.advance();
                    continue;
                }
                break;
            }
            if self.at_op("{") {
                self.skip_balanced("{", "}");
            } else {
                self.expect_op(";");
            }
            return Node::leaf(NodeKind::TraitUseClause { names }, Span::join(start, self.cur().span));
        }

        let mut modifiers = ModifierMask::NONE;
        loop {
            let mut matched = false;
            for (kw, flag) in MEMBER_MODIFIERS {
                if self.at_kw(kw) {
                    modifiers = modifiers.with(*flag);
                    self.advance();
                    matched = true;
                    break;
                }
            }
            if !matched {
                break;
            }
        }
        if modifiers == ModifierMask::NONE {
            modifiers = ModifierMask::PUBLIC;
        }

        if self.at_kw("const") {
            self.advance();
            // Constants may carry a type hint before the name in PHP 8.3+,
            // but only when followed by another identifier then `=`.
            let mut nodes = Vec::new();
            loop {
                let name = self.parse_name_text();
                self.expect_op("=");
                self.skip_until_value_end();
                let doc_type = docblock::extract_tag_type(doc.as_deref(), "var");
                nodes.push((name, doc_type));
                if self.at_op(",") {
                    self.advance();
                    continue;
                }
                break;
            }
            self.expect_op(";");
            if nodes.len() == 1 {
                let (name, type_hint) = nodes.into_iter().next().unwrap();
                return Node::leaf(NodeKind::ConstDeclaration { name, type_hint }, Span::join(start, self.cur().span));
            }
            let end = self.cur().span;
            let children = nodes
                .into_iter()
                .map(|(name, type_hint)| Node::leaf(NodeKind::ConstDeclaration { name, type_hint }, Span::join(start, end)))
                .collect();
            return Node::new(NodeKind::ClassBody, Span::join(start, end), children);
        }

        if self.at_kw("function") {
            self.advance();
            if self.at_op("&") {
                self.advance();
            }
            let name = self.parse_name_text();
            let params = self.parse_parameter_list(doc.as_deref());
            let mut return_type = None;
            if self.at_op(":") {
                self.advance();
                return_type = self.parse_type_hint();
            }
            let doc_return_type = docblock::extract_tag_type(doc.as_deref(), "return");
            let mut children = vec![params];
            if self.at_op("{") {
                children.push(self.parse_block());
            } else {
                self.expect_op(";");
            }
            let end = children.last().map(|c: &Node| c.span).unwrap_or(start);
            return Node::new(
                NodeKind::MethodDeclaration { name, modifiers, return_type, doc_return_type },
                Span::join(start, end),
                children,
            );
        }

        if self.cur().kind == TokenKind::Identifier || self.cur().kind == TokenKind::Variable {
            let type_hint = if self.cur().kind == TokenKind::Identifier {
                self.parse_type_hint()
            } else {
                None
            };
            let mut nodes = Vec::new();
            while self.cur().kind == TokenKind::Variable {
                let name = self.advance().text.trim_start_matches('$').to_string();
                if self.at_op("=") {
                    self.advance();
                    self.skip_until_value_end();
                } else if self.at_op(",") {
                    self.advance();
                } else {
                    break;
                }
                nodes.push(name);
            }
            self.expect_op(";");
            let doc_type = type_hint
                .clone()
                .or_else(|| docblock::extract_tag_type(doc.as_deref(), "var"));
            if nodes.len() == 1 {
                let name = nodes.into_iter().next().unwrap();
                return Node::leaf(
                    NodeKind::PropertyDeclaration { name, modifiers, type_hint: doc_type },
                    Span::join(start, self.cur().span),
                );
            }
            let end = self.cur().span;
            let children = nodes
                .into_iter()
                .map(|name| Node::leaf(NodeKind::PropertyDeclaration { name, modifiers, type_hint: doc_type.clone() }, Span::join(start, end)))
                .collect();
            return Node::new(NodeKind::ClassBody, Span::join(start, end), children);
        }

        self.error_here("class member");
        Node::leaf(NodeKind::Unknown, start)
    }

    fn skip_until_value_end(&mut self) {
        let mut depth = 0i32;
        while !self.at_eof() {
            if self.at_op("(") || self.at_op("[") || self.at_op("{") {
                depth += 1;
            } else if self.at_op(")") || self.at_op("]") || self.at_op("}") {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            } else if depth == 0 && (self.at_op(",") || self.at_op(";")) {
                break;
            }
            self.advance();
        }
    }

    fn parse_parameter_list(&mut self, method_doc: Option<&str>) -> Node {
        let start = self.cur().span;
        self.expect_op("(");
        let mut children = Vec::new();
        while !self.at_eof() && !self.at_op(")") {
            while self.at_kw("public") || self.at_kw("protected") || self.at_kw("private") || self.at_kw("readonly") {
                self.advance();
            }
            let type_hint = if self.cur().kind == TokenKind::Identifier || self.at_op("?") {
                self.parse_type_hint()
            } else {
                None
            };
            let by_ref = if self.at_op("&") {
                self.advance();
                true
            } else {
                false
            };
            let variadic = if self.at_op("...") {
                self.advance();
                true
            } else {
                false
            };
            let name = if self.cur().kind == TokenKind::Variable {
                self.advance().text
            } else {
                String::new()
            };
            let has_default = if self.at_op("=") {
                self.advance();
                self.skip_until_value_end();
                true
            } else {
                false
            };
            let doc_type = docblock::extract_param_tag(method_doc, &name);
            let span = Span::join(start, self.cur().span);
            children.push(Node::leaf(
                NodeKind::Parameter { name, type_hint, doc_type, variadic, by_ref, has_default },
                span,
            ));
            if self.at_op(",") {
                self.advance();
                continue;
            }
            break;
        }
        let end = self.cur().span;
        self.expect_op(")");
        Node::new(NodeKind::ParameterList, Span::join(start, end), children)
    }

    fn parse_function_decl(&mut self) -> Node {
        let start = self.cur().span;
        let doc = self.doc_here();
        self.advance(); // function
        if self.at_op("&") {
            self.advance();
        }
        let name = self.parse_name_text();
        let params = self.parse_parameter_list(doc.as_deref());
        let mut return_type = None;
        if self.at_op(":") {
            self.advance();
            return_type = self.parse_type_hint();
        }
        let doc_return_type = docblock::extract_tag_type(doc.as_deref(), "return");
        let mut children = vec![params];
        if self.at_op("{") {
            children.push(self.parse_block());
        } else {
            self.expect_op(";");
        }
        let end = children.last().map(|c: &Node| c.span).unwrap_or(start);
        Node::new(
            NodeKind::FunctionDeclaration { name, return_type, doc_return_type },
            Span::join(start, end),
            children,
        )
    }

    fn parse_block(&mut self) -> Node {
        let start = self.cur().span;
        self.expect_op("{");
        let mut children = Vec::new();
        while !self.at_eof() && !self.at_op("}") {
            let before = self.pos;
            children.push(self.parse_statement());
            if self.pos == before {
                self.advance();
            }
        }
        let end = self.cur().span;
        self.expect_op("}");
        Node::new(NodeKind::Block, Span::join(start, end), children)
    }

    /// A statement body that may be a `{ ... }` block or a single statement
    /// (PHP's alternative single-statement `if`/`foreach` bodies).
    fn parse_body(&mut self) -> Node {
        if self.at_op("{") {
            self.parse_block()
        } else {
            self.parse_statement()
        }
    }

    fn parse_if(&mut self) -> Node {
        let start = self.cur().span;
        self.advance(); // if
        self.expect_op("(");
        let cond = self.parse_expression();
        self.expect_op(")");
        let then_body = self.parse_body();
        let mut children = vec![cond, then_body];
        while self.at_kw("elseif") || (self.at_kw("else") && matches!(self.tokens.get(self.pos + 1), Some(t) if t.kind == TokenKind::Identifier && t.text.eq_ignore_ascii_case("if"))) {
            let clause_start = self.cur().span;
            self.advance();
            if self.at_kw("if") {
                self.advance();
            }
            self.expect_op("(");
            let c = self.parse_expression();
            self.expect_op(")");
            let b = self.parse_body();
            let end = b.span;
            children.push(Node::new(NodeKind::ElseIfClause, Span::join(clause_start, end), vec![c, b]));
        }
        if self.at_kw("else") {
            let clause_start = self.cur().span;
            self.advance();
            let b = self.parse_body();
            let end = b.span;
            children.push(Node::new(NodeKind::ElseClause, Span::join(clause_start, end), vec![b]));
        }
        let end = children.last().map(|c: &Node| c.span).unwrap_or(start);
        Node::new(NodeKind::IfStatement, Span::join(start, end), children)
    }

    fn parse_switch(&mut self) -> Node {
        let start = self.cur().span;
        self.advance(); // switch
        self.expect_op("(");
        let subject = self.parse_expression();
        self.expect_op(")");
        self.expect_op("{");
        let mut children = vec![subject];
        while !self.at_eof() && !self.at_op("}") {
            let case_start = self.cur().span;
            if self.at_kw("case") {
                self.advance();
                let _label = self.parse_expression();
            } else if self.at_kw("default") {
                self.advance();
            } else {
                self.advance();
                continue;
            }
            if self.at_op(":") || self.at_op(";") {
                self.advance();
            }
            let mut body = Vec::new();
            while !self.at_eof()
                && !self.at_op("}")
                && !self.at_kw("case")
                && !self.at_kw("default")
            {
                let before = self.pos;
                body.push(self.parse_statement());
                if self.pos == before {
                    self.advance();
                }
            }
            let end = body.last().map(|c: &Node| c.span).unwrap_or(case_start);
            children.push(Node::new(NodeKind::CaseClause, Span::join(case_start, end), body));
        }
        let end = self.cur().span;
        self.expect_op("}");
        Node::new(NodeKind::SwitchStatement, Span::join(start, end), children)
    }

    fn parse_foreach(&mut self) -> Node {
        let start = self.cur().span;
        self.advance(); // foreach
        self.expect_op("(");
        let iterable = self.parse_expression();
        let mut key_var = None;
        let mut value_var = None;
        if self.at_kw("as") {
            self.advance();
            if self.at_op("&") {
                self.advance();
            }
            let first = if self.cur().kind == TokenKind::Variable {
                Some(self.advance().text)
            } else {
                None
            };
            if self.at_op("=>") {
                self.advance();
                if self.at_op("&") {
                    self.advance();
                }
                key_var = first;
                value_var = if self.cur().kind == TokenKind::Variable {
                    Some(self.advance().text)
                } else {
                    None
                };
            } else {
                value_var = first;
            }
        }
        self.expect_op(")");
        let body = self.parse_body();
        let end = body.span;
        Node::new(
            NodeKind::ForeachStatement { key_var, value_var },
            Span::join(start, end),
            vec![iterable, body],
        )
    }

    fn parse_try(&mut self) -> Node {
        let start = self.cur().span;
        self.advance(); // try
        let try_body = self.parse_block();
        let mut children = vec![try_body];
        while self.at_kw("catch") {
            let clause_start = self.cur().span;
            self.advance();
            self.expect_op("(");
            let mut types = Vec::new();
            loop {
                types.push(self.parse_name_text());
                if self.at_op("|") {
                    self.advance();
                    continue;
                }
                break;
            }
            let variable = if self.cur().kind == TokenKind::Variable {
                Some(self.advance().text)
            } else {
                None
            };
            self.expect_op(")");
            let body = self.parse_block();
            let end = body.span;
            children.push(Node::new(
                NodeKind::CatchClause { types, variable },
                Span::join(clause_start, end),
                vec![body],
            ));
        }
        if self.at_kw("finally") {
            self.advance();
            children.push(self.parse_block());
        }
        let end = children.last().map(|c: &Node| c.span).unwrap_or(start);
        Node::new(NodeKind::TryStatement, Span::join(start, end), children)
    }

    fn parse_return(&mut self) -> Node {
        let start = self.cur().span;
        self.advance(); // return
        let mut children = Vec::new();
        if !self.at_op(";") {
            children.push(self.parse_expression());
        }
        self.expect_op(";");
        Node::new(NodeKind::ReturnStatement, Span::join(start, self.cur().span), children)
    }

    fn parse_expression_statement(&mut self) -> Node {
        let start = self.cur().span;
        let doc = self.doc_here();
        let doc_var_type = docblock::extract_tag_type(doc.as_deref(), "var");
        let expr = self.parse_expression();
        self.expect_op(";");
        Node::new(NodeKind::ExpressionStatement { doc_var_type }, Span::join(start, self.cur().span), vec![expr])
    }

    // ---- expressions ----------------------------------------------------

    fn parse_expression(&mut self) -> Node {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Node {
        if self.at_kw("list") && matches!(self.tokens.get(self.pos + 1), Some(t) if t.text == "(") {
            return self.parse_list_assignment(false);
        }
        if self.at_op("[") && self.looks_like_destructure() {
            return self.parse_list_assignment(true);
        }

        let left = self.parse_ternary();
        const ASSIGN_OPS: &[&str] = &["=", "+=", "-=", "*=", "/=", ".=", "??="];
        if let Some(op) = ASSIGN_OPS.iter().find(|op| self.at_op(op)) {
            let _ = op;
            self.advance();
            let right = self.parse_assignment();
            let span = Span::join(left.span, right.span);
            return Node::new(NodeKind::Assignment, span, vec![left, right]);
        }
        left
    }

    fn looks_like_destructure(&self) -> bool {
        let mut depth = 0i32;
        let mut i = self.pos;
        while let Some(t) = self.tokens.get(i) {
            match t.kind {
                TokenKind::Operator if t.text == "[" => depth += 1,
                TokenKind::Operator if t.text == "]" => {
                    depth -= 1;
                    if depth == 0 {
                        return matches!(self.tokens.get(i + 1), Some(n) if n.kind == TokenKind::Operator && n.text == "=");
                    }
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn parse_list_assignment(&mut self, bracket: bool) -> Node {
        let start = self.cur().span;
        let (open, close) = if bracket { ("[", "]") } else { self.advance(); ("(", ")") };
        self.expect_op(open);
        let mut targets = Vec::new();
        while !self.at_eof() && !self.at_op(close) {
            if self.cur().kind == TokenKind::Variable {
                targets.push(self.advance().text);
            } else if self.at_op(",") {
                // skipped element
            } else {
                self.advance();
                continue;
            }
            if self.at_op(",") {
                self.advance();
            }
        }
        self.expect_op(close);
        self.expect_op("=");
        let rhs = self.parse_assignment();
        let span = Span::join(start, rhs.span);
        Node::new(NodeKind::ListAssignment { targets }, span, vec![rhs])
    }

    fn parse_ternary(&mut self) -> Node {
        let cond = self.parse_instanceof();
        if self.at_op("?") {
            self.advance();
            if self.at_op(":") {
                self.advance();
                let else_branch = self.parse_ternary();
                let span = Span::join(cond.span, else_branch.span);
                return Node::new(NodeKind::Ternary { short: true }, span, vec![cond, else_branch]);
            }
            let then_branch = self.parse_ternary();
            self.expect_op(":");
            let else_branch = self.parse_ternary();
            let span = Span::join(cond.span, else_branch.span);
            return Node::new(NodeKind::Ternary { short: false }, span, vec![cond, then_branch, else_branch]);
        }
        cond
    }

    fn parse_instanceof(&mut self) -> Node {
        let left = self.parse_binary();
        if self.at_kw("instanceof") {
            self.advance();
            let class_name = if self.cur().kind == TokenKind::Identifier {
                self.advance().text
            } else if self.cur().kind == TokenKind::Variable {
                self.advance();
                String::new()
            } else {
                String::new()
            };
            let span = Span::join(left.span, self.cur().span);
            return Node::new(NodeKind::InstanceOf { class_name }, span, vec![left]);
        }
        left
    }

    /// A loose catch-all for binary/logical operators: we don't need
    /// operator precedence beyond keeping both operands reachable for type
    /// inference, since PHP binary operators don't appear in the expression
    /// resolver's dispatch table except through their operands.
    fn parse_binary(&mut self) -> Node {
        let mut left = self.parse_unary();
        const BIN_OPS: &[&str] = &[
            "??", "||", "&&", "==", "!=", "===", "!==", "<", ">", "<=", ">=", "<=>", "+", "-",
            "*", "/", ".", "%",
        ];
        while let Some(_op) = BIN_OPS.iter().find(|op| self.at_op(op)) {
            self.advance();
            let right = self.parse_unary();
            let span = Span::join(left.span, right.span);
            left = Node::new(NodeKind::Paren, span, vec![left, right]);
        }
        left
    }

    fn parse_unary(&mut self) -> Node {
        if self.at_kw("new") {
            return self.parse_new();
        }
        if self.at_op("!") || self.at_op("-") || self.at_op("+") || self.at_op("@") {
            self.advance();
            return self.parse_unary();
        }
        let primary = self.parse_primary();
        self.parse_postfix(primary)
    }

    fn parse_new(&mut self) -> Node {
        let start = self.cur().span;
        self.advance(); // new
        let class_name = if self.at_kw("class") {
            self.advance();
            String::new()
        } else if self.cur().kind == TokenKind::Identifier {
            self.advance().text
        } else if self.at_kw("static") || self.at_kw("self") || self.at_kw("parent") {
            self.advance().text
        } else {
            String::new()
        };
        if self.at_op("(") {
            self.skip_balanced("(", ")");
        }
        if self.at_op("{") {
            // anonymous class body
            self.skip_balanced("{", "}");
        }
        let node = Node::leaf(NodeKind::ObjectCreation { class_name }, Span::join(start, self.cur().span));
        self.parse_postfix(node)
    }

    fn parse_postfix(&mut self, mut base: Node) -> Node {
        loop {
            if self.at_op("->") || self.at_op("?->") {
                self.advance();
                let name = if self.cur().kind == TokenKind::Identifier {
                    self.advance().text
                } else if self.at_op("{") {
                    self.skip_balanced("{", "}");
                    String::new()
                } else if self.cur().kind == TokenKind::Variable {
                    self.advance();
                    String::new()
                } else {
                    String::new()
                };
                if self.at_op("(") {
                    self.skip_balanced("(", ")");
                    let span = Span::join(base.span, self.cur().span);
                    base = Node::new(NodeKind::MethodCall { name }, span, vec![base]);
                } else {
                    let span = Span::join(base.span, self.cur().span);
                    base = Node::new(NodeKind::PropertyAccess { name }, span, vec![base]);
                }
            } else if self.at_op("::") {
                self.advance();
                if self.cur().kind == TokenKind::Variable {
                    let name = self.advance().text;
                    let span = Span::join(base.span, self.cur().span);
                    base = Node::new(NodeKind::ScopedPropertyAccess { name }, span, vec![base]);
                } else if self.cur().kind == TokenKind::Identifier {
                    let name = self.advance().text;
                    if self.at_op("(") {
                        self.skip_balanced("(", ")");
                        let span = Span::join(base.span, self.cur().span);
                        base = Node::new(NodeKind::ScopedCall { name }, span, vec![base]);
                    } else {
                        let span = Span::join(base.span, self.cur().span);
                        base = Node::new(NodeKind::ScopedConstantAccess { name }, span, vec![base]);
                    }
                } else {
                    break;
                }
            } else if self.at_op("(") {
                let call_start = self.cur().span;
                self.skip_balanced("(", ")");
                let span = Span::join(base.span, Span::join(call_start, self.cur().span));
                base = match base.kind {
                    NodeKind::QualifiedName { text } => Node::new(NodeKind::FunctionCall { name: text }, span, vec![]),
                    _ => Node::new(NodeKind::FunctionCall { name: String::new() }, span, vec![base]),
                };
            } else if self.at_op("[") {
                self.advance();
                let index = if !self.at_op("]") { Some(self.parse_expression()) } else { None };
                let end = self.cur().span;
                self.expect_op("]");
                let span = Span::join(base.span, end);
                let mut children = vec![base];
                if let Some(idx) = index {
                    children.push(idx);
                }
                base = Node::new(NodeKind::Subscript, span, children);
            } else {
                break;
            }
        }
        base
    }

    /// `function (...) use (...) { ... }` expression closure.
    fn parse_closure(&mut self) -> Node {
        let start = self.cur().span;
        self.advance(); // function
        if self.at_op("&") {
            self.advance();
        }
        let params = self.parse_parameter_list(None);
        let mut uses = Vec::new();
        if self.at_kw("use") {
            self.advance();
            self.expect_op("(");
            while !self.at_eof() && !self.at_op(")") {
                if self.at_op("&") {
                    self.advance();
                }
                if self.cur().kind == TokenKind::Variable {
                    uses.push(self.advance().text);
                }
                if self.at_op(",") {
                    self.advance();
                    continue;
                }
                break;
            }
            self.expect_op(")");
        }
        if self.at_op(":") {
            self.advance();
            self.parse_type_hint();
        }
        let mut children = vec![params];
        if self.at_op("{") {
            children.push(self.parse_block());
        }
        let end = children.last().map(|c: &Node| c.span).unwrap_or(start);
        Node::new(NodeKind::AnonymousFunction { uses }, Span::join(start, end), children)
    }

    /// `fn (...) => expr` arrow function. Arrow functions auto-capture the
    /// enclosing scope by value; we don't enumerate that capture set here,
    /// so its carried-variable list is left empty (a documented
    /// simplification — see DESIGN.md).
    fn parse_arrow_fn(&mut self) -> Node {
        let start = self.cur().span;
        self.advance(); // fn
        if self.at_op("&") {
            self.advance();
        }
        let params = self.parse_parameter_list(None);
        if self.at_op(":") {
            self.advance();
            self.parse_type_hint();
        }
        self.expect_op("=>");
        let body = self.parse_assignment();
        let span = Span::join(start, body.span);
        Node::new(NodeKind::AnonymousFunction { uses: Vec::new() }, span, vec![params, body])
    }

    fn parse_primary(&mut self) -> Node {
        let start = self.cur().span;
        match self.cur().kind {
            TokenKind::Variable => {
                let name = self.advance().text;
                Node::leaf(NodeKind::SimpleVariable { name }, Span::join(start, self.cur().span))
            }
            TokenKind::Number => {
                let text = self.advance().text;
                let kind = if text.contains('.') { LiteralKind::Float } else { LiteralKind::Int };
                Node::leaf(NodeKind::Literal { kind, text }, Span::join(start, self.cur().span))
            }
            TokenKind::StringLiteral => {
                let text = self.advance().text;
                Node::leaf(NodeKind::Literal { kind: LiteralKind::String, text }, Span::join(start, self.cur().span))
            }
            TokenKind::Identifier if self.cur().text.eq_ignore_ascii_case("function") => self.parse_closure(),
            TokenKind::Identifier if self.cur().text.eq_ignore_ascii_case("fn") => self.parse_arrow_fn(),
            TokenKind::Identifier if self.at_kw("static") && matches!(self.tokens.get(self.pos + 1), Some(t) if t.kind == TokenKind::Identifier && (t.text.eq_ignore_ascii_case("function") || t.text.eq_ignore_ascii_case("fn"))) => {
                self.advance();
                self.parse_primary()
            }
            TokenKind::Identifier => {
                let text = self.advance().text;
                let lower = text.to_ascii_lowercase();
                match lower.as_str() {
                    "true" | "false" => Node::leaf(NodeKind::Literal { kind: LiteralKind::Bool, text }, Span::join(start, self.cur().span)),
                    "null" => Node::leaf(NodeKind::Literal { kind: LiteralKind::Null, text }, Span::join(start, self.cur().span)),
                    "array" if self.at_op("(") => {
                        let open = self.cur().span;
                        self.skip_balanced("(", ")");
                        Node::leaf(NodeKind::ArrayLiteral, Span::join(open, self.cur().span))
                    }
                    _ => Node::leaf(NodeKind::QualifiedName { text }, Span::join(start, self.cur().span)),
                }
            }
            TokenKind::Operator if self.cur().text == "(" => {
                self.advance();
                let inner = self.parse_expression();
                let end = self.cur().span;
                self.expect_op(")");
                Node::new(NodeKind::Paren, Span::join(start, end), vec![inner])
            }
            TokenKind::Operator if self.cur().text == "[" => {
                self.advance();
                let mut children = Vec::new();
                while !self.at_eof() && !self.at_op("]") {
                    children.push(self.parse_expression());
                    if self.at_op("=>") {
                        self.advance();
                        children.push(self.parse_expression());
                    }
                    if self.at_op(",") {
                        self.advance();
                    }
                }
                let end = self.cur().span;
                self.expect_op("]");
                Node::new(NodeKind::ArrayLiteral, Span::join(start, end), children)
            }
            _ => {
                self.error_here("expression");
                let tok = self.advance();
                Node::leaf(NodeKind::Unknown, tok.span)
            }
        }
    }
}
