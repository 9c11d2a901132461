//! Structural Ruby parser.
//!
//! Builds a tree that only distinguishes what declaration discovery needs:
//! namespaces, method definitions, identifier calls at statement start, bare
//! identifiers and `yield`. Everything else is a [`Node::Group`] of whatever
//! structural nodes it contains, so blocks, conditionals and literals nest
//! correctly without being modelled.

use super::lexer::{tokenize, Keyword, Token, TokenKind};
use crate::error::ParseError;
use crate::model::{Param, ParamKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Module(Namespace),
    Class(Namespace),
    /// `class << self`
    SingletonClass { line: usize, body: Vec<Node> },
    Def(Def),
    Call(Call),
    /// Identifier statement without arguments, e.g. `private`.
    VCall { name: String, line: usize },
    Yield { args: Vec<String>, line: usize },
    Group(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    /// `class Foo::Bar` gives `["Foo", "Bar"]`
    pub path: Vec<String>,
    pub line: usize,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Def {
    pub name: String,
    /// `self`, or a constant for `def Foo.bar`
    pub receiver: Option<String>,
    pub params: Vec<Param>,
    pub raw_params: String,
    pub body: Vec<Node>,
    pub line: usize,
}

/// Receiverless call at statement start: `private :a`, `scope(:x, ...)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Arg>,
    /// Structural nodes found in the arguments and the attached block.
    pub body: Vec<Node>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Symbol(String),
    Def(Def),
    Expr(String),
}

/// Parse Ruby source into a list of top-level nodes.
pub fn parse(src: &str) -> Result<Vec<Node>, ParseError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        src,
        tokens,
        pos: 0,
        last: None,
    };
    parser.body(Closer::Eof)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closer {
    Eof,
    End,
    Brace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// Newline or `;` ends the expression.
    Statement,
    /// Like `Statement`, also stops before `do` and `then` (loop conditions).
    Condition,
    /// One argument of a call: stops at `,`; newlines only matter unbracketed.
    Arg { bracketed: bool },
    /// Inside `(...)` or `[...]`: runs to the given closer.
    Bracket(TokenKind),
}

enum CallShape {
    Bare,
    Paren,
    Command,
}

struct Parser<'a> {
    src: &'a str,
    tokens: Vec<Token<'a>>,
    pos: usize,
    /// Last consumed token other than a newline.
    last: Option<Token<'a>>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<Token<'a>> {
        self.tokens.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<Token<'a>> {
        let tok = self.peek()?;
        self.pos += 1;
        if tok.kind != TokenKind::Newline {
            self.last = Some(tok);
        }
        Some(tok)
    }

    fn line(&self) -> usize {
        self.peek()
            .or(self.last)
            .map_or(1, |t| t.line)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) {
            self.bump();
        }
    }

    fn unexpected(&self, tok: Token<'_>) -> ParseError {
        ParseError::new(tok.line, format!("unexpected `{}`", tok.text.trim()))
    }

    fn expect(&mut self, kind: TokenKind, what: &str, opened_at: usize) -> Result<(), ParseError> {
        match self.peek() {
            Some(tok) if tok.kind == kind => {
                self.bump();
                Ok(())
            }
            Some(tok) => Err(self.unexpected(tok)),
            None => Err(ParseError::new(opened_at, format!("unclosed `{}`", what))),
        }
    }

    // -- Bodies and statements ------------------------------------------------

    fn body(&mut self, closer: Closer) -> Result<Vec<Node>, ParseError> {
        let opened_at = self.last.map_or(1, |t| t.line);
        let mut nodes = Vec::new();
        loop {
            while self
                .peek()
                .is_some_and(|t| matches!(t.kind, TokenKind::Newline | TokenKind::Semi))
            {
                self.bump();
            }
            let Some(tok) = self.peek() else {
                return match closer {
                    Closer::Eof => Ok(nodes),
                    Closer::End => Err(ParseError::new(opened_at, "missing `end`")),
                    Closer::Brace => Err(ParseError::new(opened_at, "unclosed `{`")),
                };
            };
            match (tok.kind, closer) {
                (TokenKind::Keyword(Keyword::End), Closer::End)
                | (TokenKind::RBrace, Closer::Brace) => {
                    self.bump();
                    return Ok(nodes);
                }
                (
                    TokenKind::Keyword(Keyword::End)
                    | TokenKind::RBrace
                    | TokenKind::RParen
                    | TokenKind::RBracket,
                    _,
                ) => return Err(self.unexpected(tok)),
                _ => self.statement(&mut nodes)?,
            }
        }
    }

    fn statement(&mut self, out: &mut Vec<Node>) -> Result<(), ParseError> {
        match self.call_shape() {
            Some(shape) => self.call(shape, out),
            None => self.expression(out, Stop::Statement, false),
        }
    }

    /// Decide whether the identifier at statement start is a receiverless call.
    fn call_shape(&self) -> Option<CallShape> {
        let tok = self.peek()?;
        if tok.kind != TokenKind::Ident {
            return None;
        }
        let Some(next) = self.peek_at(1) else {
            return Some(CallShape::Bare);
        };
        match next.kind {
            TokenKind::Newline
            | TokenKind::Semi
            | TokenKind::RBrace
            | TokenKind::Keyword(
                Keyword::End
                | Keyword::If
                | Keyword::Unless
                | Keyword::While
                | Keyword::Until
                | Keyword::Do,
            ) => Some(CallShape::Bare),
            TokenKind::LParen if !next.space_before => Some(CallShape::Paren),
            _ if next.space_before && self.starts_argument(1) => Some(CallShape::Command),
            TokenKind::LBrace if next.space_before => Some(CallShape::Bare),
            _ => None,
        }
    }

    /// Whether the token at `offset` can begin an unparenthesised argument.
    fn starts_argument(&self, offset: usize) -> bool {
        let Some(tok) = self.peek_at(offset) else {
            return false;
        };
        let tight = || {
            self.peek_at(offset + 1)
                .is_some_and(|n| !n.space_before && n.kind != TokenKind::Newline)
        };
        match tok.kind {
            TokenKind::Symbol
            | TokenKind::Str
            | TokenKind::Number
            | TokenKind::Const
            | TokenKind::Ident
            | TokenKind::Var
            | TokenKind::Label
            | TokenKind::LBracket
            | TokenKind::LParen
            | TokenKind::ColonColon => true,
            TokenKind::Keyword(kw) => match kw {
                Keyword::Def
                | Keyword::SelfKw
                | Keyword::Nil
                | Keyword::True
                | Keyword::False
                | Keyword::ValueLike => true,
                Keyword::Logical => tok.text == "not",
                Keyword::Other => tok.text == "defined?",
                _ => false,
            },
            TokenKind::Op => match tok.text {
                "->" => true,
                "*" | "**" | "&" | "-" | "!" | "::" | ":" => tight(),
                _ => false,
            },
            _ => false,
        }
    }

    fn call(&mut self, shape: CallShape, out: &mut Vec<Node>) -> Result<(), ParseError> {
        let Some(name_tok) = self.bump() else {
            return Ok(());
        };
        let mut body = Vec::new();
        let args = match shape {
            CallShape::Bare => Vec::new(),
            CallShape::Paren => {
                let open = self.bump().map_or(name_tok.line, |t| t.line);
                let args = self.arguments(&mut body, true)?;
                self.skip_newlines();
                self.expect(TokenKind::RParen, "(", open)?;
                args
            }
            CallShape::Command => self.arguments(&mut body, false)?,
        };

        let mut block = false;
        if self.peek().is_some_and(|t| t.is_keyword(Keyword::Do)) {
            self.bump();
            self.do_block(&mut body)?;
            block = true;
        } else if self.at(TokenKind::LBrace) && matches!(shape, CallShape::Paren | CallShape::Bare) {
            self.bump();
            self.brace_block(&mut body)?;
            block = true;
        }

        let name = name_tok.text.to_string();
        if matches!(shape, CallShape::Bare) && !block {
            out.push(Node::VCall {
                name,
                line: name_tok.line,
            });
        } else {
            out.push(Node::Call(Call {
                name,
                args,
                body,
                line: name_tok.line,
            }));
        }
        // Modifiers and chained calls after the call itself.
        self.expression(out, Stop::Statement, true)
    }

    fn arguments(&mut self, out: &mut Vec<Node>, bracketed: bool) -> Result<Vec<Arg>, ParseError> {
        let mut args = Vec::new();
        loop {
            if bracketed {
                self.skip_newlines();
            }
            let Some(tok) = self.peek() else { break };
            let finished = match tok.kind {
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => true,
                TokenKind::Newline | TokenKind::Semi => !bracketed,
                TokenKind::Keyword(Keyword::End | Keyword::Do) => true,
                _ => false,
            };
            if finished {
                break;
            }

            if tok.is_keyword(Keyword::Def) {
                let def = self.def()?;
                let mut nested = Vec::new();
                self.expression(&mut nested, Stop::Arg { bracketed }, true)?;
                out.extend(nested);
                args.push(Arg::Def(def));
            } else {
                let first = self.pos;
                let mut nested = Vec::new();
                self.expression(&mut nested, Stop::Arg { bracketed }, false)?;
                let consumed: Vec<Token<'a>> = self.tokens[first..self.pos]
                    .iter()
                    .filter(|t| t.kind != TokenKind::Newline)
                    .copied()
                    .collect();
                out.extend(nested);
                match consumed.as_slice() {
                    [] => {
                        // Nothing consumable: avoid spinning on an odd token.
                        if self.at(TokenKind::Comma) {
                            self.bump();
                            continue;
                        }
                        break;
                    }
                    [sym] if sym.kind == TokenKind::Symbol => {
                        args.push(Arg::Symbol(symbol_name(sym.text)))
                    }
                    [first_tok, .., last_tok] => args.push(Arg::Expr(
                        self.src[first_tok.start..last_tok.end].trim().to_string(),
                    )),
                    [only] => args.push(Arg::Expr(only.text.to_string())),
                }
            }

            if self.at(TokenKind::Comma) {
                self.bump();
                self.skip_newlines();
            } else {
                break;
            }
        }
        Ok(args)
    }

    // -- Expressions ----------------------------------------------------------

    /// Consume one expression, collecting any structural nodes it contains.
    ///
    /// `started` says whether an operand has already been consumed, which
    /// turns a following `if`/`unless`/`while`/`until` into a modifier.
    fn expression(
        &mut self,
        out: &mut Vec<Node>,
        stop: Stop,
        mut started: bool,
    ) -> Result<(), ParseError> {
        while let Some(tok) = self.peek() {
            let modifier_position = started && self.last.is_some_and(|t| t.ends_value());
            match tok.kind {
                TokenKind::Newline => {
                    if matches!(stop, Stop::Bracket(_) | Stop::Arg { bracketed: true }) {
                        self.bump();
                        continue;
                    }
                    if started && (self.continues_line() || self.leading_dot_follows()) {
                        self.skip_newlines();
                        continue;
                    }
                    return Ok(());
                }
                TokenKind::Semi => {
                    if matches!(stop, Stop::Bracket(_)) {
                        self.bump();
                        continue;
                    }
                    return Ok(());
                }
                TokenKind::Comma => {
                    if matches!(stop, Stop::Arg { .. }) {
                        return Ok(());
                    }
                    self.bump();
                }
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    return match stop {
                        Stop::Bracket(closer) if closer != tok.kind => Err(self.unexpected(tok)),
                        _ => Ok(()),
                    };
                }
                TokenKind::Keyword(Keyword::End) => {
                    return match stop {
                        Stop::Bracket(_) => Err(self.unexpected(tok)),
                        _ => Ok(()),
                    };
                }
                TokenKind::Keyword(
                    Keyword::If | Keyword::Unless | Keyword::While | Keyword::Until,
                ) if modifier_position && matches!(stop, Stop::Arg { .. }) => {
                    return Ok(());
                }
                TokenKind::Keyword(Keyword::Do | Keyword::Then) if stop == Stop::Condition => {
                    return Ok(());
                }
                TokenKind::LParen | TokenKind::LBracket => {
                    self.bump();
                    let closer = if tok.kind == TokenKind::LParen {
                        TokenKind::RParen
                    } else {
                        TokenKind::RBracket
                    };
                    let mut nested = Vec::new();
                    self.expression(&mut nested, Stop::Bracket(closer), false)?;
                    let what = if closer == TokenKind::RParen { "(" } else { "[" };
                    self.expect(closer, what, tok.line)?;
                    push_group(out, nested);
                }
                TokenKind::LBrace => {
                    self.bump();
                    self.brace_block(out)?;
                }
                TokenKind::Keyword(Keyword::Do) => {
                    self.bump();
                    self.do_block(out)?;
                }
                TokenKind::Keyword(Keyword::If | Keyword::Unless) if !modifier_position => {
                    self.bump();
                    let nodes = self.body(Closer::End)?;
                    push_group(out, nodes);
                }
                TokenKind::Keyword(Keyword::While | Keyword::Until | Keyword::For)
                    if !modifier_position =>
                {
                    self.bump();
                    let mut nodes = Vec::new();
                    self.expression(&mut nodes, Stop::Condition, false)?;
                    if self.peek().is_some_and(|t| t.is_keyword(Keyword::Do)) {
                        self.bump();
                    }
                    nodes.extend(self.body(Closer::End)?);
                    push_group(out, nodes);
                }
                TokenKind::Keyword(Keyword::Case | Keyword::Begin) => {
                    self.bump();
                    let nodes = self.body(Closer::End)?;
                    push_group(out, nodes);
                }
                TokenKind::Keyword(Keyword::Class) => out.push(self.class()?),
                TokenKind::Keyword(Keyword::Module) => out.push(self.module()?),
                TokenKind::Keyword(Keyword::Def) => {
                    let def = self.def()?;
                    out.push(Node::Def(def));
                }
                TokenKind::Keyword(Keyword::Yield) => {
                    self.bump();
                    let args = self.yield_args(out)?;
                    out.push(Node::Yield {
                        args,
                        line: tok.line,
                    });
                }
                _ => {
                    self.bump();
                }
            }
            started = true;
        }
        Ok(())
    }

    /// A trailing operator, comma or `and`/`or` carries the expression over
    /// the newline.
    fn continues_line(&self) -> bool {
        self.last.is_some_and(|t| match t.kind {
            TokenKind::Op | TokenKind::Comma | TokenKind::Dot | TokenKind::ColonColon => true,
            TokenKind::Keyword(Keyword::Logical) => true,
            _ => false,
        })
    }

    /// Method chains written with the dot at the start of the next line.
    fn leading_dot_follows(&self) -> bool {
        self.tokens[self.pos..]
            .iter()
            .find(|t| t.kind != TokenKind::Newline)
            .is_some_and(|t| t.kind == TokenKind::Dot)
    }

    fn brace_block(&mut self, out: &mut Vec<Node>) -> Result<(), ParseError> {
        self.skip_block_params();
        let nodes = self.body(Closer::Brace)?;
        push_group(out, nodes);
        Ok(())
    }

    fn do_block(&mut self, out: &mut Vec<Node>) -> Result<(), ParseError> {
        self.skip_newlines();
        self.skip_block_params();
        let nodes = self.body(Closer::End)?;
        push_group(out, nodes);
        Ok(())
    }

    fn skip_block_params(&mut self) {
        match self.peek() {
            Some(t) if t.is_op("||") => {
                self.bump();
            }
            Some(t) if t.is_op("|") => {
                self.bump();
                while let Some(t) = self.bump() {
                    if t.is_op("|") {
                        break;
                    }
                }
            }
            _ => {}
        }
    }

    fn yield_args(&mut self, out: &mut Vec<Node>) -> Result<Vec<String>, ParseError> {
        let args = match self.peek() {
            Some(t) if t.kind == TokenKind::LParen && !t.space_before => {
                self.bump();
                let args = self.arguments(out, true)?;
                self.skip_newlines();
                self.expect(TokenKind::RParen, "(", t.line)?;
                args
            }
            Some(t) if t.space_before && self.starts_argument(0) => {
                self.arguments(out, false)?
            }
            _ => Vec::new(),
        };
        Ok(args
            .into_iter()
            .map(|arg| match arg {
                Arg::Symbol(name) => format!(":{}", name),
                Arg::Expr(text) => text,
                Arg::Def(def) => def.name,
            })
            .collect())
    }

    // -- Declarations ---------------------------------------------------------

    fn class(&mut self) -> Result<Node, ParseError> {
        let Some(kw) = self.bump() else {
            return Err(ParseError::new(self.line(), "expected `class`"));
        };
        if self.peek().is_some_and(|t| t.is_op("<<")) {
            self.bump();
            let mut ignored = Vec::new();
            self.expression(&mut ignored, Stop::Statement, false)?;
            let body = self.body(Closer::End)?;
            return Ok(Node::SingletonClass {
                line: kw.line,
                body,
            });
        }
        let path = self.constant_path(kw)?;
        let mut superclass = Vec::new();
        if self.peek().is_some_and(|t| t.is_op("<")) {
            self.bump();
            self.expression(&mut superclass, Stop::Statement, false)?;
        }
        let mut body = superclass;
        body.extend(self.body(Closer::End)?);
        Ok(Node::Class(Namespace {
            path,
            line: kw.line,
            body,
        }))
    }

    fn module(&mut self) -> Result<Node, ParseError> {
        let Some(kw) = self.bump() else {
            return Err(ParseError::new(self.line(), "expected `module`"));
        };
        let path = self.constant_path(kw)?;
        let body = self.body(Closer::End)?;
        Ok(Node::Module(Namespace {
            path,
            line: kw.line,
            body,
        }))
    }

    fn constant_path(&mut self, kw: Token<'_>) -> Result<Vec<String>, ParseError> {
        if self.at(TokenKind::ColonColon) {
            self.bump();
        }
        let mut path = Vec::new();
        loop {
            match self.peek() {
                Some(t) if t.kind == TokenKind::Const => {
                    self.bump();
                    path.push(t.text.to_string());
                }
                Some(t) => return Err(self.unexpected(t)),
                None => {
                    return Err(ParseError::new(
                        kw.line,
                        format!("expected a name after `{}`", kw.text),
                    ))
                }
            }
            let more = self.at(TokenKind::ColonColon)
                && self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Const);
            if !more {
                return Ok(path);
            }
            self.bump();
        }
    }

    fn def(&mut self) -> Result<Def, ParseError> {
        let Some(kw) = self.bump() else {
            return Err(ParseError::new(self.line(), "expected `def`"));
        };

        let receiver = match (self.peek(), self.peek_at(1)) {
            (Some(r), Some(dot))
                if dot.kind == TokenKind::Dot
                    && matches!(
                        r.kind,
                        TokenKind::Keyword(Keyword::SelfKw) | TokenKind::Const | TokenKind::Ident
                    ) =>
            {
                self.bump();
                self.bump();
                Some(r.text.to_string())
            }
            _ => None,
        };
        let name = self.method_name(kw)?;
        let (params, raw_params) = self.def_params()?;

        let body = if self.peek().is_some_and(|t| t.is_op("=")) {
            // Endless definition: `def name(args) = expression`
            self.bump();
            let mut nodes = Vec::new();
            self.expression(&mut nodes, Stop::Statement, false)?;
            nodes
        } else {
            self.body(Closer::End)?
        };

        Ok(Def {
            name,
            receiver,
            params,
            raw_params,
            body,
            line: kw.line,
        })
    }

    fn method_name(&mut self, kw: Token<'_>) -> Result<String, ParseError> {
        let Some(tok) = self.bump() else {
            return Err(ParseError::new(kw.line, "expected a method name after `def`"));
        };
        let mut name = match tok.kind {
            TokenKind::Ident | TokenKind::Const | TokenKind::Keyword(_) => tok.text.to_string(),
            TokenKind::Op => {
                let mut name = tok.text.to_string();
                // Unary `+@`, `-@`, `!@`, `~@`
                if self.peek().is_some_and(|t| t.is_op("@") && !t.space_before) {
                    self.bump();
                    name.push('@');
                }
                return Ok(name);
            }
            TokenKind::LBracket => {
                self.expect(TokenKind::RBracket, "[", tok.line)?;
                "[]".to_string()
            }
            _ => return Err(self.unexpected(tok)),
        };
        // Setters: `name=(value)`, `[]=(key, value)`
        let setter = self.peek().is_some_and(|t| t.is_op("=") && !t.space_before)
            && self
                .peek_at(1)
                .is_some_and(|t| t.kind == TokenKind::LParen && !t.space_before);
        if setter {
            self.bump();
            name.push('=');
        }
        Ok(name)
    }

    fn def_params(&mut self) -> Result<(Vec<Param>, String), ParseError> {
        let Some(first) = self.peek() else {
            return Ok((Vec::new(), String::new()));
        };
        if first.kind == TokenKind::LParen && !first.space_before {
            self.bump();
            let inner_start = self.pos;
            let mut depth = 0usize;
            loop {
                let Some(tok) = self.peek() else {
                    return Err(ParseError::new(first.line, "unclosed `(`"));
                };
                match tok.kind {
                    TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                    TokenKind::RParen if depth == 0 => break,
                    TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                        depth = depth.saturating_sub(1)
                    }
                    _ => {}
                }
                self.bump();
            }
            let inner_end = self.pos;
            let Some(close) = self.bump() else {
                return Err(ParseError::new(first.line, "unclosed `(`"));
            };
            let params = parse_params(&self.tokens[inner_start..inner_end]);
            return Ok((params, self.src[first.start..close.end].to_string()));
        }

        let unparenthesised = !matches!(
            first.kind,
            TokenKind::Newline | TokenKind::Semi | TokenKind::Keyword(Keyword::End)
        ) && !first.is_op("=");
        if !unparenthesised {
            return Ok((Vec::new(), String::new()));
        }
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            match tok.kind {
                TokenKind::Newline | TokenKind::Semi if depth == 0 => break,
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.bump();
        }
        let tokens = &self.tokens[start..self.pos];
        let raw = match (tokens.first(), tokens.last()) {
            (Some(a), Some(b)) => self.src[a.start..b.end].to_string(),
            _ => String::new(),
        };
        Ok((parse_params(tokens), raw))
    }
}

fn push_group(out: &mut Vec<Node>, nodes: Vec<Node>) {
    if !nodes.is_empty() {
        out.push(Node::Group(nodes));
    }
}

/// `:name` / `:"name"` to `name`
fn symbol_name(text: &str) -> String {
    let name = text.trim_start_matches(':');
    name.trim_matches(|c| c == '"' || c == '\'').to_string()
}

/// Split a parameter token list at top-level commas and classify each entry.
fn parse_params(tokens: &[Token<'_>]) -> Vec<Param> {
    let mut groups: Vec<Vec<Token<'_>>> = vec![Vec::new()];
    let mut depth = 0usize;
    for tok in tokens {
        match tok.kind {
            TokenKind::Newline => continue,
            TokenKind::Comma if depth == 0 => {
                groups.push(Vec::new());
                continue;
            }
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
            TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                depth = depth.saturating_sub(1)
            }
            _ => {}
        }
        if let Some(group) = groups.last_mut() {
            group.push(*tok);
        }
    }

    groups
        .iter()
        .filter_map(|group| {
            let first = group.first()?;
            let ident_after = || {
                group
                    .get(1)
                    .filter(|t| t.kind == TokenKind::Ident)
                    .map_or(String::new(), |t| t.text.to_string())
            };
            let param = match first.kind {
                TokenKind::Op if first.text == "*" => Param::new(ident_after(), ParamKind::Rest),
                TokenKind::Op if first.text == "**" => {
                    Param::new(ident_after(), ParamKind::KeywordRest)
                }
                TokenKind::Op if first.text == "&" => Param::new(ident_after(), ParamKind::Block),
                TokenKind::Op if first.text == "..." => Param::new("", ParamKind::Rest),
                TokenKind::Label => {
                    let name = first.text.trim_end_matches(':');
                    let kind = if group.len() > 1 {
                        ParamKind::KeywordOptional
                    } else {
                        ParamKind::KeywordRequired
                    };
                    Param::new(name, kind)
                }
                TokenKind::Ident => {
                    let kind = if group.get(1).is_some_and(|t| t.is_op("=")) {
                        ParamKind::Optional
                    } else {
                        ParamKind::Required
                    };
                    Param::new(first.text, kind)
                }
                // Destructuring `(a, b)`: named after its first element.
                TokenKind::LParen => {
                    let name = group.iter().find(|t| t.kind == TokenKind::Ident)?;
                    Param::new(name.text, ParamKind::Required)
                }
                _ => return None,
            };
            Some(param)
        })
        .collect()
}
