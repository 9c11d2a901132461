//! Ruby tokenizer.
//!
//! Produces just enough structure for declaration discovery: identifiers,
//! keywords, brackets and operators keep their text, while every kind of
//! literal (strings with interpolation, heredocs, `%`-literals, regexps,
//! character literals) collapses into a single [`TokenKind::Str`].

use crate::error::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Class,
    Module,
    Def,
    End,
    Do,
    Begin,
    If,
    Unless,
    While,
    Until,
    Case,
    For,
    Then,
    SelfKw,
    Yield,
    Nil,
    True,
    False,
    /// `return`, `next`, `super` and friends: may be followed by a modifier.
    ValueLike,
    /// `and`, `or`, `not`: the expression continues on the next line.
    Logical,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Const,
    /// `@ivar`, `@@cvar`, `$gvar`
    Var,
    Keyword(Keyword),
    /// `:name`, text includes the colon
    Symbol,
    /// `name:` hash key or keyword parameter, text includes the colon
    Label,
    Str,
    Number,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Semi,
    /// `.` or `&.`
    Dot,
    ColonColon,
    Newline,
    Op,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub space_before: bool,
}

impl Token<'_> {
    pub fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }

    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }

    /// Whether the token ends an operand, so that a following `if`, `/` or `?`
    /// is a modifier or an operator rather than the start of something new.
    pub fn ends_value(&self) -> bool {
        match self.kind {
            TokenKind::Ident
            | TokenKind::Const
            | TokenKind::Var
            | TokenKind::Str
            | TokenKind::Number
            | TokenKind::Symbol
            | TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace => true,
            TokenKind::Keyword(kw) => matches!(
                kw,
                Keyword::End
                    | Keyword::SelfKw
                    | Keyword::Nil
                    | Keyword::True
                    | Keyword::False
                    | Keyword::Yield
                    | Keyword::ValueLike
            ),
            _ => false,
        }
    }
}

/// Tokenize Ruby source. Comments, `=begin`/`=end` blocks and everything after
/// `__END__` are dropped; newlines are kept because they end statements.
pub fn tokenize(src: &str) -> Result<Vec<Token<'_>>, ParseError> {
    Lexer::new(src).run()
}

const BOM: char = '\u{feff}';

// Longest first so that `<=>` wins over `<=` and `<`.
const OPERATORS: &[&str] = &[
    "**=", "<=>", "===", "...", "<<=", ">>=", "&&=", "||=", "==", "!=", ">=", "<=", "&&", "||",
    "<<", ">>", "**", "=~", "!~", "+=", "-=", "*=", "/=", "%=", "|=", "&=", "^=", "=>", "->",
    "..", "&.", "+", "-", "*", "/", "%", "=", "<", ">", "!", "&", "|", "^", "~", "?", ":",
];

// Operators that may follow `:` to form a symbol such as `:[]=` or `:<=>`.
const SYMBOL_OPERATORS: &[&str] = &[
    "[]=", "[]", "<=>", "===", "==", "=~", "!=", "!~", "**", "+@", "-@", "<<", ">>", "<=", ">=",
    "+", "-", "*", "/", "%", "<", ">", "!", "~", "&", "|", "^",
];

struct Heredoc {
    id: String,
    indented: bool,
    line: usize,
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    /// First byte after a leading byte order mark.
    origin: usize,
    pos: usize,
    line: usize,
    space: bool,
    tokens: Vec<Token<'a>>,
    heredocs: Vec<Heredoc>,
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

fn is_ident_char(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

fn closing_delimiter(open: u8) -> u8 {
    match open {
        b'(' => b')',
        b'[' => b']',
        b'{' => b'}',
        b'<' => b'>',
        other => other,
    }
}

fn keyword(word: &str) -> Option<Keyword> {
    let kw = match word {
        "class" => Keyword::Class,
        "module" => Keyword::Module,
        "def" => Keyword::Def,
        "end" => Keyword::End,
        "do" => Keyword::Do,
        "begin" => Keyword::Begin,
        "if" => Keyword::If,
        "unless" => Keyword::Unless,
        "while" => Keyword::While,
        "until" => Keyword::Until,
        "case" => Keyword::Case,
        "for" => Keyword::For,
        "then" => Keyword::Then,
        "self" => Keyword::SelfKw,
        "yield" => Keyword::Yield,
        "nil" => Keyword::Nil,
        "true" => Keyword::True,
        "false" => Keyword::False,
        "return" | "next" | "break" | "redo" | "retry" | "super" | "__method__" | "__FILE__"
        | "__LINE__" | "__dir__" | "__ENCODING__" => Keyword::ValueLike,
        "and" | "or" | "not" => Keyword::Logical,
        "else" | "elsif" | "when" | "in" | "rescue" | "ensure" | "alias" | "undef"
        | "defined?" | "BEGIN" | "END" => Keyword::Other,
        _ => return None,
    };
    Some(kw)
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        let origin = if src.starts_with(BOM) { BOM.len_utf8() } else { 0 };
        Self {
            src,
            bytes: src.as_bytes(),
            origin,
            pos: origin,
            line: 1,
            space: false,
            tokens: Vec::new(),
            heredocs: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn last(&self) -> Option<&Token<'a>> {
        self.tokens.last()
    }

    fn prev_ends_value(&self) -> bool {
        self.last().is_some_and(Token::ends_value)
    }

    /// `foo /re/`, `puts %w[a]`, `p ?a`: an identifier, a space, and no space
    /// after the ambiguous character reads as a command argument.
    fn looks_like_argument(&self) -> bool {
        self.space
            && self.last().is_some_and(|t| t.kind == TokenKind::Ident)
            && self
                .peek(1)
                .is_some_and(|c| !c.is_ascii_whitespace() && c != b'=')
    }

    fn literal_allowed(&self) -> bool {
        !self.prev_ends_value() || self.looks_like_argument()
    }

    fn push(&mut self, kind: TokenKind, start: usize, line: usize) {
        self.tokens.push(Token {
            kind,
            text: &self.src[start..self.pos],
            start,
            end: self.pos,
            line,
            space_before: self.space,
        });
        self.space = false;
    }

    fn error(&self, line: usize, message: impl Into<String>) -> ParseError {
        ParseError::new(line, message)
    }

    fn run(mut self) -> Result<Vec<Token<'a>>, ParseError> {
        while self.pos < self.bytes.len() {
            let c = self.bytes[self.pos];
            let at_line_start = self.pos == self.origin || self.bytes[self.pos - 1] == b'\n';

            if at_line_start && c == b'=' && self.rest().starts_with("=begin") {
                self.skip_embedded_doc()?;
                continue;
            }
            if at_line_start && self.rest().starts_with("__END__") {
                let after = self.bytes.get(self.pos + 7).copied();
                if matches!(after, None | Some(b'\n') | Some(b'\r')) {
                    break;
                }
            }

            match c {
                b' ' | b'\t' | b'\r' | 0x0c => {
                    self.pos += 1;
                    self.space = true;
                }
                b'\\' if self.peek(1) == Some(b'\n') => {
                    self.pos += 2;
                    self.line += 1;
                    self.space = true;
                }
                b'\n' => {
                    let start = self.pos;
                    let line = self.line;
                    self.pos += 1;
                    self.push(TokenKind::Newline, start, line);
                    self.line += 1;
                    self.read_heredoc_bodies()?;
                    self.space = true;
                }
                b'#' => {
                    while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                        self.pos += 1;
                    }
                    self.space = true;
                }
                b'0'..=b'9' => self.number(),
                b'"' | b'`' => self.quoted(c, true)?,
                b'\'' => self.quoted(c, false)?,
                b'@' => self.instance_var(),
                b'$' => self.global_var(),
                b':' => self.colon()?,
                b'?' => self.question()?,
                b'/' if self.literal_allowed() => self.regexp()?,
                b'%' if self.literal_allowed() && self.percent_literal_ahead() => {
                    self.percent_literal()?
                }
                b'<' if self.heredoc_ahead().is_some() => self.heredoc_start(),
                b'(' => self.single(TokenKind::LParen),
                b')' => self.single(TokenKind::RParen),
                b'[' => self.single(TokenKind::LBracket),
                b']' => self.single(TokenKind::RBracket),
                b'{' => self.single(TokenKind::LBrace),
                b'}' => self.single(TokenKind::RBrace),
                b',' => self.single(TokenKind::Comma),
                b'.' if self.peek(1) != Some(b'.') => self.single(TokenKind::Dot),
                b';' => self.single(TokenKind::Semi),
                c if is_ident_start(c) => self.word(),
                _ => self.operator()?,
            }
        }

        if let Some(heredoc) = self.heredocs.first() {
            return Err(self.error(
                heredoc.line,
                format!("unterminated heredoc `{}`", heredoc.id),
            ));
        }
        Ok(self.tokens)
    }

    fn single(&mut self, kind: TokenKind) {
        let start = self.pos;
        self.pos += 1;
        self.push(kind, start, self.line);
    }

    fn skip_embedded_doc(&mut self) -> Result<(), ParseError> {
        let start_line = self.line;
        loop {
            let line_end = self.rest().find('\n').map(|i| self.pos + i);
            let at_end = self.rest().starts_with("=end");
            match line_end {
                Some(end) => {
                    self.pos = end + 1;
                    self.line += 1;
                }
                None => self.pos = self.bytes.len(),
            }
            if at_end {
                return Ok(());
            }
            if line_end.is_none() {
                return Err(self.error(start_line, "unterminated `=begin` block"));
            }
        }
    }

    fn number(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek(0) {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else if c == b'.' && self.peek(1).is_some_and(|d| d.is_ascii_digit()) {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start, self.line);
    }

    fn word(&mut self) {
        let start = self.pos;
        while self.peek(0).is_some_and(is_ident_char) {
            self.pos += 1;
        }
        let constant = self.bytes[start].is_ascii_uppercase();

        // Predicate and bang suffixes, unless the `?`/`!` starts `!=` or `?=`.
        if !constant && matches!(self.peek(0), Some(b'?') | Some(b'!')) && self.peek(1) != Some(b'=')
        {
            self.pos += 1;
        }

        // `name:` labels, but not `Foo::Bar` and not the `b:` of `a ? b: c`.
        let after_ternary = self.last().is_some_and(|t| t.is_op("?"));
        if self.peek(0) == Some(b':') && self.peek(1) != Some(b':') && !after_ternary {
            self.pos += 1;
            self.push(TokenKind::Label, start, self.line);
            return;
        }

        let text = &self.src[start..self.pos];
        let method_position = self.last().is_some_and(|t| {
            t.kind == TokenKind::Dot || (t.is_keyword(Keyword::Def) && text != "self")
        });
        let kind = if method_position {
            if constant {
                TokenKind::Const
            } else {
                TokenKind::Ident
            }
        } else if let Some(kw) = keyword(text) {
            TokenKind::Keyword(kw)
        } else if constant {
            TokenKind::Const
        } else {
            TokenKind::Ident
        };
        self.push(kind, start, self.line);
    }

    fn instance_var(&mut self) {
        let start = self.pos;
        while self.peek(0) == Some(b'@') {
            self.pos += 1;
        }
        if !self.peek(0).is_some_and(is_ident_start) {
            // `-@` / `+@` unary operator method names
            self.push(TokenKind::Op, start, self.line);
            return;
        }
        while self.peek(0).is_some_and(is_ident_char) {
            self.pos += 1;
        }
        self.push(TokenKind::Var, start, self.line);
    }

    fn global_var(&mut self) {
        let start = self.pos;
        self.pos += 1;
        if self.peek(0).is_some_and(is_ident_char) {
            while self.peek(0).is_some_and(is_ident_char) {
                self.pos += 1;
            }
        } else if self.peek(0).is_some_and(|c| b"!@&`'+~=/\\,;.<>_*$?:\"".contains(&c)) {
            self.pos += 1;
        }
        self.push(TokenKind::Var, start, self.line);
    }

    fn colon(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let line = self.line;
        match self.peek(1) {
            Some(b':') => {
                self.pos += 2;
                self.push(TokenKind::ColonColon, start, line);
            }
            Some(q @ (b'"' | b'\'')) => {
                self.pos += 2;
                self.skip_delimited(q, q, q == b'"', line)?;
                self.push(TokenKind::Symbol, start, line);
            }
            Some(c) if is_ident_start(c) || c == b'@' || c == b'$' => {
                self.pos += 1;
                while matches!(self.peek(0), Some(b'@') | Some(b'$')) {
                    self.pos += 1;
                }
                while self.peek(0).is_some_and(is_ident_char) {
                    self.pos += 1;
                }
                match (self.peek(0), self.peek(1)) {
                    (Some(b'?') | Some(b'!'), next) if next != Some(b'=') => self.pos += 1,
                    (Some(b'='), next) if !matches!(next, Some(b'=') | Some(b'>') | Some(b'~')) => {
                        self.pos += 1
                    }
                    _ => {}
                }
                self.push(TokenKind::Symbol, start, line);
            }
            _ => {
                let after = &self.src[self.pos + 1..];
                let operator = SYMBOL_OPERATORS
                    .iter()
                    .find(|op| after.starts_with(**op))
                    .filter(|_| !self.prev_ends_value() || self.space);
                match operator {
                    Some(op) => {
                        self.pos += 1 + op.len();
                        self.push(TokenKind::Symbol, start, line);
                    }
                    None => {
                        self.pos += 1;
                        self.push(TokenKind::Op, start, line);
                    }
                }
            }
        }
        Ok(())
    }

    /// `?a` character literal or the ternary operator.
    fn question(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let next = self.peek(1);
        let literal = self.literal_allowed()
            && next.is_some_and(|c| !c.is_ascii_whitespace())
            && match next {
                Some(b'\\') => true,
                _ => !self.peek(2).is_some_and(is_ident_char),
            };
        if literal {
            let escaped = usize::from(next == Some(b'\\'));
            let width = self.src[self.pos + 1 + escaped..]
                .chars()
                .next()
                .map_or(0, char::len_utf8);
            self.pos += 1 + escaped + width;
            self.push(TokenKind::Str, start, self.line);
        } else {
            self.operator()?;
        }
        Ok(())
    }

    fn quoted(&mut self, quote: u8, interpolate: bool) -> Result<(), ParseError> {
        let start = self.pos;
        let line = self.line;
        self.pos += 1;
        self.skip_delimited(quote, quote, interpolate, line)?;
        self.push(TokenKind::Str, start, line);
        Ok(())
    }

    fn regexp(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let line = self.line;
        self.pos += 1;
        self.skip_delimited(b'/', b'/', true, line)?;
        while self.peek(0).is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        self.push(TokenKind::Str, start, line);
        Ok(())
    }

    fn percent_literal_ahead(&self) -> bool {
        match (self.peek(1), self.peek(2)) {
            (Some(b'q' | b'Q' | b'w' | b'W' | b'i' | b'I' | b'r' | b's' | b'x'), Some(d)) => {
                d.is_ascii_punctuation()
            }
            (Some(d), _) => matches!(d, b'(' | b'[' | b'{' | b'<' | b'|' | b'!' | b'/'),
            _ => false,
        }
    }

    fn percent_literal(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let line = self.line;
        self.pos += 1;
        let mut kind = b'Q';
        if self.peek(0).is_some_and(|c| c.is_ascii_alphabetic()) {
            kind = self.bytes[self.pos];
            self.pos += 1;
        }
        let open = self.bytes[self.pos];
        self.pos += 1;
        let interpolate = matches!(kind, b'Q' | b'W' | b'I' | b'r' | b'x');
        self.skip_delimited(open, closing_delimiter(open), interpolate, line)?;
        if kind == b'r' {
            while self.peek(0).is_some_and(|c| c.is_ascii_alphabetic()) {
                self.pos += 1;
            }
        }
        self.push(TokenKind::Str, start, line);
        Ok(())
    }

    /// Skip the body of a delimited literal; `pos` is just past the opener.
    fn skip_delimited(
        &mut self,
        open: u8,
        close: u8,
        interpolate: bool,
        start_line: usize,
    ) -> Result<(), ParseError> {
        let mut depth = 0usize;
        while let Some(c) = self.peek(0) {
            match c {
                b'\\' => {
                    if self.peek(1) == Some(b'\n') {
                        self.line += 1;
                    }
                    self.pos += 2;
                    continue;
                }
                b'\n' => self.line += 1,
                b'#' if interpolate && self.peek(1) == Some(b'{') => {
                    self.pos += 2;
                    self.skip_interpolation(start_line)?;
                    continue;
                }
                c if c == close && depth == 0 => {
                    self.pos += 1;
                    return Ok(());
                }
                c if c == close => depth -= 1,
                c if c == open && open != close => depth += 1,
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.error(start_line, "unterminated literal"))
    }

    fn skip_interpolation(&mut self, start_line: usize) -> Result<(), ParseError> {
        let mut depth = 1usize;
        while let Some(c) = self.peek(0) {
            match c {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(());
                    }
                }
                b'"' | b'`' | b'\'' => {
                    self.pos += 1;
                    self.skip_delimited(c, c, c != b'\'', start_line)?;
                    continue;
                }
                b'\n' => self.line += 1,
                _ => {}
            }
            self.pos += 1;
        }
        Err(self.error(start_line, "unterminated interpolation"))
    }

    /// Returns `(identifier, indented, byte length of the opener)`.
    fn heredoc_ahead(&self) -> Option<(String, bool, usize)> {
        let rest = self.rest().strip_prefix("<<")?;
        let (indented, rest, mut len) = match rest.as_bytes().first() {
            Some(b'~') | Some(b'-') => (true, &rest[1..], 3),
            _ => (false, rest, 2),
        };
        let first = *rest.as_bytes().first()?;
        if matches!(first, b'"' | b'\'' | b'`') {
            let close = rest[1..].find(first as char)?;
            let id = &rest[1..1 + close];
            if id.contains('\n') {
                return None;
            }
            len += close + 2;
            return Some((id.to_string(), indented, len));
        }
        let id_len = rest.bytes().take_while(|c| is_ident_char(*c)).count();
        if id_len == 0 || !is_ident_start(first) {
            return None;
        }
        // Bare `<<ID` collides with the shift/append operator.
        if !indented && (!first.is_ascii_uppercase() || !self.literal_allowed()) {
            return None;
        }
        len += id_len;
        Some((rest[..id_len].to_string(), indented, len))
    }

    fn heredoc_start(&mut self) {
        if let Some((id, indented, len)) = self.heredoc_ahead() {
            let start = self.pos;
            self.pos += len;
            self.heredocs.push(Heredoc {
                id,
                indented,
                line: self.line,
            });
            self.push(TokenKind::Str, start, self.line);
        }
    }

    fn read_heredoc_bodies(&mut self) -> Result<(), ParseError> {
        for heredoc in std::mem::take(&mut self.heredocs) {
            loop {
                if self.pos >= self.bytes.len() {
                    return Err(self.error(
                        heredoc.line,
                        format!("unterminated heredoc `{}`", heredoc.id),
                    ));
                }
                let end = self.rest().find('\n').map_or(self.bytes.len(), |i| self.pos + i);
                let content = self.src[self.pos..end].trim_end_matches('\r');
                let content = if heredoc.indented {
                    content.trim_start()
                } else {
                    content
                };
                let done = content == heredoc.id;
                self.pos = (end + 1).min(self.bytes.len());
                self.line += 1;
                if done {
                    break;
                }
            }
        }
        Ok(())
    }

    fn operator(&mut self) -> Result<(), ParseError> {
        let start = self.pos;
        let rest = self.rest();
        let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) else {
            let ch = rest.chars().next().unwrap_or('?');
            return Err(self.error(self.line, format!("unexpected character `{}`", ch)));
        };
        self.pos += op.len();
        let kind = if *op == "&." {
            TokenKind::Dot
        } else {
            TokenKind::Op
        };
        self.push(kind, start, self.line);
        Ok(())
    }
}
