//! A pull-based scanner that turns a template into a stream of expansion tokens.
//!
//! The scanner computes each token on demand.  It tracks bracket depth and whether a double-quoted
//! region is open inside a bracket; quoting and escaping only take on shell meaning while the depth
//! is non-zero.

use std::iter::FusedIterator;

////////////////////////////////////////////// Operator ////////////////////////////////////////////

/// The operator of a `${name<op>word}` expansion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operator {
    /// `${name-word}`: use `word` when `name` is unset.
    Default,
    /// `${name=word}`: use `word` when `name` is unset, and assign it to `name`.
    AssignDefault,
    /// `${name?word}`: fail with `word` when `name` is unset.
    ErrorIfUnset,
    /// `${name+word}`: use `word` when `name` is set.
    Alternative,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '-' => Some(Self::Default),
            '=' => Some(Self::AssignDefault),
            '?' => Some(Self::ErrorIfUnset),
            '+' => Some(Self::Alternative),
            _ => None,
        }
    }
}

/////////////////////////////////////////////// Token //////////////////////////////////////////////

/// A single unit of the token stream.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Token {
    /// Literal text with quoting and escapes already applied.
    Text(String),
    /// `$name` or `${name}`.
    ReadParam(String),
    /// `${#name}`.
    ParamLen(String),
    /// `${name<op>`; the operand follows as tokens and ends at the matching `EndBracket`.
    ParamOp {
        ident: String,
        op: Operator,
        null_is_empty: bool,
    },
    /// The `}` that closes the operand of the innermost open `ParamOp`.
    EndBracket,
    /// Input ended while looking for the given delimiter.  Always the last token.
    UnexpectedEnd(char),
    /// The body of a bracket is not valid parameter syntax.  Always the last token.
    BadSubstitution(String),
}

/////////////////////////////////////////////// State //////////////////////////////////////////////

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Text,
    StartExpansion,
    SimpleName,
    BracketName,
    ParamOp,
    ParamLength,
    EndBracket,
    SingleQuoteString,
    Finished,
}

////////////////////////////////////////////// Scanner /////////////////////////////////////////////

/// Scan a template into [Token]s, one token per call to `next`.
#[derive(Clone, Debug)]
pub struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    start: usize,
    state: State,
    depth: usize,
    double_quotes: bool,
    text: String,
}

impl<'a> Scanner<'a> {
    /// Create a new scanner positioned at the start of `input`.
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            start: 0,
            state: State::Text,
            depth: 0,
            double_quotes: false,
            text: String::new(),
        }
    }

    /// True iff the scanner will produce no more tokens.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Discard whatever remains of the input.  The scanner yields nothing afterwards.
    pub fn close(&mut self) {
        self.pos = self.input.len();
        self.start = self.pos;
        self.text.clear();
        self.state = State::Finished;
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    // A `$` only begins an expansion when a bracket or a name follows it.
    fn starts_expansion(&self) -> bool {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        matches!(chars.next(), Some(c) if c == '{' || is_ident_start(c))
    }

    fn flush(&mut self) -> Option<Token> {
        if self.text.is_empty() {
            None
        } else {
            Some(Token::Text(std::mem::take(&mut self.text)))
        }
    }

    fn finish(&mut self, token: Token) -> Option<Token> {
        self.state = State::Finished;
        Some(token)
    }

    fn step(&mut self) -> Option<Token> {
        match self.state {
            State::Text => self.lex_text(),
            State::StartExpansion => self.lex_start_expansion(),
            State::SimpleName => self.lex_simple_name(),
            State::BracketName => self.lex_bracket_name(),
            State::ParamOp => self.lex_param_op(),
            State::ParamLength => self.lex_param_length(),
            State::EndBracket => self.lex_end_bracket(),
            State::SingleQuoteString => self.lex_single_quote_string(),
            State::Finished => None,
        }
    }

    fn lex_text(&mut self) -> Option<Token> {
        loop {
            let Some(c) = self.peek() else {
                if let Some(text) = self.flush() {
                    return Some(text);
                }
                if self.depth > 0 {
                    return self.finish(Token::UnexpectedEnd('}'));
                }
                self.state = State::Finished;
                return None;
            };
            match c {
                '}' if self.depth > 0 => {
                    if let Some(text) = self.flush() {
                        return Some(text);
                    }
                    self.advance();
                    self.close_bracket();
                    return Some(Token::EndBracket);
                }
                '$' if self.starts_expansion() => {
                    if let Some(text) = self.flush() {
                        return Some(text);
                    }
                    self.advance();
                    self.state = State::StartExpansion;
                    return None;
                }
                '\'' if self.depth > 0 => {
                    self.advance();
                    self.state = State::SingleQuoteString;
                    return None;
                }
                '"' if self.depth > 0 => {
                    self.advance();
                    self.double_quotes = !self.double_quotes;
                }
                '\\' => {
                    self.advance();
                    self.lex_escape();
                }
                c => {
                    self.advance();
                    self.text.push(c);
                }
            }
        }
    }

    fn lex_escape(&mut self) {
        let Some(c) = self.advance() else {
            if self.depth == 0 || self.double_quotes {
                self.text.push('\\');
            }
            return;
        };
        let escapable = if self.depth == 0 {
            c == '$'
        } else if self.double_quotes {
            matches!(c, '$' | '`' | '"' | '\\')
        } else {
            true
        };
        if !escapable {
            self.text.push('\\');
        }
        self.text.push(c);
    }

    fn lex_start_expansion(&mut self) -> Option<Token> {
        match self.peek() {
            Some('{') => {
                self.advance();
                self.depth += 1;
                self.start = self.pos;
                self.state = State::BracketName;
            }
            Some(c) if is_ident_start(c) => {
                self.start = self.pos;
                self.state = State::SimpleName;
            }
            _ => {
                self.text.push('$');
                self.state = State::Text;
            }
        }
        None
    }

    fn lex_simple_name(&mut self) -> Option<Token> {
        while matches!(self.peek(), Some(c) if is_ident_char(c)) {
            self.advance();
        }
        self.state = State::Text;
        Some(Token::ReadParam(self.input[self.start..self.pos].to_string()))
    }

    fn lex_bracket_name(&mut self) -> Option<Token> {
        if self.peek() == Some('#') {
            self.advance();
            self.start = self.pos;
            self.state = State::ParamLength;
            return None;
        }
        loop {
            match self.peek() {
                None => {
                    return self.finish(Token::UnexpectedEnd('}'));
                }
                Some('}' | ':' | '-' | '?' | '+' | '=') => {
                    self.state = State::ParamOp;
                    return None;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    fn lex_param_op(&mut self) -> Option<Token> {
        let input = self.input;
        let ident = &input[self.start..self.pos];
        if !is_ident(ident) {
            return self.bad_substitution();
        }
        let ident = ident.to_string();
        let mut c = self.advance();
        if c == Some('}') {
            self.state = State::EndBracket;
            return Some(Token::ReadParam(ident));
        }
        let null_is_empty = c == Some(':');
        if null_is_empty {
            c = self.advance();
        }
        let op = match c.and_then(Operator::from_char) {
            Some(op) => op,
            None if c.is_none() => {
                return self.finish(Token::UnexpectedEnd('}'));
            }
            None => {
                return self.bad_substitution();
            }
        };
        self.state = State::Text;
        Some(Token::ParamOp {
            ident,
            op,
            null_is_empty,
        })
    }

    fn lex_param_length(&mut self) -> Option<Token> {
        loop {
            match self.peek() {
                None => {
                    return self.finish(Token::UnexpectedEnd('}'));
                }
                Some('}') => {
                    break;
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
        let input = self.input;
        let ident = &input[self.start..self.pos];
        if !is_ident(ident) {
            return self.bad_substitution();
        }
        let ident = ident.to_string();
        self.advance();
        self.state = State::EndBracket;
        Some(Token::ParamLen(ident))
    }

    fn lex_end_bracket(&mut self) -> Option<Token> {
        self.close_bracket();
        self.state = State::Text;
        None
    }

    fn lex_single_quote_string(&mut self) -> Option<Token> {
        loop {
            match self.advance() {
                None => {
                    self.text.clear();
                    return self.finish(Token::UnexpectedEnd('\''));
                }
                Some('\'') => {
                    self.state = State::Text;
                    return None;
                }
                Some(c) => {
                    self.text.push(c);
                }
            }
        }
    }

    fn close_bracket(&mut self) {
        self.depth -= 1;
        if self.depth == 0 {
            self.double_quotes = false;
        }
    }

    fn bad_substitution(&mut self) -> Option<Token> {
        // Report the bracket from its `$` through whatever was read so far.
        let begin = self.input[..self.start].rfind("${").unwrap_or(self.start);
        let text = self.input[begin..self.pos].to_string();
        self.finish(Token::BadSubstitution(text))
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        while !self.is_finished() {
            if let Some(token) = self.step() {
                return Some(token);
            }
        }
        None
    }
}

impl FusedIterator for Scanner<'_> {}

///////////////////////////////////////////// identifiers ////////////////////////////////////////////

fn is_ident_start(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '_')
}

fn is_ident_char(c: char) -> bool {
    matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '_')
}

/// True iff `s` is a valid parameter name.
pub fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_ident_start(c) => chars.all(is_ident_char),
        _ => false,
    }
}

/////////////////////////////////////////////// tests //////////////////////////////////////////////
