//! Parser and evaluator for the query subset the memory gateway supports:
//!
//! ```text
//! SELECT * FROM <container> [[AS] <alias>]
//!     [WHERE <alias>.<path> <op> <@param | literal> [AND ...]]
//! ```
//!
//! Operators are `=`, `!=`, `<`, `<=`, `>` and `>=`. Literals are strings,
//! numbers, `true`, `false` and `null`. Without an alias, conditions refer to
//! the container name.

use std::cmp::Ordering;

use serde_json::{Number, Value};
use strum::Display;

use crate::query::QueryRequest;
use crate::types::Document;
use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Param(String),
    Str(String),
    Num(Number),
    Star,
    Dot,
    Op(CompareOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub(crate) enum CompareOp {
    #[strum(serialize = "=")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    Ge,
}

/// One `path op value` comparison with parameters already resolved.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Condition {
    path: Vec<String>,
    op: CompareOp,
    value: Value,
}

/// A parsed query: every condition must hold for a document to match.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Parses the request text and binds its parameters.
    pub(crate) fn parse(request: &QueryRequest) -> Result<Self> {
        let tokens = tokenize(request.text())?;
        Parser {
            tokens,
            position: 0,
            request,
        }
        .parse()
    }

    /// Returns `true` if the document satisfies every condition.
    pub(crate) fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|condition| {
            let Some(actual) = document.lookup(condition.path.iter().map(String::as_str)) else {
                return false;
            };

            match condition.op {
                CompareOp::Eq => json_eq(actual, &condition.value),
                CompareOp::Ne => !json_eq(actual, &condition.value),
                op => match json_cmp(actual, &condition.value) {
                    Some(ordering) => match op {
                        CompareOp::Lt => ordering == Ordering::Less,
                        CompareOp::Le => ordering != Ordering::Greater,
                        CompareOp::Gt => ordering == Ordering::Greater,
                        _ => ordering != Ordering::Less,
                    },
                    None => false,
                },
            }
        })
    }
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => a == b,
    }
}

fn json_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn unsupported(message: impl Into<String>) -> Error {
    Error::query().with_message(format!("unsupported query: {}", message.into()))
}

fn tokenize(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '*' => tokens.push(Token::Star),
            '.' => tokens.push(Token::Dot),
            '=' => tokens.push(Token::Op(CompareOp::Eq)),
            '!' if chars.next_if_eq(&'=').is_some() => tokens.push(Token::Op(CompareOp::Ne)),
            '<' if chars.next_if_eq(&'>').is_some() => tokens.push(Token::Op(CompareOp::Ne)),
            '<' if chars.next_if_eq(&'=').is_some() => tokens.push(Token::Op(CompareOp::Le)),
            '<' => tokens.push(Token::Op(CompareOp::Lt)),
            '>' if chars.next_if_eq(&'=').is_some() => tokens.push(Token::Op(CompareOp::Ge)),
            '>' => tokens.push(Token::Op(CompareOp::Gt)),
            '\'' | '"' => {
                let mut literal = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => literal.push(escaped),
                            None => return Err(unterminated()),
                        },
                        Some(next) if next == c => break,
                        Some(next) => literal.push(next),
                        None => return Err(unterminated()),
                    }
                }
                tokens.push(Token::Str(literal));
            }
            '@' => {
                let name = take_word(&mut chars, String::new());
                if name.is_empty() {
                    return Err(Error::query().with_message("'@' is not followed by a name"));
                }
                tokens.push(Token::Param(name));
            }
            c if c.is_ascii_digit() || c == '-' => {
                let mut literal = String::from(c);
                while let Some(next) = chars.next_if(|n| {
                    n.is_ascii_digit() || matches!(n, '.' | 'e' | 'E' | '+' | '-')
                }) {
                    literal.push(next);
                }
                let number = literal.parse::<Number>().map_err(|_| {
                    Error::query().with_message(format!("invalid number '{literal}'"))
                })?;
                tokens.push(Token::Num(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                tokens.push(Token::Ident(take_word(&mut chars, String::from(c))));
            }
            other => return Err(unsupported(format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

fn unterminated() -> Error {
    Error::query().with_message("unterminated string literal")
}

fn take_word(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, mut word: String) -> String {
    while let Some(next) = chars.next_if(|n| n.is_alphanumeric() || *n == '_') {
        word.push(next);
    }
    word
}

struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    request: &'a QueryRequest,
}

impl Parser<'_> {
    fn parse(mut self) -> Result<Filter> {
        self.keyword("SELECT")?;
        self.expect(&Token::Star, "'*'")?;
        self.keyword("FROM")?;
        let alias = self.source_alias()?;

        let mut conditions = Vec::new();
        if self.peek().is_some() {
            self.keyword("WHERE")?;
            conditions.push(self.condition(&alias)?);
            while self.peek().is_some() {
                self.keyword("AND")?;
                conditions.push(self.condition(&alias)?);
            }
        }

        Ok(Filter { conditions })
    }

    /// Reads `<container> [[AS] <alias>]` and returns the name conditions use.
    fn source_alias(&mut self) -> Result<String> {
        let container = self.ident()?;

        match self.peek() {
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("AS") => {
                self.position += 1;
                self.ident()
            }
            Some(Token::Ident(word)) if !word.eq_ignore_ascii_case("WHERE") => {
                let alias = word.clone();
                self.position += 1;
                Ok(alias)
            }
            _ => Ok(container),
        }
    }

    fn condition(&mut self, alias: &str) -> Result<Condition> {
        let root = self.ident()?;
        if root != alias {
            return Err(unsupported(format!("unknown alias '{root}'")));
        }

        let mut path = Vec::new();
        while self.peek() == Some(&Token::Dot) {
            self.position += 1;
            path.push(self.ident()?);
        }
        if path.is_empty() {
            return Err(unsupported("comparison must reference a field"));
        }

        let op = match self.next() {
            Some(Token::Op(op)) => op,
            other => return Err(unexpected(other, "a comparison operator")),
        };

        let value = match self.next() {
            Some(Token::Param(name)) => self
                .request
                .parameter(&name)
                .cloned()
                .ok_or_else(|| {
                    Error::query().with_message(format!("parameter '@{name}' is not bound"))
                })?,
            Some(Token::Str(s)) => Value::String(s),
            Some(Token::Num(n)) => Value::Number(n),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("true") => Value::Bool(true),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("false") => Value::Bool(false),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("null") => Value::Null,
            other => return Err(unexpected(other, "a parameter or literal")),
        };

        Ok(Condition { path, op, value })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn ident(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Ident(name)) => Ok(name),
            other => Err(unexpected(other, "an identifier")),
        }
    }

    fn keyword(&mut self, keyword: &str) -> Result<()> {
        match self.next() {
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case(keyword) => Ok(()),
            other => Err(unexpected(other, keyword)),
        }
    }

    fn expect(&mut self, expected: &Token, describe: &str) -> Result<()> {
        match self.next() {
            Some(ref token) if token == expected => Ok(()),
            other => Err(unexpected(other, describe)),
        }
    }
}

fn unexpected(found: Option<Token>, expected: &str) -> Error {
    match found {
        Some(token) => unsupported(format!("expected {expected}, found {token:?}")),
        None => unsupported(format!("expected {expected}, found end of query")),
    }
}
