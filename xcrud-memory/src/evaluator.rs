//! Expression evaluation for in-memory filtering, sorting and updates.
//!
//! Filters, sort keys and raw expression values share one small language:
//!
//! ```text
//! expr     := and ( (OR | ||) and )*
//! and      := not ( (AND | &&) not )*
//! not      := (NOT | !) not | compare
//! compare  := operand ( (== | = | != | <> | > | >= | < | <=) operand )?
//! operand  := literal | path | :param | ( expr )
//! literal  := number | 'text' | "text" | TRUE | FALSE | NULL
//! ```
//!
//! Anything else is rejected with a server error, the same way a server would
//! reject an expression it cannot parse.

use bson::{Bson, Document, datetime::DateTime};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
};

use xcrud_core::{
    error::{CrudError, CrudResult},
    value::{ExprValue, Field},
};

use crate::{codes::UNSUPPORTED_EXPRESSION, update::lookup};

/// Type-erased, comparable representation of BSON values.
///
/// Numeric types are normalized to `f64`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    Bytes(&'a [u8]),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(f64::from(*value)),
            Bson::Int64(value) => Comparable::Number(*value as f64),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Binary(binary) => Comparable::Bytes(&binary.bytes),
            Bson::Array(items) => Comparable::Array(items.iter().map(Comparable::from).collect()),
            Bson::Document(doc) => Comparable::Map(
                doc.iter()
                    .map(|(key, value)| (key.as_str(), Comparable::from(value)))
                    .collect(),
            ),
            _ => Comparable::Null,
        }
    }
}

impl PartialEq for Comparable<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialOrd for Comparable<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::Bytes(a), Comparable::Bytes(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Sort order of two values: null and missing values first, incomparable values equal.
pub(crate) fn order(left: &Bson, right: &Bson) -> Ordering {
    match (left, right) {
        (Bson::Null, Bson::Null) => Ordering::Equal,
        (Bson::Null, _) => Ordering::Less,
        (_, Bson::Null) => Ordering::Greater,
        _ => Comparable::from(left)
            .partial_cmp(&Comparable::from(right))
            .unwrap_or(Ordering::Equal),
    }
}

fn unsupported(message: impl Into<String>) -> CrudError {
    CrudError::server(UNSUPPORTED_EXPRESSION, message)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Bson),
    Path(Field),
    Param(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parses expression text.
    ///
    /// # Errors
    ///
    /// Returns a server error with code [`UNSUPPORTED_EXPRESSION`] if the text
    /// is not a valid expression.
    pub(crate) fn parse(text: &str) -> CrudResult<Self> {
        let tokens = tokenize(text)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr()?;

        match parser.tokens.get(parser.pos) {
            None => Ok(expr),
            Some(token) => Err(unsupported(format!("unexpected {token:?} in expression {text:?}"))),
        }
    }

    /// Evaluates the expression against one document.
    pub(crate) fn evaluate(&self, doc: &Document, bindings: &BTreeMap<String, ExprValue>) -> CrudResult<Bson> {
        Ok(match self {
            Expr::Literal(value) => value.clone(),
            Expr::Path(field) => {
                if field.has_wildcard() {
                    return Err(unsupported(format!("wildcard path {field} in expression")));
                }
                lookup(doc, field.segments())
                    .cloned()
                    .unwrap_or(Bson::Null)
            }
            Expr::Param(name) => {
                let value = bindings
                    .get(name)
                    .ok_or_else(|| unsupported(format!("unknown parameter :{name}")))?;
                value
                    .to_bson()
                    .ok_or_else(|| unsupported(format!("parameter :{name} is not a literal value")))?
            }
            Expr::Not(inner) => Bson::Boolean(!truthy(&inner.evaluate(doc, bindings)?)),
            Expr::And(left, right) => Bson::Boolean(
                truthy(&left.evaluate(doc, bindings)?) && truthy(&right.evaluate(doc, bindings)?),
            ),
            Expr::Or(left, right) => Bson::Boolean(
                truthy(&left.evaluate(doc, bindings)?) || truthy(&right.evaluate(doc, bindings)?),
            ),
            Expr::Compare(op, left, right) => {
                let left = left.evaluate(doc, bindings)?;
                let right = right.evaluate(doc, bindings)?;
                Bson::Boolean(compare(*op, &left, &right))
            }
        })
    }

    /// Returns `true` if the expression holds for `doc`.
    pub(crate) fn matches(&self, doc: &Document, bindings: &BTreeMap<String, ExprValue>) -> CrudResult<bool> {
        Ok(truthy(&self.evaluate(doc, bindings)?))
    }
}

fn compare(op: CompareOp, left: &Bson, right: &Bson) -> bool {
    let (left, right) = (Comparable::from(left), Comparable::from(right));

    match op {
        CompareOp::Eq => left == right,
        CompareOp::Ne => left != right,
        CompareOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
        CompareOp::Gte => matches!(left.partial_cmp(&right), Some(Ordering::Greater | Ordering::Equal)),
        CompareOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
        CompareOp::Lte => matches!(left.partial_cmp(&right), Some(Ordering::Less | Ordering::Equal)),
    }
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(value) => *value,
        Bson::Null => false,
        Bson::Int32(value) => *value != 0,
        Bson::Int64(value) => *value != 0,
        Bson::Double(value) => *value != 0.0,
        Bson::String(value) => !value.is_empty(),
        _ => true,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(Bson),
    Path(String),
    Param(String),
    Op(CompareOp),
    And,
    Or,
    Not,
    Open,
    Close,
}

impl Token {
    fn ends_operand(&self) -> bool {
        matches!(self, Token::Literal(_) | Token::Path(_) | Token::Param(_) | Token::Close)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn tokenize(text: &str) -> CrudResult<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens: Vec<Token> = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        let next = chars.get(pos + 1).copied();

        let token = match c {
            c if c.is_whitespace() => {
                pos += 1;
                continue;
            }
            '(' => {
                pos += 1;
                Token::Open
            }
            ')' => {
                pos += 1;
                Token::Close
            }
            '\'' | '"' => {
                let (literal, end) = string_literal(&chars, pos)?;
                pos = end;
                Token::Literal(Bson::String(literal))
            }
            ':' => {
                let start = pos + 1;
                pos = start;
                while pos < chars.len() && is_ident_char(chars[pos]) {
                    pos += 1;
                }
                if pos == start {
                    return Err(unsupported(format!("parameter without a name in {text:?}")));
                }
                Token::Param(chars[start..pos].iter().collect())
            }
            '=' => {
                pos += if next == Some('=') { 2 } else { 1 };
                Token::Op(CompareOp::Eq)
            }
            '!' if next == Some('=') => {
                pos += 2;
                Token::Op(CompareOp::Ne)
            }
            '!' => {
                pos += 1;
                Token::Not
            }
            '<' => match next {
                Some('=') => {
                    pos += 2;
                    Token::Op(CompareOp::Lte)
                }
                Some('>') => {
                    pos += 2;
                    Token::Op(CompareOp::Ne)
                }
                _ => {
                    pos += 1;
                    Token::Op(CompareOp::Lt)
                }
            },
            '>' => {
                if next == Some('=') {
                    pos += 2;
                    Token::Op(CompareOp::Gte)
                } else {
                    pos += 1;
                    Token::Op(CompareOp::Gt)
                }
            }
            '&' if next == Some('&') => {
                pos += 2;
                Token::And
            }
            '|' if next == Some('|') => {
                pos += 2;
                Token::Or
            }
            c if c.is_ascii_digit()
                || (c == '-'
                    && next.is_some_and(|n| n.is_ascii_digit())
                    && !tokens.last().is_some_and(Token::ends_operand)) =>
            {
                let (number, end) = number_literal(&chars, pos)?;
                pos = end;
                Token::Literal(number)
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' || c == '`' => {
                let (lexeme, end) = path_lexeme(&chars, pos)?;
                pos = end;
                keyword(&lexeme).unwrap_or(Token::Path(lexeme))
            }
            other => return Err(unsupported(format!("unexpected character {other:?} in {text:?}"))),
        };

        tokens.push(token);
    }

    Ok(tokens)
}

fn keyword(lexeme: &str) -> Option<Token> {
    Some(match lexeme.to_ascii_uppercase().as_str() {
        "AND" => Token::And,
        "OR" => Token::Or,
        "NOT" => Token::Not,
        "TRUE" => Token::Literal(Bson::Boolean(true)),
        "FALSE" => Token::Literal(Bson::Boolean(false)),
        "NULL" => Token::Literal(Bson::Null),
        _ => return None,
    })
}

fn string_literal(chars: &[char], start: usize) -> CrudResult<(String, usize)> {
    let quote = chars[start];
    let mut literal = String::new();
    let mut pos = start + 1;

    while pos < chars.len() {
        match chars[pos] {
            '\\' if pos + 1 < chars.len() => {
                literal.push(chars[pos + 1]);
                pos += 2;
            }
            c if c == quote => return Ok((literal, pos + 1)),
            c => {
                literal.push(c);
                pos += 1;
            }
        }
    }

    Err(unsupported("unterminated string literal"))
}

fn number_literal(chars: &[char], start: usize) -> CrudResult<(Bson, usize)> {
    let mut pos = start + 1;
    while pos < chars.len() && (chars[pos].is_ascii_digit() || matches!(chars[pos], '.' | 'e' | 'E')) {
        pos += 1;
    }

    let text: String = chars[start..pos].iter().collect();
    let value = if text.contains(['.', 'e', 'E']) {
        text.parse::<f64>().map(Bson::Double).ok()
    } else {
        text.parse::<i64>().map(Bson::Int64).ok()
    };

    value
        .map(|value| (value, pos))
        .ok_or_else(|| unsupported(format!("invalid number {text}")))
}

fn path_lexeme(chars: &[char], start: usize) -> CrudResult<(String, usize)> {
    let mut lexeme = String::new();
    let mut pos = start;

    while pos < chars.len() {
        match chars[pos] {
            '`' => {
                let close = chars[pos + 1..]
                    .iter()
                    .position(|c| *c == '`')
                    .map(|offset| pos + 1 + offset)
                    .ok_or_else(|| unsupported("unterminated quoted member"))?;
                lexeme.extend(&chars[pos..=close]);
                pos = close + 1;
            }
            c if is_ident_char(c) || matches!(c, '.' | '[' | ']' | '*' | '$') => {
                lexeme.push(c);
                pos += 1;
            }
            _ => break,
        }
    }

    Ok((lexeme, pos))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> CrudResult<Expr> {
        let mut left = self.and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            left = Expr::Or(Box::new(left), Box::new(self.and()?));
        }

        Ok(left)
    }

    fn and(&mut self) -> CrudResult<Expr> {
        let mut left = self.not()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            left = Expr::And(Box::new(left), Box::new(self.not()?));
        }

        Ok(left)
    }

    fn not(&mut self) -> CrudResult<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.pos += 1;
            return Ok(Expr::Not(Box::new(self.not()?)));
        }

        self.compare()
    }

    fn compare(&mut self) -> CrudResult<Expr> {
        let left = self.operand()?;
        match self.peek() {
            Some(Token::Op(op)) => {
                let op = *op;
                self.pos += 1;
                Ok(Expr::Compare(op, Box::new(left), Box::new(self.operand()?)))
            }
            _ => Ok(left),
        }
    }

    fn operand(&mut self) -> CrudResult<Expr> {
        match self.advance() {
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Param(name)) => Ok(Expr::Param(name)),
            Some(Token::Path(text)) => Field::parse(&text)
                .map(Expr::Path)
                .map_err(|err| unsupported(err.to_string())),
            Some(Token::Open) => {
                let inner = self.expr()?;
                match self.advance() {
                    Some(Token::Close) => Ok(inner),
                    _ => Err(unsupported("missing closing parenthesis")),
                }
            }
            Some(token) => Err(unsupported(format!("unexpected {token:?}, expected an operand"))),
            None => Err(unsupported("expression ends unexpectedly")),
        }
    }
}
