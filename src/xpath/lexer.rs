//! Tokenizer for locator expressions.
//!
//! Implements the XPath 1.0 lexical rules, including the disambiguation of
//! `*` and the operator names `and`, `or`, `div` and `mod`, which depend on
//! the preceding token.

use super::XPathError;

/// Binary and unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Plus,
    Minus,
    Multiply,
    Div,
    Mod,
    Union,
}

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Slash,
    DoubleSlash,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Dot,
    DoubleDot,
    At,
    Comma,
    DoubleColon,
    Dollar,
    /// `*` used as a name test.
    Star,
    Name(String),
    Literal(String),
    Number(f64),
    Op(Operator),
}

impl Token {
    /// Whether a following `*` or NCName must be read as an operator.
    ///
    /// Per XPath 1.0 §3.7 that is the case unless the previous token is one
    /// of `@ :: ( [ ,` or an operator.
    fn makes_next_operator(&self) -> bool {
        !matches!(
            self,
            Self::At
                | Self::DoubleColon
                | Self::LParen
                | Self::LBracket
                | Self::Comma
                | Self::Slash
                | Self::DoubleSlash
                | Self::Dollar
                | Self::Op(_)
        )
    }
}

/// A token with the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Splits an expression into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, XPathError> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens: Vec<Spanned> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        let next = chars.get(i + 1).map(|&(_, n)| n);
        let operator_context = tokens
            .last()
            .is_some_and(|prev| prev.token.makes_next_operator());

        let (token, consumed) = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '/' if next == Some('/') => (Token::DoubleSlash, 2),
            '/' => (Token::Slash, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '@' => (Token::At, 1),
            ',' => (Token::Comma, 1),
            '$' => (Token::Dollar, 1),
            '|' => (Token::Op(Operator::Union), 1),
            '+' => (Token::Op(Operator::Plus), 1),
            '-' => (Token::Op(Operator::Minus), 1),
            '=' => (Token::Op(Operator::Eq), 1),
            '!' if next == Some('=') => (Token::Op(Operator::Ne), 2),
            '<' if next == Some('=') => (Token::Op(Operator::Le), 2),
            '<' => (Token::Op(Operator::Lt), 1),
            '>' if next == Some('=') => (Token::Op(Operator::Ge), 2),
            '>' => (Token::Op(Operator::Gt), 1),
            ':' if next == Some(':') => (Token::DoubleColon, 2),
            '*' if operator_context => (Token::Op(Operator::Multiply), 1),
            '*' => (Token::Star, 1),
            '.' if next == Some('.') => (Token::DoubleDot, 2),
            '.' if next.is_some_and(|n| n.is_ascii_digit()) => lex_number(&chars, i),
            '.' => (Token::Dot, 1),
            '"' | '\'' => lex_literal(source, &chars, i)?,
            c if c.is_ascii_digit() => lex_number(&chars, i),
            c if is_name_start(c) => {
                let (name, consumed) = lex_name(&chars, i);
                let token = if operator_context {
                    match name.as_str() {
                        "and" => Token::Op(Operator::And),
                        "or" => Token::Op(Operator::Or),
                        "div" => Token::Op(Operator::Div),
                        "mod" => Token::Op(Operator::Mod),
                        _ => Token::Name(name),
                    }
                } else {
                    Token::Name(name)
                };
                (token, consumed)
            }
            other => {
                return Err(XPathError::Syntax {
                    position: offset,
                    message: format!("unexpected character '{other}'"),
                })
            }
        };

        tokens.push(Spanned { token, offset });
        i += consumed;
    }

    Ok(tokens)
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Reads an NCName, or a QName when a single `:` joins two NCNames.
fn lex_name(chars: &[(usize, char)], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && is_name_char(chars[end].1) {
        end += 1;
    }
    // prefix:local, but not axis::
    if end + 1 < chars.len()
        && chars[end].1 == ':'
        && chars[end + 1].1 != ':'
        && is_name_start(chars[end + 1].1)
    {
        end += 1;
        while end < chars.len() && is_name_char(chars[end].1) {
            end += 1;
        }
    }
    let name: String = chars[start..end].iter().map(|&(_, c)| c).collect();
    (name, end - start)
}

fn lex_number(chars: &[(usize, char)], start: usize) -> (Token, usize) {
    let mut end = start;
    let mut seen_dot = false;
    while end < chars.len() {
        let c = chars[end].1;
        if c.is_ascii_digit() {
            end += 1;
        } else if c == '.' && !seen_dot {
            seen_dot = true;
            end += 1;
        } else {
            break;
        }
    }
    let text: String = chars[start..end].iter().map(|&(_, c)| c).collect();
    // Digits with at most one dot always parse.
    let value = text.parse::<f64>().unwrap_or(f64::NAN);
    (Token::Number(value), end - start)
}

fn lex_literal(
    source: &str,
    chars: &[(usize, char)],
    start: usize,
) -> Result<(Token, usize), XPathError> {
    let (open_offset, quote) = chars[start];
    let close = chars[start + 1..]
        .iter()
        .position(|&(_, c)| c == quote)
        .map(|p| start + 1 + p)
        .ok_or_else(|| XPathError::Syntax {
            position: open_offset,
            message: "unterminated string literal".to_string(),
        })?;

    let body_start = open_offset + quote.len_utf8();
    let body_end = chars[close].0;
    Ok((
        Token::Literal(source[body_start..body_end].to_string()),
        close - start + 1,
    ))
}
