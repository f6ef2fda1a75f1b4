//! Recursive-descent parser producing [`Expr`] trees.
//!
//! Grammar follows XPath 1.0 §3, from `OrExpr` down to `PrimaryExpr`.

use super::ast::{Axis, Expr, NodeTest, Step};
use super::lexer::{tokenize, Operator, Spanned, Token};
use super::XPathError;

/// Nesting bound for parenthesised expressions and predicates.
const MAX_DEPTH: usize = 64;

/// Bound on binary operators per expression. Chains parse into left-deep
/// trees that evaluation walks recursively.
const MAX_OPERATORS: usize = 64;

/// Parses a complete expression.
pub fn parse(source: &str) -> Result<Expr, XPathError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(XPathError::Syntax {
            position: 0,
            message: "empty expression".to_string(),
        });
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        operators: 0,
        source_len: source.len(),
    };
    let expr = parser.parse_expr()?;
    if let Some(extra) = parser.peek() {
        return Err(XPathError::Syntax {
            position: parser.offset(),
            message: format!("unexpected {}", describe(extra)),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
    operators: usize,
    source_len: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead).map(|s| &s.token)
    }

    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.source_len, |s| s.offset)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), XPathError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected {}", describe(expected))))
        }
    }

    fn error(&self, message: String) -> XPathError {
        let found = self
            .peek()
            .map_or_else(|| "end of expression".to_string(), describe);
        XPathError::Syntax {
            position: self.offset(),
            message: format!("{message}, found {found}"),
        }
    }

    fn peek_operator(&self) -> Option<Operator> {
        match self.peek() {
            Some(Token::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn enter(&mut self) -> Result<(), XPathError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(XPathError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn binary(&mut self, op: Operator, lhs: Expr, rhs: Expr) -> Result<Expr, XPathError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(XPathError::TooComplex(MAX_OPERATORS));
        }
        Ok(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))
    }

    // === Operator precedence levels ===

    fn parse_expr(&mut self) -> Result<Expr, XPathError> {
        self.enter()?;
        let expr = self.parse_binary_level(0);
        self.leave();
        expr
    }

    /// Left-associative binary levels, loosest first.
    fn parse_binary_level(&mut self, level: usize) -> Result<Expr, XPathError> {
        const LEVELS: &[&[Operator]] = &[
            &[Operator::Or],
            &[Operator::And],
            &[Operator::Eq, Operator::Ne],
            &[Operator::Lt, Operator::Le, Operator::Gt, Operator::Ge],
            &[Operator::Plus, Operator::Minus],
            &[Operator::Multiply, Operator::Div, Operator::Mod],
        ];

        let Some(ops) = LEVELS.get(level) else {
            return self.parse_unary();
        };

        let mut lhs = self.parse_binary_level(level + 1)?;
        while let Some(op) = self.peek_operator().filter(|op| ops.contains(op)) {
            self.pos += 1;
            let rhs = self.parse_binary_level(level + 1)?;
            lhs = self.binary(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, XPathError> {
        if self.peek_operator() == Some(Operator::Minus) {
            self.pos += 1;
            self.enter()?;
            let operand = self.parse_unary();
            self.leave();
            return Ok(Expr::Negate(Box::new(operand?)));
        }
        self.parse_union()
    }

    fn parse_union(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.parse_path_expr()?;
        while self.peek_operator() == Some(Operator::Union) {
            self.pos += 1;
            let rhs = self.parse_path_expr()?;
            lhs = self.binary(Operator::Union, lhs, rhs)?;
        }
        Ok(lhs)
    }

    // === Paths ===

    fn parse_path_expr(&mut self) -> Result<Expr, XPathError> {
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                let steps = if self.at_step_start() {
                    self.parse_relative_steps()?
                } else {
                    Vec::new()
                };
                Ok(Expr::Path {
                    absolute: true,
                    steps,
                })
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                let mut steps = vec![Step::descendant_or_self()];
                steps.extend(self.parse_relative_steps()?);
                Ok(Expr::Path {
                    absolute: true,
                    steps,
                })
            }
            _ if self.at_step_start() => Ok(Expr::Path {
                absolute: false,
                steps: self.parse_relative_steps()?,
            }),
            _ => self.parse_filter_expr(),
        }
    }

    /// Whether the next token begins a location step rather than a primary
    /// expression.
    fn at_step_start(&self) -> bool {
        match self.peek() {
            Some(Token::Dot | Token::DoubleDot | Token::At | Token::Star) => true,
            Some(Token::Name(name)) => match self.peek_at(1) {
                Some(Token::LParen) => is_node_type(name),
                _ => true,
            },
            _ => false,
        }
    }

    fn parse_relative_steps(&mut self) -> Result<Vec<Step>, XPathError> {
        let mut steps = vec![self.parse_step()?];
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.parse_step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self());
                steps.push(self.parse_step()?);
            } else {
                return Ok(steps);
            }
        }
    }

    fn parse_step(&mut self) -> Result<Step, XPathError> {
        if self.eat(&Token::Dot) {
            return Ok(Step {
                axis: Axis::SelfAxis,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }
        if self.eat(&Token::DoubleDot) {
            return Ok(Step {
                axis: Axis::Parent,
                test: NodeTest::AnyNode,
                predicates: Vec::new(),
            });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name(name)), Some(Token::DoubleColon)) =
            (self.peek(), self.peek_at(1))
        {
            let name = name.clone();
            let axis = match Axis::from_name(&name) {
                Some(axis) => axis,
                None if name == "namespace" => {
                    return Err(XPathError::Unsupported("the namespace axis".to_string()))
                }
                None => return Err(self.error(format!("unknown axis '{name}'"))),
            };
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };

        let test = self.parse_node_test()?;
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, XPathError> {
        match self.peek().cloned() {
            Some(Token::Star) => {
                self.pos += 1;
                Ok(NodeTest::Principal)
            }
            Some(Token::Name(name)) => {
                self.pos += 1;
                if self.peek() == Some(&Token::LParen) && is_node_type(&name) {
                    self.pos += 1;
                    if name == "processing-instruction" {
                        // Optional target literal; never matches in HTML anyway.
                        if let Some(Token::Literal(_)) = self.peek() {
                            self.pos += 1;
                        }
                    }
                    self.expect(&Token::RParen)?;
                    return Ok(match name.as_str() {
                        "node" => NodeTest::AnyNode,
                        "text" => NodeTest::Text,
                        "comment" => NodeTest::Comment,
                        _ => NodeTest::ProcessingInstruction,
                    });
                }
                Ok(NodeTest::Name(name.to_ascii_lowercase()))
            }
            _ => Err(self.error("expected a node test".to_string())),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.parse_expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }

    // === Primary expressions ===

    fn parse_filter_expr(&mut self) -> Result<Expr, XPathError> {
        let primary = self.parse_primary()?;
        let predicates = self.parse_predicates()?;

        let mut steps = Vec::new();
        if matches!(self.peek(), Some(Token::Slash | Token::DoubleSlash)) {
            if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self());
            } else {
                self.pos += 1;
            }
            steps.extend(self.parse_relative_steps()?);
        }

        if predicates.is_empty() && steps.is_empty() {
            return Ok(primary);
        }
        Ok(Expr::Filter {
            primary: Box::new(primary),
            predicates,
            steps,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr, XPathError> {
        let offset = self.offset();
        match self.advance() {
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Literal(value)) => Ok(Expr::Literal(value)),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::Dollar) => Err(XPathError::Unsupported("variable references".to_string())),
            Some(Token::Name(name)) if self.peek() == Some(&Token::LParen) => {
                self.pos += 1;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.parse_expr()?);
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        self.expect(&Token::Comma)?;
                    }
                }
                Ok(Expr::Function(name, args))
            }
            Some(other) => Err(XPathError::Syntax {
                position: offset,
                message: format!("unexpected {}", describe(&other)),
            }),
            None => Err(XPathError::Syntax {
                position: offset,
                message: "unexpected end of expression".to_string(),
            }),
        }
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(name, "node" | "text" | "comment" | "processing-instruction")
}

fn describe(token: &Token) -> String {
    match token {
        Token::Slash => "'/'".to_string(),
        Token::DoubleSlash => "'//'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::LBracket => "'['".to_string(),
        Token::RBracket => "']'".to_string(),
        Token::Dot => "'.'".to_string(),
        Token::DoubleDot => "'..'".to_string(),
        Token::At => "'@'".to_string(),
        Token::Comma => "','".to_string(),
        Token::DoubleColon => "'::'".to_string(),
        Token::Dollar => "'$'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::Name(name) => format!("name '{name}'"),
        Token::Literal(value) => format!("literal '{value}'"),
        Token::Number(value) => format!("number {value}"),
        Token::Op(op) => format!("operator {op:?}"),
    }
}
