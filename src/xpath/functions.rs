//! Core function library.
//!
//! The XPath 1.0 string, boolean, number and node-set functions, plus
//! `ends-with`, `lower-case` and `upper-case`, which generated locators use
//! often enough to be worth accepting.

use super::ast::Expr;
use super::eval::{Context, DocumentIndex, Node, Value};
use super::XPathError;

type FnResult<'a> = Result<Value<'a>, XPathError>;

/// Dispatches a function call by name.
pub(super) fn call<'a>(
    index: &DocumentIndex<'a>,
    name: &str,
    args: &[Expr],
    ctx: &Context<'a>,
) -> FnResult<'a> {
    let call = Call {
        index,
        name,
        args,
        ctx,
    };

    match name {
        // Node-set functions
        "last" => call.arity(0, 0).map(|()| Value::Number(ctx.size as f64)),
        "position" => call.arity(0, 0).map(|()| Value::Number(ctx.position as f64)),
        "count" => {
            call.arity(1, 1)?;
            Ok(Value::Number(call.nodes(0)?.len() as f64))
        }
        "name" | "local-name" => {
            call.arity(0, 1)?;
            let name = call
                .optional_nodes(0)?
                .first()
                .and_then(Node::name)
                .unwrap_or_default();
            Ok(Value::String(name))
        }

        // String functions
        "string" => {
            call.arity(0, 1)?;
            Ok(Value::String(call.optional_string(0)?))
        }
        "concat" => {
            call.arity(2, usize::MAX)?;
            let mut out = String::new();
            for i in 0..args.len() {
                out.push_str(&call.string(i)?);
            }
            Ok(Value::String(out))
        }
        "starts-with" => call.string_predicate(|s, t| s.starts_with(t)),
        "ends-with" => call.string_predicate(|s, t| s.ends_with(t)),
        "contains" => call.string_predicate(|s, t| s.contains(t)),
        "substring-before" => call.string_pair(|s, t| {
            s.find(t).map(|i| s[..i].to_string()).unwrap_or_default()
        }),
        "substring-after" => call.string_pair(|s, t| {
            s.find(t).map(|i| s[i + t.len()..].to_string()).unwrap_or_default()
        }),
        "substring" => {
            call.arity(2, 3)?;
            let s = call.string(0)?;
            let start = call.number(1)?;
            let length = if args.len() == 3 {
                Some(call.number(2)?)
            } else {
                None
            };
            Ok(Value::String(substring(&s, start, length)))
        }
        "string-length" => {
            call.arity(0, 1)?;
            Ok(Value::Number(call.optional_string(0)?.chars().count() as f64))
        }
        "normalize-space" => {
            call.arity(0, 1)?;
            let s = call.optional_string(0)?;
            Ok(Value::String(s.split_whitespace().collect::<Vec<_>>().join(" ")))
        }
        "translate" => {
            call.arity(3, 3)?;
            let (s, from, to) = (call.string(0)?, call.string(1)?, call.string(2)?);
            Ok(Value::String(translate(&s, &from, &to)))
        }
        "lower-case" => {
            call.arity(1, 1)?;
            Ok(Value::String(call.string(0)?.to_lowercase()))
        }
        "upper-case" => {
            call.arity(1, 1)?;
            Ok(Value::String(call.string(0)?.to_uppercase()))
        }

        // Boolean functions
        "boolean" => {
            call.arity(1, 1)?;
            Ok(Value::Boolean(call.value(0)?.to_boolean()))
        }
        "not" => {
            call.arity(1, 1)?;
            Ok(Value::Boolean(!call.value(0)?.to_boolean()))
        }
        "true" => call.arity(0, 0).map(|()| Value::Boolean(true)),
        "false" => call.arity(0, 0).map(|()| Value::Boolean(false)),

        // Number functions
        "number" => {
            call.arity(0, 1)?;
            let value = if args.is_empty() {
                Value::Nodes(vec![ctx.node.clone()]).to_number()
            } else {
                call.number(0)?
            };
            Ok(Value::Number(value))
        }
        "sum" => {
            call.arity(1, 1)?;
            let total: f64 = call
                .nodes(0)?
                .iter()
                .map(|n| Value::String(n.text()).to_number())
                .sum();
            Ok(Value::Number(total))
        }
        "floor" => call.number_fn(f64::floor),
        "ceiling" => call.number_fn(f64::ceil),
        "round" => call.number_fn(round_half_up),

        _ => Err(XPathError::UnknownFunction(name.to_string())),
    }
}

/// Arguments of one call, evaluated lazily in the caller's context.
struct Call<'c, 'a> {
    index: &'c DocumentIndex<'a>,
    name: &'c str,
    args: &'c [Expr],
    ctx: &'c Context<'a>,
}

impl<'a> Call<'_, 'a> {
    fn arity(&self, min: usize, max: usize) -> Result<(), XPathError> {
        let found = self.args.len();
        if found < min || found > max {
            let expected = match (min, max) {
                (min, usize::MAX) => format!("at least {min}"),
                (min, max) if min == max => min.to_string(),
                (min, max) => format!("{min} to {max}"),
            };
            return Err(XPathError::Arity {
                name: self.name.to_string(),
                expected,
                found,
            });
        }
        Ok(())
    }

    fn value(&self, i: usize) -> FnResult<'a> {
        self.index.eval(&self.args[i], self.ctx)
    }

    fn string(&self, i: usize) -> Result<String, XPathError> {
        Ok(self.value(i)?.to_xpath_string())
    }

    fn number(&self, i: usize) -> Result<f64, XPathError> {
        Ok(self.value(i)?.to_number())
    }

    fn nodes(&self, i: usize) -> Result<Vec<Node<'a>>, XPathError> {
        match self.value(i)? {
            Value::Nodes(nodes) => Ok(nodes),
            other => Err(XPathError::Type(format!(
                "{}() expects a node-set, got a {}",
                self.name,
                other.type_name()
            ))),
        }
    }

    /// Argument `i` as a node-set, defaulting to the context node.
    fn optional_nodes(&self, i: usize) -> Result<Vec<Node<'a>>, XPathError> {
        if self.args.len() > i {
            self.nodes(i)
        } else {
            Ok(vec![self.ctx.node.clone()])
        }
    }

    /// Argument `i` as a string, defaulting to the context node's text.
    fn optional_string(&self, i: usize) -> Result<String, XPathError> {
        if self.args.len() > i {
            self.string(i)
        } else {
            Ok(self.ctx.node.text())
        }
    }

    fn string_predicate(&self, test: impl Fn(&str, &str) -> bool) -> FnResult<'a> {
        self.arity(2, 2)?;
        Ok(Value::Boolean(test(&self.string(0)?, &self.string(1)?)))
    }

    fn string_pair(&self, op: impl Fn(&str, &str) -> String) -> FnResult<'a> {
        self.arity(2, 2)?;
        Ok(Value::String(op(&self.string(0)?, &self.string(1)?)))
    }

    fn number_fn(&self, op: impl Fn(f64) -> f64) -> FnResult<'a> {
        self.arity(1, 1)?;
        Ok(Value::Number(op(self.number(0)?)))
    }
}

/// XPath `round()`: halves go towards positive infinity.
fn round_half_up(n: f64) -> f64 {
    if n.is_nan() || n.is_infinite() {
        n
    } else {
        (n + 0.5).floor()
    }
}

/// XPath `substring()`: 1-based, positions compared after rounding, so
/// `substring("12345", 1.5, 2.6)` is `"234"`.
fn substring(s: &str, start: f64, length: Option<f64>) -> String {
    let first = round_half_up(start);
    let last = length.map_or(f64::INFINITY, |len| first + round_half_up(len));
    s.chars()
        .enumerate()
        .filter(|&(i, _)| {
            let pos = (i + 1) as f64;
            pos >= first && pos < last
        })
        .map(|(_, c)| c)
        .collect()
}

/// XPath `translate()`: maps characters of `from` to the character at the
/// same index in `to`, deleting those without a counterpart.
fn translate(s: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.chars().collect();
    s.chars()
        .filter_map(|c| match from.iter().position(|&f| f == c) {
            Some(i) => to.get(i).copied(),
            None => Some(c),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_rounding_rules() {
        assert_eq!(substring("12345", 2.0, Some(3.0)), "234");
        assert_eq!(substring("12345", 1.5, Some(2.6)), "234");
        assert_eq!(substring("12345", 0.0, Some(3.0)), "12");
        assert_eq!(substring("12345", 2.0, None), "2345");
        assert_eq!(substring("12345", f64::NAN, Some(3.0)), "");
    }

    #[test]
    fn test_translate() {
        assert_eq!(translate("bar", "abc", "ABC"), "BAr");
        assert_eq!(translate("--aaa--", "abc-", "ABC"), "AAA");
    }

    #[test]
    fn test_round() {
        assert!((round_half_up(2.5) - 3.0).abs() < f64::EPSILON);
        assert!((round_half_up(-2.5) + 2.0).abs() < f64::EPSILON);
        assert!(round_half_up(f64::NAN).is_nan());
    }
}
