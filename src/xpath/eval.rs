//! Evaluation of compiled locators against a `dom_query` tree.
//!
//! Node-sets are kept in document order without duplicates after every step,
//! which is what positional predicates on filter expressions and the
//! "first node" string conversion rely on.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::dom::{self, Document, NodeId, NodeRef};

use super::ast::{Axis, Expr, NodeTest, Step};
use super::functions;
use super::lexer::Operator;
use super::XPathError;

/// A node an expression can select: a tree node or an attribute of an
/// element.
#[derive(Clone)]
pub enum Node<'a> {
    /// Document, element, text or comment node.
    Tree(NodeRef<'a>),
    /// Attribute `index` (source order) of `owner`.
    Attribute {
        owner: NodeRef<'a>,
        index: usize,
        name: String,
        value: String,
    },
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tree(node) => f
                .debug_tuple("Tree")
                .field(&node.id)
                .field(&dom::tag_name(node))
                .finish(),
            Self::Attribute { name, value, .. } => f
                .debug_struct("Attribute")
                .field("name", name)
                .field("value", value)
                .finish(),
        }
    }
}

impl<'a> Node<'a> {
    /// The XPath string-value: descendant text for elements, own text for
    /// text nodes, the value for attributes.
    #[must_use]
    pub fn text(&self) -> String {
        match self {
            Self::Tree(node) => dom::text_content(node).to_string(),
            Self::Attribute { value, .. } => value.clone(),
        }
    }

    /// Tag name for elements, attribute name for attributes.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        match self {
            Self::Tree(node) => dom::tag_name(node),
            Self::Attribute { name, .. } => Some(name.clone()),
        }
    }

    /// Whether this is an attribute node.
    #[must_use]
    pub fn is_attribute(&self) -> bool {
        matches!(self, Self::Attribute { .. })
    }

    /// The underlying tree node; the owning element for attributes.
    #[must_use]
    pub fn node_ref(&self) -> NodeRef<'a> {
        match self {
            Self::Tree(node) | Self::Attribute { owner: node, .. } => *node,
        }
    }
}

/// Result of evaluating an expression.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Nodes(Vec<Node<'a>>),
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Value<'_> {
    pub(crate) fn type_name(&self) -> &'static str {
        match self {
            Self::Nodes(_) => "node-set",
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
        }
    }

    /// XPath `string()` conversion.
    #[must_use]
    pub fn to_xpath_string(&self) -> String {
        match self {
            Self::Nodes(nodes) => nodes.first().map(Node::text).unwrap_or_default(),
            Self::String(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Boolean(b) => b.to_string(),
        }
    }

    /// XPath `number()` conversion.
    #[must_use]
    pub fn to_number(&self) -> f64 {
        match self {
            Self::Number(n) => *n,
            Self::Boolean(b) => f64::from(u8::from(*b)),
            Self::Nodes(_) | Self::String(_) => parse_number(&self.to_xpath_string()),
        }
    }

    /// XPath `boolean()` conversion.
    #[must_use]
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Nodes(nodes) => !nodes.is_empty(),
            Self::String(s) => !s.is_empty(),
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Boolean(b) => *b,
        }
    }
}

/// Parses a string the way XPath `number()` does: optional sign, digits and
/// at most one dot, surrounded by whitespace. Anything else is NaN.
pub(crate) fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let well_formed = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|&c| c == '.').count() <= 1
        && digits != ".";
    if well_formed {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Formats a number the way XPath `string()` does.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        // also folds -0 into "0"
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Evaluation context: the context node with its proximity position and
/// the context size.
#[derive(Debug, Clone)]
pub struct Context<'a> {
    pub node: Node<'a>,
    pub position: usize,
    pub size: usize,
}

/// Per-document state needed for evaluation: the document node and the
/// document-order position of every tree node.
pub struct DocumentIndex<'a> {
    root: NodeRef<'a>,
    nodes: Vec<NodeRef<'a>>,
    order: HashMap<NodeId, usize>,
}

impl<'a> DocumentIndex<'a> {
    /// Indexes `doc` once; the index can serve any number of locators.
    #[must_use]
    pub fn new(doc: &'a Document) -> Self {
        let nodes = dom::document_order(doc);
        let order = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id, i))
            .collect();
        Self {
            root: doc.root(),
            nodes,
            order,
        }
    }

    /// Context for evaluating an expression at the document node.
    #[must_use]
    pub fn root_context(&self) -> Context<'a> {
        Context {
            node: Node::Tree(self.root),
            position: 1,
            size: 1,
        }
    }

    fn position_of(&self, node: &NodeRef<'a>) -> usize {
        self.order.get(&node.id).copied().unwrap_or(usize::MAX)
    }

    fn sort_key(&self, node: &Node<'a>) -> (usize, usize) {
        match node {
            Node::Tree(n) => (self.position_of(n), 0),
            Node::Attribute { owner, index, .. } => (self.position_of(owner), index + 1),
        }
    }

    /// Sorts into document order and drops duplicates.
    pub(crate) fn normalize(&self, mut nodes: Vec<Node<'a>>) -> Vec<Node<'a>> {
        nodes.sort_by_key(|n| self.sort_key(n));
        nodes.dedup_by_key(|n| self.sort_key(n));
        nodes
    }

    // === Expressions ===

    pub(crate) fn eval(&self, expr: &Expr, ctx: &Context<'a>) -> Result<Value<'a>, XPathError> {
        match expr {
            Expr::Literal(s) => Ok(Value::String(s.clone())),
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Negate(inner) => Ok(Value::Number(-self.eval(inner, ctx)?.to_number())),
            Expr::Binary(op, lhs, rhs) => self.eval_binary(*op, lhs, rhs, ctx),
            Expr::Function(name, args) => functions::call(self, name, args, ctx),
            Expr::Path { absolute, steps } => {
                let start = if *absolute {
                    Node::Tree(self.root)
                } else {
                    ctx.node.clone()
                };
                Ok(Value::Nodes(self.eval_steps(vec![start], steps)?))
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let nodes = match self.eval(primary, ctx)? {
                    Value::Nodes(nodes) => nodes,
                    other => {
                        return Err(XPathError::Type(format!(
                            "cannot apply predicates or steps to a {}",
                            other.type_name()
                        )))
                    }
                };
                let filtered = self.apply_predicates(self.normalize(nodes), predicates)?;
                Ok(Value::Nodes(self.eval_steps(filtered, steps)?))
            }
        }
    }

    fn eval_binary(
        &self,
        op: Operator,
        lhs: &Expr,
        rhs: &Expr,
        ctx: &Context<'a>,
    ) -> Result<Value<'a>, XPathError> {
        match op {
            Operator::Or => Ok(Value::Boolean(
                self.eval(lhs, ctx)?.to_boolean() || self.eval(rhs, ctx)?.to_boolean(),
            )),
            Operator::And => Ok(Value::Boolean(
                self.eval(lhs, ctx)?.to_boolean() && self.eval(rhs, ctx)?.to_boolean(),
            )),
            Operator::Union => match (self.eval(lhs, ctx)?, self.eval(rhs, ctx)?) {
                (Value::Nodes(mut a), Value::Nodes(b)) => {
                    a.extend(b);
                    Ok(Value::Nodes(self.normalize(a)))
                }
                (a, b) => Err(XPathError::Type(format!(
                    "union of {} and {}; both operands must be node-sets",
                    a.type_name(),
                    b.type_name()
                ))),
            },
            Operator::Eq | Operator::Ne | Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => {
                let a = self.eval(lhs, ctx)?;
                let b = self.eval(rhs, ctx)?;
                Ok(Value::Boolean(compare(op, &a, &b)))
            }
            Operator::Plus | Operator::Minus | Operator::Multiply | Operator::Div | Operator::Mod => {
                let a = self.eval(lhs, ctx)?.to_number();
                let b = self.eval(rhs, ctx)?.to_number();
                Ok(Value::Number(match op {
                    Operator::Plus => a + b,
                    Operator::Minus => a - b,
                    Operator::Multiply => a * b,
                    Operator::Div => a / b,
                    // Rust's % truncates like XPath mod
                    _ => a % b,
                }))
            }
        }
    }

    // === Location steps ===

    pub(crate) fn eval_steps(
        &self,
        start: Vec<Node<'a>>,
        steps: &[Step],
    ) -> Result<Vec<Node<'a>>, XPathError> {
        let mut current = start;
        for step in steps {
            let mut next = Vec::new();
            for node in &current {
                let candidates: Vec<Node<'a>> = self
                    .axis_nodes(node, step.axis)
                    .into_iter()
                    .filter(|candidate| matches_test(candidate, &step.test))
                    .collect();
                next.extend(self.apply_predicates(candidates, &step.predicates)?);
            }
            current = self.normalize(next);
        }
        Ok(current)
    }

    /// Filters `nodes` (in proximity order) through each predicate in turn.
    fn apply_predicates(
        &self,
        mut nodes: Vec<Node<'a>>,
        predicates: &[Expr],
    ) -> Result<Vec<Node<'a>>, XPathError> {
        for predicate in predicates {
            let size = nodes.len();
            let mut kept = Vec::with_capacity(size);
            for (i, node) in nodes.into_iter().enumerate() {
                let ctx = Context {
                    node,
                    position: i + 1,
                    size,
                };
                let keep = match self.eval(predicate, &ctx)? {
                    Value::Number(n) => (n - ctx.position as f64).abs() < f64::EPSILON,
                    other => other.to_boolean(),
                };
                if keep {
                    kept.push(ctx.node);
                }
            }
            nodes = kept;
        }
        Ok(nodes)
    }

    /// Nodes on `axis` from `node`, in proximity order (reverse document
    /// order for reverse axes).
    fn axis_nodes(&self, node: &Node<'a>, axis: Axis) -> Vec<Node<'a>> {
        let tree = |nodes: Vec<NodeRef<'a>>| nodes.into_iter().map(Node::Tree).collect::<Vec<_>>();

        match node {
            Node::Tree(n) => match axis {
                Axis::Child => tree(dom::child_nodes(n)),
                Axis::Descendant => tree(dom::descendant_nodes(n)),
                Axis::DescendantOrSelf => {
                    let mut out = vec![node.clone()];
                    out.extend(tree(dom::descendant_nodes(n)));
                    out
                }
                Axis::Parent => n.parent().map(Node::Tree).into_iter().collect(),
                Axis::Ancestor => tree(dom::ancestor_nodes(n)),
                Axis::AncestorOrSelf => {
                    let mut out = vec![node.clone()];
                    out.extend(tree(dom::ancestor_nodes(n)));
                    out
                }
                Axis::FollowingSibling => tree(dom::following_siblings(n)),
                Axis::PrecedingSibling => tree(dom::preceding_siblings(n)),
                Axis::Following => tree(self.following(n)),
                Axis::Preceding => tree(self.preceding(n)),
                Axis::Attribute => dom::attributes(n)
                    .into_iter()
                    .enumerate()
                    .map(|(index, (name, value))| Node::Attribute {
                        owner: *n,
                        index,
                        name,
                        value,
                    })
                    .collect(),
                Axis::SelfAxis => vec![node.clone()],
            },
            Node::Attribute { owner, .. } => match axis {
                Axis::Parent => vec![Node::Tree(*owner)],
                Axis::Ancestor => {
                    let mut out = vec![Node::Tree(*owner)];
                    out.extend(tree(dom::ancestor_nodes(owner)));
                    out
                }
                Axis::AncestorOrSelf => {
                    let mut out = vec![node.clone(), Node::Tree(*owner)];
                    out.extend(tree(dom::ancestor_nodes(owner)));
                    out
                }
                Axis::SelfAxis | Axis::DescendantOrSelf => vec![node.clone()],
                Axis::Following => {
                    let mut out = tree(dom::descendant_nodes(owner));
                    out.extend(tree(self.following(owner)));
                    out
                }
                Axis::Preceding => tree(self.preceding(owner)),
                _ => Vec::new(),
            },
        }
    }

    /// Nodes after `node` in document order, excluding its descendants.
    fn following(&self, node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
        let start = self.position_of(node);
        if start == usize::MAX {
            return Vec::new();
        }
        let skip = dom::descendant_nodes(node).len();
        self.nodes
            .iter()
            .skip(start + 1 + skip)
            .copied()
            .collect()
    }

    /// Nodes before `node` in document order, excluding its ancestors,
    /// nearest first.
    fn preceding(&self, node: &NodeRef<'a>) -> Vec<NodeRef<'a>> {
        let end = self.position_of(node);
        if end == usize::MAX {
            return Vec::new();
        }
        let ancestors: HashSet<NodeId> = dom::ancestor_nodes(node).iter().map(|a| a.id).collect();
        self.nodes[..end]
            .iter()
            .rev()
            .filter(|n| !ancestors.contains(&n.id))
            .copied()
            .collect()
    }
}

fn matches_test(node: &Node<'_>, test: &NodeTest) -> bool {
    match (node, test) {
        (_, NodeTest::AnyNode) | (Node::Attribute { .. }, NodeTest::Principal) => true,
        (Node::Tree(n), NodeTest::Principal) => n.is_element(),
        (Node::Attribute { name, .. }, NodeTest::Name(wanted)) => name.eq_ignore_ascii_case(wanted),
        (Node::Tree(n), NodeTest::Name(wanted)) => dom::tag_name(n).is_some_and(|t| t == *wanted),
        (Node::Tree(n), NodeTest::Text) => n.is_text(),
        (Node::Tree(n), NodeTest::Comment) => n.is_comment(),
        _ => false,
    }
}

// === Comparisons (XPath 1.0 §3.4) ===

fn compare(op: Operator, lhs: &Value<'_>, rhs: &Value<'_>) -> bool {
    match (lhs, rhs) {
        (Value::Nodes(a), Value::Nodes(b)) => {
            let b_texts: Vec<String> = b.iter().map(Node::text).collect();
            a.iter().any(|x| {
                let x = Value::String(x.text());
                b_texts
                    .iter()
                    .any(|y| compare_atomic(op, &x, &Value::String(y.clone())))
            })
        }
        (Value::Nodes(a), Value::Boolean(_)) => {
            compare_atomic(op, &Value::Boolean(!a.is_empty()), rhs)
        }
        (Value::Boolean(_), Value::Nodes(b)) => {
            compare_atomic(op, lhs, &Value::Boolean(!b.is_empty()))
        }
        (Value::Nodes(a), other) => a
            .iter()
            .any(|x| compare_atomic(op, &Value::String(x.text()), other)),
        (other, Value::Nodes(b)) => b
            .iter()
            .any(|y| compare_atomic(op, other, &Value::String(y.text()))),
        _ => compare_atomic(op, lhs, rhs),
    }
}

fn compare_atomic(op: Operator, lhs: &Value<'_>, rhs: &Value<'_>) -> bool {
    match op {
        Operator::Eq | Operator::Ne => {
            let equal = match (lhs, rhs) {
                (Value::Boolean(_), _) | (_, Value::Boolean(_)) => lhs.to_boolean() == rhs.to_boolean(),
                #[allow(clippy::float_cmp)]
                (Value::Number(_), _) | (_, Value::Number(_)) => lhs.to_number() == rhs.to_number(),
                _ => lhs.to_xpath_string() == rhs.to_xpath_string(),
            };
            if op == Operator::Eq {
                equal
            } else {
                !equal
            }
        }
        _ => {
            let (a, b) = (lhs.to_number(), rhs.to_number());
            match op {
                Operator::Lt => a < b,
                Operator::Le => a <= b,
                Operator::Gt => a > b,
                _ => a >= b,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_parsing_is_strict() {
        assert!((parse_number(" 42 ") - 42.0).abs() < f64::EPSILON);
        assert!((parse_number("-1.5") + 1.5).abs() < f64::EPSILON);
        assert!(parse_number("1e3").is_nan());
        assert!(parse_number("inf").is_nan());
        assert!(parse_number("").is_nan());
        assert!(parse_number(".").is_nan());
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_atomic_equality_promotes_types() {
        let one = Value::Number(1.0);
        assert!(compare_atomic(Operator::Eq, &one, &Value::String("1".into())));
        assert!(compare_atomic(Operator::Eq, &Value::Boolean(true), &Value::String("x".into())));
        assert!(compare_atomic(Operator::Ne, &Value::String("a".into()), &Value::String("b".into())));
        assert!(compare_atomic(Operator::Lt, &Value::String("2".into()), &Value::Number(10.0)));
    }

    #[test]
    fn test_nan_is_never_equal() {
        let nan = Value::Number(f64::NAN);
        assert!(!compare_atomic(Operator::Eq, &nan, &nan));
        assert!(compare_atomic(Operator::Ne, &nan, &nan));
    }
}
