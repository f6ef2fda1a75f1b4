//! Locator query language.
//!
//! Generated selectors are XPath 1.0 expressions, so this module carries a
//! compact XPath engine over the `dom_query` tree: a tokenizer, a
//! recursive-descent parser and an evaluator covering location paths on all
//! axes except `namespace`, predicates, operators and the core function
//! library. Attribute steps (`//meta/@content`) select attribute nodes whose
//! text is the attribute value.
//!
//! # Example
//!
//! ```rust
//! use rs_xpath_extract::dom;
//! use rs_xpath_extract::xpath::XPath;
//!
//! let doc = dom::parse(r#"<div><span class="date">2024-05-01</span></div>"#);
//! let xpath = XPath::compile("//span[@class='date']")?;
//! let matches = xpath.select(&doc)?;
//! assert_eq!(matches[0].text(), "2024-05-01");
//! # Ok::<(), rs_xpath_extract::xpath::XPathError>(())
//! ```

mod ast;
mod eval;
mod functions;
mod lexer;
mod parser;

pub use eval::{Context, DocumentIndex, Node, Value};

use crate::dom::Document;

/// Errors raised while compiling or evaluating a locator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XPathError {
    /// The expression is not well-formed.
    #[error("syntax error at offset {position}: {message}")]
    Syntax { position: usize, message: String },

    /// Call to a function outside the supported library.
    #[error("unknown function '{0}()'")]
    UnknownFunction(String),

    /// Function called with the wrong number of arguments.
    #[error("function '{name}()' expects {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },

    /// An operand has the wrong type (e.g. a path step applied to a string).
    #[error("type error: {0}")]
    Type(String),

    /// Valid XPath this engine does not implement.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Parentheses or predicates nested beyond the parser's bound.
    #[error("expression nesting exceeds {0} levels")]
    TooDeep(usize),

    /// More binary operators than the parser accepts in one expression.
    #[error("expression has more than {0} operators")]
    TooComplex(usize),
}

/// A compiled locator expression.
#[derive(Debug, Clone, PartialEq)]
pub struct XPath {
    source: String,
    expr: ast::Expr,
}

impl XPath {
    /// Compiles an expression.
    ///
    /// # Errors
    ///
    /// Returns [`XPathError::Syntax`], [`XPathError::Unsupported`],
    /// [`XPathError::TooDeep`] or [`XPathError::TooComplex`] when the
    /// expression cannot be compiled.
    pub fn compile(source: &str) -> Result<Self, XPathError> {
        let expr = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The expression text this locator was compiled from.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates against the document node, returning whatever type the
    /// expression produces.
    ///
    /// # Errors
    ///
    /// Returns an [`XPathError`] raised during evaluation.
    pub fn evaluate<'a>(&self, index: &DocumentIndex<'a>) -> Result<Value<'a>, XPathError> {
        index.eval(&self.expr, &index.root_context())
    }

    /// Selects the nodes matched by a node-set expression, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`XPathError::Type`] if the expression yields a string,
    /// number or boolean instead of nodes, or any evaluation error.
    pub fn select_in<'a>(&self, index: &DocumentIndex<'a>) -> Result<Vec<Node<'a>>, XPathError> {
        match self.evaluate(index)? {
            Value::Nodes(nodes) => Ok(nodes),
            other => Err(XPathError::Type(format!(
                "locator '{}' evaluates to a {}, not to nodes",
                self.source,
                other.type_name()
            ))),
        }
    }

    /// Convenience for a single query: indexes `doc` and selects.
    ///
    /// # Errors
    ///
    /// See [`XPath::select_in`].
    pub fn select<'a>(&self, doc: &'a Document) -> Result<Vec<Node<'a>>, XPathError> {
        self.select_in(&DocumentIndex::new(doc))
    }
}

impl std::str::FromStr for XPath {
    type Err = XPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom;

    const ARTICLE: &str = r#"<html><head><title>Site | Story</title>
        <meta property="article:published_time" content="2024-05-01T08:00:00Z"></head>
        <body>
          <div id="main" class="story wide">
            <h1>Vaccine Update</h1>
            <span class="date">2024-05-01</span>
            <p>Para one.</p>
            <p class="note">Para two.</p>
            <p>Para three.</p>
          </div>
          <ul><li>a</li><li>b</li><li>c</li></ul>
        </body></html>"#;

    fn texts(expr: &str) -> Vec<String> {
        let doc = dom::parse(ARTICLE);
        XPath::compile(expr)
            .unwrap()
            .select(&doc)
            .unwrap()
            .iter()
            .map(|n| n.text().trim().to_string())
            .collect()
    }

    fn scalar(expr: &str) -> String {
        let doc = dom::parse(ARTICLE);
        let index = DocumentIndex::new(&doc);
        XPath::compile(expr)
            .unwrap()
            .evaluate(&index)
            .unwrap()
            .to_xpath_string()
    }

    #[test]
    fn test_descendant_and_attribute_equality() {
        assert_eq!(texts("//h1"), vec!["Vaccine Update"]);
        assert_eq!(texts("//span[@class='date']"), vec!["2024-05-01"]);
        assert_eq!(texts("//p"), vec!["Para one.", "Para two.", "Para three."]);
    }

    #[test]
    fn test_positional_predicates() {
        assert_eq!(texts("//p[2]"), vec!["Para two."]);
        assert_eq!(texts("//p[last()]"), vec!["Para three."]);
        assert_eq!(texts("//li[position() > 1]"), vec!["b", "c"]);
        assert_eq!(texts("(//p | //li)[4]"), vec!["a"]);
    }

    #[test]
    fn test_contains_and_text_predicates() {
        assert_eq!(texts("//div[contains(@class, 'story')]/h1"), vec!["Vaccine Update"]);
        assert_eq!(texts("//p[text()='Para two.']"), vec!["Para two."]);
        assert_eq!(texts("//p[contains(., 'three')]"), vec!["Para three."]);
        assert_eq!(texts("//p[starts-with(normalize-space(), 'Para o')]"), vec!["Para one."]);
    }

    #[test]
    fn test_boolean_operators_in_predicates() {
        assert_eq!(texts("//p[@class='note' or position()=1]"), vec!["Para one.", "Para two."]);
        assert_eq!(texts("//p[not(@class)]"), vec!["Para one.", "Para three."]);
    }

    #[test]
    fn test_attribute_selection() {
        assert_eq!(
            texts("//meta[@property='article:published_time']/@content"),
            vec!["2024-05-01T08:00:00Z"]
        );
        assert_eq!(texts("//div/@id"), vec!["main"]);
    }

    #[test]
    fn test_sibling_and_parent_axes() {
        assert_eq!(texts("//h1/following-sibling::p[1]"), vec!["Para one."]);
        assert_eq!(texts("//p[@class='note']/preceding-sibling::*[1]"), vec!["Para one."]);
        assert_eq!(texts("//span/../h1"), vec!["Vaccine Update"]);
        assert_eq!(texts("//li[.='b']/ancestor::*[1]/li[1]"), vec!["a"]);
    }

    #[test]
    fn test_following_and_preceding_axes() {
        assert_eq!(texts("//p[last()]/following::li"), vec!["a", "b", "c"]);
        assert_eq!(texts("//li[1]/preceding::p[1]"), vec!["Para three."]);
    }

    #[test]
    fn test_text_nodes() {
        assert_eq!(texts("//h1/text()"), vec!["Vaccine Update"]);
    }

    #[test]
    fn test_union_is_in_document_order_without_duplicates() {
        assert_eq!(texts("//span | //h1 | //h1"), vec!["Vaccine Update", "2024-05-01"]);
    }

    #[test]
    fn test_scalar_expressions() {
        assert_eq!(scalar("count(//p)"), "3");
        assert_eq!(scalar("string(//h1)"), "Vaccine Update");
        assert_eq!(scalar("concat('a', 'b', 1 + 1)"), "ab2");
        assert_eq!(scalar("substring-before(//title, ' |')"), "Site");
        assert_eq!(scalar("7 mod 3 * 2"), "2");
        assert_eq!(scalar("-(3 div 2)"), "-1.5");
        assert_eq!(scalar("translate('2024/05/01', '/', '-')"), "2024-05-01");
        assert_eq!(scalar("name(//*[@id='main'])"), "div");
    }

    #[test]
    fn test_case_insensitive_names() {
        assert_eq!(texts("//H1"), vec!["Vaccine Update"]);
    }

    #[test]
    fn test_select_rejects_scalar_results() {
        let doc = dom::parse(ARTICLE);
        let err = XPath::compile("count(//p)").unwrap().select(&doc).unwrap_err();
        assert!(matches!(err, XPathError::Type(_)));
    }

    #[test]
    fn test_evaluation_errors() {
        let doc = dom::parse(ARTICLE);
        let unknown = XPath::compile("//p[frobnicate()]").unwrap().select(&doc);
        assert!(matches!(unknown, Err(XPathError::UnknownFunction(name)) if name == "frobnicate"));

        let arity = XPath::compile("//p[contains(.)]").unwrap().select(&doc);
        assert!(matches!(arity, Err(XPathError::Arity { found: 1, .. })));

        let path_on_string = XPath::compile("string(//h1)/p").unwrap().select(&doc);
        assert!(matches!(path_on_string, Err(XPathError::Type(_))));
    }

    #[test]
    fn test_from_str() {
        let xpath: XPath = "//h1".parse().unwrap();
        assert_eq!(xpath.source(), "//h1");
    }
}
