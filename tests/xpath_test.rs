use rs_xpath_extract::dom;
use rs_xpath_extract::xpath::{DocumentIndex, Value, XPath, XPathError};

const PAGE: &str = r#"<html><head><title>Local News</title></head><body>
<div class="article-body">
  <h2 class="Headline">Bridge reopens</h2>
  <div class="meta"><span>By Staff</span> | <span class="pubdate">2024-06-02</span></div>
  <p>First.</p>
  <div class="ad"><p>Buy now</p></div>
  <p>Second.</p>
  <p data-kind="footnote">Note.</p>
</div>
</body></html>"#;

fn texts(expr: &str) -> Vec<String> {
    let doc = dom::parse(PAGE);
    XPath::compile(expr)
        .unwrap_or_else(|e| panic!("{expr}: {e}"))
        .select(&doc)
        .unwrap_or_else(|e| panic!("{expr}: {e}"))
        .iter()
        .map(|n| n.text().trim().to_string())
        .collect()
}

#[test]
fn typical_generated_locators() {
    assert_eq!(texts("//h2[@class='Headline']"), vec!["Bridge reopens"]);
    assert_eq!(texts("//span[@class='pubdate']/text()"), vec!["2024-06-02"]);
    assert_eq!(
        texts("//div[@class='article-body']/p"),
        vec!["First.", "Second.", "Note."]
    );
    assert_eq!(
        texts("//div[contains(@class,'article')]/p[not(@data-kind)]"),
        vec!["First.", "Second."]
    );
    assert_eq!(texts("/html/head/title"), vec!["Local News"]);
}

#[test]
fn descendant_versus_child() {
    assert_eq!(texts("//div[@class='article-body']//p").len(), 4);
    assert_eq!(texts("//div[@class='article-body']/p").len(), 3);
}

#[test]
fn positional_forms() {
    assert_eq!(texts("(//p)[1]"), vec!["First."]);
    assert_eq!(texts("(//p)[last()]"), vec!["Note."]);
    assert_eq!(texts("//div[@class='meta']/span[2]"), vec!["2024-06-02"]);
    assert_eq!(texts("//p[position() mod 2 = 1]"), vec!["First.", "Buy now", "Note."]);
}

#[test]
fn text_based_predicates() {
    assert_eq!(texts("//span[contains(text(), 'Staff')]"), vec!["By Staff"]);
    assert_eq!(
        texts("//*[normalize-space(text()) = 'Bridge reopens']"),
        vec!["Bridge reopens"]
    );
    assert_eq!(
        texts("//h2[contains(translate(@class, 'HEADLIN', 'headlin'), 'headline')]"),
        vec!["Bridge reopens"]
    );
}

#[test]
fn self_and_ancestor_axes() {
    assert_eq!(texts("//span[@class='pubdate']/ancestor::div[1]/span[1]"), vec!["By Staff"]);
    assert_eq!(texts("//p[.='Buy now']/parent::div/@class"), vec!["ad"]);
    assert_eq!(texts("//p/self::p[@data-kind]"), vec!["Note."]);
}

#[test]
fn compile_errors_are_reported() {
    assert!(matches!(
        XPath::compile("//div["),
        Err(XPathError::Syntax { .. })
    ));
    assert!(matches!(
        XPath::compile("//namespace::x"),
        Err(XPathError::Unsupported(_))
    ));
    assert!(matches!(XPath::compile("$title"), Err(XPathError::Unsupported(_))));
    assert!(XPath::compile("").is_err());
    assert!(XPath::compile("//p[").is_err());
}

#[test]
fn deep_nesting_is_bounded() {
    let expr = format!("{}1{}", "(".repeat(500), ")".repeat(500));
    assert!(matches!(XPath::compile(&expr), Err(XPathError::TooDeep(_))));
}

#[test]
fn one_index_serves_many_locators() {
    let doc = dom::parse(PAGE);
    let index = DocumentIndex::new(&doc);
    let count = XPath::compile("count(//p)").expect("compile").evaluate(&index).expect("eval");
    assert!(matches!(count, Value::Number(n) if (n - 4.0).abs() < f64::EPSILON));
    let exists = XPath::compile("boolean(//h2)").expect("compile").evaluate(&index).expect("eval");
    assert!(matches!(exists, Value::Boolean(true)));
    assert_eq!(
        XPath::compile("//h2").expect("compile").select_in(&index).expect("select").len(),
        1
    );
}
