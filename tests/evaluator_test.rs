use rs_xpath_extract::{
    evaluate, ExtractionResult, RawDocument, SelectorSet, DATE_NOT_FOUND, EXTRACTION_FAILED,
    TITLE_NOT_FOUND,
};

const VACCINE_HTML: &str = r#"<html><body><h1>Vaccine Update</h1><span class="date">2024-05-01</span><p>Para one.</p><p>Para two.</p></body></html>"#;

fn selectors(title: &str, date: &str, content: &str) -> SelectorSet {
    SelectorSet::new(title, date, "YYYY-MM-DD", content).expect("valid selectors")
}

fn vaccine_selectors() -> SelectorSet {
    selectors("//h1", "//span[@class='date']", "//p")
}

#[test]
fn vaccine_update_document_extracts_all_fields() {
    let result = evaluate(&RawDocument::new(VACCINE_HTML), &vaccine_selectors(), 2_000);
    assert_eq!(
        result,
        ExtractionResult {
            title: "Vaccine Update".into(),
            date: "2024-05-01".into(),
            content: "Para one. Para two.".into(),
        }
    );
}

#[test]
fn unmatched_title_falls_back_without_touching_other_fields() {
    let edited = vaccine_selectors()
        .with_title_selector("//h2")
        .expect("valid edit");
    let result = evaluate(&RawDocument::new(VACCINE_HTML), &edited, 2_000);
    assert_eq!(result.title, TITLE_NOT_FOUND);
    assert_eq!(result.date, "2024-05-01");
    assert_eq!(result.content, "Para one. Para two.");
    assert!(!result.title_found());
    assert!(result.date_found());
}

#[test]
fn unmatched_date_falls_back() {
    let result = evaluate(
        &RawDocument::new(VACCINE_HTML),
        &selectors("//h1", "//time", "//p"),
        2_000,
    );
    assert_eq!(result.date, DATE_NOT_FOUND);
}

#[test]
fn unmatched_content_is_empty_not_a_sentinel() {
    let result = evaluate(
        &RawDocument::new(VACCINE_HTML),
        &selectors("//h1", "//span", "//article//p"),
        2_000,
    );
    assert_eq!(result.content, "");
}

#[test]
fn whitespace_only_paragraphs_are_dropped() {
    let html = "<html><body><h1>T</h1><p>First.</p><p>   \n\t </p><p>Last.</p></body></html>";
    let result = evaluate(&RawDocument::new(html), &selectors("//h1", "//h1", "//p"), 2_000);
    assert_eq!(result.content, "First. Last.");
}

#[test]
fn content_is_truncated_to_exact_prefix() {
    let paragraphs: String = (0..200)
        .map(|i| format!("<p>Paragraph number {i}: ünïcödé text.</p>"))
        .collect();
    let html = format!("<html><body><h1>T</h1>{paragraphs}</body></html>");
    let raw = RawDocument::new(html);
    let sel = selectors("//h1", "//h1", "//p");

    let full = evaluate(&raw, &sel, usize::MAX).content;
    assert!(full.chars().count() > 2_000);

    let truncated = evaluate(&raw, &sel, 2_000).content;
    assert_eq!(truncated.chars().count(), 2_000);
    assert!(full.starts_with(&truncated));
}

#[test]
fn evaluation_is_idempotent() {
    let raw = RawDocument::new(VACCINE_HTML);
    let sel = vaccine_selectors();
    assert_eq!(evaluate(&raw, &sel, 10), evaluate(&raw, &sel, 10));
}

#[test]
fn first_title_match_wins() {
    let html = "<html><body><h1> First </h1><h1>Second</h1></body></html>";
    let result = evaluate(&RawDocument::new(html), &selectors("//h1", "//h1", "//h1"), 2_000);
    assert_eq!(result.title, "First");
    assert_eq!(result.content, "First Second");
}

#[test]
fn nested_text_is_collected() {
    let html = r#"<html><body><div class="byline">Published <time>May 1</time>, 2024</div></body></html>"#;
    let result = evaluate(
        &RawDocument::new(html),
        &selectors("//div", "//div[@class='byline']", "//time"),
        2_000,
    );
    assert_eq!(result.date, "Published May 1, 2024");
    assert_eq!(result.content, "May 1");
}

#[test]
fn attribute_locators_select_values() {
    let html = r#"<html><head><meta property="article:published_time" content="2024-05-01T08:00:00Z"><meta property="og:title" content="OG Title"></head><body></body></html>"#;
    let result = evaluate(
        &RawDocument::new(html),
        &selectors(
            "//meta[@property='og:title']/@content",
            "//meta[@property='article:published_time']/@content",
            "//meta/@property",
        ),
        2_000,
    );
    assert_eq!(result.title, "OG Title");
    assert_eq!(result.date, "2024-05-01T08:00:00Z");
    assert_eq!(result.content, "article:published_time og:title");
}

#[test]
fn invalid_locator_becomes_failure_form() {
    let result = evaluate(
        &RawDocument::new(VACCINE_HTML),
        &selectors("//h1", "//span[@class='date'", "//p"),
        2_000,
    );
    assert_eq!(result.title, EXTRACTION_FAILED);
    assert_eq!(result.date, EXTRACTION_FAILED);
    assert!(!result.content.is_empty());
}

#[test]
fn unknown_function_becomes_failure_form() {
    let result = evaluate(
        &RawDocument::new(VACCINE_HTML),
        &selectors("//h1[matches(., 'V')]", "//span", "//p"),
        2_000,
    );
    assert_eq!(result.title, EXTRACTION_FAILED);
    assert!(result.content.contains("matches"));
}

#[test]
fn long_operator_chain_becomes_failure_form() {
    let union = vec!["//p"; 1_000].join(" | ");
    let result = evaluate(
        &RawDocument::new("<html><body><p>a</p></body></html>"),
        &selectors("//h1", "//span", &union),
        2_000,
    );
    assert_eq!(result.title, EXTRACTION_FAILED);
    assert_eq!(result.date, EXTRACTION_FAILED);
    assert!(result.content.contains("operators"));
}

#[test]
fn noise_elements_are_still_searchable() {
    // Evaluation runs on the unreduced document.
    let html = "<html><body><header><h1>Masthead Title</h1></header><footer><p>Footer text</p></footer></body></html>";
    let result = evaluate(
        &RawDocument::new(html),
        &selectors("//header/h1", "//h1", "//footer/p"),
        2_000,
    );
    assert_eq!(result.title, "Masthead Title");
    assert_eq!(result.content, "Footer text");
}

#[test]
fn result_serializes_with_three_fields() {
    let result = evaluate(&RawDocument::new(VACCINE_HTML), &vaccine_selectors(), 2_000);
    let json = serde_json::to_value(&result).expect("serializable");
    let object = json.as_object().expect("object");
    assert_eq!(object.len(), 3);
    assert_eq!(json["title"], "Vaccine Update");
}
