use rs_xpath_extract::inference::{build_prompt, MockProvider};
use rs_xpath_extract::{
    reduce, ApiCredential, Error, InferenceError, RawDocument, SelectorInference,
};

const PAGE: &str = "<html><body><script>x</script><h1>Headline</h1><p>Body</p></body></html>";

const GOOD: &str = r#"{
    "title_selector": "//h1",
    "date_selector": "//time[@datetime]",
    "date_format_pattern": "YYYY-MM-DD",
    "content_selector": "//article//p"
}"#;

fn key() -> ApiCredential {
    ApiCredential::new("sk-test").expect("non-empty key")
}

fn infer_with(response: &str) -> (Result<rs_xpath_extract::SelectorSet, Error>, MockProvider) {
    let provider = MockProvider::new(response);
    let inference = SelectorInference::new(provider.clone(), "gpt-4o");
    let reduced = reduce(&RawDocument::new(PAGE)).expect("reduce");
    (inference.infer(&reduced, &key()), provider)
}

#[test]
fn valid_response_becomes_selector_set() {
    let (result, provider) = infer_with(GOOD);
    let selectors = result.expect("valid response");
    assert_eq!(selectors.title_selector(), "//h1");
    assert_eq!(selectors.date_selector(), "//time[@datetime]");
    assert_eq!(selectors.date_format_pattern(), "YYYY-MM-DD");
    assert_eq!(selectors.content_selector(), "//article//p");
    assert_eq!(provider.call_count(), 1);
}

#[test]
fn prompt_carries_reduced_document_only() {
    let (_, provider) = infer_with(GOOD);
    let prompt = provider.last_prompt().expect("one request");
    assert!(prompt.contains("Headline"));
    assert!(!prompt.contains("<script>"));

    let reduced = reduce(&RawDocument::new(PAGE)).expect("reduce");
    assert_eq!(prompt, build_prompt(&reduced));
}

#[test]
fn missing_key_is_schema_validation_error() {
    let response = r#"{"title_selector":"//h1","date_selector":"//time","content_selector":"//p"}"#;
    let (result, provider) = infer_with(response);
    let err = result.expect_err("missing key must fail");
    match &err {
        Error::SchemaValidation { reason, raw_response } => {
            assert!(reason.contains("date_format_pattern"));
            assert_eq!(raw_response, response);
        }
        other => panic!("expected SchemaValidation, got {other:?}"),
    }
    assert_eq!(err.raw_response(), Some(response));
    // No retry on validation failure.
    assert_eq!(provider.call_count(), 1);
}

#[test]
fn prose_response_is_rejected() {
    let (result, _) = infer_with("The title is in the h1 element.");
    assert!(matches!(result, Err(Error::SchemaValidation { .. })));
}

#[test]
fn provider_failures_are_inference_errors() {
    for failure in [
        InferenceError::Authentication("bad key".into()),
        InferenceError::Timeout(60),
        InferenceError::Transport("connection refused".into()),
    ] {
        let provider = MockProvider::failing(failure.clone());
        let inference = SelectorInference::new(provider.clone(), "gpt-4o");
        let reduced = reduce(&RawDocument::new(PAGE)).expect("reduce");
        let err = inference.infer(&reduced, &key()).expect_err("must fail");
        assert!(matches!(&err, Error::Inference(e) if *e == failure), "{err:?}");
        assert_eq!(provider.call_count(), 1);
    }
}

#[test]
fn each_call_reaches_the_model() {
    let provider = MockProvider::new(GOOD);
    let inference = SelectorInference::new(provider.clone(), "gpt-4o");
    let reduced = reduce(&RawDocument::new(PAGE)).expect("reduce");
    inference.infer(&reduced, &key()).expect("first");
    inference.infer(&reduced, &key()).expect("second");
    assert_eq!(provider.call_count(), 2);
}

#[test]
fn blank_credential_is_rejected() {
    assert!(matches!(ApiCredential::new("   "), Err(Error::MissingCredential)));
    assert!(matches!(ApiCredential::from_optional(None), Err(Error::MissingCredential)));
    let key = ApiCredential::new(" sk-abc ").expect("trimmed");
    assert_eq!(key.expose(), "sk-abc");
    assert!(!format!("{key:?}").contains("sk-abc"));
}
