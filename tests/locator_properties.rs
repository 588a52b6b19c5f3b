use prompt_relay::dom::ElementNode;
use prompt_relay::locator::Matcher;
use prompt_relay::{Destination, LocateOptions, MemoryDocument, SelectorStrategy, locate};
use std::time::Duration;

fn shell() -> MemoryDocument {
    MemoryDocument::with_url(
        "https://claude.ai/new",
        ElementNode::new("body")
            .with_bounding_box(0.0, 0.0, 1024.0, 768.0)
            .with_child(ElementNode::new("main").with_attribute("id", "app").with_bounding_box(0.0, 0.0, 1024.0, 768.0)),
    )
}

fn composer() -> ElementNode {
    ElementNode::new("div")
        .editable()
        .with_attribute("id", "composer")
        .with_bounding_box(100.0, 650.0, 700.0, 48.0)
}

#[tokio::test(start_paused = true)]
async fn test_missing_target_waits_out_the_deadline() {
    let doc = shell();
    let started = tokio::time::Instant::now();

    let result = locate(&doc, &Destination::Claude.input_strategies(), LocateOptions::from_millis(1000, 300))
        .await
        .unwrap();

    assert!(!result.found);
    assert!(result.element.is_none());
    assert!(result.elapsed_ms >= 1000);
    assert!(started.elapsed() >= Duration::from_millis(1000));
    // Ticks at 0, 300, 600, 900 and the final one at the deadline
    assert_eq!(result.attempts_made, 5);
}

#[tokio::test(start_paused = true)]
async fn test_single_candidate_is_found_every_time() {
    let doc = shell();
    doc.append(&doc.find("#app").unwrap(), composer()).unwrap();
    let expected = doc.find("#composer").unwrap();

    for _ in 0..5 {
        let result = locate(&doc, &Destination::Claude.input_strategies(), LocateOptions::from_millis(1000, 100))
            .await
            .unwrap();
        let candidate = result.element.unwrap();
        assert_eq!(candidate.element.handle, expected);
        assert_eq!(candidate.source, "claude-input-contenteditable");
        assert_eq!(result.attempts_made, 1);
    }
}

#[tokio::test(start_paused = true)]
async fn test_late_render_is_picked_up_by_polling() {
    let doc = shell();
    let app = doc.find("#app").unwrap();

    let render = async {
        tokio::time::sleep(Duration::from_millis(1200)).await;
        doc.append(&app, composer()).unwrap();
    };
    let strategies = Destination::Claude.input_strategies();
    let lookup = locate(&doc, &strategies, LocateOptions::from_millis(5000, 500));

    let (_, result) = tokio::join!(render, lookup);
    let result = result.unwrap();

    assert!(result.found);
    assert!(result.elapsed_ms >= 1200);
    assert!(result.elapsed_ms < 5000);
    assert!(result.attempts_made >= 3);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_during_lookup_is_counted() {
    let doc = shell();
    let app = doc.find("#app").unwrap();

    let page_changes = async {
        tokio::time::sleep(Duration::from_millis(700)).await;
        doc.navigate("https://claude.ai/chat/abc");
        tokio::time::sleep(Duration::from_millis(700)).await;
        doc.append(&app, composer()).unwrap();
    };
    let strategies = Destination::Claude.input_strategies();
    let lookup = locate(&doc, &strategies, LocateOptions::from_millis(5000, 500));

    let (_, result) = tokio::join!(page_changes, lookup);
    let result = result.unwrap();

    assert!(result.found);
    assert_eq!(result.context_resets, 1);
}

#[tokio::test(start_paused = true)]
async fn test_hidden_and_disabled_matches_are_rejected() {
    let doc = shell();
    let app = doc.find("#app").unwrap();
    doc.append(&app, ElementNode::new("textarea").hidden().with_bounding_box(0.0, 700.0, 500.0, 40.0))
        .unwrap();
    doc.append(&app, ElementNode::new("textarea").disabled().with_bounding_box(0.0, 600.0, 500.0, 40.0))
        .unwrap();
    doc.append(
        &app,
        ElementNode::new("textarea")
            .with_attribute("id", "usable")
            .with_bounding_box(0.0, 500.0, 500.0, 40.0),
    )
    .unwrap();

    let strategies = vec![SelectorStrategy::new("textarea", Matcher::css("textarea"))];
    let result = locate(&doc, &strategies, LocateOptions::from_millis(1000, 100)).await.unwrap();
    let found = result.element.unwrap();
    assert_eq!(found.element.attribute("id"), Some("usable"));
}

#[tokio::test(start_paused = true)]
async fn test_invalid_options_are_rejected() {
    let doc = shell();
    let strategies = Destination::Gemini.input_strategies();
    assert!(locate(&doc, &strategies, LocateOptions::from_millis(1000, 0)).await.is_err());
    assert!(locate(&doc, &strategies, LocateOptions::from_millis(100, 500)).await.is_err());
}
