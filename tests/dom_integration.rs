use prompt_relay::capture::{CaptureArea, ScreenCapture};
use prompt_relay::dispatch::InputCleared;
use prompt_relay::{
    ActionDispatcher, BrowserSession, Destination, Document, LaunchOptions, LocateOptions, TargetRole, diagnose, locate,
};

const CHAT_PAGE: &str = "data:text/html,<html><body>\
<div id='composer' contenteditable='true' style='width:600px;height:40px'></div>\
<button aria-label='Send message' style='width:32px;height:32px' \
onclick=\"document.getElementById('composer').textContent=''\"><svg width='16' height='16'><path d='M0,0L16,16'/></svg></button>\
</body></html>";

#[tokio::test]
#[ignore] // Requires Chrome to be installed
async fn test_locate_and_inject_in_chrome() {
    let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
    let page = session.open(CHAT_PAGE).expect("Failed to open page");

    let input = locate(&page, &Destination::Claude.input_strategies(), LocateOptions::from_millis(5000, 250))
        .await
        .expect("locate failed");
    let input = input.element.expect("no input found");
    assert_eq!(input.element.attribute("id"), Some("composer"));

    let dispatcher = ActionDispatcher::default();
    let outcome = dispatcher.inject_text(&page, &input.element, "hello from chrome").await;
    assert!(outcome.verified_effect, "{:?}", outcome);
    assert_eq!(
        page.read_content(&input.element.handle).unwrap().as_deref(),
        Some("hello from chrome")
    );

    let send = locate(&page, &Destination::Claude.send_strategies(), LocateOptions::from_millis(5000, 250))
        .await
        .expect("locate failed")
        .element
        .expect("no send button found");
    assert_eq!(send.source, "claude-send-aria");

    let outcome = dispatcher
        .activate(&page, &send.element, &InputCleared::new(input.element.handle.clone()))
        .await;
    assert!(outcome.verified_effect, "{:?}", outcome);
}

#[tokio::test]
#[ignore]
async fn test_diagnose_in_chrome() {
    let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
    let page = session.open(CHAT_PAGE).expect("Failed to open page");

    let reports = diagnose(&page, &Destination::Claude.strategies(TargetRole::Send));
    println!("{}", serde_json::to_string_pretty(&reports).unwrap());
    assert!(reports.iter().any(|report| report.accepted() > 0));
}

#[test]
#[ignore]
fn test_extract_content_in_chrome() {
    let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
    let page = session
        .open("data:text/html,<html><head><title>Doc</title></head><body><nav>menu</nav><article><p>Body text of the article.</p></article></body></html>")
        .expect("Failed to open page");

    let content = session.extract_content(&page).expect("Failed to extract content");
    assert_eq!(content.title, "Doc");
    assert!(content.text.contains("Body text of the article."));
    assert!(!content.text.contains("menu"));
}

#[test]
#[ignore]
fn test_capture_in_chrome() {
    let session = BrowserSession::launch(LaunchOptions::new().headless(true)).expect("Failed to launch browser");
    let page = session.open(CHAT_PAGE).expect("Failed to open page");

    let full = page.capture_png().expect("Failed to capture");
    let area = page
        .capture_area_png(CaptureArea::new(0.0, 0.0, 100.0, 50.0))
        .expect("Failed to capture area");
    assert!(full.starts_with(b"\x89PNG"));
    assert!(area.len() < full.len());
}
