mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{FakeViewport, Harness};
use pretty_assertions::assert_eq;
use scrollmark_core::{
    BadgeView, Browser, Capabilities, ChordBinding, KeyChord, KeyEvent, MarkSet, Message,
    Position, Reply, Slot,
};
use scrollmark_engine::{save_bindings, seed_defaults, KeyValueStore, PageSession, TabPhase};
use serde_json::json;

const TAB: u64 = 7;

fn slot(n: u8) -> Slot {
    Slot::new(n).unwrap()
}

async fn harness(permanent: bool, browser: Browser) -> Harness {
    common::init_logging();
    let harness = Harness::new(Capabilities::for_browser(browser));
    seed_defaults(harness.settings.as_ref()).await.unwrap();
    harness
        .settings
        .set("permanent_marks", json!(permanent))
        .await
        .unwrap();
    harness
}

async fn open_page(harness: &Harness, url: &str, viewport: Arc<FakeViewport>) -> PageSession {
    let settings = harness.coordinator.settings().await;
    harness.coordinator.navigation_completed(TAB, url).await.unwrap();
    let mut page = PageSession::new(TAB, url, settings, viewport, harness.coordinator.clone());
    page.load().await;
    page
}

async fn mark_with_keys(page: &mut PageSession, digit: &str, at: Instant) {
    page.key_down(KeyEvent::new(",").with_ctrl(), at).await;
    page.key_down(KeyEvent::new(digit), at + Duration::from_millis(200))
        .await;
}

#[tokio::test]
async fn keyboard_mark_then_scroll_returns_to_position() {
    let harness = harness(false, Browser::Firefox).await;
    let viewport = Arc::new(FakeViewport::default());
    let mut page = open_page(&harness, "https://a.example.com/", viewport.clone()).await;

    let marked = Position::new(0.0, 1337.0);
    viewport.user_scrolls_to(marked);
    let t0 = Instant::now();
    mark_with_keys(&mut page, "3", t0).await;

    let mark = page.state().marks().get(slot(3)).unwrap();
    assert_eq!(mark.position(), marked);
    assert_eq!(mark.image.as_deref(), Some("data:image/png;base64,shot-1"));

    viewport.user_scrolls_to(Position::new(0.0, 0.0));
    let t1 = t0 + Duration::from_secs(3);
    page.key_down(KeyEvent::new(".").with_ctrl(), t1).await;
    page.key_down(KeyEvent::new("3"), t1 + Duration::from_millis(500))
        .await;

    assert_eq!(viewport.current(), marked);
    assert_eq!(viewport.scrolls(), vec![marked]);
    assert_eq!(harness.coordinator.tab_phase(TAB), TabPhase::Marked);
}

#[tokio::test]
async fn digit_after_timeout_does_not_mark() {
    let harness = harness(false, Browser::Firefox).await;
    let viewport = Arc::new(FakeViewport::default());
    let mut page = open_page(&harness, "https://a.example.com/", viewport).await;

    let t0 = Instant::now();
    page.key_down(KeyEvent::new(",").with_ctrl(), t0).await;
    page.tick(t0 + Duration::from_millis(1000)).await;
    page.key_down(KeyEvent::new("3"), t0 + Duration::from_millis(1001))
        .await;

    assert_eq!(page.state().marks().count(), 0);
}

#[tokio::test]
async fn permanent_marks_survive_navigation() {
    let harness = harness(true, Browser::Chrome).await;
    let viewport = Arc::new(FakeViewport::default());

    let mut page = open_page(&harness, "https://a", viewport.clone()).await;
    viewport.user_scrolls_to(Position::new(12.0, 640.0));
    mark_with_keys(&mut page, "5", Instant::now()).await;
    let original = page.state().marks().get(slot(5)).cloned().unwrap();
    assert_eq!(original.image.as_deref(), Some("data:image/png;base64,shot-1"));

    // Navigate away, then come back.
    let other = open_page(&harness, "https://b", viewport.clone()).await;
    assert_eq!(other.state().marks().count(), 0);
    let back = open_page(&harness, "https://a", viewport).await;

    assert_eq!(back.state().marks().count(), 1);
    assert_eq!(back.state().marks().get(slot(5)), Some(&original));
    assert_eq!(
        harness.badge.last(TAB),
        Some(BadgeView {
            text: Some("1".to_string()),
            title: "Scrollmark".to_string()
        })
    );
}

#[tokio::test]
async fn persisted_index_holds_no_images() {
    let harness = harness(true, Browser::Chrome).await;
    let viewport = Arc::new(FakeViewport::default());
    let mut page = open_page(&harness, "https://a.example.com/doc#part", viewport.clone()).await;

    viewport.user_scrolls_to(Position::new(0.0, 80.0));
    mark_with_keys(&mut page, "1", Instant::now()).await;

    let urls = harness.settings.get("urls").await.unwrap().unwrap();
    assert_eq!(
        urls,
        json!({"https://a.example.com/doc": [null, {"index": 1, "x": 0.0, "y": 80.0}]})
    );
    assert_eq!(
        harness.images.get("https://a.example.com/doc").await.unwrap(),
        Some(json!([null, "data:image/png;base64,shot-1", null, null, null, null, null, null, null, null]))
    );
}

#[tokio::test]
async fn clear_removes_marks_and_cached_images() {
    let harness = harness(true, Browser::Firefox).await;
    let viewport = Arc::new(FakeViewport::default());
    let mut page = open_page(&harness, "https://a", viewport.clone()).await;
    mark_with_keys(&mut page, "5", Instant::now()).await;

    page.clear().await;

    assert_eq!(page.state().marks().count(), 0);
    assert_eq!(harness.coordinator.tab_phase(TAB), TabPhase::Cleared);
    assert_eq!(harness.images.keys().await.unwrap(), Vec::<String>::new());
    assert_eq!(harness.settings.get("urls").await.unwrap(), Some(json!({})));

    let reply = harness
        .coordinator
        .handle(TAB, Message::get_first_marks("https://a"))
        .await
        .unwrap();
    assert_eq!(reply, Some(Reply::Marks { marks: None }));
    assert_eq!(
        harness.badge.last(TAB),
        Some(BadgeView {
            text: Some(String::new()),
            title: "Scrollmark".to_string()
        })
    );
}

#[tokio::test]
async fn marks_are_not_persisted_without_permanence() {
    let harness = harness(false, Browser::Firefox).await;
    let viewport = Arc::new(FakeViewport::default());
    let mut page = open_page(&harness, "https://a", viewport.clone()).await;
    mark_with_keys(&mut page, "2", Instant::now()).await;

    assert_eq!(harness.settings.get("urls").await.unwrap(), Some(json!({})));
    assert!(harness.images.keys().await.unwrap().is_empty());

    let back = open_page(&harness, "https://a", viewport).await;
    assert_eq!(back.state().marks().count(), 0);
}

#[tokio::test]
async fn platform_without_badge_or_capture_uses_title() {
    let harness = harness(true, Browser::FirefoxAndroid).await;
    let viewport = Arc::new(FakeViewport::default());
    let mut page = open_page(&harness, "https://a", viewport.clone()).await;

    assert_eq!(
        harness.badge.last(TAB),
        Some(BadgeView {
            text: None,
            title: "Scrollmark".to_string()
        })
    );

    viewport.user_scrolls_to(Position::new(0.0, 10.0));
    mark_with_keys(&mut page, "4", Instant::now()).await;

    let mark = page.state().marks().get(slot(4)).unwrap();
    assert_eq!(mark.image, None);
    assert_eq!(
        harness.badge.last(TAB),
        Some(BadgeView {
            text: None,
            title: "Scrollmark (1 mark)".to_string()
        })
    );
    assert!(harness.images.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn activation_renders_persisted_count_before_page_reports() {
    let harness = harness(true, Browser::Chrome).await;
    let mut stored = MarkSet::new();
    stored.set_mark(slot(0), Position::new(0.0, 1.0));
    stored.set_mark(slot(9), Position::new(0.0, 9.0));
    harness
        .settings
        .set("urls", json!({ "https://a/": stored }))
        .await
        .unwrap();

    assert_eq!(harness.coordinator.tab_phase(TAB), TabPhase::Uninitialized);
    harness.coordinator.navigation_completed(TAB, "https://a").await.unwrap();
    assert_eq!(harness.coordinator.tab_phase(TAB), TabPhase::Loaded);

    harness.coordinator.tab_activated(TAB).await.unwrap();
    assert_eq!(harness.badge.last(TAB).unwrap().text.as_deref(), Some("2"));

    harness.coordinator.tab_removed(TAB);
    assert_eq!(harness.coordinator.tab_phase(TAB), TabPhase::Uninitialized);
    harness.coordinator.tab_activated(TAB).await.unwrap();
    assert_eq!(harness.badge.last(TAB).unwrap().text.as_deref(), Some(""));
}

#[tokio::test]
async fn popup_lists_marks_and_drives_the_page() {
    let harness = harness(false, Browser::Chrome).await;
    let viewport = Arc::new(FakeViewport::default());
    let mut page = open_page(&harness, "https://a", viewport.clone()).await;

    viewport.user_scrolls_to(Position::new(0.0, 450.0));
    let popup_mark: Message = serde_json::from_value(json!({"mark": "6"})).unwrap();
    assert_eq!(page.handle_message(popup_mark).await, None);

    let reply = page.handle_message(Message::get_marks()).await;
    let Some(Reply::Marks { marks: Some(marks) }) = reply else {
        panic!("expected marks reply, got {reply:?}");
    };
    assert_eq!(marks.scroll_target(slot(6)), Some(Position::new(0.0, 450.0)));

    viewport.user_scrolls_to(Position::new(0.0, 0.0));
    page.handle_message(Message::Scroll { scroll: slot(6) }).await;
    assert_eq!(viewport.current(), Position::new(0.0, 450.0));
}

#[tokio::test]
async fn remarking_without_capture_forgets_old_image() {
    let harness = harness(true, Browser::Chrome).await;
    let viewport = Arc::new(FakeViewport::default());
    let mut page = open_page(&harness, "https://a", viewport.clone()).await;
    mark_with_keys(&mut page, "2", Instant::now()).await;
    assert!(!harness.images.keys().await.unwrap().is_empty());

    // The mark for slot 2 is replaced by a push whose capture produced nothing.
    let mut marks = MarkSet::new();
    marks.set_mark(slot(2), Position::new(0.0, 99.0));
    let coordinator = scrollmark_engine::Coordinator::new(
        harness.settings.clone(),
        harness.images.clone(),
        Arc::new(scrollmark_engine::NoCapture),
        harness.badge.clone(),
        Capabilities::for_browser(Browser::Chrome),
    );
    let reply = coordinator
        .handle(TAB, Message::push_marks(marks, "https://a", Some(slot(2))))
        .await
        .unwrap();

    assert_eq!(reply, None);
    assert!(harness.images.keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn screenshot_request_replies_with_image() {
    let harness = harness(false, Browser::Firefox).await;
    let reply = harness
        .coordinator
        .handle(TAB, Message::screenshot())
        .await
        .unwrap();
    assert_eq!(
        reply,
        Some(Reply::Image {
            image: "data:image/png;base64,shot-1".to_string()
        })
    );
}

#[tokio::test]
async fn rebinding_takes_effect_in_open_page() {
    let harness = harness(false, Browser::Chrome).await;
    let viewport = Arc::new(FakeViewport::default());
    let mut page = open_page(&harness, "https://a", viewport.clone()).await;

    let mark_key = ChordBinding::new(KeyChord::ctrl("m"));
    save_bindings(harness.settings.as_ref(), &mark_key, &ChordBinding::default_scroll())
        .await
        .unwrap();
    page.settings_changed(harness.coordinator.settings().await).await;

    viewport.user_scrolls_to(Position::new(0.0, 75.0));
    let t0 = Instant::now();
    mark_with_keys(&mut page, "8", t0).await;
    assert_eq!(page.state().marks().count(), 0);

    let t1 = t0 + Duration::from_secs(2);
    page.key_down(KeyEvent::new("m").with_ctrl(), t1).await;
    page.key_down(KeyEvent::new("8"), t1 + Duration::from_millis(100))
        .await;
    assert_eq!(
        page.state().marks().scroll_target(slot(8)),
        Some(Position::new(0.0, 75.0))
    );
}
