use std::sync::Arc;

use serde_json::json;

use super::*;
use crate::{
    test_support::{member_options, notifications, script_reference, site_settings, FakeApi},
    transport::MissingRequestLayer,
};

fn cache_over(api: &Arc<FakeApi>) -> (ReferenceDataCache, EventBus) {
    let events = EventBus::default();
    (ReferenceDataCache::new(api.clone(), events.clone()), events)
}

#[tokio::test]
async fn load_twice_issues_one_bootstrap() {
    let api = FakeApi::new();
    script_reference(&api);
    let (cache, _) = cache_over(&api);

    cache.load().await.expect("first load");
    cache.load().await.expect("second load");

    assert_eq!(api.call_count(SITE_SETTINGS_PATH), 1);
    assert_eq!(api.call_count(MEMBER_OPTIONS_PATH), 1);
    assert_eq!(api.call_count(NOTIFICATIONS_PATH), 1);
    assert!(cache.is_ready());
}

#[tokio::test]
async fn concurrent_loads_share_one_bootstrap() {
    let api = FakeApi::new();
    let release = api.gate(SITE_SETTINGS_PATH, site_settings());
    api.reply(MEMBER_OPTIONS_PATH, member_options());
    api.reply(NOTIFICATIONS_PATH, notifications());
    let (cache, _) = cache_over(&api);

    let first = tokio::spawn({
        let cache = cache.clone();
        async move { cache.load().await }
    });
    let second = tokio::spawn({
        let cache = cache.clone();
        async move { cache.load().await }
    });
    crate::test_support::settle().await;
    assert!(!cache.is_ready(), "nothing visible before the bootstrap settles");

    release.send(()).expect("release");
    first.await.expect("join").expect("load");
    second.await.expect("join").expect("load");
    assert_eq!(api.call_count(SITE_SETTINGS_PATH), 1);
    assert!(cache.is_ready());
}

#[tokio::test]
async fn raw_options_become_key_label_value() {
    let api = FakeApi::new();
    script_reference(&api);
    let (cache, _) = cache_over(&api);
    cache.load().await.expect("load");

    let data = cache.snapshot();
    let levels = data.options("sponsor_levels").expect("levels");
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[1].key, "2");
    assert_eq!(levels[1].label, "Gold");
    assert_eq!(levels[1].value, json!(2));

    assert_eq!(data.label_for("user_status", &json!("INACTIVE")), Some("Inactive"));
    assert_eq!(data.label_for("sponsor_levels", &json!(1)), Some("Silver"));
    assert_eq!(data.label_for("sponsor_levels", &json!("2")), Some("Gold"));
    assert_eq!(data.label_for("sponsor_levels", &json!(99)), None);

    // Scalars and arrays that are not option tables are left out.
    assert!(data.options("site_name").is_none());
    assert!(data.options("banner_positions").is_none());

    assert_eq!(data.notifications().len(), 2);
    assert_eq!(data.notifications()[1].text(), "Payment confirmed");
    assert_eq!(data.unread_notifications(), 1);
}

#[tokio::test]
async fn failed_bootstrap_leaves_cache_empty() {
    let api = FakeApi::new();
    api.reply(SITE_SETTINGS_PATH, site_settings());
    api.fail(MEMBER_OPTIONS_PATH, "upstream timeout");
    api.reply(NOTIFICATIONS_PATH, notifications());
    let (cache, events) = cache_over(&api);
    let mut rx = events.subscribe();

    let err = cache.load().await.expect_err("bootstrap must fail");
    assert_eq!(err.status(), Some(500));
    assert!(!cache.is_ready());
    assert!(!cache.snapshot().is_loaded());
    assert!(cache.snapshot().options("user_status").is_none());
    assert!(matches!(
        rx.try_recv().expect("event"),
        ClientEvent::ReferenceDataFailed { .. }
    ));

    // Not populated, so the next load tries again.
    script_reference(&api);
    cache.load().await.expect("second attempt");
    assert_eq!(api.call_count(SITE_SETTINGS_PATH), 2);
    assert!(cache.is_ready());
}

#[tokio::test]
async fn empty_category_keeps_cache_not_ready() {
    let api = FakeApi::new();
    api.reply(SITE_SETTINGS_PATH, json!({"user_status": []}));
    api.reply(MEMBER_OPTIONS_PATH, member_options());
    api.reply(NOTIFICATIONS_PATH, json!({"data": []}));
    let (cache, _) = cache_over(&api);

    cache.load().await.expect("load");
    assert!(cache.snapshot().is_loaded());
    assert!(!cache.is_ready());
}

#[tokio::test]
async fn empty_inbox_does_not_block_readiness() {
    let api = FakeApi::new();
    api.reply(SITE_SETTINGS_PATH, site_settings());
    api.reply(MEMBER_OPTIONS_PATH, member_options());
    api.reply(NOTIFICATIONS_PATH, json!([]));
    let (cache, _) = cache_over(&api);

    cache.load().await.expect("load");
    assert!(cache.is_ready());
    assert_eq!(cache.snapshot().unread_notifications(), 0);
}

#[tokio::test]
async fn wait_ready_resolves_after_load() {
    let api = FakeApi::new();
    script_reference(&api);
    let (cache, _) = cache_over(&api);

    let waiter = tokio::spawn({
        let cache = cache.clone();
        async move { cache.wait_ready().await }
    });
    crate::test_support::settle().await;
    assert!(!waiter.is_finished());

    cache.load().await.expect("load");
    waiter.await.expect("waiter");
}

#[tokio::test]
async fn sign_out_clears_everything() {
    let api = FakeApi::new();
    script_reference(&api);
    let (cache, _) = cache_over(&api);
    cache.load().await.expect("load");

    cache.clear();
    assert!(!cache.is_ready());
    assert!(!cache.snapshot().is_loaded());
}

#[tokio::test]
async fn missing_backend_is_reported_not_ready() {
    let cache = ReferenceDataCache::new(Arc::new(MissingRequestLayer), EventBus::default());
    let err = cache.load().await.expect_err("no backend");
    assert!(matches!(err, RequestError::Unavailable(_)));
    assert!(!cache.is_ready());
}

#[tokio::test]
async fn notifications_under_a_named_member_are_read() {
    let api = FakeApi::new();
    api.reply(SITE_SETTINGS_PATH, site_settings());
    api.reply(MEMBER_OPTIONS_PATH, member_options());
    api.reply(
        NOTIFICATIONS_PATH,
        json!({
            "unread": 1,
            "notifications": [
                {"id": 4, "title": "Sponsor upgraded", "is_read": false}
            ]
        }),
    );
    let (cache, _) = cache_over(&api);

    cache.load().await.expect("load");
    let data = cache.snapshot();
    assert_eq!(data.notifications().len(), 1);
    assert_eq!(data.notifications()[0].text(), "Sponsor upgraded");
    assert_eq!(data.unread_notifications(), 1);
}

#[tokio::test]
async fn notification_record_without_a_list_is_an_empty_inbox() {
    let api = FakeApi::new();
    api.reply(SITE_SETTINGS_PATH, site_settings());
    api.reply(MEMBER_OPTIONS_PATH, member_options());
    api.reply(NOTIFICATIONS_PATH, json!({"data": {"unread": 0}}));
    let (cache, _) = cache_over(&api);

    cache.load().await.expect("load");
    assert!(cache.snapshot().notifications().is_empty());
    assert!(cache.is_ready());
}
