//! Integration tests for the debounced search controller, run under paused
//! tokio time for deterministic windows.

mod common;

use common::{engine_with, leaf, settings, FakeOutcomeService};
use rollup_engine::{Engine, Scope, SearchDispatch, SearchResponse};
use std::sync::Arc;
use std::time::Duration;

fn seed_search(service: &FakeOutcomeService, text: &str, ids: &[&str]) {
    service.searches.lock().unwrap().insert(
        text.to_string(),
        SearchResponse {
            outcomes: ids.iter().map(|id| leaf(id)).collect(),
            matches: ids.iter().map(ToString::to_string).collect(),
            total: ids.len() as u32,
        },
    );
}

async fn spawn_search(
    engine: &Arc<Engine>,
    scope: &Scope,
    text: &str,
    page: u32,
) -> tokio::task::JoinHandle<SearchDispatch> {
    let engine = Arc::clone(engine);
    let scope = scope.clone();
    let text = text.to_string();
    let handle =
        tokio::spawn(async move { engine.search.search(&scope, &text, page).await.unwrap() });
    // Let the task run up to its debounce sleep before the caller advances
    // the clock.
    tokio::task::yield_now().await;
    handle
}

#[tokio::test(start_paused = true)]
async fn calls_within_the_window_coalesce_to_the_last_arguments() {
    let service = FakeOutcomeService::new();
    seed_search(&service, "abcd", &["1"]);
    let engine = Arc::new(engine_with(service.clone()));
    let scope = engine.mount(settings()).await;

    let first = spawn_search(&engine, &scope, "abc", 1).await;
    tokio::time::advance(Duration::from_millis(100)).await;
    let second = spawn_search(&engine, &scope, "abcd", 1).await;

    assert_eq!(first.await.unwrap(), SearchDispatch::Superseded);
    assert_eq!(second.await.unwrap(), SearchDispatch::Applied);

    // Exactly one underlying call, carrying the latest arguments.
    assert_eq!(service.count("get_search_results"), 1);
    assert_eq!(service.calls(), vec!["get_search_results:abcd:1"]);

    let entries = engine.search.search_entries(&scope).await;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].id, "1");
}

#[tokio::test(start_paused = true)]
async fn well_separated_calls_both_execute() {
    let service = FakeOutcomeService::new();
    seed_search(&service, "alpha", &["1"]);
    seed_search(&service, "beta", &["2"]);
    let engine = Arc::new(engine_with(service.clone()));
    let scope = engine.mount(settings()).await;

    // Awaiting directly lets the paused clock auto-advance past each window.
    let first = engine.search.search(&scope, "alpha", 1).await.unwrap();
    let second = engine.search.search(&scope, "beta", 1).await.unwrap();

    assert_eq!(first, SearchDispatch::Applied);
    assert_eq!(second, SearchDispatch::Applied);
    assert_eq!(service.count("get_search_results"), 2);
}

#[tokio::test(start_paused = true)]
async fn stale_responses_are_discarded_silently() {
    let service = FakeOutcomeService::new();
    seed_search(&service, "slow", &["old"]);
    seed_search(&service, "fresh", &["new"]);
    service
        .slow_searches
        .lock()
        .unwrap()
        .insert("slow".to_string());
    let engine = Arc::new(engine_with(service.clone()));
    let scope = engine.mount(settings()).await;

    // The slow query wins its window and goes in flight, then a fresh query
    // commits while the slow response is still pending.
    let slow = spawn_search(&engine, &scope, "slow", 1).await;
    tokio::time::advance(Duration::from_millis(260)).await;
    let fresh = spawn_search(&engine, &scope, "fresh", 1).await;

    assert_eq!(fresh.await.unwrap(), SearchDispatch::Applied);
    assert_eq!(slow.await.unwrap(), SearchDispatch::Stale);

    // Both fired, but only the fresh result was committed; the stale one
    // was dropped without being surfaced as an error.
    assert_eq!(service.count("get_search_results"), 2);
    assert!(engine.store.last_error(&scope).await.is_none());
    let entries = engine.search.search_entries(&scope).await;
    assert_eq!(entries[0].id, "new");
}

#[tokio::test(start_paused = true)]
async fn failed_search_surfaces_scoped_error_and_stops_loading() {
    let service = FakeOutcomeService::new();
    let engine = Arc::new(engine_with(service.clone()));
    // No settings mounted for this scope, so the controller fails after the
    // debounce window when resolving launch settings.
    let scope = Scope::new("unmounted");

    assert!(engine.search.search(&scope, "q", 1).await.is_err());

    // The slice must not be left loading with no request in flight, and the
    // rejection lands in scoped error state like any other failure.
    let loading = engine.store.read(&scope, |s| s.search.is_loading).await;
    assert!(!loading);
    assert!(engine.store.last_error(&scope).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn failed_listing_surfaces_scoped_error_and_stops_loading() {
    let service = FakeOutcomeService::new();
    let engine = Arc::new(engine_with(service.clone()));
    let scope = Scope::new("unmounted");

    assert!(engine.search.list(&scope, 1).await.is_err());

    let loading = engine.store.read(&scope, |s| s.search.is_loading).await;
    assert!(!loading);
    assert!(engine.store.last_error(&scope).await.is_some());
}

#[tokio::test]
async fn update_search_text_resets_page_without_fetching() {
    let service = FakeOutcomeService::new();
    let engine = Arc::new(engine_with(service.clone()));
    let scope = engine.mount(settings()).await;

    engine.search.update_search_page(&scope, 3).await;
    engine.search.update_search_text(&scope, "abcd").await;

    let (text, page) = engine
        .store
        .read(&scope, |s| (s.search.text.clone(), s.search.page))
        .await;
    assert_eq!(text, "abcd");
    assert_eq!(page, 1);
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn update_search_page_writes_only_the_page() {
    let service = FakeOutcomeService::new();
    let engine = Arc::new(engine_with(service.clone()));
    let scope = engine.mount(settings()).await;

    engine.search.update_search_text(&scope, "abcd").await;
    engine.search.update_search_page(&scope, 2).await;

    let (text, page) = engine
        .store
        .read(&scope, |s| (s.search.text.clone(), s.search.page))
        .await;
    assert_eq!(text, "abcd");
    assert_eq!(page, 2);
    assert!(service.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn search_entries_selector_is_reference_stable() {
    let service = FakeOutcomeService::new();
    seed_search(&service, "abc", &["1", "2"]);
    let engine = Arc::new(engine_with(service));
    let scope = engine.mount(settings()).await;

    engine.search.search(&scope, "abc", 1).await.unwrap();

    let first = engine.search.search_entries(&scope).await;
    let second = engine.search.search_entries(&scope).await;
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test(start_paused = true)]
async fn browse_listing_commits_without_debounce() {
    let service = FakeOutcomeService::new();
    service.lists.lock().unwrap().insert(
        2,
        rollup_engine::ListResponse {
            outcomes: vec![leaf("7")],
            total: 11,
        },
    );
    let engine = Arc::new(engine_with(service.clone()));
    let scope = engine.mount(settings()).await;

    let dispatch = engine.search.list(&scope, 2).await.unwrap();
    assert_eq!(dispatch, SearchDispatch::Applied);
    assert_eq!(service.count("list_outcomes:2"), 1);

    let (page, total) = engine
        .store
        .read(&scope, |s| (s.search.page, s.search.total))
        .await;
    assert_eq!(page, 2);
    assert_eq!(total, 11);
}
