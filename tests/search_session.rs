use std::sync::Arc;
use std::time::Duration;

use homebox_lib::kv::KvHandle;
use homebox_lib::model::Item;
use homebox_lib::search::debounce::DEFAULT_DEBOUNCE;
use homebox_lib::search::history::DEFAULT_HISTORY_LIMIT;
use homebox_lib::{
    MemoryStore, SearchEngine, SearchFilters, SearchHistory, SearchSession, SearchState,
};
use tokio::sync::watch;

fn item(name: &str, category: &str) -> Item {
    Item {
        id: name.into(),
        box_id: "b".into(),
        name: name.into(),
        category: Some(category.into()),
        quantity: 1,
        photo_path: None,
        notes: None,
        tags: Vec::new(),
        created_at: 0,
        updated_at: 0,
    }
}

fn session_over(items: Vec<Item>) -> (Arc<MemoryStore>, SearchSession) {
    let store = Arc::new(MemoryStore::new(Vec::new(), items, Vec::new()));
    let session =
        SearchSession::new(SearchEngine::new(store.clone()), DEFAULT_DEBOUNCE).expect("session");
    (store, session)
}

async fn settled(rx: &mut watch::Receiver<SearchState>) -> SearchState {
    loop {
        {
            let state = rx.borrow_and_update();
            if !state.is_searching {
                return state.clone();
            }
        }
        rx.changed().await.expect("session alive");
    }
}

/// One store snapshot reads boxes, items and locations.
const READS_PER_SEARCH: usize = 3;

#[tokio::test(start_paused = true)]
async fn typing_burst_runs_one_search() {
    let (store, session) = session_over(vec![item("charger", "Electronics")]);
    let mut rx = session.subscribe();

    session.update_query("c");
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.update_query("ch");
    tokio::time::sleep(Duration::from_millis(299)).await;
    session.update_query("cha");
    assert_eq!(store.reads(), 0);

    let state = settled(&mut rx).await;
    assert_eq!(state.query, "cha");
    assert_eq!(state.outcome.results().len(), 1);
    assert_eq!(store.reads(), READS_PER_SEARCH);
}

#[tokio::test(start_paused = true)]
async fn nothing_runs_before_the_quiet_period() {
    let (store, session) = session_over(vec![item("charger", "Electronics")]);
    session.update_query("charg");
    tokio::time::sleep(Duration::from_millis(299)).await;
    assert_eq!(store.reads(), 0);
    assert!(session.is_searching());
    tokio::time::sleep(Duration::from_millis(2)).await;
    tokio::task::yield_now().await;
    assert_eq!(store.reads(), READS_PER_SEARCH);
}

#[tokio::test(start_paused = true)]
async fn latest_query_wins_over_slow_earlier_one() {
    let (store, session) = session_over(vec![item("a-thing", "x"), item("ab-thing", "x")]);
    store.push_delay(Duration::from_secs(5));
    let mut rx = session.subscribe();

    session.search_now("a");
    // Let the first search reach its slow store read.
    tokio::task::yield_now().await;
    session.search_now("ab");

    let state = settled(&mut rx).await;
    assert_eq!(state.query, "ab");
    let names: Vec<&str> = state.outcome.results().iter().map(|e| e.item.name.as_str()).collect();
    assert_eq!(names, vec!["ab-thing"]);

    // Give the superseded search every chance to finish; it must not publish.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let state = session.state();
    assert_eq!(state.query, "ab");
    assert_eq!(state.outcome.results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn filters_rerun_current_query() {
    let (_store, session) = session_over(vec![
        item("cable usb", "Electronics"),
        item("cable tie", "Tools"),
    ]);
    let mut rx = session.subscribe();

    session.search_now("cable");
    assert_eq!(settled(&mut rx).await.outcome.results().len(), 2);

    session.set_filters(SearchFilters::category("Tools"));
    let state = settled(&mut rx).await;
    assert_eq!(state.query, "cable");
    let names: Vec<&str> = state.outcome.results().iter().map(|e| e.item.name.as_str()).collect();
    assert_eq!(names, vec!["cable tie"]);
}

#[tokio::test(start_paused = true)]
async fn new_query_drops_previous_results_while_pending() {
    let (_store, session) = session_over(vec![item("apple", "Food"), item("avocado", "Food")]);
    let mut rx = session.subscribe();

    session.search_now("a");
    assert_eq!(settled(&mut rx).await.outcome.results().len(), 2);

    session.update_query("zzz");
    let state = session.state();
    assert_eq!(state.query, "zzz");
    assert!(state.is_searching);
    assert!(!state.outcome.is_unavailable());
    assert!(state.outcome.results().is_empty());

    let state = settled(&mut rx).await;
    assert_eq!(state.query, "zzz");
    assert!(state.outcome.results().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unavailable_store_is_flagged() {
    let (store, session) = session_over(vec![item("charger", "Electronics")]);
    store.set_failing(true);
    let mut rx = session.subscribe();

    session.search_now("charg");
    let state = settled(&mut rx).await;
    assert!(state.outcome.is_unavailable());
    assert!(state.outcome.results().is_empty());
}

#[tokio::test(start_paused = true)]
async fn submitted_queries_land_in_history() {
    let (_store, session) = session_over(Vec::new());
    let history = Arc::new(SearchHistory::load(KvHandle::in_memory(), DEFAULT_HISTORY_LIMIT));
    let session = session.with_history(history.clone());

    session.update_query("typed only");
    session.search_now("socks");
    session.search_now("hat");
    session.search_now("socks");
    assert_eq!(history.list(), vec!["socks", "hat"]);
}
