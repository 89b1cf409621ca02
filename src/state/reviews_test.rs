use std::rc::Rc;

use futures::executor::block_on;

use super::*;
use crate::error::InputError;
use crate::testing::{FakeApi, ManualRuntime, PageCall, page, record, review, reviews};

fn ids(items: &[Review]) -> Vec<ReviewId> {
    items.iter().map(|r| r.id).collect()
}

fn store(rt: &Rc<ManualRuntime>, api: &Rc<FakeApi>, product_id: ProductId) -> ReviewStore<FakeApi> {
    ReviewStore::new(Rc::clone(api), rt.shared(), product_id, 6)
}

fn loaded_store(rt: &Rc<ManualRuntime>, api: &Rc<FakeApi>) -> ReviewStore<FakeApi> {
    api.pages.respond_with(|_| Ok(page(reviews(1..=3), None)));
    let store = store(rt, api, 42);
    store.get_next_page();
    rt.run();
    store
}

// =============================================================
// ReviewListState
// =============================================================

#[test]
fn next_page_is_rejected_while_loading() {
    let mut state = ReviewListState::new(42, 6);
    assert!(state.begin_next_page().is_some());
    assert!(state.is_loading());
    assert!(state.begin_next_page().is_none());
}

#[test]
fn page_skips_reviews_already_loaded() {
    let mut state = ReviewListState::new(42, 3);
    let first = state.begin_next_page().unwrap();
    state.apply_page(first.ticket, Ok(page(reviews([1, 2, 3]), Some("1"))));

    let second = state.begin_next_page().unwrap();
    state.apply_page(second.ticket, Ok(page(reviews([3, 4, 5]), Some("2"))));

    assert_eq!(ids(state.items()), vec![1, 2, 3, 4, 5]);
}

#[test]
fn short_page_marks_end_even_with_cursor() {
    let mut state = ReviewListState::new(42, 6);
    let request = state.begin_next_page().unwrap();
    state.apply_page(request.ticket, Ok(page(reviews(1..=2), Some("1"))));

    assert!(state.is_end_of_data());
    assert!(state.begin_next_page().is_none());
}

#[test]
fn reset_supersedes_in_flight_page() {
    let mut state = ReviewListState::new(42, 3);
    let first = state.begin_next_page().unwrap();
    state.apply_page(first.ticket, Ok(page(reviews(1..=3), Some("1"))));

    let stale = state.begin_next_page().unwrap();
    let reset = state.begin_reset();
    assert_eq!(reset.cursor, None);

    assert!(!state.apply_page(stale.ticket, Ok(page(reviews(4..=6), Some("2")))));
    assert_eq!(ids(state.items()), vec![1, 2, 3]);

    assert!(state.apply_page(reset.ticket, Ok(page(reviews([9, 1, 2]), Some("1")))));
    assert_eq!(ids(state.items()), vec![9, 1, 2]);
}

#[test]
fn failed_reset_retries_from_first_page() {
    let mut state = ReviewListState::new(42, 3);
    let first = state.begin_next_page().unwrap();
    state.apply_page(first.ticket, Ok(page(reviews(1..=3), Some("1"))));

    let reset = state.begin_reset();
    let error = FetchError { resource: "reviews", source: ApiError::Status { status: 500 } };
    state.apply_page(reset.ticket, Err(error));
    assert!(state.is_error());
    assert_eq!(ids(state.items()), vec![1, 2, 3]);

    let retry = state.begin_next_page().unwrap();
    assert_eq!(retry.cursor, None);
    state.apply_page(retry.ticket, Ok(page(reviews([7, 1, 2]), Some("1"))));
    assert_eq!(ids(state.items()), vec![7, 1, 2]);
    assert!(!state.is_error());
}

#[test]
fn edit_prefers_server_copy() {
    let mut state = ReviewListState::new(42, 6);
    let request = state.begin_next_page().unwrap();
    state.apply_page(request.ticket, Ok(page(reviews(1..=2), None)));

    let input = ReviewInput::new("typed", 2);
    let mut server = review(2);
    server.content = "normalized".to_owned();
    assert!(state.apply_edit(2, &input, Some(server)));
    assert_eq!(state.items()[1].content, "normalized");

    assert!(state.apply_edit(1, &input, None));
    assert_eq!(state.items()[0].content, "typed");
    assert_eq!(state.items()[0].rating, 2);

    assert!(!state.apply_edit(99, &input, None));
}

// =============================================================
// ReviewStore pagination
// =============================================================

#[test]
fn pages_accumulate_until_end_of_data() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = store(&rt, &api, 42);

    store.get_next_page();
    rt.run();
    assert_eq!(api.pages.calls(), vec![PageCall { product_id: 42, cursor: None, size: 6 }]);
    assert!(store.snapshot().is_loading);

    api.pages.resolve(0, Ok(page(reviews(1..=6), Some("c1"))));
    rt.run();
    let view = store.snapshot();
    assert_eq!(view.items.len(), 6);
    assert!(view.is_ready);
    assert!(!view.is_end_of_data);

    store.get_next_page();
    rt.run();
    assert_eq!(api.pages.last_call().unwrap().cursor, Some(Cursor("c1".to_owned())));

    api.pages.resolve(1, Ok(page(reviews(7..=9), None)));
    rt.run();
    let view = store.snapshot();
    assert_eq!(ids(&view.items), (1..=9).collect::<Vec<ReviewId>>());
    assert!(view.is_end_of_data);

    store.get_next_page();
    rt.run();
    assert_eq!(api.pages.call_count(), 2);
}

#[test]
fn overlapping_next_page_requests_issue_one_call() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = store(&rt, &api, 42);

    store.get_next_page();
    store.get_next_page();
    rt.run();

    assert_eq!(api.pages.call_count(), 1);
}

#[test]
fn page_failure_sets_list_error_and_keeps_items() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = store(&rt, &api, 42);
    store.get_next_page();
    rt.run();
    api.pages.resolve(0, Ok(page(reviews(1..=6), Some("c1"))));
    rt.run();

    store.get_next_page();
    rt.run();
    api.pages.resolve(1, Err(ApiError::Status { status: 503 }));
    rt.run();

    let view = store.snapshot();
    assert!(view.is_error);
    assert!(!view.is_loading);
    assert_eq!(view.items.len(), 6);

    store.get_next_page();
    rt.run();
    assert_eq!(api.pages.last_call().unwrap().cursor, Some(Cursor("c1".to_owned())));
}

#[test]
fn set_product_loads_new_product_from_scratch() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = loaded_store(&rt, &api);

    store.set_product(7);
    assert!(store.snapshot().items.is_empty());
    rt.run();

    let last = api.pages.last_call().unwrap();
    assert_eq!(last, PageCall { product_id: 7, cursor: None, size: 6 });
    assert!(store.snapshot().is_ready);

    store.set_product(7);
    rt.run();
    assert_eq!(api.pages.call_count(), 2);
}

// =============================================================
// ReviewStore mutations
// =============================================================

#[test]
fn submit_restarts_from_first_page_and_reports() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = loaded_store(&rt, &api);
    api.create.respond_with(|_| Ok(10));
    api.pages.respond_with(|_| Ok(page(reviews([10, 1, 2, 3]), None)));

    let id = block_on(store.submit(ReviewInput::new("great keyboard", 5))).unwrap();
    rt.run();

    assert_eq!(id, 10);
    assert_eq!(api.create.calls(), vec![(42, ReviewInput::new("great keyboard", 5))]);
    assert_eq!(ids(&store.snapshot().items), vec![10, 1, 2, 3]);
    assert_eq!(store.last_mutation(), Some(MutationKind::Created(10)));
}

#[test]
fn failed_submit_leaves_list_untouched() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = loaded_store(&rt, &api);
    api.create.respond_with(|_| Err(ApiError::Unauthorized));
    let before = store.snapshot();

    let err = block_on(store.submit(ReviewInput::new("great keyboard", 5))).unwrap_err();
    rt.run();

    assert_eq!(err, MutationError::Api(ApiError::Unauthorized));
    assert_eq!(store.snapshot(), before);
    assert_eq!(api.pages.call_count(), 1);
    assert_eq!(store.last_mutation(), None);
}

#[test]
fn invalid_input_never_reaches_api() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = loaded_store(&rt, &api);

    let err = block_on(store.submit(ReviewInput::new("   ", 5))).unwrap_err();
    assert_eq!(err, MutationError::Invalid(InputError::EmptyContent));

    let err = block_on(store.edit(1, ReviewInput::new("fine", 9))).unwrap_err();
    assert_eq!(err, MutationError::Invalid(InputError::RatingOutOfRange(9)));

    assert_eq!(api.create.call_count(), 0);
    assert_eq!(api.update.call_count(), 0);
}

#[test]
fn edit_replaces_entry_in_place() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = loaded_store(&rt, &api);
    api.update.respond_with(|_| Ok(None));

    block_on(store.edit(2, ReviewInput::new("changed my mind", 3))).unwrap();

    let view = store.snapshot();
    assert_eq!(ids(&view.items), vec![1, 2, 3]);
    assert_eq!(view.items[1].content, "changed my mind");
    assert_eq!(view.items[1].rating, 3);
    assert_eq!(store.last_mutation(), Some(MutationKind::Edited(2)));
}

#[test]
fn repeated_mutations_each_rerun_watchers() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = loaded_store(&rt, &api);
    let reader = store.clone();
    let seen = record(move || reader.last_mutation());
    rt.run();
    api.update.respond_with(|_| Ok(None));

    block_on(store.edit(2, ReviewInput::new("first pass", 3))).unwrap();
    rt.run();
    block_on(store.edit(2, ReviewInput::new("second pass", 4))).unwrap();
    rt.run();

    assert_eq!(
        *seen.borrow(),
        vec![None, Some(MutationKind::Edited(2)), Some(MutationKind::Edited(2))]
    );
}

#[test]
fn snapshot_reruns_watchers_when_pages_land() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = store(&rt, &api, 42);
    let reader = store.clone();
    let seen = record(move || reader.snapshot().items.len());
    rt.run();

    store.get_next_page();
    rt.run();
    api.pages.resolve(0, Ok(page(reviews(1..=3), None)));
    rt.run();

    assert_eq!(*seen.borrow(), vec![0, 0, 3]);
}

#[test]
fn failed_edit_leaves_list_untouched() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = loaded_store(&rt, &api);
    api.update.respond_with(|_| Err(ApiError::Status { status: 500 }));
    let before = store.snapshot();

    assert!(block_on(store.edit(2, ReviewInput::new("changed", 3))).is_err());

    assert_eq!(store.snapshot(), before);
}

#[test]
fn delete_removes_entry_and_keeps_cursor() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    api.pages.respond_with(|_| Ok(page(reviews(1..=6), Some("c1"))));
    let store = store(&rt, &api, 42);
    store.get_next_page();
    rt.run();
    api.delete.respond_with(|_| Ok(()));

    block_on(store.delete(4)).unwrap();

    assert_eq!(ids(&store.snapshot().items), vec![1, 2, 3, 5, 6]);
    assert_eq!(store.with_state(|s| s.cursor().cloned()), Some(Cursor("c1".to_owned())));
    assert_eq!(store.last_mutation(), Some(MutationKind::Deleted(4)));
}

#[test]
fn failed_delete_leaves_list_untouched() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = loaded_store(&rt, &api);
    api.delete.respond_with(|_| Err(ApiError::Status { status: 404 }));
    let before = store.snapshot();

    let err = block_on(store.delete(2)).unwrap_err();

    assert_eq!(err, MutationError::Api(ApiError::Status { status: 404 }));
    assert_eq!(store.snapshot(), before);
}

#[test]
fn submit_supersedes_in_flight_pagination() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    api.pages.respond_with(|_| Ok(page(reviews(1..=6), Some("c1"))));
    let store = store(&rt, &api, 42);
    store.get_next_page();
    rt.run();

    api.pages.park();
    store.get_next_page();
    rt.run();
    api.create.respond_with(|_| Ok(20));
    block_on(store.submit(ReviewInput::new("new one", 4))).unwrap();
    rt.run();
    assert_eq!(api.pages.call_count(), 3);

    api.pages.resolve(1, Ok(page(reviews(7..=12), Some("c2"))));
    rt.run();
    assert_eq!(store.snapshot().items.len(), 6);

    api.pages.resolve(2, Ok(page(reviews([20, 1, 2]), None)));
    rt.run();
    assert_eq!(ids(&store.snapshot().items), vec![20, 1, 2]);
}

#[test]
fn disposed_store_ignores_late_pages() {
    let rt = ManualRuntime::new();
    let api = FakeApi::new();
    let store = store(&rt, &api, 42);
    store.get_next_page();
    rt.run();

    store.dispose();
    api.pages.resolve(0, Ok(page(reviews(1..=3), None)));
    rt.run();

    assert!(store.snapshot().items.is_empty());
    store.get_next_page();
    rt.run();
    assert_eq!(api.pages.call_count(), 1);
}
