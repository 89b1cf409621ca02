//! Paginated review list for one product.
//!
//! SYSTEM CONTEXT
//! ==============
//! The store is the only writer of the accumulated review sequence. Page
//! loads are strictly sequential (the loading guard rejects overlap) and a
//! reset stamps a new generation so an in-flight page for the old sequence
//! lands as stale.
//!
//! ERROR HANDLING
//! ==============
//! A failed page load sets the list's own fetch error. A failed submit, edit
//! or delete is returned to the caller and leaves the list exactly as it
//! was; the two failure kinds never mix.

#[cfg(test)]
#[path = "reviews_test.rs"]
mod reviews_test;

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use leptos::prelude::{ArcRwSignal, ArcTrigger, Get, Notify, Set, Track};

use crate::error::{ApiError, FetchError, MutationError};
use crate::net::api::ReviewApi;
use crate::net::types::{Cursor, ProductId, Review, ReviewId, ReviewInput, ReviewPage};
use crate::util::runtime::SharedRuntime;

const RESOURCE: &str = "reviews";

/// A page load the store wants started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub ticket: u64,
    pub product_id: ProductId,
    pub cursor: Option<Cursor>,
    pub size: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct InFlight {
    ticket: u64,
    replace: bool,
}

/// Pure accumulator state: loaded reviews, cursor, and load bookkeeping.
#[derive(Clone, Debug)]
pub struct ReviewListState {
    product_id: ProductId,
    page_size: usize,
    items: Vec<Review>,
    cursor: Option<Cursor>,
    end_of_data: bool,
    in_flight: Option<InFlight>,
    /// Next page load replaces the sequence instead of appending.
    pending_replace: bool,
    loaded: bool,
    error: Option<FetchError>,
    generation: u64,
}

impl ReviewListState {
    #[must_use]
    pub fn new(product_id: ProductId, page_size: usize) -> Self {
        Self {
            product_id,
            page_size,
            items: Vec::new(),
            cursor: None,
            end_of_data: false,
            in_flight: None,
            pending_replace: false,
            loaded: false,
            error: None,
            generation: 0,
        }
    }

    #[must_use]
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    #[must_use]
    pub fn items(&self) -> &[Review] {
        &self.items
    }

    #[must_use]
    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// At least one page has landed since the last product switch.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.loaded
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    #[must_use]
    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    #[must_use]
    pub fn is_end_of_data(&self) -> bool {
        self.end_of_data
    }

    /// Next page to load, or `None` while loading or after the last page.
    pub fn begin_next_page(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() || self.end_of_data {
            return None;
        }
        let cursor = if self.pending_replace { None } else { self.cursor.clone() };
        Some(self.issue(cursor))
    }

    /// Restart from the first page. Supersedes any in-flight load; the
    /// current items stay visible until the first page replaces them.
    pub fn begin_reset(&mut self) -> PageRequest {
        self.pending_replace = true;
        self.end_of_data = false;
        self.issue(None)
    }

    /// Point the list at another product and load its first page.
    pub fn switch_product(&mut self, product_id: ProductId) -> PageRequest {
        self.product_id = product_id;
        self.items.clear();
        self.cursor = None;
        self.loaded = false;
        self.begin_reset()
    }

    /// Apply a settled page load. Returns `false` for a superseded ticket.
    pub fn apply_page(&mut self, ticket: u64, result: Result<ReviewPage, FetchError>) -> bool {
        let Some(in_flight) = self.in_flight.filter(|f| f.ticket == ticket) else {
            return false;
        };
        self.in_flight = None;

        match result {
            Ok(page) => {
                let short = page.items.len() < self.page_size;
                if in_flight.replace {
                    self.items.clear();
                    self.pending_replace = false;
                }
                let mut seen: HashSet<ReviewId> = self.items.iter().map(|r| r.id).collect();
                for review in page.items {
                    if seen.insert(review.id) {
                        self.items.push(review);
                    }
                }
                self.end_of_data = short || page.next_cursor.is_none();
                self.cursor = page.next_cursor;
                self.loaded = true;
                self.error = None;
            }
            Err(error) => {
                self.error = Some(error);
            }
        }
        true
    }

    /// Replace a loaded review after a confirmed edit. The server copy wins
    /// when there is one.
    pub fn apply_edit(&mut self, review_id: ReviewId, input: &ReviewInput, server: Option<Review>) -> bool {
        let Some(entry) = self.items.iter_mut().find(|r| r.id == review_id) else {
            return false;
        };
        match server {
            Some(review) => *entry = review,
            None => {
                entry.content.clone_from(&input.content);
                entry.rating = input.rating;
            }
        }
        true
    }

    /// Remove a loaded review after a confirmed delete. Cursor is untouched.
    pub fn apply_delete(&mut self, review_id: ReviewId) -> bool {
        let before = self.items.len();
        self.items.retain(|r| r.id != review_id);
        self.items.len() != before
    }

    /// Drop any in-flight load so it lands as stale.
    pub fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight = None;
    }

    fn issue(&mut self, cursor: Option<Cursor>) -> PageRequest {
        self.generation += 1;
        self.in_flight = Some(InFlight { ticket: self.generation, replace: self.pending_replace });
        self.error = None;
        PageRequest { ticket: self.generation, product_id: self.product_id, cursor, size: self.page_size }
    }
}

/// Successful mutation, published through [`ReviewStore::last_mutation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
    Created(ReviewId),
    Edited(ReviewId),
    Deleted(ReviewId),
}

/// Render-facing copy of the list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewListView {
    pub items: Vec<Review>,
    pub is_loading: bool,
    pub is_ready: bool,
    pub is_error: bool,
    pub is_end_of_data: bool,
    pub error: Option<FetchError>,
}

// =============================================================================
// STORE
// =============================================================================

struct StoreInner<A> {
    api: Rc<A>,
    runtime: SharedRuntime,
    state: RefCell<ReviewListState>,
    changed: ArcTrigger,
    last_mutation: ArcRwSignal<Option<MutationKind>>,
    alive: Cell<bool>,
}

/// Cursor-paginated review list with create/edit/delete.
pub struct ReviewStore<A> {
    inner: Rc<StoreInner<A>>,
}

impl<A> Clone for ReviewStore<A> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<A: ReviewApi + 'static> ReviewStore<A> {
    pub fn new(api: Rc<A>, runtime: SharedRuntime, product_id: ProductId, page_size: usize) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                api,
                runtime,
                state: RefCell::new(ReviewListState::new(product_id, page_size)),
                changed: ArcTrigger::new(),
                last_mutation: ArcRwSignal::new(None),
                alive: Cell::new(true),
            }),
        }
    }

    /// Load the next page; a no-op while loading or after the last page.
    pub fn get_next_page(&self) {
        if !self.inner.alive.get() {
            return;
        }
        let request = self.inner.state.borrow_mut().begin_next_page();
        if let Some(request) = request {
            self.start(request);
            self.notify();
        }
    }

    /// Switch to another product, discarding the loaded sequence.
    pub fn set_product(&self, product_id: ProductId) {
        if !self.inner.alive.get() || self.inner.state.borrow().product_id() == product_id {
            return;
        }
        let request = self.inner.state.borrow_mut().switch_product(product_id);
        self.start(request);
        self.notify();
    }

    /// Reload from the first page.
    pub fn reload(&self) {
        if !self.inner.alive.get() {
            return;
        }
        let request = self.inner.state.borrow_mut().begin_reset();
        self.start(request);
        self.notify();
    }

    /// Create a review. On success the list restarts from the first page and
    /// the mutation is published.
    ///
    /// # Errors
    ///
    /// Returns the validation or API error; the list is left untouched.
    pub async fn submit(&self, input: ReviewInput) -> Result<ReviewId, MutationError> {
        input.validate()?;
        let product_id = self.inner.state.borrow().product_id();
        let review_id = self
            .inner
            .api
            .create_review(product_id, input)
            .await
            .map_err(|e| log_mutation_failure("submit", e))?;
        leptos::logging::log!("reviews: created review {review_id} for product {product_id}");
        if self.inner.alive.get() {
            self.reload();
            self.inner.last_mutation.set(Some(MutationKind::Created(review_id)));
        }
        Ok(review_id)
    }

    /// Edit a review in place.
    ///
    /// # Errors
    ///
    /// Returns the validation or API error; the list is left untouched.
    pub async fn edit(&self, review_id: ReviewId, input: ReviewInput) -> Result<(), MutationError> {
        input.validate()?;
        let server = self
            .inner
            .api
            .update_review(review_id, input.clone())
            .await
            .map_err(|e| log_mutation_failure("edit", e))?;
        if self.inner.alive.get() {
            let changed = self.inner.state.borrow_mut().apply_edit(review_id, &input, server);
            if changed {
                self.notify();
            }
            self.inner.last_mutation.set(Some(MutationKind::Edited(review_id)));
        }
        Ok(())
    }

    /// Delete a review and drop it from the loaded pages.
    ///
    /// # Errors
    ///
    /// Returns the API error; the list is left untouched.
    pub async fn delete(&self, review_id: ReviewId) -> Result<(), MutationError> {
        self.inner
            .api
            .delete_review(review_id)
            .await
            .map_err(|e| log_mutation_failure("delete", e))?;
        if self.inner.alive.get() {
            let changed = self.inner.state.borrow_mut().apply_delete(review_id);
            if changed {
                self.notify();
            }
            self.inner.last_mutation.set(Some(MutationKind::Deleted(review_id)));
        }
        Ok(())
    }

    /// Render-facing copy; tracks the store.
    #[must_use]
    pub fn snapshot(&self) -> ReviewListView {
        self.inner.changed.track();
        let state = self.inner.state.borrow();
        ReviewListView {
            items: state.items().to_vec(),
            is_loading: state.is_loading(),
            is_ready: state.is_ready(),
            is_error: state.is_error(),
            is_end_of_data: state.is_end_of_data(),
            error: state.error().cloned(),
        }
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&ReviewListState) -> R) -> R {
        f(&self.inner.state.borrow())
    }

    /// Most recent successful submit, edit or delete. Every mutation
    /// notifies, even one equal to the last.
    #[must_use]
    pub fn last_mutation(&self) -> Option<MutationKind> {
        self.inner.last_mutation.get()
    }

    pub fn dispose(&self) {
        self.inner.alive.set(false);
        self.inner.state.borrow_mut().invalidate();
    }

    fn start(&self, request: PageRequest) {
        let api = Rc::clone(&self.inner.api);
        let weak: Weak<StoreInner<A>> = Rc::downgrade(&self.inner);
        self.inner.runtime.spawn(Box::pin(async move {
            let PageRequest { ticket, product_id, cursor, size } = request;
            let result = api.fetch_review_page(product_id, cursor, size).await;
            if let Some(inner) = weak.upgrade() {
                Self { inner }.finish(ticket, result);
            }
        }));
    }

    fn finish(&self, ticket: u64, result: Result<ReviewPage, ApiError>) {
        if !self.inner.alive.get() {
            return;
        }
        let result = result.map_err(|source| {
            leptos::logging::warn!("{RESOURCE}: page load failed: {source}");
            FetchError { resource: RESOURCE, source }
        });
        let applied = self.inner.state.borrow_mut().apply_page(ticket, result);
        if applied {
            self.notify();
        } else {
            leptos::logging::debug_warn!("{RESOURCE}: discarded stale page");
        }
    }

    fn notify(&self) {
        self.inner.changed.notify();
    }
}

fn log_mutation_failure(action: &str, error: ApiError) -> ApiError {
    leptos::logging::warn!("reviews: {action} failed: {error}");
    error
}
