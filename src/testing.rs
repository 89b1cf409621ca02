//! Test doubles: a manual runtime with virtual time and a scriptable API.
//!
//! Tests trigger an action, call [`ManualRuntime::run`] to let spawned tasks
//! and pending effects reach their first await, then resolve fake API calls
//! in whatever order the scenario needs.
//!
//! Spawned tasks share the thread-local pool that `any_spawner` runs Leptos
//! effects on, so one `run` drives both.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use any_spawner::Executor;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use leptos::prelude::{Effect, Owner};

use crate::error::ApiError;
use crate::net::api::ReviewApi;
use crate::net::types::{
    Cursor, LoginResponse, Member, Product, ProductId, RatingBucket, Review, ReviewAuthor, ReviewId, ReviewInput,
    ReviewPage, Statistics,
};
use crate::state::auth_gate::Notice;
use crate::util::runtime::{Runtime, SharedRuntime};

// =============================================================================
// MANUAL RUNTIME
// =============================================================================

pub struct ManualRuntime {
    owner: Owner,
    now_ms: Cell<u64>,
    timers: RefCell<Vec<(u64, oneshot::Sender<()>)>>,
}

impl ManualRuntime {
    /// Fresh runtime with a root reactive owner set for this thread.
    pub fn new() -> Rc<Self> {
        // Already set by an earlier test in this process.
        let _ = Executor::init_futures_executor();
        let owner = Owner::new();
        owner.set();
        Rc::new(Self { owner, now_ms: Cell::new(0), timers: RefCell::new(Vec::new()) })
    }

    pub fn shared(self: &Rc<Self>) -> SharedRuntime {
        Rc::clone(self) as SharedRuntime
    }

    /// Poll every spawned task and effect until none can make progress.
    pub fn run(&self) {
        Executor::poll_local();
    }

    /// Move virtual time forward, firing due timers in deadline order.
    pub fn advance(&self, by: Duration) {
        let target = self.now_ms.get() + millis(by);
        loop {
            self.run();
            let due = {
                let timers = self.timers.borrow();
                timers
                    .iter()
                    .enumerate()
                    .filter(|(_, (at, _))| *at <= target)
                    .min_by_key(|(_, (at, _))| *at)
                    .map(|(index, _)| index)
            };
            let Some(index) = due else { break };
            let (at, tx) = self.timers.borrow_mut().remove(index);
            self.now_ms.set(at);
            let _ = tx.send(());
        }
        self.now_ms.set(target);
        self.run();
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Timers still waiting to fire (cancelled ones included until due).
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().iter().filter(|(_, tx)| !tx.is_canceled()).count()
    }
}

impl Drop for ManualRuntime {
    fn drop(&mut self) {
        self.owner.cleanup();
    }
}

impl Runtime for ManualRuntime {
    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        Executor::spawn_local(task);
    }

    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        self.timers.borrow_mut().push((self.now_ms.get() + millis(duration), tx));
        Box::pin(async move {
            let _ = rx.await;
        })
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Effect that records `read()` on each of its runs, the first included.
/// Reads inside `read` are tracked, so writes to them show up after the next
/// [`ManualRuntime::run`].
pub fn record<T: 'static>(read: impl Fn() -> T + 'static) -> Rc<RefCell<Vec<T>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    Effect::new(move || sink.borrow_mut().push(read()));
    seen
}

// =============================================================================
// FAKE API
// =============================================================================

type Responder<Req, T> = Box<dyn Fn(&Req) -> Result<T, ApiError>>;

/// One scripted API operation. Calls either answer immediately through a
/// responder or park until the test resolves them by index.
pub struct Endpoint<Req, T> {
    calls: RefCell<Vec<Req>>,
    pending: RefCell<Vec<Option<oneshot::Sender<Result<T, ApiError>>>>>,
    responder: RefCell<Option<Responder<Req, T>>>,
}

impl<Req, T> Default for Endpoint<Req, T> {
    fn default() -> Self {
        Self { calls: RefCell::new(Vec::new()), pending: RefCell::new(Vec::new()), responder: RefCell::new(None) }
    }
}

impl<Req: Clone, T> Endpoint<Req, T> {
    pub async fn call(&self, req: Req) -> Result<T, ApiError> {
        let rx = {
            let immediate = self.responder.borrow().as_ref().map(|respond| respond(&req));
            self.calls.borrow_mut().push(req);
            if let Some(result) = immediate {
                self.pending.borrow_mut().push(None);
                return result;
            }
            let (tx, rx) = oneshot::channel();
            self.pending.borrow_mut().push(Some(tx));
            rx
        };
        rx.await.unwrap_or_else(|_| Err(ApiError::Transport("request dropped".to_owned())))
    }

    /// Answer every future call immediately with `respond`.
    pub fn respond_with(&self, respond: impl Fn(&Req) -> Result<T, ApiError> + 'static) {
        *self.responder.borrow_mut() = Some(Box::new(respond));
    }

    /// Stop answering automatically; later calls park.
    pub fn park(&self) {
        *self.responder.borrow_mut() = None;
    }

    /// Resolve the parked call made as the `index`-th call overall.
    pub fn resolve(&self, index: usize, result: Result<T, ApiError>) {
        let tx = self.pending.borrow_mut()[index].take().expect("call is parked and unresolved");
        let _ = tx.send(result);
    }

    pub fn calls(&self) -> Vec<Req> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn last_call(&self) -> Option<Req> {
        self.calls.borrow().last().cloned()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageCall {
    pub product_id: ProductId,
    pub cursor: Option<Cursor>,
    pub size: usize,
}

#[derive(Default)]
pub struct FakeApi {
    pub product: Endpoint<ProductId, Product>,
    pub statistics: Endpoint<ProductId, Statistics>,
    pub pages: Endpoint<PageCall, ReviewPage>,
    pub create: Endpoint<(ProductId, ReviewInput), ReviewId>,
    pub update: Endpoint<(ReviewId, ReviewInput), Option<Review>>,
    pub delete: Endpoint<ReviewId, ()>,
    pub login: Endpoint<String, LoginResponse>,
    pub logout: Endpoint<(), ()>,
}

impl FakeApi {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Fake whose reads all answer immediately with fixture data.
    pub fn answering() -> Rc<Self> {
        let api = Self::new();
        api.product.respond_with(|id| Ok(product(*id)));
        api.statistics.respond_with(|id| Ok(statistics(*id)));
        api.pages.respond_with(|_| Ok(page(reviews(1..=3), None)));
        api.logout.respond_with(|()| Ok(()));
        api
    }
}

impl ReviewApi for FakeApi {
    async fn fetch_product(&self, product_id: ProductId) -> Result<Product, ApiError> {
        self.product.call(product_id).await
    }

    async fn fetch_statistics(&self, product_id: ProductId) -> Result<Statistics, ApiError> {
        self.statistics.call(product_id).await
    }

    async fn fetch_review_page(
        &self,
        product_id: ProductId,
        cursor: Option<Cursor>,
        size: usize,
    ) -> Result<ReviewPage, ApiError> {
        self.pages.call(PageCall { product_id, cursor, size }).await
    }

    async fn create_review(&self, product_id: ProductId, input: ReviewInput) -> Result<ReviewId, ApiError> {
        self.create.call((product_id, input)).await
    }

    async fn update_review(&self, review_id: ReviewId, input: ReviewInput) -> Result<Option<Review>, ApiError> {
        self.update.call((review_id, input)).await
    }

    async fn delete_review(&self, review_id: ReviewId) -> Result<(), ApiError> {
        self.delete.call(review_id).await
    }

    async fn login(&self, code: String) -> Result<LoginResponse, ApiError> {
        self.login.call(code).await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.logout.call(()).await
    }
}

// =============================================================================
// NOTICE
// =============================================================================

#[derive(Default)]
pub struct RecordingNotice {
    shown: RefCell<Vec<String>>,
}

impl RecordingNotice {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.shown.borrow().clone()
    }
}

impl Notice for RecordingNotice {
    fn show(&self, message: &str) {
        self.shown.borrow_mut().push(message.to_owned());
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn product(id: ProductId) -> Product {
    Product { id, name: format!("keyboard {id}"), image_url: format!("https://img.example.test/{id}.png"), rating: 4.5 }
}

pub fn statistics(product_id: ProductId) -> Statistics {
    Statistics {
        product_id,
        total_count: 4,
        average: 4.5,
        distribution: vec![RatingBucket { rating: 5, count: 2 }, RatingBucket { rating: 4, count: 2 }],
    }
}

pub fn review(id: ReviewId) -> Review {
    Review {
        id,
        author: ReviewAuthor { id: 1, name: "corinne".to_owned(), image_url: Some("corinne_url".to_owned()) },
        content: format!("review {id}"),
        rating: 5,
        created_at: "2022-07-20T10:00:00".to_owned(),
        editable: true,
    }
}

pub fn reviews(ids: impl IntoIterator<Item = ReviewId>) -> Vec<Review> {
    ids.into_iter().map(review).collect()
}

pub fn page(items: Vec<Review>, next: Option<&str>) -> ReviewPage {
    ReviewPage { items, next_cursor: next.map(|c| Cursor(c.to_owned())) }
}

pub fn login_response() -> LoginResponse {
    LoginResponse {
        token: "token-1".to_owned(),
        member: Member {
            id: 1,
            git_hub_id: Some("hamcheeseburger".to_owned()),
            name: Some("corinne".to_owned()),
            image_url: Some("corinne_url".to_owned()),
            follower_count: Some(3),
            following: Some(2),
        },
        register_completed: true,
    }
}
