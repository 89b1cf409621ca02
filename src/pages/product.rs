//! Product page: detail, rating statistics, review list and composer sheet.
//!
//! SYSTEM CONTEXT
//! ==============
//! [`ProductController`] composes the two resource cells, the review store,
//! the composer sheet and the auth gate for one product route. Every part
//! tracks its reads, so [`ProductController::view`] called inside a memo
//! re-runs whenever any part changes. The [`ProductPage`] component owns a
//! controller for its lifetime and renders from that memo.
//!
//! DESIGN
//! ======
//! An effect over the store's last mutation refetches product and
//! statistics in the background (the average rating and distribution move
//! with the review set). The mutation result reaches the caller before those
//! refetches start. Successful mutations also bump a focus sequence so the page can
//! move keyboard focus back to the review list.
//!
//! ERROR HANDLING
//! ==============
//! Fetch failures render a per-section fallback with a retry button; the
//! sections fail independently. Mutation failures are returned to the
//! composer and shown inline.

#[cfg(test)]
#[path = "product_test.rs"]
mod product_test;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;

use crate::config::{PageConfig, use_page_config};
use crate::error::{FetchError, MutationError};
use crate::net::api::{HttpReviewApi, ReviewApi};
use crate::net::types::{Product, ProductId, Review, ReviewId, ReviewInput, Statistics};
use crate::state::auth_gate::{AuthGate, GateOutcome, Notice};
use crate::state::resource::{ResourceCell, ResourceView};
use crate::state::reviews::{ReviewListView, ReviewStore};
use crate::state::session::SessionState;
use crate::state::sheet::{Sheet, SheetPhase};
use crate::util::device::{self, DeviceKind};
use crate::util::runtime::{BrowserRuntime, SharedRuntime};

pub const OPEN_LABEL: &str = "+";
pub const CLOSE_LABEL: &str = "x";

/// Render gate for one independently fetched section.
#[derive(Clone, Debug, PartialEq)]
pub enum Section<T> {
    /// Fetching. Carries the value for the current key while it refreshes.
    Loading(Option<T>),
    Ready(T),
    Failed(FetchError),
}

impl<T> Section<T> {
    fn from_view(view: ResourceView<T>) -> Self {
        match (view.error, view.value) {
            (Some(error), _) if view.is_error => Self::Failed(error),
            (_, Some(value)) if view.is_ready => Self::Ready(value),
            (_, value) => Self::Loading(value),
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Loading(value) => value.as_ref(),
            Self::Ready(value) => Some(value),
            Self::Failed(_) => None,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Everything the page renders, captured at one instant.
#[derive(Clone, Debug, PartialEq)]
pub struct PageView {
    pub product_id: ProductId,
    pub product: Section<Product>,
    pub statistics: Section<Statistics>,
    pub reviews: ReviewListView,
    pub sheet: SheetPhase,
    pub sheet_mounted: bool,
    pub sheet_open: bool,
    pub button_label: &'static str,
    pub is_logged_in: bool,
    pub sticky_detail: bool,
    pub focus_seq: u64,
}

/// Collaborators a controller is built from.
pub struct PageDeps<A> {
    pub api: Rc<A>,
    pub session: SessionState,
    pub notice: Rc<dyn Notice>,
    pub runtime: SharedRuntime,
    pub device: DeviceKind,
}

struct ControllerInner<A> {
    product_id: Cell<ProductId>,
    product: ResourceCell<ProductId, Product>,
    statistics: ResourceCell<ProductId, Statistics>,
    reviews: ReviewStore<A>,
    sheet: Sheet,
    gate: RefCell<Option<AuthGate>>,
    session: SessionState,
    device: DeviceKind,
    focus_seq: Cell<u64>,
    /// Notified when `product_id` or `focus_seq` moves.
    changed: ArcTrigger,
    refresh_watch: Effect<LocalStorage>,
    alive: Cell<bool>,
}

/// Orchestrates one product page.
pub struct ProductController<A> {
    inner: Rc<ControllerInner<A>>,
}

impl<A> Clone for ProductController<A> {
    fn clone(&self) -> Self {
        Self { inner: Rc::clone(&self.inner) }
    }
}

impl<A: ReviewApi + 'static> ProductController<A> {
    pub fn new(deps: PageDeps<A>, config: &PageConfig, product_id: ProductId) -> Self {
        let PageDeps { api, session, notice, runtime, device } = deps;

        let product = {
            let api = Rc::clone(&api);
            ResourceCell::new("product", Rc::clone(&runtime), move |id| {
                let api = Rc::clone(&api);
                Box::pin(async move { api.fetch_product(id).await })
            })
        };
        let statistics = {
            let api = Rc::clone(&api);
            ResourceCell::new("statistics", Rc::clone(&runtime), move |id| {
                let api = Rc::clone(&api);
                Box::pin(async move { api.fetch_statistics(id).await })
            })
        };
        let reviews = ReviewStore::new(api, Rc::clone(&runtime), product_id, config.page_size);
        let sheet = Sheet::new(config.sheet, runtime);
        let gate = AuthGate::new(session.clone(), sheet.clone(), notice);

        let refresh_watch = {
            let reviews = reviews.clone();
            let product = product.clone();
            let statistics = statistics.clone();
            Effect::new(move |watching: Option<()>| {
                let last = reviews.last_mutation();
                if let (Some(()), Some(kind)) = (watching, last) {
                    leptos::logging::log!("product page: {kind:?}, refreshing product and statistics");
                    product.refetch();
                    statistics.refetch();
                }
            })
        };

        Self {
            inner: Rc::new(ControllerInner {
                product_id: Cell::new(product_id),
                product,
                statistics,
                reviews,
                sheet,
                gate: RefCell::new(Some(gate)),
                session,
                device,
                focus_seq: Cell::new(0),
                changed: ArcTrigger::new(),
                refresh_watch,
                alive: Cell::new(true),
            }),
        }
    }

    /// Start the initial product, statistics and first-page fetches.
    pub fn mount(&self) {
        let product_id = self.inner.product_id.get();
        self.inner.product.set_key(product_id);
        self.inner.statistics.set_key(product_id);
        self.inner.reviews.get_next_page();
    }

    #[must_use]
    pub fn product_id(&self) -> ProductId {
        self.inner.changed.track();
        self.inner.product_id.get()
    }

    /// Re-key every resource to another product.
    pub fn set_product_id(&self, product_id: ProductId) {
        if !self.inner.alive.get() || self.inner.product_id.get() == product_id {
            return;
        }
        leptos::logging::log!("product page: switching to product {product_id}");
        self.inner.product_id.set(product_id);
        self.inner.changed.notify();
        self.inner.product.set_key(product_id);
        self.inner.statistics.set_key(product_id);
        self.inner.reviews.set_product(product_id);
    }

    /// Floating button: close an open sheet, otherwise ask the gate.
    /// [`GateOutcome::Ignored`] means the sheet was mid-animation.
    pub fn press_floating_button(&self) -> Option<GateOutcome> {
        if !self.inner.alive.get() {
            return None;
        }
        if self.inner.sheet.phase_untracked().is_open() {
            let moved = self.inner.sheet.toggle();
            return Some(if moved { GateOutcome::Toggled } else { GateOutcome::Ignored });
        }
        self.inner.gate.borrow().as_ref().map(AuthGate::attempt_open)
    }

    /// Close the composer from inside the sheet (close button, backdrop).
    pub fn close_sheet(&self) {
        self.inner.sheet.force_close();
    }

    pub fn get_next_page(&self) {
        self.inner.reviews.get_next_page();
    }

    /// Submit a new review; on success the sheet closes and focus returns to
    /// the list.
    ///
    /// # Errors
    ///
    /// Returns the validation or API error from the review store.
    pub async fn submit(&self, input: ReviewInput) -> Result<ReviewId, MutationError> {
        let review_id = self.inner.reviews.submit(input).await?;
        if self.inner.alive.get() {
            self.inner.sheet.force_close();
            self.request_focus();
        }
        Ok(review_id)
    }

    /// # Errors
    ///
    /// Returns the validation or API error from the review store.
    pub async fn edit(&self, review_id: ReviewId, input: ReviewInput) -> Result<(), MutationError> {
        self.inner.reviews.edit(review_id, input).await?;
        self.request_focus();
        Ok(())
    }

    /// # Errors
    ///
    /// Returns the API error from the review store.
    pub async fn delete(&self, review_id: ReviewId) -> Result<(), MutationError> {
        self.inner.reviews.delete(review_id).await?;
        self.request_focus();
        Ok(())
    }

    pub fn retry_product(&self) {
        self.inner.product.refetch();
    }

    pub fn retry_statistics(&self) {
        self.inner.statistics.refetch();
    }

    pub fn retry_reviews(&self) {
        self.inner.reviews.get_next_page();
    }

    #[must_use]
    pub fn focus_seq(&self) -> u64 {
        self.inner.changed.track();
        self.inner.focus_seq.get()
    }

    /// Everything the page renders. Tracks every part it reads.
    #[must_use]
    pub fn view(&self) -> PageView {
        self.inner.changed.track();
        let sheet = self.inner.sheet.phase();
        PageView {
            product_id: self.inner.product_id.get(),
            product: Section::from_view(self.inner.product.snapshot()),
            statistics: Section::from_view(self.inner.statistics.snapshot()),
            reviews: self.inner.reviews.snapshot(),
            sheet,
            sheet_mounted: sheet.is_mounted(),
            sheet_open: sheet.is_open(),
            button_label: if sheet.is_open() { CLOSE_LABEL } else { OPEN_LABEL },
            is_logged_in: self.inner.session.is_logged_in(),
            sticky_detail: self.inner.device.sticky_detail(),
            focus_seq: self.inner.focus_seq.get(),
        }
    }

    /// Tear down every part; in-flight work settles into nothing.
    pub fn dispose(&self) {
        if !self.inner.alive.replace(false) {
            return;
        }
        self.inner.refresh_watch.stop();
        self.inner.gate.borrow_mut().take();
        self.inner.product.dispose();
        self.inner.statistics.dispose();
        self.inner.reviews.dispose();
        self.inner.sheet.dispose();
    }

    fn request_focus(&self) {
        if !self.inner.alive.get() {
            return;
        }
        self.inner.focus_seq.set(self.inner.focus_seq.get() + 1);
        self.inner.changed.notify();
    }
}

// =============================================================================
// COMPONENT
// =============================================================================

/// [`Notice`] backed by `window.alert`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlertNotice;

impl Notice for AlertNotice {
    fn show(&self, message: &str) {
        #[cfg(feature = "hydrate")]
        {
            if let Some(window) = web_sys::window() {
                if let Err(e) = window.alert_with_message(message) {
                    leptos::logging::warn!("notice: alert failed: {e:?}");
                }
                return;
            }
        }
        leptos::logging::warn!("notice: {message}");
    }
}

type PageHandle = StoredValue<ProductController<HttpReviewApi>, LocalStorage>;

/// Product route body.
#[component]
pub fn ProductPage(product_id: ProductId) -> impl IntoView {
    let session = use_context::<SessionState>().unwrap_or_default();
    let config = use_page_config();
    let deps = PageDeps {
        api: Rc::new(HttpReviewApi::new(config.api_base_url.clone(), session.clone())),
        session,
        notice: Rc::new(AlertNotice),
        runtime: Rc::new(BrowserRuntime),
        device: device::current(),
    };
    let controller = ProductController::new(deps, &config, product_id);
    controller.mount();

    let handle: PageHandle = StoredValue::new_local(controller);
    on_cleanup(move || {
        let _ = handle.try_with_value(ProductController::dispose);
    });

    let page = Memo::new(move |_| handle.with_value(ProductController::view));

    let list_ref = NodeRef::<leptos::html::Section>::new();
    Effect::new(move |previous: Option<u64>| {
        let seq = page.with(|p| p.focus_seq);
        if previous.is_some_and(|p| p != seq) {
            focus_list(list_ref);
        }
        seq
    });

    let on_fab = move |_| {
        handle.with_value(|c| {
            c.press_floating_button();
        });
    };

    view! {
        <main class="product-page">
            <div class=move || if page.with(|p| p.sticky_detail) { "product-page__detail product-page__detail--sticky" } else { "product-page__detail" }>
                {move || product_section(handle, page.with(|p| p.product.clone()))}
                {move || statistics_section(handle, page.with(|p| p.statistics.clone()))}
            </div>
            <section class="product-page__reviews" tabindex="-1" node_ref=list_ref>
                {move || review_list(handle, page.with(|p| p.reviews.clone()))}
            </section>
            <button class="product-page__fab" on:click=on_fab>
                {move || page.with(|p| p.button_label)}
            </button>
            <Show when=move || page.with(|p| p.sheet_mounted)>
                <ReviewSheet handle=handle open=Signal::derive(move || page.with(|p| p.sheet_open)) />
            </Show>
        </main>
    }
}

fn product_section(handle: PageHandle, section: Section<Product>) -> AnyView {
    match section {
        Section::Failed(error) => fallback(error, move || handle.with_value(ProductController::retry_product)),
        section => match section.value().cloned() {
            Some(product) => view! {
                <div class="product-detail">
                    <img src=product.image_url alt=product.name.clone() />
                    <h1>{product.name}</h1>
                    <span class="product-detail__rating">{format!("{:.1}", product.rating)}</span>
                </div>
            }
            .into_any(),
            None => view! { <p class="product-detail product-detail--loading">"Loading..."</p> }.into_any(),
        },
    }
}

fn statistics_section(handle: PageHandle, section: Section<Statistics>) -> AnyView {
    match section {
        Section::Failed(error) => fallback(error, move || handle.with_value(ProductController::retry_statistics)),
        section => match section.value().cloned() {
            Some(stats) => {
                let bars = (1..=5_u8)
                    .rev()
                    .map(|rating| {
                        let width = format!("width: {:.0}%", stats.share_of(rating) * 100.0);
                        view! {
                            <li class="rating-graph__bar">
                                <span>{rating}</span>
                                <span class="rating-graph__fill" style=width></span>
                                <span>{stats.count_for(rating)}</span>
                            </li>
                        }
                    })
                    .collect_view();
                view! {
                    <div class="rating-graph">
                        <span class="rating-graph__average">{format!("{:.1}", stats.average)}</span>
                        <span class="rating-graph__total">{stats.total_count}</span>
                        <ul>{bars}</ul>
                    </div>
                }
                .into_any()
            }
            None => view! { <p class="rating-graph rating-graph--loading">"Loading..."</p> }.into_any(),
        },
    }
}

fn review_list(handle: PageHandle, list: ReviewListView) -> AnyView {
    if list.is_error && list.items.is_empty() {
        if let Some(error) = list.error {
            return fallback(error, move || handle.with_value(ProductController::retry_reviews));
        }
    }
    let items = list.items.into_iter().map(review_item).collect_view();
    let footer = if list.is_loading {
        view! { <p class="review-list__status">"Loading..."</p> }.into_any()
    } else if list.is_error {
        view! {
            <button class="review-list__more" on:click=move |_| handle.with_value(ProductController::retry_reviews)>
                "Retry"
            </button>
        }
        .into_any()
    } else if list.is_end_of_data {
        ().into_any()
    } else {
        view! {
            <button class="review-list__more" on:click=move |_| handle.with_value(ProductController::get_next_page)>
                "More"
            </button>
        }
        .into_any()
    };
    view! {
        <ul class="review-list">{items}</ul>
        {footer}
    }
    .into_any()
}

fn review_item(review: Review) -> impl IntoView {
    view! {
        <li class="review-item">
            <span class="review-item__author">{review.author.name}</span>
            <span class="review-item__rating">{review.rating}</span>
            <p class="review-item__content">{review.content}</p>
            <time>{review.created_at}</time>
        </li>
    }
}

fn fallback(error: FetchError, retry: impl Fn() + Send + Sync + 'static) -> AnyView {
    view! {
        <div class="fetch-fallback" role="alert">
            <p>{error.to_string()}</p>
            <button on:click=move |_| retry()>"Retry"</button>
        </div>
    }
    .into_any()
}

/// Bottom sheet holding the review composer.
#[component]
fn ReviewSheet(handle: PageHandle, #[prop(into)] open: Signal<bool>) -> impl IntoView {
    let content = RwSignal::new(String::new());
    let rating = RwSignal::new(5_u8);
    let submit_error = RwSignal::new(None::<String>);

    let on_submit = move |ev: leptos::ev::SubmitEvent| {
        ev.prevent_default();
        let input = ReviewInput::new(content.get_untracked(), rating.get_untracked());
        let controller = handle.with_value(Clone::clone);
        leptos::task::spawn_local(async move {
            match controller.submit(input).await {
                Ok(_) => {
                    content.set(String::new());
                    submit_error.set(None);
                }
                Err(e) => submit_error.set(Some(e.to_string())),
            }
        });
    };

    view! {
        <div class=move || if open.get() { "review-sheet review-sheet--open" } else { "review-sheet" }>
            <button class="review-sheet__close" on:click=move |_| handle.with_value(ProductController::close_sheet)>
                "x"
            </button>
            <form on:submit=on_submit>
                <select on:change=move |ev| {
                    if let Ok(value) = event_target_value(&ev).parse() {
                        rating.set(value);
                    }
                }>
                    {(1..=5_u8).rev().map(|r| view! { <option value=r.to_string() selected=move || rating.get() == r>{r}</option> }).collect_view()}
                </select>
                <textarea
                    prop:value=move || content.get()
                    on:input=move |ev| content.set(event_target_value(&ev))
                ></textarea>
                {move || submit_error.get().map(|message| view! { <p class="review-sheet__error">{message}</p> })}
                <button type="submit">"Submit"</button>
            </form>
        </div>
    }
}

#[cfg(feature = "hydrate")]
fn focus_list(list_ref: NodeRef<leptos::html::Section>) {
    if let Some(element) = list_ref.get_untracked() {
        if let Err(e) = element.focus() {
            leptos::logging::warn!("product page: focusing review list failed: {e:?}");
        }
    }
}

#[cfg(not(feature = "hydrate"))]
fn focus_list(_list_ref: NodeRef<leptos::html::Section>) {}
