//! Root component and browser entry wiring.
//!
//! SYSTEM CONTEXT
//! ==============
//! The host page serves `/products/{id}`, optionally with `?code=` when the
//! OAuth provider redirects back after sign-in. `App` provides the page
//! config and the one session for the tab as context, exchanges a pending
//! code for a login, and renders the product page.

#[cfg(test)]
#[path = "app_test.rs"]
mod app_test;

use leptos::prelude::*;

use crate::config::PageConfig;
#[cfg(feature = "hydrate")]
use crate::net::api::HttpReviewApi;
use crate::net::types::ProductId;
use crate::pages::product::ProductPage;
use crate::state::session::SessionState;

/// Product id from a `/products/{id}` path.
#[must_use]
pub fn product_id_from_path(path: &str) -> Option<ProductId> {
    let mut segments = path.trim_matches('/').split('/');
    match (segments.next(), segments.next(), segments.next()) {
        (Some("products"), Some(id), None) => id.parse().ok(),
        _ => None,
    }
}

/// OAuth `code` parameter from a query string (with or without `?`).
#[must_use]
pub fn login_code_from_query(query: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "code")
        .map(|(_, value)| value.to_owned())
        .filter(|code| !code.is_empty())
}

#[component]
pub fn App(product_id: Option<ProductId>, login_code: Option<String>, config: PageConfig) -> impl IntoView {
    let session = SessionState::new();
    provide_context(session.clone());
    let api_base_url = config.api_base_url.clone();
    provide_context(config);
    start_login(session.clone(), &api_base_url, login_code);

    let on_logout = move |_| start_logout(session.clone(), &api_base_url);

    view! {
        <header class="app-header">
            <button class="app-header__logout" on:click=on_logout>"Log out"</button>
        </header>
        {match product_id {
            Some(product_id) => view! { <ProductPage product_id=product_id /> }.into_any(),
            None => view! { <p class="app-missing">"Product not found"</p> }.into_any(),
        }}
    }
}

#[cfg(feature = "hydrate")]
fn start_login(session: SessionState, api_base_url: &str, login_code: Option<String>) {
    let Some(code) = login_code else { return };
    let api = HttpReviewApi::new(api_base_url.to_owned(), session.clone());
    leptos::task::spawn_local(async move {
        if let Err(e) = crate::state::session::login(&api, &session, &code).await {
            leptos::logging::warn!("login failed: {e}");
        }
    });
}

#[cfg(not(feature = "hydrate"))]
fn start_login(_session: SessionState, _api_base_url: &str, _login_code: Option<String>) {}

#[cfg(feature = "hydrate")]
fn start_logout(session: SessionState, api_base_url: &str) {
    let api = HttpReviewApi::new(api_base_url.to_owned(), session.clone());
    leptos::task::spawn_local(async move {
        crate::state::session::logout(&api, &session).await;
    });
}

#[cfg(not(feature = "hydrate"))]
fn start_logout(session: SessionState, _api_base_url: &str) {
    session.logout();
}
