//! Product review page for the browser.
//!
//! ARCHITECTURE
//! ============
//! - `state`: session, async resource cells, paginated review store, the
//!   composer sheet and the login gate, each a pure state type plus a thin
//!   `Rc` driver.
//! - `pages`: the product page controller and its Leptos component.
//! - `net`: wire types and the `ReviewApi` seam with its HTTP client.
//! - `util`: task/timer runtime and device classification.
//!
//! The `hydrate` feature builds the WASM client; without it every HTTP call
//! fails with `ApiError::Unavailable` and timers resolve immediately.

pub mod app;
pub mod config;
pub mod error;
pub mod net;
pub mod pages;
pub mod state;
pub mod util;

#[cfg(test)]
mod testing;

/// WASM entry point: mount [`app::App`] for the current URL.
#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);

    let location = web_sys::window().map(|w| w.location());
    let path = location.as_ref().and_then(|l| l.pathname().ok()).unwrap_or_default();
    let query = location.as_ref().and_then(|l| l.search().ok()).unwrap_or_default();
    let product_id = app::product_id_from_path(&path);
    let login_code = app::login_code_from_query(&query);
    let config = config::PageConfig::from_build_env_or_default();
    leptos::logging::log!("mounting product page for {product_id:?}");

    leptos::mount::mount_to_body(move || {
        use leptos::prelude::*;

        use crate::app::App;
        view! { <App product_id=product_id login_code=login_code config=config /> }
    });
}
