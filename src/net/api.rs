//! Review API seam and its browser HTTP implementation.
//!
//! Client-side (hydrate): real HTTP calls via `gloo-net`.
//! Server-side (SSR): every call fails with [`ApiError::Unavailable`] since
//! these endpoints are only meaningful in the browser.
//!
//! ERROR HANDLING
//! ==============
//! Calls return `Result<_, ApiError>` instead of panicking so a failed load
//! or mutation degrades one section of the page, never the whole page.

#![allow(clippy::unused_async)]

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use super::types::{Cursor, LoginResponse, Product, ProductId, Review, ReviewId, ReviewInput, ReviewPage, Statistics};
use crate::error::ApiError;
use crate::state::session::SessionState;

/// Inbound operations the page consumes. Each resolves with data or fails
/// with a transport/validation error.
#[allow(async_fn_in_trait)]
pub trait ReviewApi {
    async fn fetch_product(&self, product_id: ProductId) -> Result<Product, ApiError>;

    async fn fetch_statistics(&self, product_id: ProductId) -> Result<Statistics, ApiError>;

    async fn fetch_review_page(
        &self,
        product_id: ProductId,
        cursor: Option<Cursor>,
        size: usize,
    ) -> Result<ReviewPage, ApiError>;

    /// Create a review and return its server-assigned id.
    async fn create_review(&self, product_id: ProductId, input: ReviewInput) -> Result<ReviewId, ApiError>;

    /// Update a review. `Some` carries the server copy when the API returns one.
    async fn update_review(&self, review_id: ReviewId, input: ReviewInput) -> Result<Option<Review>, ApiError>;

    async fn delete_review(&self, review_id: ReviewId) -> Result<(), ApiError>;

    /// Exchange an OAuth authorization code for a session.
    async fn login(&self, code: String) -> Result<LoginResponse, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;
}

// =============================================================================
// ENDPOINTS
// =============================================================================

#[cfg(any(test, feature = "hydrate"))]
fn product_endpoint(base: &str, product_id: ProductId) -> String {
    format!("{base}/products/{product_id}")
}

#[cfg(any(test, feature = "hydrate"))]
fn statistics_endpoint(base: &str, product_id: ProductId) -> String {
    format!("{base}/products/{product_id}/statistics")
}

#[cfg(any(test, feature = "hydrate"))]
fn review_page_endpoint(base: &str, product_id: ProductId, page: u32, size: usize) -> String {
    format!("{base}/products/{product_id}/reviews?page={page}&size={size}&sort=createdAt,desc")
}

#[cfg(any(test, feature = "hydrate"))]
fn product_reviews_endpoint(base: &str, product_id: ProductId) -> String {
    format!("{base}/products/{product_id}/reviews")
}

#[cfg(any(test, feature = "hydrate"))]
fn review_endpoint(base: &str, review_id: ReviewId) -> String {
    format!("{base}/reviews/{review_id}")
}

#[cfg(any(test, feature = "hydrate"))]
fn login_endpoint(base: &str, code: &str) -> String {
    format!("{base}/login?code={code}")
}

#[cfg(any(test, feature = "hydrate"))]
fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

/// Page number a cursor points at; no cursor means the first page.
fn page_number(cursor: Option<&Cursor>) -> Result<u32, ApiError> {
    match cursor {
        None => Ok(0),
        Some(cursor) => cursor
            .as_str()
            .parse::<u32>()
            .map_err(|_| ApiError::Decode(format!("bad cursor: {}", cursor.as_str()))),
    }
}

#[cfg(any(test, feature = "hydrate"))]
/// Extract the created review id from a `Location` header such as
/// `/api/v1/reviews/17`.
fn review_id_from_location(location: &str) -> Result<ReviewId, ApiError> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse::<ReviewId>().ok())
        .ok_or_else(|| ApiError::Decode(format!("bad location header: {location}")))
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// [`ReviewApi`] over the REST endpoints, authenticated with the shared
/// session's bearer token.
#[derive(Clone)]
pub struct HttpReviewApi {
    base_url: String,
    #[cfg_attr(not(feature = "hydrate"), allow(dead_code))]
    session: SessionState,
}

impl HttpReviewApi {
    #[must_use]
    pub fn new(base_url: impl Into<String>, session: SessionState) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_owned(), session }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[cfg(feature = "hydrate")]
    fn authorization(&self) -> Result<String, ApiError> {
        self.session.token().map(|t| bearer(&t)).ok_or(ApiError::Unauthorized)
    }

    #[cfg(feature = "hydrate")]
    async fn get_json<T: serde::de::DeserializeOwned>(url: &str) -> Result<T, ApiError> {
        let resp = gloo_net::http::Request::get(url)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        if !resp.ok() {
            return Err(ApiError::from_status(resp.status()));
        }
        resp.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl ReviewApi for HttpReviewApi {
    async fn fetch_product(&self, product_id: ProductId) -> Result<Product, ApiError> {
        #[cfg(feature = "hydrate")]
        {
            Self::get_json(&product_endpoint(&self.base_url, product_id)).await
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = product_id;
            Err(ApiError::Unavailable)
        }
    }

    async fn fetch_statistics(&self, product_id: ProductId) -> Result<Statistics, ApiError> {
        #[cfg(feature = "hydrate")]
        {
            Self::get_json(&statistics_endpoint(&self.base_url, product_id)).await
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = product_id;
            Err(ApiError::Unavailable)
        }
    }

    async fn fetch_review_page(
        &self,
        product_id: ProductId,
        cursor: Option<Cursor>,
        size: usize,
    ) -> Result<ReviewPage, ApiError> {
        let page = page_number(cursor.as_ref())?;
        #[cfg(feature = "hydrate")]
        {
            let url = review_page_endpoint(&self.base_url, product_id, page, size);
            let response: super::types::ReviewPageResponse = Self::get_json(&url).await?;
            Ok(response.into_page(page))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (product_id, page, size);
            Err(ApiError::Unavailable)
        }
    }

    async fn create_review(&self, product_id: ProductId, input: ReviewInput) -> Result<ReviewId, ApiError> {
        #[cfg(feature = "hydrate")]
        {
            let url = product_reviews_endpoint(&self.base_url, product_id);
            let resp = gloo_net::http::Request::post(&url)
                .header("Authorization", &self.authorization()?)
                .json(&input)
                .map_err(|e| ApiError::Transport(e.to_string()))?
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            if !resp.ok() {
                return Err(ApiError::from_status(resp.status()));
            }
            let location = resp
                .headers()
                .get("location")
                .ok_or_else(|| ApiError::Decode("missing location header".to_owned()))?;
            review_id_from_location(&location)
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (product_id, input);
            Err(ApiError::Unavailable)
        }
    }

    async fn update_review(&self, review_id: ReviewId, input: ReviewInput) -> Result<Option<Review>, ApiError> {
        #[cfg(feature = "hydrate")]
        {
            let url = review_endpoint(&self.base_url, review_id);
            let resp = gloo_net::http::Request::put(&url)
                .header("Authorization", &self.authorization()?)
                .json(&input)
                .map_err(|e| ApiError::Transport(e.to_string()))?
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            if !resp.ok() {
                return Err(ApiError::from_status(resp.status()));
            }
            if resp.status() == 204 {
                return Ok(None);
            }
            resp.json::<Review>().await.map(Some).map_err(|e| ApiError::Decode(e.to_string()))
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = (review_id, input);
            Err(ApiError::Unavailable)
        }
    }

    async fn delete_review(&self, review_id: ReviewId) -> Result<(), ApiError> {
        #[cfg(feature = "hydrate")]
        {
            let url = review_endpoint(&self.base_url, review_id);
            let resp = gloo_net::http::Request::delete(&url)
                .header("Authorization", &self.authorization()?)
                .send()
                .await
                .map_err(|e| ApiError::Transport(e.to_string()))?;
            if !resp.ok() {
                return Err(ApiError::from_status(resp.status()));
            }
            Ok(())
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = review_id;
            Err(ApiError::Unavailable)
        }
    }

    async fn login(&self, code: String) -> Result<LoginResponse, ApiError> {
        #[cfg(feature = "hydrate")]
        {
            Self::get_json(&login_endpoint(&self.base_url, &code)).await
        }
        #[cfg(not(feature = "hydrate"))]
        {
            let _ = code;
            Err(ApiError::Unavailable)
        }
    }

    async fn logout(&self) -> Result<(), ApiError> {
        // Tokens are stateless on the server; dropping the local session is
        // the whole logout.
        Ok(())
    }
}
