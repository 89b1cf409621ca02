//! Wire DTOs for the review API boundary.
//!
//! DESIGN
//! ======
//! Field names follow the camelCase JSON the review API emits. Paging is
//! exposed to the rest of the crate as an opaque [`Cursor`]; only the HTTP
//! adapter knows it wraps a page number.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

pub type ProductId = u64;
pub type ReviewId = u64;
pub type MemberId = u64;

/// Longest review body the API accepts, in characters.
pub const MAX_CONTENT_CHARS: usize = 1000;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A product as shown in the detail card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image_url: String,
    /// Average rating across every review of this product.
    pub rating: f64,
}

/// Number of reviews that gave one particular rating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingBucket {
    pub rating: u8,
    pub count: u32,
}

/// Aggregate rating distribution over the full review set of a product.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub product_id: ProductId,
    pub total_count: u32,
    pub average: f64,
    #[serde(default)]
    pub distribution: Vec<RatingBucket>,
}

impl Statistics {
    /// Review count for `rating`, zero when the bucket is absent.
    #[must_use]
    pub fn count_for(&self, rating: u8) -> u32 {
        self.distribution
            .iter()
            .find(|bucket| bucket.rating == rating)
            .map_or(0, |bucket| bucket.count)
    }

    /// Fraction of reviews in `[0, 1]` that gave `rating`, for bar widths.
    #[must_use]
    pub fn share_of(&self, rating: u8) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        f64::from(self.count_for(rating)) / f64::from(self.total_count)
    }
}

/// Public profile of the member who wrote a review.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewAuthor {
    pub id: MemberId,
    pub name: String,
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub author: ReviewAuthor,
    pub content: String,
    pub rating: u8,
    /// ISO-8601 creation timestamp as sent by the server.
    pub created_at: String,
    /// Whether the signed-in member may edit or delete this review.
    #[serde(default)]
    pub editable: bool,
}

/// Opaque continuation token for the next review page.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor(pub String);

impl Cursor {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of reviews. `next_cursor == None` marks the last page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReviewPage {
    pub items: Vec<Review>,
    pub next_cursor: Option<Cursor>,
}

/// Review page exactly as the API returns it (`hasNext` paging).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPageResponse {
    pub items: Vec<Review>,
    pub has_next: bool,
}

impl ReviewPageResponse {
    /// Convert into a [`ReviewPage`], deriving the next cursor from the page
    /// number this response answered. There is no page after `u32::MAX`.
    #[must_use]
    pub fn into_page(self, page: u32) -> ReviewPage {
        let next_cursor = page.checked_add(1).filter(|_| self.has_next).map(|next| Cursor(next.to_string()));
        ReviewPage { items: self.items, next_cursor }
    }
}

/// Author-supplied review body, used for both create and edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewInput {
    pub content: String,
    pub rating: u8,
}

impl ReviewInput {
    #[must_use]
    pub fn new(content: impl Into<String>, rating: u8) -> Self {
        Self { content: content.into(), rating }
    }

    /// Check the input against the limits the API enforces.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), InputError> {
        if !(MIN_RATING..=MAX_RATING).contains(&self.rating) {
            return Err(InputError::RatingOutOfRange(self.rating));
        }
        if self.content.trim().is_empty() {
            return Err(InputError::EmptyContent);
        }
        let len = self.content.chars().count();
        if len > MAX_CONTENT_CHARS {
            return Err(InputError::ContentTooLong { len, max: MAX_CONTENT_CHARS });
        }
        Ok(())
    }
}

/// Member profile attached to a login response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: MemberId,
    pub git_hub_id: Option<String>,
    pub name: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub follower_count: Option<u32>,
    #[serde(default)]
    pub following: Option<u32>,
}

/// Result of exchanging an OAuth code at `/login`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub member: Member,
    #[serde(default)]
    pub register_completed: bool,
}
