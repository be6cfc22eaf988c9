use serde::{Deserialize, Serialize};

/// One scraped product. Field order here is the key order of the emitted JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub title: String,
    pub price: String,
    pub rating: u8,
    pub reviews_count: u32,
    pub product_url: String,
    pub description: String,
}

/// What a listing page tells us about a product before its detail page is visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub title: String,
    pub price: String,
    pub rating: u8,
    pub reviews_count: u32,
    pub product_url: String,
    /// Short blurb shown on the listing card, used when the detail page is skipped or unreachable.
    pub snippet: String,
}

impl ListingEntry {
    pub fn into_record(self, description: String) -> ProductRecord {
        ProductRecord {
            title: self.title,
            price: self.price,
            rating: self.rating,
            reviews_count: self.reviews_count,
            product_url: self.product_url,
            description,
        }
    }
}
