mod raw;

pub use raw::RawAd;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Base every listing URL is built from
pub const LISTING_URL_BASE: &str = "https://www.blocket.se/";

/// Placeholder for a missing title or location
pub const UNKNOWN: &str = "Unknown";

/// Source of the listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Blocket,
}

/// Listing category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Car,
}

/// Fields that only exist on one of the two record shapes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordKind {
    /// Built from a single-ad lookup
    Detail {
        description: String,
        images: Vec<String>,
        posted_date: Option<String>,
    },
    /// Built from a search result row
    Summary { image_url: Option<String> },
}

/// Car attributes, each present only when the source ad had it.
///
/// Values are carried exactly as the source sent them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transmission: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_power: Option<Value>,
}

/// Canonical listing record published to the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub listing_id: String,
    pub title: String,
    /// Asking price in SEK
    pub price: Option<i64>,
    pub year: Option<i32>,
    /// Mileage in km
    pub mileage: Option<i64>,
    pub location: String,
    pub url: String,
    #[serde(flatten)]
    pub kind: RecordKind,
    pub scraped_at: DateTime<Utc>,
    pub source: Source,
    pub category: Category,
    #[serde(flatten)]
    pub car: CarAttributes,
}

impl ListingRecord {
    /// Listing URL for an ad id
    pub fn url_for(listing_id: &str) -> String {
        format!("{LISTING_URL_BASE}{listing_id}")
    }

    /// One-line description used for dry-run previews
    pub fn preview(&self) -> String {
        let price = self
            .price
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string());
        let year = self
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!("{} - {} SEK ({})", self.title, price, year)
    }
}
