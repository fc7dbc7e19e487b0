use crate::error::FetchError;
use crate::models::{CarAttributes, Category, ListingRecord, RawAd, RecordKind, Source, UNKNOWN};
use chrono::Utc;

/// Turn a search-result ad into a summary record.
///
/// Fails only when the ad has no usable `ad_id`.
pub fn normalize_summary(ad: &RawAd) -> Result<ListingRecord, FetchError> {
    let kind = RecordKind::Summary {
        image_url: first_image(ad),
    };
    let car = CarAttributes {
        make: ad.get("make").cloned(),
        model: ad.get("model").cloned(),
        fuel_type: ad.get("fuel_type").cloned(),
        transmission: ad.get("transmission").cloned(),
        ..Default::default()
    };
    build(ad, kind, car)
}

/// Turn a single-ad lookup into a detail record
pub fn normalize_detail(ad: &RawAd) -> Result<ListingRecord, FetchError> {
    let kind = RecordKind::Detail {
        description: ad.text("body").unwrap_or_default(),
        images: all_images(ad),
        posted_date: ad.text("list_time"),
    };
    let car = CarAttributes {
        make: ad.get("make").cloned(),
        model: ad.get("model").cloned(),
        fuel_type: ad.get("fuel_type").cloned(),
        transmission: ad.get("transmission").cloned(),
        body_type: ad.get("body_type").cloned(),
        color: ad.get("color").cloned(),
        engine_power: ad.get("engine_power").cloned(),
    };
    build(ad, kind, car)
}

fn build(ad: &RawAd, kind: RecordKind, car: CarAttributes) -> Result<ListingRecord, FetchError> {
    let listing_id = listing_id(ad)?;

    Ok(ListingRecord {
        url: ListingRecord::url_for(&listing_id),
        title: ad
            .text("subject")
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        price: price(ad),
        year: ad.int("year").and_then(|y| i32::try_from(y).ok()),
        mileage: ad.int("mileage"),
        location: location(ad),
        kind,
        scraped_at: Utc::now(),
        source: Source::Blocket,
        category: Category::Car,
        car,
        listing_id,
    })
}

fn listing_id(ad: &RawAd) -> Result<String, FetchError> {
    ad.text("ad_id")
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or(FetchError::MissingField("ad_id"))
}

/// Price lives under `price.value`; anything else means no price
fn price(ad: &RawAd) -> Option<i64> {
    ad.object("price")
        .and_then(|p| p.get("value"))
        .and_then(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64)))
}

fn location(ad: &RawAd) -> String {
    ad.object("location")
        .and_then(|l| l.get("name"))
        .and_then(|n| n.as_str())
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn image_url(image: &serde_json::Map<String, serde_json::Value>) -> Option<String> {
    image
        .get("url")
        .and_then(|u| u.as_str())
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

fn first_image(ad: &RawAd) -> Option<String> {
    ad.objects("images").first().and_then(|img| image_url(img))
}

fn all_images(ad: &RawAd) -> Vec<String> {
    ad.objects("images")
        .into_iter()
        .filter_map(image_url)
        .collect()
}
