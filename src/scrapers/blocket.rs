use crate::config::SourceConfig;
use crate::error::FetchError;
use crate::models::RawAd;
use crate::scrapers::traits::MarketplaceSource;
use crate::scrapers::types::SearchQuery;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Blocket motor API client
pub struct BlocketApi {
    client: Client,
    base_url: String,
}

impl BlocketApi {
    /// Create a client from the `[source]` configuration section
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(
        &self,
        operation: &str,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Value, FetchError> {
        debug!("Fetching {} ({} params)", url, params.len());

        let response = self.client.get(url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Blocket returned status {} for {}", status, operation);
            return Err(FetchError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::decode(operation, e))
    }
}

/// Query parameters for a car search
pub(crate) fn search_params(query: &SearchQuery) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();

    if let Some(q) = query.query.as_deref().filter(|q| !q.trim().is_empty()) {
        params.push(("q", q.to_string()));
    }
    for location in &query.locations {
        params.push(("location", location.as_param().to_string()));
    }

    let ranges = [
        ("price_from", query.price_from),
        ("price_to", query.price_to),
        ("year_from", query.year_from.map(i64::from)),
        ("year_to", query.year_to.map(i64::from)),
        ("mileage_from", query.mileage_from),
        ("mileage_to", query.mileage_to),
    ];
    for (name, value) in ranges {
        if let Some(value) = value {
            params.push((name, value.to_string()));
        }
    }

    params.push(("sort", query.sort_order.as_param().to_string()));
    params.push(("limit", query.limit.to_string()));
    params
}

fn is_valid_ad_id(ad_id: &str) -> bool {
    !ad_id.is_empty() && ad_id.bytes().all(|b| b.is_ascii_digit())
}

/// Unwrap an optional top-level `data` envelope
fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Search responses are an array of ad objects
pub(crate) fn parse_ads(body: Value) -> Result<Vec<RawAd>, FetchError> {
    match unwrap_data(body) {
        Value::Array(items) => Ok(items.into_iter().filter_map(RawAd::from_value).collect()),
        other => Err(FetchError::decode(
            "search",
            format!("expected an array of ads, got {}", kind_of(&other)),
        )),
    }
}

/// Ad lookups return a single ad object
pub(crate) fn parse_ad(body: Value) -> Result<RawAd, FetchError> {
    let value = unwrap_data(body);
    let kind = kind_of(&value);
    RawAd::from_value(value)
        .ok_or_else(|| FetchError::decode("get_ad", format!("expected an ad object, got {kind}")))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl MarketplaceSource for BlocketApi {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawAd>, FetchError> {
        let url = format!("{}/search/car", self.base_url);
        let body = self.get_json("search", &url, &search_params(query)).await?;
        let ads = parse_ads(body)?;
        debug!("Blocket search returned {} ads", ads.len());
        Ok(ads)
    }

    async fn get(&self, ad_id: &str) -> Result<RawAd, FetchError> {
        if !is_valid_ad_id(ad_id) {
            return Err(FetchError::InvalidAdId(ad_id.to_string()));
        }
        let url = format!("{}/ad/{}", self.base_url, ad_id);
        let body = self.get_json("get_ad", &url, &[]).await?;
        parse_ad(body)
    }

    fn source_name(&self) -> &'static str {
        "Blocket"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::types::{Location, SearchProfile, SortOrder};
    use serde_json::json;

    #[test]
    fn search_params_include_only_set_filters() {
        let profile = SearchProfile {
            locations: vec![Location::Stockholm, Location::Uppsala],
            price_to: Some(50_000),
            year_from: Some(1995),
            sort_order: SortOrder::PriceAsc,
            max_results: 50,
            ..Default::default()
        };
        let params = search_params(&profile.to_query(Location::Stockholm));

        assert_eq!(
            params,
            vec![
                ("location", "stockholm".to_string()),
                ("location", "uppsala".to_string()),
                ("price_to", "50000".to_string()),
                ("year_from", "1995".to_string()),
                ("sort", "price_asc".to_string()),
                ("limit", "50".to_string()),
            ]
        );
    }

    #[test]
    fn blank_query_is_not_sent() {
        let profile = SearchProfile {
            query: Some("  ".to_string()),
            ..Default::default()
        };
        let params = search_params(&profile.to_query(Location::Stockholm));
        assert!(params.iter().all(|(name, _)| *name != "q"));
    }

    #[test]
    fn parse_ads_accepts_bare_and_wrapped_arrays() {
        let bare = parse_ads(json!([{ "ad_id": 1 }, { "ad_id": 2 }])).unwrap();
        assert_eq!(bare.len(), 2);

        let wrapped = parse_ads(json!({ "data": [{ "ad_id": 1 }], "total": 1 })).unwrap();
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].text("ad_id").as_deref(), Some("1"));
    }

    #[test]
    fn parse_ads_rejects_non_arrays() {
        let err = parse_ads(json!({ "error": "rate limited" })).unwrap_err();
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn parse_ad_unwraps_data() {
        let ad = parse_ad(json!({ "data": { "ad_id": "42", "subject": "Saab" } })).unwrap();
        assert_eq!(ad.text("subject").as_deref(), Some("Saab"));
        assert!(parse_ad(json!({ "data": null })).is_err());
    }

    #[test]
    fn ad_ids_must_be_numeric() {
        assert!(is_valid_ad_id("1234567"));
        for bad in ["", "1/../x", "1?a=b", "12 34", "-5", "١٢"] {
            assert!(!is_valid_ad_id(bad), "accepted {bad:?}");
        }
    }

    #[tokio::test]
    async fn get_refuses_malformed_id_without_a_request() {
        let config = SourceConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let api = BlocketApi::new(&config).unwrap();

        let err = api.get("1/../search/car").await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidAdId(ref id) if id == "1/../search/car"));
    }
}
