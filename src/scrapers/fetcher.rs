use crate::error::FetchError;
use crate::models::{ListingRecord, RawAd};
use crate::scrapers::normalize::{normalize_detail, normalize_summary};
use crate::scrapers::traits::MarketplaceSource;
use crate::scrapers::types::{Location, SearchProfile};
use tracing::{debug, error, info, warn};

/// Runs searches against a marketplace and normalizes what comes back
pub struct Fetcher<S> {
    source: S,
    home: Location,
    empty_on_error: bool,
}

impl<S: MarketplaceSource> Fetcher<S> {
    /// `home` is searched whenever a profile names no region
    pub fn new(source: S, home: Location) -> Self {
        Self {
            source,
            home,
            empty_on_error: false,
        }
    }

    /// When set, a failed search is logged and reported as zero results
    pub fn empty_on_error(mut self, enabled: bool) -> Self {
        self.empty_on_error = enabled;
        self
    }

    /// Search with a profile, returning at most `profile.max_results` records
    /// in the order the source returned them.
    pub async fn search(&self, profile: &SearchProfile) -> Result<Vec<ListingRecord>, FetchError> {
        let query = profile.to_query(self.home);
        info!(
            "Searching {}: query={:?}, locations={:?}",
            self.source.source_name(),
            query.query,
            query.locations
        );

        let ads = match self.source.search(&query).await {
            Ok(ads) => ads,
            Err(e) if self.empty_on_error => {
                error!("Search '{}' failed, treating as empty: {}", profile.name, e);
                return Ok(Vec::new());
            }
            Err(e) => {
                error!("Search '{}' failed: {}", profile.name, e);
                return Err(e);
            }
        };

        let listings = normalize_batch(&ads, profile.max_results);
        info!("✅ Fetched {} car listings for '{}'", listings.len(), profile.name);
        Ok(listings)
    }

    /// Fetch one ad in full; `None` if the lookup or normalization fails
    pub async fn get_details(&self, ad_id: &str) -> Option<ListingRecord> {
        info!("Fetching details for ad {}", ad_id);

        let ad = match self.source.get(ad_id).await {
            Ok(ad) => ad,
            Err(e) => {
                error!("Error fetching ad details for {}: {}", ad_id, e);
                return None;
            }
        };

        match normalize_detail(&ad) {
            Ok(record) => Some(record),
            Err(e) => {
                error!("Error parsing ad details for {}: {}", ad_id, e);
                None
            }
        }
    }
}

/// Normalize the first `cap` ads, skipping any that fail
fn normalize_batch(ads: &[RawAd], cap: usize) -> Vec<ListingRecord> {
    if ads.len() > cap {
        debug!("Source returned {} ads, keeping first {}", ads.len(), cap);
    }

    ads.iter()
        .take(cap)
        .enumerate()
        .filter_map(|(idx, ad)| match normalize_summary(ad) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping ad #{}: {}", idx, e);
                None
            }
        })
        .collect()
}
