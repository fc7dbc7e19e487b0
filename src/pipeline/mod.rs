//! Run loop: search every profile, publish what comes back, report totals.

pub mod stats;

pub use stats::ListingStats;

use crate::config::RunConfig;
use crate::models::ListingRecord;
use crate::publisher::Publisher;
use crate::scrapers::types::SearchProfile;
use crate::scrapers::{Fetcher, MarketplaceSource};
use tracing::{error, info, warn};

/// Outcome of one pass over the profiles
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub dry_run: bool,
    pub profiles_run: usize,
    /// Names of profiles whose search failed
    pub failed_profiles: Vec<String>,
    pub fetched: usize,
    pub delivered: usize,
    pub stats: ListingStats,
}

impl RunSummary {
    /// Listings were found and a publisher was live, yet nothing got through
    pub fn delivery_failed(&self) -> bool {
        !self.dry_run && self.fetched > 0 && self.delivered == 0
    }

    pub fn log(&self) {
        info!(
            "Scraping complete. Total listings collected: {}",
            self.stats.total
        );
        if self.dry_run {
            info!("DRY RUN - nothing was sent");
        } else {
            info!("Delivered {}/{} listings", self.delivered, self.fetched);
        }
        if !self.failed_profiles.is_empty() {
            warn!(
                "{} of {} searches failed: {}",
                self.failed_profiles.len(),
                self.profiles_run,
                self.failed_profiles.join(", ")
            );
        }
        if let Some(mean) = self.stats.mean_price() {
            info!("Average price: {:.0} SEK", mean);
        }
        if let Some((min, max)) = self.stats.year_range() {
            info!("Year range: {} - {}", min, max);
        }
    }
}

/// Run every profile in order, one at a time.
///
/// With no publisher the run is a dry run: listings are previewed in the
/// log instead of sent. The publisher is closed before returning.
pub async fn run_profiles<S: MarketplaceSource>(
    fetcher: &Fetcher<S>,
    mut publisher: Option<Publisher>,
    profiles: &[SearchProfile],
    run: &RunConfig,
) -> RunSummary {
    let mut summary = RunSummary {
        dry_run: publisher.is_none(),
        ..Default::default()
    };

    for (idx, profile) in profiles.iter().enumerate() {
        if idx > 0 {
            tokio::time::sleep(run.pacing()).await;
        }

        info!("Running search: {}", profile.name);
        summary.profiles_run += 1;

        let listings = match fetcher.search(profile).await {
            Ok(listings) => listings,
            Err(e) => {
                error!("Search '{}' produced no listings: {}", profile.name, e);
                summary.failed_profiles.push(profile.name.clone());
                continue;
            }
        };

        if listings.is_empty() {
            continue;
        }

        summary.fetched += listings.len();
        summary.stats.extend(&listings);

        match publisher.as_ref() {
            Some(publisher) => summary.delivered += publisher.send_batch(&listings).await,
            None => preview(&listings, run.preview_count),
        }
    }

    if let Some(publisher) = publisher.as_mut() {
        publisher.close().await;
    }

    summary
}

/// Fetch one ad in full and publish it, or preview it when dry-running.
///
/// Returns whether a record was produced and, if publishing, delivered.
pub async fn run_detail<S: MarketplaceSource>(
    fetcher: &Fetcher<S>,
    mut publisher: Option<Publisher>,
    ad_id: &str,
) -> bool {
    let Some(record) = fetcher.get_details(ad_id).await else {
        warn!("No record for ad {}", ad_id);
        return false;
    };

    match publisher.as_mut() {
        Some(publisher) => {
            let delivered = publisher.send_batch(std::slice::from_ref(&record)).await == 1;
            publisher.close().await;
            delivered
        }
        None => {
            preview(std::slice::from_ref(&record), 1);
            true
        }
    }
}

fn preview(listings: &[ListingRecord], count: usize) {
    info!("DRY RUN - Would send {} listings to Kafka", listings.len());
    for listing in listings.iter().take(count) {
        info!("Sample: {}", listing.preview());
    }
}
