use crate::models::ListingRecord;

/// Aggregates over every listing collected in a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingStats {
    pub total: usize,
    price_sum: i128,
    price_count: usize,
    year_range: Option<(i32, i32)>,
}

impl ListingStats {
    #[cfg(test)]
    pub fn from_listings(listings: &[ListingRecord]) -> Self {
        let mut stats = Self::default();
        stats.extend(listings);
        stats
    }

    pub fn add(&mut self, listing: &ListingRecord) {
        self.total += 1;
        if let Some(price) = listing.price {
            self.price_sum += i128::from(price);
            self.price_count += 1;
        }
        if let Some(year) = listing.year {
            self.year_range = Some(match self.year_range {
                Some((min, max)) => (min.min(year), max.max(year)),
                None => (year, year),
            });
        }
    }

    pub fn extend(&mut self, listings: &[ListingRecord]) {
        for listing in listings {
            self.add(listing);
        }
    }

    /// Mean over listings that have a price
    pub fn mean_price(&self) -> Option<f64> {
        (self.price_count > 0).then(|| self.price_sum as f64 / self.price_count as f64)
    }

    /// Oldest and newest model year among listings that have one
    pub fn year_range(&self) -> Option<(i32, i32)> {
        self.year_range
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawAd;
    use crate::scrapers::normalize::normalize_summary;
    use serde_json::json;

    fn listing(price: Option<i64>, year: Option<i32>) -> ListingRecord {
        let ad = RawAd::from_value(json!({
            "ad_id": "1",
            "price": price.map(|value| json!({ "value": value })),
            "year": year,
        }))
        .unwrap();
        normalize_summary(&ad).unwrap()
    }

    #[test]
    fn ignores_missing_prices_and_years() {
        let stats = ListingStats::from_listings(&[
            listing(Some(100_000), Some(2010)),
            listing(None, Some(2005)),
            listing(Some(50_000), None),
        ]);

        assert_eq!(stats.total, 3);
        assert_eq!(stats.mean_price(), Some(75_000.0));
        assert_eq!(stats.year_range(), Some((2005, 2010)));
    }

    #[test]
    fn empty_run_has_no_aggregates() {
        let stats = ListingStats::from_listings(&[listing(None, None)]);
        assert_eq!(stats.mean_price(), None);
        assert_eq!(stats.year_range(), None);
    }
}
