use std::fmt;

use serde::{Deserialize, Serialize};

/// Blocket search regions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Blekinge,
    Dalarna,
    Gavleborg,
    Goteborg,
    Gotland,
    Halland,
    Jamtland,
    Jonkoping,
    Kalmar,
    Kronoberg,
    Norrbotten,
    Orebro,
    Ostergotland,
    Skane,
    Sodermanland,
    Stockholm,
    Uppsala,
    Varmland,
    Vasterbotten,
    Vasternorrland,
    Vastmanland,
}

impl Location {
    /// Value sent in the `location` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            Location::Blekinge => "blekinge",
            Location::Dalarna => "dalarna",
            Location::Gavleborg => "gavleborg",
            Location::Goteborg => "goteborg",
            Location::Gotland => "gotland",
            Location::Halland => "halland",
            Location::Jamtland => "jamtland",
            Location::Jonkoping => "jonkoping",
            Location::Kalmar => "kalmar",
            Location::Kronoberg => "kronoberg",
            Location::Norrbotten => "norrbotten",
            Location::Orebro => "orebro",
            Location::Ostergotland => "ostergotland",
            Location::Skane => "skane",
            Location::Sodermanland => "sodermanland",
            Location::Stockholm => "stockholm",
            Location::Uppsala => "uppsala",
            Location::Varmland => "varmland",
            Location::Vasterbotten => "vasterbotten",
            Location::Vasternorrland => "vasternorrland",
            Location::Vastmanland => "vastmanland",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

/// Result ordering requested from the source
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    PriceAsc,
    PriceDesc,
    Latest,
    YearAsc,
    YearDesc,
    MileageAsc,
    MileageDesc,
}

impl SortOrder {
    /// Value sent in the `sort` query parameter
    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::PriceAsc => "price_asc",
            SortOrder::PriceDesc => "price_desc",
            SortOrder::Latest => "latest",
            SortOrder::YearAsc => "year_asc",
            SortOrder::YearDesc => "year_desc",
            SortOrder::MileageAsc => "mileage_asc",
            SortOrder::MileageDesc => "mileage_desc",
        }
    }
}

/// Named set of search filters, defined before a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchProfile {
    pub name: String,
    /// Free-text query (e.g. "Volvo V70")
    #[serde(default)]
    pub query: Option<String>,
    /// Regions to search; empty means the home region
    #[serde(default)]
    pub locations: Vec<Location>,
    /// Minimum price (SEK)
    #[serde(default)]
    pub price_from: Option<i64>,
    /// Maximum price (SEK)
    #[serde(default)]
    pub price_to: Option<i64>,
    #[serde(default)]
    pub year_from: Option<i32>,
    #[serde(default)]
    pub year_to: Option<i32>,
    /// Minimum mileage (km)
    #[serde(default)]
    pub mileage_from: Option<i64>,
    /// Maximum mileage (km)
    #[serde(default)]
    pub mileage_to: Option<i64>,
    #[serde(default)]
    pub sort_order: SortOrder,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    50
}

impl Default for SearchProfile {
    fn default() -> Self {
        Self {
            name: "Default search".to_string(),
            query: None,
            locations: Vec::new(),
            price_from: None,
            price_to: None,
            year_from: None,
            year_to: None,
            mileage_from: None,
            mileage_to: None,
            sort_order: SortOrder::default(),
            max_results: default_max_results(),
        }
    }
}

impl SearchProfile {
    /// The three searches run when no profiles are configured
    pub fn builtin() -> Vec<SearchProfile> {
        vec![
            SearchProfile {
                name: "All Stockholm Cars".to_string(),
                locations: vec![Location::Stockholm],
                sort_order: SortOrder::Latest,
                max_results: 50,
                ..Default::default()
            },
            SearchProfile {
                name: "Potential Classics (15-30 years old)".to_string(),
                locations: vec![Location::Stockholm, Location::Uppsala, Location::Goteborg],
                year_from: Some(1995),
                year_to: Some(2010),
                sort_order: SortOrder::PriceAsc,
                max_results: 100,
                ..Default::default()
            },
            SearchProfile {
                name: "Budget Cars Under 50k".to_string(),
                locations: vec![Location::Stockholm],
                price_to: Some(50_000),
                sort_order: SortOrder::PriceAsc,
                max_results: 50,
                ..Default::default()
            },
        ]
    }

    /// Build the source query, falling back to `home` when no region is set
    pub fn to_query(&self, home: Location) -> SearchQuery {
        let locations = if self.locations.is_empty() {
            vec![home]
        } else {
            self.locations.clone()
        };

        SearchQuery {
            query: self.query.clone(),
            locations,
            price_from: self.price_from,
            price_to: self.price_to,
            year_from: self.year_from,
            year_to: self.year_to,
            mileage_from: self.mileage_from,
            mileage_to: self.mileage_to,
            sort_order: self.sort_order,
            limit: self.max_results,
        }
    }

    /// Reject profiles that can never match anything
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("profile name is empty".to_string());
        }
        if self.max_results == 0 {
            return Err(format!("profile '{}': max_results must be > 0", self.name));
        }
        check_range(&self.name, "price", self.price_from, self.price_to)?;
        check_range(&self.name, "year", self.year_from, self.year_to)?;
        check_range(&self.name, "mileage", self.mileage_from, self.mileage_to)?;
        Ok(())
    }
}

fn check_range<T: PartialOrd + fmt::Display>(
    profile: &str,
    field: &str,
    from: Option<T>,
    to: Option<T>,
) -> Result<(), String> {
    match (from, to) {
        (Some(from), Some(to)) if from > to => Err(format!(
            "profile '{profile}': {field}_from ({from}) is greater than {field}_to ({to})"
        )),
        _ => Ok(()),
    }
}

/// Filters as handed to a [`MarketplaceSource`](super::MarketplaceSource)
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub query: Option<String>,
    /// Never empty
    pub locations: Vec<Location>,
    pub price_from: Option<i64>,
    pub price_to: Option<i64>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub mileage_from: Option<i64>,
    pub mileage_to: Option<i64>,
    pub sort_order: SortOrder,
    /// Upper bound on ads worth returning
    pub limit: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_locations_fall_back_to_home() {
        let profile = SearchProfile::default();
        let query = profile.to_query(Location::Stockholm);
        assert_eq!(query.locations, vec![Location::Stockholm]);
    }

    #[test]
    fn explicit_locations_are_kept_in_order() {
        let profile = &SearchProfile::builtin()[1];
        let query = profile.to_query(Location::Stockholm);
        assert_eq!(
            query.locations,
            vec![Location::Stockholm, Location::Uppsala, Location::Goteborg]
        );
        assert_eq!(query.year_from, Some(1995));
        assert_eq!(query.year_to, Some(2010));
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn builtin_profiles_are_valid() {
        let profiles = SearchProfile::builtin();
        assert_eq!(profiles.len(), 3);
        assert!(profiles.iter().all(|p| p.validate().is_ok()));
        assert_eq!(profiles[2].price_to, Some(50_000));
        assert_eq!(profiles[0].sort_order, SortOrder::Latest);
    }

    #[test]
    fn inverted_range_is_rejected() {
        let profile = SearchProfile {
            year_from: Some(2010),
            year_to: Some(1995),
            ..Default::default()
        };
        let err = profile.validate().unwrap_err();
        assert!(err.contains("year_from"));
    }

    #[test]
    fn profile_parses_from_toml() {
        let profile: SearchProfile = toml::from_str(
            r#"
            name = "Cheap Volvos"
            query = "Volvo"
            locations = ["uppsala", "skane"]
            price_to = 30000
            sort_order = "mileage_asc"
            "#,
        )
        .unwrap();
        assert_eq!(profile.locations, vec![Location::Uppsala, Location::Skane]);
        assert_eq!(profile.sort_order, SortOrder::MileageAsc);
        assert_eq!(profile.max_results, 50);
    }
}
