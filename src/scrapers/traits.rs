use crate::error::FetchError;
use crate::models::RawAd;
use crate::scrapers::types::SearchQuery;
use async_trait::async_trait;

/// A marketplace that can be searched for ads and asked for a single ad
#[async_trait]
pub trait MarketplaceSource: Send + Sync {
    /// Run a search, returning raw ads in the order the source sorted them
    async fn search(&self, query: &SearchQuery) -> Result<Vec<RawAd>, FetchError>;

    /// Look up one ad by id
    async fn get(&self, ad_id: &str) -> Result<RawAd, FetchError>;

    /// Get the name of the source
    fn source_name(&self) -> &'static str;
}
