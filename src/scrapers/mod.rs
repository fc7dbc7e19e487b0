pub mod blocket;
pub mod fetcher;
pub mod normalize;
pub mod traits;
pub mod types;

pub use blocket::BlocketApi;
pub use fetcher::Fetcher;
pub use traits::MarketplaceSource;
