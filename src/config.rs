//! Configuration for catalog client construction.

use std::collections::BTreeMap;

/// Production gateway root. Entity paths are appended below it.
pub const DEFAULT_GATEWAY_URL: &str = "https://gateway.marvel.com/v1/public";

/// Default page window requested per fetch round.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Configuration for catalog transport and engine construction.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Base URL for the catalog gateway.
    pub gateway_url: String,
    /// Page size used by engines created through the [`Catalog`] facade.
    ///
    /// [`Catalog`]: crate::Catalog
    pub page_size: u32,
    /// Optional user agent sent on every request.
    pub user_agent: Option<String>,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            user_agent: None,
            extra_headers: BTreeMap::new(),
        }
    }
}
