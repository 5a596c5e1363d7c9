mod delivery;
mod error;

pub mod alert;
pub mod format;
pub mod locate;
pub mod news;
pub mod preferences;
pub mod price_client;
pub mod quote;
pub mod registry;
pub mod status;

pub use alert::{AlertScanner, AlertSettings, ScanSummary};
pub use delivery::Delivery;
pub use error::{MarketError, Result};
pub use locate::{TimeApiLocator, TimezoneLocator};
pub use news::{NewsApiClient, NewsArticle, NewsFetcher, NewsProvider};
pub use preferences::{PreferenceDefaults, PreferenceStore, Subscriber};
pub use price_client::{PriceClient, PriceProvider, PriceSnapshot};
pub use quote::{Quote, QuoteFetcher};
pub use registry::{Registry, SessionTime, TimeWindow, Venue};
pub use status::{MarketState, StatusRecord, evaluate};
