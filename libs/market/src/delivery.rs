use anyhow::{Error, Result};
use async_trait::async_trait;

/// Outbound channel to a subscriber.
#[async_trait]
pub trait Delivery: Send + Sync {
    async fn send(&self, subscriber_id: &str, text: &str) -> Result<(), Error>;
}
