use std::sync::Arc;

use anyhow::{Error, Result, bail};
use async_trait::async_trait;
use market::Delivery;
use serenity::all::{CreateMessage, Http, UserId};
use tracing::debug;

/// Delivers messages as Discord direct messages; subscriber ids are user ids.
pub struct DirectMessageDelivery {
    http: Arc<Http>,
}

impl DirectMessageDelivery {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Delivery for DirectMessageDelivery {
    async fn send(&self, subscriber_id: &str, text: &str) -> Result<(), Error> {
        let raw: u64 = subscriber_id.parse()?;
        if raw == 0 {
            bail!("invalid subscriber id {subscriber_id}");
        }

        UserId::new(raw)
            .direct_message(&self.http, CreateMessage::new().content(text))
            .await?;

        debug!(subscriber = subscriber_id, "direct message sent");
        Ok(())
    }
}
