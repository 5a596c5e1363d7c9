use market::format::news_report;
use tracing::{info, warn};

use super::subscriber_id;
use crate::{Context, Error};

#[poise::command(slash_command)]
pub async fn news(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let user_id = subscriber_id(&ctx);
    let keywords = data.preferences.get_or_create(&user_id).news_keywords;

    info!(user_id = %user_id, keywords = %keywords.join(", "), "news: invoked");

    let articles = data.news.fetch(&keywords).await;
    match news_report(&articles) {
        Some(msg) => {
            info!(user_id = %user_id, count = articles.len(), "news: sending articles");
            ctx.say(msg).await?;
        }
        None => {
            warn!(user_id = %user_id, "news: nothing to show");
            ctx.say("❌ Could not fetch news. Please check the News API configuration.")
                .await?;
        }
    }

    Ok(())
}
