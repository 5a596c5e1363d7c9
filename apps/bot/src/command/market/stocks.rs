use market::format::{MESSAGE_LIMIT, split_message, stocks_report};
use tracing::info;

use crate::{Context, Error};

#[poise::command(slash_command)]
pub async fn stocks(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer().await?;

    let data = ctx.data();
    let symbols = data.registry.all_symbols();
    info!(count = symbols.len(), "stocks: fetching quotes");

    let quotes = data.quotes.fetch(&symbols).await;
    let available = quotes.values().filter(|q| q.is_available()).count();
    info!(available, total = quotes.len(), "stocks: quotes fetched");

    for chunk in split_message(&stocks_report(&symbols, &quotes), MESSAGE_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}
