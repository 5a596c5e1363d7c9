mod help;
mod news;
mod settings;
mod status;
mod stocks;
mod venues;

use crate::{Context, Error};
use help::help;
use news::news;
use settings::{keywords, locate, notify, settings, timezone};
use status::status;
use stocks::stocks;
use venues::venues;

pub use venues::handle_component;

#[poise::command(
    slash_command,
    rename = "market",
    subcommands(
        "status", "stocks", "news", "settings", "timezone", "locate", "notify", "keywords",
        "venues", "help"
    )
)]
pub async fn market_command(_: Context<'_>) -> Result<(), Error> {
    Ok(())
}

/// Subscribers are keyed by Discord user id.
fn subscriber_id(ctx: &Context<'_>) -> String {
    ctx.author().id.get().to_string()
}
