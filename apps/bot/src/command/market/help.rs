use market::format::HELP_TEXT;

use crate::{Context, Error};

#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    ctx.say(HELP_TEXT).await?;
    Ok(())
}
