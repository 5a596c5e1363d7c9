use market::{
    MarketError,
    format::{MESSAGE_LIMIT, settings_report, split_message, status_report},
    locate::locate_timezone,
    status::evaluate_all,
};
use poise::CreateReply;
use tracing::{info, warn};

use super::subscriber_id;
use crate::{Context, Error, config::split_keywords};

async fn reply_private(ctx: Context<'_>, text: impl Into<String>) -> Result<(), Error> {
    ctx.send(CreateReply::default().content(text).ephemeral(true))
        .await?;
    Ok(())
}

/// Replies with a user-correctable error, propagates the rest.
async fn reply_error(ctx: Context<'_>, err: MarketError) -> Result<(), Error> {
    if !err.is_user_correctable() {
        return Err(err.into());
    }

    let text = match &err {
        MarketError::InvalidTimezone(tz) => format!(
            "❌ Invalid timezone `{tz}`. Please use a valid timezone like: Asia/Dhaka, America/New_York, etc."
        ),
        other => format!("❌ {other}"),
    };
    reply_private(ctx, text).await
}

#[poise::command(slash_command)]
pub async fn settings(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = subscriber_id(&ctx);
    let subscriber = ctx.data().preferences.get_or_create(&user_id);

    info!(user_id = %user_id, "settings: invoked");
    reply_private(ctx, settings_report(&subscriber)).await
}

#[poise::command(slash_command)]
pub async fn timezone(
    ctx: Context<'_>,
    #[description = "IANA timezone, e.g. Asia/Dhaka"] zone: String,
) -> Result<(), Error> {
    let user_id = subscriber_id(&ctx);
    info!(user_id = %user_id, zone = %zone, "timezone: invoked");

    match ctx.data().preferences.set_timezone(&user_id, &zone) {
        Ok(subscriber) => {
            let tz = subscriber.timezone.unwrap_or_default();
            reply_private(
                ctx,
                format!(
                    "✅ **Timezone Updated!**\n\nYour timezone is now set to: `{tz}`\n\nMarket status will be shown in your local time."
                ),
            )
            .await
        }
        Err(e) => {
            warn!(user_id = %user_id, zone = %zone, error = %e, "timezone: rejected");
            reply_error(ctx, e).await
        }
    }
}

#[poise::command(slash_command)]
pub async fn locate(
    ctx: Context<'_>,
    #[description = "Latitude in degrees"] latitude: f64,
    #[description = "Longitude in degrees"] longitude: f64,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let data = ctx.data();
    let user_id = subscriber_id(&ctx);
    info!(user_id = %user_id, latitude, longitude, "locate: invoked");

    let Some(tz) = locate_timezone(data.locator.as_ref(), latitude, longitude).await else {
        return reply_private(
            ctx,
            "❌ Could not detect a timezone from that location. Please use `/market timezone`.",
        )
        .await;
    };

    match data.preferences.set_timezone(&user_id, &tz) {
        Ok(_) => {
            let records = evaluate_all(data.registry.venues(), chrono::Utc::now(), Some(&tz));
            let text = format!(
                "📍 **Timezone Detected!**\n\nYour timezone has been set to: `{tz}`\n\n{}",
                status_report(&records)
            );
            for chunk in split_message(&text, MESSAGE_LIMIT) {
                reply_private(ctx, chunk).await?;
            }
            Ok(())
        }
        Err(e) => reply_error(ctx, e).await,
    }
}

#[poise::command(slash_command)]
pub async fn notify(ctx: Context<'_>) -> Result<(), Error> {
    let user_id = subscriber_id(&ctx);
    let enabled = ctx.data().preferences.toggle_notifications(&user_id);

    info!(user_id = %user_id, enabled, "notify: toggled");

    let state = if enabled { "enabled" } else { "disabled" };
    reply_private(ctx, format!("✅ Notifications {state}!")).await
}

#[poise::command(slash_command)]
pub async fn keywords(
    ctx: Context<'_>,
    #[description = "Comma-separated keywords (e.g., stock market, crypto)"] keywords: String,
) -> Result<(), Error> {
    let user_id = subscriber_id(&ctx);
    info!(user_id = %user_id, raw_input = %keywords, "keywords: invoked");

    match ctx
        .data()
        .preferences
        .set_news_keywords(&user_id, split_keywords(&keywords))
    {
        Ok(subscriber) => {
            reply_private(
                ctx,
                format!(
                    "✅ News keywords set to: {}",
                    subscriber.news_keywords.join(", ")
                ),
            )
            .await
        }
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "keywords: rejected");
            reply_error(ctx, e).await
        }
    }
}
