use chrono::Utc;
use market::{
    format::{MESSAGE_LIMIT, split_message, status_report},
    status::evaluate_all,
};
use tracing::{debug, info};

use super::subscriber_id;
use crate::{Context, Error};

#[poise::command(slash_command)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let user_id = subscriber_id(&ctx);

    let subscriber = data.preferences.get_or_create(&user_id);
    let viewer = subscriber
        .timezone
        .unwrap_or_else(|| data.default_timezone.clone());

    info!(user_id = %user_id, viewer = %viewer, "status: invoked");

    let records = evaluate_all(data.registry.venues(), Utc::now(), Some(&viewer));
    debug!(
        user_id = %user_id,
        open = records.iter().filter(|r| r.is_open).count(),
        total = records.len(),
        "status: evaluated"
    );

    for chunk in split_message(&status_report(&records), MESSAGE_LIMIT) {
        ctx.say(chunk).await?;
    }
    Ok(())
}
