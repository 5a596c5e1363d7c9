use ::serenity::all::{
    CreateActionRow, CreateSelectMenu, CreateSelectMenuKind, CreateSelectMenuOption,
};
use anyhow::bail;
use poise::serenity_prelude as serenity;
use tracing::{debug, info, warn};

use super::subscriber_id;
use crate::{Context, Data, Error};

const SELECT_VENUES_ID: &str = "select_venues";

// Discord caps select menus at 25 options.
const MAX_OPTIONS: usize = 25;

#[poise::command(slash_command)]
pub async fn venues(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let user_id = subscriber_id(&ctx);

    info!(user_id = %user_id, "venues: invoked");

    if data.registry.is_empty() {
        bail!("No markets are configured.");
    }

    let tracked = data.preferences.get_or_create(&user_id).tracked_venues;
    let limit = data.registry.len().min(MAX_OPTIONS);

    let opts: Vec<CreateSelectMenuOption> = data
        .registry
        .venues()
        .iter()
        .take(limit)
        .map(|v| {
            CreateSelectMenuOption::new(v.name.clone(), v.name.clone())
                .description(format!("{} · {}–{}", v.timezone, v.open, v.close))
                .default_selection(tracked.contains(&v.name))
        })
        .collect();

    let menu = CreateSelectMenu::new(
        SELECT_VENUES_ID,
        CreateSelectMenuKind::String { options: opts },
    )
    .placeholder("Choose markets...")
    .min_values(1)
    .max_values(limit as u8);

    ctx.send(
        poise::CreateReply::default()
            .content("📊 **Select Markets to Track**\n\nChoose which markets you want to monitor:")
            .components(vec![CreateActionRow::SelectMenu(menu)])
            .ephemeral(true),
    )
    .await?;

    debug!(user_id = %user_id, options = limit, "venues: menu sent");
    Ok(())
}

pub async fn handle_component(
    ctx: &serenity::Context,
    data: &Data,
    interaction: &serenity::ComponentInteraction,
) -> Result<(), Error> {
    let id = interaction.data.custom_id.as_str();
    let user_id = interaction.user.id.get().to_string();

    if id != SELECT_VENUES_ID {
        debug!(user_id = %user_id, custom_id = id, "venues: ignored component");
        return Ok(());
    }

    let values = match &interaction.data.kind {
        serenity::ComponentInteractionDataKind::StringSelect { values } => values.clone(),
        _ => vec![],
    };

    let selected: Vec<String> = values
        .into_iter()
        .filter(|name| data.registry.get(name).is_some())
        .collect();

    let content = match data.preferences.set_tracked_venues(&user_id, selected) {
        Ok(subscriber) => {
            let names: Vec<&str> = subscriber
                .tracked_venues
                .iter()
                .map(String::as_str)
                .collect();
            info!(
                user_id = %user_id,
                count = names.len(),
                venues = %names.join(", "),
                "venues: updated"
            );
            format!("✅ Now tracking: {}", names.join(", "))
        }
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "venues: rejected");
            format!("❌ {e}")
        }
    };

    interaction
        .create_response(
            ctx,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .components(vec![]),
            ),
        )
        .await?;

    Ok(())
}
