use std::{sync::Arc, time::Duration};

use anyhow::Result;
use bot::{
    Data,
    command::{self, market::market_command},
    config::Config,
    delivery::DirectMessageDelivery,
};
use market::{
    AlertScanner, AlertSettings, NewsApiClient, NewsFetcher, NewsProvider, PreferenceDefaults,
    PreferenceStore, PriceClient, QuoteFetcher, Registry, TimeApiLocator, TimezoneLocator,
    news::Unconfigured, status::evaluate_all,
};
use poise::{Framework, FrameworkOptions};
use serenity::all::{ActivityData, ClientBuilder, FullEvent, GatewayIntents, Interaction};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod alerts;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();

    let registry = Arc::new(Registry::from_env()?);
    info!(venues = registry.len(), "market registry loaded");

    let price_client = PriceClient::from_env(config.request_timeout)?;
    let quotes = Arc::new(QuoteFetcher::new(
        Arc::new(price_client),
        config.request_timeout,
    ));

    let news_provider: Arc<dyn NewsProvider> = match NewsApiClient::from_env(config.request_timeout)
    {
        Ok(client) => Arc::new(client),
        Err(e) => {
            warn!(error = %e, "news provider not configured, news disabled");
            Arc::new(Unconfigured)
        }
    };
    let news = Arc::new(NewsFetcher::new(news_provider, config.request_timeout));

    let locator: Arc<dyn TimezoneLocator> =
        Arc::new(TimeApiLocator::from_env(config.request_timeout)?);

    let preferences = Arc::new(PreferenceStore::new(PreferenceDefaults {
        notifications_enabled: config.default_notifications_enabled,
        tracked_venues: registry.names().into_iter().collect(),
        news_keywords: config.default_news_keywords.clone(),
    }));

    let intents = GatewayIntents::non_privileged();
    let commands = vec![market_command()];

    let framework = Framework::builder()
        .options(FrameworkOptions {
            event_handler: |serenity_ctx, event, _framework_ctx, data| {
                Box::pin(async move {
                    if let FullEvent::InteractionCreate { interaction, .. } = event
                        && let Interaction::Component(component) = interaction
                        && let Err(e) =
                            command::market::handle_component(serenity_ctx, data, component).await
                    {
                        warn!(error = ?e, "component interaction failed");
                    }
                    Ok(())
                })
            },
            commands,
            ..Default::default()
        })
        .setup({
            let registry = Arc::clone(&registry);
            let quotes = Arc::clone(&quotes);
            let preferences = Arc::clone(&preferences);
            let news = Arc::clone(&news);
            let locator = Arc::clone(&locator);
            let config = config.clone();

            move |ctx, ready, framework| {
                let registry = Arc::clone(&registry);
                let quotes = Arc::clone(&quotes);
                let preferences = Arc::clone(&preferences);
                let news = Arc::clone(&news);
                let locator = Arc::clone(&locator);
                let config = config.clone();
                let default_timezone = config.default_timezone.clone();

                Box::pin(async move {
                    info!(
                        "{} [{}] connected successfully!",
                        ready.user.name, ready.user.id
                    );

                    poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                    let ctx_clone = ctx.clone();
                    let activity_registry = Arc::clone(&registry);
                    tokio::spawn(async move {
                        let mut show_version = true;
                        let mut tick = tokio::time::interval(Duration::from_secs(30));

                        loop {
                            tick.tick().await;

                            let text = if show_version {
                                if config.version.starts_with('v') {
                                    config.version.clone()
                                } else {
                                    format!("Version - {}", config.version)
                                }
                            } else {
                                let records = evaluate_all(
                                    activity_registry.venues(),
                                    chrono::Utc::now(),
                                    None,
                                );
                                let open = records.iter().filter(|r| r.is_open).count();
                                format!("Markets open - {}/{}", open, records.len())
                            };

                            ctx_clone.set_activity(Some(ActivityData::custom(text)));
                            show_version = !show_version;
                        }
                    });

                    Ok(Data {
                        registry,
                        quotes,
                        news,
                        preferences,
                        locator,
                        default_timezone,
                    })
                })
            }
        })
        .build();

    let mut client = ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .expect("Err creating client");

    let scanner = Arc::new(AlertScanner::new(
        Arc::clone(&registry),
        Arc::clone(&quotes),
        Arc::clone(&preferences),
        Arc::new(DirectMessageDelivery::new(client.http.clone())),
        AlertSettings {
            threshold_percent: config.alert_threshold_percent,
            ..Default::default()
        },
    ));

    let sched = JobScheduler::new()
        .await
        .expect("failed to create job scheduler");

    info!(
        interval_secs = config.alert_interval.as_secs(),
        threshold = config.alert_threshold_percent,
        "scheduling market alerts"
    );

    sched
        .add(Job::new_repeated_async(
            config.alert_interval,
            move |_uuid, _l| {
                let scanner = Arc::clone(&scanner);

                Box::pin(async move {
                    alerts::run_alerts(scanner).await;
                })
            },
        )?)
        .await?;

    sched.shutdown_on_ctrl_c();
    sched.start().await?;

    tokio::spawn(async move {
        if let Err(why) = client.start().await {
            error!("Client error: {why:?}");
        }
    });

    shutdown_signal().await;

    info!("Shutdown complete.");
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::{
            select,
            signal::unix::{SignalKind, signal},
        };
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
        select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv()  => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
