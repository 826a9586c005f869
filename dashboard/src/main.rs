use common::init_logger;
use common::logger::LogFormat;
use dashboard::{
    AppConfig, DashboardContext,
    panels::{AdminPanel, AnalyticsPanel, ExecutivePanel},
};
use feed::ConnectionState;
use tokio::sync::watch;
use tracing::{info, warn};

/// Logs every feed state transition until the context shuts down.
fn watch_feed_state(mut rx: watch::Receiver<ConnectionState>) {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let state = *rx.borrow_and_update();
            match state {
                ConnectionState::Error => warn!(%state, "live feed state changed"),
                _ => info!(%state, "live feed state changed"),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("dashboard", LogFormat::from_env());

    info!("Starting supply-chain dashboard...");

    let cfg = AppConfig::from_env();
    info!(?cfg, "configuration loaded");

    let ctx = DashboardContext::from_config(cfg)?;
    watch_feed_state(ctx.feed().watch_state());

    // Subscriptions registered before connecting are sent on the handshake.
    let mut analytics = AnalyticsPanel::mount(&ctx).await;
    let executive = ExecutivePanel::mount(&ctx).await?;
    let admin = AdminPanel::mount(&ctx).await?;

    let state = ctx.init().await;
    if state == ConnectionState::Error {
        warn!("live feed unavailable; panels keep running on REST and seed data");
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    admin.unmount().await;
    executive.unmount().await;
    analytics.unmount(&ctx).await;
    ctx.shutdown().await;

    Ok(())
}
