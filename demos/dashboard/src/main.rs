//! Front-desk terminal dashboard.
//!
//! Connects to a salon backend and its push feed, keeps the today and
//! pending-payments views live, and redraws whenever the engine
//! publishes a new snapshot.
//!
//! # Running
//!
//! ```bash
//! FRONTDESK_BACKEND_URL=http://localhost:8080 \
//! FRONTDESK_FEED_URL=http://localhost:8080/events \
//! FRONTDESK_SALON_ID=salon-1 \
//! cargo run -p dashboard
//! ```
//!
//! Optional variables: `FRONTDESK_BRANCH_ID`, `FRONTDESK_OPERATOR_NAME`,
//! `FRONTDESK_UTC_OFFSET_MINUTES`, and the tuning knobs documented on
//! `frontdesk_sync::Config`. A `.env` file in the working directory is
//! read first. Stop with Ctrl-C.

#![allow(missing_docs)]
#![allow(clippy::expect_used)] // Examples can use expect

use frontdesk_channel::EventChannel;
use frontdesk_client::{Actor, ActorRole};
use frontdesk_core::{SlotTarget, ViewId};
use frontdesk_sync::{Config, Notice, SyncEngine, SyncHandle, SyncSnapshot};
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file (if present)
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::from_env()?;
    info!(backend = %config.backend.base_url, feed = %config.channel.feed_url, "starting dashboard");

    let backend = Arc::new(config.backend.client());
    let channel = EventChannel::spawn(config.channel_config());
    let operator = Actor::new(
        std::env::var("FRONTDESK_OPERATOR_NAME").unwrap_or_else(|_| "Front Desk".to_string()),
        ActorRole::Receptionist,
    );
    let handle = SyncEngine::new(backend, channel, operator)
        .with_options(config.engine_options())
        .spawn();

    handle.open_view(ViewId::Today).await?;
    handle.open_view(ViewId::PendingPayments).await?;
    handle.open_view(ViewId::Statistics).await?;

    // Notices are transient; log them as they pass by.
    let mut notices = handle.notices();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            match notice {
                Notice::CommandAccepted {
                    command, message, ..
                } => info!(%command, message = message.as_deref().unwrap_or(""), "accepted"),
                Notice::CommandFailed {
                    command,
                    kind,
                    message,
                    ..
                } => warn!(%command, %kind, message, "command failed"),
                Notice::ConnectionChanged { health } => info!(?health, "channel health"),
                Notice::RefreshFailed { view, kind, .. } => {
                    warn!(%view, %kind, "view refresh failed");
                }
            }
        }
    });

    let mut snapshots = handle.watch();
    let ctrl_c = signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                render(&handle, &snapshot).await;
            }
            _ = &mut ctrl_c => {
                info!("shutting down");
                break;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

async fn render(handle: &SyncHandle, snapshot: &SyncSnapshot) {
    println!("\n=== Front Desk | {} | {:?} ===", handle.today(), snapshot.health);

    if let Some(today) = snapshot.view(ViewId::Today) {
        let marker = if today.stale { " (refreshing)" } else { "" };
        println!("Today: {} appointments{marker}", today.total_elements);
        for record in &today.records {
            println!(
                "  {}  {:<20} {:<12} payment {}",
                record.scheduled_at.format("%H:%M"),
                record.customer_name,
                record.status.to_string(),
                record.payment_status
            );
        }
    }

    if let Some(pending) = snapshot.view(ViewId::PendingPayments) {
        println!(
            "Open payments: {} (page {}/{})",
            pending.total_elements,
            pending.cursor.page + 1,
            pending.total_pages.max(1)
        );
    }

    if let Some(stats) = &snapshot.statistics {
        println!(
            "Totals: {} appointments, {} customers, {} today, income {}",
            stats.total_appointments, stats.unique_customers, stats.today_count, stats.daily_income
        );
    }

    match handle
        .available_slots(handle.today(), &SlotTarget::Unassigned, 30)
        .await
    {
        Ok(slots) => println!("Open 30-minute slots today: {}", slots.len()),
        Err(error) => warn!(%error, "slot lookup failed"),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dashboard=info,frontdesk_sync=info,frontdesk_channel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
