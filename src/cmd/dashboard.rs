//! Live dashboards (`tableside kitchen`, `tableside waiter`).

use anyhow::{Context, Result};
use tableside::config::{TOKEN_ENV, TablesideConfig};
use tableside::feed::{BillFeed, FeedReducer, FeedSnapshot, OrderFeed, spawn_feed};
use tableside::server::shutdown_signal;
use tableside::session::{FeedKind, Session, SessionToken, redact_token};
use tableside::ui::dashboard::{kitchen_json, render_kitchen, render_waiter, waiter_json};
use tableside::ui::{Dashboard, UiMode};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn cmd_kitchen(config: &TablesideConfig, ui: UiMode) -> Result<()> {
    let statuses = config.kitchen_statuses();
    run_dashboard::<OrderFeed, _>(config, FeedKind::Orders, ui, |snapshot| {
        (
            render_kitchen(snapshot, &statuses),
            kitchen_json(snapshot, &statuses),
        )
    })
    .await
}

pub async fn cmd_waiter(config: &TablesideConfig, table: Option<u32>, ui: UiMode) -> Result<()> {
    run_dashboard::<BillFeed, _>(config, FeedKind::Bills, ui, |snapshot| {
        (render_waiter(snapshot, table), waiter_json(snapshot, table))
    })
    .await
}

fn signed_in_session(config: &TablesideConfig) -> Result<Session> {
    let token = config.token().with_context(|| {
        format!("No session token: pass --token or set {}", TOKEN_ENV)
    })?;
    let session = config.session()?;
    session.sign_in(SessionToken::new(token));
    Ok(session)
}

/// Follow one feed and redraw on every snapshot until Ctrl+C.
async fn run_dashboard<R, F>(
    config: &TablesideConfig,
    kind: FeedKind,
    ui: UiMode,
    render: F,
) -> Result<()>
where
    R: FeedReducer,
    F: Fn(&FeedSnapshot<R::Entity>) -> (String, serde_json::Value),
{
    let session = signed_in_session(config)?;
    if let Some(url) = session.feed_url(kind) {
        info!(feed = %kind, url = %redact_token(&url), "Starting dashboard");
    }

    let cancel = CancellationToken::new();
    let expiry = session.spawn_expiry_watch(cancel.clone());
    let feed = spawn_feed::<R>(
        session.watch_feed_url(kind),
        config.connection_options(),
        cancel.child_token(),
    );
    let mut snapshots = feed.subscribe();
    let dashboard = Dashboard::new(ui);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let (text, value) = render(&snapshot);
        dashboard.draw(&text, &value).context("Failed to draw dashboard")?;

        tokio::select! {
            _ = &mut shutdown => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!(feed = %kind, "Stopping dashboard");
    cancel.cancel();
    feed.shutdown().await;
    if let Err(e) = expiry.await {
        warn!(error = %e, "Expiry watch ended abnormally");
    }
    session.sign_out();
    Ok(())
}
