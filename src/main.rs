use std::sync::Arc;

use chrono::{Local, Utc};
use futures::StreamExt;
use tokio::io::{AsyncWriteExt, Stdout};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::codec::FramedRead;
use tracing::{info, warn};

use courtbook::api::{BookingApi, HttpBookingApi};
use courtbook::command::{CommandCodec, HELP};
use courtbook::config::Config;
use courtbook::notify::NotifyHub;
use courtbook::view::{BookingView, Reply};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    courtbook::observability::init(config.metrics_port);

    let api = Arc::new(HttpBookingApi::new(&config.api_url, config.http_timeout)?);
    let session = config.session();

    let mut rate = config.rate;
    match api.court(config.court_id).await {
        Ok(court) => {
            if !court.is_available {
                warn!("court {} ({}) is marked unavailable", court.id, court.court_name);
            }
            info!("court: {} at {}/hour", court.court_name, court.hourly_rate);
            rate = court.hourly_rate;
        }
        Err(e) => warn!("court lookup failed, using configured rate {rate}: {e}"),
    }

    info!("courtbook starting");
    info!("  api: {}", config.api_url);
    info!("  court_id: {}", config.court_id);
    info!(
        "  user: {}",
        session.user().map_or("anonymous".to_string(), |u| u.email.clone())
    );
    info!("  metrics: {}", config.metrics_port.map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics")));

    let hub = Arc::new(NotifyHub::new());
    let mut events = hub.subscribe();

    let today = Utc::now().with_timezone(&Local).date_naive();
    let mut view = BookingView::new(
        api as Arc<dyn BookingApi>,
        session,
        hub,
        Local,
        today,
        rate,
        config.court_id,
    );
    view.show_day(today).await;

    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm =
                tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    .expect("failed to register SIGTERM handler");
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    tokio::pin!(shutdown);

    // Replies and status changes share this one writer so lines never interleave
    let mut stdout = tokio::io::stdout();
    let mut commands = FramedRead::new(tokio::io::stdin(), CommandCodec::new());
    write_line(&mut stdout, HELP).await?;

    loop {
        tokio::select! {
            frame = commands.next() => {
                let cmd = match frame {
                    Some(Ok(Ok(cmd))) => cmd,
                    Some(Ok(Err(e))) => {
                        write_line(&mut stdout, &format!("error: {e}")).await?;
                        continue;
                    }
                    Some(Err(e)) => {
                        warn!("stdin read failed: {e}");
                        break;
                    }
                    None => break,
                };
                let text = match view.handle(cmd).await {
                    Ok(Reply::Text(text)) => text,
                    Ok(Reply::Quit) => break,
                    Err(e) => format!("error: {e}"),
                };
                write_line(&mut stdout, &text).await?;
            }
            event = events.recv() => match event {
                Ok(event) => write_line(&mut stdout, &format!("  {event}")).await?,
                Err(RecvError::Lagged(missed)) => warn!("{missed} status updates dropped"),
                // the view owns the hub, so the channel outlives this loop
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    let summary = view.tracker().summary();
    if summary.pending > 0 || summary.failed > 0 {
        warn!("exiting with unsettled reservations: {summary}");
    }
    info!("courtbook stopped");
    Ok(())
}

async fn write_line(out: &mut Stdout, text: &str) -> std::io::Result<()> {
    out.write_all(text.as_bytes()).await?;
    out.write_all(b"\n").await?;
    out.flush().await
}
