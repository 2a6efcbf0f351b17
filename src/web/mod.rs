pub(crate) mod error;
mod handlers;
mod router;

use anyhow::Result;
use axum::extract::State;
use axum::response::sse::{Event, Sse};
use std::convert::Infallible;
use tokio_stream::Stream;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::info;

use crate::store::SharedStore;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: SharedStore,
    pub(crate) log_tx: tokio::sync::broadcast::Sender<String>,
}

pub async fn serve(
    store: SharedStore,
    log_tx: tokio::sync::broadcast::Sender<String>,
    port: u16,
) -> Result<()> {
    let state = AppState { store, log_tx };
    let app = router::build_router(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Mission Control running at http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Live log stream for the dashboard's log panel.
async fn sse_logs_endpoint(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.log_tx.subscribe();
    let stream = BroadcastStream::new(receiver).map(|msg| match msg {
        Ok(line) => Ok(Event::default().data(line)),
        Err(_) => Ok(Event::default().data("Log stream lagged")),
    });

    Sse::new(stream)
}
