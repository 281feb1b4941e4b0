use crate::open_engine;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::sync::{broadcast, mpsc};
use tourline_engine::{AsyncTourWatcher, TourEvent, WatchEvent};

pub fn run(roots: &[PathBuf], json: bool) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(watch(roots, json))
}

async fn watch(roots: &[PathBuf], json: bool) -> Result<()> {
    let mut engine = open_engine(roots);
    let mut events = engine.subscribe();

    let watcher = AsyncTourWatcher::new(
        engine.roots().to_vec(),
        engine.config().locations.clone(),
        None,
    );
    let (tx, mut rx) = mpsc::channel(16);
    let handle = watcher.start(tx).await?;

    eprintln!(
        "Watching {} tours under {} roots (Ctrl-C to stop)",
        engine.tours().len(),
        engine.roots().len()
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            change = rx.recv() => {
                let Some(change) = change else { break };
                match &change {
                    WatchEvent::Changed(paths) => {
                        tracing::debug!(paths = paths.len(), "tour sources changed");
                    }
                    WatchEvent::Rescan => tracing::debug!("rescan requested by poll"),
                }
                engine.discover();
                drain(&mut events, json)?;
            }
        }
    }

    handle.stop().await;
    Ok(())
}

fn drain(events: &mut broadcast::Receiver<TourEvent>, json: bool) -> Result<()> {
    loop {
        match events.try_recv() {
            Ok(event) => println!("{}", render(&event, json)?),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "event output fell behind");
            }
            Err(_) => return Ok(()),
        }
    }
}

fn render(event: &TourEvent, json: bool) -> Result<String> {
    if json {
        return Ok(serde_json::to_string(event)?);
    }
    Ok(match event {
        TourEvent::ToursChanged { count, .. } => format!("tours changed: {} found", count),
        TourEvent::TourUpdated { tour_id } => format!("tour updated: {}", tour_id),
        TourEvent::SessionEnded { tour_id, reason } => {
            format!("session ended: {} ({:?})", tour_id, reason)
        }
        other => format!("{:?}", other),
    })
}
