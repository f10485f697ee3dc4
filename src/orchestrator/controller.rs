//! View lifecycle controller.
//!
//! Owns the `ViewStateManager` for an interactive session and emits events for
//! presentation layers.

use super::ViewStateManager;
use crate::model::CatalogEvent;
use anyhow::Result;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Select(String),
    Back,
    Search(String),
    Create(String),
    Quit,
}

fn publish(manager: &ViewStateManager, event_tx: &UnboundedSender<CatalogEvent>) {
    let _ = event_tx.send(CatalogEvent::Snapshot(Box::new(manager.state().clone())));
}

/// Apply UI commands and settled requests until the UI quits, publishing a snapshot
/// after every change.
pub(crate) async fn run_controller(
    mut manager: ViewStateManager,
    event_tx: UnboundedSender<CatalogEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    manager.start();
    publish(&manager, &event_tx);

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Select(id)) => manager.select(&id),
                    Some(UiCommand::Back) => manager.back(),
                    Some(UiCommand::Search(term)) => manager.search(&term),
                    Some(UiCommand::Create(url)) => {
                        if !manager.create_from_url(&url) {
                            let _ = event_tx.send(CatalogEvent::Info(
                                "Enter a URL to add a document.".into(),
                            ));
                            continue;
                        }
                    }
                    // Requests still in flight are abandoned; nothing reads their outcomes.
                    Some(UiCommand::Quit) | None => break,
                }
                publish(&manager, &event_tx);
            }
            // `next` only awaits the channel, so losing this branch drops nothing.
            applied = manager.next() => {
                let Some(applied) = applied else { break };
                if let Some(url) = applied.created {
                    let _ = event_tx.send(CatalogEvent::Created { url });
                }
                if applied.changed {
                    publish(&manager, &event_tx);
                }
            }
        }
    }

    Ok(())
}
