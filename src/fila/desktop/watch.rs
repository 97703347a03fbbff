/*!
 * Desktop Watching
 *
 * Watches are registered with the host's watch command under a random id;
 * raw events then arrive on `watcher://raw-event/<id>`.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use super::plugin::{DesktopIpc, EventHandler, ListenerId};
use crate::core::limits::{
    DESKTOP_UNWATCH_COMMAND, DESKTOP_WATCH_CHANNEL_PREFIX, DESKTOP_WATCH_COMMAND,
    DESKTOP_WATCH_DELAY_MS,
};
use crate::fila::address::Fila;
use crate::fila::registry::Registry;
use crate::fila::types::{FilaError, FilaResult};
use crate::fila::watch::{EventSink, StorageEvent, Unwatch};

/// Event as emitted by the host watcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWatchEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Translate a raw host event
///
/// Events whose payload is not a path string, and unknown kinds, produce
/// nothing.
pub fn translate(raw: &serde_json::Value, registry: &Arc<Registry>) -> Option<StorageEvent> {
    let event: RawWatchEvent = serde_json::from_value(raw.clone()).ok()?;
    let path = event.payload.as_str()?;
    let fila = Fila::from_path(Arc::clone(registry), path);

    match event.kind.as_str() {
        "NoticeWrite" | "Write" | "Create" | "Rename" => Some(StorageEvent::modify(fila)),
        "NoticeRemove" | "Remove" => Some(StorageEvent::delete(fila)),
        _ => None,
    }
}

/// Host-side watch registration
pub(crate) struct DesktopWatch {
    ipc: Arc<dyn DesktopIpc>,
    id: u32,
    listener: Option<ListenerId>,
}

impl DesktopWatch {
    pub(crate) async fn register(
        ipc: Arc<dyn DesktopIpc>,
        fila: &Fila,
        recursive: bool,
        sink: EventSink,
    ) -> FilaResult<Self> {
        let id: u32 = rand::random();
        let path = fila.path();
        let args = json!({
            "id": id,
            "paths": [path],
            "options": { "recursive": recursive, "delayMs": DESKTOP_WATCH_DELAY_MS },
        });
        ipc.invoke(DESKTOP_WATCH_COMMAND, args)
            .await
            .map_err(|e| FilaError::Watch(format!("{}: {}", path, e)))?;

        let registry = Arc::clone(fila.registry());
        let handler: EventHandler = Arc::new(move |raw: serde_json::Value| {
            if let Some(event) = translate(&raw, &registry) {
                sink.emit(event);
            }
        });

        let channel = format!("{}{}", DESKTOP_WATCH_CHANNEL_PREFIX, id);
        let listener = match ipc.listen(&channel, handler).await {
            Ok(listener) => listener,
            Err(e) => {
                if let Err(unwatch) = ipc.invoke(DESKTOP_UNWATCH_COMMAND, json!({ "id": id })).await
                {
                    warn!(id, error = %unwatch, "failed to roll back desktop watch");
                }
                return Err(FilaError::Watch(format!("{}: {}", channel, e)));
            }
        };

        debug!(id, path = %path, recursive, "desktop watch registered");
        Ok(Self {
            ipc,
            id,
            listener: Some(listener),
        })
    }
}

#[async_trait]
impl Unwatch for DesktopWatch {
    async fn unwatch(&mut self) -> FilaResult<()> {
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };

        let unwatched = self
            .ipc
            .invoke(DESKTOP_UNWATCH_COMMAND, json!({ "id": self.id }))
            .await;
        self.ipc
            .unlisten(listener)
            .await
            .map_err(|e| FilaError::Watch(e.to_string()))?;
        unwatched.map_err(|e| FilaError::Watch(e.to_string()))?;

        debug!(id = self.id, "desktop watch removed");
        Ok(())
    }
}
