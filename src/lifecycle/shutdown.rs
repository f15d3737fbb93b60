//! Stop signal for the HTTP listener.

use tokio::sync::broadcast;

/// One-shot stop signal fanned out to the listener and any background task.
///
/// `HttpServer::run` takes a receiver from [`Shutdown::subscribe`] and stops
/// accepting once it fires, draining in-flight requests first. The binary
/// builds it with [`Shutdown::with_ctrl_c`] so Ctrl+C fires it; tests call
/// [`Shutdown::trigger`] directly. Subscribe before triggering: a receiver
/// taken afterwards never sees the signal.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Like [`Shutdown::new`], plus a task that triggers on Ctrl+C.
    pub fn with_ctrl_c() -> Self {
        let shutdown = Self::new();
        let on_signal = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Ctrl+C handler unavailable, stop the server another way");
                return;
            }
            let listeners = on_signal.trigger();
            tracing::info!(listeners, "Ctrl+C received, stopping the listener");
        });
        shutdown
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Fire the signal; returns how many receivers were listening.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut server = shutdown.subscribe();
        let mut worker = shutdown.clone().subscribe();

        assert_eq!(shutdown.trigger(), 2);
        assert!(server.recv().await.is_ok());
        assert!(worker.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_trigger_without_listeners_is_harmless() {
        let shutdown = Shutdown::default();
        assert_eq!(shutdown.trigger(), 0);

        let mut late = shutdown.subscribe();
        assert!(late.try_recv().is_err());
    }
}
