//! Structures to keep the process alive until some event occurs

use futures::{
    channel::mpsc::{channel, Receiver, Sender},
    prelude::*,
    select,
};
use log::{debug, error, warn};
use std::{
    fmt,
    fmt::{Error as FmtError, Formatter},
};
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};

/// Reason why the heart stopped beating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeathReason {
    /// Internal kill signal has been sent
    Killed(String),
    /// SIGINT or other process-external cause
    Terminated,
}

impl fmt::Display for DeathReason {
    fn fmt(&self, w: &mut Formatter<'_>) -> Result<(), FmtError> {
        match self {
            DeathReason::Killed(reason) => write!(w, "Killed ({})", reason),
            DeathReason::Terminated => write!(w, "Terminated due to external signal"),
        }
    }
}

/// Lifecycle management struct that can be used to keep the application alive
pub struct Heart {
    /// Receiver for kill requests sent by heart stones
    rx: Receiver<String>,
}

impl Heart {
    /// Creates a new heart and linked stone
    pub fn new() -> (Self, HeartStone) {
        let (tx, rx) = channel(2);
        (Self { rx }, HeartStone { remote: tx })
    }

    /// Creates a new heart and discards the linked stone, it only dies on external signals
    pub fn without_heart_stone() -> Self {
        Heart::new().0
    }

    /// Future that waits until the heart dies for the returned reason
    pub async fn death(&mut self) -> DeathReason {
        debug!("Heart starts beating");

        let mut termination = Heart::termination_signal().boxed().fuse();

        select! {
            reason = self.rx.next() => match reason {
                Some(reason) => DeathReason::Killed(reason),
                // Every stone has been dropped, only external signals remain
                None => termination.await,
            },
            reason = termination => reason,
        }
    }

    async fn termination_signal() -> DeathReason {
        let sigterm = async {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(error) => {
                    warn!("Unable to listen for SIGTERM: {}", error);
                    future::pending::<()>().await;
                }
            }
        };

        let ctrl_c = async {
            if let Err(error) = ctrl_c().await {
                warn!("Unable to listen for SIGINT: {}", error);
                future::pending::<()>().await;
            }
        };

        future::select(sigterm.boxed(), ctrl_c.boxed()).await;

        DeathReason::Terminated
    }
}

/// Remote controller for the heart
#[derive(Clone)]
pub struct HeartStone {
    remote: Sender<String>,
}

impl HeartStone {
    /// Kill the associated heart
    pub async fn kill(&mut self, reason: String) {
        if let Err(e) = self.remote.send(reason).await {
            error!("Failed to interact with Heart: {}", e);
        }
    }
}
