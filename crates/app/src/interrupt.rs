//! Interruption of pending lock waits.
//!
//! An [`InterruptSource`] plays the role of the signal delivered to a
//! blocked caller: every [`Interrupt`] token taken from it before
//! [`InterruptSource::interrupt`] is called resolves, which makes a pending
//! device lock wait fail with `Interrupted`. Tokens taken afterwards are not
//! affected.

use tokio::sync::watch;

/// Raises interruptions for the tokens it hands out.
#[derive(Debug)]
pub struct InterruptSource {
    sender: watch::Sender<()>,
}

impl Default for InterruptSource {
    fn default() -> Self {
        let (sender, _) = watch::channel(());
        Self { sender }
    }
}

impl InterruptSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A token for one calling context.
    #[must_use]
    pub fn token(&self) -> Interrupt {
        Interrupt {
            receiver: Some(self.sender.subscribe()),
        }
    }

    /// Interrupt every outstanding token.
    pub fn interrupt(&self) {
        self.sender.send_replace(());
    }
}

/// Cancellation token passed to operations that wait on a device lock.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    receiver: Option<watch::Receiver<()>>,
}

impl Interrupt {
    /// A token that is never interrupted.
    #[must_use]
    pub fn never() -> Self {
        Self::default()
    }

    /// Resolve once the source interrupts. Pends forever for [`Interrupt::never`]
    /// or when the source is gone.
    ///
    /// Adapters race their own waits against this to make them cancellable.
    pub async fn interrupted(&self) {
        if let Some(receiver) = &self.receiver {
            let mut receiver = receiver.clone();
            if receiver.changed().await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await;
    }
}
