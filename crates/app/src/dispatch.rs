//! Dispatch layer: `open` / `read` / `write` / `close` over the registry.
//!
//! Every state access happens while holding the target device's lock.
//! Operations on different devices never contend; operations on the same
//! device are fully serialized. Lock waits race the caller's [`Interrupt`]
//! token (and the optional lock timeout) and fail with
//! [`DispatchError::Interrupted`] without touching state when they lose.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::MutexGuard;

use smarthome_domain::codec;
use smarthome_domain::drift::drift;
use smarthome_domain::state::DeviceState;

use crate::error::{DispatchError, TransferFault};
use crate::interrupt::Interrupt;
use crate::ports::DriftSource;
use crate::registry::{DeviceEntry, DeviceIndex, Registry};

/// An open session on one device.
///
/// The read cursor is local to the handle: two handles on the same device
/// read independently.
#[derive(Debug, PartialEq, Eq)]
pub struct Handle {
    device: DeviceIndex,
    cursor: usize,
}

impl Handle {
    #[must_use]
    pub fn device(&self) -> DeviceIndex {
        self.device
    }

    /// Byte offset of the next read.
    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

/// Routes operations to registry entries.
pub struct Dispatcher<S> {
    registry: Arc<Registry>,
    source: S,
    lock_timeout: Option<Duration>,
}

impl<S: DriftSource> Dispatcher<S> {
    /// Create a dispatcher over `registry`, drawing sensor drift from `source`.
    pub fn new(registry: Arc<Registry>, source: S) -> Self {
        Self {
            registry,
            source,
            lock_timeout: None,
        }
    }

    /// Give up lock waits after `timeout`, reporting them as interrupted.
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Open a session on the device named `identity`, with its cursor at 0.
    ///
    /// Any number of handles may be open on the same device.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NotFound`] for an unknown identity.
    pub fn open(&self, identity: &str) -> Result<Handle, DispatchError> {
        let (device, entry) = self.registry.lookup(identity)?;
        tracing::info!(device = entry.identity(), minor = device.get(), "device opened");
        Ok(Handle { device, cursor: 0 })
    }

    /// Close a session. Device state is not affected.
    pub fn close(&self, handle: Handle) {
        let entry = self.registry.get(handle.device);
        tracing::info!(device = entry.identity(), "device closed");
    }

    /// Read up to `max_len` bytes of the device's current text.
    ///
    /// Returns an empty buffer at end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Interrupted`] when the lock wait is interrupted.
    pub async fn read(
        &self,
        handle: &mut Handle,
        max_len: usize,
        interrupt: &Interrupt,
    ) -> Result<Vec<u8>, DispatchError> {
        let mut out = Vec::new();
        self.read_with(handle, max_len, interrupt, |chunk| {
            out.extend_from_slice(chunk);
            Ok(())
        })
        .await?;
        Ok(out)
    }

    /// Read up to `max_len` bytes and hand them to `deliver` while the
    /// device lock is held.
    ///
    /// Reading a sensor first advances its drift simulation, so sensor reads
    /// are not idempotent. When the cursor is at or past the end of the text
    /// nothing is delivered and `0` is returned; the cursor is never reset.
    /// The cursor only advances once `deliver` accepts the bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Interrupted`] when the lock wait is
    /// interrupted and [`DispatchError::IoFault`] when `deliver` fails.
    pub async fn read_with<F>(
        &self,
        handle: &mut Handle,
        max_len: usize,
        interrupt: &Interrupt,
        deliver: F,
    ) -> Result<usize, DispatchError>
    where
        F: FnOnce(&[u8]) -> Result<(), TransferFault>,
    {
        let entry = self.registry.get(handle.device);
        let mut state = self.acquire(entry, interrupt).await?;

        if let DeviceState::Sensor(value) = &mut *state {
            let step = drift(value, self.source.next_delta());
            if step.recovered() {
                tracing::warn!(
                    device = entry.identity(),
                    stored = value.as_str(),
                    "could not parse sensor value, resetting to default"
                );
            }
            tracing::debug!(device = entry.identity(), next = %step.next, "sensor drifted");
            *value = step.value();
        }

        let text = codec::encode(&state);
        if handle.cursor >= text.len() {
            return Ok(0);
        }
        let count = max_len.min(text.len() - handle.cursor);
        let chunk = &text.as_bytes()[handle.cursor..handle.cursor + count];

        deliver(chunk).map_err(|source| {
            tracing::error!(device = entry.identity(), "failed to copy data to caller");
            DispatchError::IoFault {
                identity: entry.identity(),
                source,
            }
        })?;

        handle.cursor += count;
        tracing::info!(device = entry.identity(), bytes = count, text, "device read");
        Ok(count)
    }

    /// Apply a switch command.
    ///
    /// The payload is truncated to [`codec::MAX_COMMAND_LEN`] bytes and one
    /// trailing newline is ignored. Returns the number of bytes accepted,
    /// i.e. the truncated length.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::PermissionDenied`] for read-only devices, checked
    ///   before locking
    /// - [`DispatchError::Interrupted`] when the lock wait is interrupted
    /// - [`DispatchError::InvalidArgument`] for anything but `on`, `off`,
    ///   `1`, `0`; the state is left unchanged
    pub async fn write(
        &self,
        handle: &Handle,
        payload: &[u8],
        interrupt: &Interrupt,
    ) -> Result<usize, DispatchError> {
        self.write_with(handle, payload.len(), interrupt, |count| {
            Ok(payload[..count].to_vec())
        })
        .await
    }

    /// Apply a switch command of `len` bytes fetched by `fetch`.
    ///
    /// `fetch` is called with the truncated length once the device lock is
    /// held and must return that many bytes. A failing `fetch` leaves the
    /// state unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`Dispatcher::write`], plus [`DispatchError::IoFault`] when
    /// `fetch` fails.
    pub async fn write_with<F>(
        &self,
        handle: &Handle,
        len: usize,
        interrupt: &Interrupt,
        fetch: F,
    ) -> Result<usize, DispatchError>
    where
        F: FnOnce(usize) -> Result<Vec<u8>, TransferFault>,
    {
        let entry = self.registry.get(handle.device);
        if !entry.kind().is_writable() {
            tracing::warn!(
                device = entry.identity(),
                kind = %entry.kind(),
                "write attempted on read-only device"
            );
            return Err(DispatchError::PermissionDenied {
                identity: entry.identity(),
            });
        }

        let count = len.min(codec::MAX_COMMAND_LEN);
        let mut state = self.acquire(entry, interrupt).await?;

        let command = fetch(count).map_err(|source| {
            tracing::error!(device = entry.identity(), "failed to copy data from caller");
            DispatchError::IoFault {
                identity: entry.identity(),
                source,
            }
        })?;

        let switch = codec::decode_write_command(&command).map_err(|source| {
            tracing::warn!(device = entry.identity(), payload = %source.payload, "invalid state written");
            DispatchError::InvalidArgument {
                identity: entry.identity(),
                source,
            }
        })?;

        *state = DeviceState::Switch(switch.into());
        tracing::info!(device = entry.identity(), state = codec::encode(&state), "device state set");
        Ok(count)
    }

    async fn acquire<'a>(
        &self,
        entry: &'a DeviceEntry,
        interrupt: &Interrupt,
    ) -> Result<MutexGuard<'a, DeviceState>, DispatchError> {
        let lock = async {
            match self.lock_timeout {
                Some(limit) => tokio::time::timeout(limit, entry.state.lock()).await.ok(),
                None => Some(entry.state.lock().await),
            }
        };

        let identity = entry.identity();
        tokio::select! {
            biased;
            guard = lock => guard.ok_or_else(|| {
                tracing::warn!(device = identity, "timed out waiting for device lock");
                DispatchError::Interrupted { identity }
            }),
            () = interrupt.interrupted() => {
                tracing::debug!(device = identity, "lock wait interrupted");
                Err(DispatchError::Interrupted { identity })
            }
        }
    }
}
