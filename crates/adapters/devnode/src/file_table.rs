//! Open-file table: descriptors, their handles and payload transfers.
//!
//! Each descriptor owns one dispatch [`Handle`] behind its own lock, which
//! serializes operations on that descriptor the way a file position lock
//! does. Waiting on that lock is interruptible just like the device lock
//! wait behind it. The table lock is only held to look descriptors up,
//! never across a wait.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError};

use tokio::sync::{Mutex, MutexGuard};

use smarthome_app::dispatch::{Dispatcher, Handle};
use smarthome_app::error::DispatchError;
use smarthome_app::interrupt::Interrupt;
use smarthome_app::ports::DriftSource;

use crate::buffer::UserBuffer;
use crate::error::NodeError;
use crate::node_table::NodeTable;

/// First descriptor handed out; 0–2 are left to the standard streams.
const FIRST_FD: u32 = 3;

/// An open-file descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fd(u32);

impl fmt::Display for Fd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One open descriptor; the handle is taken out on release.
struct OpenFile {
    identity: &'static str,
    handle: Mutex<Option<Handle>>,
}

impl OpenFile {
    /// Wait for the descriptor, giving up when `interrupt` fires first.
    async fn lock(
        &self,
        interrupt: &Interrupt,
    ) -> Result<MutexGuard<'_, Option<Handle>>, NodeError> {
        tokio::select! {
            biased;
            guard = self.handle.lock() => Ok(guard),
            () = interrupt.interrupted() => {
                tracing::debug!(device = self.identity, "descriptor wait interrupted");
                Err(DispatchError::Interrupted {
                    identity: self.identity,
                }
                .into())
            }
        }
    }
}

/// Descriptors opened on the device nodes.
pub struct FileTable<S> {
    dispatcher: Arc<Dispatcher<S>>,
    nodes: Arc<NodeTable>,
    files: std::sync::Mutex<HashMap<Fd, Arc<OpenFile>>>,
    next_fd: AtomicU32,
}

impl<S: DriftSource> FileTable<S> {
    pub fn new(dispatcher: Arc<Dispatcher<S>>, nodes: Arc<NodeTable>) -> Self {
        Self {
            dispatcher,
            nodes,
            files: std::sync::Mutex::new(HashMap::new()),
            next_fd: AtomicU32::new(FIRST_FD),
        }
    }

    #[must_use]
    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    /// Open the node at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::NoSuchNode`] when no node is registered there.
    pub fn open(&self, path: impl AsRef<Path>) -> Result<Fd, NodeError> {
        let minor = self.nodes.resolve_path(path)?;
        self.open_minor(minor)
    }

    /// Open the node with the given minor number.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::NoSuchMinor`] for an unassigned minor.
    pub fn open_minor(&self, minor: u32) -> Result<Fd, NodeError> {
        let identity = self.nodes.resolve_identity(minor)?;
        let handle = self.dispatcher.open(identity)?;
        let fd = Fd(self.next_fd.fetch_add(1, Ordering::Relaxed));
        let file = OpenFile {
            identity,
            handle: Mutex::new(Some(handle)),
        };
        self.lock_files().insert(fd, Arc::new(file));
        tracing::debug!(%fd, minor, device = identity, "descriptor opened");
        Ok(fd)
    }

    /// Read at most `count` bytes into `buf`, returning how many were copied.
    /// `0` means end of stream.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::BadDescriptor`] for a closed descriptor, or the
    /// dispatch error: `Interrupted` when either the descriptor or the
    /// device wait is interrupted, or `IoFault` when `buf` cannot take the
    /// bytes (the position is then unchanged).
    pub async fn read<B>(
        &self,
        fd: Fd,
        buf: &mut B,
        count: usize,
        interrupt: &Interrupt,
    ) -> Result<usize, NodeError>
    where
        B: UserBuffer + ?Sized,
    {
        let file = self.file(fd)?;
        let mut handle = file.lock(interrupt).await?;
        let handle = handle.as_mut().ok_or(NodeError::BadDescriptor(fd))?;
        let copied = self
            .dispatcher
            .read_with(handle, count, interrupt, |chunk| buf.copy_to_user(chunk))
            .await?;
        Ok(copied)
    }

    /// Write the first `count` bytes of `buf`, returning how many were accepted.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::BadDescriptor`] for a closed descriptor, or the
    /// dispatch error: `PermissionDenied`, `Interrupted`, `InvalidArgument`,
    /// or `IoFault` when `buf` cannot supply the bytes. No failure changes
    /// the device state.
    pub async fn write<B>(
        &self,
        fd: Fd,
        buf: &B,
        count: usize,
        interrupt: &Interrupt,
    ) -> Result<usize, NodeError>
    where
        B: UserBuffer + ?Sized,
    {
        let file = self.file(fd)?;
        let handle = file.lock(interrupt).await?;
        let handle = handle.as_ref().ok_or(NodeError::BadDescriptor(fd))?;
        let accepted = self
            .dispatcher
            .write_with(handle, count, interrupt, |count| buf.copy_from_user(count))
            .await?;
        Ok(accepted)
    }

    /// Close a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::BadDescriptor`] when `fd` is not open.
    pub async fn release(&self, fd: Fd) -> Result<(), NodeError> {
        let file = self
            .lock_files()
            .remove(&fd)
            .ok_or(NodeError::BadDescriptor(fd))?;
        let handle = file.handle.lock().await.take();
        if let Some(handle) = handle {
            self.dispatcher.close(handle);
        }
        tracing::debug!(%fd, "descriptor released");
        Ok(())
    }

    /// Number of open descriptors.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.lock_files().len()
    }

    fn file(&self, fd: Fd) -> Result<Arc<OpenFile>, NodeError> {
        self.lock_files()
            .get(&fd)
            .cloned()
            .ok_or(NodeError::BadDescriptor(fd))
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, HashMap<Fd, Arc<OpenFile>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use smarthome_app::error::{DispatchError, TransferFault};
    use smarthome_app::interrupt::InterruptSource;
    use smarthome_app::registry::Registry;
    use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

    use super::*;
    use crate::errno;

    struct FixedDrift(i32);

    impl DriftSource for FixedDrift {
        fn next_delta(&self) -> i32 {
            self.0
        }
    }

    /// Caller memory at an unmapped address.
    struct Unmapped;

    impl UserBuffer for Unmapped {
        fn copy_to_user(&mut self, _data: &[u8]) -> Result<(), TransferFault> {
            Err(TransferFault)
        }

        fn copy_from_user(&self, _count: usize) -> Result<Vec<u8>, TransferFault> {
            Err(TransferFault)
        }
    }

    /// Caller memory whose copies block until released, then fault.
    struct Stalled {
        entered: UnboundedSender<()>,
        release: std::sync::Mutex<mpsc::Receiver<()>>,
    }

    impl Stalled {
        fn new() -> (Self, UnboundedReceiver<()>, mpsc::Sender<()>) {
            let (entered, entered_rx) = unbounded_channel();
            let (release_tx, release) = mpsc::channel();
            let buffer = Self {
                entered,
                release: std::sync::Mutex::new(release),
            };
            (buffer, entered_rx, release_tx)
        }

        fn stall(&self) -> TransferFault {
            let _ = self.entered.send(());
            let _ = self
                .release
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .recv();
            TransferFault
        }
    }

    impl UserBuffer for Stalled {
        fn copy_to_user(&mut self, _data: &[u8]) -> Result<(), TransferFault> {
            Err(self.stall())
        }

        fn copy_from_user(&self, _count: usize) -> Result<Vec<u8>, TransferFault> {
            Err(self.stall())
        }
    }

    fn table(delta: i32) -> FileTable<FixedDrift> {
        let registry = Arc::new(Registry::new());
        let nodes = Arc::new(NodeTable::register(&registry, "/dev"));
        let dispatcher = Arc::new(Dispatcher::new(registry, FixedDrift(delta)));
        FileTable::new(dispatcher, nodes)
    }

    async fn cat(table: &FileTable<FixedDrift>, path: &str) -> String {
        let fd = table.open(path).unwrap();
        let mut out = Vec::new();
        let mut buf = [0u8; 2];
        loop {
            let n = table
                .read(fd, &mut buf[..], 2, &Interrupt::never())
                .await
                .unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        table.release(fd).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn should_read_node_in_chunks_until_eof() {
        let table = table(0);
        assert_eq!(cat(&table, "/dev/light_bedroom").await, "off");
    }

    #[tokio::test]
    async fn should_write_then_read_back() {
        let table = table(0);
        let fd = table.open("/dev/light_bedroom").unwrap();
        let accepted = table
            .write(fd, &b"1\n"[..], 2, &Interrupt::never())
            .await
            .unwrap();
        assert_eq!(accepted, 2);
        table.release(fd).await.unwrap();
        assert_eq!(cat(&table, "/dev/light_bedroom").await, "on");
    }

    #[tokio::test]
    async fn should_hand_out_distinct_descriptors() {
        let table = table(0);
        let a = table.open("socket_kitchen").unwrap();
        let b = table.open("socket_kitchen").unwrap();
        assert_ne!(a, b);
        assert_eq!(table.open_count(), 2);
        table.release(a).await.unwrap();
        table.release(b).await.unwrap();
        assert_eq!(table.open_count(), 0);
    }

    #[tokio::test]
    async fn should_open_by_minor() {
        let table = table(0);
        let fd = table.open_minor(3).unwrap();
        let mut buf = [0u8; 16];
        let n = table
            .read(fd, &mut buf[..], 16, &Interrupt::never())
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"22.5");
        assert_eq!(table.open_minor(7).unwrap_err().errno(), errno::ENXIO);
    }

    #[tokio::test]
    async fn should_fail_open_of_unknown_node() {
        let table = table(0);
        let err = table.open("/dev/garage_door").unwrap_err();
        assert_eq!(err.errno(), errno::ENOENT);
    }

    #[tokio::test]
    async fn should_report_efault_and_keep_position_on_bad_read_buffer() {
        let table = table(0);
        let fd = table.open("light_livingroom").unwrap();
        let err = table
            .read(fd, &mut Unmapped, 16, &Interrupt::never())
            .await
            .unwrap_err();
        assert_eq!(err.errno(), errno::EFAULT);

        let mut buf = [0u8; 16];
        let n = table
            .read(fd, &mut buf[..], 16, &Interrupt::never())
            .await
            .unwrap();
        assert_eq!(&buf[..n], b"off");
    }

    #[tokio::test]
    async fn should_fault_when_count_exceeds_buffer() {
        let table = table(0);
        let fd = table.open("light_livingroom").unwrap();
        let mut small = [0u8; 1];
        let err = table
            .read(fd, &mut small[..], 16, &Interrupt::never())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            NodeError::Dispatch(DispatchError::IoFault { .. })
        ));
    }

    #[tokio::test]
    async fn should_report_efault_without_mutation_on_bad_write_buffer() {
        let table = table(0);
        let fd = table.open("socket_kitchen").unwrap();
        let err = table
            .write(fd, &Unmapped, 2, &Interrupt::never())
            .await
            .unwrap_err();
        assert_eq!(err.errno(), errno::EFAULT);
        assert_eq!(cat(&table, "socket_kitchen").await, "off");
    }

    #[tokio::test]
    async fn should_report_eperm_before_touching_sensor_buffer() {
        let table = table(0);
        let fd = table.open("sensor_temp_main").unwrap();
        let err = table
            .write(fd, &Unmapped, 2, &Interrupt::never())
            .await
            .unwrap_err();
        assert_eq!(err.errno(), errno::EPERM);
    }

    #[tokio::test]
    async fn should_report_einval_for_invalid_command() {
        let table = table(0);
        let fd = table.open("light_bedroom").unwrap();
        let err = table
            .write(fd, &b"dim"[..], 3, &Interrupt::never())
            .await
            .unwrap_err();
        assert_eq!(err.errno(), errno::EINVAL);
    }

    #[tokio::test]
    async fn should_reject_released_descriptor() {
        let table = table(0);
        let fd = table.open("light_bedroom").unwrap();
        table.release(fd).await.unwrap();

        let mut buf = [0u8; 4];
        let err = table
            .read(fd, &mut buf[..], 4, &Interrupt::never())
            .await
            .unwrap_err();
        assert_eq!(err.errno(), errno::EBADF);
        assert!(matches!(
            table.release(fd).await,
            Err(NodeError::BadDescriptor(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn should_interrupt_wait_on_busy_descriptor() {
        let table = Arc::new(table(0));
        let fd = table.open("socket_kitchen").unwrap();

        let (stalled, mut entered, release) = Stalled::new();
        let writer = tokio::spawn({
            let table = Arc::clone(&table);
            async move { table.write(fd, &stalled, 3, &Interrupt::never()).await }
        });
        entered.recv().await.unwrap();

        let source = InterruptSource::new();
        let token = source.token();
        let reader = tokio::spawn({
            let table = Arc::clone(&table);
            async move {
                let mut buf = [0u8; 8];
                table.read(fd, &mut buf[..], 8, &token).await
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        source.interrupt();

        let read = tokio::time::timeout(Duration::from_millis(500), reader)
            .await
            .expect("read should give up once interrupted")
            .unwrap();
        assert_eq!(read.unwrap_err().errno(), errno::ERESTARTSYS);

        release.send(()).unwrap();
        let write = writer.await.unwrap();
        assert_eq!(write.unwrap_err().errno(), errno::EFAULT);

        table.release(fd).await.unwrap();
        assert_eq!(cat(&table, "socket_kitchen").await, "off");
    }
}
