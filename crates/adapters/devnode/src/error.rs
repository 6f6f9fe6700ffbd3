//! Device-node error types and their errno mapping.

use std::path::PathBuf;

use smarthome_app::error::DispatchError;

use crate::file_table::Fd;

/// Errno values reported to callers of the node layer.
pub mod errno {
    pub const EPERM: i32 = 1;
    pub const ENOENT: i32 = 2;
    pub const ENXIO: i32 = 6;
    pub const EBADF: i32 = 9;
    pub const EFAULT: i32 = 14;
    pub const EINVAL: i32 = 22;
    pub const ERESTARTSYS: i32 = 512;
}

/// Errors specific to the device-node layer.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// No node is registered at this path.
    #[error("no device node at {}", .0.display())]
    NoSuchNode(PathBuf),

    /// No node carries this minor number.
    #[error("no device node with minor {0}")]
    NoSuchMinor(u32),

    /// The descriptor is not open.
    #[error("bad file descriptor {0}")]
    BadDescriptor(Fd),

    /// The dispatch layer rejected the operation.
    #[error("device operation failed")]
    Dispatch(#[from] DispatchError),
}

impl NodeError {
    /// The errno a caller of the node would see.
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::NoSuchNode(_) => errno::ENOENT,
            Self::NoSuchMinor(_) => errno::ENXIO,
            Self::BadDescriptor(_) => errno::EBADF,
            Self::Dispatch(err) => match err {
                DispatchError::NotFound(_) => errno::ENOENT,
                DispatchError::PermissionDenied { .. } => errno::EPERM,
                DispatchError::InvalidArgument { .. } => errno::EINVAL,
                DispatchError::Interrupted { .. } => errno::ERESTARTSYS,
                DispatchError::IoFault { .. } => errno::EFAULT,
            },
        }
    }
}
