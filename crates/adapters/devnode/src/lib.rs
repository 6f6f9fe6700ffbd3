//! # smarthome-adapter-devnode
//!
//! Device-node integration standing in for the OS layer in front of the
//! dispatch core.
//!
//! ## Provided nodes
//!
//! | Minor | Node | Kind |
//! |-------|------|------|
//! | 0 | `<dev_root>/light_livingroom` | light |
//! | 1 | `<dev_root>/light_bedroom` | light |
//! | 2 | `<dev_root>/socket_kitchen` | socket |
//! | 3 | `<dev_root>/sensor_temp_main` | sensor (read-only) |
//!
//! ## Responsibilities
//! - Assign minor numbers and node paths in catalog order ([`NodeTable`])
//! - Resolve external handles (minor numbers, paths) to device identities
//! - Track open descriptors and their handles ([`FileTable`])
//! - Copy payloads to and from caller memory ([`UserBuffer`]), surfacing
//!   faults as `EFAULT`
//! - Map every failure to an errno ([`NodeError::errno`])
//!
//! ## Dependency rule
//!
//! Depends on `smarthome-app` (dispatch, registry) and `smarthome-domain` only.

mod buffer;
mod error;
mod file_table;
mod node_table;

pub use buffer::UserBuffer;
pub use error::{NodeError, errno};
pub use file_table::{Fd, FileTable};
pub use node_table::{Node, NodeTable};
