//! Caller memory: the far side of every read and write payload.

use smarthome_app::error::TransferFault;

/// Memory owned by the caller of a read or write.
///
/// Either copy may fault, in which case nothing is transferred.
pub trait UserBuffer {
    /// Copy `data` to the start of the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`TransferFault`] when the buffer cannot take `data`.
    fn copy_to_user(&mut self, data: &[u8]) -> Result<(), TransferFault>;

    /// Copy the first `count` bytes out of the buffer.
    ///
    /// # Errors
    ///
    /// Returns [`TransferFault`] when fewer than `count` bytes are readable.
    fn copy_from_user(&self, count: usize) -> Result<Vec<u8>, TransferFault>;
}

impl UserBuffer for [u8] {
    fn copy_to_user(&mut self, data: &[u8]) -> Result<(), TransferFault> {
        let target = self.get_mut(..data.len()).ok_or(TransferFault)?;
        target.copy_from_slice(data);
        Ok(())
    }

    fn copy_from_user(&self, count: usize) -> Result<Vec<u8>, TransferFault> {
        self.get(..count).map(<[u8]>::to_vec).ok_or(TransferFault)
    }
}

impl UserBuffer for Vec<u8> {
    fn copy_to_user(&mut self, data: &[u8]) -> Result<(), TransferFault> {
        self.as_mut_slice().copy_to_user(data)
    }

    fn copy_from_user(&self, count: usize) -> Result<Vec<u8>, TransferFault> {
        self.as_slice().copy_from_user(count)
    }
}
