//! Bounds-checked access to the guest's linear memory.
//!
//! A view borrows the memory's current backing bytes from the store context, so it
//! cannot outlive the host call that created it. Growth may move the backing buffer;
//! every read therefore starts from the `Memory` handle again.

use crate::error::BridgeError;
use wasmtime::{AsContext, AsContextMut, Memory};

/// Size of one WebAssembly page.
pub const WASM_PAGE_SIZE: usize = 64 * 1024;

/// Read-only view over the current bytes of a linear memory.
#[derive(Clone, Copy)]
pub struct MemoryView<'a> {
    bytes: &'a [u8],
}

impl<'a> MemoryView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Derive a view from the memory's current state.
    pub fn of<T: 'static>(memory: &Memory, store: &'a impl AsContext<Data = T>) -> Self {
        Self::new(memory.data(store))
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// The bytes at `[ptr, ptr + len)`, validated before any access.
    pub fn slice(&self, ptr: i32, len: i32) -> Result<&'a [u8], BridgeError> {
        let range = checked_range(ptr, len, self.bytes.len())?;
        Ok(&self.bytes[range])
    }

    /// Decode `[ptr, ptr + len)` as UTF-8. Malformed sequences are an error, never replaced.
    pub fn read_utf8(&self, ptr: i32, len: i32) -> Result<&'a str, BridgeError> {
        let bytes = self.slice(ptr, len)?;
        std::str::from_utf8(bytes).map_err(|e| BridgeError::Decode {
            ptr: ptr as i64,
            valid_up_to: e.valid_up_to(),
        })
    }
}

/// Mutable view, used to copy host data into guest memory.
pub struct MemoryViewMut<'a> {
    bytes: &'a mut [u8],
}

impl<'a> MemoryViewMut<'a> {
    pub fn new(bytes: &'a mut [u8]) -> Self {
        Self { bytes }
    }

    pub fn of<T: 'static>(memory: &Memory, store: &'a mut impl AsContextMut<Data = T>) -> Self {
        Self::new(memory.data_mut(store))
    }

    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }

    /// Copy `data` to `ptr`. Nothing is written unless the whole range fits.
    pub fn write(&mut self, ptr: i32, data: &[u8]) -> Result<(), BridgeError> {
        let len = i32::try_from(data.len()).map_err(|_| BridgeError::OutOfBounds {
            ptr: ptr as i64,
            len: data.len() as i64,
            byte_len: self.bytes.len(),
        })?;
        let range = checked_range(ptr, len, self.bytes.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }
}

fn checked_range(ptr: i32, len: i32, byte_len: usize) -> Result<std::ops::Range<usize>, BridgeError> {
    let out_of_bounds = || BridgeError::OutOfBounds {
        ptr: ptr as i64,
        len: len as i64,
        byte_len,
    };
    if ptr < 0 || len < 0 {
        return Err(out_of_bounds());
    }
    let start = ptr as usize;
    let end = start.checked_add(len as usize).ok_or_else(out_of_bounds)?;
    if end > byte_len {
        return Err(out_of_bounds());
    }
    Ok(start..end)
}

/// Memory bounds used when the host has to supply `env.memory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub initial_pages: u32,
    pub maximum_pages: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        // 16 MiB initial / 32 MiB maximum.
        Self {
            initial_pages: 256,
            maximum_pages: 512,
        }
    }
}

impl MemoryConfig {
    pub fn maximum_bytes(&self) -> usize {
        self.maximum_pages as usize * WASM_PAGE_SIZE
    }
}

/// Grow `memory` by `delta_pages`, returning the previous size in pages.
///
/// Existing bytes keep their offsets. Growing past the declared maximum (or the store's
/// limit) fails instead of truncating.
pub fn grow<T: 'static>(
    mut store: impl AsContextMut<Data = T>,
    memory: &Memory,
    delta_pages: u64,
) -> Result<u64, BridgeError> {
    let current_pages = memory.size(&store);
    memory
        .grow(&mut store, delta_pages)
        .map_err(|e| BridgeError::GrowFailed {
            current_pages,
            delta_pages,
            message: format!("{e:#}"),
        })
}
