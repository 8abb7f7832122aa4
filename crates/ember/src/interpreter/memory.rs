use crate::U256;
use core::cmp::min;

/// The linear byte memory of one call frame. Always sized to a multiple of
/// 32; the quadratic expansion cost is charged by the `memory_resize!` macro
/// before any growth happens here.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(4 * 1024),
        }
    }

    /// Current size in bytes (a multiple of 32).
    pub fn effective_len(&self) -> usize {
        self.data.len()
    }

    /// Grows to `new_size` bytes, zero-filling. `new_size` must already be
    /// word-aligned.
    pub fn resize(&mut self, new_size: usize) {
        debug_assert!(new_size % 32 == 0);
        self.data.resize(new_size, 0);
    }

    pub fn get_slice(&self, offset: usize, size: usize) -> &[u8] {
        &self.data[offset..offset + size]
    }

    /// Writes `value` at `offset`. The region must already be in range.
    pub fn set(&mut self, offset: usize, value: &[u8]) {
        if !value.is_empty() {
            self.data[offset..offset + value.len()].copy_from_slice(value);
        }
    }

    pub fn set_u256(&mut self, offset: usize, value: U256) {
        self.set(offset, &value.to_be_bytes::<32>());
    }

    pub fn set_byte(&mut self, offset: usize, byte: u8) {
        self.data[offset] = byte;
    }

    /// Copies `len` bytes from `data[data_offset..]` into memory at
    /// `memory_offset`, zero-filling where the source runs out. The memory
    /// region must already be in range.
    pub fn set_data(&mut self, memory_offset: usize, data_offset: usize, len: usize, data: &[u8]) {
        if data_offset >= data.len() {
            self.data[memory_offset..memory_offset + len].fill(0);
            return;
        }
        let have = min(data.len() - data_offset, len);
        self.data[memory_offset..memory_offset + have]
            .copy_from_slice(&data[data_offset..data_offset + have]);
        self.data[memory_offset + have..memory_offset + len].fill(0);
    }
}

/// Rounds up to the next 32-byte boundary.
#[inline]
pub fn next_multiple_of_32(size: usize) -> Option<usize> {
    size.checked_add(31).map(|n| n & !31)
}
