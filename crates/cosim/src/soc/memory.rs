//! Guest Physical Memory.
//!
//! This module provides the memory image the DUT executes from. It provides:
//! 1. **Accessor Trait:** `GuestMemory`, the guest-to-host translation difftest uses to seed
//!    the reference model.
//! 2. **Storage:** `PhysMem`, a contiguous byte buffer based at a fixed guest-physical address.
//! 3. **Loading:** Bounds-checked image placement and word access for DUT implementations.

/// Guest-physical to host translation.
///
/// Difftest only needs this once, during initialization, to copy the loaded image.
pub trait GuestMemory {
    /// Guest-physical address of the first byte.
    fn base(&self) -> u64;

    /// Returns the host view of guest memory from `paddr` to the end of the region.
    ///
    /// Returns `None` if `paddr` is not backed by this memory.
    fn guest_to_host(&self, paddr: u64) -> Option<&[u8]>;
}

/// Contiguous guest physical memory.
#[derive(Debug, Clone)]
pub struct PhysMem {
    base: u64,
    data: Vec<u8>,
}

impl PhysMem {
    /// Creates a zero-filled memory of `size` bytes based at `base`.
    pub fn new(base: u64, size: usize) -> Self {
        Self {
            base,
            data: vec![0; size],
        }
    }

    /// Returns the size of the memory in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the memory has zero size.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Translates a guest-physical range to a buffer offset.
    fn offset(&self, paddr: u64, len: usize) -> Option<usize> {
        let off = usize::try_from(paddr.checked_sub(self.base)?).ok()?;
        let end = off.checked_add(len)?;
        (end <= self.data.len()).then_some(off)
    }

    /// Copies `image` into memory at `paddr`.
    ///
    /// # Returns
    ///
    /// `false` (and leaves memory untouched) if the image does not fit.
    pub fn load(&mut self, paddr: u64, image: &[u8]) -> bool {
        match self.offset(paddr, image.len()) {
            Some(off) => {
                self.data[off..off + image.len()].copy_from_slice(image);
                true
            }
            None => false,
        }
    }

    /// Reads a little-endian 32-bit word, or `None` if out of range.
    pub fn read_u32(&self, paddr: u64) -> Option<u32> {
        let off = self.offset(paddr, 4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[off..off + 4]);
        Some(u32::from_le_bytes(bytes))
    }

    /// Reads a little-endian 64-bit word, or `None` if out of range.
    pub fn read_u64(&self, paddr: u64) -> Option<u64> {
        let off = self.offset(paddr, 8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[off..off + 8]);
        Some(u64::from_le_bytes(bytes))
    }

    /// Writes a little-endian 64-bit word; returns `false` if out of range.
    pub fn write_u64(&mut self, paddr: u64, val: u64) -> bool {
        match self.offset(paddr, 8) {
            Some(off) => {
                self.data[off..off + 8].copy_from_slice(&val.to_le_bytes());
                true
            }
            None => false,
        }
    }
}

impl GuestMemory for PhysMem {
    fn base(&self) -> u64 {
        self.base
    }

    fn guest_to_host(&self, paddr: u64) -> Option<&[u8]> {
        let off = self.offset(paddr, 0)?;
        Some(&self.data[off..])
    }
}
