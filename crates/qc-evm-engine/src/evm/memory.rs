//! # EVM Memory
//!
//! Byte-addressable, word-aligned scratch memory of a frame. Callers charge
//! expansion gas with [`memory_expansion_cost`] before touching a region.

use crate::errors::VmError;
use crate::evm::gas::memory_gas_cost;

/// Hard cap on frame memory; the gas schedule makes it unreachable in
/// practice.
pub const MAX_MEMORY_SIZE: usize = 16 * 1024 * 1024;

/// Bytes per machine word.
pub const WORD_SIZE: usize = 32;

/// Frame memory. Always a whole number of words long.
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Empty memory.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Size in bytes (what `MSIZE` reports).
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True before the first touch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Size in words.
    #[must_use]
    pub fn word_size(&self) -> usize {
        self.data.len() / WORD_SIZE
    }

    /// Ensures memory covers `size` bytes, rounding up to a word boundary.
    ///
    /// # Errors
    ///
    /// Returns `MemoryLimitExceeded` past [`MAX_MEMORY_SIZE`].
    pub fn expand(&mut self, size: usize) -> Result<(), VmError> {
        if size <= self.data.len() {
            return Ok(());
        }
        if size > MAX_MEMORY_SIZE {
            return Err(VmError::MemoryLimitExceeded {
                requested: size,
                max: MAX_MEMORY_SIZE,
            });
        }
        self.data.resize(size.div_ceil(WORD_SIZE) * WORD_SIZE, 0);
        Ok(())
    }

    /// Reads a 32-byte word. The region must already be expanded.
    #[must_use]
    pub fn read_word(&self, offset: usize) -> [u8; 32] {
        let mut word = [0u8; 32];
        word.copy_from_slice(&self.data[offset..offset + 32]);
        word
    }

    /// Copies a region out. The region must already be expanded.
    #[must_use]
    pub fn read_bytes(&self, offset: usize, size: usize) -> Vec<u8> {
        match size {
            0 => Vec::new(),
            _ => self.data[offset..offset + size].to_vec(),
        }
    }

    /// Writes a single byte, expanding if necessary.
    ///
    /// # Errors
    ///
    /// Propagates [`Memory::expand`] failures.
    pub fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), VmError> {
        self.expand(offset + 1)?;
        self.data[offset] = value;
        Ok(())
    }

    /// Writes a 32-byte word, expanding if necessary.
    ///
    /// # Errors
    ///
    /// Propagates [`Memory::expand`] failures.
    pub fn write_word(&mut self, offset: usize, value: &[u8; 32]) -> Result<(), VmError> {
        self.expand(offset + 32)?;
        self.data[offset..offset + 32].copy_from_slice(value);
        Ok(())
    }

    /// Writes `size` bytes of `source` starting at `source_offset`,
    /// zero-filling whatever lies past the end of `source`.
    ///
    /// # Errors
    ///
    /// Propagates [`Memory::expand`] failures.
    pub fn write_padded(
        &mut self,
        offset: usize,
        source: &[u8],
        source_offset: usize,
        size: usize,
    ) -> Result<(), VmError> {
        if size == 0 {
            return Ok(());
        }
        self.expand(offset + size)?;

        let target = &mut self.data[offset..offset + size];
        let available = source.len().saturating_sub(source_offset).min(size);
        if available > 0 {
            target[..available]
                .copy_from_slice(&source[source_offset..source_offset + available]);
        }
        target[available..].fill(0);
        Ok(())
    }

    /// Copies bytes within memory (MCOPY - EIP-5656). Overlap is allowed.
    ///
    /// # Errors
    ///
    /// Propagates [`Memory::expand`] failures.
    pub fn copy(&mut self, dest: usize, src: usize, size: usize) -> Result<(), VmError> {
        if size == 0 {
            return Ok(());
        }
        self.expand(dest.max(src) + size)?;
        self.data.copy_within(src..src + size, dest);
        Ok(())
    }

    /// Whole contents.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

/// Incremental gas cost of growing memory from `old_word_size` words to
/// `new_word_size` words.
#[must_use]
pub fn memory_expansion_cost(old_word_size: usize, new_word_size: usize) -> u64 {
    if new_word_size <= old_word_size {
        return 0;
    }
    memory_gas_cost(new_word_size) - memory_gas_cost(old_word_size)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_rounds_to_words() {
        let mut mem = Memory::new();
        assert!(mem.is_empty());

        mem.expand(10).unwrap();
        assert_eq!(mem.len(), 32);
        assert_eq!(mem.word_size(), 1);

        mem.expand(64).unwrap();
        assert_eq!(mem.len(), 64);

        // Shrinking is a no-op
        mem.expand(1).unwrap();
        assert_eq!(mem.len(), 64);
    }

    #[test]
    fn test_word_at_unaligned_offset() {
        let mut mem = Memory::new();
        mem.write_word(3, &[0x11; 32]).unwrap();
        assert_eq!(mem.len(), 64);
        assert_eq!(mem.read_word(3), [0x11; 32]);
        assert_eq!(mem.read_bytes(0, 3), vec![0, 0, 0]);
    }

    #[test]
    fn test_write_byte() {
        let mut mem = Memory::new();
        mem.write_byte(10, 0x42).unwrap();
        assert_eq!(mem.as_slice()[10], 0x42);
        assert_eq!(mem.len(), 32);
    }

    #[test]
    fn test_write_padded() {
        let mut mem = Memory::new();
        mem.write_word(0, &[0xff; 32]).unwrap();

        // Source shorter than the requested region
        mem.write_padded(0, &[1, 2, 3], 1, 4).unwrap();
        assert_eq!(mem.read_bytes(0, 5), vec![2, 3, 0, 0, 0xff]);

        // Source offset past the end writes zeros only
        mem.write_padded(0, &[1, 2, 3], 10, 2).unwrap();
        assert_eq!(mem.read_bytes(0, 2), vec![0, 0]);
    }

    #[test]
    fn test_copy_handles_overlap() {
        let mut mem = Memory::new();
        mem.write_padded(0, &[1, 2, 3, 4, 5], 0, 5).unwrap();
        mem.copy(2, 0, 4).unwrap();
        assert_eq!(mem.read_bytes(0, 6), vec![1, 2, 1, 2, 3, 4]);
    }

    #[test]
    fn test_memory_expansion_cost() {
        // 3 per word plus words^2 / 512
        assert_eq!(memory_expansion_cost(0, 1), 3);
        assert_eq!(memory_expansion_cost(0, 32), 98);
        assert_eq!(memory_expansion_cost(32, 32), 0);
        assert_eq!(memory_expansion_cost(32, 16), 0);
    }

    #[test]
    fn test_cap() {
        let mut mem = Memory::new();
        assert_eq!(
            mem.expand(MAX_MEMORY_SIZE + 1),
            Err(VmError::MemoryLimitExceeded {
                requested: MAX_MEMORY_SIZE + 1,
                max: MAX_MEMORY_SIZE,
            })
        );
        assert!(mem.is_empty());
    }
}
