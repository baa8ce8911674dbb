//! # EVM Stack
//!
//! 1024-deep word stack of a frame.

use crate::domain::value_objects::U256;
use crate::errors::VmError;

/// Maximum stack depth.
pub const MAX_STACK_SIZE: usize = 1024;

/// LIFO stack of 256-bit words.
#[derive(Clone, Debug, Default)]
pub struct Stack {
    data: Vec<U256>,
}

impl Stack {
    /// Creates a new empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Vec::with_capacity(64),
        }
    }

    /// Number of items on the stack.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the stack is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Pushes a word.
    ///
    /// # Errors
    ///
    /// Returns `StackOverflow` if the stack is full.
    pub fn push(&mut self, value: U256) -> Result<(), VmError> {
        if self.data.len() >= MAX_STACK_SIZE {
            return Err(VmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Pushes 1 for `true`, 0 for `false`.
    ///
    /// # Errors
    ///
    /// Returns `StackOverflow` if the stack is full.
    pub fn push_bool(&mut self, value: bool) -> Result<(), VmError> {
        self.push(if value { U256::one() } else { U256::zero() })
    }

    /// Pops the top word.
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if the stack is empty.
    pub fn pop(&mut self) -> Result<U256, VmError> {
        self.data.pop().ok_or(VmError::StackUnderflow)
    }

    /// Pops `N` words, top first.
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` (leaving the stack untouched) if fewer than
    /// `N` words are available.
    pub fn pop_n<const N: usize>(&mut self) -> Result<[U256; N], VmError> {
        if self.data.len() < N {
            return Err(VmError::StackUnderflow);
        }
        let mut out = [U256::zero(); N];
        for slot in &mut out {
            *slot = self.pop()?;
        }
        Ok(out)
    }

    /// Peeks at a word at `depth` (0 = top).
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if the index is out of bounds.
    pub fn peek_at(&self, depth: usize) -> Result<U256, VmError> {
        if depth >= self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        Ok(self.data[self.data.len() - 1 - depth])
    }

    /// SWAPn: swaps the top with the item `n` below it (1-indexed).
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if not enough elements.
    pub fn swap(&mut self, n: usize) -> Result<(), VmError> {
        if n == 0 || n >= self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        let len = self.data.len();
        self.data.swap(len - 1, len - 1 - n);
        Ok(())
    }

    /// DUPn: pushes a copy of the item at `depth` (0 = top).
    ///
    /// # Errors
    ///
    /// Returns `StackUnderflow` if not enough elements, `StackOverflow` if full.
    pub fn dup(&mut self, depth: usize) -> Result<(), VmError> {
        let value = self.peek_at(depth)?;
        self.push(value)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(values: &[u64]) -> Stack {
        let mut stack = Stack::new();
        for v in values {
            stack.push(U256::from(*v)).unwrap();
        }
        stack
    }

    fn top(stack: &Stack, depth: usize) -> u64 {
        stack.peek_at(depth).unwrap().low_u64()
    }

    #[test]
    fn test_lifo_order() {
        let mut stack = filled(&[7, 8]);
        assert_eq!(stack.pop(), Ok(U256::from(8)));
        assert_eq!(stack.pop(), Ok(U256::from(7)));
        assert_eq!(stack.pop(), Err(VmError::StackUnderflow));
    }

    #[test]
    fn test_pop_n_is_all_or_nothing() {
        let mut stack = filled(&[1, 2, 3]);
        let [first, second] = stack.pop_n::<2>().unwrap();
        assert_eq!((first.low_u64(), second.low_u64()), (3, 2));

        assert_eq!(stack.pop_n::<2>(), Err(VmError::StackUnderflow));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_swap_depths() {
        // bottom .. top: 10 20 30 40
        let mut stack = filled(&[10, 20, 30, 40]);
        stack.swap(3).unwrap();
        assert_eq!((top(&stack, 0), top(&stack, 3)), (10, 40));
        assert_eq!(stack.swap(4), Err(VmError::StackUnderflow));
        assert_eq!(stack.swap(0), Err(VmError::StackUnderflow));
    }

    #[test]
    fn test_dup_copies_without_removing() {
        let mut stack = filled(&[5, 6]);
        stack.dup(1).unwrap();
        assert_eq!(
            (0..3).map(|d| top(&stack, d)).collect::<Vec<_>>(),
            vec![5, 6, 5]
        );
        assert_eq!(stack.dup(3), Err(VmError::StackUnderflow));
    }

    #[test]
    fn test_depth_limit() {
        let mut stack = Stack::new();
        while stack.len() < MAX_STACK_SIZE {
            stack.push_bool(true).unwrap();
        }
        assert_eq!(stack.push(U256::zero()), Err(VmError::StackOverflow));
        assert_eq!(stack.dup(0), Err(VmError::StackOverflow));
        assert_eq!(stack.len(), MAX_STACK_SIZE);
    }
}
