//! # EVM Interpreter
//!
//! Runs the bytecode of a single frame. Storage writes go straight into the
//! pending overlay; the processor checkpoints it beforehand and rolls back
//! on revert or halt. Opcodes that would open a nested frame halt with
//! `UnsupportedOpcode`, so return data is always empty.

use crate::adapters::pending::PendingState;
use crate::domain::entities::{EvmVersion, ExecutionContext, Log};
use crate::domain::services::keccak256;
use crate::domain::value_objects::{Address, Bytes, Hash, StorageKey, StorageValue, U256};
use crate::errors::VmError;
use crate::evm::gas::{self, costs, OPCODE_GAS};
use crate::evm::memory::{memory_expansion_cost, Memory, WORD_SIZE};
use crate::evm::opcodes::{self, *};
use crate::evm::stack::Stack;
use crate::evm::transient::TransientStorage;
use crate::ports::outbound::{AccessList, StateView};
use primitive_types::U512;
use std::collections::HashSet;

/// Largest memory offset or size accepted before the access is treated as
/// running out of gas.
const MAX_MEMORY_OPERAND: u64 = u32::MAX as u64;

/// How a frame ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// STOP, RETURN, or running off the end of the code.
    Return(Bytes),
    /// REVERT with its data.
    Revert(Bytes),
    /// Exceptional halt.
    Halt(VmError),
}

/// Frame result handed back to the processor.
#[derive(Clone, Debug)]
pub struct FrameResult {
    /// How the frame ended.
    pub outcome: FrameOutcome,
    /// Gas not consumed (zero after a halt).
    pub gas_left: u64,
    /// SSTORE refund counter.
    pub refund: i64,
    /// Logs in emission order.
    pub logs: Vec<Log>,
}

/// EVM interpreter for one frame.
pub struct Interpreter<'a, 'b, A: AccessList> {
    context: &'a ExecutionContext,
    code: &'a [u8],
    version: EvmVersion,
    pc: usize,
    stack: Stack,
    memory: Memory,
    gas_remaining: u64,
    refund: i64,
    logs: Vec<Log>,
    state: &'a mut PendingState<'b>,
    access_list: &'a mut A,
    transient: &'a mut TransientStorage,
    jump_dests: HashSet<usize>,
}

impl<'a, 'b, A: AccessList> Interpreter<'a, 'b, A> {
    /// Create an interpreter for `code` running as `context.address`, with
    /// `context.gas_limit` gas available.
    pub fn new(
        context: &'a ExecutionContext,
        code: &'a [u8],
        version: EvmVersion,
        state: &'a mut PendingState<'b>,
        access_list: &'a mut A,
        transient: &'a mut TransientStorage,
    ) -> Self {
        Self {
            context,
            code,
            version,
            pc: 0,
            stack: Stack::new(),
            memory: Memory::new(),
            gas_remaining: context.gas_limit,
            refund: 0,
            logs: Vec::new(),
            state,
            access_list,
            transient,
            jump_dests: analyze_jump_dests(code),
        }
    }

    /// Run until the frame stops, reverts or halts.
    pub fn run(mut self) -> FrameResult {
        let outcome = loop {
            match self.step() {
                Ok(None) => {}
                Ok(Some(outcome)) => break outcome,
                Err(reason) => {
                    self.gas_remaining = 0;
                    break FrameOutcome::Halt(reason);
                }
            }
        };

        FrameResult {
            outcome,
            gas_left: self.gas_remaining,
            refund: self.refund,
            logs: self.logs,
        }
    }

    fn charge(&mut self, gas: u64) -> Result<(), VmError> {
        if gas > self.gas_remaining {
            return Err(VmError::OutOfGas);
        }
        self.gas_remaining -= gas;
        Ok(())
    }

    /// Charges expansion for `[offset, offset + size)` and grows memory.
    /// A zero size touches nothing, whatever the offset.
    fn memory_region(&mut self, offset: U256, size: U256) -> Result<(usize, usize), VmError> {
        if size.is_zero() {
            return Ok((0, 0));
        }
        let offset = memory_operand(offset)?;
        let size = memory_operand(size)?;
        let end = offset.checked_add(size).ok_or(VmError::OutOfGas)?;

        let cost = memory_expansion_cost(self.memory.word_size(), end.div_ceil(WORD_SIZE));
        self.charge(cost)?;
        self.memory.expand(end)?;
        Ok((offset, size))
    }

    fn touch_account(&mut self, address: Address) -> Result<(), VmError> {
        let status = self.access_list.touch_account(address);
        self.charge(gas::account_access_cost(status.is_cold()))
    }

    fn jump(&mut self, dest: U256) -> Result<(), VmError> {
        let target = usize::try_from(dest).unwrap_or(usize::MAX);
        if !self.jump_dests.contains(&target) {
            return Err(VmError::InvalidJump(target));
        }
        self.pc = target;
        Ok(())
    }

    /// Executes one opcode. `Ok(Some(_))` ends the frame.
    #[allow(clippy::too_many_lines)]
    fn step(&mut self) -> Result<Option<FrameOutcome>, VmError> {
        let Some(&op) = self.code.get(self.pc) else {
            return Ok(Some(FrameOutcome::Return(Bytes::new())));
        };

        if !opcodes::is_enabled(op, self.version) {
            return Err(VmError::InvalidOpcode(op));
        }
        if opcodes::needs_nested_frame(op) {
            return Err(VmError::UnsupportedOpcode(op));
        }

        self.charge(OPCODE_GAS[op as usize])?;
        self.pc += 1;

        match op {
            STOP => return Ok(Some(FrameOutcome::Return(Bytes::new()))),

            // =================================================================
            // ARITHMETIC
            // =================================================================
            ADD => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a.overflowing_add(b).0)?;
            }
            MUL => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a.overflowing_mul(b).0)?;
            }
            SUB => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a.overflowing_sub(b).0)?;
            }
            DIV => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack
                    .push(if b.is_zero() { U256::zero() } else { a / b })?;
            }
            SDIV => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(if b.is_zero() {
                    U256::zero()
                } else {
                    signed_div(a, b)
                })?;
            }
            MOD => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack
                    .push(if b.is_zero() { U256::zero() } else { a % b })?;
            }
            SMOD => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(if b.is_zero() {
                    U256::zero()
                } else {
                    signed_mod(a, b)
                })?;
            }
            ADDMOD => {
                let [a, b, n] = self.stack.pop_n::<3>()?;
                let result = if n.is_zero() {
                    U256::zero()
                } else {
                    u512_to_u256((U512::from(a) + U512::from(b)) % U512::from(n))
                };
                self.stack.push(result)?;
            }
            MULMOD => {
                let [a, b, n] = self.stack.pop_n::<3>()?;
                let result = if n.is_zero() {
                    U256::zero()
                } else {
                    u512_to_u256(a.full_mul(b) % U512::from(n))
                };
                self.stack.push(result)?;
            }
            EXP => {
                let [base, exponent] = self.stack.pop_n::<2>()?;
                self.charge(gas::exp_gas_cost(exponent))?;
                self.stack.push(base.overflowing_pow(exponent).0)?;
            }
            SIGNEXTEND => {
                let [k, x] = self.stack.pop_n::<2>()?;
                self.stack.push(sign_extend(k, x))?;
            }

            // =================================================================
            // COMPARISON & BITWISE
            // =================================================================
            LT => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push_bool(a < b)?;
            }
            GT => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push_bool(a > b)?;
            }
            SLT => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push_bool(signed_lt(a, b))?;
            }
            SGT => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push_bool(signed_lt(b, a))?;
            }
            EQ => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push_bool(a == b)?;
            }
            ISZERO => {
                let a = self.stack.pop()?;
                self.stack.push_bool(a.is_zero())?;
            }
            AND => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a & b)?;
            }
            OR => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a | b)?;
            }
            XOR => {
                let [a, b] = self.stack.pop_n::<2>()?;
                self.stack.push(a ^ b)?;
            }
            NOT => {
                let a = self.stack.pop()?;
                self.stack.push(!a)?;
            }
            BYTE => {
                let [i, x] = self.stack.pop_n::<2>()?;
                let result = if i < U256::from(32) {
                    U256::from(x.byte(31 - i.as_usize()))
                } else {
                    U256::zero()
                };
                self.stack.push(result)?;
            }
            SHL => {
                let [shift, value] = self.stack.pop_n::<2>()?;
                self.stack.push(if shift >= U256::from(256) {
                    U256::zero()
                } else {
                    value << shift.as_usize()
                })?;
            }
            SHR => {
                let [shift, value] = self.stack.pop_n::<2>()?;
                self.stack.push(if shift >= U256::from(256) {
                    U256::zero()
                } else {
                    value >> shift.as_usize()
                })?;
            }
            SAR => {
                let [shift, value] = self.stack.pop_n::<2>()?;
                self.stack.push(sar(value, shift))?;
            }

            KECCAK256 => {
                let [offset, size] = self.stack.pop_n::<2>()?;
                let (offset, size) = self.memory_region(offset, size)?;
                self.charge(gas::keccak256_gas_cost(size))?;
                let data = self.memory.read_bytes(offset, size);
                self.stack.push(keccak256(&data).to_u256())?;
            }

            // =================================================================
            // ENVIRONMENTAL INFORMATION
            // =================================================================
            ADDRESS => self.stack.push(self.context.address.to_word())?,
            BALANCE => {
                let address = Address::from_word(self.stack.pop()?);
                self.touch_account(address)?;
                self.stack.push(self.state.balance(&address))?;
            }
            ORIGIN => self.stack.push(self.context.origin.to_word())?,
            CALLER => self.stack.push(self.context.caller.to_word())?,
            CALLVALUE => self.stack.push(self.context.value)?,
            CALLDATALOAD => {
                let offset = saturating_usize(self.stack.pop()?);
                let data = self.context.data.as_slice();
                let mut word = [0u8; 32];
                if offset < data.len() {
                    let available = (data.len() - offset).min(32);
                    word[..available].copy_from_slice(&data[offset..offset + available]);
                }
                self.stack.push(U256::from_big_endian(&word))?;
            }
            CALLDATASIZE => self.stack.push(U256::from(self.context.data.len()))?,
            CALLDATACOPY => {
                let [dest, source_offset, size] = self.stack.pop_n::<3>()?;
                let (dest, size) = self.memory_region(dest, size)?;
                self.charge(gas::copy_gas_cost(size))?;
                self.memory.write_padded(
                    dest,
                    self.context.data.as_slice(),
                    saturating_usize(source_offset),
                    size,
                )?;
            }
            CODESIZE => self.stack.push(U256::from(self.code.len()))?,
            CODECOPY => {
                let [dest, source_offset, size] = self.stack.pop_n::<3>()?;
                let (dest, size) = self.memory_region(dest, size)?;
                self.charge(gas::copy_gas_cost(size))?;
                self.memory
                    .write_padded(dest, self.code, saturating_usize(source_offset), size)?;
            }
            GASPRICE => self.stack.push(self.context.gas_price)?,
            EXTCODESIZE => {
                let address = Address::from_word(self.stack.pop()?);
                self.touch_account(address)?;
                let size = self.state.code(&address).len();
                self.stack.push(U256::from(size))?;
            }
            EXTCODECOPY => {
                let [address, dest, source_offset, size] = self.stack.pop_n::<4>()?;
                let address = Address::from_word(address);
                self.touch_account(address)?;
                let (dest, size) = self.memory_region(dest, size)?;
                self.charge(gas::copy_gas_cost(size))?;
                let code = self.state.code(&address);
                self.memory.write_padded(
                    dest,
                    code.as_slice(),
                    saturating_usize(source_offset),
                    size,
                )?;
            }
            RETURNDATASIZE => self.stack.push(U256::zero())?,
            RETURNDATACOPY => {
                let [dest, offset, size] = self.stack.pop_n::<3>()?;
                let end = offset.saturating_add(size);
                if !end.is_zero() {
                    return Err(VmError::ReturnDataOutOfBounds {
                        offset: saturating_usize(offset),
                        size: saturating_usize(size),
                        available: 0,
                    });
                }
                self.memory_region(dest, size)?;
            }
            EXTCODEHASH => {
                let address = Address::from_word(self.stack.pop()?);
                self.touch_account(address)?;
                let hash = match self.state.account(&address) {
                    Some(account) if !account.is_empty() => account.code_hash(),
                    _ => Hash::ZERO,
                };
                self.stack.push(hash.to_u256())?;
            }

            // =================================================================
            // BLOCK INFORMATION
            // =================================================================
            BLOCKHASH => {
                // No block history is kept
                self.stack.pop()?;
                self.stack.push(U256::zero())?;
            }
            COINBASE => self.stack.push(self.context.block.coinbase.to_word())?,
            TIMESTAMP => self.stack.push(U256::from(self.context.block.timestamp))?,
            NUMBER => self.stack.push(U256::from(self.context.block.number))?,
            PREVRANDAO => self.stack.push(self.context.block.prevrandao)?,
            GASLIMIT => self.stack.push(U256::from(self.context.block.gas_limit))?,
            CHAINID => self.stack.push(U256::from(self.context.block.chain_id))?,
            SELFBALANCE => {
                let balance = self.state.balance(&self.context.address);
                self.stack.push(balance)?;
            }
            BASEFEE => self.stack.push(self.context.block.base_fee)?,

            // =================================================================
            // STACK, MEMORY, STORAGE AND FLOW
            // =================================================================
            POP => {
                self.stack.pop()?;
            }
            MLOAD => {
                let offset = self.stack.pop()?;
                let (offset, _) = self.memory_region(offset, U256::from(WORD_SIZE))?;
                let word = self.memory.read_word(offset);
                self.stack.push(U256::from_big_endian(&word))?;
            }
            MSTORE => {
                let [offset, value] = self.stack.pop_n::<2>()?;
                let (offset, _) = self.memory_region(offset, U256::from(WORD_SIZE))?;
                let mut word = [0u8; 32];
                value.to_big_endian(&mut word);
                self.memory.write_word(offset, &word)?;
            }
            MSTORE8 => {
                let [offset, value] = self.stack.pop_n::<2>()?;
                let (offset, _) = self.memory_region(offset, U256::one())?;
                self.memory.write_byte(offset, value.byte(0))?;
            }
            SLOAD => {
                let key = StorageKey::from_u256(self.stack.pop()?);
                let address = self.context.address;
                let status = self.access_list.touch_storage(address, key);
                self.charge(if status.is_cold() {
                    costs::COLD_SLOAD
                } else {
                    costs::WARM_SLOAD
                })?;
                self.stack.push(self.state.storage(&address, &key).to_u256())?;
            }
            SSTORE => {
                // EIP-2200 sentry
                if self.gas_remaining <= costs::SSTORE_SENTRY {
                    return Err(VmError::OutOfGas);
                }
                let [key, value] = self.stack.pop_n::<2>()?;
                let key = StorageKey::from_u256(key);
                let new = StorageValue::from_u256(value);
                let address = self.context.address;

                let status = self.access_list.touch_storage(address, key);
                let original = self.state.original_storage(&address, &key);
                let current = self.state.storage(&address, &key);
                let cost = gas::sstore_cost(original, current, new, status.is_cold(), self.version);
                self.charge(cost.gas)?;
                self.refund += cost.refund;
                self.state.set_storage(address, key, new);
            }
            JUMP => {
                let dest = self.stack.pop()?;
                self.jump(dest)?;
            }
            JUMPI => {
                let [dest, condition] = self.stack.pop_n::<2>()?;
                if !condition.is_zero() {
                    self.jump(dest)?;
                }
            }
            PC => self.stack.push(U256::from(self.pc - 1))?,
            MSIZE => self.stack.push(U256::from(self.memory.len()))?,
            GAS => self.stack.push(U256::from(self.gas_remaining))?,
            JUMPDEST => {}
            TLOAD => {
                let key = StorageKey::from_u256(self.stack.pop()?);
                let value = self.transient.tload(self.context.address, key);
                self.stack.push(value.to_u256())?;
            }
            TSTORE => {
                let [key, value] = self.stack.pop_n::<2>()?;
                self.transient.tstore(
                    self.context.address,
                    StorageKey::from_u256(key),
                    StorageValue::from_u256(value),
                );
            }
            MCOPY => {
                let [dest, source, size] = self.stack.pop_n::<3>()?;
                if !size.is_zero() {
                    let (_, size) = self.memory_region(dest.max(source), size)?;
                    self.charge(gas::copy_gas_cost(size))?;
                    self.memory
                        .copy(dest.as_usize(), source.as_usize(), size)?;
                }
            }
            PUSH0 => self.stack.push(U256::zero())?,

            // =================================================================
            // PUSH, DUP, SWAP
            // =================================================================
            PUSH1..=PUSH32 => {
                let size = opcodes::push_size(op);
                let start = self.pc.min(self.code.len());
                let end = (self.pc + size).min(self.code.len());
                let mut word = [0u8; 32];
                // Immediates cut off by the end of code are zero-padded on the right
                word[32 - size..32 - size + (end - start)]
                    .copy_from_slice(&self.code[start..end]);
                self.stack.push(U256::from_big_endian(&word))?;
                self.pc += size;
            }
            DUP1..=DUP16 => self.stack.dup(usize::from(op - DUP1))?,
            SWAP1..=SWAP16 => self.stack.swap(usize::from(op - SWAP1) + 1)?,

            // =================================================================
            // LOGGING
            // =================================================================
            LOG0..=LOG4 => {
                let topic_count = usize::from(op - LOG0);
                let [offset, size] = self.stack.pop_n::<2>()?;
                let mut topics = Vec::with_capacity(topic_count);
                for _ in 0..topic_count {
                    topics.push(Hash::from_u256(self.stack.pop()?));
                }
                let (offset, size) = self.memory_region(offset, size)?;
                self.charge(gas::log_gas_cost(size, topic_count))?;
                let data = Bytes::from(self.memory.read_bytes(offset, size));
                self.logs.push(Log::new(self.context.address, topics, data));
            }

            // =================================================================
            // SYSTEM
            // =================================================================
            RETURN | REVERT => {
                let [offset, size] = self.stack.pop_n::<2>()?;
                let (offset, size) = self.memory_region(offset, size)?;
                let output = Bytes::from(self.memory.read_bytes(offset, size));
                return Ok(Some(if op == RETURN {
                    FrameOutcome::Return(output)
                } else {
                    FrameOutcome::Revert(output)
                }));
            }

            _ => return Err(VmError::InvalidOpcode(op)),
        }

        Ok(None)
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Valid JUMPDEST positions, skipping PUSH immediates.
fn analyze_jump_dests(code: &[u8]) -> HashSet<usize> {
    let mut dests = HashSet::new();
    let mut i = 0;

    while i < code.len() {
        let op = code[i];
        if op == JUMPDEST {
            dests.insert(i);
        }
        i += 1 + opcodes::push_size(op);
    }

    dests
}

fn memory_operand(value: U256) -> Result<usize, VmError> {
    if value > U256::from(MAX_MEMORY_OPERAND) {
        return Err(VmError::OutOfGas);
    }
    usize::try_from(value.low_u64()).map_err(|_| VmError::OutOfGas)
}

fn saturating_usize(value: U256) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if value.bit(255) {
        negate(value)
    } else {
        value
    }
}

/// Signed less than comparison.
fn signed_lt(a: U256, b: U256) -> bool {
    match (a.bit(255), b.bit(255)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

/// Signed division; `b` must be non-zero.
fn signed_div(a: U256, b: U256) -> U256 {
    let result = abs(a) / abs(b);
    if a.bit(255) == b.bit(255) {
        result
    } else {
        negate(result)
    }
}

/// Signed modulo; the result takes the sign of `a`. `b` must be non-zero.
fn signed_mod(a: U256, b: U256) -> U256 {
    let result = abs(a) % abs(b);
    if a.bit(255) {
        negate(result)
    } else {
        result
    }
}

/// Arithmetic shift right.
fn sar(value: U256, shift: U256) -> U256 {
    let negative = value.bit(255);
    if shift >= U256::from(256) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.as_usize();
    if shift == 0 || !negative {
        return value >> shift;
    }
    (value >> shift) | (U256::MAX << (256 - shift))
}

/// Extends the sign bit of byte `k` (counted from the low end) upwards.
fn sign_extend(k: U256, x: U256) -> U256 {
    if k >= U256::from(31) {
        return x;
    }
    let bit_index = 8 * k.as_usize() + 7;
    let mask = (U256::one() << (bit_index + 1)) - 1;
    if x.bit(bit_index) {
        x | !mask
    } else {
        x & mask
    }
}

/// Low 256 bits of a U512 known to fit.
fn u512_to_u256(value: U512) -> U256 {
    let mut bytes = [0u8; 64];
    value.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}

// =============================================================================
// TESTS
// =============================================================================
