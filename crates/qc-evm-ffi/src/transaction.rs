//! # Transaction Configurator
//!
//! Validates `qc_evm_set_tx` arguments and attaches the resulting
//! transaction to an instance. Validation is all-or-nothing: a bad argument
//! leaves the previously attached transaction in place.

use crate::codec::{parse_address, parse_u256};
use crate::errors::FfiError;
use crate::instance::QcEvmInstance;
use primitive_types::U256;
use qc_evm_engine::domain::entities::{Transaction, TxKind};
use qc_evm_engine::domain::value_objects::Bytes;

/// `qc_evm_set_tx` arguments after C-string decoding.
#[derive(Clone, Debug, Default)]
pub struct TxArgs<'a> {
    /// Sender address.
    pub caller: &'a str,
    /// Recipient, `None` for a contract creation.
    pub to: Option<&'a str>,
    /// Value in wei, `None` for zero.
    pub value: Option<&'a str>,
    /// Call data or init code.
    pub data: &'a [u8],
    /// Gas limit.
    pub gas_limit: u64,
    /// Gas price, `None` for the engine default.
    pub gas_price: Option<&'a str>,
    /// Sender nonce.
    pub nonce: u64,
}

impl TxArgs<'_> {
    /// Validates every field and builds the engine transaction.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAddress` for a bad `caller`/`to` and `InvalidHex` for
    /// a bad `value`/`gas_price`.
    pub fn parse(&self) -> Result<Transaction, FfiError> {
        let caller = parse_address(self.caller)?;
        let kind = match self.to {
            Some(to) => TxKind::Call(parse_address(to)?),
            None => TxKind::Create,
        };
        let value = self
            .value
            .map(parse_u256)
            .transpose()?
            .unwrap_or_else(U256::zero);
        let gas_price = self.gas_price.map(parse_u256).transpose()?;

        Ok(Transaction {
            caller,
            kind,
            value,
            data: Bytes::from_slice(self.data),
            gas_limit: self.gas_limit,
            gas_price,
            nonce: self.nonce,
        })
    }
}

/// Replaces the instance's pending transaction.
///
/// # Errors
///
/// See [`TxArgs::parse`]. On error the pending transaction is unchanged.
pub fn configure(instance: &mut QcEvmInstance, args: &TxArgs<'_>) -> Result<(), FfiError> {
    let tx = args.parse()?;
    tracing::debug!(
        caller = %tx.caller,
        create = tx.kind.is_create(),
        gas_limit = tx.gas_limit,
        nonce = tx.nonce,
        "transaction configured"
    );
    instance.pending_tx = Some(tx);
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use qc_evm_engine::domain::value_objects::Address;

    const ALICE: &str = "0x1111111111111111111111111111111111111111";
    const BOB: &str = "0x2222222222222222222222222222222222222222";

    fn transfer_args<'a>() -> TxArgs<'a> {
        TxArgs {
            caller: ALICE,
            to: Some(BOB),
            value: Some("0x1"),
            gas_limit: 21_000,
            ..TxArgs::default()
        }
    }

    #[test]
    fn test_parse_call() {
        let tx = transfer_args().parse().unwrap();
        assert_eq!(tx.caller, Address::new([0x11; 20]));
        assert_eq!(tx.kind, TxKind::Call(Address::new([0x22; 20])));
        assert_eq!(tx.value, U256::one());
        assert_eq!(tx.gas_price, None);
        assert!(tx.data.is_empty());
    }

    #[test]
    fn test_parse_create_defaults() {
        let args = TxArgs {
            caller: ALICE,
            data: &[0x60, 0x00],
            gas_limit: 100_000,
            gas_price: Some("0x3"),
            nonce: 4,
            ..TxArgs::default()
        };
        let tx = args.parse().unwrap();
        assert!(tx.kind.is_create());
        assert_eq!(tx.value, U256::zero());
        assert_eq!(tx.gas_price, Some(U256::from(3)));
        assert_eq!(tx.data.as_slice(), &[0x60, 0x00]);
        assert_eq!(tx.nonce, 4);
    }

    #[test]
    fn test_parse_errors_by_field() {
        let bad_caller = TxArgs {
            caller: "0x11",
            ..transfer_args()
        };
        assert_eq!(
            bad_caller.parse().unwrap_err().code(),
            ErrorCode::InvalidAddress
        );

        let bad_to = TxArgs {
            to: Some("nope"),
            ..transfer_args()
        };
        assert_eq!(bad_to.parse().unwrap_err().code(), ErrorCode::InvalidAddress);

        let bad_value = TxArgs {
            value: Some("0xzz"),
            ..transfer_args()
        };
        assert_eq!(bad_value.parse().unwrap_err().code(), ErrorCode::InvalidHex);

        let bad_price = TxArgs {
            gas_price: Some("1"),
            ..transfer_args()
        };
        assert_eq!(bad_price.parse().unwrap_err().code(), ErrorCode::InvalidHex);
    }

    #[test]
    fn test_failed_configure_keeps_previous() {
        let mut instance = QcEvmInstance::default();
        configure(&mut instance, &transfer_args()).unwrap();
        let before = instance.pending_tx().cloned();

        let bad = TxArgs {
            value: Some("0x"),
            ..transfer_args()
        };
        assert!(configure(&mut instance, &bad).is_err());
        assert_eq!(instance.pending_tx().cloned(), before);
    }

    #[test]
    fn test_configure_overwrites() {
        let mut instance = QcEvmInstance::default();
        configure(&mut instance, &transfer_args()).unwrap();
        let second = TxArgs {
            nonce: 9,
            ..transfer_args()
        };
        configure(&mut instance, &second).unwrap();
        assert_eq!(instance.pending_tx().map(|tx| tx.nonce), Some(9));
    }
}
