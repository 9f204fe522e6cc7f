//! SDK error types

use linktree_interface::error::{AccountDecodeError, LinktreeProgramError};
use solana_client::client_error::ClientError;
use solana_sdk::{
    hash::Hash, instruction::InstructionError, pubkey::Pubkey, transaction::TransactionError,
};
use thiserror::Error;

/// Custom code the system program reports when `create_account` targets an
/// address that already holds an account.
pub const SYSTEM_ACCOUNT_ALREADY_IN_USE: u32 = 0;

/// Why the program (or the runtime on its behalf) rejected an instruction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProgramFailure {
    /// One of the linktree program's own errors
    #[error("program error: {0}")]
    Linktree(LinktreeProgramError),
    /// The profile address is already occupied (duplicate create)
    #[error("account already in use")]
    AccountAlreadyInUse,
    /// An Anchor framework constraint failed
    #[error("{name} (code {code})")]
    Framework {
        /// Numeric framework code
        code: u32,
        /// Anchor name of the code
        name: &'static str,
    },
    /// A custom code this client does not know
    #[error("custom program error {0:#x}")]
    Custom(u32),
    /// A non-custom instruction error
    #[error("{0}")]
    Instruction(InstructionError),
}

impl ProgramFailure {
    /// Classify an instruction error reported for a linktree instruction.
    pub fn from_instruction_error(err: InstructionError) -> Self {
        match err {
            InstructionError::Custom(code) => Self::from_custom_code(code),
            other => Self::Instruction(other),
        }
    }

    /// Classify a numeric custom error code.
    pub fn from_custom_code(code: u32) -> Self {
        if let Some(e) = LinktreeProgramError::from_code(code) {
            return Self::Linktree(e);
        }
        if code == SYSTEM_ACCOUNT_ALREADY_IN_USE {
            return Self::AccountAlreadyInUse;
        }
        match anchor_error_name(code) {
            Some(name) => Self::Framework { code, name },
            None => Self::Custom(code),
        }
    }
}

fn anchor_error_name(code: u32) -> Option<&'static str> {
    Some(match code {
        100 => "InstructionMissing",
        101 => "InstructionFallbackNotFound",
        102 => "InstructionDidNotDeserialize",
        2000 => "ConstraintMut",
        2001 => "ConstraintHasOne",
        2002 => "ConstraintSigner",
        2003 => "ConstraintRaw",
        2006 => "ConstraintSeeds",
        2012 => "ConstraintAddress",
        3001 => "AccountDiscriminatorNotFound",
        3002 => "AccountDiscriminatorMismatch",
        3003 => "AccountDidNotDeserialize",
        3004 => "AccountDidNotSerialize",
        3007 => "AccountOwnedByWrongProgram",
        3010 => "AccountNotSigner",
        3012 => "AccountNotInitialized",
        _ => return None,
    })
}

/// Errors surfaced by the linktree SDK.
///
/// Mutation failures are split so callers can tell "build again and retry"
/// ([`LinktreeError::Expired`], [`LinktreeError::Rpc`]) from "retrying the
/// same request will not help" (everything else).
#[derive(Debug, Error)]
pub enum LinktreeError {
    /// Rejected client-side before anything was sent
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A bundle with no instructions reached the submission guard
    #[error("transaction has no instructions")]
    EmptyTransaction,

    /// Connection or RPC failure
    #[error("rpc error: {0}")]
    Rpc(String),

    /// The signer declined or failed to sign
    #[error("signer rejected transaction: {0}")]
    SignerRejected(String),

    /// The blockhash expired before the transaction was confirmed
    #[error("transaction expired before confirmation (blockhash {blockhash})")]
    Expired {
        /// Blockhash the transaction was bound to
        blockhash: Hash,
    },

    /// The program reverted one of the instructions
    #[error("instruction {index} failed: {failure}")]
    ProgramRevert {
        /// Position of the failing instruction in the transaction
        index: u8,
        /// Decoded reason
        failure: ProgramFailure,
    },

    /// The runtime rejected the transaction for a non-program reason
    #[error("transaction failed: {0}")]
    TransactionFailed(TransactionError),

    /// Account exists but is not owned by the linktree program
    #[error("account {address} is owned by {owner}, not the linktree program")]
    WrongOwner {
        /// Account looked up
        address: Pubkey,
        /// Its actual owner program
        owner: Pubkey,
    },

    /// Account bytes are not a linktree profile
    #[error("account {address} could not be decoded: {source}")]
    Decode {
        /// Account looked up
        address: Pubkey,
        /// Decoder failure
        #[source]
        source: AccountDecodeError,
    },
}

impl LinktreeError {
    /// Classify a transaction error coming back from preflight or from a
    /// confirmed status.
    pub fn from_transaction_error(err: TransactionError, blockhash: Hash) -> Self {
        match err {
            TransactionError::BlockhashNotFound => LinktreeError::Expired { blockhash },
            TransactionError::InstructionError(index, ix_err) => LinktreeError::ProgramRevert {
                index,
                failure: ProgramFailure::from_instruction_error(ix_err),
            },
            other => LinktreeError::TransactionFailed(other),
        }
    }

    /// Whether building a fresh transaction and submitting again can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LinktreeError::Expired { .. } | LinktreeError::Rpc(_))
    }

    /// The program error, when the failure is one of the linktree program's own codes
    pub fn program_error(&self) -> Option<LinktreeProgramError> {
        match self {
            LinktreeError::ProgramRevert {
                failure: ProgramFailure::Linktree(e),
                ..
            } => Some(*e),
            _ => None,
        }
    }
}

impl From<ClientError> for LinktreeError {
    fn from(e: ClientError) -> Self {
        LinktreeError::Rpc(e.to_string())
    }
}

/// Result type alias for SDK operations
pub type Result<T> = std::result::Result<T, LinktreeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_codes_are_classified() {
        assert_eq!(
            ProgramFailure::from_custom_code(6000),
            ProgramFailure::Linktree(LinktreeProgramError::LengthInputsNotSame)
        );
        assert_eq!(
            ProgramFailure::from_custom_code(0),
            ProgramFailure::AccountAlreadyInUse
        );
        assert_eq!(
            ProgramFailure::from_custom_code(2006),
            ProgramFailure::Framework {
                code: 2006,
                name: "ConstraintSeeds"
            }
        );
        assert_eq!(ProgramFailure::from_custom_code(6042), ProgramFailure::Custom(6042));
    }

    #[test]
    fn transaction_errors_split_expiry_from_reverts() {
        let blockhash = Hash::new_unique();

        let expired =
            LinktreeError::from_transaction_error(TransactionError::BlockhashNotFound, blockhash);
        assert!(matches!(expired, LinktreeError::Expired { blockhash: b } if b == blockhash));
        assert!(expired.is_retryable());

        let revert = LinktreeError::from_transaction_error(
            TransactionError::InstructionError(0, InstructionError::Custom(6000)),
            blockhash,
        );
        assert_eq!(
            revert.program_error(),
            Some(LinktreeProgramError::LengthInputsNotSame)
        );
        assert!(!revert.is_retryable());

        let other = LinktreeError::from_transaction_error(
            TransactionError::InsufficientFundsForFee,
            blockhash,
        );
        assert!(matches!(other, LinktreeError::TransactionFailed(_)));
    }
}
