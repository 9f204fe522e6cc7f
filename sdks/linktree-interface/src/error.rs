//! Error types

use {num_derive::FromPrimitive, num_traits::FromPrimitive, thiserror::Error};

/// Custom error codes of the program start here (Anchor convention).
pub const ERROR_CODE_OFFSET: u32 = 6000;

/// Errors that may be returned by the linktree program.
#[derive(Clone, Copy, Debug, Eq, Error, FromPrimitive, PartialEq)]
pub enum LinktreeProgramError {
    // 6000
    /// `add_links` received urls and titles of different lengths
    #[error("Number of urls and titles must be same")]
    LengthInputsNotSame,
}

impl LinktreeProgramError {
    /// Numeric code reported in `InstructionError::Custom`
    pub fn code(self) -> u32 {
        ERROR_CODE_OFFSET + self as u32
    }

    /// Map a custom error code back to the program error, if it is one
    pub fn from_code(code: u32) -> Option<Self> {
        code.checked_sub(ERROR_CODE_OFFSET)
            .and_then(<Self as FromPrimitive>::from_u32)
    }

    /// Name as it appears in the program IDL
    pub fn name(self) -> &'static str {
        match self {
            Self::LengthInputsNotSame => "lengthInputsNotSame",
        }
    }
}

/// Why raw account bytes are not a `LinkTreeAccount`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccountDecodeError {
    /// Not even room for a discriminator
    #[error("account data too short ({len} bytes)")]
    TooShort {
        /// Length of the data seen
        len: usize,
    },
    /// Some other account type of the same program, or not an Anchor account
    #[error("unexpected account discriminator {found:?}")]
    DiscriminatorMismatch {
        /// The first eight bytes of the data
        found: [u8; 8],
    },
    /// Discriminator matched but the fields did not deserialize
    #[error("malformed account data: {0}")]
    Malformed(String),
}

impl From<std::io::Error> for AccountDecodeError {
    fn from(e: std::io::Error) -> Self {
        AccountDecodeError::Malformed(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_error_codes() {
        assert_eq!(LinktreeProgramError::LengthInputsNotSame.code(), 6000);
        assert_eq!(
            LinktreeProgramError::from_code(6000),
            Some(LinktreeProgramError::LengthInputsNotSame)
        );
        assert_eq!(LinktreeProgramError::from_code(6001), None);
        assert_eq!(LinktreeProgramError::from_code(0), None);
        assert_eq!(
            LinktreeProgramError::LengthInputsNotSame.to_string(),
            "Number of urls and titles must be same"
        );
    }
}
