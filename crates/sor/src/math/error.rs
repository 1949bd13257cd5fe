/// Errors raised by the pool math and pricing code.
///
/// The arithmetic and curve variants mirror the error codes of the Balancer
/// contracts (see [`Error::code`]) so that failed quotes can be matched
/// against on-chain reverts.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("addition overflow")]
    AddOverflow,
    #[error("subtraction underflow")]
    SubOverflow,
    #[error("multiplication overflow")]
    MulOverflow,
    #[error("division by zero")]
    ZeroDivision,
    #[error("division overflow")]
    DivInternal,
    #[error("pow base out of bounds")]
    XOutOfBounds,
    #[error("pow exponent out of bounds")]
    YOutOfBounds,
    #[error("pow product out of bounds")]
    ProductOutOfBounds,
    #[error("exp argument out of bounds")]
    InvalidExponent,
    #[error("amount in exceeds the maximum in ratio")]
    MaxInRatio,
    #[error("amount out exceeds the maximum out ratio")]
    MaxOutRatio,
    #[error("swap amount exceeds the pool limit")]
    SwapLimitExceeded,
    #[error("stable invariant did not converge")]
    StableInvariantDidntConverge,
    #[error("stable balance did not converge")]
    StableGetBalanceDidntConverge,
    #[error("token is not held by the pool")]
    TokenNotInPool,
    #[error("amounts refer to different tokens")]
    TokenMismatch,
    #[error("token has more than 18 decimals")]
    UnsupportedDecimals,
    #[error("invalid path")]
    InvalidPath,
}

/// Coarse classification of [`Error`]s.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    ArithmeticOverflow,
    ArithmeticUnderflow,
    TokenNotInPool,
    SwapLimitExceeded,
    Convergence,
    InvalidInput,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AddOverflow
            | Self::MulOverflow
            | Self::ZeroDivision
            | Self::DivInternal
            | Self::XOutOfBounds
            | Self::YOutOfBounds
            | Self::ProductOutOfBounds
            | Self::InvalidExponent => ErrorKind::ArithmeticOverflow,
            Self::SubOverflow => ErrorKind::ArithmeticUnderflow,
            Self::MaxInRatio | Self::MaxOutRatio | Self::SwapLimitExceeded => {
                ErrorKind::SwapLimitExceeded
            }
            Self::StableInvariantDidntConverge | Self::StableGetBalanceDidntConverge => {
                ErrorKind::Convergence
            }
            Self::TokenNotInPool => ErrorKind::TokenNotInPool,
            Self::TokenMismatch | Self::UnsupportedDecimals | Self::InvalidPath => {
                ErrorKind::InvalidInput
            }
        }
    }

    /// The `BAL#` error code the contracts revert with, if there is one.
    pub fn code(&self) -> Option<u32> {
        Some(match self {
            Self::AddOverflow => 0,
            Self::SubOverflow => 1,
            Self::MulOverflow => 3,
            Self::ZeroDivision => 4,
            Self::DivInternal => 5,
            Self::XOutOfBounds => 6,
            Self::YOutOfBounds => 7,
            Self::ProductOutOfBounds => 8,
            Self::InvalidExponent => 9,
            Self::MaxInRatio => 304,
            Self::MaxOutRatio => 305,
            Self::StableInvariantDidntConverge => 321,
            Self::StableGetBalanceDidntConverge => 322,
            Self::TokenNotInPool => 521,
            Self::SwapLimitExceeded
            | Self::TokenMismatch
            | Self::UnsupportedDecimals
            | Self::InvalidPath => return None,
        })
    }
}
