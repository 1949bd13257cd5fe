//! Checked integer operations on `U256` with the semantics of the Balancer
//! `Math` library.

use {super::error::Error, primitive_types::U256};

pub trait BalU256: Sized {
    fn bmul(self, other: Self) -> Result<Self, Error>;
    fn badd(self, other: Self) -> Result<Self, Error>;
    fn bsub(self, other: Self) -> Result<Self, Error>;
    fn bdiv_down(self, other: Self) -> Result<Self, Error>;
    fn bdiv_up(self, other: Self) -> Result<Self, Error>;
}

impl BalU256 for U256 {
    fn bmul(self, other: Self) -> Result<Self, Error> {
        self.checked_mul(other).ok_or(Error::MulOverflow)
    }

    fn badd(self, other: Self) -> Result<Self, Error> {
        self.checked_add(other).ok_or(Error::AddOverflow)
    }

    fn bsub(self, other: Self) -> Result<Self, Error> {
        self.checked_sub(other).ok_or(Error::SubOverflow)
    }

    fn bdiv_down(self, other: Self) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::ZeroDivision);
        }
        Ok(self / other)
    }

    /// `ceil(self / other)`, computed as `(self - 1) / other + 1` which equals
    /// `(self + other - 1) / other` without the intermediate overflow.
    fn bdiv_up(self, other: Self) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::ZeroDivision);
        }
        if self.is_zero() {
            return Ok(U256::zero());
        }
        Ok((self - 1) / other + 1)
    }
}
