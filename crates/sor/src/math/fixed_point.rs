//! Module emulating the operations on fixed points with exactly 18 decimals as
//! used in the Balancer smart contracts. Original contract code:
//! https://github.com/balancer-labs/balancer-v2-monorepo/blob/9eb7e44a4e9ebbadfe3c6242a086118298cadc9f/pkg/solidity-utils/contracts/math/FixedPoint.sol

use {
    super::{checked::BalU256, error::Error, log_exp_math},
    anyhow::{Context, Result, bail, ensure},
    primitive_types::U256,
    std::{
        fmt::{self, Debug, Display, Formatter},
        str::FromStr,
        sync::LazyLock,
    },
};

static ONE_18: LazyLock<U256> = LazyLock::new(|| U256::exp10(18));
static ZERO: LazyLock<Bfp> = LazyLock::new(|| Bfp(U256::zero()));
static ONE: LazyLock<Bfp> = LazyLock::new(|| Bfp(*ONE_18));
static TWO: LazyLock<Bfp> = LazyLock::new(|| Bfp(*ONE_18 * 2));
static FOUR: LazyLock<Bfp> = LazyLock::new(|| Bfp(*ONE_18 * 4));
static MAX_POW_RELATIVE_ERROR: LazyLock<Bfp> = LazyLock::new(|| Bfp(10000_usize.into()));

/// Balancer Fixed Point: an unsigned number with 18 decimals stored as its
/// raw `U256` ("wei") representation.
#[derive(Clone, Copy, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Bfp(U256);

/// Selects the power approximation. Pools deployed at different times run
/// different `FixedPoint` versions, and quotes are only exact when the same
/// one is used.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum PowVersion {
    /// Always evaluates `LogExpMath.pow` and pads it by the maximum relative
    /// error.
    V1,
    /// Computes integer exponents 1, 2 and 4 exactly, falling back to
    /// [`PowVersion::V1`] behaviour otherwise.
    #[default]
    V2,
}

impl Bfp {
    pub fn exp10(exp: i32) -> Self {
        match exp {
            ..=-19 => Self::zero(),
            ..=-1 => Self(U256::exp10((18 + exp) as _)),
            0.. => Self(U256::exp10(exp as _) * *ONE_18),
        }
    }

    pub fn as_uint256(self) -> U256 {
        self.0
    }

    pub fn zero() -> Self {
        *ZERO
    }

    pub fn one() -> Self {
        *ONE
    }

    pub fn from_wei(num: U256) -> Self {
        Self(num)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(self, other: Self) -> Result<Self, Error> {
        Ok(Self(self.0.badd(other.0)?))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(self, other: Self) -> Result<Self, Error> {
        Ok(Self(self.0.bsub(other.0)?))
    }

    pub fn mul_down(self, other: Self) -> Result<Self, Error> {
        Ok(Self(self.0.bmul(other.0)? / *ONE_18))
    }

    pub fn mul_up(self, other: Self) -> Result<Self, Error> {
        let product = self.0.bmul(other.0)?;
        if product.is_zero() {
            return Ok(Bfp::zero());
        }
        Ok(Self(((product - 1) / *ONE_18) + 1))
    }

    pub fn div_down(self, other: Self) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::ZeroDivision);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        let a_inflated = self.0.checked_mul(*ONE_18).ok_or(Error::DivInternal)?;
        Ok(Self(a_inflated / other.0))
    }

    pub fn div_up(self, other: Self) -> Result<Self, Error> {
        if other.is_zero() {
            return Err(Error::ZeroDivision);
        }
        if self.is_zero() {
            return Ok(Self::zero());
        }
        let a_inflated = self.0.checked_mul(*ONE_18).ok_or(Error::DivInternal)?;
        Ok(Self(((a_inflated - 1) / other.0) + 1))
    }

    /// `1 - self`, saturating at zero.
    pub fn complement(self) -> Self {
        if self.0 < *ONE_18 {
            Self(*ONE_18 - self.0)
        } else {
            Self::zero()
        }
    }

    /// `self^exp`, rounded up: the result is never below the exact value.
    pub fn pow_up(self, exp: Self, version: PowVersion) -> Result<Self, Error> {
        if version == PowVersion::V2 {
            if exp == Self::one() {
                return Ok(self);
            }
            if exp == *TWO {
                return self.mul_up(self);
            }
            if exp == *FOUR {
                let square = self.mul_up(self)?;
                return square.mul_up(square);
            }
        }

        let raw = Bfp(log_exp_math::pow(self.0, exp.0)?);
        let max_error = raw.mul_up(*MAX_POW_RELATIVE_ERROR)?.add(Bfp(1.into()))?;
        raw.add(max_error)
    }

    /// `self^exp`, rounded down: the result is never above the exact value.
    pub fn pow_down(self, exp: Self, version: PowVersion) -> Result<Self, Error> {
        if version == PowVersion::V2 {
            if exp == Self::one() {
                return Ok(self);
            }
            if exp == *TWO {
                return self.mul_down(self);
            }
            if exp == *FOUR {
                let square = self.mul_down(self)?;
                return square.mul_down(square);
            }
        }

        let raw = Bfp(log_exp_math::pow(self.0, exp.0)?);
        let max_error = raw.mul_up(*MAX_POW_RELATIVE_ERROR)?.add(Bfp(1.into()))?;
        if raw < max_error {
            Ok(Bfp::zero())
        } else {
            raw.sub(max_error)
        }
    }
}

impl FromStr for Bfp {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut split_dot = s.splitn(2, '.');
        let units = split_dot
            .next()
            .expect("Splitting a string slice yields at least one element");
        let decimals = split_dot.next().unwrap_or("0");
        if units.is_empty() || decimals.is_empty() || decimals.len() > 18 {
            bail!("Invalid decimal representation");
        }
        ensure!(
            units
                .bytes()
                .chain(decimals.bytes())
                .all(|b| b.is_ascii_digit()),
            "Invalid decimal representation"
        );
        Ok(Bfp(U256::from_dec_str(&format!("{decimals:0<18}"))?
            .checked_add(
                U256::from_dec_str(units)?
                    .checked_mul(*ONE_18)
                    .context("Too large number")?,
            )
            .context("Too large number")?))
    }
}

impl<'de> serde::Deserialize<'de> for Bfp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for Bfp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl Display for Bfp {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        let (units, decimals) = self.0.div_mod(*ONE_18);
        write!(formatter, "{units}.{:0>18}", decimals.as_u128())
    }
}

impl Debug for Bfp {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        write!(formatter, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parsing() {
        assert_eq!("1".parse::<Bfp>().unwrap(), Bfp::one());
        assert_eq!(
            "0.1".parse::<Bfp>().unwrap(),
            Bfp::from_wei(U256::exp10(17))
        );
        assert_eq!(
            "1.01".parse::<Bfp>().unwrap(),
            Bfp::from_wei(U256::exp10(16) * 101)
        );
        assert_eq!(
            "10.000000000000000001".parse::<Bfp>().unwrap(),
            Bfp::from_wei(U256::exp10(19) + 1)
        );
        assert!("0.0000000000000000001".parse::<Bfp>().is_err());
        assert!(".1".parse::<Bfp>().is_err());
        assert!("1.".parse::<Bfp>().is_err());
        assert!("-1".parse::<Bfp>().is_err());
        assert!("1e3".parse::<Bfp>().is_err());
    }

    #[test]
    fn serde_roundtrip() {
        let value = "12.5".parse::<Bfp>().unwrap();
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"12.500000000000000000\"");
        assert_eq!(serde_json::from_str::<Bfp>(&json).unwrap(), value);
    }

    #[test]
    fn display() {
        assert_eq!(Bfp::one().to_string(), "1.000000000000000000");
        assert_eq!(
            "0.3".parse::<Bfp>().unwrap().to_string(),
            "0.300000000000000000"
        );
    }

    #[test]
    fn exp10() {
        assert_eq!(Bfp::exp10(0), Bfp::one());
        assert_eq!(Bfp::exp10(2), Bfp::from_wei(U256::exp10(20)));
        assert_eq!(Bfp::exp10(-18), Bfp::from_wei(U256::one()));
        assert_eq!(Bfp::exp10(-19), Bfp::zero());
    }

    #[test]
    fn add_and_sub() {
        assert_eq!(Bfp::one().add(Bfp::one()).unwrap(), *TWO);
        assert_eq!(
            Bfp::from_wei(U256::MAX).add(Bfp::one()).unwrap_err(),
            Error::AddOverflow
        );
        assert_eq!(Bfp::zero().sub(Bfp::one()).unwrap_err(), Error::SubOverflow);
    }

    #[test]
    fn mul_rounding() {
        let third = Bfp::one()
            .div_down(Bfp::exp10(0).add(*TWO).unwrap())
            .unwrap();
        assert_eq!(third, Bfp::from_wei(333_333_333_333_333_333_u128.into()));
        let two_wei = Bfp::from_wei(2.into());
        assert_eq!(
            two_wei.mul_down(Bfp::from_wei(U256::exp10(17))).unwrap(),
            Bfp::zero()
        );
        assert_eq!(
            two_wei.mul_up(Bfp::from_wei(U256::exp10(17))).unwrap(),
            Bfp::from_wei(1.into())
        );
        assert_eq!(Bfp::zero().mul_up(Bfp::one()).unwrap(), Bfp::zero());
        assert_eq!(
            Bfp::from_wei(U256::MAX).mul_down(*TWO).unwrap_err(),
            Error::MulOverflow
        );
    }

    #[test]
    fn div_rounding() {
        let three = Bfp::exp10(0).add(*TWO).unwrap();
        assert_eq!(
            Bfp::one().div_down(three).unwrap(),
            Bfp::from_wei(333_333_333_333_333_333_u128.into())
        );
        assert_eq!(
            Bfp::one().div_up(three).unwrap(),
            Bfp::from_wei(333_333_333_333_333_334_u128.into())
        );
        assert_eq!(
            Bfp::one().div_down(Bfp::zero()).unwrap_err(),
            Error::ZeroDivision
        );
        assert_eq!(
            Bfp::one().div_up(Bfp::zero()).unwrap_err(),
            Error::ZeroDivision
        );
        assert_eq!(Bfp::zero().div_up(three).unwrap(), Bfp::zero());
        assert_eq!(
            Bfp::from_wei(U256::MAX).div_down(Bfp::one()).unwrap_err(),
            Error::DivInternal
        );
    }

    #[test]
    fn complement() {
        assert_eq!(Bfp::zero().complement(), Bfp::one());
        assert_eq!(
            "0.3".parse::<Bfp>().unwrap().complement(),
            "0.7".parse().unwrap()
        );
        assert_eq!(TWO.complement(), Bfp::zero());
    }

    #[test]
    fn pow_versions() {
        let x = "1.5".parse::<Bfp>().unwrap();

        // the second version is exact for small integer exponents
        assert_eq!(x.pow_up(Bfp::one(), PowVersion::V2).unwrap(), x);
        assert_eq!(
            x.pow_up(*TWO, PowVersion::V2).unwrap(),
            "2.25".parse().unwrap()
        );
        assert_eq!(
            x.pow_down(*FOUR, PowVersion::V2).unwrap(),
            "5.0625".parse().unwrap()
        );

        // the first version always pads the log/exp approximation
        let up = x.pow_up(*TWO, PowVersion::V1).unwrap();
        let down = x.pow_down(*TWO, PowVersion::V1).unwrap();
        let exact = "2.25".parse::<Bfp>().unwrap();
        assert!(down < exact && exact < up);
        assert!(up.sub(down).unwrap() < Bfp::from_wei(1_000_000.into()));

        // non integer exponents are shared by both versions
        let half = "0.5".parse::<Bfp>().unwrap();
        assert_eq!(
            x.pow_up(half, PowVersion::V1).unwrap(),
            x.pow_up(half, PowVersion::V2).unwrap()
        );
    }
}
