//! Weighted pool math from the Balancer contracts:
//! https://github.com/balancer-labs/balancer-v2-monorepo/blob/6c9e24e22d0c46cca6dd15861d3d33da61a60b98/pkg/pool-weighted/contracts/WeightedMath.sol

use {
    super::{
        error::Error,
        fixed_point::{Bfp, PowVersion},
    },
    std::sync::LazyLock,
};

// https://github.com/balancer-labs/balancer-v2-monorepo/blob/6c9e24e22d0c46cca6dd15861d3d33da61a60b98/pkg/pool-weighted/contracts/WeightedMath.sol#L36-L37
pub static MAX_IN_RATIO: LazyLock<Bfp> =
    LazyLock::new(|| Bfp::from_wei(300_000_000_000_000_000_u128.into()));
pub static MAX_OUT_RATIO: LazyLock<Bfp> =
    LazyLock::new(|| Bfp::from_wei(300_000_000_000_000_000_u128.into()));

/// Amount of `token_out` received for exactly `amount_in`, with the swap fee
/// already deducted from `amount_in`. Rounds down.
pub fn calc_out_given_in(
    balance_in: Bfp,
    weight_in: Bfp,
    balance_out: Bfp,
    weight_out: Bfp,
    amount_in: Bfp,
    version: PowVersion,
) -> Result<Bfp, Error> {
    if amount_in > balance_in.mul_down(*MAX_IN_RATIO)? {
        return Err(Error::MaxInRatio);
    }

    let denominator = balance_in.add(amount_in)?;
    let base = balance_in.div_up(denominator)?;
    let exponent = weight_in.div_down(weight_out)?;
    let power = base.pow_up(exponent, version)?;

    balance_out.mul_down(power.complement())
}

/// Amount of `token_in` (before fees) needed to receive exactly `amount_out`.
/// Rounds up.
pub fn calc_in_given_out(
    balance_in: Bfp,
    weight_in: Bfp,
    balance_out: Bfp,
    weight_out: Bfp,
    amount_out: Bfp,
    version: PowVersion,
) -> Result<Bfp, Error> {
    if amount_out > balance_out.mul_down(*MAX_OUT_RATIO)? {
        return Err(Error::MaxOutRatio);
    }

    let base = balance_out.div_up(balance_out.sub(amount_out)?)?;
    let exponent = weight_out.div_up(weight_in)?;
    let power = base.pow_up(exponent, version)?;
    let ratio = power.sub(Bfp::one())?;

    balance_in.mul_up(ratio)
}
