//! Linear pool math from the Balancer contracts:
//! https://github.com/balancer-labs/balancer-v2-monorepo/blob/9eb7e44a4e9ebbadfe3c6242a086118298cadc9f/pkg/pool-linear/contracts/LinearMath.sol
//!
//! A linear pool holds a main token, its wrapped (yield bearing) version and
//! its own BPT. Main token balances are converted to "nominal" balances that
//! charge a fee outside of the `[lower_target, upper_target]` band, and the
//! invariant is `nominal_main + wrapped`. Wrapped amounts must already be
//! expressed in main token units.

use {
    super::{checked::BalU256, error::Error, fixed_point::Bfp},
    primitive_types::U256,
};

/// Fee and target band of a linear pool, all 18 decimal fixed point.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Params {
    pub fee: Bfp,
    pub lower_target: Bfp,
    pub upper_target: Bfp,
}

/// Balances of the pool, upscaled to 18 decimals.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Balances {
    pub main: Bfp,
    pub wrapped: Bfp,
    /// Virtual BPT supply: the BPT not held by the pool itself.
    pub bpt_supply: Bfp,
}

pub fn calc_bpt_out_per_main_in(
    main_in: Bfp,
    balances: &Balances,
    params: &Params,
) -> Result<Bfp, Error> {
    if balances.bpt_supply.is_zero() {
        // The first deposit mints BPT at nominal value.
        return to_nominal(main_in, params);
    }

    let previous_nominal_main = to_nominal(balances.main, params)?;
    let after_nominal_main = to_nominal(balances.main.add(main_in)?, params)?;
    let delta_nominal_main = after_nominal_main.sub(previous_nominal_main)?;
    let invariant = calc_invariant(previous_nominal_main, balances.wrapped)?;

    Ok(Bfp::from_wei(
        balances
            .bpt_supply
            .as_uint256()
            .bmul(delta_nominal_main.as_uint256())?
            .bdiv_down(invariant.as_uint256())?,
    ))
}

pub fn calc_bpt_in_per_main_out(
    main_out: Bfp,
    balances: &Balances,
    params: &Params,
) -> Result<Bfp, Error> {
    let previous_nominal_main = to_nominal(balances.main, params)?;
    let after_nominal_main = to_nominal(balances.main.sub(main_out)?, params)?;
    let delta_nominal_main = previous_nominal_main.sub(after_nominal_main)?;
    let invariant = calc_invariant(previous_nominal_main, balances.wrapped)?;

    Ok(Bfp::from_wei(
        balances
            .bpt_supply
            .as_uint256()
            .bmul(delta_nominal_main.as_uint256())?
            .bdiv_up(invariant.as_uint256())?,
    ))
}

pub fn calc_wrapped_out_per_main_in(
    main_in: Bfp,
    main_balance: Bfp,
    params: &Params,
) -> Result<Bfp, Error> {
    let previous_nominal_main = to_nominal(main_balance, params)?;
    let after_nominal_main = to_nominal(main_balance.add(main_in)?, params)?;
    after_nominal_main.sub(previous_nominal_main)
}

pub fn calc_wrapped_in_per_main_out(
    main_out: Bfp,
    main_balance: Bfp,
    params: &Params,
) -> Result<Bfp, Error> {
    let previous_nominal_main = to_nominal(main_balance, params)?;
    let after_nominal_main = to_nominal(main_balance.sub(main_out)?, params)?;
    previous_nominal_main.sub(after_nominal_main)
}

pub fn calc_main_in_per_bpt_out(
    bpt_out: Bfp,
    balances: &Balances,
    params: &Params,
) -> Result<Bfp, Error> {
    if balances.bpt_supply.is_zero() {
        return from_nominal(bpt_out, params);
    }

    let previous_nominal_main = to_nominal(balances.main, params)?;
    let invariant = calc_invariant(previous_nominal_main, balances.wrapped)?;
    let delta_nominal_main = Bfp::from_wei(
        invariant
            .as_uint256()
            .bmul(bpt_out.as_uint256())?
            .bdiv_up(balances.bpt_supply.as_uint256())?,
    );
    let after_nominal_main = previous_nominal_main.add(delta_nominal_main)?;
    let new_main_balance = from_nominal(after_nominal_main, params)?;
    new_main_balance.sub(balances.main)
}

pub fn calc_main_out_per_bpt_in(
    bpt_in: Bfp,
    balances: &Balances,
    params: &Params,
) -> Result<Bfp, Error> {
    let previous_nominal_main = to_nominal(balances.main, params)?;
    let invariant = calc_invariant(previous_nominal_main, balances.wrapped)?;
    let delta_nominal_main = Bfp::from_wei(
        invariant
            .as_uint256()
            .bmul(bpt_in.as_uint256())?
            .bdiv_down(balances.bpt_supply.as_uint256())?,
    );
    let after_nominal_main = previous_nominal_main.sub(delta_nominal_main)?;
    let new_main_balance = from_nominal(after_nominal_main, params)?;
    balances.main.sub(new_main_balance)
}

pub fn calc_main_out_per_wrapped_in(
    wrapped_in: Bfp,
    main_balance: Bfp,
    params: &Params,
) -> Result<Bfp, Error> {
    let previous_nominal_main = to_nominal(main_balance, params)?;
    let after_nominal_main = previous_nominal_main.sub(wrapped_in)?;
    let new_main_balance = from_nominal(after_nominal_main, params)?;
    main_balance.sub(new_main_balance)
}

pub fn calc_main_in_per_wrapped_out(
    wrapped_out: Bfp,
    main_balance: Bfp,
    params: &Params,
) -> Result<Bfp, Error> {
    let previous_nominal_main = to_nominal(main_balance, params)?;
    let after_nominal_main = previous_nominal_main.add(wrapped_out)?;
    let new_main_balance = from_nominal(after_nominal_main, params)?;
    new_main_balance.sub(main_balance)
}

pub fn calc_bpt_out_per_wrapped_in(
    wrapped_in: Bfp,
    balances: &Balances,
    params: &Params,
) -> Result<Bfp, Error> {
    if balances.bpt_supply.is_zero() {
        return Ok(wrapped_in);
    }

    let nominal_main = to_nominal(balances.main, params)?;
    let previous_invariant = calc_invariant(nominal_main, balances.wrapped)?;
    let new_wrapped_balance = balances.wrapped.add(wrapped_in)?;
    let new_invariant = calc_invariant(nominal_main, new_wrapped_balance)?;
    let new_bpt_balance = balances
        .bpt_supply
        .as_uint256()
        .bmul(new_invariant.as_uint256())?
        .bdiv_down(previous_invariant.as_uint256())?;
    Bfp::from_wei(new_bpt_balance).sub(balances.bpt_supply)
}

pub fn calc_bpt_in_per_wrapped_out(
    wrapped_out: Bfp,
    balances: &Balances,
    params: &Params,
) -> Result<Bfp, Error> {
    let nominal_main = to_nominal(balances.main, params)?;
    let previous_invariant = calc_invariant(nominal_main, balances.wrapped)?;
    let new_wrapped_balance = balances.wrapped.sub(wrapped_out)?;
    let new_invariant = calc_invariant(nominal_main, new_wrapped_balance)?;
    let new_bpt_balance = balances
        .bpt_supply
        .as_uint256()
        .bmul(new_invariant.as_uint256())?
        .bdiv_down(previous_invariant.as_uint256())?;
    balances.bpt_supply.sub(Bfp::from_wei(new_bpt_balance))
}

pub fn calc_wrapped_in_per_bpt_out(
    bpt_out: Bfp,
    balances: &Balances,
    params: &Params,
) -> Result<Bfp, Error> {
    if balances.bpt_supply.is_zero() {
        return Ok(bpt_out);
    }

    let nominal_main = to_nominal(balances.main, params)?;
    let previous_invariant = calc_invariant(nominal_main, balances.wrapped)?;
    let new_bpt_balance = balances.bpt_supply.add(bpt_out)?;
    let new_wrapped_balance =
        new_wrapped_balance(new_bpt_balance, previous_invariant, nominal_main, balances)?;
    new_wrapped_balance.sub(balances.wrapped)
}

pub fn calc_wrapped_out_per_bpt_in(
    bpt_in: Bfp,
    balances: &Balances,
    params: &Params,
) -> Result<Bfp, Error> {
    let nominal_main = to_nominal(balances.main, params)?;
    let previous_invariant = calc_invariant(nominal_main, balances.wrapped)?;
    let new_bpt_balance = balances.bpt_supply.sub(bpt_in)?;
    let new_wrapped_balance =
        new_wrapped_balance(new_bpt_balance, previous_invariant, nominal_main, balances)?;
    balances.wrapped.sub(new_wrapped_balance)
}

/// Nominal value of a real main token balance.
pub fn to_nominal(real: Bfp, params: &Params) -> Result<Bfp, Error> {
    if real < params.lower_target {
        let fees = params.lower_target.sub(real)?.mul_down(params.fee)?;
        real.sub(fees)
    } else if real <= params.upper_target {
        Ok(real)
    } else {
        let fees = real.sub(params.upper_target)?.mul_down(params.fee)?;
        real.sub(fees)
    }
}

/// Real main token balance with the given nominal value. Inverse of
/// [`to_nominal`] up to rounding.
pub fn from_nominal(nominal: Bfp, params: &Params) -> Result<Bfp, Error> {
    if nominal < params.lower_target {
        nominal
            .add(params.fee.mul_down(params.lower_target)?)?
            .div_down(Bfp::one().add(params.fee)?)
    } else if nominal <= params.upper_target {
        Ok(nominal)
    } else {
        nominal
            .sub(params.fee.mul_down(params.upper_target)?)?
            .div_down(Bfp::one().sub(params.fee)?)
    }
}

fn calc_invariant(nominal_main_balance: Bfp, wrapped_balance: Bfp) -> Result<Bfp, Error> {
    nominal_main_balance.add(wrapped_balance)
}

fn new_wrapped_balance(
    new_bpt_balance: Bfp,
    previous_invariant: Bfp,
    nominal_main: Bfp,
    balances: &Balances,
) -> Result<Bfp, Error> {
    let scaled: U256 = new_bpt_balance
        .as_uint256()
        .bmul(previous_invariant.as_uint256())?
        .bdiv_up(balances.bpt_supply.as_uint256())?;
    Bfp::from_wei(scaled).sub(nominal_main)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bfp(s: &str) -> Bfp {
        s.parse().unwrap()
    }

    fn params() -> Params {
        Params {
            fee: bfp("0.01"),
            lower_target: bfp("1000"),
            upper_target: bfp("2000"),
        }
    }

    #[test]
    fn nominal_conversion() {
        let params = params();
        // within the band nothing changes
        assert_eq!(to_nominal(bfp("1500"), &params).unwrap(), bfp("1500"));
        assert_eq!(from_nominal(bfp("1500"), &params).unwrap(), bfp("1500"));
        // below the lower target the missing amount is charged
        assert_eq!(to_nominal(bfp("900"), &params).unwrap(), bfp("899"));
        assert_eq!(from_nominal(bfp("899"), &params).unwrap(), bfp("900"));
        // above the upper target the excess is charged
        assert_eq!(to_nominal(bfp("2100"), &params).unwrap(), bfp("2099"));
        assert_eq!(from_nominal(bfp("2099"), &params).unwrap(), bfp("2100"));
    }

    #[test]
    fn main_wrapped_swaps_in_band_are_one_to_one() {
        let params = params();
        let main = bfp("1500");
        assert_eq!(
            calc_wrapped_out_per_main_in(bfp("100"), main, &params).unwrap(),
            bfp("100")
        );
        assert_eq!(
            calc_main_out_per_wrapped_in(bfp("100"), main, &params).unwrap(),
            bfp("100")
        );
        assert_eq!(
            calc_main_in_per_wrapped_out(bfp("100"), main, &params).unwrap(),
            bfp("100")
        );
        assert_eq!(
            calc_wrapped_in_per_main_out(bfp("100"), main, &params).unwrap(),
            bfp("100")
        );
    }

    #[test]
    fn leaving_the_band_is_charged() {
        let params = params();
        // 1900 -> 2100 crosses the upper target by 100, paying 1
        assert_eq!(
            calc_wrapped_out_per_main_in(bfp("200"), bfp("1900"), &params).unwrap(),
            bfp("199")
        );
        // 1100 -> 900 crosses the lower target by 100, paying 1
        assert_eq!(
            calc_wrapped_in_per_main_out(bfp("200"), bfp("1100"), &params).unwrap(),
            bfp("201")
        );
    }

    #[test]
    fn bpt_is_priced_at_the_invariant() {
        let params = params();
        let balances = Balances {
            main: bfp("1500"),
            wrapped: bfp("500"),
            bpt_supply: bfp("1000"),
        };
        // invariant 2000 backs 1000 BPT, so one BPT is worth two main tokens
        assert_eq!(
            calc_bpt_out_per_main_in(bfp("100"), &balances, &params).unwrap(),
            bfp("50")
        );
        assert_eq!(
            calc_bpt_in_per_main_out(bfp("100"), &balances, &params).unwrap(),
            bfp("50")
        );
        assert_eq!(
            calc_main_in_per_bpt_out(bfp("50"), &balances, &params).unwrap(),
            bfp("100")
        );
        assert_eq!(
            calc_main_out_per_bpt_in(bfp("50"), &balances, &params).unwrap(),
            bfp("100")
        );
        assert_eq!(
            calc_bpt_out_per_wrapped_in(bfp("100"), &balances, &params).unwrap(),
            bfp("50")
        );
        assert_eq!(
            calc_bpt_in_per_wrapped_out(bfp("100"), &balances, &params).unwrap(),
            bfp("50")
        );
        assert_eq!(
            calc_wrapped_in_per_bpt_out(bfp("50"), &balances, &params).unwrap(),
            bfp("100")
        );
        assert_eq!(
            calc_wrapped_out_per_bpt_in(bfp("50"), &balances, &params).unwrap(),
            bfp("100")
        );
    }

    #[test]
    fn empty_pool_mints_at_nominal_value() {
        let params = params();
        let balances = Balances::default();
        assert_eq!(
            calc_bpt_out_per_wrapped_in(bfp("10"), &balances, &params).unwrap(),
            bfp("10")
        );
        assert_eq!(
            calc_wrapped_in_per_bpt_out(bfp("10"), &balances, &params).unwrap(),
            bfp("10")
        );
        // main below the lower target is charged
        assert_eq!(
            calc_bpt_out_per_main_in(bfp("100"), &balances, &params).unwrap(),
            bfp("91")
        );
    }
}
