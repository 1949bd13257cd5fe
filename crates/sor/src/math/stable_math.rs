//! Stable pool math from the Balancer contracts:
//! https://github.com/balancer-labs/balancer-v2-monorepo/blob/9eb7e44a4e9ebbadfe3c6242a086118298cadc9f/pkg/pool-stable/contracts/StableMath.sol
//!
//! All balances are upscaled to 18 decimals. The amplification parameter is
//! passed already multiplied by [`AMP_PRECISION`].

use {
    super::{checked::BalU256, error::Error, fixed_point::Bfp},
    primitive_types::U256,
    std::sync::LazyLock,
};

pub static AMP_PRECISION: LazyLock<U256> = LazyLock::new(|| U256::from(1000));

const MAX_ITERATIONS: usize = 255;

/// Computes the StableSwap invariant `D` with Newton's method.
///
/// Returns zero for an empty or drained pool.
pub fn calculate_invariant(amplification_parameter: U256, balances: &[Bfp]) -> Result<U256, Error> {
    let mut sum = U256::zero();
    for balance in balances {
        sum = sum.badd(balance.as_uint256())?;
    }
    if sum.is_zero() {
        return Ok(U256::zero());
    }

    let num_tokens = U256::from(balances.len());
    let amp_times_total = amplification_parameter.bmul(num_tokens)?;
    let mut invariant = sum;

    for _ in 0..MAX_ITERATIONS {
        let mut d_p = invariant;
        for balance in balances {
            d_p = d_p
                .bmul(invariant)?
                .bdiv_down(balance.as_uint256().bmul(num_tokens)?)?;
        }

        let prev_invariant = invariant;
        let numerator = amp_times_total
            .bmul(sum)?
            .bdiv_down(*AMP_PRECISION)?
            .badd(d_p.bmul(num_tokens)?)?
            .bmul(invariant)?;
        let denominator = amp_times_total
            .bsub(*AMP_PRECISION)?
            .bmul(invariant)?
            .bdiv_down(*AMP_PRECISION)?
            .badd(num_tokens.badd(1.into())?.bmul(d_p)?)?;
        invariant = numerator.bdiv_down(denominator)?;

        if converged(invariant, prev_invariant) {
            return Ok(invariant);
        }
    }

    Err(Error::StableInvariantDidntConverge)
}

/// Amount of token `token_index_out` received for exactly `token_amount_in`
/// of token `token_index_in`. The swap fee must already be deducted.
///
/// `balances` is temporarily modified and restored before returning.
pub fn calc_out_given_in(
    amplification_parameter: U256,
    balances: &mut [Bfp],
    token_index_in: usize,
    token_index_out: usize,
    token_amount_in: Bfp,
) -> Result<Bfp, Error> {
    let invariant = calculate_invariant(amplification_parameter, balances)?;

    balances[token_index_in] = balances[token_index_in].add(token_amount_in)?;
    let final_balance_out = get_token_balance_given_invariant_and_all_other_balances(
        amplification_parameter,
        balances,
        invariant,
        token_index_out,
    );
    balances[token_index_in] = balances[token_index_in].sub(token_amount_in)?;

    // Round down by one extra wei in favour of the pool.
    balances[token_index_out]
        .sub(final_balance_out?)?
        .sub(Bfp::from_wei(1.into()))
}

/// Amount of token `token_index_in` (before fees) needed to receive exactly
/// `token_amount_out` of token `token_index_out`.
///
/// `balances` is temporarily modified and restored before returning.
pub fn calc_in_given_out(
    amplification_parameter: U256,
    balances: &mut [Bfp],
    token_index_in: usize,
    token_index_out: usize,
    token_amount_out: Bfp,
) -> Result<Bfp, Error> {
    let invariant = calculate_invariant(amplification_parameter, balances)?;

    balances[token_index_out] = balances[token_index_out].sub(token_amount_out)?;
    let final_balance_in = get_token_balance_given_invariant_and_all_other_balances(
        amplification_parameter,
        balances,
        invariant,
        token_index_in,
    );
    balances[token_index_out] = balances[token_index_out].add(token_amount_out)?;

    final_balance_in?
        .sub(balances[token_index_in])?
        .add(Bfp::from_wei(1.into()))
}

/// BPT minted for depositing `amounts_in`. The part of a deposit that
/// unbalances the pool is charged the swap fee.
pub fn calc_bpt_out_given_exact_tokens_in(
    amplification_parameter: U256,
    balances: &[Bfp],
    amounts_in: &[Bfp],
    bpt_total_supply: Bfp,
    swap_fee_percentage: Bfp,
) -> Result<Bfp, Error> {
    let current_invariant = calculate_invariant(amplification_parameter, balances)?;
    let sum_balances = sum(balances)?;

    let mut balance_ratios_with_fee = Vec::with_capacity(amounts_in.len());
    let mut invariant_ratio_with_fees = Bfp::zero();
    for (balance, amount_in) in balances.iter().zip(amounts_in) {
        let current_weight = balance.div_down(sum_balances)?;
        let ratio = balance.add(*amount_in)?.div_down(*balance)?;
        invariant_ratio_with_fees = invariant_ratio_with_fees.add(ratio.mul_down(current_weight)?)?;
        balance_ratios_with_fee.push(ratio);
    }

    let fee_complement = swap_fee_percentage.complement();
    let mut new_balances = Vec::with_capacity(balances.len());
    for ((balance, amount_in), ratio) in balances
        .iter()
        .zip(amounts_in)
        .zip(&balance_ratios_with_fee)
    {
        let amount_in_without_fee = if *ratio > invariant_ratio_with_fees {
            let non_taxable_amount = balance.mul_down(invariant_ratio_with_fees.sub(Bfp::one())?)?;
            let taxable_amount = amount_in.sub(non_taxable_amount)?;
            non_taxable_amount.add(taxable_amount.mul_down(fee_complement)?)?
        } else {
            *amount_in
        };
        new_balances.push(balance.add(amount_in_without_fee)?);
    }

    let new_invariant = calculate_invariant(amplification_parameter, &new_balances)?;
    let invariant_ratio =
        Bfp::from_wei(new_invariant).div_down(Bfp::from_wei(current_invariant))?;
    if invariant_ratio > Bfp::one() {
        bpt_total_supply.mul_down(invariant_ratio.sub(Bfp::one())?)
    } else {
        Ok(Bfp::zero())
    }
}

/// Amount of token `token_index` to deposit in order to receive exactly
/// `bpt_amount_out`.
pub fn calc_token_in_given_exact_bpt_out(
    amplification_parameter: U256,
    balances: &[Bfp],
    token_index: usize,
    bpt_amount_out: Bfp,
    bpt_total_supply: Bfp,
    swap_fee_percentage: Bfp,
) -> Result<Bfp, Error> {
    let current_invariant = Bfp::from_wei(calculate_invariant(amplification_parameter, balances)?);
    let new_invariant = bpt_total_supply
        .add(bpt_amount_out)?
        .div_up(bpt_total_supply)?
        .mul_up(current_invariant)?;

    let new_balance = get_token_balance_given_invariant_and_all_other_balances(
        amplification_parameter,
        balances,
        new_invariant.as_uint256(),
        token_index,
    )?;
    let amount_in_without_fee = new_balance.sub(balances[token_index])?;

    let current_weight = balances[token_index].div_down(sum(balances)?)?;
    let taxable_percentage = current_weight.complement();
    let taxable_amount = amount_in_without_fee.mul_up(taxable_percentage)?;
    let non_taxable_amount = amount_in_without_fee.sub(taxable_amount)?;

    non_taxable_amount.add(taxable_amount.div_up(swap_fee_percentage.complement())?)
}

/// BPT burned for withdrawing exactly `amounts_out`.
pub fn calc_bpt_in_given_exact_tokens_out(
    amplification_parameter: U256,
    balances: &[Bfp],
    amounts_out: &[Bfp],
    bpt_total_supply: Bfp,
    swap_fee_percentage: Bfp,
) -> Result<Bfp, Error> {
    let current_invariant = calculate_invariant(amplification_parameter, balances)?;
    let sum_balances = sum(balances)?;

    let mut balance_ratios_without_fee = Vec::with_capacity(amounts_out.len());
    let mut invariant_ratio_without_fees = Bfp::zero();
    for (balance, amount_out) in balances.iter().zip(amounts_out) {
        let current_weight = balance.div_up(sum_balances)?;
        let ratio = balance.sub(*amount_out)?.div_up(*balance)?;
        invariant_ratio_without_fees =
            invariant_ratio_without_fees.add(ratio.mul_up(current_weight)?)?;
        balance_ratios_without_fee.push(ratio);
    }

    let fee_complement = swap_fee_percentage.complement();
    let mut new_balances = Vec::with_capacity(balances.len());
    for ((balance, amount_out), ratio) in balances
        .iter()
        .zip(amounts_out)
        .zip(&balance_ratios_without_fee)
    {
        let amount_out_with_fee = if invariant_ratio_without_fees > *ratio {
            let non_taxable_amount = balance.mul_down(invariant_ratio_without_fees.complement())?;
            let taxable_amount = amount_out.sub(non_taxable_amount)?;
            non_taxable_amount.add(taxable_amount.div_up(fee_complement)?)?
        } else {
            *amount_out
        };
        new_balances.push(balance.sub(amount_out_with_fee)?);
    }

    let new_invariant = calculate_invariant(amplification_parameter, &new_balances)?;
    let invariant_ratio =
        Bfp::from_wei(new_invariant).div_down(Bfp::from_wei(current_invariant))?;
    bpt_total_supply.mul_up(invariant_ratio.complement())
}

/// Amount of token `token_index` received for burning exactly
/// `bpt_amount_in`.
pub fn calc_token_out_given_exact_bpt_in(
    amplification_parameter: U256,
    balances: &[Bfp],
    token_index: usize,
    bpt_amount_in: Bfp,
    bpt_total_supply: Bfp,
    swap_fee_percentage: Bfp,
) -> Result<Bfp, Error> {
    let current_invariant = Bfp::from_wei(calculate_invariant(amplification_parameter, balances)?);
    let new_invariant = bpt_total_supply
        .sub(bpt_amount_in)?
        .div_up(bpt_total_supply)?
        .mul_up(current_invariant)?;

    let new_balance = get_token_balance_given_invariant_and_all_other_balances(
        amplification_parameter,
        balances,
        new_invariant.as_uint256(),
        token_index,
    )?;
    let amount_out_without_fee = balances[token_index].sub(new_balance)?;

    let current_weight = balances[token_index].div_down(sum(balances)?)?;
    let taxable_percentage = current_weight.complement();
    let taxable_amount = amount_out_without_fee.mul_up(taxable_percentage)?;
    let non_taxable_amount = amount_out_without_fee.sub(taxable_amount)?;

    non_taxable_amount.add(taxable_amount.mul_down(swap_fee_percentage.complement())?)
}

/// Solves the invariant for the balance of `token_index`, keeping every other
/// balance fixed. Rounds up.
pub fn get_token_balance_given_invariant_and_all_other_balances(
    amplification_parameter: U256,
    balances: &[Bfp],
    invariant: U256,
    token_index: usize,
) -> Result<Bfp, Error> {
    let num_tokens = U256::from(balances.len());
    let amp_times_total = amplification_parameter.bmul(num_tokens)?;

    let mut sum = balances[0].as_uint256();
    let mut p_d = sum.bmul(num_tokens)?;
    for balance in &balances[1..] {
        p_d = p_d
            .bmul(balance.as_uint256())?
            .bmul(num_tokens)?
            .bdiv_down(invariant)?;
        sum = sum.badd(balance.as_uint256())?;
    }
    let balance = balances[token_index].as_uint256();
    sum = sum.bsub(balance)?;

    let inv2 = invariant.bmul(invariant)?;
    // `c = inv2 / (ampTimesTotal * P_D) * AMP_PRECISION * balance[tokenIndex]`
    let c = inv2
        .bdiv_up(amp_times_total.bmul(p_d)?)?
        .bmul(*AMP_PRECISION)?
        .bmul(balance)?;
    let b = sum.badd(invariant.bdiv_down(amp_times_total)?.bmul(*AMP_PRECISION)?)?;

    // `tokenBalance = (inv2 + c) / (invariant + b)` as the initial guess.
    let mut token_balance = inv2.badd(c)?.bdiv_up(invariant.badd(b)?)?;
    for _ in 0..MAX_ITERATIONS {
        let prev_token_balance = token_balance;
        token_balance = token_balance
            .bmul(token_balance)?
            .badd(c)?
            .bdiv_up(token_balance.bmul(2.into())?.badd(b)?.bsub(invariant)?)?;

        if converged(token_balance, prev_token_balance) {
            return Ok(Bfp::from_wei(token_balance));
        }
    }

    Err(Error::StableGetBalanceDidntConverge)
}

fn converged(value: U256, previous: U256) -> bool {
    if value > previous {
        value - previous <= U256::one()
    } else {
        previous - value <= U256::one()
    }
}

fn sum(balances: &[Bfp]) -> Result<Bfp, Error> {
    balances
        .iter()
        .try_fold(Bfp::zero(), |acc, balance| acc.add(*balance))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bfp(s: &str) -> Bfp {
        s.parse().unwrap()
    }

    fn amp(factor: u64) -> U256 {
        U256::from(factor) * *AMP_PRECISION
    }

    fn assert_close(actual: Bfp, expected: Bfp, tolerance: &str) {
        let diff = if actual > expected {
            actual.sub(expected).unwrap()
        } else {
            expected.sub(actual).unwrap()
        };
        assert!(diff <= bfp(tolerance), "expected {expected} got {actual}");
    }

    #[test]
    fn invariant_of_balanced_pool_is_the_sum() {
        let balances = [bfp("1000"), bfp("1000"), bfp("1000")];
        let invariant = calculate_invariant(amp(100), &balances).unwrap();
        let sum = U256::exp10(21) * 3;
        let diff = if invariant > sum { invariant - sum } else { sum - invariant };
        assert!(diff <= 3.into());
    }

    #[test]
    fn invariant_of_empty_pool_is_zero() {
        assert_eq!(
            calculate_invariant(amp(100), &[Bfp::zero(), Bfp::zero()]).unwrap(),
            U256::zero()
        );
    }

    #[test]
    fn swaps_close_to_one_to_one() {
        let mut balances = vec![bfp("1000000"), bfp("1000000")];
        let out = calc_out_given_in(amp(200), &mut balances, 0, 1, bfp("100")).unwrap();
        assert!(out < bfp("100") && out > bfp("99.99"));
        // balances are restored
        assert_eq!(balances, vec![bfp("1000000"), bfp("1000000")]);

        let amount_in = calc_in_given_out(amp(200), &mut balances, 0, 1, bfp("100")).unwrap();
        assert!(amount_in > bfp("100") && amount_in < bfp("100.01"));
        assert_eq!(balances, vec![bfp("1000000"), bfp("1000000")]);
    }

    #[test]
    fn swaps_preserve_invariant() {
        let mut balances = vec![bfp("1200"), bfp("800"), bfp("1000")];
        let amplification = amp(50);
        let before = calculate_invariant(amplification, &balances).unwrap();

        let amount_in = bfp("37.5");
        let out = calc_out_given_in(amplification, &mut balances, 1, 2, amount_in).unwrap();
        let after = calculate_invariant(
            amplification,
            &[
                balances[0],
                balances[1].add(amount_in).unwrap(),
                balances[2].sub(out).unwrap(),
            ],
        )
        .unwrap();
        // the invariant only moves by the convergence tolerance
        assert!(after + U256::from(10) >= before);
    }

    #[test]
    fn out_given_in_and_in_given_out_agree() {
        let mut balances = vec![bfp("5000"), bfp("3000")];
        let out = calc_out_given_in(amp(100), &mut balances, 0, 1, bfp("250")).unwrap();
        let amount_in = calc_in_given_out(amp(100), &mut balances, 0, 1, out).unwrap();
        assert_close(amount_in, bfp("250"), "0.000001");
    }

    #[test]
    fn single_sided_join_and_exit() {
        let balances = [bfp("1000"), bfp("1000")];
        let supply = bfp("2000");
        let fee = bfp("0.001");

        let bpt_out = calc_bpt_out_given_exact_tokens_in(
            amp(100),
            &balances,
            &[bfp("10"), Bfp::zero()],
            supply,
            fee,
        )
        .unwrap();
        // slightly less than 10 BPT because of the imbalance fee and slippage
        assert!(bpt_out < bfp("10") && bpt_out > bfp("9.98"));

        let token_in =
            calc_token_in_given_exact_bpt_out(amp(100), &balances, 0, bpt_out, supply, fee)
                .unwrap();
        assert_close(token_in, bfp("10"), "0.001");

        let token_out =
            calc_token_out_given_exact_bpt_in(amp(100), &balances, 1, bfp("10"), supply, fee)
                .unwrap();
        assert!(token_out < bfp("10") && token_out > bfp("9.98"));

        let bpt_in = calc_bpt_in_given_exact_tokens_out(
            amp(100),
            &balances,
            &[Bfp::zero(), token_out],
            supply,
            fee,
        )
        .unwrap();
        assert_close(bpt_in, bfp("10"), "0.001");
    }

    #[test]
    fn proportional_join_is_fee_free() {
        let balances = [bfp("1000"), bfp("3000")];
        let bpt_out = calc_bpt_out_given_exact_tokens_in(
            amp(100),
            &balances,
            &[bfp("10"), bfp("30")],
            bfp("3900"),
            bfp("0.01"),
        )
        .unwrap();
        // 1% of the supply, up to rounding
        assert_close(bpt_out, bfp("39"), "0.0001");
    }
}
