//! Weighted pools: the constant weighted product curve.

use {
    super::{
        CommonPoolState,
        PoolId,
        SwapKind,
        add_swap_fee_amount,
        ensure_within_limit,
        pair_indices,
        subtract_swap_fee_amount,
        token_index,
    },
    crate::{
        math::{
            Bfp,
            Error,
            PowVersion,
            checked::BalU256,
            weighted_math::{self, MAX_IN_RATIO, MAX_OUT_RATIO},
        },
        token::{Token, TokenAmount},
    },
    primitive_types::U256,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenState {
    pub balance: TokenAmount,
    /// Normalized weight, all weights of a pool sum up to one.
    pub weight: Bfp,
}

#[derive(Clone, Debug)]
pub struct WeightedPool {
    pub common: CommonPoolState,
    pub tokens: Vec<TokenState>,
    pub version: PowVersion,
}

impl WeightedPool {
    pub fn new(id: PoolId, swap_fee: Bfp, tokens: Vec<TokenState>, version: PowVersion) -> Self {
        Self {
            common: CommonPoolState::new(id, swap_fee),
            tokens,
            version,
        }
    }

    fn pair(
        &self,
        token_in: &Token,
        token_out: &Token,
    ) -> Result<(&TokenState, &TokenState), Error> {
        let (index_in, index_out) = pair_indices(
            self.tokens.iter().map(|t| &t.balance.token),
            token_in,
            token_out,
        )?;
        Ok((&self.tokens[index_in], &self.tokens[index_out]))
    }

    /// `balance_in * weight_out / (weight_in + weight_out)`
    pub fn get_normalized_liquidity(
        &self,
        token_in: &Token,
        token_out: &Token,
    ) -> Result<Bfp, Error> {
        let (t_in, t_out) = self.pair(token_in, token_out)?;
        t_in.balance
            .scale18()?
            .mul_down(t_out.weight)?
            .div_down(t_in.weight.add(t_out.weight)?)
    }

    pub fn get_limit_amount_swap(
        &self,
        token_in: &Token,
        token_out: &Token,
        kind: SwapKind,
    ) -> Result<U256, Error> {
        let (t_in, t_out) = self.pair(token_in, token_out)?;
        let limit = match kind {
            SwapKind::GivenIn => Bfp::from_wei(t_in.balance.amount).mul_down(*MAX_IN_RATIO)?,
            SwapKind::GivenOut => Bfp::from_wei(t_out.balance.amount).mul_down(*MAX_OUT_RATIO)?,
        };
        Ok(limit.as_uint256())
    }

    pub fn swap_given_in(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: &TokenAmount,
    ) -> Result<TokenAmount, Error> {
        let (t_in, t_out) = self.pair(token_in, token_out)?;
        ensure_within_limit(
            amount_in.amount,
            self.get_limit_amount_swap(token_in, token_out, SwapKind::GivenIn)?,
        )?;

        let in_amount_minus_fees = TokenAmount::from_raw_amount(
            token_in.clone(),
            subtract_swap_fee_amount(amount_in.amount, self.common.swap_fee)?,
        );
        let out_amount = weighted_math::calc_out_given_in(
            t_in.balance.scale18()?,
            t_in.weight,
            t_out.balance.scale18()?,
            t_out.weight,
            in_amount_minus_fees.scale18()?,
            self.version,
        )?;

        TokenAmount::from_scale18_amount(token_out.clone(), out_amount, false)
    }

    pub fn swap_given_out(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_out: &TokenAmount,
    ) -> Result<TokenAmount, Error> {
        let (t_in, t_out) = self.pair(token_in, token_out)?;
        ensure_within_limit(
            amount_out.amount,
            self.get_limit_amount_swap(token_in, token_out, SwapKind::GivenOut)?,
        )?;

        let in_amount = weighted_math::calc_in_given_out(
            t_in.balance.scale18()?,
            t_in.weight,
            t_out.balance.scale18()?,
            t_out.weight,
            amount_out.scale18()?,
            self.version,
        )?;
        let amount_in_before_fee =
            TokenAmount::from_scale18_amount(token_in.clone(), in_amount, true)?;
        let amount_in = add_swap_fee_amount(amount_in_before_fee.amount, self.common.swap_fee)?;

        Ok(TokenAmount::from_raw_amount(token_in.clone(), amount_in))
    }

    pub fn update_balances(
        &mut self,
        amount_in: &TokenAmount,
        amount_out: &TokenAmount,
    ) -> Result<(), Error> {
        let tokens = || self.tokens.iter().map(|t| &t.balance.token);
        let index_in = token_index(tokens(), &amount_in.token)?;
        let index_out = token_index(tokens(), &amount_out.token)?;

        let balance = |index: usize| self.tokens[index].balance.amount;
        let balance_in = balance(index_in).badd(amount_in.amount)?;
        let balance_out = balance(index_out).bsub(amount_out.amount)?;
        self.tokens[index_in].balance.amount = balance_in;
        self.tokens[index_out].balance.amount = balance_out;
        Ok(())
    }
}
