//! Composable stable pools.
//!
//! Balances are upscaled to 18 decimals and multiplied by each token's price
//! rate before they reach the StableSwap curve. A composable pool also lists
//! its own BPT as a token. The BPT is tradable (joins and exits look like
//! swaps) but its balance never takes part in the invariant.

use {
    super::{
        ALMOST_ONE,
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
            checked::BalU256,
            stable_math::{self, AMP_PRECISION},
        },
        token::{Token, TokenAmount},
    },
    anyhow::{Result, ensure},
    primitive_types::U256,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenState {
    pub balance: TokenAmount,
    /// Price rate of the token, one for plain tokens.
    pub rate: Bfp,
}

impl TokenState {
    fn rated_balance(&self) -> Result<Bfp, Error> {
        self.balance.scale18()?.mul_down(self.rate)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AmplificationParameter {
    factor: U256,
    precision: U256,
}

impl AmplificationParameter {
    pub fn try_new(factor: U256, precision: U256) -> Result<Self> {
        ensure!(!precision.is_zero(), "Zero precision not allowed");
        Ok(Self { factor, precision })
    }

    /// This is the format used to pass into smart contracts.
    pub fn with_base(&self, base: U256) -> Option<U256> {
        Some(self.factor.checked_mul(base)? / self.precision)
    }

    pub fn factor(&self) -> U256 {
        self.factor
    }

    pub fn precision(&self) -> U256 {
        self.precision
    }
}

#[derive(Clone, Debug)]
pub struct StablePool {
    pub common: CommonPoolState,
    pub tokens: Vec<TokenState>,
    /// Position of the pool's own BPT in `tokens`, if it is listed.
    pub bpt_index: Option<usize>,
    pub amplification_parameter: AmplificationParameter,
    /// BPT in circulation (excluding the pre-minted BPT held by the pool),
    /// with 18 decimals.
    pub total_shares: Bfp,
}

impl StablePool {
    pub fn new(
        id: PoolId,
        swap_fee: Bfp,
        tokens: Vec<TokenState>,
        bpt_index: Option<usize>,
        amplification_parameter: AmplificationParameter,
        total_shares: Bfp,
    ) -> Self {
        Self {
            common: CommonPoolState::new(id, swap_fee),
            tokens,
            bpt_index,
            amplification_parameter,
            total_shares,
        }
    }

    fn pair(&self, token_in: &Token, token_out: &Token) -> Result<(usize, usize), Error> {
        pair_indices(
            self.tokens.iter().map(|t| &t.balance.token),
            token_in,
            token_out,
        )
    }

    fn is_bpt(&self, index: usize) -> bool {
        self.bpt_index == Some(index)
    }

    /// Index of a token among the balances that exclude the BPT.
    fn bptless(&self, index: usize) -> usize {
        match self.bpt_index {
            Some(bpt_index) if index > bpt_index => index - 1,
            _ => index,
        }
    }

    fn rated_balances_without_bpt(&self) -> Result<Vec<Bfp>, Error> {
        self.tokens
            .iter()
            .enumerate()
            .filter(|(index, _)| !self.is_bpt(*index))
            .map(|(_, token)| token.rated_balance())
            .collect()
    }

    /// Amplification factor scaled by the math precision.
    fn amp(&self) -> Result<U256, Error> {
        self.amplification_parameter
            .with_base(*AMP_PRECISION)
            .ok_or(Error::MulOverflow)
    }

    /// `balance_out * A`, using the circulating supply when buying BPT.
    pub fn get_normalized_liquidity(
        &self,
        token_in: &Token,
        token_out: &Token,
    ) -> Result<Bfp, Error> {
        let (_, index_out) = self.pair(token_in, token_out)?;
        let balance_out = if self.is_bpt(index_out) {
            self.total_shares
        } else {
            self.tokens[index_out].rated_balance()?
        };
        let amp = self
            .amplification_parameter
            .with_base(U256::one())
            .ok_or(Error::MulOverflow)?;
        Ok(Bfp::from_wei(balance_out.as_uint256().bmul(amp)?))
    }

    /// The curve tolerates trades close to the full balance, so the limit is
    /// almost all of `token_out`, converted to `token_in` units at its rate
    /// for `GivenIn`.
    pub fn get_limit_amount_swap(
        &self,
        token_in: &Token,
        token_out: &Token,
        kind: SwapKind,
    ) -> Result<U256, Error> {
        let (index_in, index_out) = self.pair(token_in, token_out)?;
        match kind {
            SwapKind::GivenIn => {
                let limit = self.tokens[index_out]
                    .rated_balance()?
                    .mul_down(*ALMOST_ONE)?
                    .div_down(self.tokens[index_in].rate)?;
                Ok(TokenAmount::from_scale18_amount(token_in.clone(), limit, false)?.amount)
            }
            SwapKind::GivenOut => {
                let balance = Bfp::from_wei(self.tokens[index_out].balance.amount);
                Ok(balance.mul_down(*ALMOST_ONE)?.as_uint256())
            }
        }
    }

    pub fn swap_given_in(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: &TokenAmount,
    ) -> Result<TokenAmount, Error> {
        let (index_in, index_out) = self.pair(token_in, token_out)?;
        ensure_within_limit(
            amount_in.amount,
            self.get_limit_amount_swap(token_in, token_out, SwapKind::GivenIn)?,
        )?;

        let fee = self.common.swap_fee;
        // Token swaps pay the fee on the raw amount before upscaling. Joins
        // and exits charge it inside the BPT math.
        let amount_in = if self.is_bpt(index_in) || self.is_bpt(index_out) {
            amount_in.clone()
        } else {
            TokenAmount::from_raw_amount(
                token_in.clone(),
                subtract_swap_fee_amount(amount_in.amount, fee)?,
            )
        };
        let amount_in = amount_in.scale18()?.mul_down(self.tokens[index_in].rate)?;
        let mut balances = self.rated_balances_without_bpt()?;
        let amp = self.amp()?;

        let amount_out = if self.is_bpt(index_in) {
            stable_math::calc_token_out_given_exact_bpt_in(
                amp,
                &balances,
                self.bptless(index_out),
                amount_in,
                self.total_shares,
                fee,
            )?
        } else if self.is_bpt(index_out) {
            let mut amounts_in = vec![Bfp::zero(); balances.len()];
            amounts_in[self.bptless(index_in)] = amount_in;
            stable_math::calc_bpt_out_given_exact_tokens_in(
                amp,
                &balances,
                &amounts_in,
                self.total_shares,
                fee,
            )?
        } else {
            stable_math::calc_out_given_in(
                amp,
                &mut balances,
                self.bptless(index_in),
                self.bptless(index_out),
                amount_in,
            )?
        };

        let amount_out = amount_out.div_down(self.tokens[index_out].rate)?;
        TokenAmount::from_scale18_amount(token_out.clone(), amount_out, false)
    }

    pub fn swap_given_out(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_out: &TokenAmount,
    ) -> Result<TokenAmount, Error> {
        let (index_in, index_out) = self.pair(token_in, token_out)?;
        ensure_within_limit(
            amount_out.amount,
            self.get_limit_amount_swap(token_in, token_out, SwapKind::GivenOut)?,
        )?;

        let amount_out = amount_out.scale18()?.mul_up(self.tokens[index_out].rate)?;
        let mut balances = self.rated_balances_without_bpt()?;
        let amp = self.amp()?;
        let fee = self.common.swap_fee;

        let amount_in = if self.is_bpt(index_in) {
            let mut amounts_out = vec![Bfp::zero(); balances.len()];
            amounts_out[self.bptless(index_out)] = amount_out;
            stable_math::calc_bpt_in_given_exact_tokens_out(
                amp,
                &balances,
                &amounts_out,
                self.total_shares,
                fee,
            )?
        } else if self.is_bpt(index_out) {
            stable_math::calc_token_in_given_exact_bpt_out(
                amp,
                &balances,
                self.bptless(index_in),
                amount_out,
                self.total_shares,
                fee,
            )?
        } else {
            stable_math::calc_in_given_out(
                amp,
                &mut balances,
                self.bptless(index_in),
                self.bptless(index_out),
                amount_out,
            )?
        };

        let amount_in = amount_in.div_up(self.tokens[index_in].rate)?;
        let amount_in = TokenAmount::from_scale18_amount(token_in.clone(), amount_in, true)?;
        if self.is_bpt(index_in) || self.is_bpt(index_out) {
            return Ok(amount_in);
        }
        Ok(TokenAmount::from_raw_amount(
            token_in.clone(),
            add_swap_fee_amount(amount_in.amount, fee)?,
        ))
    }

    /// Moves the token balances. BPT paid into the pool leaves circulation,
    /// BPT paid out enters it.
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
        let total_shares = if self.is_bpt(index_in) {
            self.total_shares.sub(amount_in.scale18()?)?
        } else if self.is_bpt(index_out) {
            self.total_shares.add(amount_out.scale18()?)?
        } else {
            self.total_shares
        };

        self.tokens[index_in].balance.amount = balance_in;
        self.tokens[index_out].balance.amount = balance_out;
        self.total_shares = total_shares;
        Ok(())
    }
}
