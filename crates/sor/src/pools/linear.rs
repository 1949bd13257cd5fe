//! Linear pools: a main token, its wrapped version and the pool's BPT.
//!
//! The whole BPT supply is minted to the pool on creation, so the BPT in
//! circulation is the difference between that cap and the BPT the pool still
//! holds. Wrapped amounts enter the math in main token units, i.e. multiplied
//! by the wrapped rate.

use {
    super::{
        ALMOST_ONE,
        CommonPoolState,
        PoolId,
        SwapKind,
        ensure_within_limit,
        pair_indices,
        token_index,
    },
    crate::{
        math::{
            Bfp,
            Error,
            checked::BalU256,
            linear_math::{self, Balances, Params},
        },
        token::{Token, TokenAmount},
    },
    primitive_types::U256,
    std::sync::LazyLock,
};

/// BPT minted on pool creation, `2^112 - 1`.
pub static MAX_TOKEN_BALANCE: LazyLock<U256> = LazyLock::new(|| (U256::one() << 112) - 1);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Role {
    Main,
    Wrapped,
    Bpt,
}

#[derive(Clone, Debug)]
pub struct LinearPool {
    pub common: CommonPoolState,
    pub main: TokenAmount,
    pub wrapped: TokenAmount,
    /// Main token value of one wrapped token.
    pub wrapped_rate: Bfp,
    /// BPT still held by the pool.
    pub bpt: TokenAmount,
    pub lower_target: Bfp,
    pub upper_target: Bfp,
}

impl LinearPool {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: PoolId,
        swap_fee: Bfp,
        main: TokenAmount,
        wrapped: TokenAmount,
        wrapped_rate: Bfp,
        bpt: TokenAmount,
        lower_target: Bfp,
        upper_target: Bfp,
    ) -> Self {
        Self {
            common: CommonPoolState::new(id, swap_fee),
            main,
            wrapped,
            wrapped_rate,
            bpt,
            lower_target,
            upper_target,
        }
    }

    /// The pool's BPT balance when `supply` BPT are in circulation.
    pub fn pool_held_bpt(bpt: Token, supply: Bfp) -> Result<TokenAmount, Error> {
        let held = MAX_TOKEN_BALANCE.bsub(supply.as_uint256())?;
        Ok(TokenAmount::from_raw_amount(bpt, held))
    }

    /// BPT in circulation.
    pub fn virtual_supply(&self) -> Result<Bfp, Error> {
        Ok(Bfp::from_wei(MAX_TOKEN_BALANCE.bsub(self.bpt.amount)?))
    }

    fn roles(&self, token_in: &Token, token_out: &Token) -> Result<(Role, Role), Error> {
        let (index_in, index_out) = pair_indices(
            [&self.main.token, &self.wrapped.token, &self.bpt.token],
            token_in,
            token_out,
        )?;
        Ok((Self::role(index_in), Self::role(index_out)))
    }

    fn role(index: usize) -> Role {
        match index {
            0 => Role::Main,
            1 => Role::Wrapped,
            _ => Role::Bpt,
        }
    }

    fn balance(&self, role: Role) -> &TokenAmount {
        match role {
            Role::Main => &self.main,
            Role::Wrapped => &self.wrapped,
            Role::Bpt => &self.bpt,
        }
    }

    fn params(&self) -> Params {
        Params {
            fee: self.common.swap_fee,
            lower_target: self.lower_target,
            upper_target: self.upper_target,
        }
    }

    fn math_balances(&self) -> Result<Balances, Error> {
        Ok(Balances {
            main: self.main.scale18()?,
            wrapped: self.wrapped.scale18()?.mul_down(self.wrapped_rate)?,
            bpt_supply: self.virtual_supply()?,
        })
    }

    /// Main token value of one unit of the token with `role`.
    fn value_rate(&self, role: Role) -> Result<Bfp, Error> {
        match role {
            Role::Main => Ok(Bfp::one()),
            Role::Wrapped => Ok(self.wrapped_rate),
            Role::Bpt => {
                let balances = self.math_balances()?;
                if balances.bpt_supply.is_zero() {
                    return Ok(Bfp::one());
                }
                let nominal_main = linear_math::to_nominal(balances.main, &self.params())?;
                let invariant = nominal_main.add(balances.wrapped)?;
                invariant.div_down(balances.bpt_supply)
            }
        }
    }

    /// Main token value of the balance on the `token_out` side.
    pub fn get_normalized_liquidity(
        &self,
        token_in: &Token,
        token_out: &Token,
    ) -> Result<Bfp, Error> {
        let (_, role_out) = self.roles(token_in, token_out)?;
        let balances = self.math_balances()?;
        Ok(match role_out {
            Role::Main => balances.main,
            Role::Wrapped => balances.wrapped,
            Role::Bpt => balances.bpt_supply,
        })
    }

    /// Buying BPT is capped by what the pool still holds, everything else by
    /// almost all of the output balance. `GivenIn` limits are that cap
    /// converted to `token_in` at the current rates.
    pub fn get_limit_amount_swap(
        &self,
        token_in: &Token,
        token_out: &Token,
        kind: SwapKind,
    ) -> Result<U256, Error> {
        let (role_in, role_out) = self.roles(token_in, token_out)?;
        let out = self.balance(role_out);
        match kind {
            SwapKind::GivenOut => match role_out {
                Role::Bpt => Ok(out.amount),
                _ => {
                    let limit = Bfp::from_wei(out.amount).mul_down(*ALMOST_ONE)?;
                    Ok(limit.as_uint256())
                }
            },
            SwapKind::GivenIn => {
                let cap = match role_out {
                    Role::Bpt => out.scale18()?,
                    _ => out.scale18()?.mul_down(*ALMOST_ONE)?,
                };
                let limit = cap
                    .mul_down(self.value_rate(role_out)?)?
                    .div_down(self.value_rate(role_in)?)?;
                Ok(TokenAmount::from_scale18_amount(token_in.clone(), limit, false)?.amount)
            }
        }
    }

    pub fn swap_given_in(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: &TokenAmount,
    ) -> Result<TokenAmount, Error> {
        let (role_in, role_out) = self.roles(token_in, token_out)?;
        ensure_within_limit(
            amount_in.amount,
            self.get_limit_amount_swap(token_in, token_out, SwapKind::GivenIn)?,
        )?;

        let amount_in = amount_in.scale18()?;
        let balances = self.math_balances()?;
        let params = self.params();
        let rate = self.wrapped_rate;
        let main = balances.main;

        let amount_out = match (role_in, role_out) {
            (Role::Main, Role::Wrapped) => {
                let out = linear_math::calc_wrapped_out_per_main_in(amount_in, main, &params)?;
                out.div_down(rate)?
            }
            (Role::Main, Role::Bpt) => {
                linear_math::calc_bpt_out_per_main_in(amount_in, &balances, &params)?
            }
            (Role::Wrapped, Role::Main) => {
                let wrapped_in = amount_in.mul_down(rate)?;
                linear_math::calc_main_out_per_wrapped_in(wrapped_in, main, &params)?
            }
            (Role::Wrapped, Role::Bpt) => {
                let wrapped_in = amount_in.mul_down(rate)?;
                linear_math::calc_bpt_out_per_wrapped_in(wrapped_in, &balances, &params)?
            }
            (Role::Bpt, Role::Main) => {
                linear_math::calc_main_out_per_bpt_in(amount_in, &balances, &params)?
            }
            (Role::Bpt, Role::Wrapped) => {
                let out = linear_math::calc_wrapped_out_per_bpt_in(amount_in, &balances, &params)?;
                out.div_down(rate)?
            }
            (Role::Main, Role::Main) | (Role::Wrapped, Role::Wrapped) | (Role::Bpt, Role::Bpt) => {
                return Err(Error::TokenNotInPool);
            }
        };

        TokenAmount::from_scale18_amount(token_out.clone(), amount_out, false)
    }

    pub fn swap_given_out(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_out: &TokenAmount,
    ) -> Result<TokenAmount, Error> {
        let (role_in, role_out) = self.roles(token_in, token_out)?;
        ensure_within_limit(
            amount_out.amount,
            self.get_limit_amount_swap(token_in, token_out, SwapKind::GivenOut)?,
        )?;

        let amount_out = amount_out.scale18()?;
        let balances = self.math_balances()?;
        let params = self.params();
        let rate = self.wrapped_rate;
        let main = balances.main;

        let amount_in = match (role_in, role_out) {
            (Role::Main, Role::Wrapped) => {
                let wrapped_out = amount_out.mul_up(rate)?;
                linear_math::calc_main_in_per_wrapped_out(wrapped_out, main, &params)?
            }
            (Role::Main, Role::Bpt) => {
                linear_math::calc_main_in_per_bpt_out(amount_out, &balances, &params)?
            }
            (Role::Wrapped, Role::Main) => {
                let wrapped_in =
                    linear_math::calc_wrapped_in_per_main_out(amount_out, main, &params)?;
                wrapped_in.div_up(rate)?
            }
            (Role::Wrapped, Role::Bpt) => {
                let wrapped_in =
                    linear_math::calc_wrapped_in_per_bpt_out(amount_out, &balances, &params)?;
                wrapped_in.div_up(rate)?
            }
            (Role::Bpt, Role::Main) => {
                linear_math::calc_bpt_in_per_main_out(amount_out, &balances, &params)?
            }
            (Role::Bpt, Role::Wrapped) => {
                let wrapped_out = amount_out.mul_up(rate)?;
                linear_math::calc_bpt_in_per_wrapped_out(wrapped_out, &balances, &params)?
            }
            (Role::Main, Role::Main) | (Role::Wrapped, Role::Wrapped) | (Role::Bpt, Role::Bpt) => {
                return Err(Error::TokenNotInPool);
            }
        };

        TokenAmount::from_scale18_amount(token_in.clone(), amount_in, true)
    }

    /// BPT paid into the pool returns to the pool-held balance and so leaves
    /// circulation.
    pub fn update_balances(
        &mut self,
        amount_in: &TokenAmount,
        amount_out: &TokenAmount,
    ) -> Result<(), Error> {
        let tokens = [&self.main.token, &self.wrapped.token, &self.bpt.token];
        let role_in = Self::role(token_index(tokens, &amount_in.token)?);
        let role_out = Self::role(token_index(tokens, &amount_out.token)?);

        let balance_in = self.balance(role_in).amount.badd(amount_in.amount)?;
        let balance_out = self.balance(role_out).amount.bsub(amount_out.amount)?;
        self.balance_mut(role_in).amount = balance_in;
        self.balance_mut(role_out).amount = balance_out;
        Ok(())
    }

    fn balance_mut(&mut self, role: Role) -> &mut TokenAmount {
        match role {
            Role::Main => &mut self.main,
            Role::Wrapped => &mut self.wrapped,
            Role::Bpt => &mut self.bpt,
        }
    }
}
