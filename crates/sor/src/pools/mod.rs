//! Pool snapshots and the swap logic of every supported pool type.
//!
//! A [`BasePool`] is a closed set of pool variants. Quoting (`swap_given_in`,
//! `swap_given_out`) never modifies a pool; balances only change through
//! [`BasePool::update_balances`] on a snapshot owned by the caller.

use {
    crate::{
        math::{Bfp, Error},
        token::{Token, TokenAmount},
    },
    indexmap::IndexMap,
    primitive_types::{H160, H256, U256},
    serde::{Deserialize, Serialize},
    std::sync::LazyLock,
    strum::{Display, EnumString},
};

pub mod linear;
pub mod stable;
pub mod weighted;

pub use {
    linear::LinearPool,
    stable::{AmplificationParameter, StablePool},
    weighted::WeightedPool,
};

pub type PoolId = H256;

/// Fraction of a balance that stable and linear pools are willing to quote
/// against.
pub static ALMOST_ONE: LazyLock<Bfp> =
    LazyLock::new(|| Bfp::from_wei(990_000_000_000_000_000_u128.into()));

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SwapKind {
    /// The input amount is fixed and the output is computed.
    GivenIn,
    /// The output amount is fixed and the input is computed.
    GivenOut,
}

#[derive(Clone, Copy, Debug, Display, EnumString, Eq, Hash, PartialEq)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PoolType {
    Weighted,
    ComposableStable,
    Linear,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommonPoolState {
    pub id: PoolId,
    pub address: H160,
    pub swap_fee: Bfp,
}

impl CommonPoolState {
    pub fn new(id: PoolId, swap_fee: Bfp) -> Self {
        Self {
            id,
            address: pool_address_from_id(id),
            swap_fee,
        }
    }
}

#[derive(Clone, Debug)]
pub enum BasePool {
    Weighted(WeightedPool),
    Stable(StablePool),
    Linear(LinearPool),
}

impl BasePool {
    pub fn common(&self) -> &CommonPoolState {
        match self {
            Self::Weighted(pool) => &pool.common,
            Self::Stable(pool) => &pool.common,
            Self::Linear(pool) => &pool.common,
        }
    }

    pub fn id(&self) -> PoolId {
        self.common().id
    }

    pub fn pool_type(&self) -> PoolType {
        match self {
            Self::Weighted(_) => PoolType::Weighted,
            Self::Stable(_) => PoolType::ComposableStable,
            Self::Linear(_) => PoolType::Linear,
        }
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Self::Linear(_))
    }

    /// Current balances, including the pool's own BPT where it is tradable.
    pub fn balances(&self) -> Vec<&TokenAmount> {
        match self {
            Self::Weighted(pool) => pool.tokens.iter().map(|t| &t.balance).collect(),
            Self::Stable(pool) => pool.tokens.iter().map(|t| &t.balance).collect(),
            Self::Linear(pool) => vec![&pool.main, &pool.wrapped, &pool.bpt],
        }
    }

    pub fn tokens(&self) -> Vec<&Token> {
        self.balances().into_iter().map(|b| &b.token).collect()
    }

    /// Whether the pool trades `token`, matching native tokens through their
    /// wrapped version.
    pub fn holds(&self, token: &Token) -> bool {
        self.tokens().iter().any(|t| t.address == token.wrapped)
    }

    /// Heuristic depth of the pool for the given pair, used to rank paths.
    pub fn get_normalized_liquidity(
        &self,
        token_in: &Token,
        token_out: &Token,
    ) -> Result<Bfp, Error> {
        match self {
            Self::Weighted(pool) => pool.get_normalized_liquidity(token_in, token_out),
            Self::Stable(pool) => pool.get_normalized_liquidity(token_in, token_out),
            Self::Linear(pool) => pool.get_normalized_liquidity(token_in, token_out),
        }
    }

    /// Largest raw amount of the fixed side of a swap (the input for
    /// `GivenIn`, the output for `GivenOut`) the pool will quote.
    pub fn get_limit_amount_swap(
        &self,
        token_in: &Token,
        token_out: &Token,
        kind: SwapKind,
    ) -> Result<U256, Error> {
        match self {
            Self::Weighted(pool) => pool.get_limit_amount_swap(token_in, token_out, kind),
            Self::Stable(pool) => pool.get_limit_amount_swap(token_in, token_out, kind),
            Self::Linear(pool) => pool.get_limit_amount_swap(token_in, token_out, kind),
        }
    }

    pub fn swap_given_in(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: &TokenAmount,
    ) -> Result<TokenAmount, Error> {
        ensure_token(amount_in, token_in)?;
        match self {
            Self::Weighted(pool) => pool.swap_given_in(token_in, token_out, amount_in),
            Self::Stable(pool) => pool.swap_given_in(token_in, token_out, amount_in),
            Self::Linear(pool) => pool.swap_given_in(token_in, token_out, amount_in),
        }
    }

    pub fn swap_given_out(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_out: &TokenAmount,
    ) -> Result<TokenAmount, Error> {
        ensure_token(amount_out, token_out)?;
        match self {
            Self::Weighted(pool) => pool.swap_given_out(token_in, token_out, amount_out),
            Self::Stable(pool) => pool.swap_given_out(token_in, token_out, amount_out),
            Self::Linear(pool) => pool.swap_given_out(token_in, token_out, amount_out),
        }
    }

    /// Applies an executed swap to the pool balances.
    pub fn update_balances(
        &mut self,
        amount_in: &TokenAmount,
        amount_out: &TokenAmount,
    ) -> Result<(), Error> {
        match self {
            Self::Weighted(pool) => pool.update_balances(amount_in, amount_out),
            Self::Stable(pool) => pool.update_balances(amount_in, amount_out),
            Self::Linear(pool) => pool.update_balances(amount_in, amount_out),
        }
    }
}

impl From<WeightedPool> for BasePool {
    fn from(pool: WeightedPool) -> Self {
        Self::Weighted(pool)
    }
}

impl From<StablePool> for BasePool {
    fn from(pool: StablePool) -> Self {
        Self::Stable(pool)
    }
}

impl From<LinearPool> for BasePool {
    fn from(pool: LinearPool) -> Self {
        Self::Linear(pool)
    }
}

/// The pools a routing request runs against, keyed by id in insertion order.
///
/// Cloning a snapshot gives an allocation pass its own working copy whose
/// balances can be mutated without affecting other requests.
#[derive(Clone, Debug, Default)]
pub struct PoolSnapshot {
    pools: IndexMap<PoolId, BasePool>,
}

impl PoolSnapshot {
    pub fn new(pools: impl IntoIterator<Item = BasePool>) -> Self {
        pools.into_iter().collect()
    }

    pub fn get(&self, id: &PoolId) -> Option<&BasePool> {
        self.pools.get(id)
    }

    pub fn get_mut(&mut self, id: &PoolId) -> Option<&mut BasePool> {
        self.pools.get_mut(id)
    }

    /// Copy of the listed pools only, for working sets that touch a few
    /// pools of a large snapshot. Unknown ids are skipped.
    pub fn subset<'a>(&self, ids: impl IntoIterator<Item = &'a PoolId>) -> Self {
        ids.into_iter()
            .filter_map(|id| self.pools.get(id).cloned())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BasePool> {
        self.pools.values()
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

impl FromIterator<BasePool> for PoolSnapshot {
    fn from_iter<I: IntoIterator<Item = BasePool>>(iter: I) -> Self {
        Self {
            pools: iter.into_iter().map(|pool| (pool.id(), pool)).collect(),
        }
    }
}

/// Position of `token` in a pool's token list. Native tokens are matched
/// through their wrapped ERC-20.
fn token_index<'a>(
    tokens: impl IntoIterator<Item = &'a Token>,
    token: &Token,
) -> Result<usize, Error> {
    tokens
        .into_iter()
        .position(|t| t.address == token.wrapped)
        .ok_or(Error::TokenNotInPool)
}

/// Positions of both sides of a swap. Swapping a token for itself is not a
/// pool operation.
fn pair_indices<'a>(
    tokens: impl IntoIterator<Item = &'a Token> + Clone,
    token_in: &Token,
    token_out: &Token,
) -> Result<(usize, usize), Error> {
    let index_in = token_index(tokens.clone(), token_in)?;
    let index_out = token_index(tokens, token_out)?;
    if index_in == index_out {
        return Err(Error::TokenNotInPool);
    }
    Ok((index_in, index_out))
}

fn ensure_token(amount: &TokenAmount, token: &Token) -> Result<(), Error> {
    if amount.token.is_underlying_equal(token) {
        Ok(())
    } else {
        Err(Error::TokenMismatch)
    }
}

fn ensure_within_limit(amount: U256, limit: U256) -> Result<(), Error> {
    if amount > limit {
        return Err(Error::SwapLimitExceeded);
    }
    Ok(())
}

fn add_swap_fee_amount(amount: U256, swap_fee: Bfp) -> Result<U256, Error> {
    // https://github.com/balancer-labs/balancer-v2-monorepo/blob/6c9e24e22d0c46cca6dd15861d3d33da61a60b98/pkg/core/contracts/pools/BasePool.sol#L454-L457
    let amount_with_fees = Bfp::from_wei(amount).div_up(swap_fee.complement())?;
    Ok(amount_with_fees.as_uint256())
}

fn subtract_swap_fee_amount(amount: U256, swap_fee: Bfp) -> Result<U256, Error> {
    // https://github.com/balancer-labs/balancer-v2-monorepo/blob/6c9e24e22d0c46cca6dd15861d3d33da61a60b98/pkg/core/contracts/pools/BasePool.sol#L462-L466
    let amount = Bfp::from_wei(amount);
    let fee_amount = amount.mul_up(swap_fee)?;
    let amount_without_fees = amount.sub(fee_amount)?;
    Ok(amount_without_fees.as_uint256())
}

/// Balancer V2 pool ids start with the pool address.
pub fn pool_address_from_id(pool_id: PoolId) -> H160 {
    let mut address = H160::default();
    address.0.copy_from_slice(&pool_id.0[..20]);
    address
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::{pool_id, token, weighted_pool},
        hex_literal::hex,
    };

    #[test]
    fn pool_address_is_id_prefix() {
        let id = H256(hex!(
            "5c6ee304399dbdb9c8ef030ab642b10820db8f56000200000000000000000014"
        ));
        assert_eq!(
            pool_address_from_id(id),
            H160(hex!("5c6ee304399dbdb9c8ef030ab642b10820db8f56"))
        );
        let common = CommonPoolState::new(id, Bfp::zero());
        assert_eq!(common.address, pool_address_from_id(id));
    }

    #[test]
    fn pool_type_names() {
        assert_eq!(PoolType::ComposableStable.to_string(), "COMPOSABLE_STABLE");
        assert_eq!("LINEAR".parse::<PoolType>().unwrap(), PoolType::Linear);
    }

    #[test]
    fn fee_helpers_round_in_favour_of_the_pool() {
        let fee: Bfp = "0.003".parse().unwrap();
        let subtract = |amount: u64| subtract_swap_fee_amount(amount.into(), fee).unwrap();
        let add = |amount: u64| add_swap_fee_amount(amount.into(), fee).unwrap();
        // 1000 - ceil(3)
        assert_eq!(subtract(1000), U256::from(997));
        // ceil(997 / 0.997)
        assert_eq!(add(997), U256::from(1000));
        assert_eq!(subtract(1), U256::zero());
        assert_eq!(add(1), U256::from(2));
    }

    #[test]
    fn snapshot_is_keyed_by_pool_id() {
        let a = token(1, 18);
        let b = token(2, 18);
        let pools = PoolSnapshot::new([
            weighted_pool(1, &[(&a, "100", "0.5"), (&b, "100", "0.5")], "0"),
            weighted_pool(2, &[(&a, "100", "0.5"), (&b, "100", "0.5")], "0"),
            weighted_pool(1, &[(&a, "200", "0.5"), (&b, "200", "0.5")], "0"),
        ]);
        assert_eq!(pools.len(), 2);
        let first = pools.get(&pool_id(1)).unwrap();
        assert_eq!(first.balances()[0].amount, U256::exp10(20) * 2);
        assert_eq!(first.pool_type(), PoolType::Weighted);
        assert!(first.holds(&a));
        assert!(!first.holds(&token(3, 18)));
    }

    #[test]
    fn subset_keeps_only_the_listed_pools() {
        let a = token(1, 18);
        let b = token(2, 18);
        let pools = PoolSnapshot::new(
            (1..=3).map(|id| weighted_pool(id, &[(&a, "100", "0.5"), (&b, "100", "0.5")], "0")),
        );
        let subset = pools.subset(&[pool_id(3), pool_id(9), pool_id(1)]);
        assert_eq!(subset.len(), 2);
        assert_eq!(
            subset.iter().map(BasePool::id).collect::<Vec<_>>(),
            vec![pool_id(3), pool_id(1)]
        );
        assert!(pools.subset(&[pool_id(9)]).is_empty());
    }

    #[test]
    fn rejects_mismatched_amounts_and_identical_tokens() {
        let a = token(1, 18);
        let b = token(2, 18);
        let pool = weighted_pool(1, &[(&a, "100", "0.5"), (&b, "100", "0.5")], "0");
        let amount = TokenAmount::from_raw_amount(b.clone(), 1);
        assert_eq!(
            pool.swap_given_in(&a, &b, &amount).unwrap_err(),
            Error::TokenMismatch
        );
        let amount = TokenAmount::from_raw_amount(a.clone(), 1);
        assert_eq!(
            pool.swap_given_in(&a, &a, &amount).unwrap_err(),
            Error::TokenNotInPool
        );
    }
}
