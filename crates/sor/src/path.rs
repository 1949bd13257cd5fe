//! Routes through the pool graph and their priced counterparts.

use {
    crate::{
        math::{Bfp, Error},
        pools::{PoolId, PoolSnapshot, SwapKind},
        token::{Token, TokenAmount},
    },
    std::collections::HashSet,
};

/// An ordered route `tokens[0] -> pools[0] -> tokens[1] -> ... -> tokens[n]`.
///
/// Paths only exist in validated form: every pool is part of the snapshot
/// the path was built from, holds both tokens of its hop and appears once.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Path {
    tokens: Vec<Token>,
    pools: Vec<PoolId>,
    is_boosted: bool,
    normalized_liquidity: Bfp,
}

impl Path {
    pub fn new(
        tokens: Vec<Token>,
        pools: Vec<PoolId>,
        snapshot: &PoolSnapshot,
    ) -> Result<Self, Error> {
        if pools.is_empty() || tokens.len() != pools.len() + 1 {
            return Err(Error::InvalidPath);
        }
        if pools.iter().collect::<HashSet<_>>().len() != pools.len() {
            return Err(Error::InvalidPath);
        }

        let mut is_boosted = false;
        let mut normalized_liquidity: Option<Bfp> = None;
        for (pair, id) in tokens.windows(2).zip(&pools) {
            let pool = snapshot.get(id).ok_or(Error::InvalidPath)?;
            let liquidity = pool.get_normalized_liquidity(&pair[0], &pair[1])?;
            is_boosted |= pool.is_linear();
            normalized_liquidity = Some(match normalized_liquidity {
                Some(current) => current.min(liquidity),
                None => liquidity,
            });
        }

        Ok(Self {
            tokens,
            pools,
            is_boosted,
            normalized_liquidity: normalized_liquidity.unwrap_or_default(),
        })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn pools(&self) -> &[PoolId] {
        &self.pools
    }

    pub fn token_in(&self) -> &Token {
        &self.tokens[0]
    }

    pub fn token_out(&self) -> &Token {
        &self.tokens[self.tokens.len() - 1]
    }

    /// Whether the path goes through at least one linear pool.
    pub fn is_boosted(&self) -> bool {
        self.is_boosted
    }

    /// Liquidity of the shallowest hop.
    pub fn normalized_liquidity(&self) -> Bfp {
        self.normalized_liquidity
    }

    /// `(token_in, pool, token_out)` for every hop, in path order.
    pub fn hops(&self) -> impl DoubleEndedIterator<Item = (&Token, &PoolId, &Token)> {
        self.tokens
            .windows(2)
            .zip(&self.pools)
            .map(|(pair, pool)| (&pair[0], pool, &pair[1]))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Hop {
    pub pool: PoolId,
    pub amount_in: TokenAmount,
    pub amount_out: TokenAmount,
}

/// A path priced for a concrete amount.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PathWithAmount {
    path: Path,
    kind: SwapKind,
    input_amount: TokenAmount,
    output_amount: TokenAmount,
    hops: Vec<Hop>,
}

impl PathWithAmount {
    /// Prices `amount` along `path`, optionally applying every hop to the
    /// pools in `snapshot` so that later quotes see the new balances.
    pub fn price(
        path: Path,
        kind: SwapKind,
        amount: TokenAmount,
        snapshot: &mut PoolSnapshot,
        mutate_balances: bool,
    ) -> Result<Self, Error> {
        let priced = Self::quote(path, kind, amount, snapshot)?;
        if mutate_balances {
            priced.apply(snapshot)?;
        }
        Ok(priced)
    }

    /// Prices `amount` along `path` without touching any pool. `GivenIn`
    /// amounts flow forward from the first pool, `GivenOut` amounts backward
    /// from the last one.
    pub fn quote(
        path: Path,
        kind: SwapKind,
        amount: TokenAmount,
        snapshot: &PoolSnapshot,
    ) -> Result<Self, Error> {
        let mut hops = Vec::with_capacity(path.pools.len());
        let mut current = amount;
        match kind {
            SwapKind::GivenIn => {
                if !current.token.is_underlying_equal(path.token_in()) {
                    return Err(Error::TokenMismatch);
                }
                for (token_in, id, token_out) in path.hops() {
                    let pool = snapshot.get(id).ok_or(Error::InvalidPath)?;
                    let amount_out = pool.swap_given_in(token_in, token_out, &current)?;
                    hops.push(Hop {
                        pool: *id,
                        amount_in: current,
                        amount_out: amount_out.clone(),
                    });
                    current = amount_out;
                }
            }
            SwapKind::GivenOut => {
                if !current.token.is_underlying_equal(path.token_out()) {
                    return Err(Error::TokenMismatch);
                }
                for (token_in, id, token_out) in path.hops().rev() {
                    let pool = snapshot.get(id).ok_or(Error::InvalidPath)?;
                    let amount_in = pool.swap_given_out(token_in, token_out, &current)?;
                    hops.push(Hop {
                        pool: *id,
                        amount_in: amount_in.clone(),
                        amount_out: current,
                    });
                    current = amount_in;
                }
                hops.reverse();
            }
        }

        let (input_amount, output_amount) = match (hops.first(), hops.last()) {
            (Some(first), Some(last)) => (first.amount_in.clone(), last.amount_out.clone()),
            _ => return Err(Error::InvalidPath),
        };
        Ok(Self {
            path,
            kind,
            input_amount,
            output_amount,
            hops,
        })
    }

    /// Applies the quoted hops to the pool balances of `snapshot`.
    pub fn apply(&self, snapshot: &mut PoolSnapshot) -> Result<(), Error> {
        for hop in &self.hops {
            snapshot
                .get_mut(&hop.pool)
                .ok_or(Error::InvalidPath)?
                .update_balances(&hop.amount_in, &hop.amount_out)?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> SwapKind {
        self.kind
    }

    pub fn input_amount(&self) -> &TokenAmount {
        &self.input_amount
    }

    pub fn output_amount(&self) -> &TokenAmount {
        &self.output_amount
    }

    /// The side of the swap that was fixed by the caller.
    pub fn given_amount(&self) -> &TokenAmount {
        match self.kind {
            SwapKind::GivenIn => &self.input_amount,
            SwapKind::GivenOut => &self.output_amount,
        }
    }

    /// The side of the swap computed by the pools.
    pub fn quoted_amount(&self) -> &TokenAmount {
        match self.kind {
            SwapKind::GivenIn => &self.output_amount,
            SwapKind::GivenOut => &self.input_amount,
        }
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }
}
