//! The priced result of a routing request and its Vault representation.

use {
    crate::{
        math::Error,
        path::PathWithAmount,
        pools::{PoolId, PoolSnapshot, SwapKind},
        token::TokenAmount,
    },
    indexmap::IndexSet,
    number::serialization::HexOrDecimalU256,
    primitive_types::{H160, U256},
    serde::Serialize,
    serde_with::serde_as,
};

/// Argument of the Vault's `swap` function.
#[serde_as]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleSwap {
    pub pool_id: PoolId,
    pub kind: SwapKind,
    pub asset_in: H160,
    pub asset_out: H160,
    #[serde_as(as = "HexOrDecimalU256")]
    pub amount: U256,
}

/// One step of the Vault's `batchSwap`. An amount of zero means "the amount
/// produced by the previous step".
#[serde_as]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSwapStep {
    pub pool_id: PoolId,
    pub asset_in_index: usize,
    pub asset_out_index: usize,
    #[serde_as(as = "HexOrDecimalU256")]
    pub amount: U256,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Swaps {
    Single(SingleSwap),
    Batch {
        steps: Vec<BatchSwapStep>,
        assets: Vec<H160>,
    },
}

/// A routed swap: the priced paths, their aggregate amounts and the Vault
/// calls executing them.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Swap {
    kind: SwapKind,
    #[serde(skip)]
    paths: Vec<PathWithAmount>,
    input_amount: TokenAmount,
    output_amount: TokenAmount,
    swaps: Swaps,
}

impl Swap {
    /// Aggregates priced paths. All paths must be of the same kind and
    /// connect the same pair of tokens.
    pub fn new(paths: Vec<PathWithAmount>) -> Result<Self, Error> {
        let first = paths.first().ok_or(Error::InvalidPath)?;
        let kind = first.kind();
        let mut input_amount = TokenAmount::zero(first.input_amount().token.clone());
        let mut output_amount = TokenAmount::zero(first.output_amount().token.clone());
        for path in &paths {
            if path.kind() != kind {
                return Err(Error::InvalidPath);
            }
            // `add` rejects paths between other tokens
            input_amount = input_amount.add(path.input_amount())?;
            output_amount = output_amount.add(path.output_amount())?;
        }

        let swaps = Self::vault_swaps(kind, &paths);
        Ok(Self {
            kind,
            paths,
            input_amount,
            output_amount,
            swaps,
        })
    }

    fn vault_swaps(kind: SwapKind, paths: &[PathWithAmount]) -> Swaps {
        if let [path] = paths {
            if let [hop] = path.hops() {
                return Swaps::Single(SingleSwap {
                    pool_id: hop.pool,
                    kind,
                    asset_in: path.path().token_in().address,
                    asset_out: path.path().token_out().address,
                    amount: path.given_amount().amount,
                });
            }
        }

        let mut assets = IndexSet::new();
        let mut steps = Vec::new();
        for path in paths {
            let tokens = path.path().tokens();
            let indices: Vec<usize> = tokens
                .iter()
                .map(|token| assets.insert_full(token.address).0)
                .collect();
            let hops = path.path().pools().iter().enumerate();
            let step = |(i, pool): (usize, &PoolId), amount: U256| BatchSwapStep {
                pool_id: *pool,
                asset_in_index: indices[i],
                asset_out_index: indices[i + 1],
                amount,
            };
            match kind {
                SwapKind::GivenIn => steps.extend(hops.map(|hop| {
                    let amount = if hop.0 == 0 {
                        path.input_amount().amount
                    } else {
                        U256::zero()
                    };
                    step(hop, amount)
                })),
                SwapKind::GivenOut => {
                    let last = tokens.len() - 2;
                    steps.extend(hops.rev().map(|hop| {
                        let amount = if hop.0 == last {
                            path.output_amount().amount
                        } else {
                            U256::zero()
                        };
                        step(hop, amount)
                    }))
                }
            }
        }

        Swaps::Batch {
            steps,
            assets: assets.into_iter().collect(),
        }
    }

    pub fn kind(&self) -> SwapKind {
        self.kind
    }

    pub fn paths(&self) -> &[PathWithAmount] {
        &self.paths
    }

    pub fn input_amount(&self) -> &TokenAmount {
        &self.input_amount
    }

    pub fn output_amount(&self) -> &TokenAmount {
        &self.output_amount
    }

    pub fn swaps(&self) -> &Swaps {
        &self.swaps
    }

    pub fn is_batch_swap(&self) -> bool {
        matches!(self.swaps, Swaps::Batch { .. })
    }

    /// Re-prices the route against `pools` and returns the computed side:
    /// the total output for `GivenIn`, the total input for `GivenOut`.
    ///
    /// Paths are applied one after the other to a copy of the pools they
    /// touch, the same way the Vault executes them.
    pub fn query(&self, pools: &PoolSnapshot) -> Result<TokenAmount, Error> {
        let mut working = pools.subset(self.paths.iter().flat_map(|path| path.path().pools()));
        let mut total: Option<TokenAmount> = None;
        for path in &self.paths {
            let priced = PathWithAmount::price(
                path.path().clone(),
                self.kind,
                path.given_amount().clone(),
                &mut working,
                true,
            )?;
            total = Some(match total {
                Some(total) => total.add(priced.quoted_amount())?,
                None => priced.quoted_amount().clone(),
            });
        }
        total.ok_or(Error::InvalidPath)
    }
}
