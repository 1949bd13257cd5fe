//! Splits a swap across candidate paths.
//!
//! Candidates are first quoted with the full amount. The best few are then
//! combined: for every number of paths `k` the amount is split in proportion
//! to the paths' normalized liquidity and improved by moving halving shares
//! between pairs of paths. Every allocation is priced sequentially on its own
//! copy of the pool snapshot so that paths sharing a pool see each other's
//! price impact.

use {
    crate::{
        config::SwapOptions,
        math::Error,
        path::{Path, PathWithAmount},
        path_graph::PathGraph,
        pools::{PoolSnapshot, SwapKind},
        swap::Swap,
        token::{Token, TokenAmount},
    },
    itertools::Itertools,
    primitive_types::{U256, U512},
    std::cmp::Ordering,
};

/// Routes a swap of `amount` through `pools`.
///
/// `amount` is the raw amount of `token_in` for [`SwapKind::GivenIn`] and of
/// `token_out` for [`SwapKind::GivenOut`]. Returns `Ok(None)` when no
/// combination of paths can execute the swap.
pub fn sor_get_swaps_with_pools(
    token_in: &Token,
    token_out: &Token,
    kind: SwapKind,
    amount: U256,
    pools: &PoolSnapshot,
    options: &SwapOptions,
) -> Result<Option<Swap>, Error> {
    Router::new(pools, options).route(token_in, token_out, kind, amount)
}

pub struct Router<'a> {
    pools: &'a PoolSnapshot,
    options: &'a SwapOptions,
}

/// A priced split of the amount.
#[derive(Debug)]
struct Allocation {
    paths: Vec<PathWithAmount>,
    /// Sum of the amounts computed by the pools.
    quoted: U256,
}

impl<'a> Router<'a> {
    pub fn new(pools: &'a PoolSnapshot, options: &'a SwapOptions) -> Self {
        Self { pools, options }
    }

    pub fn route(
        &self,
        token_in: &Token,
        token_out: &Token,
        kind: SwapKind,
        amount: U256,
    ) -> Result<Option<Swap>, Error> {
        token_in.scaling_factor()?;
        token_out.scaling_factor()?;
        if amount.is_zero() || token_in.is_underlying_equal(token_out) {
            return Ok(None);
        }

        let traversal = &self.options.graph_traversal_config;
        let graph = PathGraph::new(self.pools, traversal.pool_ids_to_include.as_deref());
        let candidates = graph.candidate_paths(token_in, token_out, traversal);
        if candidates.is_empty() {
            tracing::debug!(%token_in, %token_out, "no candidate paths");
            return Ok(None);
        }

        let given = TokenAmount::from_raw_amount(
            match kind {
                SwapKind::GivenIn => token_in.clone(),
                SwapKind::GivenOut => token_out.clone(),
            },
            amount,
        );
        let paths = self.split_candidates(candidates, kind, &given);

        let mut best: Option<Allocation> = None;
        for k in 1..=paths.len() {
            let Some(allocation) = self.optimize(&paths[..k], kind, &given) else {
                continue;
            };
            tracing::trace!(k, quoted = %allocation.quoted, "best allocation");
            if improves(kind, &allocation, best.as_ref()) {
                best = Some(allocation);
            }
        }

        let Some(best) = best else {
            tracing::debug!(%given, "no feasible allocation");
            return Ok(None);
        };
        tracing::debug!(
            paths = best.paths.len(),
            quoted = %best.quoted,
            %given,
            "routed swap"
        );
        Swap::new(best.paths).map(Some)
    }

    /// Orders candidates for splitting: paths that can take the whole
    /// amount by quote quality, then the others by liquidity.
    fn split_candidates(
        &self,
        candidates: Vec<Path>,
        kind: SwapKind,
        given: &TokenAmount,
    ) -> Vec<Path> {
        let (mut feasible, infeasible): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .map(|path| {
                let quote = PathWithAmount::quote(path.clone(), kind, given.clone(), self.pools);
                if let Err(err) = &quote {
                    tracing::trace!(
                        ?err,
                        pools = ?path.pools(),
                        "path cannot take the full amount"
                    );
                }
                (path, quote.ok().map(|quote| quote.quoted_amount().amount))
            })
            .partition(|(_, quoted)| quoted.is_some());

        feasible.sort_by(|(_, a), (_, b)| match (a, b) {
            (Some(a), Some(b)) if is_better(kind, *a, *b) => Ordering::Less,
            (Some(a), Some(b)) if is_better(kind, *b, *a) => Ordering::Greater,
            _ => Ordering::Equal,
        });

        feasible
            .into_iter()
            .chain(infeasible)
            .map(|(path, _)| path)
            .take(self.options.max_paths)
            .collect()
    }

    /// Best allocation of `given` across all of `paths`, if any is feasible.
    fn optimize(&self, paths: &[Path], kind: SwapKind, given: &TokenAmount) -> Option<Allocation> {
        let touched = self.pools.subset(paths.iter().flat_map(Path::pools));
        let mut amounts = proportional_split(paths, given.amount);
        let mut best = evaluate(&touched, paths, &amounts, kind, given);

        for iteration in 0..self.options.refinement_iterations {
            for (from, to) in (0..paths.len()).cartesian_product(0..paths.len()) {
                let shift = amounts[from] >> (iteration + 1);
                if from == to || shift.is_zero() {
                    continue;
                }
                let mut candidate = amounts.clone();
                candidate[from] -= shift;
                candidate[to] += shift;

                let Some(allocation) = evaluate(&touched, paths, &candidate, kind, given) else {
                    continue;
                };
                if improves(kind, &allocation, best.as_ref()) {
                    amounts = candidate;
                    best = Some(allocation);
                }
            }
        }
        best
    }
}

/// Prices every path with its share on a fresh copy of `pools`. Paths with
/// a zero share are left out.
fn evaluate(
    pools: &PoolSnapshot,
    paths: &[Path],
    amounts: &[U256],
    kind: SwapKind,
    given: &TokenAmount,
) -> Option<Allocation> {
    let mut working = pools.clone();
    let mut priced = Vec::with_capacity(paths.len());
    let mut quoted = U256::zero();
    for (path, amount) in paths.iter().zip(amounts) {
        if amount.is_zero() {
            continue;
        }
        let amount = TokenAmount::from_raw_amount(given.token.clone(), *amount);
        let path = match PathWithAmount::price(path.clone(), kind, amount, &mut working, true) {
            Ok(path) => path,
            Err(err) => {
                tracing::trace!(?err, pools = ?path.pools(), "allocation infeasible");
                return None;
            }
        };
        quoted = quoted.checked_add(path.quoted_amount().amount)?;
        priced.push(path);
    }
    (!priced.is_empty()).then_some(Allocation {
        paths: priced,
        quoted,
    })
}

/// Whether `a` is a strictly better quote than `b`.
fn is_better(kind: SwapKind, a: U256, b: U256) -> bool {
    match kind {
        SwapKind::GivenIn => a > b,
        SwapKind::GivenOut => a < b,
    }
}

fn improves(kind: SwapKind, candidate: &Allocation, best: Option<&Allocation>) -> bool {
    best.is_none_or(|best| is_better(kind, candidate.quoted, best.quoted))
}

/// Splits `amount` in proportion to the paths' normalized liquidity, or
/// evenly if they report none. The rounding dust goes to the last path.
fn proportional_split(paths: &[Path], amount: U256) -> Vec<U256> {
    let weights: Vec<U256> = paths
        .iter()
        .map(|path| path.normalized_liquidity().as_uint256())
        .collect();
    let total = weights
        .iter()
        .try_fold(U256::zero(), |total, weight| total.checked_add(*weight))
        .filter(|total| !total.is_zero());
    let (weights, total) = match total {
        Some(total) => (weights, total),
        None => (vec![U256::one(); paths.len()], U256::from(paths.len())),
    };

    let mut amounts: Vec<U256> = weights
        .iter()
        .map(|weight| {
            let share = amount.full_mul(*weight) / U512::from(total);
            U256::try_from(share).unwrap_or(amount)
        })
        .collect();
    let assigned = amounts[..amounts.len() - 1]
        .iter()
        .fold(U256::zero(), |sum, share| sum.saturating_add(*share));
    if let Some(last) = amounts.last_mut() {
        *last = amount.saturating_sub(assigned);
    }
    amounts
}
