//! Candidate path discovery over the token/pool graph.

use {
    crate::{
        config::GraphTraversalConfig,
        path::Path,
        pools::{BasePool, PoolId, PoolSnapshot},
        token::Token,
    },
    primitive_types::H160,
    std::{cmp::Reverse, collections::HashMap},
};

/// Adjacency from token addresses to the pools holding them.
pub struct PathGraph<'a> {
    pools: &'a PoolSnapshot,
    adjacency: HashMap<H160, Vec<PoolId>>,
    /// Linear pools in the graph.
    linear_pools: usize,
}

/// Walk state of the depth first search.
struct Walk {
    tokens: Vec<Token>,
    pools: Vec<PoolId>,
}

impl<'a> PathGraph<'a> {
    /// Builds the graph over all pools of the snapshot, or only the listed
    /// ones when `pool_ids_to_include` is set.
    pub fn new(pools: &'a PoolSnapshot, pool_ids_to_include: Option<&[PoolId]>) -> Self {
        let mut adjacency: HashMap<H160, Vec<PoolId>> = HashMap::new();
        let mut linear_pools = 0;
        for pool in pools.iter() {
            if pool_ids_to_include.is_some_and(|ids| !ids.contains(&pool.id())) {
                continue;
            }
            if pool.is_linear() {
                linear_pools += 1;
            }
            for token in pool.tokens() {
                adjacency.entry(token.address).or_default().push(pool.id());
            }
        }
        Self {
            pools,
            adjacency,
            linear_pools,
        }
    }

    /// Enumerates simple paths from `token_in` to `token_out` and returns the
    /// most liquid ones, best first. Direct paths are always part of the
    /// result, even with a `max_depth` of zero.
    pub fn candidate_paths(
        &self,
        token_in: &Token,
        token_out: &Token,
        config: &GraphTraversalConfig,
    ) -> Vec<Path> {
        if token_in.is_underlying_equal(token_out) {
            return Vec::new();
        }

        let mut paths: Vec<Path> = self
            .walks(token_in, token_out, config)
            .into_iter()
            .filter(|walk| self.is_allowed(walk, config))
            .filter_map(|walk| match Path::new(walk.tokens, walk.pools, self.pools) {
                Ok(path) => Some(path),
                Err(err) => {
                    tracing::trace!(?err, "discarding unpriceable path");
                    None
                }
            })
            .collect();
        paths.sort_by_key(|path| Reverse(path.normalized_liquidity()));

        let found = paths.len();
        let paths: Vec<Path> = paths
            .into_iter()
            .enumerate()
            .filter(|(rank, path)| *rank < config.approx_paths_to_return || path.pools().len() == 1)
            .map(|(_, path)| path)
            .collect();
        tracing::debug!(%token_in, %token_out, found, kept = paths.len(), "candidate paths");
        paths
    }

    fn walks(
        &self,
        token_in: &Token,
        token_out: &Token,
        config: &GraphTraversalConfig,
    ) -> Vec<Walk> {
        let mut found = Vec::new();
        let mut walk = Walk {
            tokens: vec![token_in.clone()],
            pools: Vec::new(),
        };
        let depth = config.max_depth.max(1);
        self.search(&mut walk, token_out, depth, config, &mut found);
        found
    }

    fn search(
        &self,
        walk: &mut Walk,
        token_out: &Token,
        depth_left: usize,
        config: &GraphTraversalConfig,
        found: &mut Vec<Walk>,
    ) {
        let Some(current) = walk.tokens.last().map(|token| token.wrapped) else {
            return;
        };
        let Some(pool_ids) = self.adjacency.get(&current) else {
            return;
        };

        for id in pool_ids {
            if walk.pools.contains(id) {
                continue;
            }
            let Some(pool) = self.pools.get(id) else {
                continue;
            };
            for next in pool.tokens() {
                if next.address == current || self.visited(walk, next) {
                    continue;
                }
                if next.address == token_out.wrapped {
                    let mut tokens = walk.tokens.clone();
                    tokens.push(token_out.clone());
                    let mut pools = walk.pools.clone();
                    pools.push(*id);
                    found.push(Walk { tokens, pools });
                } else if depth_left > 1 {
                    walk.tokens.push(next.clone());
                    walk.pools.push(*id);
                    if self.may_be_allowed(walk, depth_left - 1, config) {
                        self.search(walk, token_out, depth_left - 1, config, found);
                    }
                    walk.tokens.pop();
                    walk.pools.pop();
                }
            }
        }
    }

    fn visited(&self, walk: &Walk, token: &Token) -> bool {
        walk.tokens.iter().any(|t| t.wrapped == token.address)
    }

    fn linear_pools_of(&self, walk: &Walk) -> Vec<&BasePool> {
        walk.pools
            .iter()
            .filter_map(|id| self.pools.get(id))
            .filter(|pool| pool.is_linear())
            .collect()
    }

    /// Tokens strictly between the ends of `walk` that no linear pool of the
    /// walk holds.
    fn non_boosted_hop_tokens(walk: &Walk, linear: &[&BasePool]) -> usize {
        walk.tokens[1..walk.tokens.len() - 1]
            .iter()
            .filter(|token| !linear.iter().any(|pool| pool.holds(token)))
            .count()
    }

    fn is_allowed(&self, walk: &Walk, config: &GraphTraversalConfig) -> bool {
        if walk.pools.len() == 1 {
            return true;
        }
        let linear = self.linear_pools_of(walk);
        if linear.is_empty() {
            return walk.pools.len() <= config.max_non_boosted_path_depth;
        }
        Self::non_boosted_hop_tokens(walk, &linear)
            <= config.max_non_boosted_hop_tokens_in_boosted_path
    }

    /// Whether a walk that has not reached `token_out` yet can still be
    /// extended, within `depth_left` more pools, into an allowed path. The
    /// last token of the walk is not counted since the next pool may cover
    /// it. Every later linear pool covers at most one earlier token besides
    /// the two on its own hop.
    fn may_be_allowed(
        &self,
        walk: &Walk,
        depth_left: usize,
        config: &GraphTraversalConfig,
    ) -> bool {
        let linear = self.linear_pools_of(walk);
        if linear.is_empty() && walk.pools.len() < config.max_non_boosted_path_depth {
            return true;
        }
        let later_linear = depth_left.min(self.linear_pools.saturating_sub(linear.len()));
        if linear.is_empty() && later_linear == 0 {
            return false;
        }
        Self::non_boosted_hop_tokens(walk, &linear).saturating_sub(later_linear)
            <= config.max_non_boosted_hop_tokens_in_boosted_path
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testing::{bpt, linear_pool, pool_id, stable_pool, token, weighted_pool},
        maplit::hashset,
        std::collections::HashSet,
    };

    fn pool_sets(paths: &[Path]) -> HashSet<Vec<PoolId>> {
        paths.iter().map(|path| path.pools().to_vec()).collect()
    }

    fn boosted_pool(n: u8, main: &Token, wrapped: &Token) -> BasePool {
        linear_pool(
            n,
            (main, "1000"),
            (wrapped, "1000"),
            "1",
            "2000",
            ("0", "5000"),
            "0",
        )
    }

    #[test]
    fn max_depth_bounds_the_search() {
        let a = token(1, 18);
        let b = token(2, 18);
        let c = token(3, 18);
        let d = token(4, 18);
        let e = token(5, 18);
        let pools = PoolSnapshot::new([
            weighted_pool(1, &[(&a, "1000", "0.5"), (&b, "1000", "0.5")], "0"),
            weighted_pool(2, &[(&a, "1000", "0.5"), (&c, "1000", "0.5")], "0"),
            weighted_pool(3, &[(&c, "1000", "0.5"), (&b, "1000", "0.5")], "0"),
            weighted_pool(4, &[(&a, "1000", "0.5"), (&d, "1000", "0.5")], "0"),
            weighted_pool(5, &[(&d, "1000", "0.5"), (&e, "1000", "0.5")], "0"),
            weighted_pool(6, &[(&e, "1000", "0.5"), (&b, "1000", "0.5")], "0"),
        ]);
        let graph = PathGraph::new(&pools, None);
        let config = GraphTraversalConfig {
            max_depth: 2,
            ..Default::default()
        };

        let paths = graph.candidate_paths(&a, &b, &config);
        assert_eq!(
            pool_sets(&paths),
            hashset! {vec![pool_id(1)], vec![pool_id(2), pool_id(3)]}
        );
        for path in &paths {
            assert_eq!((path.token_in(), path.token_out()), (&a, &b));
        }

        let config = GraphTraversalConfig::default();
        let paths = graph.candidate_paths(&a, &b, &config);
        assert!(pool_sets(&paths).contains(&vec![pool_id(4), pool_id(5), pool_id(6)]));
    }

    #[test]
    fn direct_pools_are_found_at_depth_zero() {
        let a = token(1, 18);
        let b = token(2, 18);
        let c = token(3, 18);
        let pools = PoolSnapshot::new([
            weighted_pool(1, &[(&a, "1000", "0.5"), (&b, "1000", "0.5")], "0"),
            weighted_pool(2, &[(&a, "1000", "0.5"), (&c, "1000", "0.5")], "0"),
            weighted_pool(3, &[(&c, "1000", "0.5"), (&b, "1000", "0.5")], "0"),
        ]);
        let graph = PathGraph::new(&pools, None);
        let config = GraphTraversalConfig {
            max_depth: 0,
            ..Default::default()
        };

        assert_eq!(
            pool_sets(&graph.candidate_paths(&a, &b, &config)),
            hashset! {vec![pool_id(1)]}
        );
    }

    #[test]
    fn dense_graphs_are_searched_only_to_the_non_boosted_depth() {
        let tokens: Vec<Token> = (1..=10).map(|byte| token(byte, 18)).collect();
        let pools = PoolSnapshot::new(
            tokens
                .iter()
                .enumerate()
                .flat_map(|(i, x)| tokens[i + 1..].iter().map(move |y| (x, y)))
                .zip(1..)
                .map(|((x, y), n)| {
                    weighted_pool(n, &[(x, "1000", "0.5"), (y, "1000", "0.5")], "0")
                }),
        );
        let graph = PathGraph::new(&pools, None);
        let config = GraphTraversalConfig::default();
        let (a, b) = (&tokens[0], &tokens[9]);

        // one direct walk, 8 through one other token and 8 * 7 through two
        let walks = graph.walks(a, b, &config);
        assert_eq!(walks.len(), 65);
        let max_depth = config.max_non_boosted_path_depth;
        assert!(walks.iter().all(|walk| walk.pools.len() <= max_depth));

        let paths = graph.candidate_paths(a, b, &config);
        assert!(paths.len() <= config.approx_paths_to_return + 1);
        assert!(paths.iter().any(|path| path.pools().len() == 1));
    }

    #[test]
    fn non_boosted_hops_may_lead_into_a_linear_pool() {
        let a = token(1, 18);
        let c = token(3, 18);
        let d = token(4, 18);
        let main = token(5, 18);
        let wrapped = token(6, 18);
        let pools = PoolSnapshot::new([
            weighted_pool(1, &[(&a, "1000", "0.5"), (&c, "1000", "0.5")], "0"),
            weighted_pool(2, &[(&c, "1000", "0.5"), (&d, "1000", "0.5")], "0"),
            weighted_pool(3, &[(&d, "1000", "0.5"), (&main, "1000", "0.5")], "0"),
            boosted_pool(4, &main, &wrapped),
        ]);
        let graph = PathGraph::new(&pools, None);

        // four pools, but only `c` and `d` are outside the linear pool
        let paths = graph.candidate_paths(&a, &bpt(4), &GraphTraversalConfig::default());
        assert_eq!(
            pool_sets(&paths),
            hashset! {vec![pool_id(1), pool_id(2), pool_id(3), pool_id(4)]}
        );

        let config = GraphTraversalConfig {
            max_non_boosted_hop_tokens_in_boosted_path: 1,
            ..Default::default()
        };
        assert!(graph.candidate_paths(&a, &bpt(4), &config).is_empty());
    }

    #[test]
    fn ranks_by_liquidity_and_keeps_direct_paths() {
        let a = token(1, 18);
        let b = token(2, 18);
        let c = token(3, 18);
        let pools = PoolSnapshot::new([
            weighted_pool(1, &[(&a, "10", "0.5"), (&b, "10", "0.5")], "0"),
            weighted_pool(2, &[(&a, "1000", "0.5"), (&c, "1000", "0.5")], "0"),
            weighted_pool(3, &[(&c, "1000", "0.5"), (&b, "1000", "0.5")], "0"),
            weighted_pool(4, &[(&a, "500", "0.5"), (&c, "500", "0.5")], "0"),
        ]);
        let graph = PathGraph::new(&pools, None);
        let config = GraphTraversalConfig {
            approx_paths_to_return: 1,
            ..Default::default()
        };

        let paths = graph.candidate_paths(&a, &b, &config);
        let pools: Vec<_> = paths.iter().map(|path| path.pools().to_vec()).collect();
        assert_eq!(pools, vec![vec![pool_id(2), pool_id(3)], vec![pool_id(1)]]);
    }

    #[test]
    fn respects_pool_filter_and_non_boosted_depth() {
        let a = token(1, 18);
        let b = token(2, 18);
        let c = token(3, 18);
        let d = token(4, 18);
        let pools = PoolSnapshot::new([
            weighted_pool(1, &[(&a, "1000", "0.5"), (&b, "1000", "0.5")], "0"),
            weighted_pool(2, &[(&a, "1000", "0.5"), (&c, "1000", "0.5")], "0"),
            weighted_pool(3, &[(&c, "1000", "0.5"), (&d, "1000", "0.5")], "0"),
            weighted_pool(4, &[(&d, "1000", "0.5"), (&b, "1000", "0.5")], "0"),
        ]);

        let only = [pool_id(2), pool_id(3), pool_id(4)];
        let graph = PathGraph::new(&pools, Some(&only));
        let mut config = GraphTraversalConfig::default();
        assert_eq!(
            pool_sets(&graph.candidate_paths(&a, &b, &config)),
            hashset! {vec![pool_id(2), pool_id(3), pool_id(4)]}
        );

        config.max_non_boosted_path_depth = 2;
        assert!(graph.candidate_paths(&a, &b, &config).is_empty());
    }

    #[test]
    fn boosted_paths_go_through_linear_bpts() {
        // usdc -> bb-usdc (linear) -> bb-dai (composable stable) -> dai (linear)
        let usdc = token(1, 6);
        let ausdc = token(2, 6);
        let dai = token(3, 18);
        let adai = token(4, 18);
        let pools = PoolSnapshot::new([
            boosted_pool(1, &usdc, &ausdc),
            boosted_pool(2, &dai, &adai),
            stable_pool(3, &[(&bpt(1), "2000"), (&bpt(2), "2000")], 200, "0.0001"),
        ]);
        let graph = PathGraph::new(&pools, None);

        let paths = graph.candidate_paths(&usdc, &dai, &GraphTraversalConfig::default());
        assert_eq!(
            pool_sets(&paths),
            hashset! {vec![pool_id(1), pool_id(3), pool_id(2)]}
        );
        assert!(paths[0].is_boosted());
        assert_eq!(paths[0].tokens()[1], bpt(1));

        // both intermediate tokens are held by linear pools of the path
        let config = GraphTraversalConfig {
            max_non_boosted_hop_tokens_in_boosted_path: 0,
            ..Default::default()
        };
        assert_eq!(graph.candidate_paths(&usdc, &dai, &config).len(), 1);
    }

    #[test]
    fn native_tokens_route_through_their_wrapped_version() {
        let weth = token(1, 18);
        let eth = Token::native(1, H160::repeat_byte(0x7e), 18, weth.address);
        let dai = token(2, 18);
        let pool = weighted_pool(1, &[(&weth, "1000", "0.5"), (&dai, "1000", "0.5")], "0");
        let pools = PoolSnapshot::new([pool]);
        let graph = PathGraph::new(&pools, None);
        let config = GraphTraversalConfig::default();

        let paths = graph.candidate_paths(&eth, &dai, &config);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].token_in(), &eth);
        assert!(graph.candidate_paths(&eth, &weth, &config).is_empty());
    }
}
