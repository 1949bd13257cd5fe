//! Pool and token fixtures for unit tests.

use {
    crate::{
        math::{Bfp, PowVersion},
        pools::{
            AmplificationParameter,
            BasePool,
            LinearPool,
            PoolId,
            StablePool,
            WeightedPool,
            pool_address_from_id,
            stable,
            weighted,
        },
        token::{Token, TokenAmount},
    },
    primitive_types::{H160, H256, U256},
};

/// Token `0x0b0b..0b` for byte `0x0b`. Bytes from `0x80` on are reserved
/// for pools.
pub fn token(byte: u8, decimals: u8) -> Token {
    assert!(byte < 0x80);
    Token::new(1, H160::repeat_byte(byte), decimals)
}

pub fn pool_id(n: u8) -> PoolId {
    let mut id = [0_u8; 32];
    id[..20].fill(0x80 + n);
    id[31] = n;
    H256(id)
}

/// The BPT of pool `n`.
pub fn bpt(n: u8) -> Token {
    Token::new(1, pool_address_from_id(pool_id(n)), 18)
}

pub fn bfp(value: &str) -> Bfp {
    value.parse().unwrap()
}

pub fn human(token: &Token, amount: &str) -> TokenAmount {
    TokenAmount::from_human_amount(token.clone(), amount).unwrap()
}

/// Weighted pool from `(token, balance, weight)` triples.
pub fn weighted_pool(n: u8, tokens: &[(&Token, &str, &str)], fee: &str) -> BasePool {
    WeightedPool::new(
        pool_id(n),
        bfp(fee),
        tokens
            .iter()
            .map(|(token, balance, weight)| weighted::TokenState {
                balance: human(token, balance),
                weight: bfp(weight),
            })
            .collect(),
        PowVersion::V2,
    )
    .into()
}

/// Stable pool without a BPT from `(token, balance)` pairs, all rates one.
pub fn stable_pool(n: u8, tokens: &[(&Token, &str)], amp: u64, fee: &str) -> BasePool {
    StablePool::new(
        pool_id(n),
        bfp(fee),
        tokens
            .iter()
            .map(|(token, balance)| stable::TokenState {
                balance: human(token, balance),
                rate: Bfp::one(),
            })
            .collect(),
        None,
        amplification(amp),
        Bfp::zero(),
    )
    .into()
}

pub fn amplification(amp: u64) -> AmplificationParameter {
    AmplificationParameter::try_new(U256::from(amp * 1000), U256::from(1000)).unwrap()
}

/// Linear pool with the given main and wrapped balances and `supply` BPT in
/// circulation.
pub fn linear_pool(
    n: u8,
    main: (&Token, &str),
    wrapped: (&Token, &str),
    wrapped_rate: &str,
    supply: &str,
    targets: (&str, &str),
    fee: &str,
) -> BasePool {
    LinearPool::new(
        pool_id(n),
        bfp(fee),
        human(main.0, main.1),
        human(wrapped.0, wrapped.1),
        bfp(wrapped_rate),
        LinearPool::pool_held_bpt(bpt(n), bfp(supply)).unwrap(),
        bfp(targets.0),
        bfp(targets.1),
    )
    .into()
}

/// Quotes `amount_in` for `token_out`, re-derives the input from that output
/// and asserts both inputs are at most `tolerance` wei apart.
pub fn assert_given_out_recovers_input(
    pool: &BasePool,
    amount_in: &TokenAmount,
    token_out: &Token,
    tolerance: U256,
) {
    let token_in = &amount_in.token;
    let out = pool.swap_given_in(token_in, token_out, amount_in).unwrap();
    let back = pool.swap_given_out(token_in, token_out, &out).unwrap();
    let gap = if back.amount > amount_in.amount {
        back.amount - amount_in.amount
    } else {
        amount_in.amount - back.amount
    };
    assert!(
        gap <= tolerance,
        "{} in, {} out, {} back: {gap} wei apart",
        amount_in.amount,
        out.amount,
        back.amount,
    );
}
