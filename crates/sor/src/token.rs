//! Token identities and amounts in native decimals.

use {
    crate::math::{Bfp, Error, checked::BalU256},
    anyhow::{Context, Result, ensure},
    number::serialization::HexOrDecimalU256,
    primitive_types::{H160, U256},
    serde::{Deserialize, Serialize},
    serde_with::serde_as,
    std::{
        fmt::{self, Display, Formatter},
        hash::{Hash, Hasher},
    },
};

/// Token identity. Two tokens are equal when they live on the same chain at
/// the same address; the remaining fields are metadata.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub chain_id: u64,
    pub address: H160,
    pub decimals: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// ERC-20 representation of the token. Equal to `address` for everything
    /// except the chain's native asset.
    pub wrapped: H160,
}

impl Token {
    /// An ERC-20 token.
    pub fn new(chain_id: u64, address: H160, decimals: u8) -> Self {
        Self {
            chain_id,
            address,
            decimals,
            symbol: None,
            name: None,
            wrapped: address,
        }
    }

    /// The native asset of a chain, routed through its wrapped ERC-20.
    pub fn native(chain_id: u64, address: H160, decimals: u8, wrapped: H160) -> Self {
        Self {
            wrapped,
            ..Self::new(chain_id, address, decimals)
        }
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn is_native(&self) -> bool {
        self.address != self.wrapped
    }

    /// Whether both tokens are economically the same asset, treating the
    /// native asset and its wrapped version as identical.
    pub fn is_underlying_equal(&self, other: &Token) -> bool {
        self.chain_id == other.chain_id && self.wrapped == other.wrapped
    }

    /// Factor converting raw amounts to 18 decimals.
    pub fn scaling_factor(&self) -> Result<U256, Error> {
        let exponent = 18_u8
            .checked_sub(self.decimals)
            .ok_or(Error::UnsupportedDecimals)?;
        Ok(U256::exp10(exponent.into()))
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address.hash(state);
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => f.write_str(symbol),
            None => write!(f, "{:?}", self.address),
        }
    }
}

/// A raw token amount in the token's own decimals.
///
/// The 18 decimal representation used by the pool math is always derived
/// with [`TokenAmount::scale18`] and never stored.
#[serde_as]
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenAmount {
    pub token: Token,
    #[serde_as(as = "HexOrDecimalU256")]
    pub amount: U256,
}

impl TokenAmount {
    pub fn from_raw_amount(token: Token, amount: impl Into<U256>) -> Self {
        Self {
            token,
            amount: amount.into(),
        }
    }

    /// Parses a human readable decimal amount such as `"1.5"`.
    pub fn from_human_amount(token: Token, amount: &str) -> Result<Self> {
        let (units, decimals) = amount.split_once('.').unwrap_or((amount, ""));
        ensure!(
            !units.is_empty()
                && decimals.len() <= usize::from(token.decimals)
                && units
                    .bytes()
                    .chain(decimals.bytes())
                    .all(|b| b.is_ascii_digit()),
            "invalid amount {amount:?} for a token with {} decimals",
            token.decimals
        );
        let padded = format!(
            "{units}{decimals:0<width$}",
            width = usize::from(token.decimals)
        );
        let amount = U256::from_dec_str(&padded).context("amount does not fit 256 bits")?;
        Ok(Self { token, amount })
    }

    /// Converts an 18 decimal amount back to the token's decimals with the
    /// given rounding direction.
    pub fn from_scale18_amount(token: Token, scale18: Bfp, round_up: bool) -> Result<Self, Error> {
        let factor = token.scaling_factor()?;
        let amount = if round_up {
            scale18.as_uint256().bdiv_up(factor)?
        } else {
            scale18.as_uint256().bdiv_down(factor)?
        };
        Ok(Self { token, amount })
    }

    pub fn zero(token: Token) -> Self {
        Self::from_raw_amount(token, U256::zero())
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// The amount with 18 decimals.
    pub fn scale18(&self) -> Result<Bfp, Error> {
        Ok(Bfp::from_wei(self.amount.bmul(self.token.scaling_factor()?)?))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn add(&self, other: &TokenAmount) -> Result<Self, Error> {
        self.ensure_same_token(other)?;
        Ok(Self::from_raw_amount(self.token.clone(), self.amount.badd(other.amount)?))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn sub(&self, other: &TokenAmount) -> Result<Self, Error> {
        self.ensure_same_token(other)?;
        Ok(Self::from_raw_amount(self.token.clone(), self.amount.bsub(other.amount)?))
    }

    pub fn mul_up_fixed(&self, value: Bfp) -> Result<Self, Error> {
        self.map_raw(|raw| raw.mul_up(value))
    }

    pub fn mul_down_fixed(&self, value: Bfp) -> Result<Self, Error> {
        self.map_raw(|raw| raw.mul_down(value))
    }

    pub fn div_up_fixed(&self, value: Bfp) -> Result<Self, Error> {
        self.map_raw(|raw| raw.div_up(value))
    }

    pub fn div_down_fixed(&self, value: Bfp) -> Result<Self, Error> {
        self.map_raw(|raw| raw.div_down(value))
    }

    fn map_raw(&self, f: impl FnOnce(Bfp) -> Result<Bfp, Error>) -> Result<Self, Error> {
        let amount = f(Bfp::from_wei(self.amount))?.as_uint256();
        Ok(Self::from_raw_amount(self.token.clone(), amount))
    }

    fn ensure_same_token(&self, other: &TokenAmount) -> Result<(), Error> {
        if self.token.is_underlying_equal(&other.token) {
            Ok(())
        } else {
            Err(Error::TokenMismatch)
        }
    }
}

impl Display for TokenAmount {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.token)
    }
}
