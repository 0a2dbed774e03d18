//! Well-known ERC-20 contracts on Ethereum mainnet.
//!
//! Lets the CLI accept a symbol (`usdc`) wherever it takes a token
//! address. Any other value is parsed as a raw address.

use alloy::primitives::{Address, address};
use anyhow::{Context, Result};

/// Metadata for one well-known token contract.
#[derive(Debug, Clone, Copy)]
pub struct TokenConfig {
    /// Ticker symbol, upper case.
    pub symbol: &'static str,
    /// Contract address on Ethereum mainnet.
    pub address: Address,
    /// Decimal places of the token's base unit.
    pub decimals: u8,
}

/// Token ingested when none is configured.
pub const DEFAULT_TOKEN: &str = "USDC";

/// All known token contracts.
pub const ALL: &[TokenConfig] = &[
    TokenConfig {
        symbol: "USDC",
        address: address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
        decimals: 6,
    },
    TokenConfig {
        symbol: "USDT",
        address: address!("dac17f958d2ee523a2206206994597c13d831ec7"),
        decimals: 6,
    },
    TokenConfig {
        symbol: "DAI",
        address: address!("6b175474e89094c44da98b954eedeac495271d0f"),
        decimals: 18,
    },
    TokenConfig {
        symbol: "WETH",
        address: address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
        decimals: 18,
    },
];

/// Look up a known token by symbol, ignoring case.
#[must_use]
pub fn by_symbol(symbol: &str) -> Option<&'static TokenConfig> {
    ALL.iter().find(|t| t.symbol.eq_ignore_ascii_case(symbol))
}

/// Resolve a symbol or a hex address to a contract address.
///
/// # Errors
///
/// Returns an error if `token` is neither a known symbol nor a valid address.
pub fn resolve(token: &str) -> Result<Address> {
    if let Some(known) = by_symbol(token) {
        return Ok(known.address);
    }
    token
        .parse::<Address>()
        .with_context(|| format!("unknown token {token:?}: not a known symbol or an address"))
}
