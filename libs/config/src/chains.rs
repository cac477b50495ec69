//! Supported network registry.
//!
//! One table, loaded at process start, consumed by every component that
//! needs to disambiguate addresses and units across networks. All
//! chain-specific values resolve through the lookup functions here —
//! never through duplicated literals at call sites.
//!
//! Addresses are stored as hex strings exactly as they appear on chain
//! explorers; they are parsed to `H160` at the type boundary, which is also
//! where case-insensitive comparison happens.

use thiserror::Error;

/// A token listed for `token × ALT` pools on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenListing {
    pub address: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
}

/// One supported network.
///
/// `id` (EIP-695 hex, as wallets speak it) and `decimal_id` are two
/// encodings of the same value; [`validate_registry`] enforces the 1:1
/// mapping at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chain {
    pub id: &'static str,
    pub decimal_id: u64,
    pub name: &'static str,
    pub rpc_url: &'static str,
    pub block_explorer_url: &'static str,
    pub native_symbol: &'static str,
    pub usdc_address: &'static str,
    /// The ALT base asset every pool pairs against.
    pub alt_address: &'static str,
    /// The swap/escrow contract this chain's engine talks to.
    pub swap_contract: &'static str,
    pub tokens: &'static [TokenListing],
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate chain id {0}")]
    DuplicateChainId(u64),

    #[error("chain {name}: hex id {id} does not encode decimal id {decimal_id}")]
    IdMismatch {
        name: &'static str,
        id: &'static str,
        decimal_id: u64,
    },

    #[error("chain {chain}: {field} is not a valid address: {value}")]
    BadAddress {
        chain: &'static str,
        field: &'static str,
        value: &'static str,
    },
}

/// All networks the product supports.
pub const CHAINS: &[Chain] = &[
    Chain {
        id: "0x1",
        decimal_id: 1,
        name: "Ethereum",
        rpc_url: "https://eth.llamarpc.com",
        block_explorer_url: "https://etherscan.io",
        native_symbol: "ETH",
        usdc_address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
        alt_address: "0x52a1b87f5ba79d10b9e2c173c59c9d365ecf0e23",
        swap_contract: "0x9ed45f19623c2869dbf62a6ddc5fb0a8fbc16c58",
        tokens: &[
            TokenListing {
                address: "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48",
                symbol: "USDC",
                decimals: 6,
            },
            TokenListing {
                address: "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2",
                symbol: "WETH",
                decimals: 18,
            },
        ],
    },
    Chain {
        id: "0x89",
        decimal_id: 137,
        name: "Polygon",
        rpc_url: "https://polygon-rpc.com",
        block_explorer_url: "https://polygonscan.com",
        native_symbol: "POL",
        usdc_address: "0x3c499c542cef5e3811e1192ce70d8cc03d5c3359",
        alt_address: "0x52a1b87f5ba79d10b9e2c173c59c9d365ecf0e23",
        swap_contract: "0x1d4c8027c1fa7b9e1f7b4da0f1ab12e4e6a5c901",
        tokens: &[
            TokenListing {
                address: "0x3c499c542cef5e3811e1192ce70d8cc03d5c3359",
                symbol: "USDC",
                decimals: 6,
            },
            TokenListing {
                address: "0x7ceb23fd6bc0add59e62ac25578270cff1b9f619",
                symbol: "WETH",
                decimals: 18,
            },
        ],
    },
    Chain {
        id: "0xa4b1",
        decimal_id: 42161,
        name: "Arbitrum One",
        rpc_url: "https://arb1.arbitrum.io/rpc",
        block_explorer_url: "https://arbiscan.io",
        native_symbol: "ETH",
        usdc_address: "0xaf88d065e77c8cc2239327c5edb3a432268e5831",
        alt_address: "0x52a1b87f5ba79d10b9e2c173c59c9d365ecf0e23",
        swap_contract: "0x3b7fa4dd0c2f8b7dca682b4d70e0c53ac7d1e946",
        tokens: &[
            TokenListing {
                address: "0xaf88d065e77c8cc2239327c5edb3a432268e5831",
                symbol: "USDC",
                decimals: 6,
            },
            TokenListing {
                address: "0x82af49447d8a07e3bd95bd0d56f35241523fbab1",
                symbol: "WETH",
                decimals: 18,
            },
        ],
    },
    Chain {
        id: "0x2105",
        decimal_id: 8453,
        name: "Base",
        rpc_url: "https://mainnet.base.org",
        block_explorer_url: "https://basescan.org",
        native_symbol: "ETH",
        usdc_address: "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913",
        alt_address: "0x52a1b87f5ba79d10b9e2c173c59c9d365ecf0e23",
        swap_contract: "0x6a90de0cc659b14b1f8e7b4b20d6f3e80fc2a1d7",
        tokens: &[
            TokenListing {
                address: "0x833589fcd6edb6e08f4c7c32d4f71b54bda02913",
                symbol: "USDC",
                decimals: 6,
            },
            TokenListing {
                address: "0x4200000000000000000000000000000000000006",
                symbol: "WETH",
                decimals: 18,
            },
        ],
    },
];

/// Look up a chain by its EIP-695 hex id (case-insensitive).
pub fn chain_by_id(id: &str) -> Option<&'static Chain> {
    CHAINS.iter().find(|c| c.id.eq_ignore_ascii_case(id))
}

/// Look up a chain by its decimal id.
pub fn chain_by_decimal_id(decimal_id: u64) -> Option<&'static Chain> {
    CHAINS.iter().find(|c| c.decimal_id == decimal_id)
}

/// The chain selected when no preference is recorded.
pub fn default_chain() -> &'static Chain {
    &CHAINS[1] // Polygon
}

fn is_hex_address(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map(|digits| digits.len() == 40 && digits.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Startup validation of the registry invariants: unique ids, hex/decimal
/// bijection, well-formed addresses.
pub fn validate_registry() -> Result<(), RegistryError> {
    let mut seen = Vec::with_capacity(CHAINS.len());
    for chain in CHAINS {
        if seen.contains(&chain.decimal_id) {
            return Err(RegistryError::DuplicateChainId(chain.decimal_id));
        }
        seen.push(chain.decimal_id);

        let encoded = chain.id.strip_prefix("0x").unwrap_or(chain.id);
        match u64::from_str_radix(encoded, 16) {
            Ok(decoded) if decoded == chain.decimal_id => {}
            _ => {
                return Err(RegistryError::IdMismatch {
                    name: chain.name,
                    id: chain.id,
                    decimal_id: chain.decimal_id,
                })
            }
        }

        for (field, value) in [
            ("usdc_address", chain.usdc_address),
            ("alt_address", chain.alt_address),
            ("swap_contract", chain.swap_contract),
        ] {
            if !is_hex_address(value) {
                return Err(RegistryError::BadAddress {
                    chain: chain.name,
                    field,
                    value,
                });
            }
        }
        for token in chain.tokens {
            if !is_hex_address(token.address) {
                return Err(RegistryError::BadAddress {
                    chain: chain.name,
                    field: token.symbol,
                    value: token.address,
                });
            }
        }
    }
    Ok(())
}
