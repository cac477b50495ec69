//! # Altswap Centralized Configuration
//!
//! Static chain registry and runtime settings for the swap engine,
//! eliminating chain-conditional literals scattered through callers.
//!
//! ## Usage
//!
//! ```rust
//! use config::{chain_by_id, chain_by_decimal_id, default_chain};
//!
//! let polygon = chain_by_decimal_id(137).unwrap();
//! assert_eq!(polygon.id, "0x89");
//! assert_eq!(chain_by_id("0x89").unwrap().decimal_id, 137);
//! assert_eq!(default_chain().decimal_id, polygon.decimal_id);
//! ```

pub mod chains;
pub mod settings;

pub use chains::{
    chain_by_decimal_id, chain_by_id, default_chain, validate_registry, Chain, RegistryError,
    TokenListing, CHAINS,
};
pub use settings::{load_settings, EngineSettings};
