//! Contract/RPC access layer.
//!
//! [`SwapContract`] is the seam between the engine and the chain: every
//! consumed operation of the swap and escrow contracts, plus the two ERC-20
//! metadata reads the balance view needs. The engine only ever sees this
//! trait, so tests run against an in-memory double and a future transport
//! swap never touches callers.
//!
//! [`Web3SwapContract`] is the production implementation: `eth_call` with
//! ABI-encoded payloads over an HTTP transport with connection pooling.
//! Read calls retry a bounded number of times with exponential backoff when
//! the provider rate-limits; mutating calls are never retried here — they
//! are user-retryable by re-invocation once the failure is surfaced.

use async_trait::async_trait;
use config::{Chain, EngineSettings};
use ethabi::{Function, Param, ParamType, StateMutability, Token as AbiToken};
use once_cell::sync::Lazy;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use types::{parse_address, Escrow, PoolReserves};
use web3::transports::Http;
use web3::types::{Bytes, CallRequest, TransactionRequest, H160, U256, U64};
use web3::Web3;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("rate limited by RPC provider")]
    RateLimited,

    #[error("malformed contract response: {0}")]
    BadResponse(String),
}

/// Classify a web3 failure the way the provider reports it.
fn classify(err: web3::Error) -> RpcError {
    let text = err.to_string();
    if text.contains("429") || text.contains("Too many requests") || text.contains("rate limit") {
        RpcError::RateLimited
    } else {
        RpcError::Transport(text)
    }
}

/// Consumed operations of the swap/escrow contract surface.
///
/// Escrow timeouts are Unix milliseconds, matching the contract's storage.
#[async_trait]
pub trait SwapContract: Send + Sync {
    async fn pool_reserves(&self, token: H160) -> Result<PoolReserves, RpcError>;

    async fn user_shares(&self, token: H160, account: H160) -> Result<U256, RpcError>;

    /// Atomic two-leg deposit; either both legs deposit or neither does.
    async fn add_liquidity(
        &self,
        token: H160,
        token_amount: U256,
        alt_amount: U256,
    ) -> Result<bool, RpcError>;

    /// Atomic proportional withdrawal.
    async fn remove_liquidity(&self, token: H160, shares: U256) -> Result<bool, RpcError>;

    async fn user_escrows(&self, account: H160) -> Result<Vec<Escrow>, RpcError>;

    /// The contract is the authoritative gate: this fails server-side when
    /// invoked before the timeout or on an inactive escrow.
    async fn claim_timed_out_escrow(&self, id: U256) -> Result<bool, RpcError>;

    /// Raw balance plus the token's own `decimals()` report.
    async fn token_balance(&self, account: H160, token: H160) -> Result<(U256, u8), RpcError>;

    async fn token_symbol(&self, token: H160) -> Result<String, RpcError>;
}

fn param(name: &str, kind: ParamType) -> Param {
    Param {
        name: name.to_string(),
        kind,
        internal_type: None,
    }
}

fn function(
    name: &str,
    inputs: Vec<Param>,
    outputs: Vec<Param>,
    state_mutability: StateMutability,
) -> Function {
    #[allow(deprecated)]
    Function {
        name: name.to_string(),
        inputs,
        outputs,
        constant: None,
        state_mutability,
    }
}

static GET_POOL_RESERVES: Lazy<Function> = Lazy::new(|| {
    function(
        "getPoolReserves",
        vec![param("token", ParamType::Address)],
        vec![
            param("tokenReserve", ParamType::Uint(256)),
            param("altReserve", ParamType::Uint(256)),
            param("totalShares", ParamType::Uint(256)),
        ],
        StateMutability::View,
    )
});

static GET_USER_SHARES: Lazy<Function> = Lazy::new(|| {
    function(
        "getUserShares",
        vec![
            param("token", ParamType::Address),
            param("account", ParamType::Address),
        ],
        vec![param("shares", ParamType::Uint(256))],
        StateMutability::View,
    )
});

static ADD_LIQUIDITY: Lazy<Function> = Lazy::new(|| {
    function(
        "addLiquidity",
        vec![
            param("token", ParamType::Address),
            param("tokenAmount", ParamType::Uint(256)),
            param("altAmount", ParamType::Uint(256)),
        ],
        vec![param("success", ParamType::Bool)],
        StateMutability::NonPayable,
    )
});

static REMOVE_LIQUIDITY: Lazy<Function> = Lazy::new(|| {
    function(
        "removeLiquidity",
        vec![
            param("token", ParamType::Address),
            param("shares", ParamType::Uint(256)),
        ],
        vec![param("success", ParamType::Bool)],
        StateMutability::NonPayable,
    )
});

static GET_USER_ESCROWS: Lazy<Function> = Lazy::new(|| {
    function(
        "getUserEscrows",
        vec![param("account", ParamType::Address)],
        vec![param(
            "escrows",
            ParamType::Array(Box::new(ParamType::Tuple(vec![
                ParamType::Uint(256), // id
                ParamType::Address,   // user
                ParamType::Uint(256), // altAmount
                ParamType::Uint(256), // timeout (ms)
                ParamType::Bool,      // active
            ]))),
        )],
        StateMutability::View,
    )
});

static CLAIM_TIMED_OUT_ESCROW: Lazy<Function> = Lazy::new(|| {
    function(
        "claimTimedOutEscrow",
        vec![param("escrowId", ParamType::Uint(256))],
        vec![param("success", ParamType::Bool)],
        StateMutability::NonPayable,
    )
});

static ERC20_BALANCE_OF: Lazy<Function> = Lazy::new(|| {
    function(
        "balanceOf",
        vec![param("account", ParamType::Address)],
        vec![param("balance", ParamType::Uint(256))],
        StateMutability::View,
    )
});

static ERC20_DECIMALS: Lazy<Function> = Lazy::new(|| {
    function(
        "decimals",
        vec![],
        vec![param("decimals", ParamType::Uint(8))],
        StateMutability::View,
    )
});

static ERC20_SYMBOL: Lazy<Function> = Lazy::new(|| {
    function(
        "symbol",
        vec![],
        vec![param("symbol", ParamType::String)],
        StateMutability::View,
    )
});

fn as_uint(token: &AbiToken) -> Result<U256, RpcError> {
    match token {
        AbiToken::Uint(value) => Ok(*value),
        other => Err(RpcError::BadResponse(format!("expected uint, got {other:?}"))),
    }
}

fn as_address(token: &AbiToken) -> Result<H160, RpcError> {
    match token {
        AbiToken::Address(value) => Ok(*value),
        other => Err(RpcError::BadResponse(format!(
            "expected address, got {other:?}"
        ))),
    }
}

fn as_bool(token: &AbiToken) -> Result<bool, RpcError> {
    match token {
        AbiToken::Bool(value) => Ok(*value),
        other => Err(RpcError::BadResponse(format!("expected bool, got {other:?}"))),
    }
}

fn decode_escrow(token: &AbiToken) -> Result<Escrow, RpcError> {
    let fields = match token {
        AbiToken::Tuple(fields) if fields.len() == 5 => fields,
        other => {
            return Err(RpcError::BadResponse(format!(
                "expected 5-field escrow tuple, got {other:?}"
            )))
        }
    };
    Ok(Escrow {
        id: as_uint(&fields[0])?,
        user: as_address(&fields[1])?,
        alt_amount: as_uint(&fields[2])?,
        timeout_ms: as_uint(&fields[3])?.low_u64(),
        active: as_bool(&fields[4])?,
    })
}

/// web3-backed [`SwapContract`] for one chain.
pub struct Web3SwapContract {
    web3: Web3<Http>,
    swap_contract: H160,
    account: H160,
    timeout: Duration,
    max_retries: u32,
}

impl Web3SwapContract {
    /// Connect to a chain's RPC endpoint with a keep-alive, pooled HTTP
    /// client, so repeated polling does not pay per-request connection
    /// setup.
    pub fn connect(
        chain: &Chain,
        account: H160,
        settings: &EngineSettings,
    ) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(4)
            .timeout(settings.rpc_timeout())
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RpcError::Config(format!("building HTTP client: {e}")))?;

        let url = chain
            .rpc_url
            .parse()
            .map_err(|e| RpcError::Config(format!("invalid RPC URL {}: {e}", chain.rpc_url)))?;
        let transport = Http::with_client(client, url);

        let swap_contract = parse_address(chain.swap_contract)
            .map_err(|e| RpcError::Config(format!("swap contract address: {e}")))?;

        Ok(Self {
            web3: Web3::new(transport),
            swap_contract,
            account,
            timeout: settings.rpc_timeout(),
            max_retries: settings.max_rpc_retries,
        })
    }

    /// One `eth_call` round trip: encode, call, decode.
    async fn eth_call(
        &self,
        to: H160,
        func: &Function,
        args: Vec<AbiToken>,
    ) -> Result<Vec<AbiToken>, RpcError> {
        let data = func
            .encode_input(&args)
            .map_err(|e| RpcError::BadResponse(format!("encoding {}: {e}", func.name)))?;
        let request = CallRequest {
            to: Some(to),
            data: Some(Bytes(data)),
            ..Default::default()
        };

        let response = tokio::time::timeout(self.timeout, self.web3.eth().call(request, None))
            .await
            .map_err(|_| RpcError::Transport(format!("{} timed out", func.name)))?
            .map_err(classify)?;

        func.decode_output(&response.0)
            .map_err(|e| RpcError::BadResponse(format!("decoding {}: {e}", func.name)))
    }

    /// Bounded retry wrapper for read calls. Only rate-limit failures are
    /// retried; anything else propagates immediately.
    async fn read_call(
        &self,
        to: H160,
        func: &Function,
        args: Vec<AbiToken>,
    ) -> Result<Vec<AbiToken>, RpcError> {
        let mut backoff = Duration::from_millis(100);
        let mut attempt = 0u32;
        loop {
            match self.eth_call(to, func, args.clone()).await {
                Err(RpcError::RateLimited) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        call = func.name,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "rate limited; backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(Duration::from_secs(5));
                }
                other => return other,
            }
        }
    }

    /// Submit a mutating call and wait for its receipt. Success is the
    /// receipt status, not the submission.
    async fn send_call(&self, func: &Function, args: Vec<AbiToken>) -> Result<bool, RpcError> {
        let data = func
            .encode_input(&args)
            .map_err(|e| RpcError::BadResponse(format!("encoding {}: {e}", func.name)))?;
        let request = TransactionRequest {
            from: self.account,
            to: Some(self.swap_contract),
            data: Some(Bytes(data)),
            ..Default::default()
        };

        let receipt = self
            .web3
            .send_transaction_with_confirmation(request, Duration::from_secs(1), 1)
            .await
            .map_err(classify)?;

        let succeeded = receipt.status == Some(U64::one());
        debug!(
            call = func.name,
            tx = ?receipt.transaction_hash,
            succeeded,
            "transaction confirmed"
        );
        Ok(succeeded)
    }
}

#[async_trait]
impl SwapContract for Web3SwapContract {
    async fn pool_reserves(&self, token: H160) -> Result<PoolReserves, RpcError> {
        let out = self
            .read_call(
                self.swap_contract,
                &GET_POOL_RESERVES,
                vec![AbiToken::Address(token)],
            )
            .await?;
        if out.len() != 3 {
            return Err(RpcError::BadResponse(format!(
                "getPoolReserves returned {} values",
                out.len()
            )));
        }
        Ok(PoolReserves {
            token,
            token_reserve: as_uint(&out[0])?,
            alt_reserve: as_uint(&out[1])?,
            total_shares: as_uint(&out[2])?,
        })
    }

    async fn user_shares(&self, token: H160, account: H160) -> Result<U256, RpcError> {
        let out = self
            .read_call(
                self.swap_contract,
                &GET_USER_SHARES,
                vec![AbiToken::Address(token), AbiToken::Address(account)],
            )
            .await?;
        as_uint(out.first().ok_or_else(|| {
            RpcError::BadResponse("getUserShares returned nothing".to_string())
        })?)
    }

    async fn add_liquidity(
        &self,
        token: H160,
        token_amount: U256,
        alt_amount: U256,
    ) -> Result<bool, RpcError> {
        self.send_call(
            &ADD_LIQUIDITY,
            vec![
                AbiToken::Address(token),
                AbiToken::Uint(token_amount),
                AbiToken::Uint(alt_amount),
            ],
        )
        .await
    }

    async fn remove_liquidity(&self, token: H160, shares: U256) -> Result<bool, RpcError> {
        self.send_call(
            &REMOVE_LIQUIDITY,
            vec![AbiToken::Address(token), AbiToken::Uint(shares)],
        )
        .await
    }

    async fn user_escrows(&self, account: H160) -> Result<Vec<Escrow>, RpcError> {
        let out = self
            .read_call(
                self.swap_contract,
                &GET_USER_ESCROWS,
                vec![AbiToken::Address(account)],
            )
            .await?;
        let entries = match out.first() {
            Some(AbiToken::Array(entries)) => entries,
            other => {
                return Err(RpcError::BadResponse(format!(
                    "expected escrow array, got {other:?}"
                )))
            }
        };
        entries.iter().map(decode_escrow).collect()
    }

    async fn claim_timed_out_escrow(&self, id: U256) -> Result<bool, RpcError> {
        self.send_call(&CLAIM_TIMED_OUT_ESCROW, vec![AbiToken::Uint(id)])
            .await
    }

    async fn token_balance(&self, account: H160, token: H160) -> Result<(U256, u8), RpcError> {
        let balance = self
            .read_call(token, &ERC20_BALANCE_OF, vec![AbiToken::Address(account)])
            .await?;
        let raw = as_uint(balance.first().ok_or_else(|| {
            RpcError::BadResponse("balanceOf returned nothing".to_string())
        })?)?;

        let decimals = self.read_call(token, &ERC20_DECIMALS, vec![]).await?;
        let decimals = as_uint(decimals.first().ok_or_else(|| {
            RpcError::BadResponse("decimals returned nothing".to_string())
        })?)?
        .low_u64() as u8;

        Ok((raw, decimals))
    }

    async fn token_symbol(&self, token: H160) -> Result<String, RpcError> {
        let out = self.read_call(token, &ERC20_SYMBOL, vec![]).await?;
        match out.first() {
            Some(AbiToken::String(symbol)) => Ok(symbol.clone()),
            other => Err(RpcError::BadResponse(format!(
                "expected string symbol, got {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selectors_match_the_contract_abi() {
        // Keccak-derived selectors are stable; a drift here means the ABI
        // definitions above no longer match the deployed surface.
        assert_eq!(
            hex::encode(&ERC20_BALANCE_OF.encode_input(&[AbiToken::Address(H160::zero())]).unwrap()[..4]),
            "70a08231"
        );
        assert_eq!(hex::encode(&ERC20_DECIMALS.encode_input(&[]).unwrap()[..4]), "313ce567");
        assert_eq!(hex::encode(&ERC20_SYMBOL.encode_input(&[]).unwrap()[..4]), "95d89b41");
    }

    #[test]
    fn escrow_tuple_decodes() {
        let tuple = AbiToken::Tuple(vec![
            AbiToken::Uint(U256::from(7u64)),
            AbiToken::Address(H160::repeat_byte(0xab)),
            AbiToken::Uint(U256::from(1_000u64)),
            AbiToken::Uint(U256::from(1_700_000_000_000u64)),
            AbiToken::Bool(true),
        ]);
        let escrow = decode_escrow(&tuple).unwrap();
        assert_eq!(escrow.id, U256::from(7u64));
        assert_eq!(escrow.user, H160::repeat_byte(0xab));
        assert_eq!(escrow.timeout_ms, 1_700_000_000_000);
        assert!(escrow.active);
    }

    #[test]
    fn malformed_escrow_tuple_is_rejected() {
        let short = AbiToken::Tuple(vec![AbiToken::Uint(U256::zero())]);
        assert!(matches!(
            decode_escrow(&short),
            Err(RpcError::BadResponse(_))
        ));
    }

    #[test]
    fn rate_limit_classification() {
        let err = web3::Error::Transport(web3::error::TransportError::Message(
            "429 Too many requests".to_string(),
        ));
        assert!(matches!(classify(err), RpcError::RateLimited));

        let err = web3::Error::Transport(web3::error::TransportError::Message(
            "connection refused".to_string(),
        ));
        assert!(matches!(classify(err), RpcError::Transport(_)));
    }
}
