//! Application configuration loaded from environment variables.

use alloy_primitives::Address;

use crate::errors::{DreamError, Result};

#[derive(Debug, Clone)]
pub struct Config {
    /// Ethereum JSON-RPC endpoint (e.g. http://127.0.0.1:8545)
    pub rpc_url: String,
    /// Address of the dream raiser contract
    pub contract_address: Address,
    /// Dream shown on startup
    pub dream_id: u64,
    /// Viewer identity, if a wallet is already connected
    pub caller_address: Option<Address>,
    /// Port for the REST API server
    pub api_port: u16,
    /// Extra attempts for a failed read
    pub rpc_max_retries: u32,
    /// HTTP timeout for RPC calls
    pub rpc_timeout_secs: u64,
    /// How often (in seconds) to probe the RPC for connectivity
    pub probe_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        Ok(Config {
            rpc_url: var("RPC_URL", "http://127.0.0.1:8545"),
            contract_address: lookup("CONTRACT_ADDRESS")
                .ok_or_else(|| {
                    DreamError::Config("CONTRACT_ADDRESS environment variable is required".to_string())
                })?
                .parse()
                .map_err(|_| DreamError::Config("Invalid CONTRACT_ADDRESS".to_string()))?,
            dream_id: var("DREAM_ID", "0")
                .parse()
                .map_err(|_| DreamError::Config("Invalid DREAM_ID".to_string()))?,
            caller_address: lookup("CALLER_ADDRESS")
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().parse::<Address>())
                .transpose()
                .map_err(|_| DreamError::Config("Invalid CALLER_ADDRESS".to_string()))?,
            api_port: var("API_PORT", "3001")
                .parse()
                .map_err(|_| DreamError::Config("Invalid API_PORT".to_string()))?,
            rpc_max_retries: var("RPC_MAX_RETRIES", "3")
                .parse()
                .map_err(|_| DreamError::Config("Invalid RPC_MAX_RETRIES".to_string()))?,
            rpc_timeout_secs: var("RPC_TIMEOUT_SECS", "30")
                .parse()
                .map_err(|_| DreamError::Config("Invalid RPC_TIMEOUT_SECS".to_string()))?,
            probe_interval_secs: var("PROBE_INTERVAL_SECS", "10")
                .parse()
                .map_err(|_| DreamError::Config("Invalid PROBE_INTERVAL_SECS".to_string()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[("CONTRACT_ADDRESS", "0xd9145cce52d386f254917e481eb44e9943f39138")]).unwrap();
        assert_eq!(config.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(config.dream_id, 0);
        assert_eq!(config.caller_address, None);
        assert_eq!(config.api_port, 3001);
        assert_eq!(config.rpc_max_retries, 3);
        assert_eq!(config.probe_interval_secs, 10);
    }

    #[test]
    fn contract_is_required() {
        assert!(matches!(load(&[]), Err(DreamError::Config(_))));
        assert!(matches!(
            load(&[("CONTRACT_ADDRESS", "nope")]),
            Err(DreamError::Config(_))
        ));
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("CONTRACT_ADDRESS", "0xd9145cce52d386f254917e481eb44e9943f39138"),
            ("DREAM_ID", "12"),
            ("CALLER_ADDRESS", "0xab8483f64d9c6d1ecf9b849ae677dd3315835cb2"),
            ("API_PORT", "8080"),
        ])
        .unwrap();
        assert_eq!(config.dream_id, 12);
        assert_eq!(config.api_port, 8080);
        assert_eq!(
            config.caller_address,
            Some("0xab8483f64d9c6d1ecf9b849ae677dd3315835cb2".parse().unwrap())
        );
    }

    #[test]
    fn caller_must_be_an_address() {
        let err = load(&[
            ("CONTRACT_ADDRESS", "0xd9145cce52d386f254917e481eb44e9943f39138"),
            ("CALLER_ADDRESS", "alice"),
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Invalid CALLER_ADDRESS");

        let blank = load(&[
            ("CONTRACT_ADDRESS", "0xd9145cce52d386f254917e481eb44e9943f39138"),
            ("CALLER_ADDRESS", " "),
        ])
        .unwrap();
        assert_eq!(blank.caller_address, None);
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let err = load(&[
            ("CONTRACT_ADDRESS", "0xd9145cce52d386f254917e481eb44e9943f39138"),
            ("DREAM_ID", "-1"),
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Invalid DREAM_ID");
    }
}
