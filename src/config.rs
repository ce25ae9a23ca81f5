//! Configuração do acp-skill carregada de `acp.toml` e do ambiente.
//!
//! A struct [`AcpConfig`] contém todos os parâmetros configuráveis.
//! Valores ausentes no arquivo usam defaults sensíveis e variáveis de
//! ambiente (inclusive as carregadas de `.env`) têm precedência sobre o arquivo.
//! As três credenciais são obrigatórias e validadas em [`AcpConfig::credentials`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::acp::{DEFAULT_GATEWAY_URL, Fare};
use crate::error::AcpError;

pub const CONFIG_FILE: &str = "acp.toml";

pub const ENV_WALLET_PRIVATE_KEY: &str = "WALLET_PRIVATE_KEY";
pub const ENV_SESSION_ENTITY_KEY_ID: &str = "SESSION_ENTITY_KEY_ID";
pub const ENV_AGENT_WALLET_ADDRESS: &str = "AGENT_WALLET_ADDRESS";

/// Chave privada da carteira. Nunca aparece em `Debug`.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(key: String) -> Self {
        Self(key)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Credenciais validadas, necessárias para construir o cliente.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub wallet_private_key: PrivateKey,
    pub session_entity_key_id: u64,
    pub agent_wallet_address: String,
}

/// Token de base de preço configurado no `acp.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct FareConfig {
    #[serde(default = "default_fare_contract")]
    pub contract_address: String,
    #[serde(default = "default_fare_decimals")]
    pub decimals: u8,
}

impl Default for FareConfig {
    fn default() -> Self {
        Self {
            contract_address: default_fare_contract(),
            decimals: default_fare_decimals(),
        }
    }
}

impl From<&FareConfig> for Fare {
    fn from(config: &FareConfig) -> Self {
        Fare {
            contract_address: config.contract_address.clone(),
            decimals: config.decimals,
        }
    }
}

/// Configuração de nível superior.
#[derive(Debug, Clone, Deserialize)]
pub struct AcpConfig {
    #[serde(default)]
    pub wallet_private_key: Option<PrivateKey>,

    #[serde(default)]
    pub session_entity_key_id: Option<u64>,

    #[serde(default)]
    pub agent_wallet_address: Option<String>,

    /// URL base do gateway do protocolo.
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Intervalo entre polls do job, em segundos.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Prazo máximo de um job, em segundos. `0` desativa o prazo.
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    #[serde(default)]
    pub base_fare: FareConfig,
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_job_timeout_secs() -> u64 {
    30 * 60
}

// USDC na Base.
fn default_fare_contract() -> String {
    "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913".to_string()
}

fn default_fare_decimals() -> u8 {
    6
}

impl Default for AcpConfig {
    fn default() -> Self {
        Self {
            wallet_private_key: None,
            session_entity_key_id: None,
            agent_wallet_address: None,
            gateway_url: default_gateway_url(),
            poll_interval_secs: default_poll_interval_secs(),
            job_timeout_secs: default_job_timeout_secs(),
            base_fare: FareConfig::default(),
        }
    }
}

impl AcpConfig {
    /// Carrega `acp.toml` (ou o arquivo em `ACP_CONFIG`) e aplica o ambiente.
    pub fn load() -> Result<Self> {
        let path = std::env::var_os("ACP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
        let config = Self::from_file(&path)?;
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Lê o arquivo TOML. Usa valores padrão se o arquivo não existir.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<AcpConfig>(&contents)?)
    }

    /// Sobrepõe os valores vindos de `lookup`. Valores vazios são ignorados.
    pub fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_WALLET_PRIVATE_KEY) {
            self.wallet_private_key = Some(PrivateKey::new(key));
        }
        if let Some(id) = get(ENV_SESSION_ENTITY_KEY_ID) {
            self.session_entity_key_id = Some(parse_number(ENV_SESSION_ENTITY_KEY_ID, &id)?);
        }
        if let Some(address) = get(ENV_AGENT_WALLET_ADDRESS) {
            self.agent_wallet_address = Some(address);
        }
        if let Some(url) = get("ACP_GATEWAY_URL") {
            self.gateway_url = url;
        }
        if let Some(secs) = get("ACP_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = parse_number("ACP_POLL_INTERVAL_SECS", &secs)?;
        }
        if let Some(secs) = get("ACP_JOB_TIMEOUT_SECS") {
            self.job_timeout_secs = parse_number("ACP_JOB_TIMEOUT_SECS", &secs)?;
        }

        // Vale tanto para o arquivo quanto para o ambiente.
        if self.poll_interval_secs == 0 {
            return Err(AcpError::InvalidConfig(
                "poll_interval_secs must be at least 1".into(),
            )
            .into());
        }

        Ok(self)
    }

    /// Valida as três credenciais obrigatórias, nomeando todas as ausentes.
    pub fn credentials(&self) -> Result<Credentials, AcpError> {
        let key = self
            .wallet_private_key
            .clone()
            .filter(|k| !k.expose().trim().is_empty());
        let address = self
            .agent_wallet_address
            .clone()
            .filter(|a| !a.trim().is_empty());

        match (key, self.session_entity_key_id, address) {
            (Some(wallet_private_key), Some(session_entity_key_id), Some(agent_wallet_address)) => {
                Ok(Credentials {
                    wallet_private_key,
                    session_entity_key_id,
                    agent_wallet_address,
                })
            }
            (key, id, address) => {
                let mut missing = Vec::new();
                if address.is_none() {
                    missing.push(ENV_AGENT_WALLET_ADDRESS);
                }
                if id.is_none() {
                    missing.push(ENV_SESSION_ENTITY_KEY_ID);
                }
                if key.is_none() {
                    missing.push(ENV_WALLET_PRIVATE_KEY);
                }
                Err(AcpError::MissingConfig(missing))
            }
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, AcpError> {
    value
        .trim()
        .parse()
        .map_err(|_| AcpError::InvalidConfig(format!("{name} must be a non-negative integer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const ALL: [(&str, &str); 3] = [
        (ENV_WALLET_PRIVATE_KEY, "0xabc123"),
        (ENV_SESSION_ENTITY_KEY_ID, "2"),
        (ENV_AGENT_WALLET_ADDRESS, "0xbuyer"),
    ];

    #[test]
    fn default_config_values() {
        let config = AcpConfig::default();
        assert_eq!(config.gateway_url, DEFAULT_GATEWAY_URL);
        assert_eq!(config.poll_interval(), Duration::from_secs(10));
        assert_eq!(config.job_timeout(), Some(Duration::from_secs(1800)));
        assert_eq!(config.base_fare.decimals, 6);
        assert!(config.wallet_private_key.is_none());
    }

    #[test]
    fn env_supplies_credentials() {
        let config = AcpConfig::default().with_env(env(&ALL)).unwrap();
        let creds = config.credentials().unwrap();
        assert_eq!(creds.wallet_private_key.expose(), "0xabc123");
        assert_eq!(creds.session_entity_key_id, 2);
        assert_eq!(creds.agent_wallet_address, "0xbuyer");
    }

    #[test]
    fn every_missing_subset_is_named() {
        for mask in 0u8..7 {
            let present: Vec<(&str, &str)> = ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << *i) != 0)
                .map(|(_, pair)| *pair)
                .collect();
            let config = AcpConfig::default().with_env(env(&present)).unwrap();
            let err = config.credentials().unwrap_err();
            let AcpError::MissingConfig(missing) = &err else {
                panic!("expected MissingConfig, got {err:?}");
            };
            let message = err.to_string();
            for (name, _) in ALL.iter().filter(|(n, _)| !present.iter().any(|(p, _)| p == n)) {
                assert!(missing.contains(name), "mask {mask}: {name} not reported");
                assert!(message.contains(*name));
            }
            assert_eq!(missing.len(), 3 - present.len());
        }
    }

    #[test]
    fn empty_values_count_as_missing() {
        let config = AcpConfig::default()
            .with_env(env(&[
                (ENV_WALLET_PRIVATE_KEY, "  "),
                (ENV_SESSION_ENTITY_KEY_ID, "4"),
                (ENV_AGENT_WALLET_ADDRESS, ""),
            ]))
            .unwrap();
        let err = config.credentials().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing configuration: set AGENT_WALLET_ADDRESS, WALLET_PRIVATE_KEY"
        );
    }

    #[test]
    fn non_numeric_session_key_is_rejected() {
        let err = AcpConfig::default()
            .with_env(env(&[(ENV_SESSION_ENTITY_KEY_ID, "abc")]))
            .unwrap_err();
        assert!(err.to_string().contains("SESSION_ENTITY_KEY_ID"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = AcpConfig::default()
            .with_env(env(&[("ACP_POLL_INTERVAL_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AcpError>(),
            Some(AcpError::InvalidConfig(_))
        ));

        let from_file: AcpConfig = toml::from_str("poll_interval_secs = 0").unwrap();
        assert!(from_file.with_env(env(&[])).is_err());
    }

    #[test]
    fn private_key_is_redacted_in_debug() {
        let config = AcpConfig::default().with_env(env(&ALL)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("0xabc123"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            gateway_url = "http://gateway.local:9000"
            job_timeout_secs = 0

            [base_fare]
            decimals = 18
        "#;
        let config: AcpConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.gateway_url, "http://gateway.local:9000");
        assert_eq!(config.job_timeout(), None);
        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.base_fare.decimals, 18);
        assert_eq!(config.base_fare.contract_address, default_fare_contract());
    }

    #[test]
    fn env_takes_precedence_over_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "agent_wallet_address = \"0xfromfile\"\nsession_entity_key_id = 9\npoll_interval_secs = 30"
        )
        .unwrap();

        let config = AcpConfig::from_file(file.path())
            .unwrap()
            .with_env(env(&[
                (ENV_AGENT_WALLET_ADDRESS, "0xfromenv"),
                ("ACP_POLL_INTERVAL_SECS", "2"),
            ]))
            .unwrap();
        assert_eq!(config.agent_wallet_address.as_deref(), Some("0xfromenv"));
        assert_eq!(config.session_entity_key_id, Some(9));
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AcpConfig::from_file(&dir.path().join("acp.toml")).unwrap();
        assert_eq!(config.poll_interval_secs, 10);
    }
}
