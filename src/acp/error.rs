//! Tipos de erro para o cliente do gateway ACP.
//!
//! Define [`GatewayError`] com variantes para rate limiting, erros retornados
//! pelo gateway e falhas de rede. A mensagem de [`ApiError`](GatewayError::ApiError)
//! é repassada sem alteração, pois é ela que chega ao usuário final.

use thiserror::Error;

/// Erros que podem ocorrer ao falar com o gateway do protocolo.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// O gateway retornou HTTP 429.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Qualquer outra resposta não-2xx. `message` vem do corpo da resposta.
    #[error("{message}")]
    ApiError { status: u16, message: String },

    /// Falha de rede ou de decodificação do corpo.
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl GatewayError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::RateLimited { .. } => Some(429),
            GatewayError::ApiError { status, .. } => Some(*status),
            GatewayError::NetworkError(e) => e.status().map(|s| s.as_u16()),
        }
    }
}
