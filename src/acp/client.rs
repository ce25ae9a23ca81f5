use std::net::IpAddr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;

use super::error::GatewayError;
use super::types::{Agent, BrowseOptions, JobCreated, JobRequest, JobSnapshot};
use crate::config::Credentials;
use crate::error::AcpError;

pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:8787";

/// Operations the driver and dispatcher need from the protocol runtime.
pub trait AcpApi {
    async fn browse_agents(
        &self,
        query: &str,
        options: &BrowseOptions,
    ) -> Result<Vec<Agent>, GatewayError>;

    /// Creates a job and returns its identifier.
    async fn initiate_job(&self, request: &JobRequest) -> Result<String, GatewayError>;

    /// `None` when the gateway does not know the job.
    async fn get_job(&self, job_id: &str) -> Result<Option<JobSnapshot>, GatewayError>;

    async fn pay_and_accept(&self, job_id: &str) -> Result<(), GatewayError>;

    async fn token_balances(&self) -> Result<Option<Value>, GatewayError>;
}

pub struct AcpClient {
    client: Client,
    base_url: String,
}

impl AcpClient {
    /// Build a client whose every request carries the caller's credentials.
    ///
    /// The private key travels in a header, so plain `http` is only accepted
    /// for a loopback gateway.
    pub fn build(
        credentials: &Credentials,
        base_url: &str,
        request_id: &str,
    ) -> Result<Self, AcpError> {
        check_gateway_url(base_url)?;

        let mut headers = HeaderMap::new();
        insert_header(
            &mut headers,
            "x-agent-wallet-address",
            &credentials.agent_wallet_address,
            false,
        )?;
        insert_header(
            &mut headers,
            "x-session-entity-key-id",
            &credentials.session_entity_key_id.to_string(),
            false,
        )?;
        insert_header(
            &mut headers,
            "x-wallet-private-key",
            credentials.wallet_private_key.expose(),
            true,
        )?;
        insert_header(&mut headers, "x-request-id", request_id, false)?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .default_headers(headers)
            .build()
            .map_err(GatewayError::from)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

fn check_gateway_url(base_url: &str) -> Result<(), AcpError> {
    let url = Url::parse(base_url)
        .map_err(|e| AcpError::InvalidConfig(format!("gateway_url {base_url:?}: {e}")))?;
    match url.scheme() {
        "https" => Ok(()),
        "http" if url.host_str().is_some_and(is_loopback) => Ok(()),
        "http" => Err(AcpError::InvalidConfig(format!(
            "gateway_url {base_url:?} must use https unless it points at a loopback host"
        ))),
        other => Err(AcpError::InvalidConfig(format!(
            "gateway_url {base_url:?} has unsupported scheme {other}"
        ))),
    }
}

fn is_loopback(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback())
}

fn insert_header(
    headers: &mut HeaderMap,
    name: &'static str,
    value: &str,
    sensitive: bool,
) -> Result<(), AcpError> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| AcpError::InvalidConfig(format!("{name} contains invalid characters")))?;
    value.set_sensitive(sensitive);
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

/// Map non-2xx responses to [`GatewayError`], passing successes through.
async fn check(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .map(|secs| secs * 1000)
            .unwrap_or(1000);
        return Err(GatewayError::RateLimited {
            retry_after_ms: retry_after,
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let err = GatewayError::ApiError {
            status: status.as_u16(),
            message: error_message(&body, status),
        };
        tracing::debug!(status = ?err.status(), "gateway request failed");
        return Err(err);
    }

    Ok(response)
}

// Gateway errors look like {"error": "..."} or {"message": "..."}; anything
// else is returned as-is.
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message"] {
            if let Some(Value::String(msg)) = map.get(key) {
                return msg.clone();
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        format!("gateway returned status {}", status.as_u16())
    } else {
        body.to_string()
    }
}

impl AcpApi for AcpClient {
    async fn browse_agents(
        &self,
        query: &str,
        options: &BrowseOptions,
    ) -> Result<Vec<Agent>, GatewayError> {
        let response = self
            .client
            .get(self.url("/agents/search"))
            .query(&[("query", query)])
            .query(options)
            .send()
            .await?;
        let agents = check(response).await?.json::<Option<Vec<Agent>>>().await?;
        Ok(agents.unwrap_or_default())
    }

    async fn initiate_job(&self, request: &JobRequest) -> Result<String, GatewayError> {
        let response = self
            .client
            .post(self.url("/jobs"))
            .json(request)
            .send()
            .await?;
        let created = check(response).await?.json::<JobCreated>().await?;
        Ok(created.job_id)
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<JobSnapshot>, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/jobs/{job_id}")))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let job = check(response).await?.json::<Option<JobSnapshot>>().await?;
        Ok(job)
    }

    async fn pay_and_accept(&self, job_id: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(self.url(&format!("/jobs/{job_id}/pay-and-accept")))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn token_balances(&self) -> Result<Option<Value>, GatewayError> {
        let response = self
            .client
            .get(self.url("/wallet/balances"))
            .send()
            .await?;
        let balances = check(response).await?.json::<Option<Value>>().await?;
        Ok(balances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acp::types::{AgentSort, Fare, FareAmount, GraduationStatus, JobPhase, OnlineStatus};
    use crate::config::{Credentials, PrivateKey};
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            wallet_private_key: PrivateKey::new("0xdeadbeef".into()),
            session_entity_key_id: 3,
            agent_wallet_address: "0xbuyer".into(),
        }
    }

    fn client_for(server: &MockServer) -> AcpClient {
        AcpClient::build(&credentials(), &server.uri(), "req-1").unwrap()
    }

    #[tokio::test]
    async fn cleartext_gateway_must_be_loopback() {
        for url in [
            "http://127.0.0.1:8787",
            "http://localhost:8787/",
            "http://[::1]:9000",
            "https://gateway.example.com",
        ] {
            assert!(AcpClient::build(&credentials(), url, "req-1").is_ok(), "{url}");
        }

        for url in [
            "http://gateway.example.com",
            "http://10.0.0.5:8787",
            "ftp://127.0.0.1",
            "not a url",
        ] {
            let err = AcpClient::build(&credentials(), url, "req-1").err().unwrap();
            assert!(matches!(err, AcpError::InvalidConfig(_)), "{url}");
        }
    }

    #[tokio::test]
    async fn browse_sends_query_and_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/agents/search"))
            .and(query_param("query", "market data"))
            .and(query_param("sortBy", "successfulJobCount"))
            .and(query_param("topK", "5"))
            .and(query_param("graduationStatus", "all"))
            .and(query_param("onlineStatus", "all"))
            .and(header("x-agent-wallet-address", "0xbuyer"))
            .and(header("x-session-entity-key-id", "3"))
            .and(header("x-request-id", "req-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "id": 17,
                    "name": "Oracle",
                    "walletAddress": "0xoracle",
                    "description": "price feeds",
                    "jobOfferings": [{"name": "quote", "price": 0.5, "priceType": "fixed"}]
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let opts = BrowseOptions {
            sort_by: AgentSort::SuccessfulJobCount,
            top_k: 5,
            graduation_status: GraduationStatus::All,
            online_status: OnlineStatus::All,
        };
        let agents = client_for(&server)
            .browse_agents("market data", &opts)
            .await
            .unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].wallet_address, "0xoracle");
        assert_eq!(agents[0].job_offerings.as_ref().unwrap()[0].name, "quote");
    }

    #[tokio::test]
    async fn initiate_job_posts_request_and_returns_id() {
        let server = MockServer::start().await;
        let request = JobRequest {
            provider_address: "0xoracle".into(),
            service_requirement: serde_json::json!({"pair": "ETH/USD"}),
            fare_amount: FareAmount::new(
                0.0,
                Fare {
                    contract_address: "0xusdc".into(),
                    decimals: 6,
                },
            ),
            job_offering: None,
        };

        Mock::given(method("POST"))
            .and(path("/jobs"))
            .and(body_json(serde_json::to_value(&request).unwrap()))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({"jobId": "881"})))
            .expect(1)
            .mount(&server)
            .await;

        let id = client_for(&server).initiate_job(&request).await.unwrap();
        assert_eq!(id, "881");
    }

    #[tokio::test]
    async fn get_job_parses_snapshot() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/jobs/881"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "881",
                "phase": 4,
                "deliverable": {"price": 3120.5}
            })))
            .mount(&server)
            .await;

        let job = client_for(&server).get_job("881").await.unwrap().unwrap();
        assert_eq!(job.phase, JobPhase::Completed);
        assert_eq!(job.deliverable.unwrap()["price"], 3120.5);
    }

    #[tokio::test]
    async fn get_job_not_found_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/jobs/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/jobs/0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(client.get_job("404").await.unwrap().is_none());
        assert!(client.get_job("0").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn pay_and_accept_posts_to_job() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/jobs/881/pay-and-accept"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client_for(&server).pay_and_accept("881").await.unwrap();
    }

    #[tokio::test]
    async fn balances_null_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/wallet/balances"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        assert!(client_for(&server).token_balances().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn gateway_error_message_is_passed_through() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/jobs/5/pay-and-accept"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({"error": "insufficient allowance"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).pay_and_accept("5").await.unwrap_err();
        match err {
            GatewayError::ApiError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "insufficient allowance");
            }
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_reads_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/wallet/balances"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
            .mount(&server)
            .await;

        let err = client_for(&server).token_balances().await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::RateLimited {
                retry_after_ms: 7000
            }
        ));
    }

    #[test]
    fn error_message_falls_back_to_body_then_status() {
        assert_eq!(
            error_message(r#"{"message":"bad key"}"#, StatusCode::UNAUTHORIZED),
            "bad key"
        );
        assert_eq!(
            error_message("upstream down", StatusCode::BAD_GATEWAY),
            "upstream down"
        );
        assert_eq!(
            error_message("", StatusCode::BAD_GATEWAY),
            "gateway returned status 502"
        );
    }

    #[test]
    fn build_rejects_header_unsafe_values() {
        let mut creds = credentials();
        creds.agent_wallet_address = "0xbad\naddress".into();
        let err = AcpClient::build(&creds, DEFAULT_GATEWAY_URL, "req-1")
            .err()
            .unwrap();
        assert!(matches!(err, AcpError::InvalidConfig(_)));
    }
}
