//! JSON request cycle against a REST API.

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Certificate, Client, Identity, Method};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::retry::RetryPolicy;

/// A JSON REST client bound to one base address.
///
/// `GET` and `HEAD` send their arguments as query parameters; every other
/// method sends them as a JSON object body. Responses are decoded as JSON,
/// with an empty body decoding to `null`.
#[derive(Clone)]
pub struct RestClient {
    http: Client,
    config: ClientConfig,
    retry: RetryPolicy,
}

impl RestClient {
    /// Open a session for `config`.
    ///
    /// # Errors
    ///
    /// Returns a config error for an invalid configuration or unreadable
    /// certificates.
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        info!(address = %config.address, "establish REST http session");

        let http = build_http_client(&config)?;
        Ok(Self {
            http,
            retry: config.retry_policy(),
            config,
        })
    }

    /// Base address of the API.
    pub fn address(&self) -> &str {
        &self.config.address
    }

    /// Configuration this client was built from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Full URL for `path`.
    pub fn url(&self, path: &str) -> String {
        join_url(&self.config.address, path)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    /// Send a request and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Status` for a non-2xx response, a transport
    /// error once retries are exhausted, or a JSON error for an undecodable
    /// body.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        args: Option<&Value>,
    ) -> ClientResult<Value> {
        self.request_with_token(&self.http, method, path, args, self.config.token.as_deref())
            .await
    }

    /// Blocking version of [`request`](Self::request).
    ///
    /// Runs on a private current-thread runtime with a fresh connection
    /// pool, so it must not be called from inside an async runtime.
    ///
    /// # Errors
    ///
    /// Same as [`request`](Self::request), plus `ClientError::Runtime` if the
    /// runtime cannot be built.
    pub fn request_seq(
        &self,
        method: Method,
        path: &str,
        args: Option<&Value>,
    ) -> ClientResult<Value> {
        let runtime = blocking_runtime()?;
        let http = build_http_client(&self.config)?;
        runtime.block_on(self.request_with_token(
            &http,
            method,
            path,
            args,
            self.config.token.as_deref(),
        ))
    }

    /// Close the session.
    pub fn close(self) {
        info!(address = %self.config.address, "close REST http session");
    }

    pub(crate) async fn request_with_token(
        &self,
        http: &Client,
        method: Method,
        path: &str,
        args: Option<&Value>,
        token: Option<&str>,
    ) -> ClientResult<Value> {
        let result = self.execute(http, &method, path, args, token).await;

        if let Err(e) = &result {
            // 404 on DELETE is an expected outcome for callers
            if !(method == Method::DELETE && e.is_not_found()) {
                info!(%method, path, args = ?args, error = %e, "bad request");
            }
        }

        result
    }

    async fn execute(
        &self,
        http: &Client,
        method: &Method,
        path: &str,
        args: Option<&Value>,
        token: Option<&str>,
    ) -> ClientResult<Value> {
        let url = self.url(path);
        let payload = Payload::prepare(method, args)?;
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(%method, url = %url, attempt = attempts, "sending request");

            let mut builder = http.request(method.clone(), &url);
            builder = match &payload {
                Payload::Query(pairs) => builder.query(pairs),
                Payload::Json(body) => builder.json(body),
            };
            match (&self.config.username, &self.config.password) {
                (Some(username), Some(password)) => {
                    builder = builder.basic_auth(username, Some(password));
                }
                _ => {
                    if let Some(token) = token {
                        builder = builder.bearer_auth(token);
                    }
                }
            }

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    if self.retry.should_retry_status(method, status) && self.retry.allows(attempts)
                    {
                        let delay = self.retry.delay_for_attempt(attempts);
                        warn!(
                            %method,
                            url = %url,
                            status = status.as_u16(),
                            delay_ms = millis(delay),
                            "Server error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    let body = response.bytes().await?;
                    if !status.is_success() {
                        return Err(ClientError::status(
                            status.as_u16(),
                            String::from_utf8_lossy(&body),
                        ));
                    }
                    return decode(&body);
                }
                Err(e) => {
                    if self.retry.should_retry_error(method, &e) && self.retry.allows(attempts) {
                        let delay = self.retry.delay_for_attempt(attempts);
                        warn!(
                            %method,
                            url = %url,
                            error = %e,
                            delay_ms = millis(delay),
                            "Request failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("address", &self.config.address)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

/// Request arguments, shaped for the method.
#[derive(Debug, PartialEq)]
enum Payload {
    Query(Vec<(String, String)>),
    Json(Value),
}

impl Payload {
    fn prepare(method: &Method, args: Option<&Value>) -> ClientResult<Self> {
        let args = args.filter(|v| !v.is_null());

        if *method == Method::GET || *method == Method::HEAD {
            let pairs = match args {
                None => Vec::new(),
                Some(Value::Object(map)) => query_pairs(map),
                Some(_) => {
                    return Err(ClientError::config(
                        "query arguments must be a JSON object",
                    ))
                }
            };
            Ok(Self::Query(pairs))
        } else {
            Ok(Self::Json(
                args.cloned().unwrap_or_else(|| Value::Object(Map::new())),
            ))
        }
    }
}

/// Flattens an argument object into query pairs; arrays become repeated keys.
fn query_pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(map.len());
    for (name, value) in map {
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = query_text(item) {
                        pairs.push((name.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = query_text(other) {
                    pairs.push((name.clone(), text));
                }
            }
        }
    }
    pairs
}

fn query_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn decode(body: &[u8]) -> ClientResult<Value> {
    if body.is_empty() {
        info!("request returned empty body");
        return Ok(Value::Null);
    }

    serde_json::from_slice(body).map_err(|e| {
        info!(content = %String::from_utf8_lossy(body), "response is not valid JSON");
        e.into()
    })
}

/// Joins `path` onto `address` with a single `/`.
pub(crate) fn join_url(address: &str, path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    if address.ends_with('/') {
        format!("{address}{path}")
    } else {
        format!("{address}/{path}")
    }
}

pub(crate) fn build_http_client(config: &ClientConfig) -> ClientResult<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut builder = Client::builder()
        .timeout(config.timeout())
        .default_headers(headers);

    if let Some(cert) = &config.sslcert {
        let cert_pem = std::fs::read(cert)?;
        // without a separate key the certificate file carries both
        let key_pem = match &config.sslkey {
            Some(key) => std::fs::read(key)?,
            None => cert_pem.clone(),
        };
        let identity = Identity::from_pkcs8_pem(&cert_pem, &key_pem)
            .map_err(|e| ClientError::config(format!("invalid client certificate: {e}")))?;
        builder = builder.identity(identity);
    }

    if let Some(cacert) = &config.cacert {
        let pem = std::fs::read(cacert)?;
        let ca = Certificate::from_pem(&pem)
            .map_err(|e| ClientError::config(format!("invalid CA certificate: {e}")))?;
        builder = builder.tls_built_in_root_certs(false).add_root_certificate(ca);
    }

    builder
        .build()
        .map_err(|e| ClientError::config(format!("failed to create client: {e}")))
}

pub(crate) fn blocking_runtime() -> ClientResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ClientError::runtime(format!("failed to build runtime: {e}")))
}

fn millis(delay: std::time::Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
