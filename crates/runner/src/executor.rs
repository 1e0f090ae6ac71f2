use std::future::Future;

use chmask_contracts::Statement;

use crate::config::ClickHouseEndpoint;

const CONNECTIVITY_QUERY: &str = "SELECT 1";

#[derive(Debug)]
pub enum DispatchError {
    Timeout,
    Http(reqwest::Error),
    BadStatus {
        status: reqwest::StatusCode,
        body: String,
    },
}

impl std::fmt::Display for DispatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchError::Timeout => write!(f, "ClickHouse request timed out"),
            DispatchError::Http(err) => write!(f, "ClickHouse HTTP error: {}", err),
            DispatchError::BadStatus { status, body } => {
                write!(f, "ClickHouse returned status {}: {}", status, body.trim())
            }
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<reqwest::Error> for DispatchError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            DispatchError::Timeout
        } else {
            DispatchError::Http(value)
        }
    }
}

/// Channel a job dispatches rendered statements through, one at a time.
pub trait StatementExecutor {
    fn execute(
        &self,
        statement: &Statement,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;
}

/// Sends statements as the body of authenticated POSTs to the ClickHouse HTTP interface.
#[derive(Clone)]
pub struct HttpExecutor {
    url: String,
    user: String,
    password: String,
    http: reqwest::Client,
}

impl HttpExecutor {
    pub fn new(endpoint: &ClickHouseEndpoint) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .map_err(DispatchError::Http)?;

        Ok(Self {
            url: format!("{}/", endpoint.url.trim_end_matches('/')),
            user: endpoint.user.clone(),
            password: endpoint.password.clone(),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Round-trips a trivial query so unreachable hosts and bad credentials surface
    /// before any mutation is sent.
    pub async fn check_connectivity(&self) -> Result<(), DispatchError> {
        self.post(CONNECTIVITY_QUERY.to_string()).await
    }

    async fn post(&self, body: String) -> Result<(), DispatchError> {
        let resp = self
            .http
            .post(self.url.as_str())
            .basic_auth(&self.user, Some(&self.password))
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp
            .text()
            .await
            .unwrap_or_else(|err| format!("<unreadable body: {}>", err));
        Err(DispatchError::BadStatus { status, body })
    }
}

impl StatementExecutor for HttpExecutor {
    async fn execute(&self, statement: &Statement) -> Result<(), DispatchError> {
        self.post(statement.text.clone()).await
    }
}
