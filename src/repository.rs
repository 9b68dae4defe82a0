use std::io::Read;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::SyncError;
use crate::manifest::MANIFEST_PATH;

/// Authenticated view of the remote genome repository.
pub trait GenomeRepository {
    fn base_url(&self) -> &str;
    fn fetch_manifest(&self) -> Result<String, SyncError>;
    /// Opens a byte stream for a genome file. The stream is dropped by the
    /// caller once the copy ends, on success or failure.
    fn open_genome(&self, url: &str) -> Result<Box<dyn Read>, SyncError>;

    fn source_url(&self, relative_path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url().trim_end_matches('/'),
            relative_path.trim_start_matches('/')
        )
    }
}

/// Opens a repository session for a set of credentials.
pub trait RepositoryConnector {
    type Repository: GenomeRepository;

    fn connect(
        &self,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Self::Repository, SyncError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl RepositoryConnector for HttpConnector {
    type Repository = RepositoryHttpClient;

    fn connect(
        &self,
        base_url: &str,
        username: &str,
        password: &str,
    ) -> Result<Self::Repository, SyncError> {
        RepositoryHttpClient::new(base_url, username, password)
    }
}

#[derive(Clone)]
pub struct RepositoryHttpClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
}

impl RepositoryHttpClient {
    pub fn new(base_url: &str, username: &str, password: &str) -> Result<Self, SyncError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("enigma-sync/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| SyncError::RepositoryHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| SyncError::RepositoryHttp(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
    }

    fn handle_status(response: Response) -> Result<Response, SyncError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "genome repository request failed".to_string());
        Err(SyncError::RepositoryStatus { status, message })
    }
}

impl GenomeRepository for RepositoryHttpClient {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch_manifest(&self) -> Result<String, SyncError> {
        let url = self.source_url(MANIFEST_PATH);
        let response = self
            .get(&url)
            .send()
            .map_err(|err| SyncError::RepositoryHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let bytes = response
            .bytes()
            .map_err(|err| SyncError::RepositoryHttp(err.to_string()))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|err| SyncError::RepositoryHttp(format!("manifest is not UTF-8: {err}")))
    }

    fn open_genome(&self, url: &str) -> Result<Box<dyn Read>, SyncError> {
        let response = self
            .get(url)
            .send()
            .map_err(|err| SyncError::RepositoryHttp(err.to_string()))?;
        let response = Self::handle_status(response)?;
        Ok(Box::new(response))
    }
}
