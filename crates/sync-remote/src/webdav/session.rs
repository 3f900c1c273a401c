//! Blocking WebDAV client session.

use super::propfind::{parse_multistatus, LISTING_BODY};
use crate::path::normalize_base_url;
use crate::store::{EntryKind, MkdirStatus, RemoteEntry, RemoteStore};
use crate::{ConnectionError, Error, Result};
use log::{debug, info};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{CONTENT_TYPE, IF_NONE_MATCH};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Where and as whom to connect.
pub struct ConnectionDescriptor {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<SecretString>,
}

impl ConnectionDescriptor {
    /// Build a descriptor; empty credentials mean anonymous access.
    pub fn new(base_url: impl Into<String>, username: &str, password: &str) -> Self {
        let username = Some(username.trim().to_string()).filter(|u| !u.is_empty());
        let password = Some(password)
            .filter(|p| !p.is_empty())
            .map(|p| SecretString::new(p.to_string()));
        Self {
            base_url: base_url.into(),
            username,
            password,
        }
    }
}

impl std::fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionDescriptor")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Timeouts applied by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Bound on the reachability probe, and on opening any connection.
    pub probe_timeout: Duration,
    /// Bound on every metadata request (`PROPFIND`, `MKCOL`, `DELETE`).
    pub request_timeout: Duration,
    /// Bound on a whole `PUT` or `GET` of a snapshot, body included.
    pub transfer_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            probe_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(30),
            transfer_timeout: Duration::from_secs(3600),
        }
    }
}

/// A verified connection to a WebDAV endpoint.
pub struct WebDavSession {
    client: Client,
    base: Url,
    username: Option<String>,
    password: Option<SecretString>,
    config: SessionConfig,
}

impl WebDavSession {
    /// Normalize the base URL, probe the endpoint, and return a usable
    /// session.
    ///
    /// The probe is a `PROPFIND` with `Depth: 0` on the base URL; its
    /// failures come back as [`Error::Connection`].
    pub fn connect(descriptor: &ConnectionDescriptor, config: SessionConfig) -> Result<Self> {
        let base_url = normalize_base_url(&descriptor.base_url)?;
        let base = Url::parse(&base_url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        if !base.username().is_empty() || base.password().is_some() {
            return Err(Error::InvalidUrl(
                "credentials must not be embedded in the base URL".to_string(),
            ));
        }

        let client = Client::builder()
            .connect_timeout(config.probe_timeout)
            .timeout(config.request_timeout)
            .build()?;

        let session = Self {
            client,
            base,
            username: descriptor.username.clone(),
            password: descriptor
                .password
                .as_ref()
                .map(|p| SecretString::new(p.expose_secret().clone())),
            config,
        };
        session.probe()?;

        info!("Connected to {}", session.base);
        Ok(session)
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &str {
        self.base.as_str()
    }

    fn probe(&self) -> std::result::Result<(), ConnectionError> {
        debug!("Probing {}", self.base);
        let response = self
            .request(propfind(), self.base.clone())
            .header("Depth", "0")
            .timeout(self.config.probe_timeout)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ConnectionError::Timeout
                } else {
                    ConnectionError::Unreachable(e.to_string())
                }
            })?;

        classify_probe(
            response.status(),
            content_type(&response).as_deref(),
            self.base.as_str(),
        )
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.username {
            Some(username) => builder.basic_auth(
                username,
                self.password.as_ref().map(|p| p.expose_secret().as_str()),
            ),
            None => builder,
        }
    }

    /// Resolve a remote path against the base URL, percent-encoding each
    /// segment. A trailing `/` is kept.
    fn url_for(&self, path: &str) -> Result<Url> {
        let mut segments = Vec::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(Error::InvalidPath(path.to_string()));
            }
            segments.push(urlencoding::encode(segment).into_owned());
        }

        let mut relative = segments.join("/");
        if path.ends_with('/') && !relative.is_empty() {
            relative.push('/');
        }
        self.base
            .join(&relative)
            .map_err(|e| Error::InvalidPath(format!("{}: {}", path, e)))
    }
}

impl RemoteStore for WebDavSession {
    fn exists(&self, path: &str) -> Result<bool> {
        let url = self.url_for(path)?;
        debug!("PROPFIND (depth 0) {}", url);
        let response = self.request(propfind(), url).header("Depth", "0").send()?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            status => Err(status_error("PROPFIND", path, status)),
        }
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let url = self.url_for(path)?;
        let own_path = decoded(url.path()).trim_end_matches('/').to_string();
        debug!("PROPFIND (depth 1) {}", url);

        let response = self
            .request(propfind(), url)
            .header("Depth", "1")
            .header(CONTENT_TYPE, "application/xml; charset=utf-8")
            .body(LISTING_BODY)
            .send()?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(Error::NotFound(path.to_string())),
            status if status.is_success() => {}
            status => return Err(status_error("PROPFIND", path, status)),
        }

        let body = response.text()?;
        let mut entries = Vec::new();
        for entry in parse_multistatus(&body)? {
            let href = href_path(&entry.href);
            let href = href.trim_end_matches('/');
            if href == own_path {
                continue;
            }
            let name = href.rsplit('/').next().unwrap_or(href);
            if name.is_empty() {
                continue;
            }
            entries.push(RemoteEntry {
                name: name.to_string(),
                kind: if entry.is_collection {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                size: entry.content_length,
                last_modified: entry.last_modified,
            });
        }

        debug!("Listed {} entries under {}", entries.len(), path);
        Ok(entries)
    }

    fn mkdir(&self, path: &str) -> Result<MkdirStatus> {
        let url = self.url_for(path)?;
        debug!("MKCOL {}", url);
        let response = self.request(mkcol(), url).send()?;

        match response.status() {
            StatusCode::METHOD_NOT_ALLOWED => Ok(MkdirStatus::AlreadyExists),
            status if status.is_success() => Ok(MkdirStatus::Created),
            status => Err(status_error("MKCOL", path, status)),
        }
    }

    fn upload(&self, local: &Path, remote_path: &str, overwrite: bool) -> Result<()> {
        let url = self.url_for(remote_path)?;
        let file = File::open(local)?;
        debug!("PUT {} ({} bytes)", url, file.metadata()?.len());

        let mut request = self
            .request(Method::PUT, url)
            .header(CONTENT_TYPE, "application/gzip")
            .timeout(self.config.transfer_timeout);
        if !overwrite {
            request = request.header(IF_NONE_MATCH, "*");
        }
        let response = request.body(file).send()?;

        match response.status() {
            StatusCode::PRECONDITION_FAILED => Err(Error::AlreadyExists(remote_path.to_string())),
            status if status.is_success() => Ok(()),
            status => Err(status_error("PUT", remote_path, status)),
        }
    }

    fn download(&self, remote_path: &str, local: &Path) -> Result<()> {
        let url = self.url_for(remote_path)?;
        debug!("GET {}", url);
        let mut response = self
            .request(Method::GET, url)
            .timeout(self.config.transfer_timeout)
            .send()?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(Error::NotFound(remote_path.to_string())),
            status if status.is_success() => {}
            status => return Err(status_error("GET", remote_path, status)),
        }

        let mut file = File::create(local)?;
        let written = response.copy_to(&mut file)?;
        file.sync_all()?;
        debug!("Downloaded {} bytes to {}", written, local.display());
        Ok(())
    }

    fn remove(&self, remote_path: &str) -> Result<()> {
        let url = self.url_for(remote_path)?;
        debug!("DELETE {}", url);
        let response = self.request(Method::DELETE, url).send()?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::NotFound(remote_path.to_string())),
            status if status.is_success() => Ok(()),
            status => Err(status_error("DELETE", remote_path, status)),
        }
    }
}

/// Classify the answer to the reachability probe.
///
/// Some hosting setups answer every path with a `200` HTML page, so a
/// success status is only trusted when the body is not HTML.
pub fn classify_probe(
    status: StatusCode,
    content_type: Option<&str>,
    url: &str,
) -> std::result::Result<(), ConnectionError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ConnectionError::AuthRejected {
            status: status.as_u16(),
        }),
        StatusCode::NOT_FOUND => Err(ConnectionError::EndpointNotFound {
            url: url.to_string(),
        }),
        status if status.is_success() => match content_type {
            Some(ct) if ct.to_ascii_lowercase().contains("html") => {
                Err(ConnectionError::HtmlResponse {
                    content_type: ct.to_string(),
                })
            }
            _ => Ok(()),
        },
        status => Err(ConnectionError::UnexpectedStatus {
            status: status.as_u16(),
        }),
    }
}

fn propfind() -> Method {
    Method::from_bytes(b"PROPFIND").expect("PROPFIND is a valid method token")
}

fn mkcol() -> Method {
    Method::from_bytes(b"MKCOL").expect("MKCOL is a valid method token")
}

fn content_type(response: &Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn status_error(method: &str, path: &str, status: StatusCode) -> Error {
    Error::Status {
        method: method.to_string(),
        path: path.to_string(),
        status: status.as_u16(),
    }
}

/// Path part of an href, which servers send either as a path or as a full
/// URL, percent-decoded.
fn href_path(href: &str) -> String {
    let path = match Url::parse(href) {
        Ok(url) => url.path().to_string(),
        Err(_) => href.to_string(),
    };
    decoded(&path)
}

fn decoded(text: &str) -> String {
    urlencoding::decode(text)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| text.to_string())
}
