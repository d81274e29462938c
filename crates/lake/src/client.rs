//! Anonymous read-only access to the public data lake bucket.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::LakeError;
use crate::listing::{parse_list_page, ObjectEntry};

pub const USER_AGENT: &str = concat!("pvcat/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_ENDPOINT: &str = "https://oedi-data-lake.s3.amazonaws.com";

/// What the fetcher and the existence probe need from an object store.
pub trait ObjectStore {
    /// Objects whose key starts with `prefix`. With `max_keys`, a single
    /// page of at most that many entries; without, every page.
    fn list(&self, prefix: &str, max_keys: Option<usize>) -> Result<Vec<ObjectEntry>, LakeError>;

    /// Download one object to `dest`. Returns the number of bytes written.
    fn download(&self, key: &str, dest: &Path) -> Result<u64, LakeError>;
}

/// `[lake]` section of the configuration file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LakeConfig {
    /// Virtual-hosted bucket URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First retry delay; doubles on every further attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    1000
}

impl Default for LakeConfig {
    fn default() -> Self {
        LakeConfig {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// S3 `ListObjectsV2` + `GetObject` over plain HTTPS, no request signing.
pub struct LakeClient {
    http: reqwest::blocking::Client,
    endpoint: String,
    max_retries: u32,
    backoff: Duration,
}

impl LakeClient {
    pub fn new(config: &LakeConfig) -> Result<Self, LakeError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LakeError::Transport {
                url: config.endpoint.clone(),
                message: e.to_string(),
            })?;

        Ok(LakeClient {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.backoff_ms),
        })
    }

    /// GET with retry + exponential backoff. 429, 5xx and transport errors
    /// are retried; any other non-success status fails at once.
    fn get_with_retry(
        &self,
        url: &str,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response, LakeError> {
        let mut backoff = self.backoff;

        for attempt in 0..=self.max_retries {
            match build_request(&self.http).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if resp.status().is_success() {
                        return Ok(resp);
                    }

                    let retryable = status == 429 || status >= 500;
                    if !retryable || attempt == self.max_retries {
                        // S3 explains 4xx in an <Error> body; surface it when present.
                        if let Ok(body) = resp.text() {
                            if let Err(remote @ LakeError::Remote { .. }) = parse_list_page(&body) {
                                return Err(remote);
                            }
                        }
                        return Err(LakeError::Status {
                            url: url.to_string(),
                            status,
                        });
                    }

                    warn!(
                        url,
                        status,
                        attempt = attempt + 1,
                        max = self.max_retries,
                        wait_ms = backoff.as_millis() as u64,
                        "retrying"
                    );
                }
                Err(e) => {
                    if attempt == self.max_retries {
                        return Err(LakeError::Transport {
                            url: url.to_string(),
                            message: e.to_string(),
                        });
                    }
                    warn!(
                        url,
                        error = %e,
                        attempt = attempt + 1,
                        max = self.max_retries,
                        wait_ms = backoff.as_millis() as u64,
                        "retrying"
                    );
                }
            }
            thread::sleep(backoff);
            backoff *= 2;
        }

        Err(LakeError::Transport {
            url: url.to_string(),
            message: "retries exhausted".into(),
        })
    }

    fn list_page(
        &self,
        prefix: &str,
        max_keys: Option<usize>,
        token: Option<&str>,
    ) -> Result<crate::listing::ListPage, LakeError> {
        let url = format!("{}/", self.endpoint);
        let mut query: Vec<(&str, String)> = vec![("list-type", "2".into()), ("prefix", prefix.into())];
        if let Some(n) = max_keys {
            query.push(("max-keys", n.to_string()));
        }
        if let Some(t) = token {
            query.push(("continuation-token", t.into()));
        }

        let resp = self.get_with_retry(&url, |http| http.get(&url).query(&query))?;
        let body = resp.text().map_err(|e| LakeError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;
        parse_list_page(&body)
    }
}

impl ObjectStore for LakeClient {
    fn list(&self, prefix: &str, max_keys: Option<usize>) -> Result<Vec<ObjectEntry>, LakeError> {
        let mut objects = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0;

        loop {
            let page = self.list_page(prefix, max_keys, token.as_deref())?;
            pages += 1;
            objects.extend(page.objects);

            if max_keys.is_some() || !page.is_truncated {
                break;
            }
            match page.next_continuation_token {
                Some(next) => token = Some(next),
                None => {
                    warn!(prefix, "truncated listing without continuation token");
                    break;
                }
            }
        }

        debug!(prefix, objects = objects.len(), pages, "listed");
        Ok(objects)
    }

    fn download(&self, key: &str, dest: &Path) -> Result<u64, LakeError> {
        let url = format!("{}/{}", self.endpoint, key);
        let mut resp = self.get_with_retry(&url, |http| http.get(&url))?;

        // Stream into a sibling file so an interrupted transfer never looks
        // like a finished download.
        let partial = partial_path(dest);
        let mut file = File::create(&partial).map_err(|e| LakeError::io(&partial, e))?;
        let bytes = resp.copy_to(&mut file).map_err(|e| LakeError::Transport {
            url: url.clone(),
            message: e.to_string(),
        })?;
        drop(file);
        std::fs::rename(&partial, dest).map_err(|e| LakeError::io(dest, e))?;

        debug!(key, bytes, dest = %dest.display(), "downloaded");
        Ok(bytes)
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer) -> LakeClient {
        LakeClient::new(&LakeConfig {
            endpoint: server.base_url(),
            backoff_ms: 0,
            ..LakeConfig::default()
        })
        .unwrap()
    }

    fn listing(keys: &[&str], token: Option<&str>) -> String {
        let mut xml = String::from("<ListBucketResult>");
        xml.push_str(&format!("<KeyCount>{}</KeyCount>", keys.len()));
        match token {
            Some(t) => xml.push_str(&format!(
                "<IsTruncated>true</IsTruncated><NextContinuationToken>{t}</NextContinuationToken>"
            )),
            None => xml.push_str("<IsTruncated>false</IsTruncated>"),
        }
        for key in keys {
            xml.push_str(&format!("<Contents><Key>{key}</Key><Size>1</Size></Contents>"));
        }
        xml.push_str("</ListBucketResult>");
        xml
    }

    #[test]
    fn config_defaults() {
        let config = LakeConfig::default();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn follows_continuation_tokens() {
        let server = MockServer::start();

        // Page 2 first so it wins when the token is present.
        let second = server.mock(|when, then| {
            when.method(GET)
                .path("/")
                .query_param("list-type", "2")
                .query_param("continuation-token", "tok2");
            then.status(200).body(listing(&["pvdaq/a/2.csv"], None));
        });
        let first = server.mock(|when, then| {
            when.method(GET).path("/").query_param("prefix", "pvdaq/a/");
            then.status(200).body(listing(&["pvdaq/a/", "pvdaq/a/1.csv"], Some("tok2")));
        });

        let objects = client(&server).list("pvdaq/a/", None).unwrap();
        let keys: Vec<&str> = objects.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["pvdaq/a/", "pvdaq/a/1.csv", "pvdaq/a/2.csv"]);
        first.assert_hits(1);
        second.assert_hits(1);
    }

    #[test]
    fn single_page_with_max_keys() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/").query_param("max-keys", "1");
            then.status(200).body(listing(&["k/1"], Some("more")));
        });

        let objects = client(&server).list("k/", Some(1)).unwrap();
        assert_eq!(objects.len(), 1);
        m.assert_hits(1);
    }

    #[test]
    fn server_errors_are_retried() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(503);
        });

        let err = client(&server).list("x/", Some(1)).unwrap_err();
        assert!(matches!(err, LakeError::Status { status: 503, .. }));
        m.assert_hits(4);
    }

    #[test]
    fn access_denied_is_not_retried() {
        let server = MockServer::start();
        let m = server.mock(|when, then| {
            when.method(GET).path("/");
            then.status(403)
                .body("<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>");
        });

        let err = client(&server).list("x/", None).unwrap_err();
        assert!(matches!(err, LakeError::Remote { ref code, .. } if code == "AccessDenied"));
        m.assert_hits(1);
    }

    #[test]
    fn download_writes_file() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/pvdaq/csv/systems_20250729.csv");
            then.status(200).body("system_id\n1\n");
        });

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("systems_20250729.csv");
        let n = client(&server).download("pvdaq/csv/systems_20250729.csv", &dest).unwrap();

        assert_eq!(n, 12);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), "system_id\n1\n");
        assert!(!partial_path(&dest).exists());
    }
}
