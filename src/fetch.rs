use std::collections::HashMap;
use std::time::Duration;

use anyhow::{bail, Result};
use parking_lot::Mutex;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn ok<S: Into<String>>(body: S) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport-level failure. A page answered with an error status is not one
/// of these; it comes back as a [`Page`] and the caller decides.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("connection to {url} failed: {message}")]
    Connectivity { url: String, message: String },
}

pub trait Fetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Page, FetchError>;
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

pub struct HttpFetcher {
    http: HttpClient,
    user_agent: String,
}

impl HttpFetcher {
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            bail!("fetcher user agent required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(20)))
                .build()?,
        };

        Ok(Self {
            http,
            user_agent: config.user_agent,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        let connectivity = |err: reqwest::Error| FetchError::Connectivity {
            url: url.to_string(),
            message: err.to_string(),
        };
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, &self.user_agent)
            .send()
            .map_err(connectivity)?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Ok(Page {
                status,
                body: String::new(),
            });
        }
        let body = response.text().map_err(connectivity)?;
        Ok(Page { status, body })
    }
}

#[derive(Debug, Clone)]
enum Canned {
    Page(Page),
    Unreachable,
}

/// Serves pages from memory. Unknown URLs answer 404. Used for offline runs
/// and tests; every request is counted so callers can check how often a URL
/// was visited.
#[derive(Debug, Default)]
pub struct MapFetcher {
    pages: HashMap<String, Canned>,
    hits: Mutex<HashMap<String, usize>>,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page<U: Into<String>, B: Into<String>>(mut self, url: U, body: B) -> Self {
        self.pages.insert(url.into(), Canned::Page(Page::ok(body)));
        self
    }

    pub fn with_status<U: Into<String>>(mut self, url: U, status: u16) -> Self {
        self.pages.insert(
            url.into(),
            Canned::Page(Page {
                status,
                body: String::new(),
            }),
        );
        self
    }

    /// Requests for `url` fail as if the network were down.
    pub fn with_unreachable<U: Into<String>>(mut self, url: U) -> Self {
        self.pages.insert(url.into(), Canned::Unreachable);
        self
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.lock().get(url).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().values().sum()
    }
}

impl Fetcher for MapFetcher {
    fn fetch(&self, url: &str) -> Result<Page, FetchError> {
        *self.hits.lock().entry(url.to_string()).or_insert(0) += 1;
        match self.pages.get(url) {
            Some(Canned::Page(page)) => Ok(page.clone()),
            Some(Canned::Unreachable) => Err(FetchError::Connectivity {
                url: url.to_string(),
                message: "host unreachable".to_string(),
            }),
            None => Ok(Page {
                status: 404,
                body: String::new(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Answers a single request with `response` and hands back the raw
    /// request it received.
    fn serve_once(response: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/b/", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(response.as_bytes()).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });
        (url, handle)
    }

    fn local_fetcher() -> HttpFetcher {
        HttpFetcher::new(ClientConfig {
            user_agent: "thread-scout-test".to_string(),
            timeout: None,
            http_client: Some(
                HttpClient::builder()
                    .no_proxy()
                    .timeout(Duration::from_secs(5))
                    .build()
                    .unwrap(),
            ),
        })
        .unwrap()
    }

    #[test]
    fn http_error_status_comes_back_as_a_page() {
        let (url, server) = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 9\r\nConnection: close\r\n\r\nnot found",
        );
        let page = local_fetcher().fetch(&url).unwrap();
        server.join().unwrap();
        assert_eq!(
            page,
            Page {
                status: 404,
                body: String::new(),
            }
        );
    }

    #[test]
    fn http_fetcher_reads_body_and_sends_user_agent() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 16\r\nConnection: close\r\n\r\n<a id=\"t42\"></a>",
        );
        let page = local_fetcher().fetch(&url).unwrap();
        let request = server.join().unwrap().to_ascii_lowercase();
        assert!(page.is_success());
        assert_eq!(page.body, r#"<a id="t42"></a>"#);
        assert!(request.starts_with("get /b/ "), "request was {request:?}");
        assert!(request.contains("user-agent: thread-scout-test"));
    }

    #[test]
    fn refused_connection_is_a_connectivity_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/b/", listener.local_addr().unwrap());
        drop(listener);
        let err = local_fetcher().fetch(&url).unwrap_err();
        assert!(matches!(err, FetchError::Connectivity { .. }));
    }

    #[test]
    fn map_fetcher_answers_404_for_unknown_urls() {
        let fetcher = MapFetcher::new().with_page("http://a.test/x", "hello");
        let page = fetcher.fetch("http://a.test/y").unwrap();
        assert_eq!(page.status, 404);
        assert!(!page.is_success());
        assert_eq!(fetcher.fetch("http://a.test/x").unwrap().body, "hello");
        assert_eq!(fetcher.total_hits(), 2);
    }

    #[test]
    fn map_fetcher_reports_unreachable_hosts() {
        let fetcher = MapFetcher::new().with_unreachable("http://down.test/");
        let err = fetcher.fetch("http://down.test/").unwrap_err();
        assert!(err.to_string().contains("down.test"));
        assert_eq!(fetcher.hits("http://down.test/"), 1);
    }

    #[test]
    fn http_fetcher_requires_user_agent() {
        assert!(HttpFetcher::new(ClientConfig::default()).is_err());
    }
}
