use crate::config::Config;
use crate::error::{Error, Result};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP protocol version requested for a single call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HttpVersion {
    /// The statehouse server sends malformed chunked responses over HTTP/1.1
    #[default]
    Http10,
    Http11,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Everything needed to issue one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub method: Method,
    pub form: Vec<(String, String)>,
    pub http_version: HttpVersion,
    /// Accept a body cut short by the transport instead of failing
    pub allow_partial: bool,
}

impl Request {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            form: Vec::new(),
            http_version: HttpVersion::default(),
            allow_partial: false,
        }
    }

    pub fn post<K, V>(url: impl Into<String>, form: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            url: url.into(),
            method: Method::Post,
            form: form.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            http_version: HttpVersion::default(),
            allow_partial: false,
        }
    }

    pub fn http_version(mut self, version: HttpVersion) -> Self {
        self.http_version = version;
        self
    }

    pub fn allow_partial(mut self) -> Self {
        self.allow_partial = true;
        self
    }
}

/// A fetched response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
    /// The transport failed before the body was complete
    pub truncated: bool,
}

impl Page {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Source of pages. Implementations must not share per-request settings
/// between calls.
pub trait Fetcher {
    fn fetch(&self, request: &Request) -> Result<Page>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, request: &Request) -> Result<Page> {
        (**self).fetch(request)
    }
}

/// Blocking HTTP fetcher with retries
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    retry_attempts: u32,
    retry_wait: Duration,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            retry_attempts: config.retry_attempts.max(1),
            retry_wait: config.retry_wait,
        })
    }

    fn send(&self, request: &Request) -> Result<reqwest::blocking::Response> {
        let version = match request.http_version {
            HttpVersion::Http10 => reqwest::Version::HTTP_10,
            HttpVersion::Http11 => reqwest::Version::HTTP_11,
        };
        let builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url).form(&request.form),
        };
        Ok(builder.version(version).send()?)
    }

    /// Send with retries on transport failures and server errors
    fn send_with_retries(&self, request: &Request) -> Result<reqwest::blocking::Response> {
        let mut wait = self.retry_wait;
        let mut attempt = 1;
        loop {
            let outcome = self.send(request);
            let retryable = match &outcome {
                Ok(response) => response.status().is_server_error(),
                Err(Error::Http(e)) => e.is_connect() || e.is_timeout() || e.is_request(),
                Err(_) => false,
            };
            if !retryable || attempt >= self.retry_attempts {
                return outcome;
            }
            warn!(
                "Attempt {}/{} for {} failed, retrying in {:?}",
                attempt, self.retry_attempts, request.url, wait
            );
            thread::sleep(wait);
            wait *= 2;
            attempt += 1;
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, request: &Request) -> Result<Page> {
        debug!("{:?} {}", request.method, request.url);
        let mut response = self.send_with_retries(request)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let mut body = Vec::new();
        let truncated = match response.read_to_end(&mut body) {
            Ok(_) => false,
            Err(e) if request.allow_partial => {
                warn!(
                    "Incomplete read on {} ({}), keeping {} bytes",
                    request.url,
                    e,
                    body.len()
                );
                true
            }
            Err(e) => return Err(Error::Io(e)),
        };

        Ok(Page {
            url: request.url.clone(),
            status: status.as_u16(),
            body,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;

    const SHORT_BODY: &str = "<span>H 0012</span>";

    /// Serve `count` connections whose responses promise more body than they
    /// send. The handle yields each request line received.
    fn short_body_server(count: usize) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let mut request_lines = Vec::new();
            for stream in listener.incoming().take(count) {
                let mut stream = stream.unwrap();
                let mut reader = BufReader::new(stream.try_clone().unwrap());
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                request_lines.push(line.trim_end().to_string());
                loop {
                    let mut header = String::new();
                    if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                        break;
                    }
                }
                let response = format!(
                    "HTTP/1.0 200 OK\r\nContent-Length: 1000\r\n\r\n{}",
                    SHORT_BODY
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
            request_lines
        });
        (base, handle)
    }

    fn local_fetcher() -> HttpFetcher {
        let mut config = Config::new("2019-2020");
        config.retry_attempts = 1;
        config.timeout = Duration::from_secs(5);
        HttpFetcher::new(&config).unwrap()
    }

    #[test]
    fn test_short_body_kept_only_when_partial_allowed() {
        let (base, server) = short_body_server(3);
        let fetcher = local_fetcher();
        let url = format!("{}/s", base);

        let page = fetcher
            .fetch(&Request::get(url.clone()).allow_partial())
            .unwrap();
        assert!(page.truncated);
        assert_eq!(page.status, 200);
        assert_eq!(page.text(), SHORT_BODY);

        let err = fetcher.fetch(&Request::get(url.clone())).unwrap_err();
        assert!(matches!(err, Error::Io(_)), "unexpected error: {err}");

        let page = fetcher
            .fetch(
                &Request::get(url)
                    .http_version(HttpVersion::Http11)
                    .allow_partial(),
            )
            .unwrap();
        assert!(page.truncated);

        let request_lines = server.join().unwrap();
        assert_eq!(
            request_lines,
            vec!["GET /s HTTP/1.0", "GET /s HTTP/1.0", "GET /s HTTP/1.1"]
        );
    }

    #[test]
    fn test_requests_default_to_http10() {
        let request = Request::get("https://www.scstatehouse.gov/");
        assert_eq!(request.http_version, HttpVersion::Http10);
        assert!(!request.allow_partial);

        let request = Request::post("https://www.scstatehouse.gov/subjectsearch.php", [("AORB", "B")])
            .http_version(HttpVersion::Http11)
            .allow_partial();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.form, vec![("AORB".to_string(), "B".to_string())]);
        assert_eq!(request.http_version, HttpVersion::Http11);
        assert!(request.allow_partial);
    }

    #[test]
    fn test_page_text_is_lossy() {
        let page = Page {
            url: "u".to_string(),
            status: 200,
            body: vec![b'o', b'k', 0xff],
            truncated: false,
        };
        assert_eq!(page.text(), "ok\u{fffd}");
    }
}
