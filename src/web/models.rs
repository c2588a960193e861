// Request and response types exchanged between the framer, the handlers
// and the connection writer.

use serde::Serialize;

/// Header fields in the order they were received.
/// Lookups ignore ASCII case, as HTTP field names are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next()
    }

    pub fn get_all<'a, 'n>(
        &'a self,
        name: &'n str,
    ) -> impl Iterator<Item = &'a str> + use<'a, 'n> {
        self.0
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A fully framed HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomingRequest {
    pub method: String,
    pub path: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

/// Body of `GET /health`.
#[derive(Serialize, Debug)]
pub struct HealthStatus {
    pub status: &'static str,
}

/// Body of a successful `POST /extract`.
#[derive(Serialize, Debug)]
pub struct DetectedLanguage {
    pub language: String,
}

/// Body of every error response.
#[derive(Serialize, Debug)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

/// A buffered JSON response. The connection is always closed after it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingResponse {
    pub status_code: u16,
    pub body: String,
}

impl OutgoingResponse {
    pub fn json<T: Serialize>(status_code: u16, value: &T) -> Self {
        let body = serde_json::to_string(value).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize response body: {}", e);
            String::from("{}")
        });
        OutgoingResponse { status_code, body }
    }

    pub fn error(status_code: u16, message: &str) -> Self {
        Self::json(status_code, &ErrorBody { error: message })
    }

    // Only 200 gets its own reason phrase; every other status, 404 included,
    // is sent as "Bad Request".
    pub fn reason_phrase(&self) -> &'static str {
        match self.status_code {
            200 => "OK",
            _ => "Bad Request",
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let head = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status_code,
            self.reason_phrase(),
            mime::APPLICATION_JSON,
            self.body.len()
        );
        let mut bytes = Vec::with_capacity(head.len() + self.body.len());
        bytes.extend_from_slice(head.as_bytes());
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}
