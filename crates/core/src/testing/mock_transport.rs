//! Mock HTTP transport for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::http::{FetchError, FetchRequest, FetchResponse, HttpTransport};

enum Scripted {
    Response(FetchResponse),
    Error(FetchError),
}

/// Mock implementation of the HttpTransport trait.
///
/// Replays scripted responses in order and records every request:
///
/// ```rust,ignore
/// let transport = Arc::new(MockTransport::new());
/// transport.push_response(MockTransport::redirect("https://site/home").with_cookies("uid=1"));
/// transport.push_response(MockTransport::ok("<html>welcome</html>"));
/// ```
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<FetchRequest>>,
    fallback: Mutex<Option<FetchResponse>>,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("requests", &self.request_count())
            .finish_non_exhaustive()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// `200 OK` with `body`.
    pub fn ok(body: &str) -> FetchResponse {
        Self::status(200, body)
    }

    pub fn status(status: u16, body: &str) -> FetchResponse {
        FetchResponse {
            status,
            body: body.as_bytes().to_vec(),
            ..Default::default()
        }
    }

    /// `302 Found` pointing at `target`.
    pub fn redirect(target: impl Into<String>) -> FetchResponse {
        FetchResponse {
            status: 302,
            redirect_target: Some(target.into()),
            ..Default::default()
        }
    }

    pub fn push_response(&self, response: FetchResponse) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Response(response));
    }

    pub fn push_error(&self, error: FetchError) {
        self.script.lock().unwrap().push_back(Scripted::Error(error));
    }

    /// Returned whenever the script is exhausted.
    pub fn set_fallback(&self, response: FetchResponse) {
        *self.fallback.lock().unwrap() = Some(response);
    }

    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        self.requests.lock().unwrap().push(request.clone());

        let next = self.script.lock().unwrap().pop_front();
        let mut response = match next {
            Some(Scripted::Response(response)) => response,
            Some(Scripted::Error(error)) => return Err(error),
            None => match self.fallback.lock().unwrap().clone() {
                Some(response) => response,
                None => {
                    return Err(FetchError::Transport(format!(
                        "no scripted response for {}",
                        request.url
                    )))
                }
            },
        };

        if response.url.is_empty() {
            response.url = request.url.clone();
        }
        response.encoding = request.encoding;
        Ok(response)
    }
}
