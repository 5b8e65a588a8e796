use std::future::Future;
use std::pin::Pin;

use super::{API_KEY_HEADER, ApiError, ApiRequest, RawResponse, Transport};

/// [`Transport`] over a shared reqwest client.
///
/// No timeout is set on requests; the client's defaults apply.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    fn get<'a>(
        &'a self,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse, ApiError>> + Send + 'a>> {
        Box::pin(async move {
            let mut req = self.client.get(&request.url);
            if !request.api_key.is_empty() {
                req = req.header(API_KEY_HEADER, &request.api_key);
            }
            if !request.params.is_empty() {
                req = req.query(&request.params);
            }

            let resp = req.send().await.map_err(|e| {
                if e.is_connect() {
                    ApiError::Transport(format!("cannot connect to {}", request.url))
                } else {
                    ApiError::Transport(e.to_string())
                }
            })?;

            RawResponse::from_response(resp).await
        })
    }
}
