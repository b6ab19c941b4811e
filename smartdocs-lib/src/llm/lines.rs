use futures::StreamExt;
use tracing::debug;

use super::{LlmError, TokenStream};
use crate::stream::LineBuffer;

/// What one upstream line contributed
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Fragment {
    pub text: Option<String>,
    /// The backend signalled normal completion
    pub finished: bool,
}

impl Fragment {
    pub fn skip() -> Self {
        Self::default()
    }
}

/// Check the status of a streaming response, logging (but not returning) the
/// body of a failed one.
pub(crate) async fn ensure_success(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: String = response.text().await.unwrap_or_default().chars().take(512).collect();
    debug!(provider, status = status.as_u16(), %body, "model request rejected");
    Err(LlmError::Status(status.as_u16()))
}

/// Turn a line-oriented streaming body into text fragments.
///
/// A stream that ends without the backend's completion marker yields a final
/// error instead of passing for a complete answer.
pub(crate) fn line_stream(
    provider: &'static str,
    response: reqwest::Response,
    parse: fn(&str) -> Result<Fragment, LlmError>,
) -> TokenStream {
    let mut body = Box::pin(response.bytes_stream());

    Box::pin(async_stream::stream! {
        let mut lines = LineBuffer::new();
        let mut finished = false;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(LlmError::Stream(e.to_string()));
                    return;
                }
            };
            lines.extend(&chunk);
            while let Some(line) = lines.next_line() {
                match parse(&line) {
                    Ok(fragment) => {
                        finished |= fragment.finished;
                        if let Some(text) = fragment.text {
                            yield Ok(text);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        if let Some(rest) = lines.remainder() {
            match parse(&rest) {
                Ok(fragment) => {
                    finished |= fragment.finished;
                    if let Some(text) = fragment.text {
                        yield Ok(text);
                    }
                }
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if !finished {
            yield Err(LlmError::Stream(format!("{provider} stream ended before completion")));
        }
    })
}
