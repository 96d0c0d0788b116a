use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChatBackend, ChatRequest, FragmentStream};
use crate::error::ChatError;
use crate::state::ChatRole;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
}

#[derive(Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Deserialize)]
struct GeminiChunk {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    #[serde(default)]
    message: String,
}

impl GeminiRequest {
    fn from_chat(request: &ChatRequest) -> Self {
        let contents = request
            .contents
            .iter()
            .filter_map(|msg| {
                let role = match msg.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                    ChatRole::System => return None,
                };
                Some(GeminiContent {
                    role: Some(role),
                    parts: vec![GeminiPart {
                        text: msg.content.clone(),
                    }],
                })
            })
            .collect();

        Self {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: request.system_instruction.clone(),
                }],
            },
            contents,
        }
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(
        api_key: &str,
        model: &str,
        base_url: &str,
        connect_timeout: Duration,
    ) -> Result<Self, ChatError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl ChatBackend for GeminiClient {
    async fn open_stream(&self, request: ChatRequest) -> Result<FragmentStream, ChatError> {
        let body = GeminiRequest::from_chat(&request);
        debug!(model = %self.model, turns = body.contents.len(), "opening Gemini stream");

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status { status, body });
        }

        let mut bytes = Box::pin(response.bytes_stream());

        Ok(Box::pin(stream! {
            let mut decoder = SseDecoder::default();

            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for item in decoder.push(&chunk) {
                            let failed = item.is_err();
                            yield item;
                            if failed {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Gemini stream interrupted");
                        yield Err(ChatError::Http(e));
                        return;
                    }
                }
            }

            if let Some(item) = decoder.finish() {
                yield item;
            }
        }))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Splits an SSE byte stream into `data:` payloads and extracts reply text.
///
/// Bytes are buffered until a full line is available, so payloads (and
/// multi-byte characters) split across network chunks decode correctly.
#[derive(Default)]
struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, ChatError>> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            if let Some(item) = parse_sse_line(&line) {
                out.push(item);
            }
        }
        out
    }

    /// Flush a final line that arrived without a trailing newline
    fn finish(&mut self) -> Option<Result<String, ChatError>> {
        if self.buf.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.buf).into_owned();
        self.buf.clear();
        parse_sse_line(&line)
    }
}

/// Text carried by one SSE line, if any. Non-data fields, blank lines and
/// payloads without text yield `None`.
fn parse_sse_line(line: &str) -> Option<Result<String, ChatError>> {
    let line = line.trim_end_matches('\r');
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }

    let chunk: GeminiChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => return Some(Err(ChatError::Decode(e.to_string()))),
    };

    if let Some(error) = chunk.error {
        return Some(Err(ChatError::Provider(error.message)));
    }

    let text: String = chunk
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        None
    } else {
        Some(Ok(text))
    }
}
