//! Inference seam: "read this document, follow these instructions".
//!
//! Providers disagree on the content shape: some return a plain string, some
//! a list of blocks whose first entry carries the text. `MessageContent`
//! models both and `into_text` normalises them at the boundary.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{LlmClient, RequestBlock};
use crate::storage::ObjectStorage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub message: InferenceMessage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceMessage {
    pub content: MessageContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<TextBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub text: String,
}

impl MessageContent {
    /// The response text; `None` when a block list is empty.
    pub fn into_text(self) -> Option<String> {
        match self {
            MessageContent::Text(text) => Some(text),
            MessageContent::Blocks(blocks) => blocks.into_iter().next().map(|b| b.text),
        }
    }
}

impl InferenceResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            message: InferenceMessage {
                content: MessageContent::Text(text.into()),
            },
        }
    }

    pub fn from_blocks(blocks: Vec<String>) -> Self {
        Self {
            message: InferenceMessage {
                content: MessageContent::Blocks(
                    blocks.into_iter().map(|text| TextBlock { text }).collect(),
                ),
            },
        }
    }

    pub fn into_text(self) -> Option<String> {
        self.message.content.into_text()
    }
}

#[async_trait]
pub trait Inference: Send + Sync {
    /// Asks the model about the stored document at `document_path`.
    /// `None` means the provider answered without any usable message.
    async fn feedback(&self, document_path: &str, instructions: &str) -> Result<Option<InferenceResponse>>;
}

/// Claude backed inference. The document is fetched from storage and sent
/// inline, so the model never needs access to the bucket.
pub struct ClaudeInference {
    llm: LlmClient,
    storage: Arc<dyn ObjectStorage>,
}

impl ClaudeInference {
    pub fn new(llm: LlmClient, storage: Arc<dyn ObjectStorage>) -> Self {
        Self { llm, storage }
    }
}

#[async_trait]
impl Inference for ClaudeInference {
    async fn feedback(&self, document_path: &str, instructions: &str) -> Result<Option<InferenceResponse>> {
        let document = self.storage.read(document_path).await?;
        info!("Requesting feedback for {document_path} ({} bytes)", document.len());

        let content = [
            RequestBlock::document("application/pdf", &document),
            RequestBlock::text(instructions),
        ];
        let response = self.llm.call(&content, JSON_ONLY_SYSTEM).await?;

        let blocks = response.text_blocks();
        if blocks.is_empty() {
            return Ok(None);
        }
        Ok(Some(InferenceResponse::from_blocks(blocks)))
    }
}
