use analysis_core::{AnalysisError, CompletionProvider, CompletionRequest};
use async_trait::async_trait;

use crate::chat::{ChatClient, ChatMessage};

#[async_trait]
impl CompletionProvider for ChatClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, AnalysisError> {
        let messages = [
            ChatMessage::system(request.system),
            ChatMessage::user(request.prompt),
        ];
        let response = self
            .chat_completion(&messages, request.temperature, request.max_tokens)
            .await?;
        Ok(response.into_text()?)
    }

    fn backend_name(&self) -> &'static str {
        "openai-compatible"
    }
}
