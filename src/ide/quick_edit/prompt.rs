//! User prompts of the quick edit workflow.

use std::collections::HashMap;

use serde::{
    Deserialize,
    Serialize,
};
use tower_lsp::Client;
use tower_lsp::async_trait;
use tower_lsp::lsp_types::request::Request;
use tower_lsp::lsp_types::{
    MessageActionItem,
    MessageType,
};

/// Prompts shown to the user. `None` means the prompt was dismissed.
#[async_trait]
pub trait Prompter: Send + Sync {
    async fn input_box(&self, prompt: &str, value: Option<&str>) -> Option<String>;

    async fn quick_pick(&self, placeholder: &str, items: Vec<String>) -> Option<String>;

    async fn show_error(&self, message: &str);

    async fn show_info(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputBoxParams {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Server-to-client request for a single line of text.
#[derive(Debug)]
pub enum InputBoxRequest {}

impl Request for InputBoxRequest {
    type Params = InputBoxParams;
    type Result = Option<String>;
    const METHOD: &'static str = "thymeleaf-i18n/inputBox";
}

/// [`Prompter`] backed by the LSP client.
///
/// Quick picks use `window/showMessageRequest`; input boxes use the custom
/// `thymeleaf-i18n/inputBox` request.
#[derive(Debug, Clone)]
pub struct LspPrompter {
    client: Client,
}

impl LspPrompter {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Prompter for LspPrompter {
    async fn input_box(&self, prompt: &str, value: Option<&str>) -> Option<String> {
        let params =
            InputBoxParams { prompt: prompt.to_string(), value: value.map(str::to_string) };
        match self.client.send_request::<InputBoxRequest>(params).await {
            Ok(answer) => answer,
            Err(error) => {
                tracing::warn!(%error, "Input box request failed");
                None
            }
        }
    }

    async fn quick_pick(&self, placeholder: &str, items: Vec<String>) -> Option<String> {
        let actions = items
            .into_iter()
            .map(|title| MessageActionItem { title, properties: HashMap::new() })
            .collect();
        match self.client.show_message_request(MessageType::INFO, placeholder, Some(actions)).await
        {
            Ok(choice) => choice.map(|item| item.title),
            Err(error) => {
                tracing::warn!(%error, "Quick pick request failed");
                None
            }
        }
    }

    async fn show_error(&self, message: &str) {
        self.client.show_message(MessageType::ERROR, message).await;
    }

    async fn show_info(&self, message: &str) {
        self.client.show_message(MessageType::INFO, message).await;
    }
}
