//! Language-model completion.
//!
//! The model is asked to answer with a JSON object `{"sql": "..."}`. Replies
//! are taken apart by [`extract_sql`]; the SQL itself is passed on unchecked.

use crate::config::AIConfig;
use crate::error::{CatalogError, Result};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use secrecy::{ExposeSecret as _, SecretString};
use std::future::Future;

/// Environment variable holding the OpenAI API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Maps a prompt to the model's raw reply.
pub trait CompletionClient {
    /// # Errors
    ///
    /// Returns [`CatalogError::Completion`] if no reply could be obtained.
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

/// Chat-completion client for the OpenAI API.
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    config: AIConfig,
}

impl OpenAiClient {
    pub fn new(api_key: &SecretString, config: AIConfig) -> Self {
        let openai_config = OpenAIConfig::new().with_api_key(api_key.expose_secret());
        Self {
            client: Client::with_config(openai_config),
            config,
        }
    }

    /// Build a client from [`API_KEY_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Config`] if completion is disabled or the key
    /// is not set.
    pub fn from_env(config: AIConfig) -> Result<Self> {
        if !config.enabled {
            return Err(CatalogError::Config("AI completion is disabled".to_owned()));
        }
        let api_key = std::env::var(API_KEY_ENV)
            .map(SecretString::from)
            .map_err(|e| CatalogError::Config(format!("{API_KEY_ENV}: {e}")))?;
        Ok(Self::new(&api_key, config))
    }
}

impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| CatalogError::Completion(format!("Failed to build message: {e}")))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages(messages)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build()
            .map_err(|e| CatalogError::Completion(format!("Failed to build request: {e}")))?;

        tracing::debug!("Requesting completion from model {}", self.config.model);
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| CatalogError::Completion(format!("OpenAI API error: {e}")))?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| CatalogError::Completion("No response content received".to_owned()))
    }
}

/// Pull the `sql` field out of a model reply.
///
/// The whole reply is tried as JSON first, then the span from the first `{`
/// to the last `}`. Anything else yields an empty string.
pub fn extract_sql(reply: &str) -> String {
    fn sql_field(json: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(json).ok()?;
        match value.get("sql")? {
            serde_json::Value::String(sql) => Some(sql.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    if let Some(sql) = sql_field(reply) {
        return sql;
    }

    let span = match (reply.find('{'), reply.rfind('}')) {
        (Some(start), Some(end)) if start < end => &reply[start..=end],
        _ => return String::new(),
    };
    sql_field(span).unwrap_or_default()
}
