//! services/api/src/adapters/generation_llm.rs
//!
//! This module contains the adapter for the flashcard-generating LLM.
//! It implements the `FlashcardGenerationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
        CreateChatCompletionRequestArgs, ImageDetail, ImageUrlArgs,
    },
    Client,
};
use async_trait::async_trait;
use flashcard_core::domain::{FileData, Flashcard};
use flashcard_core::error::GenerationError;
use flashcard_core::ports::FlashcardGenerationService;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::debug;

const SYSTEM_INSTRUCTIONS: &str = "You turn study material into flashcards. \
Each flashcard must have a concise 'question' and a short, easy-to-understand 'answer'. \
Avoid overly long text on either side of the card. \
Respond with ONLY a JSON array of objects, each with a \"question\" and an \"answer\" string key, and nothing else.";

/// Matches a reply wrapped in a Markdown code fence.
static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("valid regex"));

fn user_prompt(max_cards: usize) -> String {
    format!(
        "Based on the provided content, generate a maximum of {} flashcards. \
         The goal is to create effective study material.",
        max_cards
    )
}

#[derive(Deserialize)]
struct RawCard {
    question: Option<String>,
    answer: Option<String>,
}

/// Parses the model's reply into cards. A card missing either side spoils the batch.
pub fn parse_flashcards(reply: &str) -> Result<Vec<Flashcard>, GenerationError> {
    let body = CODE_FENCE
        .captures(reply)
        .and_then(|c| c.get(1))
        .map_or(reply.trim(), |m| m.as_str());

    let raw: Vec<RawCard> = serde_json::from_str(body)
        .map_err(|e| GenerationError::Malformed(format!("reply is not a JSON array of cards: {}", e)))?;

    raw.into_iter()
        .enumerate()
        .map(|(index, card)| match (card.question, card.answer) {
            (Some(q), Some(a)) if !q.trim().is_empty() && !a.trim().is_empty() => Ok(Flashcard::new(q, a)),
            _ => Err(GenerationError::Malformed(format!("card {} is missing a question or an answer", index))),
        })
        .collect()
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `FlashcardGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiFlashcardAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiFlashcardAdapter {
    /// Creates a new `OpenAiFlashcardAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn unavailable(e: impl std::fmt::Display) -> GenerationError {
    GenerationError::Unavailable(e.to_string())
}

//=========================================================================================
// `FlashcardGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl FlashcardGenerationService for OpenAiFlashcardAdapter {
    /// Sends text inline, or an image as a data URL part, and parses the JSON reply.
    async fn generate_flashcards(
        &self,
        file: &FileData,
        max_cards: usize,
    ) -> Result<Vec<Flashcard>, GenerationError> {
        let prompt = user_prompt(max_cards);

        let user_message = if file.is_image() {
            let text_part: ChatCompletionRequestUserMessageContentPart =
                ChatCompletionRequestMessageContentPartTextArgs::default()
                    .text(prompt)
                    .build()
                    .map_err(unavailable)?
                    .into();
            let image_part: ChatCompletionRequestUserMessageContentPart =
                ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(
                        ImageUrlArgs::default()
                            .url(format!("data:{};base64,{}", file.mime_type, file.content))
                            .detail(ImageDetail::Auto)
                            .build()
                            .map_err(unavailable)?,
                    )
                    .build()
                    .map_err(unavailable)?
                    .into();
            ChatCompletionRequestUserMessageArgs::default()
                .content(vec![text_part, image_part])
                .build()
                .map_err(unavailable)?
        } else {
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!("{}\n\nHere is the content:\n\n{}", prompt, file.content))
                .build()
                .map_err(unavailable)?
        };

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(unavailable)?
                .into(),
            user_message.into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .n(1)
            .build()
            .map_err(unavailable)?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| unavailable(e))?;

        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::Malformed("the model returned no text".to_string()))?;
        debug!(chars = reply.len(), "Generation reply received");

        parse_flashcards(&reply)
    }
}
