//! crates/flashcard_core/src/upload.rs
//!
//! The suspending half of an upload: extract the file, then ask the generation
//! service for cards. Callers bracket this with `FlashcardApp::begin_generation`
//! and `complete_generation` and must not hold the app across the await.

use tracing::{debug, warn};

use crate::domain::{Flashcard, UploadedFile};
use crate::error::FlashcardResult;
use crate::ports::{FlashcardGenerationService, TextExtractionService};

pub async fn generate_from_file(
    extractor: &dyn TextExtractionService,
    generator: &dyn FlashcardGenerationService,
    file: &UploadedFile,
    max_cards: usize,
) -> FlashcardResult<Vec<Flashcard>> {
    let data = extractor.extract(file).await.map_err(|e| {
        warn!(file = %file.file_name, "Extraction failed: {}", e);
        e
    })?;
    debug!(mime = %data.mime_type, chars = data.content.len(), "Extracted upload");

    let mut cards = generator.generate_flashcards(&data, max_cards).await.map_err(|e| {
        warn!(file = %file.file_name, "Generation failed: {}", e);
        e
    })?;
    // maxCards is an upper bound the model does not always respect
    cards.truncate(max_cards);
    Ok(cards)
}
