pub mod extraction;
pub mod generation_llm;
pub mod store;

pub use extraction::FileExtractor;
pub use generation_llm::OpenAiFlashcardAdapter;
pub use store::JsonFileStore;
