pub mod encoder;
pub mod fetcher;
pub mod stt;

pub use encoder::{HttpSentenceEncoder, SentenceEncoder};
pub use fetcher::{FetchedVideo, MediaFetcher, YtDlpFetcher};
pub use stt::{HttpSpeechToText, SpeechToText};
