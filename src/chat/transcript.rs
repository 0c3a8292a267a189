use serde::Deserialize;

/// Full chat log for one vod, as produced by the external downloader.
///
/// Only the fields the scanner consumes are modeled; everything else in the
/// downloader's output is ignored during deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct Transcript {
    pub video: TranscriptVideo,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptVideo {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    pub commenter: Commenter,
    pub message: Message,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Commenter {
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub body: String,
}
