pub mod downloader;
pub mod transcript;
