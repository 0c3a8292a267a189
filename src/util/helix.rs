use core::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::header::{AUTHORIZATION, InvalidHeaderValue};
use http::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use crate::pipeline::VideoSource;
use crate::store::models::VideoRecord;
use crate::util::env::Settings;

pub const HELIX_URI_BASE: &str = "https://api.twitch.tv/helix";
pub const HELIX_URN_USERS: &str = "users";
pub const HELIX_URN_STREAMS: &str = "streams";
pub const HELIX_URN_VIDEOS: &str = "videos";

/// Helix listing can return up to this many vods per page; the archive
/// window we track fits in one
const VIDEOS_PAGE_SIZE: usize = 100;

#[derive(Debug)]
pub enum HelixUri {
    Users,
    Streams,
    Videos,
}

impl From<HelixUri> for String {
    fn from(value: HelixUri) -> Self {
        format!(
            "{}/{}",
            HELIX_URI_BASE,
            match value {
                HelixUri::Users => HELIX_URN_USERS,
                HelixUri::Streams => HELIX_URN_STREAMS,
                HelixUri::Videos => HELIX_URN_VIDEOS,
            }
        )
    }
}

/// Twitch Helix client scoped to the archive-listing calls this crate needs
pub struct Helix {
    client: reqwest::Client,
    headers: HeaderMap,
}

impl Helix {
    pub fn new(settings: &Settings) -> HelixResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", settings.app_token))?,
        );
        headers.insert("Client-Id", HeaderValue::from_str(&settings.client_id)?);

        Ok(Self {
            client: reqwest::Client::new(),
            headers,
        })
    }

    #[instrument(skip(self))]
    /// Lists the channel's vod archive, newest first.
    ///
    /// While a broadcast is in progress the first listed video is its
    /// still-growing recording; it is dropped here so a partial transcript
    /// is never archived.
    pub async fn fetch_videos(&self, login: &str) -> HelixResult<Vec<VideoRecord>> {
        let user_id = self.fetch_user_id(login).await?;
        let live = self.is_live(&user_id).await?;

        let uri = format!(
            "{}?user_id={}&first={}",
            String::from(HelixUri::Videos),
            user_id,
            VIDEOS_PAGE_SIZE,
        );
        let videos = self.get::<HelixDataResponse<HelixVideo>>(uri).await?.data;

        let records = into_records(videos, live);
        tracing::debug!(count = records.len(), live, "fetched vod archive");
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn fetch_user_id(&self, login: &str) -> HelixResult<String> {
        let uri = format!(
            "{}?login={}",
            String::from(HelixUri::Users),
            login.to_lowercase(),
        );

        self.get::<HelixDataResponse<HelixUser>>(uri)
            .await?
            .data
            .into_iter()
            .next()
            .map(|user| user.id)
            .ok_or(HelixErr::EmptyDataField)
    }

    #[instrument(skip(self))]
    async fn is_live(&self, user_id: &str) -> HelixResult<bool> {
        let uri = format!("{}?user_id={}", String::from(HelixUri::Streams), user_id);
        let streams = self.get::<HelixDataResponse<HelixStream>>(uri).await?.data;

        Ok(!streams.is_empty())
    }

    #[instrument(skip(self, uri))]
    /// Performs a GET request and parses the response according to the
    /// specified `T` output type
    async fn get<T>(&self, uri: String) -> HelixResult<T>
    where
        T: DeserializeOwned + fmt::Debug,
    {
        let res = self
            .client
            .get(uri)
            .headers(self.headers.clone())
            .send()
            .await?;

        // if the request was unsuccessful, check to see whether the response
        // contained extra detail about the error and surface that instead of
        // a bare status code
        if res.status() != 200 {
            let status_code = res.status();
            tracing::error!(code = %status_code, "non-200/OK response");

            if let Ok(reason) = res.json::<Value>().await {
                tracing::error!(body = ?reason, "error message in response");
                return Err(HelixErr::FetchErrWithBody { body: reason });
            }

            return Err(HelixErr::FetchErr(status_code.to_string()));
        }

        let rl_remaining = res.headers().get("ratelimit-remaining");
        let rl_total = res.headers().get("ratelimit-limit");
        if let Some(remaining) = rl_remaining
            && let Some(total) = rl_total
        {
            tracing::debug!(ratelimit_available = ?remaining, ratelimit_total = ?total, "rate-limit bucket");
        }

        Ok(res.json::<T>().await?)
    }
}

/// Maps a listing onto archive records, skipping the still-growing head
/// entry while its broadcast is live
fn into_records(videos: Vec<HelixVideo>, live: bool) -> Vec<VideoRecord> {
    videos
        .into_iter()
        .skip(if live { 1 } else { 0 })
        .map(VideoRecord::from)
        .collect()
}

#[async_trait]
impl VideoSource for Helix {
    async fn fetch_videos(&self, login: &str) -> HelixResult<Vec<VideoRecord>> {
        Helix::fetch_videos(self, login).await
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelixDataResponse<T> {
    data: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelixUser {
    pub id: String,
    pub login: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelixStream {
    #[serde(rename = "user_id")]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelixVideo {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
}

impl From<HelixVideo> for VideoRecord {
    fn from(value: HelixVideo) -> Self {
        Self {
            id: value.id,
            title: value.title,
            created: value.created_at,
            published: value.published_at,
        }
    }
}

pub type HelixResult<T> = core::result::Result<T, HelixErr>;

#[derive(Debug, Error)]
pub enum HelixErr {
    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("while creating a HeaderValue ({0})")]
    HeaderError(#[from] InvalidHeaderValue),

    #[error("error during helix fetch: {0}")]
    FetchErr(String),

    #[error("error (with detail) during helix fetch: {:#?}", body)]
    FetchErrWithBody { body: Value },

    #[error("empty data field")]
    EmptyDataField,
}
