//! Downstream collaborator interfaces and the records they return.
//!
//! The dispatcher only ever talks to these traits. Concrete REST clients live
//! in [`crate::network`]; tests substitute recording mocks.

use crate::message::OutboundMessage;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

/// Chat platform the bot posts to.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Post a new message to the bot channel, returning its timestamp.
    async fn post_message(&self, content: &OutboundMessage) -> Result<String>;

    /// Replace the content of the message identified by `ts`.
    async fn update_message(&self, ts: &str, content: &OutboundMessage) -> Result<()>;
}

/// Media server holding the existing library.
#[async_trait]
pub trait MediaServer: Send + Sync {
    /// Sessions currently connected, enriched with item details.
    async fn active_sessions(&self) -> Result<Vec<Session>>;

    /// Library search for the joined terms.
    async fn search(&self, terms: &[String]) -> Result<Vec<SearchHint>>;
}

/// Movie acquisition service.
#[async_trait]
pub trait Acquisition: Send + Sync {
    /// Look up movies matching the joined terms.
    async fn search(&self, terms: &[String]) -> Result<Vec<MovieCandidate>>;

    /// Add the movie with the given catalog (TMDB) id and start searching for it.
    async fn download(&self, catalog_id: &str) -> Result<AddedMovie>;
}

/// An Emby client session.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Session {
    pub id: String,
    pub user_name: String,
    pub client: String,
    pub device_name: String,
    #[serde(rename = "AppIconUrl")]
    pub app_icon_url: String,
    pub now_playing_item: Option<NowPlayingItem>,
    pub play_state: PlayState,
    /// Filled in from the item details endpoint.
    #[serde(skip)]
    pub overview: String,
    /// First remote image for the playing item.
    #[serde(skip)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NowPlayingItem {
    pub id: String,
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub series_name: String,
    pub index_number: i64,
    pub parent_index_number: i64,
    pub run_time_ticks: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PlayState {
    pub position_ticks: i64,
    pub is_paused: bool,
}

/// One Emby search hint.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SearchHint {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: String,
    pub production_year: Option<i32>,
    #[serde(skip)]
    pub overview: String,
    #[serde(skip)]
    pub image_url: Option<String>,
}

/// A Radarr lookup result.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MovieCandidate {
    pub title: String,
    pub year: i32,
    pub tmdb_id: i64,
    pub overview: String,
    pub images: Vec<MovieImage>,
    pub remote_poster: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MovieImage {
    pub cover_type: String,
    pub url: String,
}

impl MovieCandidate {
    /// First image Radarr knows about, falling back to the remote poster.
    pub fn image_url(&self) -> Option<&str> {
        self.images
            .first()
            .map(|image| image.url.as_str())
            .or(Some(self.remote_poster.as_str()))
            .filter(|url| !url.is_empty())
    }
}

/// The movie record Radarr created.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddedMovie {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub tmdb_id: i64,
    pub path: String,
}

/// Emby has shipped ids as both JSON numbers and strings.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_decodes_emby_shape() {
        let sessions: Vec<Session> = serde_json::from_str(
            r#"[{"Id":"s1","UserName":"ana","Client":"Emby Web","DeviceName":"Chrome",
                 "NowPlayingItem":{"Id":"42","Name":"Pilot","Type":"Episode","SeriesName":"Lost",
                                   "IndexNumber":1,"ParentIndexNumber":1,"RunTimeTicks":1000},
                 "PlayState":{"PositionTicks":250,"IsPaused":true}},
                {"Id":"s2","UserName":"bo"}]"#,
        )
        .unwrap();
        let item = sessions[0].now_playing_item.as_ref().unwrap();
        assert_eq!(item.kind, "Episode");
        assert_eq!(item.series_name, "Lost");
        assert!(sessions[0].play_state.is_paused);
        assert!(sessions[1].now_playing_item.is_none());
    }

    #[test]
    fn test_search_hint_accepts_numeric_id() {
        let hint: SearchHint =
            serde_json::from_str(r#"{"Id":1234,"Name":"Heat","Type":"Movie","ProductionYear":1995}"#)
                .unwrap();
        assert_eq!(hint.id, "1234");
        assert_eq!(hint.production_year, Some(1995));

        let hint: SearchHint = serde_json::from_str(r#"{"Id":"abc","Name":"Heat"}"#).unwrap();
        assert_eq!(hint.id, "abc");
    }

    #[test]
    fn test_candidate_image_fallback() {
        let mut movie: MovieCandidate = serde_json::from_str(
            r#"{"title":"Heat","year":1995,"tmdbId":949,"remotePoster":"https://img/poster.jpg"}"#,
        )
        .unwrap();
        assert_eq!(movie.image_url(), Some("https://img/poster.jpg"));

        movie.images.push(MovieImage {
            cover_type: "poster".into(),
            url: "https://img/cover.jpg".into(),
        });
        assert_eq!(movie.image_url(), Some("https://img/cover.jpg"));

        let bare = MovieCandidate::default();
        assert_eq!(bare.image_url(), None);
    }
}
