//! Radarr REST client.

use super::client::{base_url, endpoint, HttpClient};
use crate::collaborators::{Acquisition, AddedMovie, MovieCandidate};
use crate::config::{RadarrConfig, RadarrSettings};
use crate::{Result, WarezError};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Command<'a> {
    name: &'a str,
    movie_ids: [i64; 1],
}

/// Radarr API client authenticated with an API key.
pub struct RadarrClient {
    http: HttpClient,
    base: Url,
    api_key: String,
    command_delay: Duration,
}

impl RadarrClient {
    pub fn new(settings: &RadarrSettings) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new("radarr")?,
            base: base_url(&settings.path)?,
            api_key: settings.api_key.clone(),
            command_delay: RadarrConfig::COMMAND_DELAY,
        })
    }

    /// Override the pause between adding a movie and searching for it.
    pub fn with_command_delay(mut self, delay: Duration) -> Self {
        self.command_delay = delay;
        self
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = endpoint(&self.base, path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            pairs.append_pair("apikey", &self.api_key);
        }
        Ok(url)
    }

    async fn lookup(&self, term: &str) -> Result<Vec<Value>> {
        self.http
            .get_json(self.url("movie/lookup", &[("term", term)])?, &[])
            .await
    }
}

#[async_trait]
impl Acquisition for RadarrClient {
    async fn search(&self, terms: &[String]) -> Result<Vec<MovieCandidate>> {
        let records = self.lookup(&terms.join(" ")).await?;
        records
            .into_iter()
            .map(|record| serde_json::from_value(record).map_err(WarezError::from))
            .collect()
    }

    async fn download(&self, catalog_id: &str) -> Result<AddedMovie> {
        let mut movie = self
            .lookup(&format!("tmdb:{}", catalog_id))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WarezError::NotFound {
                what: "movie".into(),
                id: format!("tmdb:{}", catalog_id),
            })?;

        let Some(fields) = movie.as_object_mut() else {
            return Err(WarezError::Other(format!(
                "radarr lookup for tmdb:{} returned a non-object record",
                catalog_id
            )));
        };
        fields.insert(
            "qualityProfileId".into(),
            json!(RadarrConfig::QUALITY_PROFILE_ID),
        );
        fields.insert("monitored".into(), json!(true));
        fields.insert("rootFolderPath".into(), json!(RadarrConfig::ROOT_FOLDER_PATH));
        fields.insert("addOptions".into(), json!({ "searchForMovie": true }));
        fields.insert(
            "minimumAvailability".into(),
            json!(RadarrConfig::MINIMUM_AVAILABILITY),
        );

        let added: AddedMovie = self
            .http
            .post_json(self.url("movie", &[])?, &[], &movie)
            .await?;
        info!("Radarr added {} ({}) as movie {}", added.title, added.year, added.id);

        tokio::time::sleep(self.command_delay).await;
        let reply: Value = self
            .http
            .post_json(
                self.url("command", &[])?,
                &[],
                &Command {
                    name: RadarrConfig::SEARCH_COMMAND,
                    movie_ids: [added.id],
                },
            )
            .await?;
        debug!("Radarr search command reply: {}", reply);

        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::{Query, State},
        http::StatusCode,
        routing::{get, post},
        Json, Router,
    };
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    type Posted = Arc<Mutex<Vec<(&'static str, Value)>>>;

    async fn lookup(
        Query(query): Query<HashMap<String, String>>,
    ) -> std::result::Result<Json<Value>, StatusCode> {
        if query.get("apikey").map(String::as_str) != Some("radarr-key") {
            return Err(StatusCode::UNAUTHORIZED);
        }
        let term = query.get("term").cloned().unwrap_or_default();
        Ok(Json(match term.as_str() {
            "the matrix" => json!([
                { "title": "The Matrix", "year": 1999, "tmdbId": 603, "overview": "Neo.",
                  "images": [{ "coverType": "poster", "url": "https://img/603.jpg" }] },
                { "title": "The Matrix Reloaded", "year": 2003, "tmdbId": 604 }
            ]),
            "tmdb:603" => json!([
                { "title": "The Matrix", "year": 1999, "tmdbId": 603, "titleSlug": "the-matrix-603" }
            ]),
            _ => json!([]),
        }))
    }

    async fn add_movie(State(posted): State<Posted>, Json(body): Json<Value>) -> Json<Value> {
        posted.lock().unwrap().push(("movie", body));
        Json(json!({ "id": 17, "title": "The Matrix", "year": 1999, "tmdbId": 603,
                     "path": "/movies/The Matrix (1999)" }))
    }

    async fn command(State(posted): State<Posted>, Json(body): Json<Value>) -> Json<Value> {
        posted.lock().unwrap().push(("command", body));
        Json(json!({ "id": 1, "name": "MoviesSearch", "status": "queued" }))
    }

    async fn mock_radarr() -> (RadarrClient, Posted) {
        let posted: Posted = Arc::default();
        let app = Router::new()
            .route("/api/movie/lookup", get(lookup))
            .route("/api/movie", post(add_movie))
            .route("/api/command", post(command))
            .with_state(posted.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let client = RadarrClient::new(&RadarrSettings {
            path: format!("http://{}/api", addr),
            api_key: "radarr-key".into(),
        })
        .unwrap()
        .with_command_delay(Duration::ZERO);
        (client, posted)
    }

    #[tokio::test]
    async fn test_search_joins_terms() {
        let (client, _) = mock_radarr().await;
        let movies = client
            .search(&["the".to_string(), "matrix".to_string()])
            .await
            .unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].tmdb_id, 603);
        assert_eq!(movies[0].image_url(), Some("https://img/603.jpg"));
    }

    #[tokio::test]
    async fn test_download_adds_then_searches() {
        let (client, posted) = mock_radarr().await;
        let added = client.download("603").await.unwrap();
        assert_eq!(added.id, 17);

        let posted = posted.lock().unwrap();
        assert_eq!(posted.len(), 2);

        let (kind, movie) = &posted[0];
        assert_eq!(*kind, "movie");
        assert_eq!(movie["qualityProfileId"], 3);
        assert_eq!(movie["monitored"], true);
        assert_eq!(movie["rootFolderPath"], "/movies/");
        assert_eq!(movie["addOptions"]["searchForMovie"], true);
        assert_eq!(movie["minimumAvailability"], "announced");
        // Fields from the lookup record pass through untouched.
        assert_eq!(movie["titleSlug"], "the-matrix-603");

        let (kind, command) = &posted[1];
        assert_eq!(*kind, "command");
        assert_eq!(command["name"], "MoviesSearch");
        assert_eq!(command["movieIds"], json!([17]));
    }

    #[tokio::test]
    async fn test_download_unknown_movie_is_not_found() {
        let (client, posted) = mock_radarr().await;
        let err = client.download("1").await.unwrap_err();
        assert!(matches!(err, WarezError::NotFound { .. }));
        assert!(posted.lock().unwrap().is_empty());
    }
}
