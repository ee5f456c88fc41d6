//! Emby REST client.

use super::client::{base_url, endpoint, HttpClient};
use crate::collaborators::{MediaServer, SearchHint, Session};
use crate::config::EmbySettings;
use crate::Result;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;
use url::Url;

const TOKEN_HEADER: &str = "X-MediaBrowser-Token";

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct SearchResults {
    search_hints: Vec<SearchHint>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ItemDetail {
    overview: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct ItemImages {
    images: Vec<RemoteImage>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct RemoteImage {
    url: String,
}

impl ItemImages {
    fn first_url(self) -> Option<String> {
        self.images
            .into_iter()
            .map(|image| image.url)
            .find(|url| !url.is_empty())
    }
}

/// Emby API client authenticated with an admin token.
pub struct EmbyClient {
    http: HttpClient,
    base: Url,
    token: String,
    admin_id: String,
}

impl EmbyClient {
    pub fn new(settings: &EmbySettings) -> Result<Self> {
        Ok(Self {
            http: HttpClient::new("emby")?,
            base: base_url(&settings.path)?,
            token: settings.token.clone(),
            admin_id: settings.admin_id.clone(),
        })
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        self.http
            .get_json(url, &[(TOKEN_HEADER, self.token.as_str())])
            .await
    }

    async fn item_overview(&self, id: &str) -> Result<String> {
        let url = endpoint(&self.base, &format!("Users/{}/Items/{}", self.admin_id, id))?;
        let detail: ItemDetail = self.get(url).await?;
        Ok(detail.overview)
    }

    async fn item_image(&self, id: &str) -> Result<Option<String>> {
        let url = endpoint(&self.base, &format!("Items/{}/RemoteImages/", id))?;
        let images: ItemImages = self.get(url).await?;
        Ok(images.first_url())
    }
}

#[async_trait]
impl MediaServer for EmbyClient {
    async fn active_sessions(&self) -> Result<Vec<Session>> {
        let mut sessions: Vec<Session> = self.get(endpoint(&self.base, "Sessions")?).await?;

        for session in &mut sessions {
            let Some(id) = session
                .now_playing_item
                .as_ref()
                .map(|item| item.id.clone())
                .filter(|id| !id.is_empty())
            else {
                continue;
            };
            session.overview = self.item_overview(&id).await?;
            session.image_url = self.item_image(&id).await?;
        }

        Ok(sessions)
    }

    async fn search(&self, terms: &[String]) -> Result<Vec<SearchHint>> {
        let mut url = endpoint(&self.base, "Search/Hints")?;
        url.query_pairs_mut()
            .append_pair("searchTerm", &terms.join(" "));
        let results: SearchResults = self.get(url).await?;

        let mut hints = results.search_hints;
        // Enrichment is cosmetic: a hint without overview or image still
        // belongs in the results.
        for hint in hints.iter_mut().filter(|hint| !hint.id.is_empty()) {
            match self.item_image(&hint.id).await {
                Ok(image) => hint.image_url = image,
                Err(e) => warn!("No images for Emby item {}: {}", hint.id, e),
            }
            match self.item_overview(&hint.id).await {
                Ok(overview) => hint.overview = overview,
                Err(e) => warn!("No details for Emby item {}: {}", hint.id, e),
            }
        }

        Ok(hints)
    }
}
