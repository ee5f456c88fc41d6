//! Chat notification builders.
//!
//! Pure functions from collaborator results to [`OutboundMessage`]s. Every
//! value is computed per call; attachment colors are random per attachment.

use crate::collaborators::{MovieCandidate, SearchHint, Session};
use crate::config::NotifyConfig;
use crate::events::MediaEvent;
use crate::message::{Attachment, AttachmentAction, AttachmentField, Confirmation, OutboundMessage};

const NO_OVERVIEW: &str = "No overview found...";

/// Random 6-digit hex color.
pub fn random_color() -> String {
    hex::encode(rand::random::<[u8; 3]>())
}

/// Rounded playback progress; 0 when the runtime is unknown.
pub fn percent_complete(position_ticks: i64, run_time_ticks: i64) -> i64 {
    if run_time_ticks <= 0 {
        return 0;
    }
    ((position_ticks as f64 * 100.0) / run_time_ticks as f64).round() as i64
}

/// Reply to `ping`.
pub fn pong() -> OutboundMessage {
    OutboundMessage::text("pong").with_attachment(Attachment {
        color: random_color(),
        image_url: Some(NotifyConfig::PING_IMAGE_URL.to_string()),
        author_name: NotifyConfig::BOT_NAME.to_string(),
        author_icon: NotifyConfig::BOT_ICON_URL.to_string(),
        ..Default::default()
    })
}

/// Summary of everything currently playing.
pub fn now_playing(sessions: &[Session]) -> OutboundMessage {
    let attachments: Vec<Attachment> = sessions.iter().filter_map(session_attachment).collect();
    if attachments.is_empty() {
        return OutboundMessage::text("Nothing is playing right now.");
    }
    OutboundMessage {
        text: String::new(),
        attachments,
    }
}

fn session_attachment(session: &Session) -> Option<Attachment> {
    let item = session.now_playing_item.as_ref().filter(|item| !item.name.is_empty())?;

    let (title, value) = if item.kind == "Episode" {
        (
            format!("{} is playing the TV show:", session.user_name),
            format!(
                "{} - {} (Season {} - {})",
                item.series_name, item.name, item.parent_index_number, item.index_number
            ),
        )
    } else {
        (
            format!("{} is playing the film:", session.user_name),
            item.name.clone(),
        )
    };

    let status = if session.play_state.is_paused {
        "Paused"
    } else {
        "Playing"
    };
    let footer = if session.overview.is_empty() {
        NO_OVERVIEW.to_string()
    } else {
        session.overview.clone()
    };

    Some(Attachment {
        color: random_color(),
        text: format!(
            "{} - {}%",
            status,
            percent_complete(session.play_state.position_ticks, item.run_time_ticks)
        ),
        image_url: Some(image_or_not_found(session.image_url.as_deref())),
        author_name: format!("{} - {}", session.device_name, session.client),
        author_icon: session.app_icon_url.clone(),
        footer,
        fields: vec![AttachmentField::new(title, value)],
        ..Default::default()
    })
}

/// Radarr lookup results followed by a download prompt.
pub fn movie_candidates(terms: &[String], movies: &[MovieCandidate]) -> OutboundMessage {
    if movies.is_empty() {
        return OutboundMessage::text(format!("No movies found for \"{}\"", terms.join(" ")));
    }

    let mut attachments = Vec::new();
    let mut buttons = Vec::new();
    for (index, movie) in movies
        .iter()
        .take(NotifyConfig::MAX_MOVIE_CANDIDATES)
        .enumerate()
    {
        let position = index + 1;
        let label = format!("{}.) {} - {}", position, movie.title, movie.year);
        buttons.push(AttachmentAction {
            name: movie.tmdb_id.to_string(),
            text: label.clone(),
            kind: "button".to_string(),
            value: label,
            confirm: Some(Confirmation {
                text: format!(
                    "Are you sure you want to download {} ({})?",
                    movie.title, movie.year
                ),
                ..Default::default()
            }),
        });
        attachments.push(Attachment {
            color: random_color(),
            callback_id: NotifyConfig::SEARCH_RESULT_CALLBACK.to_string(),
            text: format!("TMDB ID: {}", movie.tmdb_id),
            image_url: Some(image_or_not_found(movie.image_url())),
            footer: movie.overview.clone(),
            fields: vec![AttachmentField::new(
                format!("{}.) {}", position, movie.title),
                movie.year.to_string(),
            )],
            ..Default::default()
        });
    }

    attachments.push(Attachment {
        color: random_color(),
        text: "Select movie to download".to_string(),
        fallback: "Select movie to download".to_string(),
        callback_id: NotifyConfig::DOWNLOAD_PROMPT_CALLBACK.to_string(),
        actions: buttons,
        ..Default::default()
    });

    OutboundMessage {
        text: String::new(),
        attachments,
    }
}

/// Emby library search results followed by a total.
pub fn media_search(hints: &[SearchHint]) -> OutboundMessage {
    let mut attachments: Vec<Attachment> = hints
        .iter()
        .filter(|hint| matches!(hint.kind.as_str(), "Movie" | "Episode" | "Series"))
        .map(|hint| Attachment {
            color: random_color(),
            callback_id: "embySearchResult".to_string(),
            footer: hint.overview.clone(),
            image_url: Some(image_or_not_found(hint.image_url.as_deref())),
            fields: vec![AttachmentField::new(
                format!("{} - {}", hint.name, hint.kind),
                hint.production_year.unwrap_or_default().to_string(),
            )],
            ..Default::default()
        })
        .collect();

    let count = attachments.len();
    attachments.push(Attachment {
        color: random_color(),
        fields: vec![AttachmentField::new("Total Results found:", count.to_string())],
        ..Default::default()
    });

    OutboundMessage {
        text: String::new(),
        attachments,
    }
}

/// Replacement for the download prompt once a button was clicked.
pub fn download_started(user: &str, selection: &str) -> OutboundMessage {
    OutboundMessage::default().with_attachment(Attachment {
        color: random_color(),
        text: format!("Download process started by {} for {}", user, selection),
        ..Default::default()
    })
}

/// Relay of an Emby webhook notification.
pub fn media_event(event: &MediaEvent) -> OutboundMessage {
    let mut text = format!("{} by {}", event.event, event.user.name);
    if let Some(url) = event.external_url() {
        text.push('\n');
        text.push_str(url);
    }
    OutboundMessage::default().with_attachment(Attachment {
        color: random_color(),
        title: event.title.clone(),
        text,
        ..Default::default()
    })
}

fn image_or_not_found(url: Option<&str>) -> String {
    url.filter(|url| !url.is_empty())
        .unwrap_or(NotifyConfig::IMAGE_NOT_FOUND_URL)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{NowPlayingItem, PlayState};
    use crate::events::{ExternalUrl, MediaItem, MediaUser};

    fn session(kind: &str, paused: bool) -> Session {
        Session {
            user_name: "ana".into(),
            client: "Emby Web".into(),
            device_name: "Chrome".into(),
            now_playing_item: Some(NowPlayingItem {
                id: "42".into(),
                name: "Pilot".into(),
                kind: kind.into(),
                series_name: "Lost".into(),
                index_number: 2,
                parent_index_number: 1,
                run_time_ticks: 3000,
            }),
            play_state: PlayState {
                position_ticks: 1000,
                is_paused: paused,
            },
            ..Default::default()
        }
    }

    fn movie(title: &str, year: i32, tmdb_id: i64) -> MovieCandidate {
        MovieCandidate {
            title: title.into(),
            year,
            tmdb_id,
            ..Default::default()
        }
    }

    #[test]
    fn test_random_color_is_six_hex_digits() {
        let color = random_color();
        assert_eq!(color.len(), 6);
        assert!(color.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_percent_complete_rounding() {
        assert_eq!(percent_complete(1000, 3000), 33);
        assert_eq!(percent_complete(2000, 3000), 67);
        assert_eq!(percent_complete(500, 0), 0);
    }

    #[test]
    fn test_pong() {
        let message = pong();
        assert_eq!(message.text, "pong");
        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.attachments[0].author_name, "warezbot");
    }

    #[test]
    fn test_now_playing_episode_and_film() {
        let mut film = session("Movie", false);
        film.overview = "A heist".into();
        film.image_url = Some("https://img/heat.jpg".into());
        if let Some(item) = film.now_playing_item.as_mut() {
            item.name = "Heat".into();
        }

        let message = now_playing(&[session("Episode", true), film, Session::default()]);
        assert_eq!(message.attachments.len(), 2);

        let episode = &message.attachments[0];
        assert_eq!(episode.fields[0].title, "ana is playing the TV show:");
        assert_eq!(episode.fields[0].value, "Lost - Pilot (Season 1 - 2)");
        assert_eq!(episode.text, "Paused - 33%");
        assert_eq!(episode.author_name, "Chrome - Emby Web");
        assert_eq!(episode.footer, "No overview found...");
        assert_eq!(
            episode.image_url.as_deref(),
            Some(NotifyConfig::IMAGE_NOT_FOUND_URL)
        );

        let film = &message.attachments[1];
        assert_eq!(film.fields[0].title, "ana is playing the film:");
        assert_eq!(film.fields[0].value, "Heat");
        assert_eq!(film.text, "Playing - 33%");
        assert_eq!(film.footer, "A heist");
        assert_eq!(film.image_url.as_deref(), Some("https://img/heat.jpg"));
    }

    #[test]
    fn test_now_playing_idle() {
        let message = now_playing(&[Session::default()]);
        assert_eq!(message.text, "Nothing is playing right now.");
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn test_movie_candidates_capped_at_five() {
        let movies: Vec<MovieCandidate> = (1..=7)
            .map(|n| movie(&format!("Movie {n}"), 2000 + n, 100 + n as i64))
            .collect();
        let message = movie_candidates(&["movie".into()], &movies);

        // Five results plus the prompt.
        assert_eq!(message.attachments.len(), 6);
        let prompt = message.attachments.last().unwrap();
        assert_eq!(prompt.callback_id, "movieDownloadPrompt");
        assert_eq!(prompt.text, "Select movie to download");
        assert_eq!(prompt.actions.len(), 5);
    }

    #[test]
    fn test_movie_candidate_button_name_and_value() {
        let message = movie_candidates(&["the".into(), "matrix".into()], &[movie("The Matrix", 1999, 603)]);
        let first = &message.attachments[0];
        assert_eq!(first.fields[0].title, "1.) The Matrix");
        assert_eq!(first.fields[0].value, "1999");
        assert_eq!(first.text, "TMDB ID: 603");
        assert_eq!(first.callback_id, "movieSearchResult");

        let button = &message.attachments[1].actions[0];
        assert_eq!(button.name, "603");
        assert_eq!(button.value, "1.) The Matrix - 1999");
        assert_eq!(button.text, button.value);
        assert_eq!(
            button.confirm.as_ref().unwrap().text,
            "Are you sure you want to download The Matrix (1999)?"
        );
    }

    #[test]
    fn test_movie_candidates_empty() {
        let message = movie_candidates(&["zzz".into(), "qqq".into()], &[]);
        assert_eq!(message.text, "No movies found for \"zzz qqq\"");
        assert!(message.attachments.is_empty());
    }

    #[test]
    fn test_media_search_filters_types() {
        let hints = vec![
            SearchHint {
                name: "Heat".into(),
                kind: "Movie".into(),
                production_year: Some(1995),
                ..Default::default()
            },
            SearchHint {
                name: "Heat OST".into(),
                kind: "MusicAlbum".into(),
                ..Default::default()
            },
        ];
        let message = media_search(&hints);
        assert_eq!(message.attachments.len(), 2);
        assert_eq!(message.attachments[0].fields[0].title, "Heat - Movie");
        assert_eq!(message.attachments[0].fields[0].value, "1995");
        let total = &message.attachments[1].fields[0];
        assert_eq!(total.title, "Total Results found:");
        assert_eq!(total.value, "1");
    }

    #[test]
    fn test_download_started_text() {
        let message = download_started("ana", "1.) The Matrix - 1999");
        assert_eq!(
            message.attachments[0].text,
            "Download process started by ana for 1.) The Matrix - 1999"
        );
    }

    #[test]
    fn test_media_event_with_and_without_url() {
        let mut event = MediaEvent {
            title: "New movie".into(),
            event: "library.new".into(),
            user: MediaUser {
                name: "ana".into(),
                id: "u1".into(),
            },
            item: MediaItem::default(),
        };
        assert_eq!(media_event(&event).attachments[0].text, "library.new by ana");

        event.item.external_urls.push(ExternalUrl {
            name: "IMDb".into(),
            url: "https://imdb.com/title/tt0113277".into(),
        });
        let message = media_event(&event);
        assert_eq!(
            message.attachments[0].text,
            "library.new by ana\nhttps://imdb.com/title/tt0113277"
        );
        assert_eq!(message.attachments[0].title, "New movie");
    }
}
