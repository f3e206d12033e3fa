use std::time::Duration;

use async_trait::async_trait;
use common::{error::AppError, utils::config::AppConfig};
use reqwest::{
    header::{ACCEPT_LANGUAGE, COOKIE},
    StatusCode,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

pub const NO_SUBTITLES_MESSAGE: &str =
    "This video doesn’t have English subtitles. Please try another video.";
pub const CAPTIONS_DISABLED_MESSAGE: &str =
    "Captions are disabled for this video. Please try another video.";

const PLAYER_RESPONSE_MARKER: &str = "ytInitialPlayerResponse = ";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Upstream provider of the spoken text of a video.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch_transcript(&self, video_id: &str) -> Result<String, AppError>;
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    #[serde(default)]
    pub kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    fn matches_language(&self, language: &str) -> bool {
        self.language_code.eq_ignore_ascii_case(language)
            || self
                .language_code
                .split('-')
                .next()
                .is_some_and(|primary| primary.eq_ignore_ascii_case(language))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TimedText {
    #[serde(default)]
    pub events: Vec<TimedTextEvent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimedTextEvent {
    #[serde(default)]
    pub segs: Vec<TimedTextSegment>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimedTextSegment {
    #[serde(default)]
    pub utf8: String,
}

/// Fetches caption tracks from YouTube's watch page and timed-text endpoint.
pub struct YoutubeTranscriptSource {
    client: reqwest::Client,
    base_url: Url,
    language: String,
}

impl YoutubeTranscriptSource {
    pub fn new(base_url: &str, language: impl Into<String>) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::Validation(format!("invalid YouTube base url: {e}")))?;
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url,
            language: language.into(),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(&config.youtube_base_url, config.transcript_language.clone())
    }

    fn watch_url(&self, video_id: &str) -> Result<Url, AppError> {
        let mut url = self
            .base_url
            .join("watch")
            .map_err(|e| AppError::InternalError(format!("building watch url: {e}")))?;
        url.query_pairs_mut().append_pair("v", video_id);
        Ok(url)
    }

    async fn get_text(&self, url: Url, video_id: &str) -> Result<String, AppError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(COOKIE, "CONSENT=YES+cb")
            .send()
            .await
            .map_err(upstream_error)?;

        check_status(response.status(), video_id)?;
        response.text().await.map_err(upstream_error)
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    #[tracing::instrument(skip(self))]
    async fn fetch_transcript(&self, video_id: &str) -> Result<String, AppError> {
        let watch_page = self.get_text(self.watch_url(video_id)?, video_id).await?;
        let player = extract_player_response(&watch_page)?;
        let tracks = caption_tracks(&player)?;
        let track = select_track(&tracks, &self.language)?;
        debug!(
            language = %track.language_code,
            generated = track.is_generated(),
            "selected caption track"
        );

        let body = self.get_text(timed_text_url(track)?, video_id).await?;
        let timed_text: TimedText = serde_json::from_str(&body)
            .map_err(|e| AppError::TransientUpstream(format!("unreadable caption data: {e}")))?;
        let transcript = join_segments(&timed_text);

        info!(chars = transcript.len(), "fetched transcript");
        Ok(transcript)
    }
}

fn upstream_error(err: reqwest::Error) -> AppError {
    AppError::TransientUpstream(format!("transcript request failed: {err}"))
}

fn check_status(status: StatusCode, video_id: &str) -> Result<(), AppError> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::NOT_FOUND => Err(AppError::ContentUnavailable(format!(
            "video {video_id} was not found"
        ))),
        StatusCode::FORBIDDEN => Err(AppError::AccessDenied(format!(
            "access to video {video_id} is blocked"
        ))),
        StatusCode::TOO_MANY_REQUESTS => Err(AppError::TransientUpstream(
            "YouTube is rate limiting transcript requests".into(),
        )),
        other => Err(AppError::TransientUpstream(format!(
            "YouTube responded with {other}"
        ))),
    }
}

/// Pull the `ytInitialPlayerResponse` JSON object out of a watch page.
pub fn extract_player_response(html: &str) -> Result<Value, AppError> {
    let start = html
        .find(PLAYER_RESPONSE_MARKER)
        .map(|idx| idx.saturating_add(PLAYER_RESPONSE_MARKER.len()))
        .ok_or_else(|| {
            AppError::TransientUpstream("watch page did not contain a player response".into())
        })?;
    let rest = html.get(start..).unwrap_or_default();

    serde_json::Deserializer::from_str(rest)
        .into_iter::<Value>()
        .next()
        .transpose()
        .map_err(|e| AppError::TransientUpstream(format!("malformed player response: {e}")))?
        .ok_or_else(|| AppError::TransientUpstream("empty player response".into()))
}

/// Caption tracks advertised by the player response.
pub fn caption_tracks(player: &Value) -> Result<Vec<CaptionTrack>, AppError> {
    let playability = player
        .pointer("/playabilityStatus/status")
        .and_then(Value::as_str)
        .unwrap_or("OK");
    let reason = player
        .pointer("/playabilityStatus/reason")
        .and_then(Value::as_str)
        .unwrap_or("no reason given");

    match playability {
        "ERROR" => {
            return Err(AppError::ContentUnavailable(format!(
                "video is unavailable: {reason}"
            )))
        }
        "LOGIN_REQUIRED" | "UNPLAYABLE" | "AGE_CHECK_REQUIRED" => {
            return Err(AppError::AccessDenied(format!(
                "video cannot be played: {reason}"
            )))
        }
        _ => {}
    }

    let Some(tracks) = player.pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
    else {
        return Err(AppError::AccessDenied(CAPTIONS_DISABLED_MESSAGE.into()));
    };

    let tracks: Vec<CaptionTrack> = serde_json::from_value(tracks.clone())
        .map_err(|e| AppError::TransientUpstream(format!("malformed caption tracks: {e}")))?;
    if tracks.is_empty() {
        return Err(AppError::AccessDenied(CAPTIONS_DISABLED_MESSAGE.into()));
    }
    Ok(tracks)
}

/// Prefer a manually created track in `language`, then an auto-generated one.
pub fn select_track<'a>(
    tracks: &'a [CaptionTrack],
    language: &str,
) -> Result<&'a CaptionTrack, AppError> {
    tracks
        .iter()
        .find(|track| !track.is_generated() && track.matches_language(language))
        .or_else(|| tracks.iter().find(|track| track.matches_language(language)))
        .ok_or_else(|| AppError::ContentUnavailable(NO_SUBTITLES_MESSAGE.into()))
}

fn timed_text_url(track: &CaptionTrack) -> Result<Url, AppError> {
    let mut url = Url::parse(&track.base_url)
        .map_err(|e| AppError::TransientUpstream(format!("invalid caption url: {e}")))?;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "fmt")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("fmt", "json3");
    Ok(url)
}

/// Flatten timed-text events into a single space separated transcript.
pub fn join_segments(timed_text: &TimedText) -> String {
    timed_text
        .events
        .iter()
        .map(|event| {
            event
                .segs
                .iter()
                .map(|seg| seg.utf8.as_str())
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn watch_page(player: &Value) -> String {
        format!(
            "<html><script>var ytInitialPlayerResponse = {player};var meta = {{}};</script></html>"
        )
    }

    fn track(language: &str, kind: Option<&str>) -> CaptionTrack {
        CaptionTrack {
            base_url: format!("https://www.youtube.com/api/timedtext?v=abc123&lang={language}"),
            language_code: language.into(),
            kind: kind.map(str::to_owned),
        }
    }

    #[test]
    fn extracts_player_response_and_ignores_trailing_script() {
        let player = json!({ "playabilityStatus": { "status": "OK" }, "videoDetails": { "videoId": "abc123" } });
        let parsed = extract_player_response(&watch_page(&player)).expect("player response");
        assert_eq!(parsed, player);
    }

    #[test]
    fn missing_player_response_is_transient() {
        let err = extract_player_response("<html>captcha</html>").expect_err("no marker");
        assert!(matches!(err, AppError::TransientUpstream(_)));
    }

    #[test]
    fn missing_captions_means_access_denied() {
        let player = json!({ "playabilityStatus": { "status": "OK" } });
        let err = caption_tracks(&player).expect_err("captions disabled");
        assert!(matches!(err, AppError::AccessDenied(msg) if msg == CAPTIONS_DISABLED_MESSAGE));
    }

    #[test]
    fn unavailable_video_is_content_unavailable() {
        let player = json!({ "playabilityStatus": { "status": "ERROR", "reason": "Video unavailable" } });
        let err = caption_tracks(&player).expect_err("unavailable");
        assert!(matches!(err, AppError::ContentUnavailable(_)));
    }

    #[test]
    fn parses_caption_tracks() {
        let player = json!({
            "playabilityStatus": { "status": "OK" },
            "captions": { "playerCaptionsTracklistRenderer": { "captionTracks": [
                { "baseUrl": "https://example.com/a", "languageCode": "de" },
                { "baseUrl": "https://example.com/b", "languageCode": "en", "kind": "asr" }
            ]}}
        });
        let tracks = caption_tracks(&player).expect("tracks");
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].kind.as_deref(), Some("asr"));
    }

    #[test]
    fn prefers_manual_track_over_generated() {
        let tracks = vec![track("en", Some("asr")), track("en-GB", None), track("fr", None)];
        let selected = select_track(&tracks, "en").expect("english track");
        assert_eq!(selected.language_code, "en-GB");
    }

    #[test]
    fn falls_back_to_generated_track() {
        let tracks = vec![track("fr", None), track("en", Some("asr"))];
        let selected = select_track(&tracks, "en").expect("generated english track");
        assert!(selected.is_generated());
    }

    #[test]
    fn no_matching_language_is_content_unavailable() {
        let tracks = vec![track("fr", None)];
        let err = select_track(&tracks, "en").expect_err("no english");
        assert!(matches!(err, AppError::ContentUnavailable(msg) if msg == NO_SUBTITLES_MESSAGE));
    }

    #[test]
    fn timed_text_url_forces_json_format() {
        let mut caption = track("en", None);
        caption.base_url.push_str("&fmt=srv3");
        let url = timed_text_url(&caption).expect("url");

        let formats: Vec<String> = url
            .query_pairs()
            .filter(|(key, _)| key == "fmt")
            .map(|(_, value)| value.into_owned())
            .collect();
        assert_eq!(formats, vec!["json3".to_string()]);
        assert!(url.query_pairs().any(|(key, value)| key == "v" && value == "abc123"));
    }

    #[test]
    fn joins_segments_with_single_spaces() {
        let timed_text: TimedText = serde_json::from_value(json!({
            "events": [
                { "tStartMs": 0 },
                { "segs": [ { "utf8": "hello" }, { "utf8": " world" } ] },
                { "segs": [ { "utf8": "\n" } ] },
                { "segs": [ { "utf8": "this is a\ntest video" } ] }
            ]
        }))
        .expect("timed text");

        assert_eq!(join_segments(&timed_text), "hello world this is a test video");
    }

    #[test]
    fn watch_url_carries_video_id() {
        let source =
            YoutubeTranscriptSource::new("https://www.youtube.com", "en").expect("source");
        let url = source.watch_url("abc123").expect("watch url");
        assert_eq!(url.as_str(), "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn status_codes_map_to_error_kinds() {
        assert!(check_status(StatusCode::OK, "abc123").is_ok());
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, "abc123"),
            Err(AppError::ContentUnavailable(_))
        ));
        assert!(matches!(
            check_status(StatusCode::FORBIDDEN, "abc123"),
            Err(AppError::AccessDenied(_))
        ));
        assert!(matches!(
            check_status(StatusCode::TOO_MANY_REQUESTS, "abc123"),
            Err(AppError::TransientUpstream(_))
        ));
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY, "abc123"),
            Err(AppError::TransientUpstream(_))
        ));
    }
}
