use std::path::Path;
use std::time::Duration;

use base64::prelude::*;
use tracing::info;

use crate::error::{WatchError, WatchResult};

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub const ACCEPTED_MIME_TYPES: [&str; 5] = [
    "audio/mpeg",
    "audio/wav",
    "audio/ogg",
    "audio/mp4",
    "audio/m4a",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomAudio {
    pub name: String,
    pub data_uri: String,
}

/// Validates an upload and encodes it as a `data:` URI. A rejected upload
/// leaves the caller's state untouched.
pub fn accept_upload(name: &str, mime: &str, bytes: &[u8]) -> WatchResult<CustomAudio> {
    if !ACCEPTED_MIME_TYPES.contains(&mime) {
        return Err(WatchError::InvalidUpload(format!(
            "unsupported audio type '{mime}', use MP3, WAV, OGG or M4A"
        )));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(WatchError::InvalidUpload(format!(
            "file is {:.1} MB, the limit is 10 MB",
            bytes.len() as f64 / (1024.0 * 1024.0)
        )));
    }
    info!(name, mime, bytes = bytes.len(), "custom audio accepted");
    Ok(CustomAudio {
        name: name.to_string(),
        data_uri: format!("data:{mime};base64,{}", BASE64_STANDARD.encode(bytes)),
    })
}

pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "mp3" | "mpeg" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "ogg" | "oga" => Some("audio/ogg"),
        "mp4" => Some("audio/mp4"),
        "m4a" => Some("audio/m4a"),
        _ => None,
    }
}

pub fn decode_data_uri(uri: &str) -> WatchResult<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| WatchError::PlaybackFailure("audio is not a data URI".to_string()))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| WatchError::PlaybackFailure("audio data URI is not base64".to_string()))?;
    let bytes = BASE64_STANDARD
        .decode(payload)
        .map_err(|err| WatchError::PlaybackFailure(format!("audio payload corrupt: {err}")))?;
    Ok((mime.to_string(), bytes))
}

/// Reads the playing time out of a RIFF/WAVE header. Other containers report
/// nothing and callers fall back to an estimate.
pub fn wav_duration(bytes: &[u8]) -> Option<Duration> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return None;
    }
    let mut byte_rate = None;
    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32::from_le_bytes(bytes[offset + 4..offset + 8].try_into().ok()?) as usize;
        let body = offset + 8;
        if id == b"fmt " && body + 12 <= bytes.len() {
            let rate = u32::from_le_bytes(bytes[body + 8..body + 12].try_into().ok()?);
            byte_rate = Some(rate).filter(|rate| *rate > 0);
        } else if id == b"data" {
            let rate = byte_rate?;
            return Some(Duration::from_secs_f64(size as f64 / f64::from(rate)));
        }
        offset = body + size + (size % 2);
    }
    None
}

#[cfg(test)]
pub(crate) fn test_wav(seconds: u32) -> Vec<u8> {
    let byte_rate: u32 = 8_000;
    let data_len = byte_rate * seconds;
    let mut wav = Vec::new();
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16_u32.to_le_bytes());
    wav.extend_from_slice(&1_u16.to_le_bytes());
    wav.extend_from_slice(&1_u16.to_le_bytes());
    wav.extend_from_slice(&8_000_u32.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&1_u16.to_le_bytes());
    wav.extend_from_slice(&8_u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(wav.len() + data_len as usize, 128);
    wav
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_upload_is_rejected() {
        let bytes = vec![0_u8; 12 * 1024 * 1024];
        let err = accept_upload("big.mp3", "audio/mpeg", &bytes).expect_err("too big");
        assert!(matches!(err, WatchError::InvalidUpload(_)));
        assert!(err.to_string().contains("10 MB"));
    }

    #[test]
    fn unsupported_type_is_rejected() {
        let err = accept_upload("song.flac", "audio/flac", b"fLaC").expect_err("bad type");
        assert!(matches!(err, WatchError::InvalidUpload(_)));
    }

    #[test]
    fn accepted_upload_round_trips_through_data_uri() {
        let audio = accept_upload("ping.wav", "audio/wav", b"RIFF").expect("accepted");
        assert_eq!(audio.data_uri, "data:audio/wav;base64,UklGRg==");
        let (mime, bytes) = decode_data_uri(&audio.data_uri).expect("decodes");
        assert_eq!(mime, "audio/wav");
        assert_eq!(bytes, b"RIFF");
    }

    #[test]
    fn broken_data_uri_is_a_playback_failure() {
        assert!(matches!(
            decode_data_uri("http://example.com/a.mp3"),
            Err(WatchError::PlaybackFailure(_))
        ));
        assert!(matches!(
            decode_data_uri("data:audio/wav;base64,***"),
            Err(WatchError::PlaybackFailure(_))
        ));
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for_path(Path::new("a/B.MP3")), Some("audio/mpeg"));
        assert_eq!(mime_for_path(Path::new("x.m4a")), Some("audio/m4a"));
        assert_eq!(mime_for_path(Path::new("x.flac")), None);
        assert_eq!(mime_for_path(Path::new("noext")), None);
    }

    #[test]
    fn wav_header_gives_duration() {
        assert_eq!(wav_duration(&test_wav(3)), Some(Duration::from_secs(3)));
        assert_eq!(wav_duration(b"ID3\x03junk"), None);
    }
}
