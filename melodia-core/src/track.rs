use crate::time::DurationExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Image CDN used when the service only returns a picture id
pub const PICTURE_CDN: &str = "https://p1.music.126.net";

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

const ARTIST_SEPARATOR: &str = " / ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: Option<u64>,
    pub name: String,
}

/// A playable track. Artists keep the service's order, the first being the
/// primary artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: u64,
    pub title: String,
    pub artists: Vec<Artist>,
    pub album: String,
    pub album_id: Option<u64>,
    pub cover_url: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub mv_id: Option<u64>,
}

impl Track {
    /// Artist names joined for display
    #[must_use]
    pub fn artist_display(&self) -> String {
        let names: Vec<&str> = self
            .artists
            .iter()
            .map(|a| a.name.as_str())
            .filter(|name| !name.is_empty())
            .collect();

        if names.is_empty() {
            UNKNOWN_ARTIST.to_string()
        } else {
            names.join(ARTIST_SEPARATOR)
        }
    }

    #[must_use]
    pub fn primary_artist(&self) -> Option<&Artist> {
        self.artists.first()
    }

    #[must_use]
    pub const fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    /// Length as `m:ss`
    #[must_use]
    pub fn duration_label(&self) -> String {
        self.duration().to_clock_string()
    }
}

/// Song object as returned by the service. Field names differ between
/// endpoints, so every alternative is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSong {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ar: Option<Vec<RawArtist>>,
    #[serde(default)]
    pub artists: Option<Vec<RawArtist>>,
    #[serde(default)]
    pub al: Option<RawAlbum>,
    #[serde(default)]
    pub album: Option<RawAlbum>,
    #[serde(default)]
    pub dt: Option<u64>,
    #[serde(default)]
    pub duration: Option<u64>,
    #[serde(default)]
    pub mv: Option<u64>,
    #[serde(default)]
    pub mvid: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawArtist {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAlbum {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "picUrl")]
    pub pic_url: Option<String>,
    #[serde(default)]
    pub pic_str: Option<String>,
    /// Picture id, sent as either a number or a string
    #[serde(default)]
    pub pic: Option<Value>,
}

impl RawAlbum {
    fn cover_url(&self) -> Option<String> {
        if let Some(url) = self.pic_url.as_ref().filter(|u| !u.is_empty()) {
            return Some(url.clone());
        }

        let picture_id = self
            .pic_str
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| match self.pic.as_ref()? {
                Value::String(s) if !s.is_empty() => Some(s.clone()),
                Value::Number(n) if n.as_u64() != Some(0) => Some(n.to_string()),
                _ => None,
            })?;

        Some(format!("{PICTURE_CDN}/{picture_id}/{picture_id}.jpg"))
    }
}

impl From<RawSong> for Track {
    fn from(song: RawSong) -> Self {
        let artists = song
            .ar
            .or(song.artists)
            .unwrap_or_default()
            .into_iter()
            .map(|a| Artist {
                id: a.id,
                name: a.name.unwrap_or_default(),
            })
            .collect();

        // `al` wins over `album` even when it has no picture
        let (album, album_id, cover_url) = match (song.al, song.album) {
            (Some(al), _) => {
                let cover = al.cover_url();
                (al.name, al.id, cover)
            }
            (None, Some(album)) => {
                let cover = album.pic_url.filter(|u| !u.is_empty());
                (album.name, album.id, cover)
            }
            (None, None) => (None, None, None),
        };

        Self {
            id: song.id,
            title: song.name.unwrap_or_default(),
            artists,
            album: album.unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            album_id,
            cover_url: cover_url.unwrap_or_default(),
            duration_ms: song.dt.or(song.duration).unwrap_or_default(),
            mv_id: song.mv.filter(|&id| id != 0).or(song.mvid.filter(|&id| id != 0)),
        }
    }
}

/// Convert a JSON array of raw songs, skipping entries that fail to decode.
#[must_use]
pub fn tracks_from_value(songs: &Value) -> Vec<Track> {
    songs
        .as_array()
        .map(|songs| {
            songs
                .iter()
                .filter_map(|song| serde_json::from_value::<RawSong>(song.clone()).ok())
                .map(Track::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: &Value) -> Track {
        Track::from(serde_json::from_value::<RawSong>(value.clone()).unwrap())
    }

    #[test]
    fn test_from_detail_song() {
        let track = parse(&json!({
            "id": 347230,
            "name": "海阔天空",
            "ar": [{"id": 11127, "name": "Beyond"}, {"id": 2, "name": "Guest"}],
            "al": {"id": 34209, "name": "海阔天空", "picUrl": "https://img/cover.jpg"},
            "dt": 326000,
            "mv": 376199
        }));

        assert_eq!(track.id, 347_230);
        assert_eq!(track.artist_display(), "Beyond / Guest");
        assert_eq!(track.primary_artist().unwrap().id, Some(11127));
        assert_eq!(track.album_id, Some(34209));
        assert_eq!(track.cover_url, "https://img/cover.jpg");
        assert_eq!(track.duration_label(), "5:26");
        assert_eq!(track.mv_id, Some(376_199));
    }

    #[test]
    fn test_from_legacy_song() {
        let track = parse(&json!({
            "id": 5,
            "name": "Old",
            "artists": [{"id": 9, "name": "Band"}],
            "album": {"id": 3, "name": "Record", "picUrl": "https://img/old.jpg"},
            "duration": 61000,
            "mvid": 0
        }));

        assert_eq!(track.artist_display(), "Band");
        assert_eq!(track.album, "Record");
        assert_eq!(track.cover_url, "https://img/old.jpg");
        assert_eq!(track.duration_ms, 61_000);
        assert_eq!(track.mv_id, None);
    }

    #[test]
    fn test_cover_from_picture_id() {
        let track = parse(&json!({"id": 1, "name": "a", "al": {"id": 1, "pic_str": "109951"}}));
        assert_eq!(
            track.cover_url,
            "https://p1.music.126.net/109951/109951.jpg"
        );

        let track = parse(&json!({"id": 1, "name": "a", "al": {"id": 1, "pic": 42}}));
        assert_eq!(track.cover_url, "https://p1.music.126.net/42/42.jpg");

        let track = parse(&json!({"id": 1, "name": "a", "al": {"id": 1, "pic": 0}}));
        assert_eq!(track.cover_url, "");
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let track = parse(&json!({"id": 8, "name": "Bare"}));
        assert_eq!(track.artist_display(), UNKNOWN_ARTIST);
        assert_eq!(track.album, UNKNOWN_ALBUM);
        assert!(track.primary_artist().is_none());
        assert_eq!(track.duration_ms, 0);
    }

    #[test]
    fn test_tracks_from_value_skips_bad_entries() {
        let tracks = tracks_from_value(&json!([
            {"id": 1, "name": "ok"},
            {"id": "not a number"},
            {"id": 2, "name": "also ok"}
        ]));
        assert_eq!(tracks.len(), 2);
        assert!(tracks_from_value(&json!(null)).is_empty());
    }

    #[test]
    fn test_serde_round_trip_uses_camel_case() {
        let track = parse(&json!({"id": 3, "name": "x", "al": {"id": 4, "name": "y"}, "dt": 1}));
        let value = serde_json::to_value(&track).unwrap();
        assert_eq!(value["albumId"], json!(4));
        assert_eq!(value["durationMs"], json!(1));
        let back: Track = serde_json::from_value(value).unwrap();
        assert_eq!(back, track);
    }
}
