use serde::{Deserialize, Serialize};
use shared::error::Error;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

/// Kind of media carried by an RTP stream.
///
/// Connection quality is only analyzed for these two kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

const MEDIA_KIND_AUDIO_STR: &str = "audio";
const MEDIA_KIND_VIDEO_STR: &str = "video";

impl MediaKind {
    pub const ALL: [MediaKind; 2] = [MediaKind::Audio, MediaKind::Video];
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            MEDIA_KIND_AUDIO_STR => Ok(MediaKind::Audio),
            MEDIA_KIND_VIDEO_STR => Ok(MediaKind::Video),
            _ => Err(Error::ErrUnknownMediaKind(raw.to_owned())),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            MediaKind::Audio => MEDIA_KIND_AUDIO_STR,
            MediaKind::Video => MEDIA_KIND_VIDEO_STR,
        };
        write!(f, "{s}")
    }
}

/// One value for each [`MediaKind`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct KindMap<T> {
    audio: T,
    video: T,
}

impl<T> KindMap<T> {
    pub fn new(audio: T, video: T) -> Self {
        Self { audio, video }
    }

    /// Builds the map calling `f` once per kind, audio first.
    pub fn from_fn(mut f: impl FnMut(MediaKind) -> T) -> Self {
        let audio = f(MediaKind::Audio);
        let video = f(MediaKind::Video);
        Self { audio, video }
    }

    /// Same as [`from_fn`](Self::from_fn), stopping at the first error.
    pub fn try_from_fn<E>(mut f: impl FnMut(MediaKind) -> Result<T, E>) -> Result<Self, E> {
        let audio = f(MediaKind::Audio)?;
        let video = f(MediaKind::Video)?;
        Ok(Self { audio, video })
    }

    pub fn iter(&self) -> impl Iterator<Item = (MediaKind, &T)> {
        [(MediaKind::Audio, &self.audio), (MediaKind::Video, &self.video)].into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (MediaKind, &mut T)> {
        [
            (MediaKind::Audio, &mut self.audio),
            (MediaKind::Video, &mut self.video),
        ]
        .into_iter()
    }
}

impl<T> Index<MediaKind> for KindMap<T> {
    type Output = T;

    fn index(&self, kind: MediaKind) -> &T {
        match kind {
            MediaKind::Audio => &self.audio,
            MediaKind::Video => &self.video,
        }
    }
}

impl<T> IndexMut<MediaKind> for KindMap<T> {
    fn index_mut(&mut self, kind: MediaKind) -> &mut T {
        match kind {
            MediaKind::Audio => &mut self.audio,
            MediaKind::Video => &mut self.video,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_media_kind_string() {
        let tests = vec![(MediaKind::Audio, "audio"), (MediaKind::Video, "video")];

        for (kind, expected_string) in tests {
            assert_eq!(kind.to_string(), expected_string);
            assert_eq!(expected_string.parse::<MediaKind>(), Ok(kind));
        }

        assert_eq!(
            "data".parse::<MediaKind>(),
            Err(Error::ErrUnknownMediaKind("data".to_owned()))
        );
    }

    #[test]
    fn test_kind_map_index() {
        let mut map = KindMap::from_fn(|kind| kind.to_string());
        assert_eq!(map[MediaKind::Audio], "audio");
        assert_eq!(map[MediaKind::Video], "video");

        map[MediaKind::Video].push_str("-muted");
        assert_eq!(map[MediaKind::Video], "video-muted");
        assert_eq!(
            map.iter().map(|(kind, _)| kind).collect::<Vec<_>>(),
            MediaKind::ALL.to_vec()
        );
    }

    #[test]
    fn test_kind_map_try_from_fn() {
        let map: Result<KindMap<u8>, &str> = KindMap::try_from_fn(|kind| match kind {
            MediaKind::Audio => Ok(1),
            MediaKind::Video => Err("no video"),
        });
        assert_eq!(map, Err("no video"));

        let mut map: KindMap<u8> = KindMap::try_from_fn(|_| Ok::<_, ()>(0)).unwrap();
        for (kind, value) in map.iter_mut() {
            *value = if kind == MediaKind::Audio { 1 } else { 2 };
        }
        assert_eq!(map, KindMap::new(1, 2));
    }
}
