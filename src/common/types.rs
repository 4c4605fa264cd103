/// A generic boxed error type.
pub type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// A convenient Result alias returning `AnyError`.
pub type AnyResult<T> = std::result::Result<T, AnyError>;

macro_rules! snowflake {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl From<u64> for $name {
            fn from(u: u64) -> Self {
                Self(u)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map(Self)
            }
        }
    };
}

snowflake!(
    /// Guild (server) a chat event originates from.
    GuildId
);
snowflake!(
    /// Text or voice channel. Voice channels key playback sessions.
    ChannelId
);
snowflake!(UserId);

/// Supported audio formats and containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AudioFormat {
    Aac,
    Opus,
    Webm,
    Mp4,
    Mp3,
    Ogg,
    Flac,
    Wav,
    Unknown,
}

impl AudioFormat {
    pub fn as_ext(&self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Opus => "opus",
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
            Self::Mp3 => "mp3",
            Self::Ogg => "ogg",
            Self::Flac => "flac",
            Self::Wav => "wav",
            Self::Unknown => "",
        }
    }

    pub fn from_ext(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "aac" => Self::Aac,
            "opus" => Self::Opus,
            "webm" | "mka" | "mkv" => Self::Webm,
            "mp4" | "m4a" => Self::Mp4,
            "mp3" => Self::Mp3,
            "ogg" | "oga" => Self::Ogg,
            "flac" => Self::Flac,
            "wav" => Self::Wav,
            _ => Self::Unknown,
        }
    }

    /// MIME types reported by HTTP servers for the formats above.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime.split(';').next().unwrap_or(mime).trim();
        match essence.to_ascii_lowercase().as_str() {
            "audio/aac" | "audio/aacp" => Self::Aac,
            "audio/opus" => Self::Opus,
            "audio/webm" | "video/webm" => Self::Webm,
            "audio/mp4" | "video/mp4" | "audio/x-m4a" => Self::Mp4,
            "audio/mpeg" | "audio/mp3" => Self::Mp3,
            "audio/ogg" | "application/ogg" => Self::Ogg,
            "audio/flac" | "audio/x-flac" => Self::Flac,
            "audio/wav" | "audio/x-wav" | "audio/wave" => Self::Wav,
            _ => Self::Unknown,
        }
    }

    /// Extension of the URL path, ignoring the host, query string and fragment.
    pub fn url_extension(url: &str) -> Option<&str> {
        let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
        let rest = rest.split(['?', '#']).next().unwrap_or(rest);
        let path = &rest[rest.find('/')?..];
        let last = path.rsplit('/').next()?;
        let (_, ext) = last.rsplit_once('.')?;
        (!ext.is_empty()).then_some(ext)
    }

    pub fn from_url(url: &str) -> Self {
        Self::url_extension(url)
            .map(Self::from_ext)
            .unwrap_or(Self::Unknown)
    }
}

pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_url_ignores_query() {
        assert_eq!(
            AudioFormat::from_url("https://cdn.example.com/a/song.MP3?sig=abc.def"),
            AudioFormat::Mp3
        );
        assert_eq!(
            AudioFormat::from_url("https://cdn.example.com/track.m4a#t=10"),
            AudioFormat::Mp4
        );
    }

    #[test]
    fn test_url_extension_absent() {
        assert_eq!(AudioFormat::url_extension("https://example.com/stream"), None);
        assert_eq!(AudioFormat::url_extension("https://example.com/"), None);
        assert_eq!(AudioFormat::url_extension("https://example.com"), None);
        assert_eq!(AudioFormat::from_url("https://example.com/live"), AudioFormat::Unknown);
    }

    #[test]
    fn test_format_from_mime_with_parameters() {
        assert_eq!(AudioFormat::from_mime("audio/ogg; codecs=vorbis"), AudioFormat::Ogg);
        assert_eq!(AudioFormat::from_mime("text/html"), AudioFormat::Unknown);
    }

    #[test]
    fn test_snowflake_parse_and_display() {
        let id: ChannelId = "123456789012345678".parse().expect("valid snowflake");
        assert_eq!(id, ChannelId(123456789012345678));
        assert_eq!(id.to_string(), "123456789012345678");
        assert!("abc".parse::<GuildId>().is_err());
    }
}
