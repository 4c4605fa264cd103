use crate::common::types::AudioFormat;

use super::MediaFetchError;

/// Checks that `locator` is an http(s) URL we can attempt to play.
///
/// A path with a known audio extension, or with no extension at all, is
/// accepted. Anything else (`.html`, `.zip`, ...) is rejected up front.
pub fn check(locator: &str) -> Result<(), MediaFetchError> {
    let lower = locator.trim().to_ascii_lowercase();
    let Some(rest) = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
    else {
        return Err(MediaFetchError::InvalidLocator(locator.to_string()));
    };
    if rest.is_empty() || rest.starts_with('/') {
        return Err(MediaFetchError::InvalidLocator(locator.to_string()));
    }

    match AudioFormat::url_extension(&lower) {
        Some(ext) if AudioFormat::from_ext(ext) == AudioFormat::Unknown => Err(
            MediaFetchError::Unsupported(format!("`.{ext}` files cannot be played")),
        ),
        _ => Ok(()),
    }
}

pub fn is_url_supported(locator: &str) -> bool {
    check(locator).is_ok()
}

/// Human-readable name for a locator: the decoded last path segment.
pub fn display_name(locator: &str) -> String {
    let rest = locator.split_once("://").map(|(_, r)| r).unwrap_or(locator);
    let rest = rest.split(['?', '#']).next().unwrap_or(rest);
    let segment = rest
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(rest);

    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_urls() {
        assert!(is_url_supported("https://cdn.example.com/a/song.mp3"));
        assert!(is_url_supported("http://example.com/stream"));
        assert!(is_url_supported("HTTPS://example.com/x.FLAC?x=1"));
        assert!(is_url_supported("https://example.com"));
    }

    #[test]
    fn test_unsupported_urls() {
        assert!(matches!(
            check("ftp://example.com/a.mp3"),
            Err(MediaFetchError::InvalidLocator(_))
        ));
        assert!(matches!(
            check("https:///a.mp3"),
            Err(MediaFetchError::InvalidLocator(_))
        ));
        assert!(matches!(
            check("https://example.com/index.html"),
            Err(MediaFetchError::Unsupported(_))
        ));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(
            display_name("https://cdn.example.com/music/My%20Song.mp3?sig=1"),
            "My Song.mp3"
        );
        assert_eq!(display_name("https://example.com/"), "example.com");
    }
}
