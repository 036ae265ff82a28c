/// Cross-source identity of a song: `lowercase(artist + ":" + title)`.
///
/// Both halves are trimmed first so that whitespace differences between
/// providers do not defeat dedup.
pub fn normalized_key(artist: &str, title: &str) -> String {
    format!("{}:{}", artist.trim(), title.trim()).to_lowercase()
}

/// Normalizes a submitted `artist:title` key exactly like `normalized_key`,
/// splitting on the first `:`. Keys without a separator are trimmed and
/// lowercased as a whole.
pub fn normalize_track_key(raw: &str) -> String {
    match raw.split_once(':') {
        Some((artist, title)) => normalized_key(artist, title),
        None => raw.trim().to_lowercase(),
    }
}
