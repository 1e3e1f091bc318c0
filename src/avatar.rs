//! Avatar image resolution.
//!
//! References are local file paths or `file://` URIs. Anything else (remote
//! URLs, data URIs, unreadable or undecodable files) is dropped silently and
//! the caller draws the placeholder disc instead.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::ImageReader;
use tiny_skia::{IntSize, Pixmap};
use url::Url;

/// Maps a reference to a local path, or `None` when it cannot name one.
pub fn resolve_reference(reference: &str) -> Option<PathBuf> {
    let reference = reference.trim();
    if reference.is_empty() {
        return None;
    }
    match Url::parse(reference) {
        // Drive letters ("C:\...") parse as one-letter schemes.
        Ok(url) if url.scheme().len() == 1 => Some(PathBuf::from(reference)),
        Ok(url) if url.scheme() == "file" => url.to_file_path().ok(),
        Ok(url) => {
            tracing::debug!(scheme = url.scheme(), "avatar reference is not local; skipping");
            None
        }
        Err(_) => Some(PathBuf::from(reference)),
    }
}

/// Rewrites a relative path reference against `base`. URLs and absolute
/// paths come back unchanged.
pub fn resolve_relative(reference: &str, base: &Path) -> String {
    let trimmed = reference.trim();
    if trimmed.is_empty() || Url::parse(trimmed).is_ok() || Path::new(trimmed).is_absolute() {
        return reference.to_owned();
    }
    base.join(trimmed).to_string_lossy().into_owned()
}

fn decode_avatar(path: &Path) -> Result<Pixmap> {
    let image = ImageReader::open(path)
        .with_context(|| format!("failed to open avatar {}", path.display()))?
        .with_guessed_format()
        .with_context(|| format!("failed to sniff avatar format {}", path.display()))?
        .decode()
        .with_context(|| format!("failed to decode avatar {}", path.display()))?
        .to_rgba8();

    let (width, height) = image.dimensions();
    let size = IntSize::from_wh(width, height)
        .with_context(|| format!("avatar {} has no pixels", path.display()))?;
    let mut data = image.into_raw();
    for pixel in data.chunks_exact_mut(4) {
        let alpha = u16::from(pixel[3]);
        for channel in &mut pixel[..3] {
            *channel = ((u16::from(*channel) * alpha + 127) / 255) as u8;
        }
    }
    Pixmap::from_vec(data, size)
        .with_context(|| format!("avatar {} has an invalid pixel buffer", path.display()))
}

pub fn load_avatar(reference: &str) -> Option<Pixmap> {
    let path = resolve_reference(reference)?;
    match decode_avatar(&path) {
        Ok(pixmap) => Some(pixmap),
        Err(error) => {
            tracing::debug!("{error:#}; drawing placeholder");
            None
        }
    }
}

/// Decoded avatars keyed by reference; failed loads are remembered too.
#[derive(Default)]
pub struct AvatarCache {
    entries: HashMap<String, Option<Pixmap>>,
}

impl AvatarCache {
    pub fn get(&mut self, reference: &str) -> Option<&Pixmap> {
        if reference.trim().is_empty() {
            return None;
        }
        self.entries
            .entry(reference.to_owned())
            .or_insert_with(|| load_avatar(reference))
            .as_ref()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use image::{Rgba, RgbaImage};
    use url::Url;

    use super::{load_avatar, resolve_reference, resolve_relative, AvatarCache};

    fn write_png(path: &Path) {
        let mut image = RgbaImage::new(4, 3);
        image.put_pixel(0, 0, Rgba([255, 0, 0, 128]));
        image.save(path).expect("write test png");
    }

    #[test]
    fn file_paths_and_file_uris_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("face.png");
        write_png(&path);

        let pixmap = load_avatar(&path.to_string_lossy()).expect("path should load");
        assert_eq!((pixmap.width(), pixmap.height()), (4, 3));
        let corner = pixmap.pixels()[0];
        assert_eq!(corner.alpha(), 128);
        assert_eq!(corner.red(), 128, "stored premultiplied");

        let uri = Url::from_file_path(&path).expect("absolute path");
        assert!(load_avatar(uri.as_str()).is_some());
    }

    #[test]
    fn remote_and_broken_references_drop_silently() {
        assert_eq!(resolve_reference("https://example.com/a.png"), None);
        assert_eq!(resolve_reference("   "), None);
        assert!(load_avatar("data:image/png;base64,AAAA").is_none());

        let dir = tempfile::tempdir().expect("tempdir");
        let junk = dir.path().join("junk.png");
        std::fs::write(&junk, b"nope").expect("write junk");
        assert!(load_avatar(&junk.to_string_lossy()).is_none());
        assert!(load_avatar(&dir.path().join("missing.png").to_string_lossy()).is_none());
    }

    #[test]
    fn relative_references_resolve_against_base() {
        let base = Path::new("/docs/chat");
        assert_eq!(
            resolve_relative("faces/kim.png", base),
            base.join("faces/kim.png").to_string_lossy()
        );
        assert_eq!(
            resolve_relative("https://example.com/a.png", base),
            "https://example.com/a.png"
        );
        assert_eq!(resolve_relative("", base), "");
    }

    #[test]
    fn cache_remembers_failures() {
        let mut cache = AvatarCache::default();
        assert!(cache.get("/definitely/not/here.png").is_none());
        assert!(cache.get("").is_none());
        assert_eq!(cache.entries.len(), 1);
    }
}
