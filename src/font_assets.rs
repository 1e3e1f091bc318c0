use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use fontdue::Font;
use sha2::{Digest, Sha256};

/// Overrides system font discovery when `--font` is not given.
pub const FONT_ENV: &str = "CHATMOCK_FONT";

pub const SYSTEM_FONT_CANDIDATES: [&str; 8] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct LoadedFont {
    pub path: PathBuf,
    pub sha256: String,
    pub font: Font,
}

/// Regular face plus an optional bold companion. Without a bold face the
/// painter emboldens the regular one.
pub struct FontSet {
    pub regular: LoadedFont,
    pub bold: Option<LoadedFont>,
}

/// Picks the font file to use: explicit path, then `CHATMOCK_FONT`, then the
/// first system candidate that exists.
pub fn resolve_font_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(from_env) = std::env::var_os(FONT_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(from_env));
    }
    SYSTEM_FONT_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.is_file())
}

pub fn load_font(path: &Path) -> Result<LoadedFont> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read font file '{}'", path.display()))?;
    let sha256 = sha256_hex(&bytes);
    let font = Font::from_bytes(bytes, fontdue::FontSettings::default())
        .map_err(|error| anyhow!("failed to parse font '{}': {error}", path.display()))?;
    Ok(LoadedFont {
        path: path.to_path_buf(),
        sha256,
        font,
    })
}

/// Bold sibling of a regular face, by file naming convention
/// (`Foo-Regular.ttf` -> `Foo-Bold.ttf`, `Foo.ttf` -> `Foo-Bold.ttf`).
pub fn bold_companion(regular: &Path) -> Option<PathBuf> {
    let stem = regular.file_stem()?.to_str()?;
    let ext = regular
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("ttf");
    let dir = regular.parent().unwrap_or_else(|| Path::new(""));

    let base = stem
        .strip_suffix("-Regular")
        .or_else(|| stem.strip_suffix("Regular"))
        .unwrap_or(stem);
    [format!("{base}-Bold.{ext}"), format!("{base}Bold.{ext}"), format!("{base}bd.{ext}")]
        .into_iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

/// Loads the font set. An explicitly requested font that fails to load is an
/// error; a missing discovered font is not, callers fall back to glyph-less
/// rendering.
pub fn discover_fonts(explicit: Option<&Path>) -> Result<Option<FontSet>> {
    let Some(path) = resolve_font_path(explicit) else {
        tracing::warn!("no usable font found; text will be omitted (set --font or {FONT_ENV})");
        return Ok(None);
    };

    let regular = match load_font(&path) {
        Ok(font) => font,
        Err(error) if explicit.is_none() => {
            tracing::warn!("{error:#}; text will be omitted");
            return Ok(None);
        }
        Err(error) => return Err(error),
    };

    let bold = bold_companion(&path).and_then(|bold_path| match load_font(&bold_path) {
        Ok(font) => Some(font),
        Err(error) => {
            tracing::debug!("ignoring bold companion: {error:#}");
            None
        }
    });

    tracing::debug!(
        path = %regular.path.display(),
        sha256 = %regular.sha256,
        bold = bold.is_some(),
        "loaded font"
    );
    Ok(Some(FontSet { regular, bold }))
}

/// Drops codepoints the font has no glyph for. Whitespace always survives.
pub fn supported_text<'a>(font: &Font, text: &'a str) -> Cow<'a, str> {
    let supported = |ch: char| ch.is_whitespace() || font.lookup_glyph_index(ch) != 0;
    if text.chars().all(supported) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|ch| supported(*ch)).collect())
    }
}

pub fn unsupported_codepoints(font: &Font, text: &str) -> Vec<char> {
    text.chars()
        .filter(|ch| !ch.is_whitespace() && font.lookup_glyph_index(*ch) == 0)
        .collect()
}

pub(crate) fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{bold_companion, discover_fonts, load_font, resolve_font_path, sha256_hex};

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn explicit_path_wins_resolution() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("Custom.ttf");
        assert_eq!(resolve_font_path(Some(&path)), Some(path));
    }

    #[test]
    fn bold_companion_follows_naming_convention() {
        let dir = tempfile::tempdir().expect("tempdir");
        let regular = dir.path().join("Inter-Regular.ttf");
        fs::write(&regular, b"").expect("write regular");
        assert_eq!(bold_companion(&regular), None);

        let bold = dir.path().join("Inter-Bold.ttf");
        fs::write(&bold, b"").expect("write bold");
        assert_eq!(bold_companion(&regular), Some(bold));

        let plain = dir.path().join("DejaVuSans.ttf");
        let plain_bold = dir.path().join("DejaVuSans-Bold.ttf");
        fs::write(&plain_bold, b"").expect("write plain bold");
        assert_eq!(bold_companion(&plain), Some(plain_bold));
    }

    #[test]
    fn garbage_font_bytes_are_reported_with_the_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.ttf");
        fs::write(&path, b"not a font").expect("write");
        let error = load_font(&path).err().expect("parse should fail");
        assert!(format!("{error:#}").contains("broken.ttf"));
    }

    #[test]
    fn explicit_broken_font_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.ttf");
        assert!(discover_fonts(Some(&path)).is_err());
    }
}
