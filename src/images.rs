//! Illustration picker.
//!
//! Images live under `<public>/images/<folder>/`, one folder per age tier
//! (see [`AgeGroup::image_folder`]). A request picks one file at random; a
//! missing or empty folder yields the placeholder endpoint instead.

use std::path::Path;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::content::AgeGroup;
use crate::error::{BibleError, Result};

/// URL of the built-in placeholder image.
pub const PLACEHOLDER_URL: &str = "/api/placeholder-image";

/// `Cache-Control` sent with the placeholder.
pub const PLACEHOLDER_CACHE_CONTROL: &str = "public, max-age=3600";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg"];

const PLACEHOLDER_SVG: &str = r##"<svg width="128" height="128" viewBox="0 0 128 128" fill="none" xmlns="http://www.w3.org/2000/svg">
  <rect width="128" height="128" fill="#F0F0F0"/>
  <circle cx="64" cy="64" r="32" fill="#E0E0E0"/>
  <path d="M64 40C50.745 40 40 50.745 40 64C40 77.255 50.745 88 64 88C77.255 88 88 77.255 88 64C88 50.745 77.255 40 64 40ZM64 80C55.163 80 48 72.837 48 64C48 55.163 55.163 48 64 48C72.837 48 80 55.163 80 64C80 72.837 72.837 80 64 80Z" fill="#B0B0B0"/>
  <path d="M64 56C58.477 56 54 60.477 54 66C54 71.523 58.477 76 64 76C69.523 76 74 71.523 74 66C74 60.477 69.523 56 64 56ZM64 72C60.686 72 58 69.314 58 66C58 62.686 60.686 60 64 60C67.314 60 70 62.686 70 66C70 69.314 67.314 72 64 72Z" fill="#909090"/>
</svg>
"##;

/// Result of an image pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSelection {
    pub image_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_images: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ImageSelection {
    pub fn placeholder(message: &str) -> Self {
        Self {
            image_url: PLACEHOLDER_URL.to_string(),
            file_name: None,
            total_images: None,
            message: Some(message.to_string()),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.image_url == PLACEHOLDER_URL
    }
}

/// The fixed 128x128 placeholder SVG.
pub fn placeholder_svg() -> &'static str {
    PLACEHOLDER_SVG
}

/// Pick a random image for `tier` under `images_root`.
pub async fn random_image(images_root: &Path, tier: AgeGroup) -> ImageSelection {
    match random_image_in(images_root, tier.image_folder()).await {
        Ok(selection) => selection,
        Err(e) => {
            warn!(error = %e, "Image selection failed");
            ImageSelection::placeholder("Folder not accessible, using placeholder")
        }
    }
}

/// Pick a random image from `images_root/<folder>`.
///
/// `folder` must be a single plain path segment. An unreadable folder maps
/// to the placeholder; only a malformed folder name is an error.
pub async fn random_image_in(images_root: &Path, folder: &str) -> Result<ImageSelection> {
    let folder = folder.trim();
    if !is_plain_segment(folder) {
        return Err(BibleError::Validation(format!(
            "Invalid folder name: '{}'",
            folder
        )));
    }

    let dir = images_root.join(folder);
    let mut files = match list_images(&dir).await {
        Ok(files) => files,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Could not read image folder");
            return Ok(ImageSelection::placeholder(
                "Folder not accessible, using placeholder",
            ));
        }
    };

    if files.is_empty() {
        debug!(path = %dir.display(), "No images in folder");
        return Ok(ImageSelection::placeholder("No images found in this folder"));
    }

    files.sort();
    let index = rand::rng().random_range(0..files.len());
    let total = files.len();
    let file_name = files.swap_remove(index);

    Ok(ImageSelection {
        image_url: format!("/images/{}/{}", folder, file_name),
        file_name: Some(file_name),
        total_images: Some(total),
        message: None,
    })
}

async fn list_images(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if has_image_extension(&name) {
            files.push(name);
        }
    }
    Ok(files)
}

fn has_image_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn is_plain_segment(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"x").unwrap();
    }

    #[test]
    fn test_has_image_extension() {
        assert!(has_image_extension("ark.png"));
        assert!(has_image_extension("ARK.JPEG"));
        assert!(has_image_extension("dove.webp"));
        assert!(!has_image_extension("notes.txt"));
        assert!(!has_image_extension("png"));
    }

    #[test]
    fn test_plain_segment_rejects_traversal() {
        assert!(is_plain_segment("7-12"));
        assert!(is_plain_segment("adult"));
        assert!(!is_plain_segment(".."));
        assert!(!is_plain_segment("../etc"));
        assert!(!is_plain_segment("a/b"));
        assert!(!is_plain_segment(""));
    }

    #[tokio::test]
    async fn test_random_image_picks_from_folder() {
        let root = TempDir::new().unwrap();
        let folder = root.path().join("7-12");
        std::fs::create_dir_all(&folder).unwrap();
        touch(&folder, "noah.png");
        touch(&folder, "david.jpg");
        touch(&folder, "readme.txt");

        let selection = random_image(root.path(), AgeGroup::Child).await;
        assert_eq!(selection.total_images, Some(2));
        let name = selection.file_name.clone().unwrap();
        assert!(name == "noah.png" || name == "david.jpg");
        assert_eq!(selection.image_url, format!("/images/7-12/{}", name));
        assert!(!selection.is_placeholder());
    }

    #[tokio::test]
    async fn test_empty_folder_gives_placeholder() {
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("adult")).unwrap();

        let selection = random_image(root.path(), AgeGroup::Adult).await;
        assert!(selection.is_placeholder());
        assert_eq!(
            selection.message.as_deref(),
            Some("No images found in this folder")
        );
    }

    #[tokio::test]
    async fn test_missing_folder_gives_placeholder() {
        let root = TempDir::new().unwrap();
        let selection = random_image(root.path(), AgeGroup::Toddler).await;
        assert!(selection.is_placeholder());
        assert_eq!(
            selection.message.as_deref(),
            Some("Folder not accessible, using placeholder")
        );
    }

    #[tokio::test]
    async fn test_invalid_folder_name_is_validation_error() {
        let root = TempDir::new().unwrap();
        let err = random_image_in(root.path(), "../secrets").await.unwrap_err();
        assert!(matches!(err, BibleError::Validation(_)));
    }

    #[test]
    fn test_placeholder_serialization_omits_empty_fields() {
        let json = serde_json::to_value(ImageSelection::placeholder("none")).unwrap();
        assert_eq!(json["imageUrl"], PLACEHOLDER_URL);
        assert_eq!(json["message"], "none");
        assert!(json.get("fileName").is_none());
        assert!(json.get("totalImages").is_none());
    }

    #[test]
    fn test_placeholder_svg_is_square() {
        let svg = placeholder_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains(r#"width="128" height="128""#));
    }
}
