use std::fs;
use std::path::{Component, Path, PathBuf};

use image::DynamicImage;

use crate::error::{PersonalizeError, Result};

/// Read-only directory of background illustrations. Templates are loaded
/// fresh on every lookup.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
    default_name: String,
}

impl TemplateStore {
    pub fn new(dir: impl Into<PathBuf>, default_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            default_name: default_name.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the template directory if it is missing.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            PersonalizeError::ConfigError(format!(
                "cannot create template directory {}: {}",
                self.dir.display(),
                e
            ))
        })
    }

    /// Path of a stored template, if `name` is a plain file name that exists.
    pub fn path_of(&self, name: &str) -> Option<PathBuf> {
        let name = name.trim();
        let mut components = Path::new(name).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !plain {
            return None;
        }
        let path = self.dir.join(name);
        path.is_file().then_some(path)
    }

    /// The named template if it exists, else the default template if it
    /// exists, else `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<Option<DynamicImage>> {
        let requested = name.filter(|n| !n.trim().is_empty());
        let path = match requested.and_then(|n| self.path_of(n)) {
            Some(path) => Some(path),
            None => {
                if let Some(n) = requested {
                    log::debug!("Template '{}' not found, trying default", n);
                }
                self.path_of(&self.default_name)
            }
        };

        let Some(path) = path else {
            return Ok(None);
        };

        log::debug!("Loading template {}", path.display());
        let template = image::open(&path).map_err(|e| {
            PersonalizeError::TemplateError(format!("cannot load {}: {}", path.display(), e))
        })?;
        Ok(Some(template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("personalizer-templates-{}-{}", tag, uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_template(dir: &Path, name: &str, width: u32) {
        RgbImage::from_pixel(width, 10, Rgb([1, 2, 3]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_resolves_named_then_default_then_none() {
        let dir = scratch_dir("resolve");
        let store = TemplateStore::new(&dir, "template.png");
        assert!(store.resolve(Some("castle.png")).unwrap().is_none());

        write_template(&dir, "template.png", 20);
        let fallback = store.resolve(Some("castle.png")).unwrap().unwrap();
        assert_eq!(fallback.width(), 20);

        write_template(&dir, "castle.png", 30);
        let named = store.resolve(Some("castle.png")).unwrap().unwrap();
        assert_eq!(named.width(), 30);

        let default = store.resolve(None).unwrap().unwrap();
        assert_eq!(default.width(), 20);

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_rejects_names_outside_the_directory() {
        let dir = scratch_dir("escape");
        let inner = dir.join("inner");
        fs::create_dir_all(&inner).unwrap();
        write_template(&dir, "secret.png", 10);
        let store = TemplateStore::new(&inner, "template.png");

        assert!(store.path_of("../secret.png").is_none());
        assert!(store.path_of("/etc/passwd").is_none());
        assert!(store.resolve(Some("../secret.png")).unwrap().is_none());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_corrupt_template_is_an_error() {
        let dir = scratch_dir("corrupt");
        fs::write(dir.join("template.png"), b"not a png").unwrap();
        let store = TemplateStore::new(&dir, "template.png");
        assert!(matches!(
            store.resolve(None),
            Err(PersonalizeError::TemplateError(_))
        ));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_creates_missing_directory() {
        let dir = std::env::temp_dir().join(format!("personalizer-bootstrap-{}", uuid::Uuid::new_v4()));
        let store = TemplateStore::new(&dir, "template.png");
        store.ensure_dir().unwrap();
        assert!(dir.is_dir());
        fs::remove_dir_all(dir).unwrap();
    }
}
