//! # Image Registry Publisher
//!
//! Ensures the container image repository exists (get-or-create), then builds
//! the worker image once and pushes it under every requested tag. An optional
//! dependency manifest is copied into the build context for the duration of
//! the build only; the copy is removed when the build scope ends, whether the
//! build succeeded or not.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::BuildConfig;
use crate::error::Result;
use crate::provider::{CloudBatchProvider, Ensured, ImageBuildRequest, ImageRepository};

pub struct ImageRegistryPublisher {
    provider: Arc<dyn CloudBatchProvider>,
}

impl ImageRegistryPublisher {
    pub fn new(provider: Arc<dyn CloudBatchProvider>) -> Self {
        Self { provider }
    }

    /// Idempotent get-or-create. The uri of an existing repository is
    /// returned unchanged.
    pub async fn ensure_repository(&self, name: &str) -> Result<ImageRepository> {
        match self.provider.get_or_create_repository(name).await? {
            Ensured::Created(repository) => {
                info!(name = %repository.name, uri = %repository.uri, "created image repository");
                Ok(repository)
            }
            Ensured::Found(repository) => {
                info!(name = %repository.name, uri = %repository.uri, "image repository already exists");
                Ok(repository)
            }
        }
    }

    /// Build one image and push it under every tag in `config.tags`
    /// (`["latest"]` when the list is empty). Build or push failure is fatal;
    /// no partial retry.
    pub async fn build_and_push(&self, config: &BuildConfig, repository_uri: &str) -> Result<()> {
        let tags = if config.tags.is_empty() {
            vec!["latest".to_string()]
        } else {
            config.tags.clone()
        };

        // Holds the injected manifest copy for the duration of the build.
        let _manifest = match &config.manifest {
            Some(manifest) => Some(ManifestGuard::inject(manifest, &config.build_context)?),
            None => None,
        };

        let request = ImageBuildRequest {
            build_context: config.build_context.clone(),
            dockerfile: config.dockerfile.clone(),
            repository_uri: repository_uri.to_string(),
            tags: tags.clone(),
            verbose: config.verbose,
        };
        info!(uri = %repository_uri, tags = ?tags, "building and pushing image");
        self.provider.build_and_push(&request).await?;
        info!(uri = %repository_uri, "image pushed");
        Ok(())
    }
}

/// Scoped copy of a dependency manifest inside the build context.
///
/// The copy happens only when the context does not already carry a file of
/// the same name; an operator-provided file is never overwritten or removed.
struct ManifestGuard {
    copied: Option<PathBuf>,
}

impl ManifestGuard {
    fn inject(manifest: &Path, build_context: &Path) -> std::io::Result<Self> {
        let file_name = manifest.file_name().ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("manifest path '{}' has no file name", manifest.display()),
            )
        })?;
        let target = build_context.join(file_name);
        if target.exists() {
            debug!(target = %target.display(), "build context already has a manifest, leaving it alone");
            return Ok(Self { copied: None });
        }
        fs::copy(manifest, &target)?;
        debug!(source = %manifest.display(), target = %target.display(), "injected manifest into build context");
        Ok(Self {
            copied: Some(target),
        })
    }
}

impl Drop for ManifestGuard {
    fn drop(&mut self) {
        if let Some(target) = self.copied.take() {
            if let Err(err) = fs::remove_file(&target) {
                warn!(target = %target.display(), error = %err, "failed to remove injected manifest");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::InMemoryProvider;

    fn write(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_manifest_guard_copies_and_removes() {
        let source_dir = tempfile::tempdir().unwrap();
        let context = tempfile::tempdir().unwrap();
        let manifest = source_dir.path().join("requirements.txt");
        write(&manifest, "numpy\n");

        let target = context.path().join("requirements.txt");
        {
            let _guard = ManifestGuard::inject(&manifest, context.path()).unwrap();
            assert!(target.exists());
        }
        assert!(!target.exists(), "guard must remove its copy on drop");
    }

    #[test]
    fn test_manifest_guard_leaves_preexisting_file() {
        let source_dir = tempfile::tempdir().unwrap();
        let context = tempfile::tempdir().unwrap();
        let manifest = source_dir.path().join("requirements.txt");
        write(&manifest, "numpy\n");
        let preexisting = context.path().join("requirements.txt");
        write(&preexisting, "scipy\n");

        {
            let _guard = ManifestGuard::inject(&manifest, context.path()).unwrap();
        }
        assert!(preexisting.exists());
        assert_eq!(fs::read_to_string(&preexisting).unwrap(), "scipy\n");
    }

    #[tokio::test]
    async fn test_empty_tag_list_defaults_to_latest() {
        let provider = Arc::new(InMemoryProvider::new());
        let publisher = ImageRegistryPublisher::new(provider.clone());
        let repository = publisher.ensure_repository("shards").await.unwrap();

        let config = BuildConfig {
            tags: Vec::new(),
            ..BuildConfig::default()
        };
        publisher
            .build_and_push(&config, &repository.uri)
            .await
            .unwrap();

        let builds = provider.builds();
        assert_eq!(builds.len(), 1);
        assert_eq!(builds[0].tags, vec!["latest".to_string()]);
    }

    #[tokio::test]
    async fn test_ensure_repository_returns_stable_uri() {
        let provider = Arc::new(InMemoryProvider::new());
        let publisher = ImageRegistryPublisher::new(provider);
        let first = publisher.ensure_repository("shards").await.unwrap();
        let second = publisher.ensure_repository("shards").await.unwrap();
        assert_eq!(first.uri, second.uri);
    }
}
