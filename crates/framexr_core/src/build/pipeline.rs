//! Build orchestration: validation, then hooks in callback order.
//!
//! # Invariants
//! - A build with failing error-level validation rules runs no hook.
//! - Only hooks of enabled features run.
//! - Manifest requirements apply to Android builds only, and only when they
//!   support the configured loader.

use crate::build::boot_config::{BootConfigBuilder, BootConfigError};
use crate::build::hooks::{package_build_hooks, FeatureBuildHooks, OPENXR_LOADER};
use crate::build::manifest::{AndroidManifest, ManifestChanges, ManifestError};
use crate::settings::{BuildTarget, ProjectSettings};
use crate::validation::{is_buildable, validate, ValidationIssue};
use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const BOOT_CONFIG_FILE_NAME: &str = "boot.config";
pub const ANDROID_MANIFEST_FILE_NAME: &str = "AndroidManifest.xml";

#[derive(Debug)]
pub enum BuildError {
    Validation(Vec<ValidationIssue>),
    BootConfig {
        feature_id: &'static str,
        source: BootConfigError,
    },
    Manifest {
        feature_id: &'static str,
        source: ManifestError,
    },
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(issues) => {
                let errors = issues.iter().filter(|issue| issue.error).count();
                write!(f, "build blocked by {errors} validation error(s)")
            }
            Self::BootConfig { feature_id, source } => {
                write!(f, "boot config update from `{feature_id}` failed: {source}")
            }
            Self::Manifest { feature_id, source } => {
                write!(f, "manifest update from `{feature_id}` failed: {source}")
            }
            Self::Io { path, source } => {
                write!(f, "failed to write `{}`: {source}", path.display())
            }
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(_) => None,
            Self::BootConfig { source, .. } => Some(source),
            Self::Manifest { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
        }
    }
}

/// What one build run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub target: BuildTarget,
    pub features_run: Vec<&'static str>,
    /// Non-blocking issues found before the hooks ran.
    pub warnings: Vec<ValidationIssue>,
    pub manifest_added: usize,
    pub manifest_removed: usize,
}

/// Boot config and manifest produced by a build.
#[derive(Debug, Clone, Default)]
pub struct BuildOutputs {
    pub boot_config: BootConfigBuilder,
    pub manifest: AndroidManifest,
}

impl BuildOutputs {
    /// Writes `boot.config` and, for Android, `AndroidManifest.xml` into `dir`.
    pub fn write_to(&self, dir: &Path, target: BuildTarget) -> Result<Vec<PathBuf>, BuildError> {
        std::fs::create_dir_all(dir).map_err(|source| BuildError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut files = vec![(dir.join(BOOT_CONFIG_FILE_NAME), self.boot_config.render())];
        if target == BuildTarget::Android {
            files.push((dir.join(ANDROID_MANIFEST_FILE_NAME), self.manifest.to_xml()));
        }
        let mut written = Vec::with_capacity(files.len());
        for (path, content) in files {
            std::fs::write(&path, content).map_err(|source| BuildError::Io {
                path: path.clone(),
                source,
            })?;
            written.push(path);
        }
        Ok(written)
    }
}

pub struct BuildPipeline {
    hooks: Vec<Box<dyn FeatureBuildHooks>>,
    loader: String,
}

impl Default for BuildPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildPipeline {
    pub fn new() -> Self {
        Self::with_hooks(package_build_hooks())
    }

    pub fn with_hooks(mut hooks: Vec<Box<dyn FeatureBuildHooks>>) -> Self {
        hooks.sort_by_key(|hook| hook.callback_order());
        Self {
            hooks,
            loader: OPENXR_LOADER.to_string(),
        }
    }

    pub fn with_loader(mut self, loader: &str) -> Self {
        self.loader = loader.to_string();
        self
    }

    /// Validates, preprocesses `settings` and fills `outputs`.
    ///
    /// # Errors
    /// - `BuildError::Validation` when an error-level rule fails; nothing ran.
    /// - `BuildError::BootConfig` / `BuildError::Manifest` from a hook.
    pub fn run(
        &self,
        settings: &mut ProjectSettings,
        target: BuildTarget,
        outputs: &mut BuildOutputs,
    ) -> Result<BuildReport, BuildError> {
        // Rules and hooks both read the mode enum, never the legacy flag.
        settings.features.render_regions.migrate_legacy_mode();
        let issues = validate(settings, target);
        if !is_buildable(&issues) {
            error!(
                "event=build_run module=build status=blocked target={} issues={}",
                target.as_str(),
                issues.len()
            );
            return Err(BuildError::Validation(issues));
        }

        let active: Vec<&dyn FeatureBuildHooks> = self
            .hooks
            .iter()
            .map(|hook| hook.as_ref())
            .filter(|hook| settings.is_feature_enabled(hook.feature_id()))
            .collect();

        for hook in &active {
            hook.on_preprocess_build(settings, target);
        }

        let mut changes = ManifestChanges::default();
        for hook in &active {
            hook.on_process_boot_config(settings, target, &mut outputs.boot_config)
                .map_err(|source| BuildError::BootConfig {
                    feature_id: hook.feature_id(),
                    source,
                })?;

            if target != BuildTarget::Android {
                continue;
            }
            let Some(requirement) = hook.manifest_requirement(settings) else {
                continue;
            };
            if !requirement.supports_loader(&self.loader) {
                continue;
            }
            let applied = outputs
                .manifest
                .apply(&requirement)
                .map_err(|source| BuildError::Manifest {
                    feature_id: hook.feature_id(),
                    source,
                })?;
            changes.added += applied.added;
            changes.removed += applied.removed;
        }

        let report = BuildReport {
            target,
            features_run: active.iter().map(|hook| hook.feature_id()).collect(),
            warnings: issues,
            manifest_added: changes.added,
            manifest_removed: changes.removed,
        };
        info!(
            "event=build_run module=build status=ok target={} features={} boot_config_keys={} manifest_added={}",
            target.as_str(),
            report.features_run.len(),
            outputs.boot_config.len(),
            report.manifest_added
        );
        Ok(report)
    }
}
