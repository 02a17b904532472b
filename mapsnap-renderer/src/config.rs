//! Configuration types for the renderer.

use crate::errors::RendererError;
use crate::watcher::FileClassifier;
use mapsnap_common::FrameSize;
use mapsnap_context::ConfigRequirements;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Complete renderer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RendererConfig {
    /// Output raster size.
    #[serde(default)]
    pub frame: FrameConfig,
    /// Hard requirements for the graphics config.
    #[serde(default)]
    pub surface: SurfaceConfig,
    /// Data directory watch settings.
    #[serde(default)]
    pub watch: WatchConfig,
    /// Diagnostics settings.
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

/// Output raster size, fixed for the renderer's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameConfig {
    #[serde(default = "default_frame_dimension")]
    pub width: u32,
    #[serde(default = "default_frame_dimension")]
    pub height: u32,
}

fn default_frame_dimension() -> u32 {
    320
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: default_frame_dimension(),
            height: default_frame_dimension(),
        }
    }
}

/// Minimum channel and buffer sizes, in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    #[serde(default = "default_color_bits")]
    pub red_bits: u8,
    #[serde(default = "default_color_bits")]
    pub green_bits: u8,
    #[serde(default = "default_color_bits")]
    pub blue_bits: u8,
    #[serde(default = "default_color_bits")]
    pub alpha_bits: u8,
    #[serde(default = "default_depth_bits")]
    pub depth_bits: u8,
    #[serde(default)]
    pub stencil_bits: u8,
}

fn default_color_bits() -> u8 {
    8
}

fn default_depth_bits() -> u8 {
    16
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            red_bits: default_color_bits(),
            green_bits: default_color_bits(),
            blue_bits: default_color_bits(),
            alpha_bits: default_color_bits(),
            depth_bits: default_depth_bits(),
            stencil_bits: 0,
        }
    }
}

/// Data directory watch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Directory holding map and bookmark files. Not watched if unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Suffix of map data files.
    #[serde(default = "default_map_extension")]
    pub map_extension: String,
    /// Suffix of bookmark files.
    #[serde(default = "default_bookmark_extension")]
    pub bookmark_extension: String,
}

fn default_map_extension() -> String {
    ".mwm".to_string()
}

fn default_bookmark_extension() -> String {
    ".kml".to_string()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            map_extension: default_map_extension(),
            bookmark_extension: default_bookmark_extension(),
        }
    }
}

/// Diagnostics settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Renders slower than this are logged at warn level.
    #[serde(default = "default_slow_render_warn_ms")]
    pub slow_render_warn_ms: u64,
}

fn default_slow_render_warn_ms() -> u64 {
    2_000
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            slow_render_warn_ms: default_slow_render_warn_ms(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            surface: SurfaceConfig::default(),
            watch: WatchConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
        }
    }
}

impl RendererConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> RendererConfigBuilder {
        RendererConfigBuilder::default()
    }

    /// Loads and validates a TOML configuration file.
    ///
    /// Missing sections and keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self, RendererError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| RendererError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<(), RendererError> {
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(RendererError::Config(format!(
                "Frame size must be non-zero, got {}x{}",
                self.frame.width, self.frame.height
            )));
        }

        let surface = &self.surface;
        let bits = [
            ("red_bits", surface.red_bits, 16),
            ("green_bits", surface.green_bits, 16),
            ("blue_bits", surface.blue_bits, 16),
            ("alpha_bits", surface.alpha_bits, 16),
            ("depth_bits", surface.depth_bits, 32),
            ("stencil_bits", surface.stencil_bits, 8),
        ];
        if let Some((name, value, max)) = bits.iter().find(|(_, value, max)| value > max) {
            return Err(RendererError::Config(format!(
                "Surface {name} must be at most {max}, got {value}"
            )));
        }

        for (name, extension) in [
            ("map_extension", &self.watch.map_extension),
            ("bookmark_extension", &self.watch.bookmark_extension),
        ] {
            if extension.len() < 2 || !extension.starts_with('.') {
                return Err(RendererError::Config(format!(
                    "Watch {name} must start with '.' and name a suffix, got {extension:?}"
                )));
            }
        }

        if self.watch.map_extension == self.watch.bookmark_extension {
            return Err(RendererError::Config(
                "Map and bookmark extensions must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Returns the output raster size.
    #[must_use]
    pub fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.frame.width, self.frame.height)
    }

    /// Returns the hard graphics config requirements.
    #[must_use]
    pub fn requirements(&self) -> ConfigRequirements {
        ConfigRequirements {
            red_bits: self.surface.red_bits,
            green_bits: self.surface.green_bits,
            blue_bits: self.surface.blue_bits,
            alpha_bits: self.surface.alpha_bits,
            depth_bits: self.surface.depth_bits,
            stencil_bits: self.surface.stencil_bits,
            ..ConfigRequirements::default()
        }
    }

    /// Returns the file classifier for the watched directory.
    #[must_use]
    pub fn classifier(&self) -> FileClassifier {
        FileClassifier::new(&self.watch.map_extension, &self.watch.bookmark_extension)
    }

    /// Returns the slow render warning threshold.
    #[must_use]
    pub fn slow_render_warn(&self) -> Duration {
        Duration::from_millis(self.diagnostics.slow_render_warn_ms)
    }
}

/// Builder for creating a `RendererConfig`.
#[derive(Default)]
pub struct RendererConfigBuilder {
    config: RendererConfig,
}

impl RendererConfigBuilder {
    /// Sets the output raster size.
    #[must_use]
    pub fn frame_size(mut self, width: u32, height: u32) -> Self {
        self.config.frame = FrameConfig { width, height };
        self
    }

    /// Sets the minimum depth buffer size.
    #[must_use]
    pub fn depth_bits(mut self, bits: u8) -> Self {
        self.config.surface.depth_bits = bits;
        self
    }

    /// Sets the minimum stencil buffer size.
    #[must_use]
    pub fn stencil_bits(mut self, bits: u8) -> Self {
        self.config.surface.stencil_bits = bits;
        self
    }

    /// Sets the directory to watch for data changes.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.watch.data_dir = Some(dir.into());
        self
    }

    /// Sets the map and bookmark file suffixes.
    #[must_use]
    pub fn extensions(mut self, map: impl Into<String>, bookmark: impl Into<String>) -> Self {
        self.config.watch.map_extension = map.into();
        self.config.watch.bookmark_extension = bookmark.into();
        self
    }

    /// Sets the slow render warning threshold in milliseconds.
    #[must_use]
    pub fn slow_render_warn_ms(mut self, ms: u64) -> Self {
        self.config.diagnostics.slow_render_warn_ms = ms;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> Result<RendererConfig, RendererError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
