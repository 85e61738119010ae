// ============================================================================
// SETTINGS — explicit configuration passed to loading, resizing and logging
// ============================================================================

use std::path::{Path, PathBuf};

use image::imageops::FilterType;

use crate::logger::LogLevel;

/// Resampling filter used when images are brought to the target size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeFilter {
    Nearest,
    Bilinear,
    Bicubic,
    Lanczos,
}

impl ResizeFilter {
    pub fn to_image_filter(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Bilinear => FilterType::Triangle,
            ResizeFilter::Bicubic => FilterType::CatmullRom,
            ResizeFilter::Lanczos => FilterType::Lanczos3,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ResizeFilter::Nearest => "nearest",
            ResizeFilter::Bilinear => "bilinear",
            ResizeFilter::Bicubic => "bicubic",
            ResizeFilter::Lanczos => "lanczos",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "nearest" => Some(ResizeFilter::Nearest),
            "bilinear" | "triangle" => Some(ResizeFilter::Bilinear),
            "bicubic" | "catmullrom" => Some(ResizeFilter::Bicubic),
            "lanczos" | "lanczos3" => Some(ResizeFilter::Lanczos),
            _ => None,
        }
    }
}

/// Settings shared by every image taking part in a mix.
#[derive(Clone, Debug, PartialEq)]
pub struct MixerSettings {
    /// Width every loaded image is resampled to before mixing.
    pub target_width: u32,
    /// Height every loaded image is resampled to before mixing.
    pub target_height: u32,
    pub resize_filter: ResizeFilter,
    /// Directory for the session log. `None` = platform data directory.
    pub log_dir: Option<PathBuf>,
    /// Minimum level mirrored to stderr.
    pub console_level: LogLevel,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            target_width: 512,
            target_height: 512,
            resize_filter: ResizeFilter::Bilinear,
            log_dir: None,
            console_level: LogLevel::Info,
        }
    }
}

impl MixerSettings {
    /// Write the settings as `key = value` lines.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let mut out = String::new();
        out.push_str(&format!("target_width = {}\n", self.target_width));
        out.push_str(&format!("target_height = {}\n", self.target_height));
        out.push_str(&format!("resize_filter = {}\n", self.resize_filter.as_str()));
        if let Some(dir) = &self.log_dir {
            out.push_str(&format!("log_dir = {}\n", dir.display()));
        }
        out.push_str(&format!(
            "console_level = {}\n",
            self.console_level.as_str().to_lowercase()
        ));
        std::fs::write(path, out)
    }

    /// Read settings written by [`save`](Self::save).  A missing or unreadable
    /// file yields the defaults; unknown keys and bad values are skipped.
    pub fn load(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else { return Self::default() };
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "target_width" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        s.target_width = v;
                    }
                }
                "target_height" => {
                    if let Ok(v) = val.parse::<u32>()
                        && v > 0
                    {
                        s.target_height = v;
                    }
                }
                "resize_filter" => {
                    if let Some(f) = ResizeFilter::parse(val) {
                        s.resize_filter = f;
                    }
                }
                "log_dir" => {
                    if !val.is_empty() {
                        s.log_dir = Some(PathBuf::from(val));
                    }
                }
                "console_level" => {
                    if let Some(level) = LogLevel::parse(val) {
                        s.console_level = level;
                    }
                }
                _ => {}
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_then_load_keeps_every_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixer.cfg");
        let settings = MixerSettings {
            target_width: 300,
            target_height: 200,
            resize_filter: ResizeFilter::Lanczos,
            log_dir: Some(dir.path().join("logs")),
            console_level: LogLevel::Warn,
        };
        settings.save(&path).unwrap();
        assert_eq!(MixerSettings::load(&path), settings);
    }

    #[test]
    fn bad_values_and_unknown_keys_keep_defaults() {
        let s = MixerSettings::parse(
            "# comment\ntarget_width = wide\ntarget_height = 0\ncolour = blue\nresize_filter = bicubic\n",
        );
        assert_eq!(s.target_width, 512);
        assert_eq!(s.target_height, 512);
        assert_eq!(s.resize_filter, ResizeFilter::Bicubic);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let s = MixerSettings::load(Path::new("/definitely/not/here.cfg"));
        assert_eq!(s, MixerSettings::default());
    }
}
