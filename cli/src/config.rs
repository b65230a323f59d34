/// Command-line and environment configuration.
///
/// Every flag falls back to a `COVERFETCH_*` environment variable, which in
/// turn may come from a `.env` file.
use std::path::PathBuf;

use clap::Parser;

use crate::metadata::DEFAULT_IMAGE_BASE_URL;

/// Download the cover art of a Spotify track or album.
#[derive(Debug, Parser)]
#[command(name = "coverfetch", version)]
pub struct Config {
    /// Username to log in with
    #[arg(long, env = "COVERFETCH_USERNAME", default_value = "")]
    pub username: String,

    /// Password to log in with
    #[arg(long, env = "COVERFETCH_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// A valid Spotify URI (a track or an album)
    #[arg(long, env = "COVERFETCH_TARGET_URI", default_value = "")]
    pub target_uri: String,

    /// Base URL of the metadata service
    #[arg(long, env = "COVERFETCH_METADATA_URL")]
    pub metadata_url: String,

    /// Base URL cover image files are served from
    #[arg(long, env = "COVERFETCH_IMAGE_BASE_URL", default_value = DEFAULT_IMAGE_BASE_URL)]
    pub image_base_url: String,

    /// Directory covers are written to (created if missing)
    #[arg(long, env = "COVERFETCH_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Maximum concurrent downloads and writes (unbounded if unset)
    #[arg(long, env = "COVERFETCH_MAX_CONCURRENT")]
    pub max_concurrent: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from([
            "coverfetch",
            "--metadata-url",
            "http://localhost:9000",
        ])
        .unwrap();
        assert_eq!(config.image_base_url, DEFAULT_IMAGE_BASE_URL);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert_eq!(config.max_concurrent, None);
    }

    #[test]
    fn test_all_flags() {
        let config = Config::try_parse_from([
            "coverfetch",
            "--username",
            "me",
            "--password",
            "pw",
            "--target-uri",
            "spotify:album:4uLU6hMCjMI75M1A2tKUQC",
            "--metadata-url",
            "http://localhost:9000",
            "--output-dir",
            "/tmp/covers",
            "--max-concurrent",
            "2",
        ])
        .unwrap();
        assert_eq!(config.username, "me");
        assert_eq!(config.target_uri, "spotify:album:4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/covers"));
        assert_eq!(config.max_concurrent, Some(2));
    }

    #[test]
    fn test_rejects_non_numeric_limit() {
        let result = Config::try_parse_from([
            "coverfetch",
            "--metadata-url",
            "http://localhost:9000",
            "--max-concurrent",
            "many",
        ]);
        assert!(result.is_err());
    }
}
