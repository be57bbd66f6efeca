//! robots.txt policy for the mirrored site

use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Policy written when no template is configured
pub const DEFAULT_ROBOTS_TXT: &str =
    "User-agent: *\nDisallow: /wp-admin/\nAllow: /wp-admin/admin-ajax.php\n";

/// Writes `robots.txt` into the output root
///
/// Copies `template` when it is set and exists, otherwise writes
/// [`DEFAULT_ROBOTS_TXT`].
///
/// # Returns
///
/// The path written
pub fn write_robots_txt(output_root: &Path, template: Option<&Path>) -> Result<PathBuf> {
    let destination = output_root.join("robots.txt");

    match template {
        Some(template) if template.is_file() => {
            std::fs::copy(template, &destination)?;
            info!("Copied robots.txt from {}", template.display());
        }
        Some(template) => {
            warn!(
                "robots.txt template {} not found, writing default policy",
                template.display()
            );
            std::fs::write(&destination, DEFAULT_ROBOTS_TXT)?;
        }
        None => {
            std::fs::write(&destination, DEFAULT_ROBOTS_TXT)?;
            info!("Wrote default robots.txt");
        }
    }

    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_robots_txt(dir.path(), None).unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.starts_with("User-agent: *\n"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_template_is_copied() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("template.txt");
        std::fs::write(&template, "User-agent: *\nDisallow: /\n").unwrap();

        let out = dir.path().join("out");
        std::fs::create_dir(&out).unwrap();
        write_robots_txt(&out, Some(&template)).unwrap();

        assert_eq!(
            std::fs::read_to_string(out.join("robots.txt")).unwrap(),
            "User-agent: *\nDisallow: /\n"
        );
    }

    #[test]
    fn test_missing_template_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        write_robots_txt(dir.path(), Some(Path::new("/nonexistent/robots.txt"))).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("robots.txt")).unwrap(),
            DEFAULT_ROBOTS_TXT
        );
    }
}
