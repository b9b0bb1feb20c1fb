use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;

use crate::api::PdfDownload;

fn timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\d{8}_\d{6}").expect("static pattern"))
}

/// Local name for a report stored by the backend as `stored`.
///
/// `report_20241215_103000.pdf` becomes `MedNexa Report - 20241215_103000.pdf`;
/// names without a timestamp keep their stem.
pub fn download_name(stored: &str) -> String {
    let base = Path::new(stored)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| stored.to_string());
    let stamp = match timestamp_pattern().find(&base) {
        Some(m) => m.as_str().to_string(),
        None => base.replace(".pdf", ""),
    };
    format!("MedNexa Report - {}.pdf", stamp)
}

/// Write a downloaded report into `dir`, creating it if needed.
pub fn save_download(dir: &Path, download: &PdfDownload) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("could not create {}", dir.display()))?;
    let path = dir.join(&download.filename);
    std::fs::write(&path, &download.bytes)
        .with_context(|| format!("could not write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamped_names_keep_only_the_stamp() {
        assert_eq!(
            download_name("mednexa_report_20241215_103000.pdf"),
            "MedNexa Report - 20241215_103000.pdf"
        );
    }

    #[test]
    fn other_names_keep_their_stem() {
        assert_eq!(download_name("r.pdf"), "MedNexa Report - r.pdf");
        assert_eq!(download_name("outputs/summary.pdf"), "MedNexa Report - summary.pdf");
    }

    #[test]
    fn save_download_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("reports");
        let download = PdfDownload {
            filename: "MedNexa Report - r.pdf".to_string(),
            bytes: b"%PDF-1.4".to_vec(),
        };
        let path = save_download(&target, &download).unwrap();
        assert_eq!(path, target.join("MedNexa Report - r.pdf"));
        assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.4");
    }
}
