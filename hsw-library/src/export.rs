//! CSV export and import, and plain-text tables for the terminal

use crate::bpm::BpmResult;
use crate::store::{AudioLibrary, AudioRecord, StoreError};
use std::path::Path;
use thiserror::Error;

/// Header row of library CSV files
pub const LIBRARY_CSV_HEADER: [&str; 3] = ["File Name", "Sample Rate (Hz)", "Duration (seconds)"];

/// Header row of BPM log files
pub const BPM_CSV_HEADER: [&str; 2] = ["filename", "bpm"];

/// Errors that can occur while reading or writing CSV files
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("No BPM results to write to CSV")]
    NoResults,
    #[error("Unexpected CSV header in {0}")]
    BadHeader(String),
}

/// Outcome of a CSV import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Rows stored in the library
    pub imported: usize,
    /// Rows that failed to parse or validate
    pub skipped: usize,
}

fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write BPM results as `filename,bpm` rows
///
/// An empty result list writes nothing and returns `ExportError::NoResults`.
pub fn write_bpm_csv(path: &Path, results: &[BpmResult]) -> Result<(), ExportError> {
    if results.is_empty() {
        return Err(ExportError::NoResults);
    }

    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(BPM_CSV_HEADER)?;
    for result in results {
        let bpm = result.bpm.to_string();
        writer.write_record([result.filename.as_str(), bpm.as_str()])?;
    }
    writer.flush()?;

    tracing::info!("BPM log saved to {}", path.display());
    Ok(())
}

/// Export every record, sorted by file name; returns the row count
pub fn export_csv(library: &AudioLibrary, path: &Path) -> Result<usize, ExportError> {
    let records = library.all_sorted_by_name()?;

    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(LIBRARY_CSV_HEADER)?;
    for record in &records {
        let sample_rate = record.sample_rate.to_string();
        // Debug keeps the decimal point on whole seconds ("32.0")
        let duration = format!("{:?}", record.duration_secs);
        writer.write_record([record.file_name.as_str(), sample_rate.as_str(), duration.as_str()])?;
    }
    writer.flush()?;

    tracing::info!("Exported {} record(s) to {}", records.len(), path.display());
    Ok(records.len())
}

/// Import a library CSV, upserting every valid row
///
/// Rows with unparsable numbers or values that break the record invariants
/// are skipped with a warning.
pub fn import_csv(library: &AudioLibrary, path: &Path) -> Result<ImportSummary, ExportError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let header_ok = reader.headers()?.iter().eq(LIBRARY_CSV_HEADER.iter().copied());
    if !header_ok {
        return Err(ExportError::BadHeader(path.display().to_string()));
    }

    let mut summary = ImportSummary::default();
    for (line, row) in reader.deserialize::<AudioRecord>().enumerate() {
        let stored = row
            .map_err(ExportError::from)
            .and_then(|record| library.upsert(&record).map_err(ExportError::from));

        match stored {
            Ok(()) => summary.imported += 1,
            Err(e) => {
                // +2: one for the header, one for 1-based numbering
                tracing::warn!("Skipping row {} of {}: {}", line + 2, path.display(), e);
                summary.skipped += 1;
            }
        }
    }

    tracing::info!(
        "Imported {} record(s) from {} ({} skipped)",
        summary.imported,
        path.display(),
        summary.skipped
    );
    Ok(summary)
}

/// One fixed-width table row: `name | rate Hz | duration s`
pub fn format_row(record: &AudioRecord) -> String {
    format!(
        "{:<30} | {:>6} Hz | {:>6.2}s",
        record.file_name, record.sample_rate, record.duration_secs
    )
}

/// Title, rule, and one row per record
pub fn format_table(title: &str, records: &[AudioRecord]) -> String {
    let mut lines = vec![title.to_string(), "-".repeat(60)];
    lines.extend(records.iter().map(format_row));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_library() -> AudioLibrary {
        let library = AudioLibrary::in_memory().unwrap();
        library.upsert(&AudioRecord::new("snare.wav", 44100, 1.2)).unwrap();
        library.upsert(&AudioRecord::new("amen, break.wav", 44100, 7.5)).unwrap();
        library.upsert(&AudioRecord::new("pad.flac", 48000, 32.0)).unwrap();
        library
    }

    #[test]
    fn test_export_then_import_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("library.csv");

        let source = sample_library();
        assert_eq!(export_csv(&source, &csv_path).unwrap(), 3);

        let target = AudioLibrary::in_memory().unwrap();
        let summary = import_csv(&target, &csv_path).unwrap();
        assert_eq!(summary, ImportSummary { imported: 3, skipped: 0 });
        assert_eq!(
            target.all_sorted_by_name().unwrap(),
            source.all_sorted_by_name().unwrap()
        );
    }

    #[test]
    fn test_export_header_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("out").join("library.csv");

        export_csv(&sample_library(), &csv_path).unwrap();
        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines[0], "File Name,Sample Rate (Hz),Duration (seconds)");
        assert_eq!(lines[1], "\"amen, break.wav\",44100,7.5");
        assert_eq!(lines[2], "pad.flac,48000,32.0");
        assert_eq!(lines[3], "snare.wav,44100,1.2");
    }

    #[test]
    fn test_import_skips_bad_rows() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("in.csv");
        std::fs::write(
            &csv_path,
            "File Name,Sample Rate (Hz),Duration (seconds)\n\
             good.wav,44100,2.5\n\
             zero.wav,0,2.5\n\
             words.wav,fast,2.5\n\
             good.wav,48000,3.0\n",
        )
        .unwrap();

        let library = AudioLibrary::in_memory().unwrap();
        let summary = import_csv(&library, &csv_path).unwrap();

        assert_eq!(summary, ImportSummary { imported: 2, skipped: 2 });
        assert_eq!(library.count().unwrap(), 1);
        assert_eq!(library.get("good.wav").unwrap().unwrap().sample_rate, 48000);
    }

    #[test]
    fn test_import_tolerates_padded_fields() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("padded.csv");
        std::fs::write(
            &csv_path,
            "File Name, Sample Rate (Hz), Duration (seconds)\n\
             loop.wav, 44100, 8.0\n",
        )
        .unwrap();

        let library = AudioLibrary::in_memory().unwrap();
        let summary = import_csv(&library, &csv_path).unwrap();

        assert_eq!(summary, ImportSummary { imported: 1, skipped: 0 });
        assert_eq!(
            library.get("loop.wav").unwrap().unwrap(),
            AudioRecord::new("loop.wav", 44100, 8.0)
        );
    }

    #[test]
    fn test_import_rejects_foreign_header() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("bpm.csv");
        std::fs::write(&csv_path, "filename,bpm\nkick.wav,120\n").unwrap();

        let library = AudioLibrary::in_memory().unwrap();
        assert!(matches!(
            import_csv(&library, &csv_path),
            Err(ExportError::BadHeader(_))
        ));
    }

    #[test]
    fn test_write_bpm_csv() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("logs").join("bpm.csv");
        let results = vec![
            BpmResult::new("a.wav", 120),
            BpmResult::new("b.mp3", 87),
        ];

        write_bpm_csv(&csv_path, &results).unwrap();
        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert_eq!(content, "filename,bpm\na.wav,120\nb.mp3,87\n");
    }

    #[test]
    fn test_write_bpm_csv_empty() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("bpm.csv");

        assert!(matches!(
            write_bpm_csv(&csv_path, &[]),
            Err(ExportError::NoResults)
        ));
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_format_table() {
        let table = format_table(
            "Audio Library Database:",
            &[AudioRecord::new("kick.wav", 44100, 0.5)],
        );
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].len(), 60);
        assert_eq!(
            lines[2],
            format!("{:<30} |  44100 Hz |   0.50s", "kick.wav")
        );
    }
}
