//! Audio library for hsoundworks - discovery, loading, pipelines, and storage

mod bpm;
mod config;
mod convert;
mod export;
mod features;
mod loader;
mod plot;
mod scanner;
mod store;

pub use bpm::{calculate_bpm, BpmAnalyzer, BpmError, BpmResult, ANALYSIS_SAMPLE_RATE, MAX_BPM, MIN_BPM};
pub use config::{
    Config, DEFAULT_DATABASE_PATH, DEFAULT_EXPORT_CSV, DEFAULT_MIN_LOOP_DURATION, DEFAULT_OUTPUT_DIR,
};
pub use convert::{convert_audio, convert_folder, output_path, ConvertError, ConvertSummary, TargetFormat};
pub use export::{
    export_csv, format_row, format_table, import_csv, write_bpm_csv, ExportError, ImportSummary,
    BPM_CSV_HEADER, LIBRARY_CSV_HEADER,
};
pub use features::{format_duration, FeatureError, FeatureExtractor, FeatureOptions, FeatureReport};
pub use loader::{AudioLoader, LoadError, LoadedAudio};
pub use plot::{plot_path, save_heatmap, save_waveform, PlotError};
pub use scanner::{discover, discover_or_empty, is_audio_file, ScanConfig, ScanError, AUDIO_EXTENSIONS};
pub use store::{round_duration, AudioLibrary, AudioRecord, StoreError};
