use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use styloscope::models::{BatchRow, BatchSummary};
use styloscope::samples::SAMPLE_TEXTS;
use styloscope::services::batch_io::{read_csv_rows, read_json_rows, write_csv_results, BatchFormat};
use styloscope::services::config_store::{AppConfig, ConfigStore};
use styloscope::services::providers::CloudClassifier;
use styloscope::{detect_with_double_check, init_logging, Detector};
use tracing::info;

const USAGE: &str = "Usage:
  styloscope <path|-> [--batch] [--format <json|csv>] [--out <path>] [--config <path>] [--parallel [n]] [--cloud <name[:model]>]
  styloscope --samples

Notes:
  - `-` reads from stdin.
  - `--batch` reads a JSON array, JSON Lines of {\"text\": ...} records, or CSV with a `text` column.
    The input format follows the file extension (`.csv`) unless `--format` is given.
  - `--out <file.csv>` writes batch results as CSV (text, label, ai_confidence, human_confidence);
    any other `--out` path gets JSON.
  - `--parallel <n>` scores batch rows on <n> worker threads; a bare `--parallel` uses
    `detection.batchConcurrency` from the config.
  - `--cloud` asks a chat-completions provider for a second opinion (single text only).";

fn parse_arg_value(args: &[String], key: &str) -> Option<String> {
    args.iter()
        .position(|a| a == key)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], key: &str) -> bool {
    args.iter().any(|a| a == key)
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read stdin failed")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("read {} failed", path))
}

fn input_format(args: &[String], path: &str) -> Result<BatchFormat> {
    match parse_arg_value(args, "--format") {
        Some(name) => BatchFormat::from_str(&name).with_context(|| format!("unknown --format {}", name)),
        None => Ok(BatchFormat::from_path(Path::new(path))),
    }
}

fn parse_rows(content: &str, format: BatchFormat) -> Result<Vec<BatchRow>> {
    match format {
        BatchFormat::Json => Ok(read_json_rows(content)),
        BatchFormat::Csv => read_csv_rows(content.as_bytes()).context("read CSV header failed"),
    }
}

/// `--parallel <n>` asks for n workers, a bare `--parallel` takes the configured
/// batch concurrency. `None` means sequential scoring.
fn batch_concurrency(args: &[String], config: &AppConfig) -> Result<Option<usize>> {
    let Some(pos) = args.iter().position(|a| a == "--parallel") else {
        return Ok(None);
    };
    match args.get(pos + 1) {
        Some(value) if !value.starts_with("--") => {
            let n: usize = value
                .parse()
                .with_context(|| format!("invalid --parallel value {}", value))?;
            if n == 0 {
                bail!("--parallel needs at least one worker");
            }
            Ok(Some(n))
        }
        _ => Ok(Some(config.detection.batch_concurrency)),
    }
}

fn load_config(args: &[String]) -> Result<AppConfig> {
    if let Some(path) = parse_arg_value(args, "--config") {
        return ConfigStore::load_file(Path::new(&path)).with_context(|| format!("load config {} failed", path));
    }
    match ConfigStore::default_config_dir() {
        Some(dir) => ConfigStore::new(dir).load().context("load default config failed"),
        None => Ok(AppConfig::default()),
    }
}

fn wants_csv(out_path: Option<&str>) -> bool {
    out_path.is_some_and(|p| BatchFormat::from_path(Path::new(p)) == BatchFormat::Csv)
}

fn emit<T: Serialize>(value: &T, out_path: Option<&str>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out_path {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("write {} failed", path))?;
            eprintln!("Wrote JSON: {}", path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn emit_batch(summary: &BatchSummary, texts: &[String], out_path: Option<&str>) -> Result<()> {
    match out_path {
        Some(path) if wants_csv(out_path) => {
            let file = std::fs::File::create(path).with_context(|| format!("create {} failed", path))?;
            write_csv_results(file, texts, summary).with_context(|| format!("write {} failed", path))?;
            eprintln!("Wrote CSV: {}", path);
            Ok(())
        }
        _ => emit(summary, out_path),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || has_flag(&args, "--help") {
        eprintln!("{}", USAGE);
        return Ok(());
    }

    init_logging();

    let mut config = load_config(&args)?;
    let out_path = parse_arg_value(&args, "--out");

    if let Some(spec) = parse_arg_value(&args, "--cloud") {
        config.cloud.enabled = true;
        config.cloud.provider = spec;
    }

    let detector = Detector::new(&config).context("detector initialization failed")?;

    if has_flag(&args, "--samples") {
        #[derive(Serialize)]
        struct SampleOutput<'a> {
            label: &'a str,
            result: styloscope::DetectionResult,
        }
        let out: Vec<SampleOutput> = SAMPLE_TEXTS
            .iter()
            .map(|s| SampleOutput {
                label: s.label,
                result: detector.detect_single(s.text),
            })
            .collect();
        return emit(&out, out_path.as_deref());
    }

    let path = &args[1];
    if path.starts_with("--") {
        bail!("expected an input path or `-` as the first argument\n\n{}", USAGE);
    }
    let content = read_input(path)?;

    if has_flag(&args, "--batch") {
        let rows = parse_rows(&content, input_format(&args, path)?)?;
        let texts: Vec<String> = rows.iter().map(|r| r.text().unwrap_or("").to_string()).collect();
        let summary = match batch_concurrency(&args, &config)? {
            Some(n) => detector.detect_batch_parallel(rows, n).await,
            None => detector.detect_batch(rows),
        };
        info!(count = summary.count, malformed = summary.malformed_rows.len(), "cli.batch_done");
        return emit_batch(&summary, &texts, out_path.as_deref());
    }

    if wants_csv(out_path.as_deref()) {
        bail!("CSV output needs --batch");
    }

    if config.cloud.enabled {
        let classifier = CloudClassifier::from_config(&config.cloud).context("cloud classifier unavailable")?;
        let timeout = Duration::from_secs(classifier.timeout_secs());
        let report = detect_with_double_check(&detector, &content, Some(&classifier), timeout).await;
        return emit(&report, out_path.as_deref());
    }

    emit(&detector.detect_single(&content), out_path.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use styloscope::models::{Label, RowError};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_arg_helpers() {
        let args = args(&["styloscope", "in.txt", "--out", "o.json", "--batch"]);
        assert_eq!(parse_arg_value(&args, "--out").as_deref(), Some("o.json"));
        assert_eq!(parse_arg_value(&args, "--config"), None);
        assert!(has_flag(&args, "--batch"));
    }

    #[test]
    fn test_csv_batch_uses_text_column() {
        let content = "text\n\"Quoted sentence one, with a comma.\"\n\"Second row. It has two sentences.\"\n";
        let format = input_format(&args(&["styloscope", "rows.csv", "--batch"]), "rows.csv").unwrap();
        assert_eq!(format, BatchFormat::Csv);

        let rows = parse_rows(content, format).unwrap();
        let summary = Detector::with_defaults().unwrap().detect_batch(rows);
        assert_eq!(summary.count, 2);
        assert!(summary.malformed_rows.is_empty());
    }

    #[test]
    fn test_format_flag_overrides_extension() {
        let args = args(&["styloscope", "-", "--batch", "--format", "csv"]);
        assert_eq!(input_format(&args, "-").unwrap(), BatchFormat::Csv);
        let bad = vec!["styloscope".to_string(), "-".into(), "--format".into(), "xml".into()];
        assert!(input_format(&bad, "-").is_err());
    }

    #[test]
    fn test_csv_empty_cell_is_malformed() {
        let rows = parse_rows("id,text\n1,\n", BatchFormat::Csv).unwrap();
        assert_eq!(rows, vec![BatchRow::Malformed(RowError::EmptyText)]);
    }

    #[test]
    fn test_json_lines_bad_line_is_invalid_json() {
        let rows = parse_rows("{\"text\": \"a b c\"}\n{not json}\n", BatchFormat::Json).unwrap();
        assert_eq!(rows[0], BatchRow::Text("a b c".to_string()));
        assert!(matches!(rows[1], BatchRow::Malformed(RowError::InvalidJson { .. })));
    }

    #[test]
    fn test_parallel_defaults_to_configured_concurrency() {
        let mut config = AppConfig::default();
        config.detection.batch_concurrency = 7;

        assert_eq!(batch_concurrency(&args(&["styloscope", "in.json"]), &config).unwrap(), None);
        assert_eq!(
            batch_concurrency(&args(&["styloscope", "in.json", "--batch", "--parallel"]), &config).unwrap(),
            Some(7)
        );
        assert_eq!(
            batch_concurrency(&args(&["styloscope", "in.json", "--parallel", "--batch"]), &config).unwrap(),
            Some(7)
        );
        assert_eq!(
            batch_concurrency(&args(&["styloscope", "in.json", "--parallel", "3"]), &config).unwrap(),
            Some(3)
        );
        assert!(batch_concurrency(&args(&["styloscope", "in.json", "--parallel", "0"]), &config).is_err());
        assert!(batch_concurrency(&args(&["styloscope", "in.json", "--parallel", "many"]), &config).is_err());
    }

    #[test]
    fn test_batch_results_written_as_csv() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("results.csv");
        let out_str = out.to_string_lossy().to_string();

        let rows = vec![
            BatchRow::from("The class discussion felt messy but alive. People interrupted each other."),
            BatchRow::Malformed(RowError::MissingText),
        ];
        let texts: Vec<String> = rows.iter().map(|r| r.text().unwrap_or("").to_string()).collect();
        let summary = Detector::with_defaults().unwrap().detect_batch(rows);

        assert!(wants_csv(Some(&out_str)));
        emit_batch(&summary, &texts, Some(&out_str)).unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], "text,label,ai_confidence,human_confidence");
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with(&format!(",{},", Label::Uncertain)));
    }
}
