use std::fmt::Write;

use dealerlink_core::{ErrorMetadata, UploadReport};

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render an upload report as a fixed-width table, one row per completed image.
///
/// `requested` is the batch size; after a cancellation it exceeds the number of rows.
pub fn render_report_table(vehicle_id: &str, requested: usize, report: &UploadReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n=== Image Upload: vehicle {} ===\n", vehicle_id);
    let _ = writeln!(
        out,
        "{:>5} {:<8} {:<30} {:<4} {}",
        "#", "Status", "Filename", "Main", "Image ID / Error"
    );
    let _ = writeln!(out, "{}", "-".repeat(90));

    for outcome in &report.outcomes {
        let (status, detail) = match &outcome.result {
            Ok(image_id) => ("uploaded", image_id.clone()),
            Err(e) => ("failed", format!("{}: {}", e.error_code(), e)),
        };
        let _ = writeln!(
            out,
            "{:>5} {:<8} {:<30} {:<4} {}",
            outcome.index,
            status,
            truncate_string(&outcome.filename, 30),
            if outcome.main { "yes" } else { "" },
            truncate_string(&detail, 60)
        );
    }

    let _ = writeln!(
        out,
        "\nUploaded {} of {} image(s){}",
        report.uploaded_count,
        requested,
        if report.partial { " (cancelled)" } else { "" }
    );
    if report.partial {
        let _ = writeln!(
            out,
            "Not attempted: {} image(s)",
            requested.saturating_sub(report.outcomes.len())
        );
    }
    let _ = writeln!(
        out,
        "Result: {}",
        if report.success { "success" } else { "failed" }
    );
    out
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("dealerlink=info")),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use dealerlink_core::{ItemError, UploadOutcome};

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_multibyte() {
        assert_eq!(truncate_string("überlange-datei.jpg", 8), "überl...");
    }

    #[test]
    fn table_lists_every_item_in_order() {
        let report = UploadReport::from_outcomes(
            vec![
                UploadOutcome::failed(
                    1,
                    "doc.pdf".into(),
                    false,
                    ItemError::UnsupportedMediaType("application/pdf".into()),
                ),
                UploadOutcome::succeeded(0, "front.jpg".into(), true, "img-1".into()),
            ],
            Some(0),
            false,
        );

        let table = render_report_table("v1", 2, &report);
        let front = table.find("front.jpg").unwrap();
        let doc = table.find("doc.pdf").unwrap();
        assert!(front < doc);
        assert!(table.contains("img-1"));
        assert!(table.contains("UnsupportedMediaType"));
        assert!(table.contains("Uploaded 1 of 2 image(s)"));
        assert!(table.contains("Result: success"));
        assert!(!table.contains("Not attempted"));
    }

    #[test]
    fn table_counts_requested_images_after_cancel() {
        let report = UploadReport::from_outcomes(
            vec![
                UploadOutcome::succeeded(0, "a.jpg".into(), false, "img-a".into()),
                UploadOutcome::succeeded(1, "b.jpg".into(), false, "img-b".into()),
            ],
            None,
            true,
        );

        let table = render_report_table("v1", 5, &report);
        assert!(table.contains("Uploaded 2 of 5 image(s) (cancelled)"));
        assert!(table.contains("Not attempted: 3 image(s)"));
    }
}
