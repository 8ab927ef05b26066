use tracing::{info, warn};

use crate::cli::BuildArgs;
use crate::error::MappingError;
use crate::mapping::builder::{BuildReport, CategoryStats, ForwardBuilder};
use crate::mapping::reverse::build_reverse;
use crate::mapping::store::{DataDir, backup_existing, read_table, write_table};
use crate::mapping::ForwardTable;
use crate::sources::monarch::MonarchClient;

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BuildOutcome {
    Complete {
        forward_entries: usize,
        reverse_entries: usize,
        backup: bool,
        categories: Vec<CategoryStats>,
    },
    Partial {
        retained: usize,
        categories: Vec<CategoryStats>,
        failures: Vec<FailedCategory>,
    },
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FailedCategory {
    #[serde(flatten)]
    pub stats: CategoryStats,
    pub error: String,
}

impl BuildOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    pub fn to_markdown(&self, data_dir: &DataDir) -> String {
        let mut out = String::new();
        out.push_str("# Monarch → OMIM build\n\n");
        let (categories, failed) = match self {
            Self::Complete { categories, .. } => (categories.as_slice(), &[] as &[FailedCategory]),
            Self::Partial {
                categories,
                failures,
                ..
            } => (categories.as_slice(), failures.as_slice()),
        };
        out.push_str("| Category | Pages | Records | Mapped | No OMIM | Skipped |\n");
        out.push_str("|----------|-------|---------|--------|---------|---------|\n");
        let rows = categories
            .iter()
            .map(|stats| (stats, ""))
            .chain(failed.iter().map(|f| (&f.stats, " (failed)")));
        for (stats, suffix) in rows {
            out.push_str(&format!(
                "| {}{suffix} | {} | {} | {} | {} | {} |\n",
                stats.category,
                stats.pages,
                stats.records,
                stats.mapped,
                stats.unmapped,
                stats.malformed
            ));
        }

        match self {
            Self::Complete {
                forward_entries,
                reverse_entries,
                backup,
                ..
            } => {
                if *backup {
                    out.push_str(&format!(
                        "\nPrevious table saved to {}\n",
                        data_dir.backup_path().display()
                    ));
                }
                out.push_str(&format!(
                    "\nWrote {forward_entries} entries to {}\nWrote {reverse_entries} entries to {}\n",
                    data_dir.forward_path().display(),
                    data_dir.reverse_path().display()
                ));
            }
            Self::Partial {
                retained, failures, ..
            } => {
                out.push_str("\nFailed categories:\n");
                for failure in failures {
                    out.push_str(&format!("- {}\n", failure.error));
                }
                out.push_str(&format!(
                    "\n{retained} mappings retained in {}; {} was not modified\n",
                    data_dir.partial_path().display(),
                    data_dir.forward_path().display()
                ));
            }
        }
        out
    }
}

/// Persists a build according to its completeness.
///
/// A complete build replaces the forward table (after an optional backup) and
/// regenerates the reverse table. An incomplete build leaves both canonical
/// tables untouched and writes everything it accumulated to the partial file.
pub async fn persist_build(
    report: BuildReport,
    data_dir: &DataDir,
    keep_backup: bool,
) -> Result<BuildOutcome, MappingError> {
    let BuildReport {
        table,
        completed,
        failures,
    } = report;

    if !failures.is_empty() {
        write_table(&data_dir.partial_path(), &table).await?;
        warn!(
            retained = table.len(),
            path = %data_dir.partial_path().display(),
            "Build incomplete; wrote partial table"
        );
        return Ok(BuildOutcome::Partial {
            retained: table.len(),
            categories: completed,
            failures: failures
                .into_iter()
                .map(|failure| FailedCategory {
                    stats: failure.stats,
                    error: failure.error.to_string(),
                })
                .collect(),
        });
    }

    let backup = if keep_backup {
        backup_existing(&data_dir.forward_path(), &data_dir.backup_path()).await?
    } else {
        false
    };
    write_table(&data_dir.forward_path(), &table).await?;
    info!(
        entries = table.len(),
        path = %data_dir.forward_path().display(),
        "Wrote forward table"
    );

    let reverse = build_reverse(&table);
    write_table(&data_dir.reverse_path(), &reverse).await?;
    info!(
        entries = reverse.len(),
        path = %data_dir.reverse_path().display(),
        "Wrote reverse table"
    );

    Ok(BuildOutcome::Complete {
        forward_entries: table.len(),
        reverse_entries: reverse.len(),
        backup,
        categories: completed,
    })
}

pub async fn run_forward(args: &BuildArgs, data_dir: &DataDir) -> anyhow::Result<String> {
    let client = MonarchClient::new()?;
    let options = args.options();
    info!(
        base = client.base(),
        categories = ?options.categories,
        page_size = options.page_size,
        concurrency = options.concurrency,
        "Starting forward build"
    );

    let report = ForwardBuilder::new(client, options).build().await;
    let outcome = persist_build(report, data_dir, !args.no_backup).await?;
    let summary = outcome.to_markdown(data_dir);
    if outcome.is_complete() {
        Ok(summary)
    } else {
        Err(anyhow::anyhow!(summary))
    }
}

/// Re-derives the reverse table from the forward table already on disk.
pub async fn run_reverse(data_dir: &DataDir) -> anyhow::Result<String> {
    let forward_path = data_dir.forward_path();
    let forward: ForwardTable = read_table(&forward_path)
        .await
        .map_err(|err| MappingError::TableLoad {
            location: forward_path.display().to_string(),
            reason: err.to_string(),
        })?;

    let reverse = build_reverse(&forward);
    write_table(&data_dir.reverse_path(), &reverse).await?;
    info!(
        entries = reverse.len(),
        path = %data_dir.reverse_path().display(),
        "Wrote reverse table"
    );

    Ok(format!(
        "Wrote {} entries to {} (from {} forward entries)\n",
        reverse.len(),
        data_dir.reverse_path().display(),
        forward.len()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::builder::{BuildOptions, CategoryFailure};
    use crate::mapping::{Category, ForwardEntry, ReverseTable};

    fn sample_report(failed: bool) -> BuildReport {
        let mut table = ForwardTable::new();
        for i in 0..100 {
            table.insert(
                format!("MONDO:{i:07}"),
                ForwardEntry {
                    external_id: format!("{}", 100_000 + i),
                    name: format!("disease {i}"),
                    category: Some(Category::Disease),
                },
            );
        }
        let stats = CategoryStats {
            category: Category::Disease,
            pages: 1,
            records: 100,
            mapped: 100,
            unmapped: 0,
            malformed: 0,
        };
        let failures = if failed {
            vec![CategoryFailure {
                stats: CategoryStats {
                    category: Category::Gene,
                    pages: 3,
                    records: 300,
                    mapped: 0,
                    unmapped: 300,
                    malformed: 0,
                },
                error: MappingError::CategoryFailed {
                    category: "gene".into(),
                    offset: 300,
                    retained: 100,
                    source: Box::new(MappingError::Api {
                        api: "monarch".into(),
                        message: "HTTP 502 Bad Gateway: upstream".into(),
                    }),
                },
            }]
        } else {
            Vec::new()
        };
        BuildReport {
            table,
            completed: vec![stats],
            failures,
        }
    }

    #[tokio::test]
    async fn complete_build_writes_both_tables_and_backup() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = DataDir::new(dir.path());
        std::fs::write(data.forward_path(), "{}").unwrap();

        let outcome = persist_build(sample_report(false), &data, true)
            .await
            .expect("persist");

        assert!(outcome.is_complete());
        assert!(data.backup_path().exists());
        let forward: ForwardTable = read_table(&data.forward_path()).await.unwrap();
        let reverse: ReverseTable = read_table(&data.reverse_path()).await.unwrap();
        assert_eq!(forward.len(), 100);
        assert_eq!(reverse.len(), 100);
        assert_eq!(
            reverse.get("100042").map(|e| e.knowledge_base_id.as_str()),
            Some("MONDO:0000042")
        );
        let summary = outcome.to_markdown(&data);
        assert!(summary.contains("Wrote 100 entries"));
        assert!(summary.contains("| disease | 1 | 100 | 100 | 0 | 0 |"));
    }

    #[tokio::test]
    async fn failed_build_keeps_canonical_tables_and_writes_partial() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = DataDir::new(dir.path());
        std::fs::write(
            data.forward_path(),
            r#"{"MONDO:0000001": {"externalId": "1", "name": "old"}}"#,
        )
        .unwrap();

        let outcome = persist_build(sample_report(true), &data, true)
            .await
            .expect("persist");

        assert!(!outcome.is_complete());
        let partial: ForwardTable = read_table(&data.partial_path()).await.unwrap();
        assert_eq!(partial.len(), 100);
        let untouched: ForwardTable = read_table(&data.forward_path()).await.unwrap();
        assert_eq!(untouched.len(), 1);
        assert!(!data.reverse_path().exists());
        assert!(!data.backup_path().exists());
        let summary = outcome.to_markdown(&data);
        assert!(summary.contains("Category 'gene' failed at offset 300"));
        assert!(summary.contains("| gene (failed) | 3 | 300 | 0 | 300 | 0 |"));
        assert!(summary.contains("100 mappings retained"));
    }

    #[tokio::test]
    async fn backup_can_be_disabled() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = DataDir::new(dir.path());
        std::fs::write(data.forward_path(), "{}").unwrap();

        persist_build(sample_report(false), &data, false)
            .await
            .expect("persist");

        assert!(!data.backup_path().exists());
    }

    #[tokio::test]
    async fn reverse_only_mode_rebuilds_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = DataDir::new(dir.path());
        write_table(&data.forward_path(), &sample_report(false).table)
            .await
            .unwrap();

        let summary = run_reverse(&data).await.expect("reverse");

        assert!(summary.contains("Wrote 100 entries"));
        let reverse: ReverseTable = read_table(&data.reverse_path()).await.unwrap();
        assert_eq!(reverse.len(), 100);
    }

    #[tokio::test]
    async fn reverse_only_mode_fails_without_forward_table() {
        let dir = tempfile::tempdir().expect("tempdir");
        let data = DataDir::new(dir.path());

        let err = run_reverse(&data).await.expect_err("missing forward table");

        assert!(err.to_string().contains("monarch-omim.json"));
        assert!(!data.reverse_path().exists());
    }

    #[tokio::test]
    async fn build_from_monarch_mock_persists_tables() {
        use wiremock::matchers::{method, path, query_param};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v3/api/search"))
            .and(query_param("category", "biolink:Disease"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "total": 3,
                "items": [
                    {"id": "MONDO:0007947", "name": "Marfan syndrome", "xref": ["OMIM:154700"]},
                    {"id": "MONDO:0007739", "name": "Huntington disease", "xref": ["OMIM:143100"]},
                    {"id": "MONDO:0000001", "name": "disease", "xref": ["DOID:4"]}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let data = DataDir::new(dir.path());
        let client = MonarchClient::new_for_test(server.uri()).expect("client");
        let options = BuildOptions::new(false, false).with_retries(0, std::time::Duration::ZERO);

        let report = ForwardBuilder::new(client, options).build().await;
        let outcome = persist_build(report, &data, true).await.expect("persist");

        let BuildOutcome::Complete {
            forward_entries,
            reverse_entries,
            ..
        } = outcome
        else {
            panic!("expected complete build");
        };
        assert_eq!((forward_entries, reverse_entries), (2, 2));
        let reverse: ReverseTable = read_table(&data.reverse_path()).await.unwrap();
        assert_eq!(
            reverse.get("143100").map(|e| e.name.as_str()),
            Some("Huntington disease")
        );
    }
}
