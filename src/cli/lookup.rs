use std::time::Duration;

use clap::Args;
use tracing::info;

use crate::lookup::{LoadReport, LookupService, TableLocation};
use crate::mapping::store::DataDir;

#[derive(Args, Debug, Clone)]
pub struct LookupArgs {
    /// Identifiers to translate (MONDO:/HGNC:/HP: IDs, or OMIM numbers with --omim)
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Treat the identifiers as OMIM numbers (with or without the OMIM: prefix)
    #[arg(long)]
    pub omim: bool,

    /// Print only the display name
    #[arg(long)]
    pub name: bool,

    /// Emit JSON instead of a markdown table
    #[arg(long)]
    pub json: bool,

    /// Forward table path or URL (default: <data-dir>/monarch-omim.json)
    #[arg(long)]
    pub forward_table: Option<String>,

    /// Reverse table path or URL (default: <data-dir>/omim-monarch.json)
    #[arg(long)]
    pub reverse_table: Option<String>,

    /// Give up loading a table after this many seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct LookupRow {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knowledge_base_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl LookupRow {
    pub fn is_match(&self) -> bool {
        self.name.is_some()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
struct LookupOutput<'a> {
    load: &'a LoadReport,
    results: &'a [LookupRow],
}

pub fn translate(svc: &LookupService, ids: &[String], omim: bool) -> Vec<LookupRow> {
    ids.iter()
        .map(|query| {
            if omim {
                let hit = svc.external_to_knowledge_base(query.as_str());
                LookupRow {
                    query: query.clone(),
                    knowledge_base_id: hit.map(|e| e.knowledge_base_id.clone()),
                    external_id: hit.and_then(|_| {
                        crate::mapping::normalize::normalize_external_id(query)
                    }),
                    name: hit.map(|e| e.name.clone()),
                }
            } else {
                let hit = svc.knowledge_base_to_external(query.as_str());
                LookupRow {
                    query: query.clone(),
                    knowledge_base_id: hit.and_then(|_| {
                        crate::mapping::normalize::normalize_knowledge_base_id(query)
                    }),
                    external_id: hit.map(|e| e.external_id.clone()),
                    name: hit.map(|e| e.name.clone()),
                }
            }
        })
        .collect()
}

fn render_markdown(rows: &[LookupRow], name_only: bool) -> String {
    if name_only {
        return rows
            .iter()
            .map(|row| format!("{}\n", row.name.as_deref().unwrap_or("-")))
            .collect();
    }

    let mut out = String::new();
    out.push_str("| Query | Monarch | OMIM | Name |\n");
    out.push_str("|-------|---------|------|------|\n");
    for row in rows {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            row.query,
            row.knowledge_base_id.as_deref().unwrap_or("-"),
            row.external_id.as_deref().unwrap_or("-"),
            row.name.as_deref().unwrap_or("no match"),
        ));
    }
    let matched = rows.iter().filter(|r| r.is_match()).count();
    out.push_str(&format!("\n{matched}/{} matched\n", rows.len()));
    out
}

pub async fn run(args: LookupArgs, data_dir: &DataDir) -> anyhow::Result<String> {
    let forward = args
        .forward_table
        .as_deref()
        .map(TableLocation::parse)
        .unwrap_or_else(|| TableLocation::Path(data_dir.forward_path()));
    let reverse = args
        .reverse_table
        .as_deref()
        .map(TableLocation::parse)
        .unwrap_or_else(|| TableLocation::Path(data_dir.reverse_path()));

    let (svc, report) = LookupService::load(
        &forward,
        &reverse,
        Some(Duration::from_secs(args.timeout_secs.max(1))),
    )
    .await;
    info!(
        forward = svc.forward_len(),
        reverse = svc.reverse_len(),
        ready = report.is_ready(),
        "Lookup tables loaded"
    );
    let rows = translate(&svc, &args.ids, args.omim);

    if args.json {
        return Ok(serde_json::to_string_pretty(&LookupOutput {
            load: &report,
            results: &rows,
        })?);
    }
    Ok(render_markdown(&rows, args.name))
}
