//! `wifid classify`: which action does a config change need?

use serde::Serialize;
use tabled::Tabled;
use wifid_core::Action;
use wifid_core::conf::classify::action_for;
use wifid_core::conf::{ParamChange, classify, diff};

use crate::cli::{ClassifyArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util::{SectionArg, load_store, require_section};

#[derive(Debug, Serialize)]
struct SectionReport {
    section: String,
    action: Action,
    changes: Vec<ParamChange>,
}

#[derive(Debug, Serialize)]
struct ClassifyReport {
    action: Action,
    sections: Vec<SectionReport>,
}

#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Section")]
    section: String,
    #[tabled(rename = "Parameter")]
    param: String,
    #[tabled(rename = "Old")]
    old: String,
    #[tabled(rename = "New")]
    new: String,
    #[tabled(rename = "Action")]
    action: String,
}

fn or_dash(value: Option<&String>) -> String {
    value.map_or_else(|| "-".into(), Clone::clone)
}

pub fn handle(args: &ClassifyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let old = load_store(&args.old)?;
    let new = load_store(&args.new)?;
    let enabled = !args.disabled;

    let sections = match &args.section {
        Some(raw) => {
            let section = SectionArg::parse(Some(raw));
            if old.section(section.key()).is_none() {
                require_section(&new, &section)?;
            }
            vec![section]
        }
        None => SectionArg::all_of(&old, &new),
    };

    let reports: Vec<SectionReport> = sections
        .iter()
        .filter_map(|section| {
            let changes = diff(&old, &new, section.key());
            if changes.is_empty() {
                return None;
            }
            Some(SectionReport {
                section: section.to_string(),
                action: classify(&changes, enabled),
                changes,
            })
        })
        .collect();

    let report = ClassifyReport {
        action: reports.iter().map(|r| r.action).max().unwrap_or_default(),
        sections: reports,
    };
    tracing::debug!(action = %report.action, sections = report.sections.len(), "classified");

    let color = output::should_color(global.color);
    let rendered = match global.output {
        OutputFormat::Table => {
            let rows: Vec<ChangeRow> = report
                .sections
                .iter()
                .flat_map(|s| {
                    s.changes.iter().map(|c| ChangeRow {
                        section: s.section.clone(),
                        param: c.name.clone(),
                        old: or_dash(c.old.as_ref()),
                        new: or_dash(c.new.as_ref()),
                        action: output::paint_action(action_for(&c.name), color),
                    })
                })
                .collect();
            let summary = format!("action: {}", output::paint_action(report.action, color));
            if rows.is_empty() {
                summary
            } else {
                format!("{}\n{summary}", output::render_table(&rows))
            }
        }
        OutputFormat::Plain => report.action.to_string(),
        format => output::render_single(format, &report, |_| String::new(), |r| r.action.to_string())?,
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}
