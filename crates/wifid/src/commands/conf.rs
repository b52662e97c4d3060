//! `wifid conf`: inspect and edit hostapd-style config files.

use std::path::Path;

use serde::Serialize;
use tabled::Tabled;
use wifid_core::Action;
use wifid_core::conf::{classify, diff};

use crate::cli::{ConfArgs, ConfCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util::{SectionArg, load_store, require_section};

#[derive(Debug, Serialize)]
struct Param {
    section: String,
    key: String,
    value: String,
}

#[derive(Tabled)]
struct ParamRow {
    #[tabled(rename = "Section")]
    section: String,
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Outcome of a `set` / `unset`.
#[derive(Debug, Serialize)]
struct Edit {
    section: String,
    key: String,
    old: Option<String>,
    new: Option<String>,
    action: Action,
}

fn missing_param(file: &Path, section: &SectionArg, key: &str) -> CliError {
    CliError::NotFound {
        resource_type: "parameter".into(),
        identifier: format!("{section}.{key}"),
        hint: format!("Run: wifid conf show {}", file.display()),
    }
}

pub fn handle(args: ConfArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfCommand::Show { file, section } => show(&file, section.as_deref(), global),
        ConfCommand::Get { file, key, section } => {
            let store = load_store(&file)?;
            let section = SectionArg::parse(section.as_deref());
            require_section(&store, &section)?;
            let value = store
                .get(section.key(), &key)
                .ok_or_else(|| missing_param(&file, &section, &key))?;
            output::print_output(value, global.quiet);
            Ok(())
        }
        ConfCommand::Set {
            file,
            key,
            value,
            section,
        } => edit(&file, section.as_deref(), &key, Some(&value), global),
        ConfCommand::Unset { file, key, section } => edit(&file, section.as_deref(), &key, None, global),
    }
}

fn show(file: &Path, section: Option<&str>, global: &GlobalOpts) -> Result<(), CliError> {
    let store = load_store(file)?;
    let only = section.map(|raw| SectionArg::parse(Some(raw)));
    if let Some(only) = &only {
        require_section(&store, only)?;
    }
    let selected = only.as_ref().and_then(|s| store.section(s.key()));

    let params: Vec<Param> = store
        .sections()
        .iter()
        .filter(|s| selected.is_none_or(|sel| sel == *s))
        .flat_map(|s| {
            let name = s.name.clone().unwrap_or_else(|| "header".into());
            s.params.iter().map(move |(key, value)| Param {
                section: name.clone(),
                key: key.clone(),
                value: value.clone(),
            })
        })
        .collect();

    let rendered = output::render_list(
        global.output,
        &params,
        |p| ParamRow {
            section: p.section.clone(),
            key: p.key.clone(),
            value: p.value.clone(),
        },
        |p| format!("{}={}", p.key, p.value),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn edit(file: &Path, section: Option<&str>, key: &str, value: Option<&str>, global: &GlobalOpts) -> Result<(), CliError> {
    let old = load_store(file)?;
    let section = SectionArg::parse(section);
    require_section(&old, &section)?;

    let mut new = old.clone();
    let previous = match value {
        Some(v) => new.set(section.key(), key, v)?,
        None => Some(
            new.remove(section.key(), key)
                .ok_or_else(|| missing_param(file, &section, key))?,
        ),
    };

    let changes = diff(&old, &new, section.key());
    if !changes.is_empty() {
        new.write(file)?;
    }
    let edit = Edit {
        section: section.to_string(),
        key: key.to_owned(),
        old: previous,
        new: value.map(str::to_owned),
        action: classify(&changes, true),
    };
    tracing::debug!(file = %file.display(), key, action = %edit.action, "config edited");

    let color = output::should_color(global.color);
    let rendered = match global.output {
        OutputFormat::Plain => edit.action.to_string(),
        format => output::render_single(
            format,
            &edit,
            |e| {
                format!(
                    "{}.{}: {} -> {}\naction: {}",
                    e.section,
                    e.key,
                    e.old.as_deref().unwrap_or("-"),
                    e.new.as_deref().unwrap_or("-"),
                    output::paint_action(e.action, color)
                )
            },
            |e| e.action.to_string(),
        )?,
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}
