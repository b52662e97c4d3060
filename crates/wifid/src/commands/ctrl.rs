//! `wifid ctrl` / `wifid ctrl-status`: raw and typed control-socket access.

use tabled::Tabled;
use wifid_ctrl::StatusReply;
use wifid_ctrl::command::{REPLY_FAIL, REPLY_UNKNOWN};

use crate::cli::{CtrlArgs, CtrlStatusArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util::connect;

pub async fn handle(args: CtrlArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let command = args.command.join(" ");
    let mut client = connect(global, &args.iface).await?;
    let result = client.request(&command).await;
    client.close().await;

    let reply = result?;
    let trimmed = reply.trim_end();
    if trimmed == REPLY_FAIL || trimmed == REPLY_UNKNOWN {
        return Err(CliError::Rejected {
            command,
            reply: trimmed.into(),
        });
    }
    output::print_output(trimmed, global.quiet);
    Ok(())
}

#[derive(Tabled)]
struct BssRow {
    #[tabled(rename = "BSS")]
    ifname: String,
    #[tabled(rename = "BSSID")]
    bssid: String,
    #[tabled(rename = "SSID")]
    ssid: String,
    #[tabled(rename = "Stations")]
    num_sta: String,
}

fn opt<T: ToString>(value: Option<&T>) -> String {
    value.map_or_else(|| "-".into(), ToString::to_string)
}

fn detail(status: &StatusReply) -> String {
    let mut pairs = vec![
        ("state", status.state.clone()),
        ("channel", opt(status.channel.as_ref())),
        ("freq", opt(status.freq.as_ref())),
    ];
    if status.is_dfs() {
        pairs.push(("cac_left_s", opt(status.cac_time_left_seconds.as_ref())));
    }
    let mut out = output::detail_table(&pairs);
    if !status.bss.is_empty() {
        let rows: Vec<BssRow> = status
            .bss
            .iter()
            .map(|b| BssRow {
                ifname: b.ifname.clone(),
                bssid: opt(b.bssid.as_ref()),
                ssid: opt(b.ssid.as_ref()),
                num_sta: opt(b.num_sta.as_ref()),
            })
            .collect();
        out.push('\n');
        out.push_str(&output::render_table(&rows));
    }
    out
}

pub async fn status(args: CtrlStatusArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut client = connect(global, &args.iface).await?;
    let result = client.status().await;
    client.close().await;
    let status = result?;

    let rendered = match global.output {
        OutputFormat::Plain => status.state.clone(),
        format => output::render_single(format, &status, detail, |s| s.state.clone())?,
    };
    output::print_output(&rendered, global.quiet);
    Ok(())
}
