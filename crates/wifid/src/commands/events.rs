//! `wifid events`: stream unsolicited control-socket events.

use tokio::sync::broadcast::error::RecvError;
use wifid_ctrl::{CtrlEvent, CtrlEventKind};

use crate::cli::{EventsArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util::connect;

fn format_event(event: &CtrlEvent, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => output::render_json(event, true),
        OutputFormat::Plain => Ok(event.name.clone()),
        OutputFormat::Table => {
            let mut line = format!("<{}>{}", event.level, event.name);
            for arg in &event.args {
                line.push(' ');
                line.push_str(arg);
            }
            Ok(match &event.ifname {
                Some(ifname) => format!("{ifname}: {line}"),
                None => line,
            })
        }
    }
}

pub async fn handle(args: EventsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut client = connect(global, &args.iface).await?;
    let mut rx = client.subscribe();
    tracing::info!(iface = %args.iface, "listening for events");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut seen = 0usize;
    let result = loop {
        let event = tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            received = rx.recv() => match received {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event receiver lagged");
                    continue;
                }
                Err(RecvError::Closed) => break Ok(()),
            },
        };

        if args
            .filter
            .as_deref()
            .is_some_and(|prefix| !event.name.starts_with(prefix))
        {
            continue;
        }

        match format_event(&event, global.output) {
            Ok(line) => output::print_output(&line, global.quiet),
            Err(e) => break Err(e),
        }
        seen += 1;

        if event.kind == CtrlEventKind::Terminating {
            tracing::info!(iface = %args.iface, "daemon terminating");
            break Ok(());
        }
        if args.count.is_some_and(|limit| seen >= limit) {
            break Ok(());
        }
    };

    client.close().await;
    result
}
