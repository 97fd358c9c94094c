use std::io::{IsTerminal, Write};
use std::net::SocketAddr;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use easysocket_frame::{is_user, kind_name, Datagram};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct DatagramOutput<'a> {
    id: u64,
    kind: u8,
    kind_name: &'a str,
    user_kind: bool,
    version: u8,
    charset: u8,
    body_size: usize,
    body: String,
    peer: String,
}

pub fn print_datagram(datagram: &Datagram, peer: SocketAddr, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = DatagramOutput {
                id: datagram.id,
                kind: datagram.kind,
                kind_name: kind_name(datagram.kind),
                user_kind: is_user(datagram.kind),
                version: datagram.version,
                charset: datagram.charset,
                body_size: datagram.body.len(),
                body: body_preview(datagram),
                peer: peer.to_string(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ID", "KIND", "SIZE", "PEER", "BODY"])
                .add_row(vec![
                    datagram.id.to_string(),
                    kind_name(datagram.kind).to_string(),
                    datagram.body.len().to_string(),
                    peer.to_string(),
                    body_preview(datagram),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "id={} kind={} ({}) size={} peer={} body={}",
                datagram.id,
                datagram.kind,
                kind_name(datagram.kind),
                datagram.body.len(),
                peer,
                body_preview(datagram)
            );
        }
        OutputFormat::Raw => {
            print_raw(datagram.body.as_ref());
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn body_preview(datagram: &Datagram) -> String {
    match datagram.body_str() {
        Some(text) => text.to_string(),
        None => format!("<binary {} bytes>", datagram.body.len()),
    }
}
