mod cmd;
mod exit;
mod logging;
mod output;

use std::process::ExitCode;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogArgs};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "easysocket",
    version,
    about = "Send and receive length-prefixed datagrams over TCP"
)]
struct Cli {
    /// Output format. Default: table on a terminal, json otherwise.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    #[command(flatten)]
    log: LogArgs,

    #[command(subcommand)]
    command: Command,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let code = match cmd::run(cli.command, format) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            err.code
        }
    };
    ExitCode::from(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("easysocket").chain(args.iter().copied()))
            .expect("args should parse")
    }

    #[test]
    fn send_takes_kind_id_and_text() {
        let cli = parse(&[
            "send",
            "127.0.0.1:7410",
            "--kind",
            "16",
            "--id",
            "7",
            "--data",
            "hi",
        ]);
        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!((args.kind, args.id), (16, 7));
        assert_eq!(args.data.as_deref(), Some("hi"));
    }

    #[test]
    fn send_rejects_text_and_file_together() {
        let err = Cli::try_parse_from([
            "easysocket",
            "send",
            "127.0.0.1:7410",
            "--file",
            "body.bin",
            "--data",
            "hello",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = parse(&[
            "listen",
            "127.0.0.1:0",
            "--kinds",
            "1,16",
            "--count",
            "3",
            "--format",
            "json",
            "--log-level",
            "debug",
        ]);

        assert!(matches!(cli.format, Some(OutputFormat::Json)));
        assert!(matches!(cli.log.log_level, logging::LogLevel::Debug));
        let Command::Listen(args) = cli.command else {
            panic!("expected listen");
        };
        assert_eq!(args.kinds, Some(vec![1, 16]));
        assert_eq!(args.count, Some(3));
        assert_eq!(args.reader_config().pool_size, 1);
    }
}
