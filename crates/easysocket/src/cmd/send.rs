use std::fs;
use std::io::Write;
use std::net::TcpStream;

use easysocket_frame::{Datagram, DatagramWriter};
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<u8> {
    let body = resolve_body(&args)?;
    let stream = TcpStream::connect(&args.addr).map_err(|err| io_error("connect failed", err))?;
    let datagram = Datagram::new(args.kind, args.id, body);
    send_datagram(stream, &datagram)?;
    debug!(
        addr = %args.addr,
        id = datagram.id,
        kind = datagram.kind,
        size = datagram.wire_size(),
        "datagram sent"
    );
    Ok(SUCCESS)
}

fn send_datagram<T: Write>(out: T, datagram: &Datagram) -> CliResult<()> {
    let mut writer = DatagramWriter::new(out);
    writer
        .write_datagram(datagram)
        .and_then(|()| writer.flush())
        .map_err(|err| frame_error("send failed", err))
}

fn resolve_body(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use easysocket_frame::{HEADER_LEN, MVC};

    use super::*;

    fn args(data: Option<&str>) -> SendArgs {
        SendArgs {
            addr: "127.0.0.1:0".to_string(),
            kind: MVC,
            id: 9,
            data: data.map(str::to_string),
            file: None,
        }
    }

    #[test]
    fn text_body_is_used_verbatim() {
        assert_eq!(resolve_body(&args(Some("hi"))).unwrap(), b"hi");
    }

    #[test]
    fn missing_body_sends_empty_datagram() {
        assert!(resolve_body(&args(None)).unwrap().is_empty());
    }

    #[test]
    fn unreadable_file_reports_path() {
        let mut args = args(None);
        args.file = Some("/nonexistent/easysocket-body".into());
        let err = resolve_body(&args).unwrap_err();
        assert!(err.message.contains("/nonexistent/easysocket-body"));
    }

    #[test]
    fn writes_header_and_body() {
        let mut out = Vec::new();
        send_datagram(&mut out, &Datagram::new(MVC, 9, b"hi".to_vec())).unwrap();
        assert_eq!(out.len(), HEADER_LEN + 2);
        assert_eq!(&out[1..5], &2u32.to_be_bytes());
        assert_eq!(&out[8..16], &9u64.to_be_bytes());
        assert_eq!(&out[HEADER_LEN..], b"hi");
    }
}
