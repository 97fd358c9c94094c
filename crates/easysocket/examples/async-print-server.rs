//! Async variant of `print-server` built on the tokio codec adapter.
//!
//! Run with:
//!   cargo run -p easysocket --features async --example async-print-server
//!
//! In another terminal:
//!   cargo run -p easysocket --features cli -- send 127.0.0.1:7411 --data hello

use bytes::BytesMut;
use easysocket::frame::{kind_name, DatagramFrameCodec};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio_util::codec::Decoder;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:7411").await?;
    eprintln!("Listening on {}", listener.local_addr()?);

    loop {
        let (mut stream, peer) = listener.accept().await?;
        eprintln!("Peer connected: {peer}");

        tokio::spawn(async move {
            let mut codec = DatagramFrameCodec::new();
            let mut buf = BytesMut::with_capacity(1024);
            loop {
                match stream.read_buf(&mut buf).await {
                    Ok(0) => break,
                    Ok(_) => {}
                    Err(err) => {
                        eprintln!("Read from {peer} failed: {err}");
                        return;
                    }
                }
                loop {
                    match codec.decode(&mut buf) {
                        Ok(Some(datagram)) => eprintln!(
                            "Received id={} kind={} {} bytes",
                            datagram.id,
                            kind_name(datagram.kind),
                            datagram.body.len()
                        ),
                        Ok(None) => break,
                        Err(err) if err.is_fatal() => {
                            eprintln!("Dropping {peer}: {err}");
                            return;
                        }
                        Err(err) => eprintln!("Skipping frame from {peer}: {err}"),
                    }
                }
            }
            eprintln!("Peer disconnected: {peer}");
        });
    }
}
