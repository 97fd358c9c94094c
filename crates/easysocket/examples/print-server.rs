//! Accepts one TCP connection and prints every datagram it receives.
//!
//! Run with:
//!   cargo run -p easysocket --example print-server
//!
//! In another terminal:
//!   cargo run -p easysocket --features cli -- send 127.0.0.1:7410 --data hello

use std::net::TcpListener;

use easysocket::frame::Datagram;
use easysocket::stream::ReaderBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:7410")?;
    eprintln!("Listening on {}", listener.local_addr()?);

    let (stream, peer) = listener.accept()?;
    eprintln!("Peer connected: {peer}");

    let reader = ReaderBuilder::tcp(stream)?
        .consumer(|datagram: Datagram| {
            eprintln!(
                "Received id={} kind={} {} bytes",
                datagram.id,
                datagram.kind,
                datagram.body.len()
            );
        })
        .build()?;
    reader.start()?;
    reader.join();

    eprintln!("Peer disconnected");
    Ok(())
}
