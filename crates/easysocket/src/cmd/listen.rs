use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use easysocket_frame::Datagram;
use easysocket_stream::ReaderBuilder;
use tracing::info;

use crate::cmd::ListenArgs;
use crate::exit::{io_error, stream_error, CliError, CliResult, SUCCESS};
use crate::output::{print_datagram, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

enum Session {
    Closed,
    Done,
}

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<u8> {
    let listener = TcpListener::bind(&args.addr).map_err(|err| io_error("bind failed", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| io_error("bind failed", err))?;
    if let Ok(local) = listener.local_addr() {
        info!(addr = %local, "listening");
    }

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(POLL_INTERVAL);
                continue;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error("accept failed", err)),
        };
        info!(peer = %peer, "peer connected");

        match serve(stream, peer, &args, format, &running, &mut printed)? {
            Session::Done => return Ok(SUCCESS),
            Session::Closed => info!(peer = %peer, "peer disconnected"),
        }
    }

    Ok(SUCCESS)
}

fn serve(
    stream: TcpStream,
    peer: SocketAddr,
    args: &ListenArgs,
    format: OutputFormat,
    running: &AtomicBool,
    printed: &mut usize,
) -> CliResult<Session> {
    stream
        .set_nonblocking(false)
        .map_err(|err| io_error("accept failed", err))?;

    let (tx, rx) = mpsc::channel::<Datagram>();
    let reader = ReaderBuilder::tcp(stream)
        .map_err(|err| io_error("accept failed", err))?
        .config(args.reader_config())
        .consumer(move |datagram| {
            let _ = tx.send(datagram);
        })
        .build()
        .map_err(|err| stream_error("reader setup failed", err))?;
    reader
        .start()
        .map_err(|err| stream_error("reader start failed", err))?;

    let mut show = |datagram: Datagram| -> bool {
        if !accepts(args.kinds.as_deref(), datagram.kind) {
            return false;
        }
        print_datagram(&datagram, peer, format);
        *printed = printed.saturating_add(1);
        args.count.is_some_and(|count| *printed >= count)
    };

    loop {
        if !running.load(Ordering::SeqCst) {
            reader.shutdown();
            reader.join();
            return Ok(Session::Done);
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(datagram) => {
                if show(datagram) {
                    reader.shutdown();
                    reader.join();
                    return Ok(Session::Done);
                }
            }
            Err(RecvTimeoutError::Timeout) if reader.is_shutdown() => {
                // Joining waits for dispatch workers, so everything decoded is queued by now.
                reader.join();
                for datagram in rx.try_iter() {
                    if show(datagram) {
                        return Ok(Session::Done);
                    }
                }
                return Ok(Session::Closed);
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return Ok(Session::Closed),
        }
    }
}

fn accepts(kinds: Option<&[u8]>, kind: u8) -> bool {
    kinds.is_none_or(|kinds| kinds.contains(&kind))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
