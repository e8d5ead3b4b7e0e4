//! Connection plumbing: the accept loop and the per-connection tasks.

use crate::lines;
use crate::message::Message;
use crate::state::State;
use std::net::SocketAddr;
use std::process;
use tokio::{io, net, sync, time};

// How long a quit client may keep reading before the connection is dropped,
// in milliseconds.
const READ_TIMEOUT: u64 = 5_000;

/// Returns a future that listens, accepts and handles incoming plain-text
/// connections.
pub async fn listen(addr: SocketAddr, shared: State) -> io::Result<()> {
    let ln = net::TcpListener::bind(&addr).await.unwrap_or_else(|err| {
        log::error!("Failed to listen to {}: {}", addr, err);
        process::exit(1);
    });

    log::info!("Listening on {} for plain-text connections...", addr);

    loop {
        match ln.accept().await {
            Ok((conn, peer_addr)) => { tokio::spawn(handle(conn, peer_addr, shared.clone())); }
            Err(err) => { log::warn!("Failed to accept connection: {}", err); }
        }
    }
}

/// Returns a future that handles one client connection.
///
/// The reader half feeds parsed messages to the shared state; the writer half
/// drains the client's message queue.  The state never touches the socket
/// itself.
async fn handle(conn: net::TcpStream, peer_addr: SocketAddr, shared: State) {
    let (reader, mut writer) = io::split(conn);
    let mut reader = io::BufReader::new(reader);
    let (msg_queue, mut outgoing_msgs) = sync::mpsc::unbounded_channel();
    let id = shared.peer_joined(peer_addr.ip().to_string(), msg_queue).await;

    let incoming = async {
        use io::AsyncBufReadExt as _;

        let mut buf = String::new();
        loop {
            buf.clear();
            reader.read_line(&mut buf).await?;
            if buf.is_empty() {
                return Err(io::Error::new(io::ErrorKind::UnexpectedEof, lines::CONNECTION_RESET));
            }
            log::trace!("{} >> {}", peer_addr, buf.trim());
            if let Some(msg) = Message::parse(&buf) {
                shared.handle_message(id, msg).await;
            }
        }
    };

    let outgoing = async {
        use io::AsyncWriteExt as _;

        while let Some(msg) = outgoing_msgs.recv().await {
            writer.write_all(msg.as_ref()).await?;
        }
        // The client is not in the shared state anymore.  Let it read the
        // final ERROR line, then drop the connection.
        time::sleep(time::Duration::from_millis(READ_TIMEOUT)).await;
        Err(io::ErrorKind::TimedOut.into())
    };

    let res: io::Result<((), ())> = futures::future::try_join(incoming, outgoing).await;
    shared.peer_quit(id, res.err()).await;
}
