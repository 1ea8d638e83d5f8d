//! The single-threaded event loop (§4.8, §9 "single-threaded reactor"):
//! one `mio::Poll` instance multiplexes the listening socket and every
//! connected client, dispatching each client's commands against one
//! shared [`Db`] with no locking — mirroring the source's single
//! command-processing thread without needing one.

use std::{
    collections::HashMap,
    io,
    net::SocketAddr,
    time::Duration,
};

use mio::{net::TcpListener, Events, Interest, Poll, Token};
use tracing::{debug, info, warn};

use crate::{
    command,
    database::Db,
    network::connection::{Connection, ReadOutcome},
};

const LISTENER: Token = Token(0);
/// How often the maintenance tick (expiry sweep + incremental rehash)
/// runs, regardless of I/O activity (§4.7, §4.8 "server_cron").
const MAINTENANCE_INTERVAL: Duration = Duration::from_millis(100);

pub struct ServerOptions {
    pub listen_address: SocketAddr,
    pub max_connections: usize,
}

/// Runs the event loop until the process is killed. `db` is moved in and
/// lives for the lifetime of the server — there is no second thread to
/// share it with.
pub fn run(
    opts: ServerOptions,
    mut db: Db,
) -> io::Result<()> {
    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(1024);

    let mut listener = TcpListener::bind(opts.listen_address)?;
    poll.registry()
        .register(&mut listener, LISTENER, Interest::READABLE)?;

    info!(address = %opts.listen_address, "vellum listening");

    let mut connections: HashMap<Token, Connection> = HashMap::new();
    let mut next_token = 1usize;

    loop {
        match poll.poll(&mut events, Some(MAINTENANCE_INTERVAL)) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }

        for event in events.iter() {
            match event.token() {
                LISTENER => {
                    accept_loop(
                        &listener,
                        &poll,
                        &mut connections,
                        &mut next_token,
                        opts.max_connections,
                    )?;
                }
                token => {
                    let should_close = service_client(token, &mut connections, &mut db);
                    if should_close {
                        if let Some(mut conn) = connections.remove(&token) {
                            let _ = poll.registry().deregister(&mut conn.stream);
                        }
                    }
                }
            }
        }

        db.run_maintenance_tick();
    }
}

fn accept_loop(
    listener: &TcpListener,
    poll: &Poll,
    connections: &mut HashMap<Token, Connection>,
    next_token: &mut usize,
    max_connections: usize,
) -> io::Result<()> {
    loop {
        match listener.accept() {
            Ok((mut stream, peer)) => {
                if connections.len() >= max_connections {
                    debug!(%peer, "refusing connection: at capacity");
                    drop(stream);
                    continue;
                }
                let token = Token(*next_token);
                *next_token += 1;
                poll.registry().register(
                    &mut stream,
                    token,
                    Interest::READABLE | Interest::WRITABLE,
                )?;
                debug!(%peer, ?token, "accepted connection");
                connections.insert(token, Connection::new(stream));
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Services one readiness event for `token`. Returns `true` if the
/// connection should be torn down.
fn service_client(
    token: Token,
    connections: &mut HashMap<Token, Connection>,
    db: &mut Db,
) -> bool {
    let Some(conn) = connections.get_mut(&token) else {
        return false;
    };

    match conn.read_commands() {
        ReadOutcome::Commands(cmds) => {
            for args in cmds {
                let reply = command::dispatch(db, &args);
                conn.queue_reply(&reply);
            }
        }
        ReadOutcome::NoCommands => {}
        ReadOutcome::Closed => return true,
        ReadOutcome::ProtocolError(e) => {
            warn!(?token, error = %e, "closing connection on protocol error");
            return true;
        }
    }

    match conn.flush() {
        Ok(_) => false,
        Err(_) => true,
    }
}
