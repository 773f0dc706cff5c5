//! provides party utilities

use super::error::Result;
use std::cell::RefCell;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// how long a party waits for a peer's message before giving up on it
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// upper bound on a single frame, far above any protocol message
const MAX_FRAME: usize = 1 << 20;

/// attempts to reach a peer that is not listening yet
const DIAL_ATTEMPTS: usize = 100;

/// one endpoint of a group of parties with a link to every other member
pub struct MultiParty {
    /// party id (0, 1, ..., size - 1)
    pub id: usize,
    size: usize,
    /// used to send and receive messages between parties
    session: RefCell<Session>,
}

impl MultiParty {
    /// connects to the peers over TCP; `peers[id]` is this party's own address
    pub fn connect(id: usize, peers: &[SocketAddr]) -> Result<Self> {
        let listener = peers
            .get(id)
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "party id outside the peer list"))
            .and_then(TcpListener::bind)?;
        Self::with_listener(id, listener, peers)
    }

    /// like [`MultiParty::connect`], accepting lower ids on an already bound `listener`
    pub fn with_listener(id: usize, listener: TcpListener, peers: &[SocketAddr]) -> Result<Self> {
        Ok(Self {
            id,
            size: peers.len(),
            session: RefCell::new(Session::connect(id, listener, peers)?),
        })
    }

    /// `size` parties of one process, linked by in-memory channels
    pub fn local_mesh(size: usize) -> Vec<Self> {
        let mut links: Vec<Vec<Option<Link>>> =
            (0..size).map(|_| (0..size).map(|_| None).collect()).collect();
        for i in 0..size {
            for j in i + 1..size {
                let (to_j, from_i) = channel();
                let (to_i, from_j) = channel();
                links[i][j] = Some(Link::Local { tx: to_j, rx: from_j });
                links[j][i] = Some(Link::Local { tx: to_i, rx: from_i });
            }
        }
        links
            .into_iter()
            .enumerate()
            .map(|(id, links)| Self {
                id,
                size,
                session: RefCell::new(Session {
                    links,
                    timeout: DEFAULT_TIMEOUT,
                }),
            })
            .collect()
    }

    /// number of parties in the group, this one included
    pub fn size(&self) -> usize {
        self.size
    }

    /// bounds every wait on a peer
    pub fn set_timeout(&self, timeout: Duration) -> Result<()> {
        self.session.borrow_mut().set_timeout(timeout)
    }

    /// send message to a party
    pub fn send(&self, id: usize, msg: &[u8]) -> Result<()> {
        self.session.borrow_mut().send(id, msg)
    }

    /// receive message from a party
    pub fn recv(&self, id: usize) -> Result<Vec<u8>> {
        self.session.borrow_mut().recv(id)
    }

    /// send message to all other parties that are still reachable
    pub fn broadcast(&self, msg: &[u8]) -> Result<()> {
        self.session.borrow_mut().broadcast(self.id, msg)
    }
}

enum Link {
    Tcp(TcpStream),
    Local {
        tx: Sender<Vec<u8>>,
        rx: Receiver<Vec<u8>>,
    },
}

/// A session is a list of links between the current peer and the others.
struct Session {
    links: Vec<Option<Link>>,
    timeout: Duration,
}

impl Session {
    /// create a Session of `peers.len()` peers over TCP.
    /// * `id` - the id of the current peer. (0, 1, 2, ..., N-1)
    /// * `listener` - bound to `peers[id]`, where peers of lower ids dial in.
    /// * `peers` - the addresses of the peers. Note that the address of peer `id` is in `peers[id]`.
    fn connect(id: usize, listener: TcpListener, peers: &[SocketAddr]) -> Result<Self> {
        let size = peers.len();
        if id >= size {
            Err(io::Error::new(ErrorKind::InvalidInput, "party id outside the peer list"))?;
        }
        let links: Mutex<Vec<Option<Link>>> = Mutex::new((0..size).map(|_| None).collect());
        thread::scope(|scope| -> Result<()> {
            let links = &links;
            let mut threads = vec![];
            // accept peers of lower ids
            threads.push(scope.spawn(move || -> Result<()> {
                let mut slots = id;
                while slots > 0 {
                    let (mut socket, _) = listener.accept()?;
                    // peers announce who they are; ids are taken on trust
                    let mut buf = [0u8; 8];
                    socket.read_exact(&mut buf)?;
                    let peer = u64::from_le_bytes(buf) as usize;
                    let mut guard = links.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    let success = peer < id && guard[peer].is_none();
                    socket.write_all(&(success as u64).to_le_bytes())?;
                    if success {
                        socket.set_nodelay(true)?;
                        guard[peer] = Some(Link::Tcp(socket));
                        slots -= 1;
                        debug!("party {} accepted peer {}", id, peer);
                    }
                }
                Ok(())
            }));

            // dial peers of higher ids
            for peer in id + 1..size {
                threads.push(scope.spawn(move || -> Result<()> {
                    let mut socket = dial(peers[peer])?;
                    socket.write_all(&(id as u64).to_le_bytes())?;
                    let mut buf = [0u8; 8];
                    socket.read_exact(&mut buf)?;
                    if u64::from_le_bytes(buf) == 0 {
                        Err(io::Error::new(ErrorKind::ConnectionRefused, "peer rejected handshake"))?;
                    }
                    socket.set_nodelay(true)?;
                    links.lock().unwrap_or_else(|poisoned| poisoned.into_inner())[peer] =
                        Some(Link::Tcp(socket));
                    debug!("party {} connected to peer {}", id, peer);
                    Ok(())
                }));
            }
            for thread in threads {
                thread
                    .join()
                    .map_err(|_| io::Error::new(ErrorKind::Other, "connection thread panicked"))??;
            }
            Ok(())
        })?;
        let mut session = Self {
            links: links.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner()),
            timeout: DEFAULT_TIMEOUT,
        };
        session.set_timeout(DEFAULT_TIMEOUT)?;
        Ok(session)
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.timeout = timeout;
        for link in self.links.iter().flatten() {
            if let Link::Tcp(socket) = link {
                socket.set_read_timeout(Some(timeout))?;
            }
        }
        Ok(())
    }

    fn link(&mut self, id: usize) -> io::Result<&mut Link> {
        self.links
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or_else(|| io::Error::new(ErrorKind::NotConnected, "no link to peer"))
    }

    /// send `data` to peer `id` as one frame
    fn send(&mut self, id: usize, data: &[u8]) -> Result<()> {
        match self.link(id)? {
            Link::Tcp(socket) => {
                socket.write_all(&(data.len() as u32).to_le_bytes())?;
                socket.write_all(data)?;
            }
            Link::Local { tx, .. } => tx
                .send(data.to_vec())
                .map_err(|_| io::Error::from(ErrorKind::BrokenPipe))?,
        }
        Ok(())
    }

    /// receive one frame from peer `id`
    fn recv(&mut self, id: usize) -> Result<Vec<u8>> {
        let timeout = self.timeout;
        match self.link(id)? {
            Link::Tcp(socket) => {
                let mut len = [0u8; 4];
                socket.read_exact(&mut len)?;
                let len = u32::from_le_bytes(len) as usize;
                if len > MAX_FRAME {
                    Err(io::Error::new(ErrorKind::InvalidData, "oversized frame"))?;
                }
                let mut buf = vec![0; len];
                socket.read_exact(&mut buf)?;
                Ok(buf)
            }
            Link::Local { rx, .. } => rx.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => io::Error::from(ErrorKind::TimedOut).into(),
                RecvTimeoutError::Disconnected => io::Error::from(ErrorKind::ConnectionAborted).into(),
            }),
        }
    }

    /// send `data` to all peers but `me`, skipping the ones that are gone
    fn broadcast(&mut self, me: usize, data: &[u8]) -> Result<()> {
        for id in (0..self.links.len()).filter(|&id| id != me) {
            if let Err(err) = self.send(id, data) {
                warn!("party {} cannot reach peer {}: {}", me, id, err);
            }
        }
        Ok(())
    }
}

fn dial(address: SocketAddr) -> io::Result<TcpStream> {
    let mut attempt = 0;
    loop {
        match TcpStream::connect(address) {
            Ok(stream) => return Ok(stream),
            Err(err) if attempt + 1 >= DIAL_ATTEMPTS => return Err(err),
            Err(_) => {
                attempt += 1;
                thread::sleep(Duration::from_millis(20));
            }
        }
    }
}

#[test]
fn test_local_mesh() {
    let parties = MultiParty::local_mesh(3);
    parties[0].broadcast(b"hello").unwrap();
    assert_eq!(parties[1].recv(0).unwrap(), b"hello");
    assert_eq!(parties[2].recv(0).unwrap(), b"hello");
    parties[2].send(1, b"ack").unwrap();
    assert_eq!(parties[1].recv(2).unwrap(), b"ack");
    assert!(parties[0].recv(0).is_err());

    let mut parties = parties;
    let gone = parties.pop();
    drop(gone);
    assert_eq!(
        parties[0].recv(2),
        Err(crate::protocol::error::Error::IOError(ErrorKind::ConnectionAborted))
    );
    // broadcasting past a departed peer still reaches the rest
    parties[0].broadcast(b"still here").unwrap();
    assert_eq!(parties[1].recv(0).unwrap(), b"still here");
}

#[test]
fn test_tcp_session() {
    // ports picked by the OS
    let listeners: Vec<_> = (0..3)
        .map(|_| TcpListener::bind(("127.0.0.1", 0)).unwrap())
        .collect();
    let peers: Vec<_> = listeners
        .iter()
        .map(|listener| listener.local_addr().unwrap())
        .collect();

    let received = thread::scope(|scope| {
        let handles: Vec<_> = listeners
            .into_iter()
            .enumerate()
            .map(|(id, listener)| {
                let peers = &peers;
                scope.spawn(move || {
                    let party = MultiParty::with_listener(id, listener, peers).unwrap();
                    party.broadcast(&[id as u8; 4]).unwrap();
                    (0..3)
                        .filter(|&peer| peer != id)
                        .map(|peer| party.recv(peer).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect::<Vec<_>>()
    });
    assert_eq!(received[0], vec![vec![1u8; 4], vec![2u8; 4]]);
    assert_eq!(received[1], vec![vec![0u8; 4], vec![2u8; 4]]);
    assert_eq!(received[2], vec![vec![0u8; 4], vec![1u8; 4]]);
    assert_eq!(
        MultiParty::connect(3, &peers).err(),
        Some(crate::protocol::error::Error::IOError(ErrorKind::InvalidInput))
    );
}
