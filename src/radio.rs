use log::{debug, info, warn};
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tungstenite::http::StatusCode;
use tungstenite::{accept_hdr, Message};

use crate::error::Result;

pub const MAX_TRANSMIT_POWER: u8 = 7;
const SUBSCRIBER_QUEUE: usize = 16;
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);
const FRAME_WAIT: Duration = Duration::from_millis(20);
const CLOSE_POLL: Duration = Duration::from_millis(1);

/// Broadcast transport for text frames.
///
/// Sending is fire-and-forget: there is no acknowledgment and nothing is
/// reported back to the caller.
pub trait Radio {
    fn set_group(&mut self, group: u8);
    fn set_transmit_power(&mut self, power: u8);
    fn send_text(&mut self, text: &str);
}

struct Subscriber {
    group: u8,
    peer: SocketAddr,
    tx: SyncSender<String>,
}

type Subscribers = Arc<Mutex<Vec<Subscriber>>>;

/// Radio over WebSocket: receivers connect to `ws://<host>:<port>/<group>`
/// and get every frame sent while that group is selected.
pub struct WebSocketRadio {
    group: u8,
    power: u8,
    local_addr: SocketAddr,
    subscribers: Subscribers,
}

impl WebSocketRadio {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let server = TcpListener::bind(addr)?;
        let local_addr = server.local_addr()?;
        info!("Radio listening on ws://{}/<group>", local_addr);

        let subscribers: Subscribers = Arc::new(Mutex::new(Vec::new()));
        let subscribers_clone = Arc::clone(&subscribers);
        thread::spawn(move || {
            accept_thread(server, subscribers_clone);
        });

        Ok(WebSocketRadio {
            group: 0,
            power: MAX_TRANSMIT_POWER,
            local_addr,
            subscribers,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn transmit_power(&self) -> u8 {
        self.power
    }

    /// Receivers currently listening on `group`.
    pub fn subscriber_count(&self, group: u8) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.group == group)
            .count()
    }
}

impl Radio for WebSocketRadio {
    fn set_group(&mut self, group: u8) {
        info!("Radio group {} => {}", self.group, group);
        self.group = group;
    }

    fn set_transmit_power(&mut self, power: u8) {
        self.power = power.min(MAX_TRANSMIT_POWER);
        info!("Radio transmit power {}", self.power);
    }

    fn send_text(&mut self, text: &str) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        let group = self.group;

        subscribers.retain(|s| {
            if s.group != group {
                return true;
            }
            match s.tx.try_send(text.to_string()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    debug!("Receiver {} is behind, frame dropped", s.peer);
                    true
                }
                Err(TrySendError::Disconnected(_)) => {
                    info!("Receiver {} left group {}", s.peer, s.group);
                    false
                }
            }
        });
    }
}

/// `/7` selects group 7. Group 0 and anything that is not a plain number
/// are refused.
pub fn parse_group_path(path: &str) -> Option<u8> {
    let group = path.strip_prefix('/')?.trim_end_matches('/');
    if group.is_empty() || !group.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match group.parse::<u8>() {
        Ok(0) | Err(_) => None,
        Ok(g) => Some(g),
    }
}

fn accept_thread(server: TcpListener, subscribers: Subscribers) {
    for stream in server.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                warn!("Connection error: {}", e);
                continue;
            }
        };

        let subscribers = Arc::clone(&subscribers);
        thread::spawn(move || {
            subscriber_thread(stream, subscribers);
        });
    }
}

fn subscriber_thread(stream: TcpStream, subscribers: Subscribers) {
    let peer = match stream.peer_addr() {
        Ok(p) => p,
        Err(e) => {
            warn!("Connection error: {}", e);
            return;
        }
    };
    if let Err(e) = stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT)) {
        warn!("Connection error from {}: {}", peer, e);
        return;
    }

    let mut group = None;
    let mut websocket = match accept_hdr(stream, |req: &Request, response: Response| {
        match parse_group_path(req.uri().path()) {
            Some(g) => {
                group = Some(g);
                Ok(response)
            }
            None => {
                let mut refusal = ErrorResponse::new(Some(format!(
                    "no radio group at {}",
                    req.uri().path()
                )));
                *refusal.status_mut() = StatusCode::NOT_FOUND;
                Err(refusal)
            }
        }
    }) {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error from {}: {}", peer, e);
            return;
        }
    };
    let Some(group) = group else {
        return;
    };

    if let Err(e) = websocket.get_ref().set_read_timeout(Some(CLOSE_POLL)) {
        warn!("Connection error from {}: {}", peer, e);
        return;
    }

    let (tx, rx): (SyncSender<String>, Receiver<String>) = mpsc::sync_channel(SUBSCRIBER_QUEUE);
    subscribers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(Subscriber { group, peer, tx });
    info!("Receiver {} joined group {}", peer, group);

    // Frames for the current group go out as they arrive; between them the
    // socket is checked so a receiver that left is seen whatever its group.
    loop {
        match rx.recv_timeout(FRAME_WAIT) {
            Ok(frame) => {
                if let Err(e) = websocket.send(Message::Text(frame)) {
                    info!("Receiver {} disconnected: {}", peer, e);
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        match websocket.read() {
            Ok(Message::Close(_)) => {
                info!("Receiver {} closed", peer);
                break;
            }
            Ok(_) => {}
            Err(e) if is_timeout(&e) => {}
            Err(e) => {
                info!("Receiver {} disconnected: {}", peer, e);
                break;
            }
        }
    }

    subscribers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .retain(|s| s.peer != peer);
    info!("Receiver {} left group {}", peer, group);
}

fn is_timeout(e: &tungstenite::Error) -> bool {
    matches!(e, tungstenite::Error::Io(io) if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut))
}
