//! Canned-response HTTP fixture server.
//!
//! The client under test speaks raw HTTP/1.0 over a socket, so the fixtures
//! control the exact bytes on the wire — including deliberately malformed
//! heads that a mocking framework would refuse to produce. Each canned
//! response is served to one connection, in order; the raw request text is
//! captured for assertions.
#![allow(dead_code)] // each test crate uses a subset of these helpers

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::thread;

/// Spawn a listener that serves the given responses to successive
/// connections. Returns the bound address and the log of raw requests.
pub fn spawn_server(responses: Vec<String>) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
    spawn_server_with(|_| responses)
}

/// Like [`spawn_server`], but the responses may reference the server's own
/// address (for self-redirect loops).
pub fn spawn_server_with<F>(make_responses: F) -> (SocketAddr, Arc<Mutex<Vec<String>>>)
where
    F: FnOnce(SocketAddr) -> Vec<String>,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let responses = make_responses(addr);

    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);

    thread::spawn(move || {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };

            let mut request = String::new();
            let mut buf = [0u8; 4096];
            loop {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        request.push_str(&String::from_utf8_lossy(&buf[..n]));
                        if request.contains("\r\n\r\n") {
                            break;
                        }
                    }
                }
            }

            log.lock().unwrap().push(request);
            let _ = stream.write_all(response.as_bytes());
            // Dropping the stream closes it: with Connection: close that is
            // how the client learns the body is complete.
        }
    });

    (addr, requests)
}

pub fn ok_response(body: &str) -> String {
    format!("HTTP/1.0 200 OK\r\nContent-Type: text/xml\r\n\r\n{body}")
}

pub fn redirect_response(code: u16, location: &str) -> String {
    format!("HTTP/1.0 {code} Moved\r\nLocation: {location}\r\n\r\n")
}
