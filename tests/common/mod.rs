#![allow(dead_code)]

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

/// One path served by [`stub_server`].
pub struct Route {
    pub path: &'static str,
    pub body: Vec<u8>,
    /// Announced `Content-Length`; larger than the body to simulate a
    /// connection dropped mid-transfer.
    pub content_length: usize,
}

impl Route {
    pub fn ok(path: &'static str, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        Route {
            path,
            content_length: body.len(),
            body,
        }
    }

    pub fn truncated(path: &'static str, body: impl Into<Vec<u8>>, content_length: usize) -> Self {
        Route {
            path,
            body: body.into(),
            content_length,
        }
    }
}

/// Serve `routes` over plain HTTP/1.1 on a loopback port until `requests`
/// requests have been answered. Unknown paths get a 404.
pub fn stub_server(routes: Vec<Route>, requests: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming().take(requests) {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            // Drain headers.
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                    break;
                }
            }
            let path = request_line.split_whitespace().nth(1).unwrap_or("/");
            let (status, body, length) = match routes.iter().find(|r| r.path == path) {
                Some(r) => ("200 OK", r.body.as_slice(), r.content_length),
                None => ("404 Not Found", b"missing".as_slice(), 7),
            };
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {length}\r\nConnection: close\r\n\r\n"
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(body).unwrap();
        }
    });
    format!("http://{addr}")
}
