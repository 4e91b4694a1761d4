#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use switchyard::{Request, Response};

pub fn request(method: &str, uri: &str) -> Request {
    Request::new(
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap(),
    )
}

pub fn request_with(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = http::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    Request::new(builder.body(Bytes::new()).unwrap())
}

pub fn from_peer(method: &str, uri: &str, peer: &str) -> Request {
    let addr: SocketAddr = peer.parse().unwrap();
    request(method, uri).with_remote_addr(addr)
}

pub fn body(res: &Response) -> String {
    String::from_utf8(res.body().to_vec()).unwrap()
}

/// Ordered trace shared between middleware and handlers under test.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock())
    }
}
