//! Behavioural tests for the TCP socket listener.

use std::cell::RefCell;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;

use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};

use beacon_config::ListenAddress;

use crate::transport::{ListenerError, ListenerHandle, PeerRecordingHandler, SocketListener};

use super::support::eventually;

struct ListenerWorld {
    address: ListenAddress,
    handler: Arc<PeerRecordingHandler>,
    listener: Option<ListenerHandle>,
    bound: Option<SocketAddr>,
    error: Option<ListenerError>,
    reserved: Option<TcpListener>,
}

impl ListenerWorld {
    fn new() -> Self {
        Self {
            address: ListenAddress::new("127.0.0.1", 0),
            handler: PeerRecordingHandler::shared(),
            listener: None,
            bound: None,
            error: None,
            reserved: None,
        }
    }

    fn start_listener(&mut self) {
        let started = SocketListener::bind(&self.address).and_then(|listener| {
            self.bound = Some(listener.local_addr());
            listener.start(self.handler.clone())
        });
        match started {
            Ok(handle) => self.listener = Some(handle),
            Err(error) => self.error = Some(error),
        }
    }

    fn reserve_port(&mut self) {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind reserved port");
        let port = listener.local_addr().expect("local addr").port();
        self.address = self.address.with_port(port);
        self.reserved = Some(listener);
    }

    fn connect_clients(&self, count: usize) {
        let addr = self.bound.expect("listener address should be set");
        for _ in 0..count {
            TcpStream::connect(addr).expect("connect client");
        }
    }
}

impl Drop for ListenerWorld {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            handle.shutdown();
            let _ = handle.join();
        }
        self.reserved = None;
    }
}

#[fixture]
fn world() -> RefCell<ListenerWorld> {
    RefCell::new(ListenerWorld::new())
}

#[given("a TCP listener is running")]
fn given_listener(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().start_listener();
    assert!(
        world.borrow().error.is_none(),
        "listener start failed: {:?}",
        world.borrow().error
    );
}

#[given("the listen port is already bound")]
fn given_port_in_use(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().reserve_port();
}

#[when("{count} clients connect")]
fn when_clients_connect(world: &RefCell<ListenerWorld>, count: usize) {
    world.borrow().connect_clients(count);
}

#[when("the listener starts on the same port")]
fn when_listener_starts(world: &RefCell<ListenerWorld>) {
    world.borrow_mut().start_listener();
}

#[then("the listener records {count} connections")]
fn then_listener_records(world: &RefCell<ListenerWorld>, count: usize) {
    let handler = world.borrow().handler.clone();
    assert!(
        eventually(|| handler.accepted() >= count),
        "expected {count} connections, got {}",
        handler.accepted()
    );
}

#[then("starting the listener fails because the address is in use")]
fn then_listener_fails(world: &RefCell<ListenerWorld>) {
    let world = world.borrow();
    let error = world.error.as_ref().expect("expected listener start to fail");
    assert!(error.is_address_in_use(), "unexpected error: {error}");
}

#[scenario(path = "tests/features/server_socket.feature")]
fn server_socket_listener(#[from(world)] world: RefCell<ListenerWorld>) {
    drop(world);
}
