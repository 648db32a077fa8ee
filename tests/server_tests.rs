use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use farstore::client::{ClientError, StoreClient};
use farstore::config::{ClientConfig, ServerConfig};
use farstore::protocol::DecodeError;
use farstore::server::{PoolStats, Server, ServerError, StoreHandler};
use farstore::transport::loopback::Fabric;
use farstore::transport::{AccessFlags, AlignedBuffer, CmEvent, Transport, WorkRequest};

const ADDR: &str = "node0:18515";

fn init_logging() {
    let _ = env_logger::Builder::from_default_env().is_test(true).try_init();
}

fn start(pool_size: usize) -> (Fabric, Server, ClientConfig) {
    init_logging();
    let fabric = Fabric::new();

    let config = ServerConfig {
        listen_addr: ADDR.to_string(),
        pool_size,
        ..ServerConfig::default()
    };
    let server = Server::start(&config, fabric.endpoint(), StoreHandler::new(pool_size)).unwrap();

    let client_config = ClientConfig {
        server_addr: ADDR.to_string(),
        ..ClientConfig::default()
    };
    (fabric, server, client_config)
}

fn connect(fabric: &Fabric, config: &ClientConfig) -> StoreClient {
    StoreClient::connect(config, fabric.endpoint()).unwrap()
}

/// Polls the server until `done` accepts its pool statistics
fn wait_for_stats<F: Fn(&PoolStats) -> bool>(server: &Server, done: F) -> PoolStats {
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Some(s) = server.pool_stats() {
            if done(&s) {
                return s;
            }
        }
        if Instant::now() > deadline {
            panic!("server never reached the expected pool state: {:?}", server.pool_stats());
        }
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn keep_alive_echoes_nonce() {
    let (fabric, _server, cfg) = start(4096);
    let client = connect(&fabric, &cfg);

    for nonce in &[0u64, 1, 0xDEAD_BEEF, u64::max_value()] {
        assert_eq!(client.keep_alive(*nonce).get().unwrap(), *nonce);
    }
}

#[test]
fn control_requests_echo() {
    let (fabric, _server, cfg) = start(4096);
    let client = connect(&fabric, &cfg);

    let mut sub = client.subscribe(11, "node7:1234");
    let mut flush = client.flush(12);
    let mut lock = client.lock(13);

    assert_eq!(lock.get().unwrap(), 13);
    assert_eq!(flush.get().unwrap(), 12);
    assert_eq!(sub.get().unwrap(), 11);
}

#[test]
fn future_result_is_stable() {
    let (fabric, _server, cfg) = start(4096);
    let client = connect(&fabric, &cfg);

    let mut f = client.keep_alive(99);
    assert_eq!(f.get().unwrap(), 99);
    assert!(f.is_ready());
    assert_eq!(f.get().unwrap(), 99);
}

#[test]
fn freed_region_is_reused() {
    let (fabric, server, cfg) = start(64 * 1024);
    let client = connect(&fabric, &cfg);

    let a = client.allocate(100).unwrap();
    let addr = a.remote_addr();
    let before = wait_for_stats(&server, |s| s.live_allocations == 1);

    client.deallocate(a).unwrap();
    wait_for_stats(&server, |s| s.live_allocations == 0);

    let b = client.allocate(100).unwrap();
    assert_eq!(b.remote_addr(), addr);
    let after = wait_for_stats(&server, |s| s.live_allocations == 1);
    assert_eq!(after.allocated, before.allocated);
}

#[test]
fn keyed_region_outlives_first_release() {
    let (fabric, server, cfg) = start(4096);
    let client = connect(&fabric, &cfg);

    let a = client.allocate_keyed(64, "shared").unwrap();
    let b = client.allocate_keyed(64, "shared").unwrap();
    client.deallocate(a).unwrap();
    wait_for_stats(&server, |s| s.live_allocations == 1);

    // The region is still held by b, so fresh memory lands elsewhere
    let fresh = client.allocate(64).unwrap();
    assert_ne!(fresh.remote_addr(), b.remote_addr());
    assert!(client.write(&fresh, 0, &[1u8; 64]).get().unwrap());
    assert!(client.write(&b, 0, &[9u8; 64]).get().unwrap());
    assert_eq!(client.read(&fresh, 0, 64).get().unwrap(), vec![1u8; 64]);
    assert_eq!(client.read(&b, 0, 64).get().unwrap(), vec![9u8; 64]);

    client.deallocate(b).unwrap();
    wait_for_stats(&server, |s| s.live_allocations == 1 && s.allocated == 64);
}

#[test]
fn keyed_reacquire_cannot_outgrow_region() {
    let (fabric, server, cfg) = start(4096);
    let client = connect(&fabric, &cfg);

    let small = client.allocate_keyed(8, "record").unwrap();
    let neighbour = client.allocate(64).unwrap();
    assert!(client.write(&neighbour, 0, &[5u8; 64]).get().unwrap());

    match client.allocate_keyed(64, "record") {
        Err(ClientError::ServerMemoryExhausted) => (),
        other => panic!("unexpected {:?}", other)
    }

    // A smaller or equal re-acquire is bounded by what it asked for
    let again = client.allocate_keyed(8, "record").unwrap();
    assert_eq!(again.remote_addr(), small.remote_addr());
    assert_eq!(again.size(), 8);
    assert!(client.write(&again, 0, &[7u8; 16]).get().is_err());
    assert_eq!(client.read(&neighbour, 0, 64).get().unwrap(), vec![5u8; 64]);

    wait_for_stats(&server, |s| s.live_allocations == 2);
}

#[test]
fn keyed_region_freed_by_last_release() {
    let (fabric, server, cfg) = start(4096);
    let first = connect(&fabric, &cfg);
    let second = connect(&fabric, &cfg);

    let a = first.allocate_keyed(128, "table").unwrap();
    let b = second.allocate_keyed(128, "table").unwrap();
    assert_eq!(a.remote_addr(), b.remote_addr());

    first.deallocate(a).unwrap();
    wait_for_stats(&server, |s| s.live_allocations == 1);
    second.deallocate(b).unwrap();
    wait_for_stats(&server, |s| s.live_allocations == 0);
}

#[test]
fn keyed_allocation_is_idempotent() {
    let (fabric, server, cfg) = start(4096);
    let client = connect(&fabric, &cfg);

    let a = client.allocate_keyed(128, "table").unwrap();
    let b = client.allocate_keyed(128, "table").unwrap();
    assert_eq!(a.remote_addr(), b.remote_addr());
    assert_eq!(a.mr_id(), b.mr_id());
    assert_eq!(a.capability(), b.capability());

    let c = client.allocate(128).unwrap();
    assert_ne!(c.remote_addr(), a.remote_addr());

    wait_for_stats(&server, |s| s.live_allocations == 2);
}

#[test]
fn one_sided_write_then_read() {
    let (fabric, _server, cfg) = start(4096);
    let client = connect(&fabric, &cfg);

    let lease = client.allocate(32).unwrap();
    assert!(client.write(&lease, 4, b"hello").get().unwrap());
    assert_eq!(client.read(&lease, 4, 5).get().unwrap(), b"hello".to_vec());
    assert_eq!(client.read(&lease, 0, 4).get().unwrap(), vec![0u8; 4]);

    // Past the end of the lease
    assert!(client.write(&lease, 30, b"hello").get().is_err());
    assert!(client.read(&lease, 28, 8).get().is_err());
}

#[test]
fn objects_round_trip() {
    let (fabric, _server, cfg) = start(64 * 1024);
    let client = connect(&fabric, &cfg);

    assert!(client.write_object(1, b"first").get().unwrap());
    assert!(client.contains_object(1));
    assert_eq!(client.read_object(1).get().unwrap(), b"first".to_vec());

    let big = vec![7u8; 1000];
    assert!(client.write_object(1, &big).get().unwrap());
    assert_eq!(client.read_object(1).get().unwrap(), big);

    assert!(client.write_object(1, b"").get().unwrap());
    assert_eq!(client.read_object(1).get().unwrap(), Vec::<u8>::new());

    assert!(client.remove_object(1).get().unwrap());
    assert!(!client.contains_object(1));
}

#[test]
fn concurrent_object_writers() {
    let (fabric, server, cfg) = start(256 * 1024);
    let client = Arc::new(connect(&fabric, &cfg));

    let writers: Vec<_> = (0 .. 4u8).map(|t| {
        let client = client.clone();
        thread::spawn(move || {
            for round in 1 ..= 8usize {
                // Growing payloads force a release and a fresh allocation each time
                let payload = vec![t; round * 100];
                assert!(client.write_object(u64::from(t), &payload).get().unwrap());
                assert!(client.write_object(99, &payload).get().unwrap());
                assert_eq!(client.read_object(u64::from(t)).get().unwrap(), payload);
            }
        })
    }).collect();

    for w in writers {
        w.join().unwrap();
    }

    let shared = client.read_object(99).get().unwrap();
    assert!(shared.len() >= 100 && shared.len() <= 800 && shared.len() % 100 == 0);
    wait_for_stats(&server, |s| s.live_allocations == 5);
}

#[test]
fn unknown_object_is_reported() {
    let (fabric, _server, cfg) = start(4096);
    let client = connect(&fabric, &cfg);

    match client.read_object(42).get() {
        Err(ClientError::NoSuchId) => (),
        other => panic!("unexpected {:?}", other)
    }
    match client.remove_object(42).get() {
        Err(ClientError::NoSuchId) => (),
        other => panic!("unexpected {:?}", other)
    }
}

#[test]
fn exhaustion_is_reported() {
    let (fabric, _server, cfg) = start(4096);
    let client = connect(&fabric, &cfg);

    match client.allocate(8192) {
        Err(ClientError::ServerMemoryExhausted) => (),
        other => panic!("unexpected {:?}", other)
    }

    let mut f = client.allocate_async(1 << 20, "");
    match f.get() {
        Err(ClientError::ServerMemoryExhausted) => (),
        other => panic!("unexpected {:?}", other)
    }

    // The server keeps serving after an exhausted request
    assert!(client.allocate(4096).is_ok());
}

#[test]
fn disconnect_releases_anonymous_allocations() {
    let (fabric, server, cfg) = start(64 * 1024);

    {
        let client = connect(&fabric, &cfg);
        let _anon = client.allocate(256).unwrap();
        let _keyed = client.allocate_keyed(256, "persistent").unwrap();
        wait_for_stats(&server, |s| s.live_allocations == 2);
    }

    let remaining = wait_for_stats(&server, |s| s.live_allocations == 1);
    assert_eq!(remaining.allocated, 256);

    let client = connect(&fabric, &cfg);
    let again = client.allocate_keyed(256, "persistent").unwrap();
    assert_eq!(again.size(), 256);
    wait_for_stats(&server, |s| s.live_allocations == 1);
}

#[test]
fn connections_are_tracked() {
    let (fabric, server, cfg) = start(4096);
    let client = connect(&fabric, &cfg);
    client.keep_alive(1).get().unwrap();

    let conns = server.connections();
    assert_eq!(conns.len(), 1);
    assert_eq!(server.connection_state(conns[0].0), Some(farstore::server::ConnState::Established));
}

#[test]
fn closed_connections_are_forgotten() {
    let (fabric, server, cfg) = start(4096);

    for nonce in 0 .. 5 {
        let client = connect(&fabric, &cfg);
        client.keep_alive(nonce).get().unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while !server.connections().is_empty() {
        if Instant::now() > deadline {
            panic!("server still tracks {:?}", server.connections());
        }
        thread::sleep(Duration::from_millis(5));
    }

    let client = connect(&fabric, &cfg);
    client.keep_alive(6).get().unwrap();
    assert_eq!(server.connections().len(), 1);
}

#[test]
fn server_shutdown_fails_client_requests() {
    let (fabric, server, cfg) = start(4096);
    let client = connect(&fabric, &cfg);
    client.keep_alive(1).get().unwrap();

    server.shutdown().unwrap();
    assert!(client.keep_alive(2).get().is_err());
}

#[test]
fn unknown_address_fails_to_connect() {
    let (fabric, _server, mut cfg) = start(4096);
    cfg.server_addr = "nowhere:1".to_string();

    match StoreClient::connect(&cfg, fabric.endpoint()) {
        Err(ClientError::Connection(_)) => (),
        Err(e) => panic!("unexpected {}", e),
        Ok(_) => panic!("connected to an unknown address")
    }
}

#[test]
fn unknown_tag_stops_the_server() {
    let (fabric, server, _cfg) = start(4096);

    let raw = fabric.endpoint();
    let cm = raw.cm_events();

    let c = raw.resolve_addr(ADDR).unwrap();
    assert_eq!(cm.recv().unwrap(), CmEvent::AddrResolved(c));
    raw.resolve_route(c).unwrap();
    assert_eq!(cm.recv().unwrap(), CmEvent::RouteResolved(c));
    raw.connect(c).unwrap();
    assert_eq!(cm.recv().unwrap(), CmEvent::Established(c));

    // A Frame table whose union type byte names no message
    let bytes = [12, 0, 0, 0, 6, 0, 8, 0, 4, 0, 0, 0, 8, 0, 0, 0, 0xEE, 0, 0, 0];
    let mut frame = AlignedBuffer::new(bytes.len()).unwrap();
    frame.as_mut_slice().copy_from_slice(&bytes);
    let mr = unsafe { raw.register_memory(frame.as_mut_ptr(), frame.len(), AccessFlags::LOCAL_WRITE).unwrap() };
    raw.post_send(c, WorkRequest::Send{ wr_id: 1, local: mr.sge(0, bytes.len()) }).unwrap();

    match server.wait() {
        Err(ServerError::Protocol(DecodeError::UnknownTag(0xEE))) => (),
        other => panic!("unexpected {:?}", other)
    }
}
