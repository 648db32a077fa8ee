//! Measures cache get latency against an in-process server
//!
//! A server and a client are connected over a loopback fabric. The store is
//! warmed with `--objects` objects of `--size` bytes, the cache is populated
//! and every object is then read once more through the cache.

use std::path::Path;
use std::process;
use std::time::Instant;

use clap::{App, Arg};
use log::{error, info};

use farstore::cache::{CacheManager, ObjectStore, PolicyKind};
use farstore::client::StoreClient;
use farstore::config::{ClientConfig, ServerConfig};
use farstore::server::{Server, StoreHandler};
use farstore::transport::loopback::Fabric;

struct Stats {
    samples: Vec<u64>
}

impl Stats {
    fn with_capacity(n: usize) -> Stats {
        Stats { samples: Vec::with_capacity(n) }
    }

    fn add(&mut self, us: u64) {
        self.samples.push(us);
    }

    fn report(&mut self, label: &str) {
        if self.samples.is_empty() {
            info!("{}: no samples", label);
            return;
        }
        self.samples.sort_unstable();
        let n = self.samples.len();
        let sum: u64 = self.samples.iter().sum();
        let p99 = self.samples[((n as f64 * 0.99) as usize).min(n - 1)];
        info!("{}: count {} min {} us avg {:.2} us max {} us 99% {} us",
            label, n, self.samples[0], sum as f64 / n as f64, self.samples[n - 1], p99);
    }
}

fn parse<T: std::str::FromStr>(value: Option<&str>, name: &str) -> T {
    match value.map(|v| v.parse::<T>()) {
        Some(Ok(v)) => v,
        _ => {
            error!("Invalid value for --{}", name);
            process::exit(2);
        }
    }
}

fn run(server_cfg: ServerConfig, client_cfg: ClientConfig, objects: u64, size: usize) -> Result<(), String> {
    let fabric = Fabric::new();

    let server = Server::start(&server_cfg, fabric.endpoint(), StoreHandler::new(server_cfg.pool_size))
        .map_err(|e| format!("server failed to start: {}", e))?;

    let client = StoreClient::connect(&client_cfg, fabric.endpoint())
        .map_err(|e| format!("client failed to connect: {}", e))?;

    let payload = vec![42u8; size];

    info!("Warming up {} objects of {} bytes", objects, size);
    let mut puts = Stats::with_capacity(objects as usize);
    for oid in 0 .. objects {
        let start = Instant::now();
        client.put(oid, &payload).map_err(|e| format!("put {} failed: {}", oid, e))?;
        puts.add(start.elapsed().as_micros() as u64);
    }
    puts.report("remote put");

    let cache = CacheManager::new(client, client_cfg.cache_size, client_cfg.eviction)
        .map_err(|e| e.to_string())?;

    let mut misses = Stats::with_capacity(objects as usize);
    for oid in 0 .. objects {
        let start = Instant::now();
        cache.get(oid).map_err(|e| format!("get {} failed: {}", oid, e))?;
        misses.add(start.elapsed().as_micros() as u64);
    }
    misses.report("cache populate");

    let mut gets = Stats::with_capacity(objects as usize);
    for oid in 0 .. objects {
        let start = Instant::now();
        cache.get(oid).map_err(|e| format!("get {} failed: {}", oid, e))?;
        gets.add(start.elapsed().as_micros() as u64);
    }
    gets.report(&format!("cache get ({}, {} resident)", cache.policy_kind(), cache.len()));

    drop(cache);
    server.shutdown().map_err(|e| format!("server stopped with error: {}", e))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = App::new("farstore-bench")
        .about("Cache latency benchmark over an in-process fabric")
        .arg(Arg::with_name("server-config")
            .long("server-config")
            .value_name("FILE")
            .help("Server TOML configuration"))
        .arg(Arg::with_name("client-config")
            .long("client-config")
            .value_name("FILE")
            .help("Client TOML configuration"))
        .arg(Arg::with_name("objects")
            .long("objects")
            .value_name("N")
            .default_value("10000"))
        .arg(Arg::with_name("size")
            .long("size")
            .value_name("BYTES")
            .default_value("1024"))
        .arg(Arg::with_name("policy")
            .long("policy")
            .value_name("lru|lradded")
            .help("Overrides the client configuration's eviction policy"))
        .get_matches();

    let server_cfg = match matches.value_of("server-config") {
        Some(p) => ServerConfig::load(Path::new(p)),
        None => Ok(ServerConfig::default())
    };
    let client_cfg = match matches.value_of("client-config") {
        Some(p) => ClientConfig::load(Path::new(p)),
        None => Ok(ClientConfig::default())
    };

    let (server_cfg, mut client_cfg) = match (server_cfg, client_cfg) {
        (Ok(s), Ok(c)) => (s, c),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to load configuration: {}", e);
            process::exit(2);
        }
    };

    // Both ends share one fabric, so the client always dials the server's address
    client_cfg.server_addr = server_cfg.listen_addr.clone();
    if matches.is_present("policy") {
        client_cfg.eviction = parse::<PolicyKind>(matches.value_of("policy"), "policy");
    }

    let objects: u64 = parse(matches.value_of("objects"), "objects");
    let size: usize = parse(matches.value_of("size"), "size");

    if let Err(e) = run(server_cfg, client_cfg, objects, size) {
        error!("{}", e);
        process::exit(1);
    }
}
