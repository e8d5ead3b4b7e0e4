//! mirin, a small IRC-style chat server.
//!
//! # Usage
//!
//! You need a configuration file, and pass its name as an argument. The git repository contains an
//! example `doc/mirin.conf`, with comments describing the different options.
//!
//!
//! During development: `cargo run -- doc/mirin.conf`
//!
//! For an optimized build:
//!
//! ```console
//! cargo install
//! mirin mirin.conf
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, rust_2018_idioms)]

pub use crate::config::Config;
pub use crate::state::State;
use std::{env, process};

pub mod client;
pub mod config;
mod lines;
pub mod message;
mod net;
pub mod state;
mod util;

/// The beginning of everything
pub fn start() {
    if cfg!(debug_assertions) {
        env::set_var("RUST_BACKTRACE", "1");
    }

    let log_settings = env_logger::Env::new()
        .filter_or("MIRIN_LOG", "mirin=debug")
        .write_style("MIRIN_LOG_STYLE");
    env_logger::Builder::from_env(log_settings)
        .format(|buf, r| {
            use std::io::Write;
            writeln!(buf, "[{:<5} {}] {}", r.level(), r.target(), r.args())
        })
        .init();

    let config_path = parse_args();
    let cfg = Config::from_file(&config_path).unwrap_or_else(|err| {
        log::error!("Failed to read {:?}: {}", config_path, err);
        process::exit(1);
    });

    let runtime = runtime(cfg.workers);
    let shared = State::new(cfg.domain);

    for address in cfg.bindings {
        runtime.spawn(net::listen(address, shared.clone()));
    }

    runtime.block_on(infinite());
}

fn runtime(workers: usize) -> tokio::runtime::Runtime {
    let mut builder = tokio::runtime::Builder::new_multi_thread();

    if workers != 0 {
        builder.worker_threads(workers);
    }

    builder
        .enable_io()
        .enable_time()
        .build()
        .unwrap_or_else(|err| {
            log::error!("Failed to start the tokio runtime: {}", err);
            process::exit(1);
        })
}

fn infinite() -> impl std::future::Future<Output = ()> {
    futures::future::pending()
}

fn parse_args() -> String {
    let mut args = env::args();

    let program = args.next().unwrap();

    let config_path = args.next().unwrap_or_else(|| {
        eprintln!("Usage: {} CONFIG_FILE", program);
        process::exit(1);
    });

    if config_path == "-h" || config_path == "--help" {
        eprintln!("mirin {}", env!("CARGO_PKG_VERSION"));
        eprintln!("Usage: {} CONFIG_FILE", program);
        process::exit(1);
    } else if config_path == "-v" || config_path == "--version" {
        eprintln!("mirin {}", env!("CARGO_PKG_VERSION"));
        process::exit(1);
    }

    config_path
}
