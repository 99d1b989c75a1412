use std::sync::Arc;

use clap::Parser;
use http_status_counter::Measurement;
use pingora::server::configuration::Opt;
use status_proxy::configuration::ProxyConfig;
use status_proxy::server::Server;

#[derive(Parser, Debug)]
#[clap(name = "status-proxy", long_about = None)]
struct Args {
    /// Path to the proxy YAML config (upstream, headers, reporting).
    #[clap(long, default_value = "proxy.yaml")]
    proxy_conf: String,

    #[clap(flatten)]
    opt: Opt,
}

fn main() {
    // Enable basic logging; set RUST_LOG=info for visibility.
    env_logger::init();

    let args = Args::parse();

    let config = match ProxyConfig::load(&args.proxy_conf) {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let mut server = Server::new(Some(args.opt)).expect("Failed to create server");
    server
        .bootstrap(config, Arc::new(Measurement::new()))
        .expect("Failed to bootstrap server");

    server.run_forever();
}
