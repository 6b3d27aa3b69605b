use std::path::Path;
use std::process;
use std::sync::Arc;

use clap::{App, Arg, ArgMatches};
use slog::error;
use slog::info;
use slog::Logger;

use paxos::conf::ClusterInfo;
use paxos::protocol::NodeId;
use storage::RawKV;

use parliament::setup::init_logger;
use parliament::Server;
use parliament::ServerError;

fn main() {
    let matches = App::new("parliament")
        .version("0.1.0")
        .about("replicated key-value store on multi-instance paxos")
        .arg(
            Arg::with_name("cluster")
                .long("cluster")
                .takes_value(true)
                .required(true)
                .help("cluster config in yaml"),
        )
        .arg(
            Arg::with_name("id")
                .long("id")
                .takes_value(true)
                .required(true)
                .help("node id for this server. It must be one key of cluster conf nodes"),
        )
        .arg(
            Arg::with_name("data-dir")
                .long("data-dir")
                .takes_value(true)
                .required(true)
                .help("rocksdb directory for acceptor states, the log and user data"),
        )
        .arg(
            Arg::with_name("log")
                .long("log")
                .takes_value(true)
                .help("log file path; logs go to stderr if absent"),
        )
        .arg(
            Arg::with_name("workers")
                .long("workers")
                .takes_value(true)
                .default_value("4")
                .help("number of runtime worker threads"),
        )
        .get_matches();

    let (log, _guard) = match init_logger(matches.value_of("log").map(Path::new)) {
        Ok(x) => x,
        Err(e) => {
            eprintln!("failed to init logger: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = run(&matches, &log) {
        error!(log, "server exit"; "err" => %e);
        drop(_guard);
        process::exit(1);
    }
}

fn run(matches: &ArgMatches, log: &Logger) -> Result<(), ServerError> {
    let conffn = matches.value_of("cluster").unwrap_or_default();
    let node_id: NodeId = parse_arg(matches, "id")?;
    let workers: usize = parse_arg(matches, "workers")?;

    let cluster = ClusterInfo::from_file(conffn)?;
    let sto = open_storage(matches.value_of("data-dir").unwrap_or_default())?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()?;

    rt.block_on(async move {
        let mut server = Server::new(sto, cluster, node_id, log)?;
        server.start().await?;

        tokio::signal::ctrl_c().await?;
        info!(log, "interrupted, stopping");

        server.stop()?;
        server.join().await
    })
}

fn parse_arg<T: std::str::FromStr>(matches: &ArgMatches, name: &str) -> Result<T, ServerError> {
    let v = matches.value_of(name).unwrap_or_default();
    v.parse().map_err(|_| {
        ServerError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid --{}: {:?}", name, v),
        ))
    })
}

/// open_storage opens the rocksdb at `data_dir`, creating it if absent.
/// A node must find its acceptor states again after a restart, so there is no in-memory mode.
fn open_storage(data_dir: &str) -> Result<Arc<dyn RawKV>, ServerError> {
    Ok(Arc::new(storage::RocksDBEngine::new(data_dir)?))
}
