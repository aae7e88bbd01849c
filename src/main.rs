//! nmconn entry point, run by Ansible as a binary module.

use std::process::ExitCode;

use log::{error, info};

use nmconn::args::ModuleArgs;
use nmconn::config::Config;
use nmconn::directory::NmcliDirectory;
use nmconn::{Reconciler, Response};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the module result.
    env_logger::init();

    run().await.emit()
}

async fn run() -> Response {
    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("{}", e);
            return Response::fail_with("Cannot load configuration", e);
        }
    };
    info!("Starting nmconn with config: {:?}", cfg);

    let argv: Vec<String> = std::env::args().collect();
    let args = match ModuleArgs::from_args(&argv) {
        Ok(args) => args,
        Err(e) => {
            error!("Invalid module arguments: {}", e);
            return Response::fail_with(&format!("Cannot parse argument {:?}", argv), e);
        }
    };

    let directory = NmcliDirectory::new(cfg.nmcli_path.clone(), cfg.not_found_exit_code);
    Reconciler::new(&directory)
        .reconcile_within(&args.connection, args.state, cfg.timeout())
        .await
        .into()
}
