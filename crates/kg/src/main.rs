//! kg CLI
//!
//! Binary name: `kg`

use std::process;

use kg::cli::{
    build_cli,
    handlers::{format_error, run_cli},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();
    let debug = matches.get_flag("debug");

    // --debug wins over RUST_LOG
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run_cli(&matches).await {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("Error: {}", format_error(&err));
            if debug {
                eprintln!("{err:?}");
            }
        }

        let code = err
            .downcast_ref::<kg_core::Error>()
            .map_or(1, kg_core::Error::exit_code);

        #[allow(clippy::exit)]
        process::exit(code);
    }
}
