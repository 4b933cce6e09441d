//! yakumo CLI entry point.

// CLI binary needs to output to stdout/stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

use yakumo::cli::{self, EXIT_FAILURE, EXIT_OK, Invocation, exit_code_for, render_error};
use yakumo::tracing::{TracingConfig, init_tracing};
use yakumo::{Error, YakumoBuilder};

fn main() {
    // NOTE: eprintln! is used in the panic hook because the tracing
    // subscriber may itself be what panicked.
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with YAKUMO_LOG=debug for more information.");
    }));

    let Some(invocation) = cli::parse(std::env::args().skip(1)) else {
        println!("yakumo");
        std::process::exit(EXIT_OK);
    };

    // Ignore error if tracing already initialized
    let _ = init_tracing(TracingConfig::from_env());

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Fatal error: Failed to create tokio runtime: {e}");
            std::process::exit(EXIT_FAILURE);
        }
    };

    let code = runtime.block_on(run(invocation));
    std::process::exit(code);
}

/// Run one invocation and map the outcome to an exit code.
async fn run(invocation: Invocation) -> i32 {
    match execute(invocation).await {
        Ok(()) => EXIT_OK,
        Err(err) => {
            let code = exit_code_for(&err);
            render_error(err);
            code
        }
    }
}

async fn execute(invocation: Invocation) -> yakumo::Result<()> {
    let cwd = std::env::current_dir().map_err(|e| Error::io(e, "reading the current directory"))?;
    let yakumo = YakumoBuilder::new(cwd)
        .with_defaults()
        .with_args(invocation.args)
        .build()?;
    yakumo.start(&invocation.command).await
}
