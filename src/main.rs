mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_diff, run_locate, run_sessions, DiffArgs, LocateArgs};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();
    init_tracing(args.verbose);

    match args.command {
        Commands::Sessions { format, output } => {
            run_sessions(args.config, args.root, format, output)
        }
        Commands::Diff {
            session,
            json,
            context,
            apply,
            dry_run,
            force,
            threshold,
            output,
        } => run_diff(
            &raw_args,
            args.config,
            args.root,
            DiffArgs {
                session,
                json,
                context,
                apply,
                dry_run,
                force,
                threshold,
                output,
            },
        ),
        Commands::Locate {
            selector,
            tag,
            classes,
            id,
            testid,
            text,
            limit,
            format,
            output,
        } => run_locate(
            args.config,
            args.root,
            LocateArgs {
                selector,
                tag,
                classes,
                id,
                testid,
                text,
                limit,
                format,
                output,
            },
        ),
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_ansi(false),
        )
        .init();
}
