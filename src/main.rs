use clap::{Arg, ArgAction, Command};
use easyscript::{run_file, start_repl};
use std::path::Path;
use std::sync::Once;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

static TRACING: Once = Once::new();

/// Installs a stderr subscriber when `RUST_LOG` is set.
fn init_tracing() {
    TRACING.call_once(|| {
        if std::env::var_os("RUST_LOG").is_none() {
            return;
        }
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true),
            )
            .with(EnvFilter::from_default_env())
            .init();
    });
}

fn cli() -> Command {
    Command::new("easyscript")
        .about("Interpreter for the EasyScript language")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Run a script file")
                .arg(
                    Arg::new("script")
                        .help("The script file to execute")
                        .value_name("SCRIPT")
                        .required(true),
                )
                .arg(
                    Arg::new("pretty")
                        .long("pretty")
                        .help("Render errors with labeled source snippets")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("repl").about("Start an interactive session"))
}

fn main() {
    init_tracing();
    let matches = cli().get_matches();

    match matches.subcommand() {
        Some(("run", args)) => {
            let pretty = args.get_flag("pretty");
            let succeeded = args
                .get_one::<String>("script")
                .map(|script| run_file(Path::new(script), pretty))
                .unwrap_or(false);
            if !succeeded {
                std::process::exit(1);
            }
        }
        Some(("repl", _)) => start_repl(),
        _ => {
            // subcommand_required makes clap exit before reaching here
            std::process::exit(2);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn run_requires_a_script() {
        assert!(cli().try_get_matches_from(["easyscript", "run"]).is_err());
        let matches = cli()
            .try_get_matches_from(["easyscript", "run", "main.es", "--pretty"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert!(args.get_flag("pretty"));
    }
}
