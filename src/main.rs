#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate failure_derive;

extern crate ctrlc;
extern crate failure;
extern crate rusoto_core;
extern crate rusoto_ssm;
extern crate serde;
extern crate serde_json;
extern crate shell_words;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;
use std::process;

use failure::Error;
use structopt::StructOpt;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use args::*;
use shell::Shell;
use ssm_list::CancelToken;
use ssm_ops::SSMOps;
use ssm_parameters::SessionState;
use ssm_registry::ClientRegistry;
use ssm_store::ParameterStore;

mod args;
mod put_options;
mod shell;
mod ssm_copy;
mod ssm_errors;
mod ssm_list;
mod ssm_ops;
mod ssm_parameters;
mod ssm_path;
mod ssm_registry;
mod ssm_remove;
mod ssm_store;

#[cfg(test)]
mod mock_ssm;

/// AWS SSM Parameter Store Shell
/// Command Line
/// --region, -r => Region to operate on (AWS_REGION)
/// --profile, -p => Credentials profile (AWS_PROFILE)
/// --decrypt, -d => Decrypt SecureString values
/// --key, -k => KMS key for SecureString puts
/// --file, -f => Read commands from file, - for stdin
/// cd, ls, get, put, rm, cp, mv, history, region, profile, decrypt, key
/// Without a command the shell reads commands line by line.
fn main() {
    // Help and version requests exit with code 0, parse errors with 1
    let matches = match Opt::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(err) => err.exit(),
    };

    let options = Opt::from_clap(&matches);
    init_tracing(options.verbose);

    if let Err(err) = run(options) {
        eprintln!("Error: {}", err);
        process::exit(1)
    }
}

fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "ssm_shell=warn",
            1 => "ssm_shell=info",
            2 => "ssm_shell=debug",
            _ => "ssm_shell=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

fn run(options: Opt) -> Result<(), Error> {
    let mut session = SessionState::new(&options.region, &options.profile);
    session.decrypt = options.decrypt;
    session.key = options.key.clone();

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if !handler_token.interrupt() {
            process::exit(130);
        }
    })?;

    let store = ParameterStore::new(ClientRegistry::new(Box::new(SSMOps::connect)));
    let mut shell = Shell::new(store, session, cancel);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Some(cmd) = options.cmd {
        return shell.execute(cmd, &mut out);
    }

    let stdin = io::stdin();
    let failures = match options.file {
        Some(ref file) if file.as_path() == Path::new("-") => shell.run(stdin.lock(), &mut out, false)?,
        Some(ref file) => shell.run(BufReader::new(File::open(file)?), &mut out, false)?,
        None => shell.run(stdin.lock(), &mut out, true)?,
    };
    debug!("Session ended in {}", shell.session().cwd);
    if failures > 0 && options.file.is_some() {
        return Err(failure::err_msg(format!("{} commands failed", failures)));
    }
    Ok(())
}
