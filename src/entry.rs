use std::ffi::OsString;
use std::path::Path;

use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches};
use tracing::warn;

use salvo::args::{LoadArgs, PositiveUsize};
use salvo::config::DEFAULT_CONFIG_FILES;
use salvo::error::AppResult;

use crate::app::run_local;

pub(crate) fn run() -> AppResult<()> {
    let (mut args, matches) = match parse_args()? {
        Some(parsed) => parsed,
        None => return Ok(()),
    };

    apply_config(&mut args, &matches)?;
    crate::logger::init_logging(args.verbose, args.no_color);
    warn_ignored_options(&args, &matches);

    let runtime = build_runtime(args.cpus)?;
    runtime.block_on(run_local(args))?;
    Ok(())
}

fn parse_args() -> AppResult<Option<(LoadArgs, ArgMatches)>> {
    let mut cmd = LoadArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = LoadArgs::from_arg_matches(&matches)?;

    Ok(Some((args, matches)))
}

fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    if !treat_as_empty {
        return false;
    }

    !has_default_config()
}

fn has_default_config() -> bool {
    DEFAULT_CONFIG_FILES
        .iter()
        .any(|path| Path::new(path).exists())
}

fn apply_config(args: &mut LoadArgs, matches: &ArgMatches) -> AppResult<()> {
    if let Some(config) = salvo::config::load_config(args.config.as_deref())? {
        salvo::config::apply_config(args, matches, &config)?;
    }
    Ok(())
}

fn warn_ignored_options(args: &LoadArgs, matches: &ArgMatches) {
    if args.duration.is_some()
        && matches.value_source("requests") == Some(ValueSource::CommandLine)
    {
        warn!("--requests is ignored because a run duration is set");
    }
}

fn build_runtime(cpus: Option<PositiveUsize>) -> AppResult<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(cpus) = cpus {
        builder.worker_threads(cpus.get());
    }
    Ok(builder.enable_all().build()?)
}
