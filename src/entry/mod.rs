mod plan;

use std::ffi::OsString;

use clap::{CommandFactory, FromArgMatches};

use crate::args::VolleyArgs;
use crate::error::AppResult;
use plan::{build_plan, execute_plan};

/// Parses the command line, installs logging and runs the chosen command.
///
/// # Errors
///
/// Returns an error when the config or a schedule is invalid, an input
/// file cannot be read, or the aggregation pipeline fails.
pub fn run() -> AppResult<()> {
    let args = match parse_args()? {
        Some(args) => args,
        None => return Ok(()),
    };

    crate::logger::init_logging(args.verbose);

    let plan = build_plan(args)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(execute_plan(plan))
}

fn parse_args() -> AppResult<Option<VolleyArgs>> {
    let mut cmd = VolleyArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    Ok(Some(VolleyArgs::from_arg_matches(&matches)?))
}

fn should_show_help(raw_args: &[OsString]) -> bool {
    matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--")
}
