use std::process::exit;

use symon_cli::cli::parse_args;
use symon_cli::cli::run;

fn main() {
    let args = parse_args();
    if let Err(e) = run(&args) {
        eprintln!("symon: {e:#}");
        exit(1);
    }
}
