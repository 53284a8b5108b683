use clap::Parser;

use orchestrator::{Args, DriverErr, run};

fn main() -> Result<(), DriverErr> {
    env_logger::init();

    let args = Args::parse();
    run(&args)
}
