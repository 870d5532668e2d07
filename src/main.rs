// kiln - main entry point
use clap::Parser;
use kiln::cli::Cli;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
