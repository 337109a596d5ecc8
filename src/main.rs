use clap::Parser;
use cursor_probe::cmd::{run_probe, Cli};
use cursor_probe::log::init_tracing;
use cursor_probe::probe::StdinGate;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    let mut gate = StdinGate::new();
    let mut stdout = std::io::stdout();

    // Failures are reported by `run_probe`; the exit status stays 0 either way.
    let _ = run_probe(&cli, &mut gate, &mut stdout).await;
}
