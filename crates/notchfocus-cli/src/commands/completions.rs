use clap_complete::Shell;

pub fn run(shell: Shell, cmd: &mut clap::Command) -> Result<(), Box<dyn std::error::Error>> {
    clap_complete::generate(shell, cmd, "notchfocus", &mut std::io::stdout());
    Ok(())
}
