use std::process::{Command, ExitStatus};

#[derive(thiserror::Error, Debug)]
pub enum ShellError {
    #[error("failed to spawn shell: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("command exited with {status}: {stderr}")]
    NonZero { status: ExitStatus, stderr: String },
}

/// `sh -c <command_line>`: the whole line goes through shell parsing.
pub fn shell(command_line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command_line);
    cmd
}

pub fn ping_command(host: &str) -> Command {
    shell(&format!("ping -c 4 {host}"))
}

pub fn nslookup_command(domain: &str) -> Command {
    shell(&format!("nslookup {domain}"))
}

/// Stdout of the command whatever its exit status (popen semantics).
pub fn read_output(mut cmd: Command) -> Result<String, ShellError> {
    let out = cmd.output()?;
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Stdout of the command; a non-zero exit is an error.
pub fn check_output(mut cmd: Command) -> Result<Vec<u8>, ShellError> {
    let out = cmd.output()?;
    if !out.status.success() {
        return Err(ShellError::NonZero {
            status: out.status,
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        });
    }
    Ok(out.stdout)
}
