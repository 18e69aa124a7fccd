use batchgate::client::{ClientError, StatusKind, StatusLine};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> Result<(), ClientError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Io(std::io::Error::other(e)))?;
    println!("{out}");
    Ok(())
}

pub fn print_status(status: &StatusLine) {
    match status.kind {
        StatusKind::Info => eprintln!("{}", status.message),
        StatusKind::Warning => eprintln!("warning: {}", status.message),
        StatusKind::Error => eprintln!("error: {}", status.message),
    }
}

pub fn print_warning(message: &str) {
    eprintln!("warning: {message}");
}
