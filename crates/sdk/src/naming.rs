//! Client name generation.

/// Build a descriptive client name: `"{prefix}{machine}:{process}"`.
///
/// `machine` is the host name, falling back to the user name and then to
/// `<unknown host>`.  `process` is `"{exe}-{pid}"`, or just the pid when the
/// executable name cannot be determined.
pub fn generate_client_name(prefix: &str) -> String {
    format!("{prefix}{}:{}", machine_name(), process_info())
}

fn process_info() -> String {
    let pid = std::process::id();
    let exe = std::env::current_exe()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()));
    match exe {
        Some(exe) => format!("{exe}-{pid}"),
        None => pid.to_string(),
    }
}

fn machine_name() -> String {
    let host = hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .filter(|h| !h.is_empty());
    if let Some(host) = host {
        return host;
    }

    let user = ["USER", "USERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()));
    user.unwrap_or_else(|| {
        tracing::warn!("could not determine host or user name for client name");
        "<unknown host>".into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_starts_with_prefix_and_ends_with_pid() {
        let name = generate_client_name("fleet-ops-");
        assert!(name.starts_with("fleet-ops-"), "{name}");
        assert!(name.ends_with(&std::process::id().to_string()), "{name}");
    }

    #[test]
    fn name_has_machine_and_process_parts() {
        let name = generate_client_name("");
        let (machine, process) = name.rsplit_once(':').unwrap();
        assert!(!machine.is_empty());
        assert!(!process.is_empty());
    }
}
