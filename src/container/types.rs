use crate::options::{self, Options};
use crate::runtime::{ContainerSpec, parse_port_specs};

/// Outcome of a synchronous [`super::Orchestrator::run`].
#[derive(Debug)]
pub struct RunOutput {
    /// Container exit code, [`super::EXIT_CODE_UNKNOWN`] when the wait
    /// timed out.
    pub exit_code: i64,
    /// Captured stdout with terminal color codes stripped.
    pub output: Vec<u8>,
}

/// A creation request together with the equivalent `docker run` command line,
/// kept for the structured log records.
#[derive(Debug)]
pub(crate) struct SpecBuild {
    pub spec: ContainerSpec,
    pub display_cmd: String,
}

/// Builds the request for the synchronous run path: env, cpu pinning, ports
/// and bind mounts, with a TTY. Always auto-cleaned by the caller, hence the
/// `--rm` in the display form.
pub(crate) fn run_spec(
    image: &str,
    cmd: &[String],
    options: &Options,
    bind_paths: &[String],
) -> SpecBuild {
    let mut display = String::from("docker run -it --rm");

    let env = options.str_list(options::ENV).unwrap_or_default();
    for ev in &env {
        display.push_str(&format!(" --env '{ev}'"));
    }

    let ports = options.str_list(options::PORTS).unwrap_or_default();
    for p in &ports {
        display.push_str(&format!(" -p {p}"));
    }

    let mounts = pair_bind_paths(bind_paths);
    for (source, target) in &mounts {
        display.push_str(&format!(" -v {source}:{target}"));
    }

    append_image_and_cmd(&mut display, image, cmd);

    SpecBuild {
        spec: ContainerSpec {
            image: image.to_string(),
            cmd: cmd.to_vec(),
            env,
            tty: true,
            ports: parse_port_specs(&ports),
            mounts,
            cpuset: options.str_opt(options::CPU_SET).map(str::to_string),
            ..Default::default()
        },
        display_cmd: display,
    }
}

/// Builds the request for the asynchronous start path. On top of the run
/// form this applies working directory, extra hosts (a loopback-to-host
/// alias plus any `add-host` entries), network mode, a human-readable memory
/// limit with unlimited swap, and optional auto-removal on exit.
pub(crate) fn start_spec(
    image: &str,
    auto_remove: bool,
    cmd: &[String],
    options: &Options,
    bind_paths: &[String],
) -> SpecBuild {
    let mut display = String::from("docker run -it");
    if auto_remove {
        display.push_str(" --rm");
    }

    let env = options.str_list(options::ENV).unwrap_or_default();
    for ev in &env {
        display.push_str(&format!(" --env '{ev}'"));
    }

    let ports = options.str_list(options::PORTS).unwrap_or_default();
    for p in &ports {
        display.push_str(&format!(" -p {p}"));
    }

    let working_dir = options
        .str_opt(options::WORKING_DIR)
        .filter(|w| !w.is_empty())
        .map(str::to_string);
    if let Some(w) = &working_dir {
        display.push_str(&format!(" -w {w}"));
    }

    let mut extra_hosts = vec!["host.docker.internal:host-gateway".to_string()];
    if let Some(add_host) = options.str_opt(options::ADD_HOST).filter(|h| !h.is_empty()) {
        for host in add_host.split(',') {
            extra_hosts.push(host.to_string());
            display.push_str(&format!(" --add-host {host}"));
        }
    }

    let network_mode = options
        .str_opt(options::NETWORK)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
    if let Some(n) = &network_mode {
        display.push_str(&format!(" --network {n}"));
    }

    let mounts = pair_bind_paths(bind_paths);
    for (source, target) in &mounts {
        display.push_str(&format!(" -v {source}:{target}"));
    }

    let mut memory = None;
    let mut memory_swap = None;
    if let Some(limit) = options.str_opt(options::MEMORY_LIMIT) {
        if let Some(bytes) = options::from_human_size(limit) {
            memory = Some(bytes);
            memory_swap = Some(-1); // unlimited swap
            display.push_str(&format!(" -m {limit} --memory-swap -1"));
        }
    }

    append_image_and_cmd(&mut display, image, cmd);

    SpecBuild {
        spec: ContainerSpec {
            image: image.to_string(),
            cmd: cmd.to_vec(),
            env,
            tty: true,
            working_dir,
            ports: parse_port_specs(&ports),
            mounts,
            cpuset: options.str_opt(options::CPU_SET).map(str::to_string),
            memory,
            memory_swap,
            extra_hosts,
            network_mode,
            auto_remove,
        },
        display_cmd: display,
    }
}

/// Pairs a flat path list positionally into (source, target) bind mounts.
/// A trailing unpaired entry is dropped.
fn pair_bind_paths(bind_paths: &[String]) -> Vec<(String, String)> {
    bind_paths
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect()
}

fn append_image_and_cmd(display: &mut String, image: &str, cmd: &[String]) {
    display.push(' ');
    display.push_str(image);
    for c in cmd {
        display.push(' ');
        display.push_str(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options;
    use serde_json::json;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn odd_bind_paths_drop_the_trailing_entry() {
        let build = run_spec(
            "alpine",
            &[],
            &Options::new(),
            &paths(&["/a", "/b", "/c", "/d", "/lonely"]),
        );
        assert_eq!(
            build.spec.mounts,
            vec![
                ("/a".to_string(), "/b".to_string()),
                ("/c".to_string(), "/d".to_string()),
            ]
        );
    }

    #[test]
    fn run_spec_ignores_mistyped_options() {
        let opts = Options::new()
            .set(options::ENV, json!(12))
            .set(options::PORTS, json!("8080:80"))
            .set(options::CPU_SET, json!(["0", "1"]));

        let build = run_spec("alpine", &[], &opts, &[]);
        assert!(build.spec.env.is_empty());
        assert!(build.spec.ports.is_empty());
        assert_eq!(build.spec.cpuset, None);
    }

    #[test]
    fn run_spec_carries_env_ports_and_cpuset() {
        let opts = Options::new()
            .with_str_list(options::ENV, ["A=1"])
            .with_str_list(options::PORTS, ["8080:80"])
            .with_str(options::CPU_SET, "0-3");

        let build = run_spec("alpine", &["sh".to_string()], &opts, &[]);
        assert_eq!(build.spec.env, vec!["A=1".to_string()]);
        assert_eq!(build.spec.ports.len(), 1);
        assert_eq!(build.spec.cpuset.as_deref(), Some("0-3"));
        assert!(build.spec.tty);
        assert!(!build.spec.auto_remove);
        assert_eq!(build.display_cmd, "docker run -it --rm --env 'A=1' -p 8080:80 alpine sh");
    }

    #[test]
    fn start_spec_defaults_the_host_gateway_alias() {
        let build = start_spec("alpine", true, &[], &Options::new(), &[]);
        assert_eq!(
            build.spec.extra_hosts,
            vec!["host.docker.internal:host-gateway".to_string()]
        );
        assert!(build.spec.auto_remove);
    }

    #[test]
    fn start_spec_appends_add_host_entries() {
        let opts = Options::new().with_str(options::ADD_HOST, "a:1.2.3.4,b:5.6.7.8");
        let build = start_spec("alpine", false, &[], &opts, &[]);
        assert_eq!(
            build.spec.extra_hosts,
            vec![
                "host.docker.internal:host-gateway".to_string(),
                "a:1.2.3.4".to_string(),
                "b:5.6.7.8".to_string(),
            ]
        );
    }

    #[test]
    fn start_spec_parses_the_memory_limit() {
        let opts = Options::new().with_str(options::MEMORY_LIMIT, "1GB");
        let build = start_spec("alpine", false, &[], &opts, &[]);
        assert_eq!(build.spec.memory, Some(1_000_000_000));
        assert_eq!(build.spec.memory_swap, Some(-1));
    }

    #[test]
    fn start_spec_ignores_an_unparseable_memory_limit() {
        let opts = Options::new().with_str(options::MEMORY_LIMIT, "lots");
        let build = start_spec("alpine", false, &[], &opts, &[]);
        assert_eq!(build.spec.memory, None);
        assert_eq!(build.spec.memory_swap, None);
    }

    #[test]
    fn start_spec_applies_network_and_working_dir() {
        let opts = Options::new()
            .with_str(options::NETWORK, "bridge")
            .with_str(options::WORKING_DIR, "/work");
        let build = start_spec("alpine", false, &[], &opts, &[]);
        assert_eq!(build.spec.network_mode.as_deref(), Some("bridge"));
        assert_eq!(build.spec.working_dir.as_deref(), Some("/work"));
    }
}
