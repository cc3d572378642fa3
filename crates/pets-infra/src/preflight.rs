//! Checks run before anything is installed: the tools must be on the search
//! path and the image registry must answer.

use std::ffi::OsStr;
use std::path::PathBuf;

use tracing::{debug, info, instrument};
use ureq::OrAnyStatus;
use url::Url;

use crate::config::{InfraConfig, CLUSTER_REGISTRY_VAR, REGISTRY_VAR};
use crate::error::PreflightError;
use crate::runner::{ToolPaths, DOCKER, GIT, KUBECTL};

/// Registry hosts (`host[:port]`, no scheme) used to tag and pull the job image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoints {
    /// Where images are pushed from this machine
    pub push_host: String,
    /// Where pods pull images from
    pub cluster_host: String,
}

/// Resolves kubectl, docker and git, reporting the first one missing
#[instrument(skip(config))]
pub fn resolve_tools(config: &InfraConfig) -> Result<ToolPaths, PreflightError> {
    let search_path = config.search_path.as_deref();
    let paths = ToolPaths {
        kubectl: find_tool(KUBECTL, &config.kubectl, search_path)?,
        docker: find_tool(DOCKER, &config.docker, search_path)?,
        git: find_tool(GIT, &config.git, search_path)?,
    };
    Ok(paths)
}

fn find_tool(tool: &str, name: &str, search_path: Option<&OsStr>) -> Result<PathBuf, PreflightError> {
    let found = match search_path {
        Some(search_path) => which::which_in(name, Some(search_path), "."),
        None => which::which(name),
    };
    match found {
        Ok(path) => {
            info!("{tool} found in {}", path.display());
            Ok(path)
        }
        Err(err) => Err(PreflightError::ToolNotFound {
            tool: name.to_string(),
            err,
        }),
    }
}

/// Verifies the registry answers `200` on its check path
#[instrument(skip(config))]
pub fn check_registry(config: &InfraConfig) -> Result<RegistryEndpoints, PreflightError> {
    let registry = configured_registry(config)?;
    let endpoints = registry_endpoints(config)?;

    let check_url = format!(
        "{}{}",
        registry.trim_end_matches('/'),
        config.registry_check_path
    );
    debug!(%check_url, "checking docker registry");
    let response = ureq::get(&check_url)
        .call()
        .or_any_status()
        .map_err(|err| PreflightError::RegistryUnreachable {
            url: check_url.clone(),
            err,
        })?;
    if response.status() != 200 {
        return Err(PreflightError::RegistryStatus {
            url: check_url,
            status: response.status(),
        });
    }

    info!("docker registry found at {registry:?}");
    Ok(endpoints)
}

fn configured_registry(config: &InfraConfig) -> Result<&str, PreflightError> {
    config
        .registry_url
        .as_deref()
        .filter(|url| !url.is_empty())
        .ok_or(PreflightError::RegistryNotConfigured(REGISTRY_VAR))
}

/// Derives the registry hosts from the configuration without contacting the registry
pub fn registry_endpoints(config: &InfraConfig) -> Result<RegistryEndpoints, PreflightError> {
    let push_host = registry_host(configured_registry(config)?)?;
    let cluster_host = match config
        .cluster_registry_url
        .as_deref()
        .filter(|url| !url.is_empty())
    {
        Some(url) => registry_host(url)?,
        None => {
            debug!("{CLUSTER_REGISTRY_VAR} not set, pods pull from {push_host}");
            push_host.clone()
        }
    };
    Ok(RegistryEndpoints {
        push_host,
        cluster_host,
    })
}

/// `http://localhost:5000/` becomes `localhost:5000`
pub fn registry_host(registry: &str) -> Result<String, PreflightError> {
    let url = Url::parse(registry).map_err(|err| PreflightError::InvalidRegistryUrl {
        url: registry.to_string(),
        err,
    })?;
    let host = url
        .host_str()
        .ok_or_else(|| PreflightError::RegistryWithoutHost(registry.to_string()))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    use super::*;

    /// Answers a single request with `status_line` and returns the base url
    fn serve_once(status_line: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let base = format!("http://{}", listener.local_addr().expect("addr"));
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request_line = String::new();
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            reader.read_line(&mut request_line).expect("request line");
            loop {
                let mut header = String::new();
                reader.read_line(&mut header).expect("header");
                if header == "\r\n" || header.is_empty() {
                    break;
                }
            }
            write!(
                stream,
                "HTTP/1.1 {status_line}\r\nContent-Length: 2\r\nConnection: close\r\n\r\n{{}}"
            )
            .expect("response");
            request_line
        });
        (base, handle)
    }

    #[test]
    fn test_registry_ok() {
        let (base, server) = serve_once("200 OK");
        let config = InfraConfig::builder()
            .registry_url(format!("{base}/"))
            .cluster_registry_url("http://registry.kube-system.svc:5000")
            .build()
            .expect("config");

        let endpoints = check_registry(&config).expect("registry");
        let request_line = server.join().expect("server");
        assert!(request_line.starts_with("GET /v2/ "));
        assert_eq!(endpoints.push_host, base.trim_start_matches("http://"));
        assert_eq!(endpoints.cluster_host, "registry.kube-system.svc:5000");
    }

    #[test]
    fn test_registry_not_found() {
        let (base, server) = serve_once("404 Not Found");
        let config = InfraConfig::builder()
            .registry_url(base)
            .build()
            .expect("config");

        let err = check_registry(&config).unwrap_err();
        server.join().expect("server");
        assert!(matches!(err, PreflightError::RegistryStatus { status: 404, .. }));
    }

    #[test]
    fn test_registry_refused() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let config = InfraConfig::builder()
            .registry_url(format!("http://127.0.0.1:{port}"))
            .build()
            .expect("config");

        let err = check_registry(&config).unwrap_err();
        assert!(matches!(err, PreflightError::RegistryUnreachable { .. }));
    }

    #[test]
    fn test_registry_not_configured() {
        let config = InfraConfig::builder().build().expect("config");
        let err = check_registry(&config).unwrap_err();
        assert_eq!(
            err.to_string(),
            "error checking docker registry, variable DOCKER_REGISTRY does not exist"
        );
    }

    #[test]
    fn test_registry_host() {
        assert_eq!(registry_host("http://localhost:5000").expect("host"), "localhost:5000");
        assert_eq!(
            registry_host("https://registry.example.com/").expect("host"),
            "registry.example.com"
        );
        assert!(matches!(
            registry_host("localhost"),
            Err(PreflightError::InvalidRegistryUrl { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_tools() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().expect("temp dir");
        for tool in ["kubectl", "docker"] {
            let path = dir.path().join(tool);
            fs::write(&path, "#!/bin/sh\n").expect("write tool");
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod");
        }
        let config = InfraConfig::builder()
            .search_path(dir.path().as_os_str())
            .build()
            .expect("config");

        let err = resolve_tools(&config).unwrap_err();
        assert!(err.to_string().starts_with("not \"git\" path found"));

        let git = dir.path().join("git");
        fs::write(&git, "#!/bin/sh\n").expect("write git");
        fs::set_permissions(&git, fs::Permissions::from_mode(0o755)).expect("chmod");

        let paths = resolve_tools(&config).expect("tools");
        assert_eq!(paths.kubectl, dir.path().join("kubectl"));
        assert_eq!(paths.git, git);
    }
}
