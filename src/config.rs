use anyhow::Result;
use log::debug;
use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
};
use std::path::PathBuf;

use crate::ensure::Ensurer;
use crate::http::HttpClient;
use crate::import::NodeModulesImporter;
use crate::package_manager::NpmCli;
use crate::registry::{ABBREVIATED_METADATA, NpmRegistry};
use crate::runtime::Runtime;

pub const DEFAULT_PROGRAM: &str = "npm";

/// Resolved settings for one invocation of the tool.
pub struct Config {
    /// The npm-compatible executable to drive.
    pub program: String,
    /// Registry base URL; `None` uses the public npm registry.
    pub registry_url: Option<String>,
    /// Absolute working directory every operation runs in.
    pub cwd: PathBuf,
    pub client: Client,
}

pub type DefaultEnsurer<R> = Ensurer<NpmCli<R>, NpmRegistry, NodeModulesImporter<R>>;

impl Config {
    pub fn new<R: Runtime>(
        runtime: &R,
        program: Option<String>,
        registry_url: Option<String>,
        cwd: Option<PathBuf>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ABBREVIATED_METADATA));
        if let Ok(token) = runtime.env_var("NPM_TOKEN") {
            let mut auth_value = HeaderValue::from_str(&format!("Bearer {}", token))?;
            auth_value.set_sensitive(true);
            headers.insert(AUTHORIZATION, auth_value);
            debug!("Using NPM_TOKEN for registry authentication: {}", mask(&token));
        }

        let client = Client::builder()
            .user_agent("ensure-pkg-cli")
            .default_headers(headers)
            .build()?;

        let cwd = match cwd {
            Some(dir) if dir.is_absolute() => dir,
            Some(dir) => runtime.current_dir()?.join(dir),
            None => runtime.current_dir()?,
        };

        Ok(Self {
            program: program.unwrap_or_else(|| DEFAULT_PROGRAM.to_string()),
            registry_url,
            cwd,
            client,
        })
    }

    /// Wire the npm CLI, registry and importer together over `runtime`.
    pub fn ensurer<R: Runtime + Clone>(&self, runtime: R) -> DefaultEnsurer<R> {
        let npm = NpmCli::new(runtime, self.program.clone());
        let registry = NpmRegistry::new(
            HttpClient::new(self.client.clone()),
            self.registry_url.clone(),
        );
        let importer = NodeModulesImporter::new(npm.clone());
        Ensurer::new(npm, registry, importer)
    }
}

fn mask(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 12 {
        return "*********".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}*********{}", head, tail)
}
