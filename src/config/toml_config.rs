use crate::config::FetchConfig;
use crate::utils::error::{EtlError, Result};
use regex::{Captures, Regex};
use std::path::Path;

impl FetchConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            EtlError::config(format!(
                "Cannot read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses TOML after `${VAR}` substitution. Missing sections fall back to the reference run.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content)
            .map_err(|e| EtlError::config(format!("TOML parsing error: {}", e)))
    }

}

/// Every `${VAR}` must be set; unset names are reported together.
fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .map_err(|e| EtlError::config(format!("Invalid substitution pattern: {}", e)))?;

    let mut missing: Vec<String> = Vec::new();
    let result = re.replace_all(content, |caps: &Captures| {
        let var_name = &caps[1];
        match std::env::var(var_name) {
            Ok(value) => value,
            Err(_) => {
                if !missing.iter().any(|m| m == var_name) {
                    missing.push(var_name.to_string());
                }
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        return Err(EtlError::config(format!(
            "environment variable {} is not set",
            missing.join(", ")
        )));
    }

    Ok(result.into_owned())
}
