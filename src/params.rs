//! `${var}` substitution for suite configs.
//!
//! Values come from three places, in order: CLI-provided params, the
//! process environment via `${env:NAME}`, and defaults declared in the
//! config's own `params:` section. Credentials never need to live in the
//! YAML this way.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Runtime parameter values, usually from `-P key=value` CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, String>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse CLI args of the form `key=value`.
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut params = Self::new();
        for arg in args {
            let (key, value) = arg.split_once('=').ok_or_else(|| {
                Error::Config(format!("invalid param '{arg}', expected key=value"))
            })?;
            params.values.insert(key.to_string(), value.to_string());
        }
        Ok(params)
    }
}

/// Declaration of a parameter in the config's `params:` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ParamDef {
    #[serde(default)]
    pub required: bool,
    pub default: Option<String>,
    pub description: Option<String>,
}

/// Substitute `${var}` and `${env:NAME}` patterns in a string.
pub fn substitute(
    template: &str,
    params: &Params,
    defs: &HashMap<String, ParamDef>,
) -> Result<String> {
    let mut result = template.to_string();
    let mut start = 0;

    while let Some(var_start) = result[start..].find("${") {
        let var_start = start + var_start;
        let Some(var_end) = result[var_start..].find('}') else {
            break;
        };
        let var_end = var_start + var_end;
        let var_name = &result[var_start + 2..var_end];

        let value = if let Some(env_name) = var_name.strip_prefix("env:") {
            match std::env::var(env_name) {
                Ok(v) => v,
                Err(_) => {
                    return Err(Error::Config(format!(
                        "environment variable '{env_name}' is not set"
                    )));
                }
            }
        } else if let Some(v) = params.get(var_name) {
            v.to_string()
        } else if let Some(def) = defs.get(var_name) {
            if let Some(ref default) = def.default {
                default.clone()
            } else if def.required {
                return Err(Error::Config(format!(
                    "missing required parameter: {var_name}"
                )));
            } else {
                String::new()
            }
        } else {
            // Undeclared pattern; leave it for the application to interpret.
            start = var_end + 1;
            continue;
        };

        result.replace_range(var_start..=var_end, &value);
        start = var_start + value.len();
    }

    Ok(result)
}

/// Recursively substitute params in a YAML value tree.
pub fn substitute_value(
    value: &mut serde_yaml::Value,
    params: &Params,
    defs: &HashMap<String, ParamDef>,
) -> Result<()> {
    match value {
        serde_yaml::Value::String(s) => {
            *s = substitute(s, params, defs)?;
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                substitute_value(v, params, defs)?;
            }
        }
        serde_yaml::Value::Sequence(seq) => {
            for v in seq.iter_mut() {
                substitute_value(v, params, defs)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_cli_params() {
        let params = Params::new().set("user", "qa-bot");
        let defs = HashMap::new();
        assert_eq!(substitute("hello ${user}", &params, &defs).unwrap(), "hello qa-bot");
    }

    #[test]
    fn substitutes_multiple_occurrences() {
        let params = Params::new().set("a", "1").set("b", "2");
        let defs = HashMap::new();
        assert_eq!(substitute("${a}+${b}=${a}${b}", &params, &defs).unwrap(), "1+2=12");
    }

    #[test]
    fn falls_back_to_declared_default() {
        let params = Params::new();
        let mut defs = HashMap::new();
        defs.insert(
            "env_name".to_string(),
            ParamDef {
                required: false,
                default: Some("staging".to_string()),
                description: None,
            },
        );
        assert_eq!(substitute("${env_name}", &params, &defs).unwrap(), "staging");
    }

    #[test]
    fn missing_required_param_errors() {
        let mut defs = HashMap::new();
        defs.insert(
            "password".to_string(),
            ParamDef { required: true, default: None, description: None },
        );
        let err = substitute("${password}", &Params::new(), &defs).unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn env_prefix_reads_the_environment() {
        std::env::set_var("FAREFLOW_TEST_TOKEN", "tok-123");
        let out = substitute("${env:FAREFLOW_TEST_TOKEN}", &Params::new(), &HashMap::new()).unwrap();
        assert_eq!(out, "tok-123");
        std::env::remove_var("FAREFLOW_TEST_TOKEN");
    }

    #[test]
    fn unset_env_var_errors() {
        let err = substitute("${env:FAREFLOW_NO_SUCH_VAR}", &Params::new(), &HashMap::new())
            .unwrap_err();
        assert!(err.to_string().contains("FAREFLOW_NO_SUCH_VAR"));
    }

    #[test]
    fn undeclared_patterns_pass_through() {
        let out = substitute("${mystery}", &Params::new(), &HashMap::new()).unwrap();
        assert_eq!(out, "${mystery}");
    }

    #[test]
    fn params_from_cli_args() {
        let args = vec!["user=alice".to_string(), "env=prod".to_string()];
        let params = Params::from_args(&args).unwrap();
        assert_eq!(params.get("user"), Some("alice"));
        assert_eq!(params.get("env"), Some("prod"));
        assert!(Params::from_args(&["broken".to_string()]).is_err());
    }
}
