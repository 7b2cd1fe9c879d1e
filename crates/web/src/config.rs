use anyhow::Context;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use translator::TranslatorConfig;

pub(crate) const DEFAULT_CONFIG_PATH: &str = "config/nl2cq.toml";
const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_MAX_QUESTION_CHARS: usize = 500;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FileConfig {
    pub(crate) listen_addr: Option<String>,
    pub(crate) max_question_chars: Option<usize>,
    pub(crate) translator: Option<TranslatorSection>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct TranslatorSection {
    pub(crate) program: Option<String>,
    pub(crate) args: Option<Vec<String>>,
    pub(crate) working_dir: Option<PathBuf>,
    pub(crate) env: Option<BTreeMap<String, String>>,
    pub(crate) timeout_ms: Option<u64>,
    /// Humantime form, e.g. "10s" or "1500ms". Wins over `timeout_ms`.
    pub(crate) timeout: Option<String>,
    pub(crate) max_output_bytes: Option<usize>,
}

#[derive(Debug, Clone)]
pub(crate) struct ServiceConfig {
    pub(crate) listen_addr: SocketAddr,
    pub(crate) max_question_chars: usize,
    pub(crate) translator: TranslatorConfig,
}

/// Loads the service config. Without an explicit path the default location is
/// optional; an explicit path must exist.
pub(crate) fn load_service_config(
    explicit: Option<&Path>,
    listen_override: Option<&str>,
) -> anyhow::Result<ServiceConfig> {
    let file = match explicit {
        Some(path) => read_file_config(path)?,
        None => {
            let path = Path::new(DEFAULT_CONFIG_PATH);
            if path.exists() {
                read_file_config(path)?
            } else {
                tracing::info!(
                    path = DEFAULT_CONFIG_PATH,
                    "config file not found, using defaults"
                );
                FileConfig::default()
            }
        }
    };
    resolve_service_config(file, listen_override)
}

fn read_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}

pub(crate) fn resolve_service_config(
    file: FileConfig,
    listen_override: Option<&str>,
) -> anyhow::Result<ServiceConfig> {
    let listen_raw = listen_override
        .map(str::to_string)
        .or(file.listen_addr)
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
    let listen_addr = listen_raw
        .trim()
        .parse()
        .with_context(|| format!("invalid listen_addr {listen_raw}"))?;

    let max_question_chars = file
        .max_question_chars
        .unwrap_or(DEFAULT_MAX_QUESTION_CHARS);
    if max_question_chars == 0 {
        anyhow::bail!("max_question_chars must be greater than zero");
    }

    let translator = resolve_translator(file.translator.unwrap_or_default())?;
    translator.validate()?;

    Ok(ServiceConfig {
        listen_addr,
        max_question_chars,
        translator,
    })
}

fn resolve_translator(section: TranslatorSection) -> anyhow::Result<TranslatorConfig> {
    let defaults = TranslatorConfig::default();
    let program_set = section.program.is_some();
    let timeout = match (section.timeout.as_deref(), section.timeout_ms) {
        (Some(raw), _) => humantime::parse_duration(raw.trim())
            .with_context(|| format!("invalid translator timeout {raw}"))?,
        (None, Some(ms)) => Duration::from_millis(ms),
        (None, None) => defaults.timeout,
    };
    Ok(TranslatorConfig {
        program: section.program.unwrap_or(defaults.program),
        // A custom program with no args runs without the default script name.
        args: match (section.args, program_set) {
            (Some(args), _) => args,
            (None, true) => Vec::new(),
            (None, false) => defaults.args,
        },
        working_dir: section.working_dir,
        env: section.env.unwrap_or_default(),
        timeout,
        max_output_bytes: section
            .max_output_bytes
            .unwrap_or(defaults.max_output_bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> anyhow::Result<ServiceConfig> {
        let file: FileConfig = toml::from_str(input)?;
        resolve_service_config(file, None)
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_question_chars, 500);
        assert_eq!(config.translator, TranslatorConfig::default());
    }

    #[test]
    fn full_config_is_resolved() {
        let config = parse(
            r#"
listen_addr = "0.0.0.0:9000"
max_question_chars = 200

[translator]
program = "python3"
args = ["Tokenize.py"]
working_dir = "nlp"
timeout = "1500ms"
max_output_bytes = 4096

[translator.env]
NLTK_DATA = "/usr/share/nltk_data"
"#,
        )
        .unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.max_question_chars, 200);
        assert_eq!(config.translator.args, vec!["Tokenize.py".to_string()]);
        assert_eq!(config.translator.working_dir, Some(PathBuf::from("nlp")));
        assert_eq!(config.translator.timeout, Duration::from_millis(1500));
        assert_eq!(config.translator.max_output_bytes, 4096);
        assert_eq!(
            config.translator.env.get("NLTK_DATA").map(String::as_str),
            Some("/usr/share/nltk_data")
        );
    }

    #[test]
    fn timeout_ms_is_accepted() {
        let config = parse("[translator]\ntimeout_ms = 250\n").unwrap();
        assert_eq!(config.translator.timeout, Duration::from_millis(250));
    }

    #[test]
    fn custom_program_without_args_drops_default_script() {
        let config = parse("[translator]\nprogram = \"/usr/local/bin/nl2cq\"\n").unwrap();
        assert_eq!(config.translator.program, "/usr/local/bin/nl2cq");
        assert!(config.translator.args.is_empty());
    }

    #[test]
    fn listen_override_wins() {
        let file: FileConfig = toml::from_str("listen_addr = \"127.0.0.1:1\"").unwrap();
        let config = resolve_service_config(file, Some("127.0.0.1:2")).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:2".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(parse("listen_addr = \"not-an-addr\"").is_err());
        assert!(parse("max_question_chars = 0").is_err());
        assert!(parse("[translator]\ntimeout_ms = 0\n").is_err());
        assert!(parse("[translator]\ntimeout = \"soon\"\n").is_err());
        assert!(parse("[translator]\nprogram = \"\"\n").is_err());
        assert!(parse("[translator]\nmax_output_bytes = 0\n").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let parsed: Result<FileConfig, _> = toml::from_str("listen = \"127.0.0.1:1\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let missing = std::env::temp_dir().join("nl2cq-missing-config.toml");
        assert!(load_service_config(Some(missing.as_path()), None).is_err());
    }
}
