use std::path::{Path, PathBuf};

use clap::Args;
use container_mcap::{Compression, SinkOptions};
use reduce_api::LogHeader;
use reduce_engine::{DEFAULT_MAX_FREQUENCY, PolicyConfig, PolicyKind, ReduceOptions};
use serde::Deserialize;

use super::error::CliError;

pub const DEFAULT_SUFFIX: &str = "_reduced";
pub const DEFAULT_LIBRARY: &str = "mcap-reduce";
pub const DEFAULT_PROFILE: &str = "reducer";

const INPUT_EXTENSION: &str = "mcap";

// ═══════════════════════════════════════════════════════════════
//  Config file (TOML)
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    pub message_frequency: Option<f64>,
    pub policy: Option<PolicyKind>,
    pub compression: Option<Compression>,
    pub chunk_size: Option<u64>,
    pub suffix: Option<String>,
    pub library: Option<String>,
    pub profile: Option<String>,
}

pub fn load_config(path: &str) -> Result<Config, CliError> {
    let content = std::fs::read_to_string(path).map_err(|e| CliError::Config {
        context: "read",
        detail: format!("cannot read config {path}: {e}"),
    })?;
    parse_config(&content).map_err(|e| CliError::Config {
        context: "parse",
        detail: format!("bad config {path}: {e}"),
    })
}

fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

// ═══════════════════════════════════════════════════════════════
//  CLI args
// ═══════════════════════════════════════════════════════════════

#[derive(Args, Clone, Debug, Default)]
pub struct ReduceArgs {
    /// Входные файлы (*.mcap), остальные аргументы пропускаются
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Путь к mcap-reduce.toml
    #[arg(long, default_value = "mcap-reduce.toml", env = "MCAP_REDUCE_CONFIG")]
    pub config: String,

    /// Максимальная частота канала, Гц (по умолчанию 50)
    #[arg(
        long = "messageFrequency",
        visible_alias = "message-frequency",
        value_name = "HZ",
        allow_hyphen_values = true
    )]
    pub message_frequency: Option<String>,

    /// Политика прореживания: modulo | toggle
    #[arg(long)]
    pub policy: Option<PolicyKind>,

    /// Сжатие чанков: zstd | lz4 | none
    #[arg(long)]
    pub compression: Option<Compression>,

    /// Размер чанка в байтах (по умолчанию как у writer)
    #[arg(long)]
    pub chunk_size: Option<u64>,

    /// Суффикс имени выходного файла
    #[arg(long)]
    pub suffix: Option<String>,
}

// ═══════════════════════════════════════════════════════════════
//  Effective: merged config
// ═══════════════════════════════════════════════════════════════

/// Итоговая конфигурация после мержа: config.toml < env/CLI
#[derive(Debug, Clone)]
pub struct Effective {
    pub inputs: Vec<PathBuf>,
    pub policy: PolicyConfig,
    pub sink: SinkOptions,
    pub header: LogHeader,
    pub suffix: String,
}

impl Effective {
    pub fn new(args: &ReduceArgs) -> Result<Self, CliError> {
        let cfg = match load_config(&args.config) {
            Ok(c) => c,
            Err(e) => {
                if Path::new(&args.config).exists() {
                    return Err(e);
                }
                Config::default()
            }
        };
        Self::merge(args, cfg)
    }

    fn merge(args: &ReduceArgs, cfg: Config) -> Result<Self, CliError> {
        let suffix = args
            .suffix
            .clone()
            .or(cfg.suffix)
            .unwrap_or_else(|| DEFAULT_SUFFIX.into());
        if suffix.is_empty() {
            return Err(CliError::Config {
                context: "suffix",
                detail: "output suffix must not be empty, it would overwrite the input".into(),
            });
        }

        Ok(Self {
            inputs: select_inputs(&args.inputs),
            policy: PolicyConfig {
                kind: args.policy.or(cfg.policy).unwrap_or_default(),
                max_frequency: resolve_frequency(
                    args.message_frequency.as_deref(),
                    cfg.message_frequency,
                ),
            },
            sink: SinkOptions {
                compression: args.compression.or(cfg.compression).unwrap_or_default(),
                chunk_size: args.chunk_size.or(cfg.chunk_size),
            },
            header: LogHeader {
                library: cfg.library.unwrap_or_else(|| DEFAULT_LIBRARY.into()),
                profile: cfg.profile.unwrap_or_else(|| DEFAULT_PROFILE.into()),
            },
            suffix,
        })
    }

    pub fn reduce_options(&self) -> ReduceOptions {
        ReduceOptions {
            header: self.header.clone(),
            policy: self.policy,
        }
    }
}

/// Keep `*.mcap` arguments, warn about the rest.
pub fn select_inputs(args: &[PathBuf]) -> Vec<PathBuf> {
    args.iter()
        .filter(|path| {
            let keep = path.extension().is_some_and(|ext| ext == INPUT_EXTENSION);
            if !keep {
                tracing::warn!(argument = %path.display(), "not an .mcap file, ignored");
            }
            keep
        })
        .cloned()
        .collect()
}

/// Flag value first, then the config file, then the default. A value that is
/// not a positive finite number is ignored with a warning.
pub fn resolve_frequency(flag: Option<&str>, configured: Option<f64>) -> f64 {
    if let Some(raw) = flag {
        match parse_frequency(raw) {
            Some(hz) => return hz,
            None => tracing::warn!(value = raw, "unusable --messageFrequency ignored"),
        }
    }
    match configured {
        Some(hz) if usable(hz) => hz,
        Some(hz) => {
            tracing::warn!(value = hz, "unusable message_frequency in config ignored");
            DEFAULT_MAX_FREQUENCY
        }
        None => DEFAULT_MAX_FREQUENCY,
    }
}

fn parse_frequency(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|hz| usable(*hz))
}

fn usable(hz: f64) -> bool {
    hz.is_finite() && hz > 0.0
}
