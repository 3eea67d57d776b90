use kabo_engine::game::GameConfig;
use kabo_engine::rules::{IllegalDecisionPolicy, Rules};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub seed: Option<u64>,
    pub ai: String,
    pub kabo_malus: u32,
    pub target: u32,
    pub decision_attempts: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Default,
    File,
    Env,
}

#[derive(Debug, Clone, Copy)]
pub struct ConfigSources {
    pub seed: ValueSource,
    pub ai: ValueSource,
    pub kabo_malus: ValueSource,
    pub target: ValueSource,
    pub decision_attempts: ValueSource,
}

impl Default for ConfigSources {
    fn default() -> Self {
        Self {
            seed: ValueSource::Default,
            ai: ValueSource::Default,
            kabo_malus: ValueSource::Default,
            target: ValueSource::Default,
            decision_attempts: ValueSource::Default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigResolved {
    pub config: Config,
    pub sources: ConfigSources,
}

impl Default for Config {
    fn default() -> Self {
        let rules = Rules::default();
        Self {
            seed: None,
            ai: "baseline".into(),
            kabo_malus: rules.kabo_malus,
            target: rules.target_point_value,
            decision_attempts: IllegalDecisionPolicy::default().attempts(),
        }
    }
}

impl Config {
    pub fn rules(&self) -> Rules {
        Rules {
            kabo_malus: self.kabo_malus,
            target_point_value: self.target,
            ..Rules::default()
        }
    }

    /// Engine configuration; `seed` overrides the configured one.
    pub fn game_config(&self, seed: Option<u64>) -> GameConfig {
        GameConfig {
            rules: self.rules(),
            illegal_decision: IllegalDecisionPolicy::Retry {
                max_attempts: self.decision_attempts,
            },
            seed: seed.or(self.seed),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}
impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "cannot read config file: {}", e),
            ConfigError::Parse(e) => write!(f, "cannot parse config file: {}", e),
            ConfigError::Invalid(msg) => f.write_str(msg),
        }
    }
}

pub fn load() -> Result<Config, ConfigError> {
    load_with_sources().map(|resolved| resolved.config)
}

pub fn load_with_sources() -> Result<ConfigResolved, ConfigError> {
    let mut cfg = Config::default();
    let mut sources = ConfigSources::default();

    if let Ok(path) = std::env::var("KABO_CONFIG") {
        let s = fs::read_to_string(path)?;
        let f: FileConfig = toml::from_str(&s)?;
        if let Some(v) = f.seed {
            cfg.seed = Some(v);
            sources.seed = ValueSource::File;
        }
        if let Some(v) = f.ai {
            cfg.ai = v;
            sources.ai = ValueSource::File;
        }
        if let Some(v) = f.kabo_malus {
            cfg.kabo_malus = v;
            sources.kabo_malus = ValueSource::File;
        }
        if let Some(v) = f.target {
            cfg.target = v;
            sources.target = ValueSource::File;
        }
        if let Some(v) = f.decision_attempts {
            cfg.decision_attempts = v;
            sources.decision_attempts = ValueSource::File;
        }
    }

    if let Ok(seed) = std::env::var("KABO_SEED")
        && !seed.is_empty()
    {
        cfg.seed = Some(
            seed.parse()
                .map_err(|_| ConfigError::Invalid("Invalid seed".into()))?,
        );
        sources.seed = ValueSource::Env;
    }
    if let Ok(ai) = std::env::var("KABO_AI")
        && !ai.is_empty()
    {
        cfg.ai = ai;
        sources.ai = ValueSource::Env;
    }
    if let Ok(malus) = std::env::var("KABO_KABO_MALUS")
        && !malus.is_empty()
    {
        cfg.kabo_malus = malus
            .parse()
            .map_err(|_| ConfigError::Invalid("Invalid kabo_malus".into()))?;
        sources.kabo_malus = ValueSource::Env;
    }
    if let Ok(target) = std::env::var("KABO_TARGET")
        && !target.is_empty()
    {
        cfg.target = target
            .parse()
            .map_err(|_| ConfigError::Invalid("Invalid target".into()))?;
        sources.target = ValueSource::Env;
    }
    if let Ok(attempts) = std::env::var("KABO_DECISION_ATTEMPTS")
        && !attempts.is_empty()
    {
        cfg.decision_attempts = attempts
            .parse()
            .map_err(|_| ConfigError::Invalid("Invalid decision_attempts".into()))?;
        sources.decision_attempts = ValueSource::Env;
    }

    validate(&cfg)?;
    Ok(ConfigResolved {
        config: cfg,
        sources,
    })
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    #[serde(default)]
    seed: Option<u64>,
    #[serde(default)]
    ai: Option<String>,
    #[serde(default)]
    kabo_malus: Option<u32>,
    #[serde(default)]
    target: Option<u32>,
    #[serde(default)]
    decision_attempts: Option<u32>,
}

fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if !kabo_ai::AI_KINDS.contains(&cfg.ai.as_str()) {
        return Err(ConfigError::Invalid(format!(
            "Invalid configuration: unknown ai '{}' (expected one of {})",
            cfg.ai,
            kabo_ai::AI_KINDS.join(", ")
        )));
    }
    if cfg.decision_attempts == 0 {
        return Err(ConfigError::Invalid(
            "Invalid configuration: decision_attempts must be >=1".into(),
        ));
    }
    cfg.rules()
        .validate()
        .map_err(|e| ConfigError::Invalid(format!("Invalid configuration: {}", e)))
}
