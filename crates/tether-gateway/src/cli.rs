use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "TETHER_LISTEN_ADDR";
pub const PUBLIC_BASE_URL_ENV: &str = "TETHER_PUBLIC_BASE_URL";
pub const STORAGE_BACKEND_ENV: &str = "TETHER_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "TETHER_MYSQL_DSN";
pub const STORAGE_TIMEOUT_MS_ENV: &str = "TETHER_STORAGE_TIMEOUT_MS";
pub const REUSE_GRACE_SECS_ENV: &str = "TETHER_REUSE_GRACE_SECS";
pub const GENERATOR_ENV: &str = "TETHER_GENERATOR";
pub const ALPHABET_ENV: &str = "TETHER_ALPHABET";
pub const CODE_LENGTH_ENV: &str = "TETHER_CODE_LENGTH";
pub const SEQ_OFFSET_ENV: &str = "TETHER_SEQ_OFFSET";
pub const MAX_ATTEMPTS_ENV: &str = "TETHER_MAX_ATTEMPTS";
pub const CACHE_BACKEND_ENV: &str = "TETHER_CACHE_BACKEND";
pub const CACHE_TTL_SECS_ENV: &str = "TETHER_CACHE_TTL_SECS";
pub const CACHE_CAPACITY_ENV: &str = "TETHER_CACHE_CAPACITY";
pub const REDIS_URL_ENV: &str = "TETHER_REDIS_URL";
pub const PRINCIPAL_HEADER_ENV: &str = "TETHER_PRINCIPAL_HEADER";
pub const LOG_FORMAT_ENV: &str = "TETHER_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_PUBLIC_BASE_URL: &str = "http://127.0.0.1:8080";
pub const DEFAULT_PRINCIPAL_HEADER: &str = "x-authenticated-user";
pub const MAX_CACHE_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorArg {
    Random,
    Sequential,
}

impl Display for GeneratorArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneratorArg::Random => write!(f, "random"),
            GeneratorArg::Sequential => write!(f, "sequential"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AlphabetArg {
    Base58,
    Base62,
}

impl Display for AlphabetArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AlphabetArg::Base58 => write!(f, "base58"),
            AlphabetArg::Base62 => write!(f, "base62"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    None,
    Moka,
    Redis,
    Layered,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::None => write!(f, "none"),
            CacheBackendArg::Moka => write!(f, "moka"),
            CacheBackendArg::Redis => write!(f, "redis"),
            CacheBackendArg::Layered => write!(f, "layered"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormatArg {
    Text,
    Json,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "tether-gateway", about = "HTTP front end for the Tether link shortener")]
pub struct Cli {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Base URL short links are built from.
    #[arg(long, env = PUBLIC_BASE_URL_ENV, default_value = DEFAULT_PUBLIC_BASE_URL)]
    pub public_base_url: String,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Upper bound for a single storage call, in milliseconds.
    #[arg(long, env = STORAGE_TIMEOUT_MS_ENV, default_value_t = 2000)]
    pub storage_timeout_ms: u64,

    /// Allow deleted codes to be reassigned after this many seconds.
    /// Deleted codes are never reused when unset.
    #[arg(long, env = REUSE_GRACE_SECS_ENV)]
    pub reuse_grace_secs: Option<u64>,

    #[arg(long, env = GENERATOR_ENV, value_enum, default_value_t = GeneratorArg::Random)]
    pub generator: GeneratorArg,

    #[arg(long, env = ALPHABET_ENV, value_enum, default_value_t = AlphabetArg::Base62)]
    pub alphabet: AlphabetArg,

    /// Length of random codes, or minimum width of sequential ones.
    #[arg(
        long,
        env = CODE_LENGTH_ENV,
        default_value_t = 7,
        value_parser = clap::value_parser!(u8).range(4..=32)
    )]
    pub code_length: u8,

    /// Lowest counter value the sequential generator may hand out. On
    /// startup the counter moves past any codes already in storage.
    #[arg(long, env = SEQ_OFFSET_ENV, default_value_t = 0)]
    pub seq_offset: u64,

    #[arg(
        long,
        env = MAX_ATTEMPTS_ENV,
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_attempts: u32,

    #[arg(long, env = CACHE_BACKEND_ENV, value_enum, default_value_t = CacheBackendArg::Moka)]
    pub cache: CacheBackendArg,

    #[arg(
        long,
        env = CACHE_TTL_SECS_ENV,
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..=MAX_CACHE_TTL_SECS)
    )]
    pub cache_ttl_secs: u64,

    #[arg(long, env = CACHE_CAPACITY_ENV, default_value_t = 10_000)]
    pub cache_capacity: u64,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq_any([("cache", "redis"), ("cache", "layered")]))]
    pub redis_url: Option<String>,

    /// Header carrying the authenticated user id, set by the upstream auth layer.
    #[arg(long, env = PRINCIPAL_HEADER_ENV, default_value = DEFAULT_PRINCIPAL_HEADER)]
    pub principal_header: String,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormatArg::Text)]
    pub log_format: LogFormatArg,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["tether-gateway"]).unwrap();
        assert_eq!(cli.storage, StorageBackendArg::InMemory);
        assert_eq!(cli.generator, GeneratorArg::Random);
        assert_eq!(cli.alphabet, AlphabetArg::Base62);
        assert_eq!(cli.cache, CacheBackendArg::Moka);
        assert_eq!(cli.code_length, 7);
        assert_eq!(cli.seq_offset, 0);
        assert_eq!(cli.max_attempts, 10);
        assert_eq!(cli.principal_header, DEFAULT_PRINCIPAL_HEADER);
    }

    #[test]
    fn mysql_requires_dsn() {
        assert!(Cli::try_parse_from(["tether-gateway", "--storage", "mysql"]).is_err());
        let cli = Cli::try_parse_from([
            "tether-gateway",
            "--storage",
            "mysql",
            "--mysql-dsn",
            "mysql://localhost/tether",
        ])
        .unwrap();
        assert_eq!(cli.mysql_dsn.as_deref(), Some("mysql://localhost/tether"));
    }

    #[test]
    fn redis_cache_requires_url() {
        assert!(Cli::try_parse_from(["tether-gateway", "--cache", "layered"]).is_err());
    }

    #[test]
    fn cache_ttl_is_bounded() {
        assert!(Cli::try_parse_from(["tether-gateway", "--cache-ttl-secs", "0"]).is_err());
        assert!(Cli::try_parse_from(["tether-gateway", "--cache-ttl-secs", "86401"]).is_err());
        let cli = Cli::try_parse_from(["tether-gateway", "--cache-ttl-secs", "86400"]).unwrap();
        assert_eq!(cli.cache_ttl_secs, MAX_CACHE_TTL_SECS);
    }

    #[test]
    fn code_length_is_bounded() {
        assert!(Cli::try_parse_from(["tether-gateway", "--code-length", "3"]).is_err());
        assert!(Cli::try_parse_from(["tether-gateway", "--code-length", "33"]).is_err());
    }
}
