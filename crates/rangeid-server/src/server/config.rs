use core::{num::NonZeroU64, time::Duration};

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use rangeid::{
    AllocatorConfig, DEFAULT_ALPHABET, DEFAULT_MIN_LENGTH, MAX_COUNTER_VALUE, RedisConfig,
    SqidsEncoder,
};

/// Runtime configuration for the `rangeid-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is honored), with defaults suitable for a single Redis-backed
/// deployment.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "rangeid-server",
    version,
    about = "An HTTP service issuing unique tracking numbers"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("0.0.0.0:8080"))]
    pub server_addr: String,

    /// Where the shared counter lives.
    ///
    /// `memory` keeps it in this process, which is only safe with a single
    /// instance.
    ///
    /// Environment variable: `STORE`
    #[arg(long, env = "STORE", value_enum, default_value_t = StoreKind::Redis)]
    pub store: StoreKind,

    /// URL of the Redis server holding the counter, e.g.
    /// `redis://:password@host:6379/0`.
    ///
    /// Environment variable: `REDIS_URL`
    #[arg(
        long,
        env = "REDIS_URL",
        default_value_t = String::from("redis://127.0.0.1:6379"),
        hide_env_values = true
    )]
    pub redis_url: String,

    /// Password sent with `AUTH` after connecting. Overrides one in the URL.
    ///
    /// Environment variable: `REDIS_PASSWORD`
    #[arg(long, env = "REDIS_PASSWORD", hide_env_values = true)]
    pub redis_password: Option<String>,

    /// Logical database selected after connecting. Overrides one in the URL.
    ///
    /// Environment variable: `REDIS_DB`
    #[arg(long, env = "REDIS_DB")]
    pub redis_db: Option<u8>,

    /// Upper bound for one counter round-trip, in milliseconds.
    ///
    /// Environment variable: `STORE_TIMEOUT_MS`
    #[arg(long, env = "STORE_TIMEOUT_MS", default_value_t = 1000)]
    pub store_timeout_ms: u64,

    /// Name of the shared counter. Every instance issuing from the same
    /// sequence must use the same key.
    ///
    /// Environment variable: `COUNTER_KEY`
    #[arg(long, env = "COUNTER_KEY", default_value_t = String::from("tracking_number_counter"))]
    pub counter_key: String,

    /// Number of values leased per counter round-trip.
    ///
    /// Larger batches mean fewer round-trips and larger gaps after restarts.
    ///
    /// Environment variable: `BATCH_SIZE`
    #[arg(long, env = "BATCH_SIZE", default_value_t = 1000)]
    pub batch_size: u64,

    /// Delay between checks while another request refills the range, in
    /// milliseconds.
    ///
    /// Environment variable: `RETRY_DELAY_MS`
    #[arg(long, env = "RETRY_DELAY_MS", default_value_t = 5)]
    pub retry_delay_ms: u64,

    /// How long a request may wait on another request's refill, in
    /// milliseconds. Unset waits indefinitely.
    ///
    /// Environment variable: `REFILL_WAIT_TIMEOUT_MS`
    #[arg(long, env = "REFILL_WAIT_TIMEOUT_MS")]
    pub refill_wait_timeout_ms: Option<u64>,

    /// Characters tracking numbers are made of.
    ///
    /// Environment variable: `ALPHABET`
    #[arg(long, env = "ALPHABET", default_value_t = String::from(DEFAULT_ALPHABET))]
    pub alphabet: String,

    /// Minimum tracking number length.
    ///
    /// Environment variable: `MIN_LENGTH`
    #[arg(long, env = "MIN_LENGTH", default_value_t = DEFAULT_MIN_LENGTH)]
    pub min_length: usize,

    /// Console log format.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Memory,
    Redis,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Validated settings, ready to build the store, allocator and encoder from.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub store: StoreKind,
    pub redis: RedisConfig,
    pub allocator: AllocatorConfig,
    pub encoder: SqidsEncoder,
    pub log_format: LogFormat,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let Some(batch_size) = NonZeroU64::new(args.batch_size) else {
            bail!("BATCH_SIZE must be greater than 0");
        };
        if args.batch_size > MAX_COUNTER_VALUE {
            bail!(
                "BATCH_SIZE ({}) exceeds the counter range (max = {})",
                args.batch_size,
                MAX_COUNTER_VALUE
            );
        }

        if args.store_timeout_ms == 0 {
            bail!("STORE_TIMEOUT_MS must be greater than 0");
        }

        if args.counter_key.is_empty() {
            bail!("COUNTER_KEY must not be empty");
        }

        let encoder = SqidsEncoder::builder()
            .alphabet(args.alphabet)
            .min_length(args.min_length)
            .build()
            .context("invalid ALPHABET or MIN_LENGTH")?;

        let mut redis = RedisConfig::new(args.redis_url)
            .with_timeout(Duration::from_millis(args.store_timeout_ms));
        if let Some(password) = args.redis_password {
            redis = redis.with_password(password);
        }
        if let Some(database) = args.redis_db {
            redis = redis.with_database(database);
        }
        if args.store == StoreKind::Redis {
            redis.client_config().context("invalid REDIS_URL")?;
        }

        let allocator = AllocatorConfig::new(args.counter_key, batch_size)
            .with_retry_delay(Duration::from_millis(args.retry_delay_ms))
            .with_wait_timeout(args.refill_wait_timeout_ms.map(Duration::from_millis));

        Ok(Self {
            server_addr: args.server_addr,
            store: args.store,
            redis,
            allocator,
            encoder,
            log_format: args.log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use clap::{CommandFactory, FromArgMatches};

    use super::*;

    /// The real command with every `env` binding removed, so variables set
    /// on the machine running the tests cannot leak in.
    fn isolated_command() -> clap::Command {
        CliArgs::command().mut_args(|arg| arg.env(None::<&'static str>))
    }

    fn parse(extra: &[&str]) -> anyhow::Result<ServerConfig> {
        let matches =
            isolated_command().try_get_matches_from(["rangeid-server"].iter().chain(extra))?;
        ServerConfig::try_from(CliArgs::from_arg_matches(&matches)?)
    }

    #[test]
    fn every_flag_reads_its_environment_variable() {
        let command = CliArgs::command();
        let env_of = |id: &str| {
            command
                .get_arguments()
                .find(|arg| arg.get_id() == id)
                .and_then(|arg| arg.get_env())
        };
        assert_eq!(env_of("batch_size"), Some(OsStr::new("BATCH_SIZE")));
        assert_eq!(env_of("store"), Some(OsStr::new("STORE")));
        assert_eq!(env_of("redis_url"), Some(OsStr::new("REDIS_URL")));

        assert!(
            isolated_command()
                .get_arguments()
                .all(|arg| arg.get_env().is_none())
        );
    }

    #[test]
    fn defaults_describe_a_redis_deployment() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.store, StoreKind::Redis);
        assert_eq!(config.redis.timeout, Duration::from_secs(1));
        assert_eq!(config.allocator.batch_size.get(), 1000);
        assert_eq!(config.allocator.retry_delay, Duration::from_millis(5));
        assert_eq!(config.allocator.wait_timeout, None);
        assert_eq!(config.encoder.min_length(), 16);
    }

    #[test]
    fn flags_override_defaults() {
        let config = parse(&[
            "--store",
            "memory",
            "--batch-size",
            "10",
            "--redis-db",
            "3",
            "--refill-wait-timeout-ms",
            "250",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.allocator.batch_size.get(), 10);
        assert_eq!(config.redis.database, Some(3));
        assert_eq!(
            config.allocator.wait_timeout,
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_unusable_values() {
        assert!(parse(&["--batch-size", "0"]).is_err());
        assert!(parse(&["--batch-size", "9223372036854775808"]).is_err());
        assert!(parse(&["--store-timeout-ms", "0"]).is_err());
        assert!(parse(&["--alphabet", "ab"]).is_err());
        assert!(parse(&["--min-length", "256"]).is_err());
        assert!(parse(&["--redis-url", "not a url"]).is_err());
        assert!(parse(&["--store", "memory", "--redis-url", "not a url"]).is_ok());
    }
}
