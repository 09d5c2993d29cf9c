use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use jiff::SignedDuration;
use tether_cache::{LayeredCache, MokaLinkCache, RedisLinkCache};
use tether_core::{LinkCache, LinkStore, ReusePolicy};
use tether_generator::{Alphabet, Generator, RandomGenerator, SeqGenerator};
use tether_resolver::{ResolutionService, ResolverConfig};
use tether_shortener::{LinkService, LinkServiceConfig, Shortener};
use tether_storage::{InMemoryLinkStore, MySqlLinkStore, ResilientStore, RetryConfig};
use tracing::info;

use crate::cli::{AlphabetArg, CacheBackendArg, Cli, GeneratorArg, StorageBackendArg};

/// Wires the link service described by `cli`.
pub async fn build_shortener(cli: &Cli) -> anyhow::Result<Arc<dyn Shortener>> {
    let store = build_store(cli).await?;
    let generator = build_generator(cli, store.as_ref()).await?;

    let resolver_config = ResolverConfig::builder()
        .cache_ttl(Duration::from_secs(cli.cache_ttl_secs))
        .build();
    let resolver = match build_cache(cli).await? {
        Some(cache) => {
            ResolutionService::with_cache(Arc::clone(&store), cache, resolver_config)
        }
        None => ResolutionService::new(Arc::clone(&store)),
    };

    let service = LinkService::new(
        store,
        generator,
        Arc::new(resolver),
        LinkServiceConfig::builder()
            .max_attempts(cli.max_attempts)
            .build(),
    );
    Ok(Arc::new(service))
}

fn reuse_policy(cli: &Cli) -> anyhow::Result<ReusePolicy> {
    match cli.reuse_grace_secs {
        None => Ok(ReusePolicy::Never),
        Some(secs) => {
            let secs = i64::try_from(secs).context("reuse grace period is too large")?;
            Ok(ReusePolicy::AfterGrace(SignedDuration::from_secs(secs)))
        }
    }
}

async fn build_store(cli: &Cli) -> anyhow::Result<Arc<dyn LinkStore>> {
    let reuse = reuse_policy(cli)?;
    let retry = RetryConfig::builder()
        .timeout(Duration::from_millis(cli.storage_timeout_ms))
        .build();

    let store: Arc<dyn LinkStore> = match cli.storage {
        StorageBackendArg::InMemory => Arc::new(ResilientStore::new(
            InMemoryLinkStore::with_reuse_policy(reuse),
            retry,
        )),
        StorageBackendArg::Mysql => {
            let dsn = cli
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlLinkStore::connect(dsn)
                .await
                .context("failed to connect to mysql")?
                .with_reuse_policy(reuse);
            store.migrate().await.context("failed to migrate mysql")?;
            Arc::new(ResilientStore::new(store, retry))
        }
    };

    info!(backend = %cli.storage, reuse = ?reuse, "storage ready");
    Ok(store)
}

async fn build_generator(
    cli: &Cli,
    store: &dyn LinkStore,
) -> anyhow::Result<Arc<dyn Generator>> {
    let alphabet = match cli.alphabet {
        AlphabetArg::Base58 => Alphabet::BASE58,
        AlphabetArg::Base62 => Alphabet::BASE62,
    };
    let length = usize::from(cli.code_length);

    let generator: Arc<dyn Generator> = match cli.generator {
        GeneratorArg::Random => Arc::new(
            RandomGenerator::new(alphabet, length).context("invalid generator settings")?,
        ),
        GeneratorArg::Sequential => {
            let generator = SeqGenerator::resume(alphabet, length, cli.seq_offset, store)
                .await
                .context("failed to resume the sequence from storage")?;
            info!(next = %generator.code_at(generator.position()), "sequence resumed");
            Arc::new(generator)
        }
    };

    info!(strategy = %cli.generator, alphabet = %cli.alphabet, length, "generator ready");
    Ok(generator)
}

async fn build_cache(cli: &Cli) -> anyhow::Result<Option<Arc<dyn LinkCache>>> {
    let redis = || async move {
        let url = cli
            .redis_url
            .as_deref()
            .context("redis url is required for the redis cache")?;
        RedisLinkCache::connect(url)
            .await
            .context("failed to connect to redis")
    };

    let cache: Option<Arc<dyn LinkCache>> = match cli.cache {
        CacheBackendArg::None => None,
        CacheBackendArg::Moka => Some(Arc::new(MokaLinkCache::with_capacity(cli.cache_capacity))),
        CacheBackendArg::Redis => Some(Arc::new(redis().await?)),
        CacheBackendArg::Layered => Some(Arc::new(LayeredCache::new(
            MokaLinkCache::with_capacity(cli.cache_capacity),
            redis().await?,
        ))),
    };

    info!(backend = %cli.cache, ttl_secs = cli.cache_ttl_secs, "cache ready");
    Ok(cache)
}
