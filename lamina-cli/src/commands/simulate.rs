use anyhow::{bail, Context, Result};
use lamina_core::builder::CacheBuilder;
use lamina_core::cache::SharedCache;
use lamina_core::error::CacheResult;
use lamina_core::key::{CacheKey, KeyPart};
use lamina_core::transaction::TransactionalCacheManager;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;
use std::sync::Arc;

/// Fraction of transactions abandoned instead of committed
const ROLLBACK_PROBABILITY: f64 = 0.05;

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub ops: usize,
    pub keys: usize,
    pub seed: u64,
    pub tx_size: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub hits: u64,
    pub misses: u64,
    pub commits: u64,
    pub rollbacks: u64,
    pub size: usize,
}

impl SimulationReport {
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Build the namespace's chain and run the workload against it.
pub fn run(config_path: &Path, namespace: &str, options: &SimulationOptions) -> Result<()> {
    let config = super::load_config(config_path)?;
    let Some(cache_config) = config.cache(namespace) else {
        bail!("no cache named \"{}\" in {}", namespace, config_path.display());
    };
    if options.keys == 0 || options.tx_size == 0 {
        bail!("--keys and --tx-size must be greater than 0");
    }

    let cache: SharedCache<String> = CacheBuilder::from_config(namespace, cache_config)?.build()?;
    log::info!("simulating {} lookups over {} keys against cache {}", options.ops, options.keys, namespace);
    let report = simulate(&cache, options)
        .with_context(|| format!("simulation against cache {} failed", namespace))?;

    println!("cache:      {}", namespace);
    println!("operations: {}", options.ops);
    println!("hits:       {}", report.hits);
    println!("misses:     {}", report.misses);
    println!("hit ratio:  {:.4}", report.hit_ratio());
    println!("commits:    {}", report.commits);
    println!("rollbacks:  {}", report.rollbacks);
    println!("size:       {}", report.size);
    Ok(())
}

/// Read-through workload: every miss is populated inside the same transaction.
pub fn simulate(cache: &SharedCache<String>, options: &SimulationOptions) -> CacheResult<SimulationReport> {
    let mut rng = StdRng::seed_from_u64(options.seed);
    let mut manager = TransactionalCacheManager::new();
    let mut report = SimulationReport::default();
    if options.keys == 0 {
        return Ok(report);
    }
    let tx_size = options.tx_size.max(1);

    for op in 1..=options.ops {
        let id = rng.gen_range(0..options.keys);
        let key = CacheKey::from_parts([KeyPart::from("simulate"), KeyPart::from(id)]);
        if manager.get_object(cache, &key)?.is_some() {
            report.hits += 1;
        } else {
            report.misses += 1;
            manager.put_object(cache, key, Arc::new(format!("value-{}", id)));
        }

        if op % tx_size == 0 || op == options.ops {
            finish(&mut manager, &mut rng, &mut report)?;
        }
    }

    report.size = cache.size();
    Ok(report)
}

fn finish(
    manager: &mut TransactionalCacheManager<String>,
    rng: &mut StdRng,
    report: &mut SimulationReport,
) -> CacheResult<()> {
    if rng.gen_bool(ROLLBACK_PROBABILITY) {
        manager.rollback();
        report.rollbacks += 1;
    } else {
        manager.commit()?;
        report.commits += 1;
    }
    Ok(())
}
