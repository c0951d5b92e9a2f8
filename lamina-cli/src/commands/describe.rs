use anyhow::Result;
use lamina_core::builder::{describe, CacheBuilder};
use lamina_core::config::LaminaConfig;
use std::fmt::Write;
use std::path::Path;

/// Print the chain every configured namespace resolves to.
pub fn run(config_path: &Path) -> Result<()> {
    let config = super::load_config(config_path)?;
    if config.caches.is_empty() {
        println!("No caches configured in {}.", config_path.display());
        return Ok(());
    }
    print!("{}", render(&config)?);
    Ok(())
}

fn render(config: &LaminaConfig) -> Result<String> {
    let mut out = String::new();
    for (id, cache) in &config.caches {
        let layers = CacheBuilder::from_config(id.as_str(), cache)?.layers()?;
        writeln!(out, "{}: {}", id, describe(&layers))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn renders_each_namespace() {
        let config: LaminaConfig = toml::from_str(
            "[caches.users]\neviction = \"fifo\"\nsize = 4\n\n[caches.sessions]\neviction = \"weak\"\nread_write = false\nblocking = true\n",
        )
        .unwrap();

        let out = render(&config).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "sessions: perpetual -> weak(hard_refs=256, collect_every=64) -> logging -> synchronized -> blocking",
                "users: perpetual -> fifo(capacity=4) -> serialized -> logging -> synchronized",
            ]
        );
    }

    #[test]
    fn rejects_unknown_eviction() {
        let config: LaminaConfig = toml::from_str("[caches.users]\neviction = \"mru\"\n").unwrap();
        let err = render(&config).unwrap_err();
        assert!(err.to_string().contains("mru"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(run(&tmp.path().join("absent.toml")).is_err());
    }

    #[test]
    fn describes_file_on_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("lamina.toml");
        fs::write(&path, "[caches.users]\nsize = 8\n").unwrap();
        assert!(run(&path).is_ok());
    }
}
