// evaluate.rs — Answer one JSON request with a configured PDP.

use std::io::Read;
use std::path::Path;

use anyhow::Context;
use xacml_config::ConfigurationStore;

pub fn execute(config: &Path, request: Option<&Path>, pdp: Option<&str>) -> anyhow::Result<()> {
    let store = ConfigurationStore::load(config)
        .with_context(|| format!("loading configuration {}", config.display()))?;
    let pdp = match pdp {
        Some(name) => store.pdp(name)?,
        None => store.default_pdp()?,
    };

    let input = match request {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading request {}", path.display()))?,
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("reading request from stdin")?;
            input
        }
    };

    println!("{}", pdp.evaluate_json(&input));
    Ok(())
}
