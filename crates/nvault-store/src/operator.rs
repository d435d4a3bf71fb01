//! OpenDAL Operator factory for the blob root

use std::path::Path;

use anyhow::{Context, Result};
use opendal::Operator;

/// Build an OpenDAL Operator rooted at the blob directory.
///
/// The root is created if missing so a fresh deployment starts without
/// manual setup. Locators handed out by the blob store are paths relative
/// to this root.
pub fn build_operator(root: &Path) -> Result<Operator> {
    std::fs::create_dir_all(root)
        .with_context(|| format!("creating blob root {}", root.display()))?;

    // opendal 0.55: builders use the consuming pattern (methods take `self`)
    let builder = opendal::services::Fs::default().root(&root.to_string_lossy());

    let op = Operator::new(builder)
        .context("creating OpenDAL fs operator")?
        .layer(opendal::layers::LoggingLayer::default())
        .layer(
            opendal::layers::RetryLayer::new()
                .with_max_times(3)
                .with_jitter(),
        )
        .finish();

    Ok(op)
}
