pub mod init;
pub mod modules;
pub mod run;

use anyhow::{Context, Result};
use url::Url;

/// Interpret a `BUNDLE` argument as a URL (`file`, `http`, `https`) or a local path
pub(crate) fn bundle_url(bundle: &str) -> Result<Url> {
    if let Ok(url) = Url::parse(bundle)
        && matches!(url.scheme(), "file" | "http" | "https")
    {
        return Ok(url);
    }

    let path = std::fs::canonicalize(bundle)
        .with_context(|| format!("Bundle {bundle} is neither a URL nor an existing file"))?;
    Url::from_file_path(&path)
        .map_err(|()| anyhow::anyhow!("Cannot express {} as a file URL", path.display()))
}
