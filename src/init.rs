use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::settings::{default_config_path, Settings};

const REMOTE_EXAMPLE: &str = r#"
# Keep the ledger in a file of a hosted repository instead. The token may also
# be given through PURSE_STORE__REMOTE__TOKEN.
#
# [store.remote]
# owner = "me"
# repo = "finances"
# path = "data.csv"
# branch = "main"
# token = "..."
# mirror_url = "https://raw.githubusercontent.com/me/finances/main/data.csv"
# message = "Update ledger"
"#;

fn render() -> Result<String> {
    let mut out = toml::to_string_pretty(&Settings::default())?;
    out.push_str(REMOTE_EXAMPLE);
    Ok(out)
}

fn write_config(path: &Path, force: bool) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        if path.exists() {
            bail!(
                "{} already exists, pass --force to overwrite it",
                path.display()
            );
        }
        options.create_new(true);
    }

    let mut fd = options
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    fd.write_all(render()?.as_bytes())?;

    Ok(())
}

pub(crate) fn run(conf_path: Option<&str>, force: bool) -> Result<()> {
    let path = match conf_path {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(default_config_path()),
    };

    write_config(&path, force)?;
    println!("Wrote configuration to {}", path.display());

    Ok(())
}
