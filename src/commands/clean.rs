use anyhow::{Context, Result};
use std::io::Read;
use std::path::PathBuf;
use wikiprose::{config::Config, import::filter::is_redirect_body};

pub fn clean_file(config: &Config, file: Option<PathBuf>) -> Result<()> {
    let wikitext = match file {
        Some(ref path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read wikitext from stdin")?;
            buf
        }
    };

    if is_redirect_body(&wikitext) {
        eprintln!("note: this is a redirect page and would be skipped during extraction");
    }

    let cleaned = config.cleaner.build_cleaner().clean(&wikitext);
    println!("{}", cleaned);

    match config.cleaner.build_residue_gate().find(&cleaned) {
        Some(token) => eprintln!("residue: '{}' found, document would be rejected", token),
        None => eprintln!("residue: none"),
    }

    Ok(())
}
