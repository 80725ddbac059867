//! Build script for the shufflr binary.
//!
//! Copies the `.env.example` configuration template into the user's local
//! data directory (`<data_local_dir>/shufflr/.env.example`) so a fresh
//! install has a ready-to-edit template next to the place where the
//! application looks for its `.env` file.
//!
//! A missing template is reported as a cargo warning and does not fail the
//! build. Directory creation or write failures do.

use std::{env, fs, path::PathBuf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=.env.example");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let env_example_path = manifest_dir.join(".env.example");

    let mut out_dir = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    out_dir.push("shufflr");
    fs::create_dir_all(&out_dir)?;

    if env_example_path.is_file() {
        let contents = fs::read_to_string(&env_example_path)?;
        fs::write(out_dir.join(".env.example"), contents)?;
    } else {
        println!(
            "cargo:warning=.env.example not found at {}",
            env_example_path.display()
        );
    }

    Ok(())
}
