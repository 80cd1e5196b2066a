//! Build script for storefront crate.
//!
//! Hashes `static/js/shop.js` so the page can reference it with a
//! content-based version and browsers never run a stale script.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    hash_script();
}

/// Sets `SHOP_JS_HASH` for use with `env!("SHOP_JS_HASH")`.
fn hash_script() {
    let manifest_dir =
        env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR must be set by Cargo");
    let script_path = Path::new(&manifest_dir).join("static/js/shop.js");

    println!("cargo:rerun-if-changed={}", script_path.display());

    let content = match fs::read(&script_path) {
        Ok(content) => content,
        Err(e) => {
            println!("cargo:warning=Could not read shop.js: {e}");
            println!("cargo:rustc-env=SHOP_JS_HASH=dev");
            return;
        }
    };

    // First 8 hex chars of SHA256
    let hash = format!("{:x}", Sha256::digest(&content));
    let short_hash = hash.get(..8).unwrap_or(&hash);

    println!("cargo:rustc-env=SHOP_JS_HASH={short_hash}");
}
