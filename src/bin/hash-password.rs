//! Prints a bcrypt hash suitable for `ADMIN_HASH_PASSWORD`.

use bcrypt::{hash, DEFAULT_COST};
use std::env;

fn main() {
    let password = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --bin hash-password <PASSWORD>");
        std::process::exit(1);
    });

    if password.trim().is_empty() {
        eprintln!("Refusing to hash an empty password");
        std::process::exit(1);
    }

    match hash(&password, DEFAULT_COST) {
        Ok(hashed) => {
            println!("Cost : {}", DEFAULT_COST);
            println!("Hash : {}\n", hashed);
            println!("# Add this to the studio backend .env:");
            println!("ADMIN_HASH_PASSWORD={}", hashed);
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
