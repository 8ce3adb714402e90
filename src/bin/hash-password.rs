use blog_backend::config::AppConfig;
use blog_backend::credentials::CredentialStore;
use std::env;

fn main() {
    let password = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --bin hash-password <PASSWORD>");
        std::process::exit(1);
    });

    dotenvy::dotenv().ok();
    let store = CredentialStore::new(AppConfig::from_env().bcrypt_cost);

    match store.hash(&password) {
        Ok(hashed) => {
            println!("\nCost : {}", store.cost());
            println!("Hash : {}\n", hashed);
            println!("# Insert into the users table:");
            println!(
                "INSERT INTO users (email, password_hash, name) VALUES ('<email>', '{}', '<name>');",
                hashed
            );
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
