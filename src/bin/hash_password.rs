use vitalgate::auth::hash_password;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: hash-password <password>");
        std::process::exit(1);
    }

    match hash_password(&args[1]) {
        Ok(hash) => {
            println!("Password hash:");
            println!("{}", hash);
            println!();
            println!("Store it in users.password_hash, or use create-user to insert an account.");
        }
        Err(e) => {
            eprintln!("Error hashing password: {}", e);
            std::process::exit(1);
        }
    }
}
