use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;

use wallet_rs::{
    Amount, Email, PasswordHash, TransactionKind, ValidatedPassword, audit_card_balance,
    create_card, create_user_with_default_card, initialize_db, open_connection,
    record_transaction,
};

/// A utility for creating a test database for the wallet REST API server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    if output_path
        .extension()
        .is_none_or(|extension| extension.is_empty())
    {
        eprintln!("Output path must include a file extension (e.g., 'wallet.db').");
        exit(1);
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = open_connection(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user test@example.com with password 'test'...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;
    let (user, everyday_card) = create_user_with_default_card(
        "Test User",
        Email::new("test@example.com")?,
        password_hash,
        &conn,
    )?;
    let savings_card = create_card(user.id, "Savings", 0, &conn)?;

    println!("Recording transactions...");

    let transactions = [
        (everyday_card.id, TransactionKind::Income, 250_000),
        (everyday_card.id, TransactionKind::Expense, 4_599),
        (everyday_card.id, TransactionKind::Expense, 12_000),
        (savings_card.id, TransactionKind::Income, 50_000),
        (savings_card.id, TransactionKind::Expense, 7_500),
    ];
    for (card_id, kind, amount) in transactions {
        record_transaction(card_id, kind, Amount::new(amount)?, &conn)?;
    }

    for card_id in [everyday_card.id, savings_card.id] {
        let audit = audit_card_balance(card_id, &conn)?;
        println!("Card {card_id} balance: {}", audit.stored_balance);
    }

    println!("Success!");

    Ok(())
}
