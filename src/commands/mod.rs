pub mod check;
pub mod conflicts;
pub mod grid;
pub mod import;
pub mod search;
pub mod semester;

use anyhow::Result;
use serde::Serialize;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
