use super::exit_codes;
use crate::cli::args::{ListArgs, Order};
use anyhow::Result;
use evalboard_core::storage::RecordStore;

pub fn run(args: ListArgs, store: &dyn RecordStore) -> Result<i32> {
    let mut records = match args.order {
        Order::Asc => store.list_all()?,
        Order::Desc => store.list_recent()?,
    };
    if let Some(n) = args.limit {
        records.truncate(n);
    }
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(exit_codes::OK)
}
