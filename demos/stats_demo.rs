use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use slot_hash::HashTable;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "capacity", default_value_t = 1000)]
    capacity: u32,

    #[arg(short = 'l', long = "load_factor", default_value_t = 0.75)]
    load_factor: f32,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    println!(
        "Creating HashTable with capacity {} at load factor {}",
        args.capacity, args.load_factor
    );

    let result = HashTable::<u64, _>::new(args.capacity, args.load_factor, |v: &u64, k: &u64| {
        v == k
    });
    let mut table = match result {
        Ok(table) => table,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    println!(
        "Buckets: {} ({} bytes per slot)",
        table.bucket_count(),
        table.item_size()
    );
    println!("Filling table with u64 values...");

    let mut value = 0u64;
    while let Some(item) = table.acquire() {
        table[item] = value;
        table.insert(hash_u64(value), item);
        value += 1;
    }

    println!("Inserted {} values into table", table.len());

    let hist = table.chain_histogram();
    println!("chain length histogram:");
    for (length, count) in hist.iter().enumerate() {
        println!("{:>3} | {}", length, count);
    }
    table.debug_stats().print();
}
