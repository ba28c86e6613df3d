use alloc::format;
use core::hash::Hash;
use core::hash::Hasher;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashTable as HashbrownHashTable;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;
use slot_hash::HashTable as SlotHashTable;

extern crate alloc;

trait KeyValuePair: Clone + Default {
    fn new(key: u64) -> Self;

    fn hash_key(&self) -> u64;
    fn eq_key(&self, other: &Self) -> bool;
}

#[derive(Clone, Default)]
struct TestItem {
    key: String,
    _value: u64,
}

impl KeyValuePair for TestItem {
    fn new(key: u64) -> Self {
        black_box(Self {
            key: format!("key_{:016X}", key),
            _value: key,
        })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

#[derive(Clone, Default)]
struct SmallTestItem {
    key: u64,
}

impl KeyValuePair for SmallTestItem {
    fn new(key: u64) -> Self {
        black_box(Self { key })
    }

    fn hash_key(&self) -> u64 {
        let mut hasher = SipHasher::new();
        self.key.hash(&mut hasher);
        hasher.finish()
    }

    fn eq_key(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 11),
    (1 << 12),
    (1 << 13),
    (1 << 14),
    (1 << 15),
    (1 << 16),
];

const LOAD_FACTOR: f32 = 0.75;

type Table<T> = SlotHashTable<T, fn(&T, &T) -> bool>;

fn new_slot_table<TestItem: KeyValuePair>(size: usize) -> Table<TestItem> {
    SlotHashTable::new(
        size as u32,
        LOAD_FACTOR,
        TestItem::eq_key as fn(&TestItem, &TestItem) -> bool,
    )
    .expect("bench table allocation")
}

fn random_items<TestItem: KeyValuePair>(count: usize) -> Vec<(u64, TestItem)> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| {
            let item = TestItem::new(rng.try_next_u64().unwrap());
            (item.hash_key(), item)
        })
        .collect()
}

fn fill_slot_table<TestItem: KeyValuePair>(
    size: usize,
    hash_and_item: &[(u64, TestItem)],
) -> Table<TestItem> {
    let mut table = new_slot_table::<TestItem>(size);
    for (hash, item) in hash_and_item.iter() {
        let slot = table.acquire().unwrap();
        table[slot] = item.clone();
        table.insert(*hash, slot);
    }
    table
}

fn fill_hashbrown<TestItem: KeyValuePair>(
    hash_and_item: &[(u64, TestItem)],
) -> HashbrownHashTable<TestItem> {
    let mut table = HashbrownHashTable::with_capacity(hash_and_item.len());
    for (hash, item) in hash_and_item.iter() {
        table.insert_unique(*hash, item.clone(), |v| v.hash_key());
    }
    table
}

fn bench_insert_random<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "insert_random_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let hash_and_item = random_items::<TestItem>(*size);

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function("slot_hash", |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    (new_slot_table::<TestItem>(*size), hash_and_item)
                },
                |(mut table, hash_and_item)| {
                    for (hash, item) in hash_and_item.into_iter() {
                        let slot = table.acquire().unwrap();
                        table[slot] = item;
                        table.insert(hash, slot);
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || {
                    let mut hash_and_item = hash_and_item.clone();
                    hash_and_item.shuffle(&mut SmallRng::from_os_rng());
                    (HashbrownHashTable::<TestItem>::with_capacity(*size), hash_and_item)
                },
                |(mut table, hash_and_item)| {
                    for (hash, item) in hash_and_item.into_iter() {
                        black_box(table.insert_unique(hash, item, |v: &TestItem| v.hash_key()));
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_find_hit<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "find_hit_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let mut hash_and_item = random_items::<TestItem>(*size);
        let slot_table = fill_slot_table(*size, &hash_and_item);
        let hashbrown_table = fill_hashbrown(&hash_and_item);
        hash_and_item.shuffle(&mut SmallRng::from_os_rng());

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function("slot_hash", |b| {
            b.iter(|| {
                for (hash, item) in hash_and_item.iter() {
                    black_box(slot_table.find(*hash, item));
                }
            })
        });

        group.bench_function("hashbrown", |b| {
            b.iter(|| {
                for (hash, item) in hash_and_item.iter() {
                    black_box(hashbrown_table.find(*hash, |v| v.eq_key(item)));
                }
            })
        });
    }

    group.finish();
}

fn bench_find_zipf<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "find_zipf_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let hash_and_item = random_items::<TestItem>(*size);
        let slot_table = fill_slot_table(*size, &hash_and_item);
        let hashbrown_table = fill_hashbrown(&hash_and_item);

        let mut rng = SmallRng::from_os_rng();
        let distr = Zipf::new(*size as f32, 1.0).unwrap();
        let lookups = (0..*size)
            .map(|_| rng.sample(distr) as usize - 1)
            .collect::<Vec<usize>>();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function("slot_hash", |b| {
            b.iter(|| {
                for index in lookups.iter() {
                    let (hash, item) = &hash_and_item[*index];
                    black_box(slot_table.find(*hash, item));
                }
            })
        });

        group.bench_function("hashbrown", |b| {
            b.iter(|| {
                for index in lookups.iter() {
                    let (hash, item) = &hash_and_item[*index];
                    black_box(hashbrown_table.find(*hash, |v| v.eq_key(item)));
                }
            })
        });
    }

    group.finish();
}

fn bench_churn<TestItem: KeyValuePair, const MAX_SIZE: usize>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!(
        "churn_{}",
        core::any::type_name::<TestItem>()
    ));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for size in SIZES[..=MAX_SIZE].iter() {
        let hash_and_item = random_items::<TestItem>(*size);
        let replacements = random_items::<TestItem>(*size);

        // Each element is one delete plus one insert into the freed slot.
        group.throughput(Throughput::Elements(*size as u64 * 2));
        group.bench_function("slot_hash", |b| {
            b.iter_batched(
                || fill_slot_table(*size, &hash_and_item),
                |mut table| {
                    for ((hash, item), (new_hash, new_item)) in
                        hash_and_item.iter().zip(replacements.iter())
                    {
                        let slot = table.delete(*hash, item).unwrap();
                        table.release(slot);
                        let slot = table.acquire().unwrap();
                        table[slot] = new_item.clone();
                        table.insert(*new_hash, slot);
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function("hashbrown", |b| {
            b.iter_batched(
                || fill_hashbrown(&hash_and_item),
                |mut table| {
                    for ((hash, item), (new_hash, new_item)) in
                        hash_and_item.iter().zip(replacements.iter())
                    {
                        if let Ok(entry) = table.find_entry(*hash, |v| v.eq_key(item)) {
                            black_box(entry.remove());
                        }
                        table.insert_unique(*new_hash, new_item.clone(), |v| v.hash_key());
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallTestItem, 6>,
    bench_insert_random::<TestItem, 6>,
    bench_find_hit::<SmallTestItem, 6>,
    bench_find_hit::<TestItem, 6>,
    bench_find_zipf::<SmallTestItem, 6>,
    bench_find_zipf::<TestItem, 6>,
    bench_churn::<SmallTestItem, 6>,
    bench_churn::<TestItem, 6>,
);

criterion_main!(benches);
