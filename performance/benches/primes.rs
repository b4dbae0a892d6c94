use criterion::{criterion_group, criterion_main, Criterion};

const PRIMES_ROFF: &str = include_str!("primes.roff");

pub fn primes_bench(c: &mut Criterion) {
    let n = match std::env::var("PRIMES_N") {
        Ok(val) => match val.parse::<usize>() {
            Ok(val) => val,
            Err(_) => panic!["Failed to parse env var PRIMES_N={} as an integer", val],
        },
        Err(_) => 2000,
    };
    let roff_input = str::replace(PRIMES_ROFF, r"\n[n]<2000", &format![r"\n[n]<{}", n]);

    let mut group = c.benchmark_group("primes");

    group.bench_function("primes_roffcraft", |b| {
        b.iter(|| performance::run_in_roffcraft(&roff_input))
    });

    if performance::host_has_groff() {
        group.bench_function("primes_groff", |b| {
            b.iter(|| {
                performance::run_in_groff(&roff_input);
            })
        });
    } else {
        println!("Skipping groff benchmark as groff is not installed (`which groff` failed).");
    }
}

criterion_group!(benches, primes_bench);
criterion_main!(benches);
