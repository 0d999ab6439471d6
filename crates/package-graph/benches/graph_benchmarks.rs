//! Benchmarks for package graph operations
//!
//! Run with: cargo bench -p monorail-package-graph

#![allow(clippy::unwrap_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use monorail_package_graph::{GraphType, PackageGraph, QueryGraph, QueryOptions, batch_packages};
use monorail_workspace::Package;
use std::hint::black_box;

fn package(name: &str, deps: &[String]) -> Package {
    deps.iter().fold(
        Package::new(name, "1.0.0", format!("/repo/packages/{name}")),
        |package, dep| package.with_dependency(dep.clone(), "^1.0.0"),
    )
}

/// Generate a wide repo with many packages depending on a single root
fn generate_wide_repo(count: usize) -> Vec<Package> {
    let root = vec!["root".to_string()];
    std::iter::once(package("root", &[]))
        .chain((0..count).map(|i| package(&format!("pkg_{i}"), &root)))
        .collect()
}

/// Generate a deep repo with a linear dependency chain
fn generate_deep_repo(depth: usize) -> Vec<Package> {
    (0..depth)
        .map(|i| {
            let deps = if i == 0 {
                Vec::new()
            } else {
                vec![format!("pkg_{}", i - 1)]
            };
            package(&format!("pkg_{i}"), &deps)
        })
        .collect()
}

/// Generate a repo made of small rings, each depending on the previous ring
fn generate_cyclic_repo(rings: usize, ring_size: usize) -> Vec<Package> {
    let mut packages = Vec::with_capacity(rings * ring_size);
    for ring in 0..rings {
        for member in 0..ring_size {
            let mut deps = vec![format!("ring_{ring}_{}", (member + 1) % ring_size)];
            if ring > 0 {
                deps.push(format!("ring_{}_0", ring - 1));
            }
            packages.push(package(&format!("ring_{ring}_{member}"), &deps));
        }
    }
    packages
}

fn bench_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_construction");

    for size in [10, 100, 500] {
        let wide = generate_wide_repo(size);
        group.bench_with_input(BenchmarkId::new("wide", size), &wide, |b, packages| {
            b.iter(|| PackageGraph::new(black_box(packages), GraphType::AllDependencies).unwrap());
        });

        let deep = generate_deep_repo(size);
        group.bench_with_input(BenchmarkId::new("deep", size), &deep, |b, packages| {
            b.iter(|| PackageGraph::new(black_box(packages), GraphType::AllDependencies).unwrap());
        });
    }

    group.finish();
}

fn bench_collapse_cycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("collapse_cycles");

    for rings in [5, 20, 50] {
        let packages = generate_cyclic_repo(rings, 4);
        let graph = PackageGraph::new(&packages, GraphType::AllDependencies).unwrap();
        group.bench_with_input(BenchmarkId::new("rings", rings), &graph, |b, graph| {
            b.iter(|| black_box(graph).collapse_cycles(false).unwrap());
        });
    }

    group.finish();
}

fn bench_batch_packages(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_packages");

    for size in [10, 100, 500] {
        let deep = generate_deep_repo(size);
        group.bench_with_input(BenchmarkId::new("deep", size), &deep, |b, packages| {
            b.iter(|| {
                batch_packages(black_box(packages), GraphType::AllDependencies, false).unwrap()
            });
        });
    }

    for rings in [5, 20] {
        let packages = generate_cyclic_repo(rings, 4);
        group.bench_with_input(BenchmarkId::new("rings", rings), &packages, |b, packages| {
            b.iter(|| {
                batch_packages(black_box(packages), GraphType::AllDependencies, false).unwrap()
            });
        });
    }

    group.finish();
}

fn bench_toposort(c: &mut Criterion) {
    let mut group = c.benchmark_group("toposort");

    for size in [10, 100, 500] {
        let wide = generate_wide_repo(size);
        group.bench_with_input(BenchmarkId::new("wide", size), &wide, |b, packages| {
            b.iter(|| QueryGraph::toposort(black_box(packages), &QueryOptions::default()).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_construction,
    bench_collapse_cycles,
    bench_batch_packages,
    bench_toposort
);
criterion_main!(benches);
