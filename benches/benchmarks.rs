use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::collections::BTreeMap;
use std::path::PathBuf;

use stamp::config::{load_config, VariableSpec};
use stamp::glob::{glob_match, PatternSet};
use stamp::render::{plan, render_content, PlanOptions};
use stamp::variables::resolve;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn sample_variables() -> BTreeMap<String, String> {
    [
        ("PROJECT", "bench-project"),
        ("CRATE_NAME", "bench_project_svc"),
        ("OWNER", "benchmarks"),
        ("PORT", "8080"),
        ("CI", "true"),
        ("DB", "postgres"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn bench_glob_matching(c: &mut Criterion) {
    let deep = "a/b/c/d/e/f/g/h/i/j/k/l/m/n/o/p/q/r/s/t/file.rs";
    let set = PatternSet::new(
        vec!["src/**/*.rs".into(), "**/*.toml".into(), "docs/*.md".into()],
        vec!["**/target/**".into(), "**/*.orig".into()],
    );

    c.bench_function("glob_match deep **", |b| {
        b.iter(|| glob_match(black_box("**/**/**/*.rs"), black_box(deep)));
    });

    c.bench_function("pattern_set is_match", |b| {
        b.iter(|| {
            set.is_match(black_box("src/net/http/client.rs"))
                && !set.is_match(black_box("crates/x/target/debug/build.toml"))
        });
    });
}

fn bench_variable_resolution(c: &mut Criterion) {
    // A chain where every default depends on the previous variable.
    let mut specs = vec![VariableSpec::new("V0").with_default("{{DIR_NAME}}")];
    for i in 1..50 {
        specs.push(VariableSpec::new(format!("V{i}")).with_default(format!("{{{{V{}}}}}-x", i - 1)));
    }
    specs.reverse();
    let builtins: BTreeMap<String, String> =
        [("DIR_NAME".to_string(), "bench".to_string())].into();
    let provided = BTreeMap::new();

    c.bench_function("resolve 50-variable chain", |b| {
        b.iter(|| {
            let resolved = resolve(black_box(&specs), &provided, &builtins).unwrap();
            black_box(resolved)
        });
    });
}

fn bench_content_rendering(c: &mut Criterion) {
    let vars = sample_variables();
    let template = "# {{PROJECT}}\n{{#if CI}}ci: on\n{{/if}}{{#if DB == \"postgres\"}}db: {{CRATE_NAME}}\n{{/if}}"
        .repeat(200);

    c.bench_function("render_content", |b| {
        b.iter(|| black_box(render_content(black_box(&template), &vars)));
    });
}

fn bench_planning(c: &mut Criterion) {
    let partial = fixture_path("service-partial");
    let config = load_config(&partial).unwrap();
    let options = PlanOptions::from_config(&config);
    let vars = sample_variables();
    let dest = tempfile::tempdir().unwrap();

    c.bench_function("plan service partial", |b| {
        b.iter(|| {
            let entries = plan(
                black_box(&partial.join("template")),
                dest.path(),
                &options,
                &vars,
            )
            .unwrap();
            black_box(entries)
        });
    });
}

criterion_group!(
    benches,
    bench_glob_matching,
    bench_variable_resolution,
    bench_content_rendering,
    bench_planning
);
criterion_main!(benches);
