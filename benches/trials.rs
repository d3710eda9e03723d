//! Trial pipeline benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use cell_energy_sim::biochemistry::{EnergyKinetics, IntegrationMethod, IntegratorConfig, PhaseChainer};
use cell_energy_sim::config::{KineticParameters, Parameters};
use cell_energy_sim::trials::TrialRunner;

fn bench_phase_chain(c: &mut Criterion) {
    let params = Parameters::default();
    let mut chainer = PhaseChainer::new(
        EnergyKinetics::new(KineticParameters::default()),
        params.initial,
        params.grid,
        params.integrator,
    );

    c.bench_function("phase_chain_dp45", |b| {
        b.iter(|| chainer.run(black_box(false)))
    });
}

fn bench_phase_chain_rk4(c: &mut Criterion) {
    let params = Parameters::default();
    let mut chainer = PhaseChainer::new(
        EnergyKinetics::new(KineticParameters::default()),
        params.initial,
        params.grid,
        IntegratorConfig {
            method: IntegrationMethod::Rk4 { substeps: 4 },
            ..IntegratorConfig::default()
        },
    );

    c.bench_function("phase_chain_rk4", |b| {
        b.iter(|| chainer.run(black_box(false)))
    });
}

fn bench_single_trial(c: &mut Criterion) {
    let runner = TrialRunner::new(Parameters::default()).expect("default parameters are valid");

    c.bench_function("single_trial", |b| {
        b.iter(|| runner.run_trial(black_box(0)))
    });
}

criterion_group!(
    benches,
    bench_phase_chain,
    bench_phase_chain_rk4,
    bench_single_trial
);
criterion_main!(benches);
