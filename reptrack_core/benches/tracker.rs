use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use reptrack_core::mocks::PoseBuilder;
use reptrack_core::{ExerciseRegistry, RepTracker, SmoothingCfg, TrackerCfg};
use reptrack_traits::Landmark;

const LEFT_ARM: [&str; 3] = ["left_shoulder", "left_elbow", "left_wrist"];
const RIGHT_ARM: [&str; 3] = ["right_shoulder", "right_elbow", "right_wrist"];

// Curl trace: both elbows swing between 170 and 30 degrees.
fn curl_trace(n: usize) -> Vec<Vec<Landmark>> {
    (0..n)
        .map(|i| {
            let t = i as f64 / 15.0;
            let deg = 100.0 + 70.0 * t.cos();
            PoseBuilder::new()
                .angle(LEFT_ARM, deg)
                .angle(RIGHT_ARM, deg)
                .landmarks()
                .to_vec()
        })
        .collect()
}

pub fn bench_process_frame(c: &mut Criterion) {
    let mut g = c.benchmark_group("process_frame");
    //   BENCH_SAMPLE_SIZE=10 BENCH_MEAS_MS=50 cargo bench -p reptrack_core --bench tracker
    if let Ok(ss) = std::env::var("BENCH_SAMPLE_SIZE") {
        if let Ok(n) = ss.parse::<usize>() {
            g.sample_size(n.max(1));
        }
    } else {
        g.sample_size(50);
    }
    if let Ok(ms) = std::env::var("BENCH_MEAS_MS")
        && let Ok(ms_u64) = ms.parse::<u64>()
    {
        g.measurement_time(std::time::Duration::from_millis(ms_u64));
    }

    let reg = ExerciseRegistry::builtin();
    let trace = curl_trace(3_000);

    for &window in &[0_u32, 5, 15] {
        let cfg = TrackerCfg {
            smoothing: SmoothingCfg {
                enabled: window > 1,
                window,
            },
            ..TrackerCfg::default()
        };
        g.bench_function(format!("bicep_curl_window_{window}"), |b| {
            b.iter_batched(
                || {
                    RepTracker::builder()
                        .with_exercise(reg.get("bicep_curl").expect("builtin exercise"))
                        .with_config(cfg)
                        .build()
                        .expect("valid tracker config")
                },
                |mut tracker| {
                    for lms in &trace {
                        black_box(tracker.process_frame(black_box(lms)));
                    }
                    black_box(tracker.reps());
                },
                BatchSize::SmallInput,
            )
        });
    }
    g.finish();
}

criterion_group!(tracker, bench_process_frame);
criterion_main!(tracker);
