#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    if let Ok(plan) = reptrack_config::load_plan_toml(data) {
        let _ = plan.validate();
    }
});
