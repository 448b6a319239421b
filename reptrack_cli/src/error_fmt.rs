//! Human-readable error descriptions and structured JSON error formatting.

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    use reptrack_core::error::{BuildError, TrackerError};

    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingExercise => {
                "What happened: No exercise was given to the tracker.\nLikely causes: The command did not resolve an exercise before starting.\nHow to fix: Pass --exercise <id>; `reptrack exercises` lists the ids.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid tracker configuration ({msg}).\nLikely causes: Out-of-range values in [tracking] or [visibility].\nHow to fix: Edit the config file, then rerun."
            ),
        };
    }

    if let Some(te) = err.downcast_ref::<TrackerError>() {
        return match te {
            TrackerError::UnknownExercise(id) => format!(
                "What happened: Unknown exercise {id:?}.\nLikely causes: A typo in --exercise, the plan, or [timed].exercises.\nHow to fix: Run `reptrack exercises` for the known ids, or define it under [[exercises]]."
            ),
            TrackerError::Source(msg) => format!(
                "What happened: The frame stream could not be read ({msg}).\nLikely causes: A malformed JSON line or an unreadable input file.\nHow to fix: Check that every line is {{\"timestamp_ms\": .., \"landmarks\": [..]}}."
            ),
            TrackerError::Sink(msg) => format!(
                "What happened: The session record could not be saved ({msg}).\nLikely causes: The history file is not writable.\nHow to fix: Check --history or [history].file and its directory permissions."
            ),
            TrackerError::Registry(msg) => format!(
                "What happened: An exercise definition was rejected ({msg}).\nLikely causes: Duplicate ids in [[exercises]].\nHow to fix: Give each exercise a unique id."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from config and plan loading
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("parse config") || lower.contains("parse plan") {
        return format!(
            "What happened: A TOML file could not be parsed.\nLikely causes: Wrong types or unknown keys.\nHow to fix: Fix the file and try again. Detail: {msg}"
        );
    }

    if lower.starts_with("open ") || lower.starts_with("read ") {
        return format!(
            "What happened: A file could not be opened.\nLikely causes: Wrong path or missing permissions.\nHow to fix: Check the path. Detail: {msg}"
        );
    }

    if lower.contains("must be") || lower.contains("duplicate") {
        return format!(
            "What happened: Configuration is invalid ({msg}).\nLikely causes: Out-of-range or conflicting values.\nHow to fix: Edit the TOML and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes per error family. Clap usage errors keep their own code 2.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    use reptrack_core::error::{BuildError, TrackerError};
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    match err.downcast_ref::<TrackerError>() {
        Some(TrackerError::Config(_) | TrackerError::Registry(_)) => 3,
        Some(TrackerError::UnknownExercise(_)) => 4,
        Some(TrackerError::Source(_)) => 5,
        Some(TrackerError::Sink(_)) => 6,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    use reptrack_core::error::{BuildError, TrackerError};
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<TrackerError>() {
        Some(TrackerError::Config(_)) => "Config",
        Some(TrackerError::UnknownExercise(_)) => "UnknownExercise",
        Some(TrackerError::Registry(_)) => "Registry",
        Some(TrackerError::Source(_)) => "Source",
        Some(TrackerError::Sink(_)) => "Sink",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;
    json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reptrack_core::error::TrackerError;
    use rstest::rstest;

    #[rstest]
    #[case(TrackerError::UnknownExercise("burpee".into()), 4, "UnknownExercise")]
    #[case(TrackerError::Source("eof".into()), 5, "Source")]
    #[case(TrackerError::Sink("denied".into()), 6, "Sink")]
    #[case(TrackerError::Config("bad".into()), 3, "Config")]
    fn typed_errors_map_to_codes(#[case] e: TrackerError, #[case] code: i32, #[case] name: &str) {
        let report = eyre::Report::new(e);
        assert_eq!(exit_code_for_error(&report), code);
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], name);
        assert_eq!(v["exit_code"], code);
    }

    #[test]
    fn untyped_errors_fall_back() {
        let report = eyre::eyre!("something odd");
        assert_eq!(exit_code_for_error(&report), 1);
        assert!(humanize(&report).contains("something odd"));
    }
}
