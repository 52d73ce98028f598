use packwright::PipelineError;

/// Lines of the build log shown under a compile error
const LOG_TAIL_LINES: usize = 40;

/// Exit status for a failed run
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<PipelineError>()
        .map(PipelineError::exit_code)
        .unwrap_or(1)
}

/// Human-readable rendering: `error[<stage>]: <message>` plus the log tail
pub fn format_error(err: &anyhow::Error) -> String {
    let Some(pipeline) = err.downcast_ref::<PipelineError>() else {
        return format!("error: {err:#}\n");
    };

    let mut out = format!("error[{}]: {pipeline}\n", pipeline.stage());
    if let Some(log) = pipeline.build_log().filter(|log| !log.is_empty()) {
        out.push_str(&format!("\n--- build log (last {LOG_TAIL_LINES} lines) ---\n"));
        out.push_str(&log.tail(LOG_TAIL_LINES));
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

pub fn print_error(err: &anyhow::Error, json: bool) {
    if json {
        let mut event = serde_json::json!({
            "event": "error",
            "message": err.to_string(),
            "exit_code": exit_code(err),
        });
        if let Some(pipeline) = err.downcast_ref::<PipelineError>() {
            event["stage"] = serde_json::Value::from(pipeline.stage().as_str());
        }
        let _ = crate::ui::json::emit(event);
        return;
    }

    eprint!("{}", format_error(err));
}
