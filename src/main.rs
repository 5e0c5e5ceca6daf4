use std::process::ExitCode;

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: pagecraft <script.json>");
        return ExitCode::from(2);
    };

    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(%path, error = %err, "failed to read script");
            return ExitCode::FAILURE;
        }
    };

    let mut script: pagecraft::replay::Script = match serde_json::from_str(&raw) {
        Ok(script) => script,
        Err(err) => {
            tracing::error!(%path, error = %err, "malformed script");
            return ExitCode::FAILURE;
        }
    };
    match pagecraft::config::EditorConfig::from_env() {
        Ok(env) => script.config = merge_env(script.config, env),
        Err(err) => {
            tracing::error!(error = %err, "invalid environment");
            return ExitCode::FAILURE;
        }
    }

    let outcome = match pagecraft::replay::run(script) {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(%path, error = %err, "replay failed");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string_pretty(&outcome) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to encode outcome");
            ExitCode::FAILURE
        }
    }
}

/// Environment variables override script values only when they are set.
fn merge_env(
    mut script: pagecraft::config::EditorConfig,
    env: pagecraft::config::EditorConfig,
) -> pagecraft::config::EditorConfig {
    if std::env::var_os(pagecraft::config::ENV_REJECT_POLICY).is_some() {
        script.reject_policy = env.reject_policy;
    }
    if std::env::var_os(pagecraft::config::ENV_CONFIRM_DELETE).is_some() {
        script.confirm_delete = env.confirm_delete;
    }
    script
}
