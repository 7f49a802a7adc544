//! Formatted terminal output for experiment runs.
//!
//! Formatting lives here so the estimators and the pipeline never print.

use crate::domain::{ExperimentConfig, Method, MethodScore};

/// Header describing the experiment settings.
pub fn format_run_header(config: &ExperimentConfig) -> String {
    let mut out = String::new();

    out.push_str("=== irm - invariant estimators on a chain SEM ===\n");
    out.push_str(&format!(
        "SEM: dim={} | ones={} | scramble={} | hetero={} | hidden={}\n",
        config.sem.dim, config.sem.ones, config.sem.scramble, config.sem.hetero, config.sem.hidden
    ));
    out.push_str(&format!(
        "Environments: {} | n_samples={} | reps={} | seed={}\n",
        fmt_list(&config.env_list),
        config.n_samples,
        config.n_reps,
        config.seed
    ));
    let names: Vec<&str> = config.methods.iter().map(|m| m.display_name()).collect();
    out.push_str(&format!("Methods: {}\n", names.join(", ")));

    out
}

/// One line per method for a single repetition, e.g.
/// `ICP           SEM 0.2,2,5 0.00123 0.00000`.
pub fn format_rep_scores(scores: &[MethodScore], env_list: &[f64], print_vectors: bool) -> String {
    let envs: Vec<String> = env_list.iter().map(|e| format!("{e}")).collect();
    let envs = envs.join(",");

    let mut out = String::new();
    for s in scores {
        let mut line = format!(
            "{:<12} SEM {envs} {:.5} {:.5}",
            s.method.display_name(),
            s.error_causal,
            s.error_noncausal
        );
        if print_vectors {
            line.push(' ');
            line.push_str(&fmt_list(&s.solution));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Mean and worst errors per method across repetitions.
pub fn format_summary(scores: &[MethodScore], methods: &[Method]) -> String {
    let mut out = String::new();

    out.push_str(
        format!(
            "{:<12} {:>6} {:>14} {:>14} {:>14}\n",
            "method", "reps", "causal_mean", "noncausal_mean", "causal_max"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<12} {:-<6} {:-<14} {:-<14} {:-<14}\n", "", "", "", "", "").trim_end());
    out.push('\n');

    for &method in methods {
        let rows: Vec<&MethodScore> = scores.iter().filter(|s| s.method == method).collect();
        if rows.is_empty() {
            continue;
        }
        let n = rows.len() as f64;
        let causal_mean = rows.iter().map(|s| s.error_causal).sum::<f64>() / n;
        let noncausal_mean = rows.iter().map(|s| s.error_noncausal).sum::<f64>() / n;
        let causal_max = rows.iter().map(|s| s.error_causal).fold(f64::NEG_INFINITY, f64::max);

        out.push_str(
            format!(
                "{:<12} {:>6} {:>14.5} {:>14.5} {:>14.5}\n",
                method.display_name(),
                rows.len(),
                causal_mean,
                noncausal_mean,
                causal_max
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

fn fmt_list(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:+.4}")).collect();
    format!("[{}]", parts.join(", "))
}
