//! Final report formatting: the other named external collaborator
//! (spec.md §6), turning a [`MetricsSnapshot`] into text or JSON.
//!
//! The text layout is a hand-built `format!` table, grounded in the
//! original `cmd/netbench.go`'s summary `fmt.Printf` block.

use crate::metrics::MetricsSnapshot;
use crate::percentiles::QUANTILES;

pub fn render_text(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::new();

    out.push_str("netbench run summary\n");
    out.push_str("=====================\n");
    out.push_str(&format!("duration:          {:.3}s\n", snapshot.duration.as_secs_f64()));
    out.push_str(&format!("requests_total:    {}\n", snapshot.requests_total));
    out.push_str(&format!("requests_failed:   {}\n", snapshot.requests_failed));
    out.push_str(&format!("requests_error:    {}\n", snapshot.requests_error));
    out.push_str(&format!("requests_aborted:  {}\n", snapshot.requests_aborted));
    out.push_str(&format!("requests_blength:  {}\n", snapshot.requests_blength));
    out.push_str(&format!("requests_per_sec:  {:.2}\n", snapshot.requests_per_sec));
    out.push_str(&format!("workers:           {:.0}\n", snapshot.workers));
    out.push_str(&format!("response_bytes:    {:.0}\n", snapshot.response_bytes));

    out.push_str("\nresponse codes:\n");
    let mut codes: Vec<_> = snapshot.response_codes.iter().collect();
    codes.sort_by_key(|(code, _)| code.to_string());
    if codes.is_empty() {
        out.push_str("  (none)\n");
    } else {
        for (code, count) in codes {
            out.push_str(&format!("  {code:<5} {count}\n"));
        }
    }

    out.push_str("\nlatency percentiles (ns):\n");
    for &q in &QUANTILES {
        let label = q.to_string();
        let value = snapshot.response_times.get(&label).copied().unwrap_or(-1.0);
        out.push_str(&format!("  p{label:<6} {value}\n"));
    }

    out
}

pub fn render_json(snapshot: &MetricsSnapshot) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;

    #[test]
    fn text_report_contains_core_sections() {
        let registry = MetricsRegistry::new();
        registry.inc_requests_total();
        registry.code_counter(200).inc();
        let snapshot = registry.snapshot();

        let text = render_text(&snapshot);
        assert!(text.contains("requests_total:    1"));
        assert!(text.contains("200"));
        assert!(text.contains("latency percentiles"));
    }

    #[test]
    fn json_report_round_trips_field_names() {
        let registry = MetricsRegistry::new();
        registry.inc_requests_total();
        let snapshot = registry.snapshot();

        let json = render_json(&snapshot).unwrap();
        assert!(json.contains("\"requests_total\""));
        assert!(json.contains("\"requests_failed_bodylength\""));
        assert!(json.contains("\"requests_per_sec\""));
    }
}
